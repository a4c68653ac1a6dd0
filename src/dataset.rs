//! Dataset mapping
//!
//! Converts a dataview table into the dataset handed to the renderer: one
//! row per table row, keyed by column display name, holding only columns
//! bound to the values role. Metadata covers every column so the editor can
//! offer all of them for auto-completion.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

use crate::dataview::{DataViewMetadataColumn, DataViewTable};
use crate::{naming, DenebError, Result};

/// Formats accepted for date/time cells delivered as text without an offset
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// A single cell value in a dataset row
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Date(DateTime<Utc>),
}

impl Serialize for DataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            DataValue::Null => serializer.serialize_unit(),
            DataValue::Bool(b) => serializer.serialize_bool(*b),
            DataValue::Number(n) => n.serialize(serializer),
            DataValue::Text(s) => serializer.serialize_str(s),
            DataValue::Date(dt) => {
                serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S%.3fZ"))
            }
        }
    }
}

impl DataValue {
    /// Take a cell as-is
    fn from_cell(cell: &Value) -> Self {
        match cell {
            Value::Null => DataValue::Null,
            Value::Bool(b) => DataValue::Bool(*b),
            Value::Number(n) => DataValue::Number(n.clone()),
            Value::String(s) => DataValue::Text(s.clone()),
            other => DataValue::Text(other.to_string()),
        }
    }

    /// Coerce a cell from a date/time column
    fn date_from_cell(cell: &Value) -> Result<Self> {
        match cell {
            Value::Null => Ok(DataValue::Null),
            Value::String(s) => parse_date_text(s).map(DataValue::Date).ok_or_else(|| {
                DenebError::MappingError(format!("Cannot convert '{}' to a date", s))
            }),
            Value::Number(n) => n
                .as_f64()
                .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
                .map(DataValue::Date)
                .ok_or_else(|| {
                    DenebError::MappingError(format!("Timestamp {} is out of range", n))
                }),
            other => Err(DenebError::MappingError(format!(
                "Cannot convert {} to a date",
                other
            ))),
        }
    }
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Host column descriptor plus the flags the editor uses to classify it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMeta {
    #[serde(flatten)]
    pub column: DataViewMetadataColumn,
    pub is_column: bool,
    /// Generated rather than mapped from the table; never set by mapping
    pub is_raw: bool,
}

impl ColumnMeta {
    fn from_column(column: &DataViewMetadataColumn) -> Self {
        Self {
            is_column: !column.is_measure,
            is_raw: false,
            column: column.clone(),
        }
    }

    pub fn is_measure(&self) -> bool {
        self.column.is_measure
    }
}

/// One mapped row, keyed by column display name
pub type DataRow = IndexMap<String, DataValue>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub metadata: IndexMap<String, ColumnMeta>,
    pub values: Vec<DataRow>,
}

impl Dataset {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty() && self.values.is_empty()
    }
}

/// Map a table into a fresh dataset.
///
/// Returns an empty dataset when the dataview failed validation or the
/// table has no rows. A row that cannot be mapped stops the mapping; rows
/// mapped before it are kept and the failure is logged.
pub fn map_dataset(table: &DataViewTable, is_data_view_valid: bool) -> Dataset {
    if !is_data_view_valid || table.rows.is_empty() {
        return Dataset::empty();
    }

    let _span = tracing::debug_span!("map_dataset", rows = table.rows.len()).entered();

    let mut dataset = Dataset {
        metadata: table
            .columns
            .iter()
            .map(|c| (c.display_name.clone(), ColumnMeta::from_column(c)))
            .collect(),
        values: Vec::with_capacity(table.rows.len()),
    };

    for (idx, row) in table.rows.iter().enumerate() {
        match map_row(&table.columns, row) {
            Ok(mapped) => dataset.values.push(mapped),
            Err(e) => {
                tracing::error!(row = idx, error = %e, "Error mapping the dataset");
                break;
            }
        }
    }

    tracing::debug!(rows = dataset.values.len(), "Mapped dataset");
    dataset
}

fn map_row(columns: &[DataViewMetadataColumn], row: &[Value]) -> Result<DataRow> {
    let mut mapped = DataRow::new();
    // Cells past the last column descriptor carry no role and are dropped
    for (column, cell) in columns.iter().zip(row) {
        if !column.has_role(naming::VALUES_ROLE) {
            continue;
        }
        let value = if column.value_type.date_time {
            DataValue::date_from_cell(cell)?
        } else {
            DataValue::from_cell(cell)
        };
        mapped.insert(column.display_name.clone(), value);
    }
    Ok(mapped)
}
