//! Spec editor boundary
//!
//! The text widget itself belongs to the embedding. [`EditorService`] wraps
//! whichever [`TextEditor`] is attached and adds what the visual needs on
//! top: dirty tracking against the persisted spec, schema selection per
//! grammar, and auto-completion entries for the bound columns.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::dataset::ColumnMeta;
use crate::grammar::Provider;
use crate::host::LocalizationManager;
use crate::naming;

/// Score base for generated raw values; listed before columns and measures
const RAW_SCORE_BASE: u32 = 1000;

const FIELD_SCORE_BASE: u32 = 2000;

/// Operations the visual needs from a text editor widget
pub trait TextEditor {
    fn get_text(&self) -> String;

    fn set_text(&mut self, text: &str);

    fn focus(&mut self);

    /// Re-measure after the surrounding pane changed size
    fn resize(&mut self) {}

    /// Validate against the JSON schema at `schema_url`, or stop validating
    fn set_schema(&mut self, schema_url: Option<&str>);

    fn set_completers(&mut self, completers: Vec<Completer>);
}

/// One auto-completion entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completer {
    pub name: String,
    pub value: String,
    pub caption: String,
    pub meta: String,
    pub score: u32,
}

/// Build one completer per column, in metadata order
pub fn build_completers(
    metadata: &IndexMap<String, ColumnMeta>,
    localisation: &dyn LocalizationManager,
) -> Vec<Completer> {
    metadata
        .iter()
        .enumerate()
        .map(|(idx, (key, column))| Completer {
            name: key.clone(),
            value: key.clone(),
            caption: key.clone(),
            meta: completer_meta(column, localisation),
            score: completer_score(column, idx as u32),
        })
        .collect()
}

fn completer_meta(column: &ColumnMeta, localisation: &dyn LocalizationManager) -> String {
    let kind = if column.is_measure() {
        localisation.get_display_name(naming::COMPLETER_MEASURE_KEY)
    } else {
        localisation.get_display_name(naming::COMPLETER_COLUMN_KEY)
    };
    if column.is_raw {
        format!(
            "{} {}",
            kind,
            localisation.get_display_name(naming::COMPLETER_RAW_KEY)
        )
    } else {
        kind
    }
}

fn completer_score(column: &ColumnMeta, index: u32) -> u32 {
    if column.is_raw {
        RAW_SCORE_BASE + index
    } else {
        FIELD_SCORE_BASE + index
    }
}

// ============================================================================
// Editor Service
// ============================================================================

#[derive(Default)]
pub struct EditorService {
    editor: Option<Box<dyn TextEditor>>,
    is_dirty: bool,
}

impl EditorService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a widget; replaces any previously attached one
    pub fn attach(&mut self, editor: Box<dyn TextEditor>) {
        self.editor = Some(editor);
        self.is_dirty = false;
    }

    pub fn detach(&mut self) {
        self.editor = None;
        self.is_dirty = false;
    }

    pub fn is_attached(&self) -> bool {
        self.editor.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Current buffer text, if a widget is attached
    pub fn get_text(&self) -> Option<String> {
        self.editor.as_ref().map(|e| e.get_text())
    }

    pub fn set_text(&mut self, text: &str) {
        if let Some(editor) = self.editor.as_mut() {
            editor.set_text(text);
        }
    }

    pub fn focus(&mut self) {
        if let Some(editor) = self.editor.as_mut() {
            editor.focus();
        }
    }

    pub fn resize(&mut self) {
        if let Some(editor) = self.editor.as_mut() {
            editor.resize();
        }
    }

    /// Compare the buffer against `persisted`; with no reference text the
    /// buffer is considered in sync.
    pub fn resolve_dirty_status(&mut self, persisted: Option<&str>) {
        self.is_dirty = match (self.get_text(), persisted) {
            (Some(current), Some(persisted)) => current != persisted,
            _ => false,
        };
    }

    /// Swap the editor's JSON schema to the grammar's, or clear it
    pub fn set_provider(&mut self, provider: Option<Provider>) {
        if let Some(editor) = self.editor.as_mut() {
            editor.set_schema(provider.map(|p| p.schema_url()));
        }
    }

    pub fn update_completers(
        &mut self,
        metadata: &IndexMap<String, ColumnMeta>,
        localisation: &dyn LocalizationManager,
    ) {
        if let Some(editor) = self.editor.as_mut() {
            editor.set_completers(build_completers(metadata, localisation));
        }
    }
}

// ============================================================================
// In-memory Editor
// ============================================================================

#[derive(Debug, Default)]
struct BufferState {
    text: String,
    schema_url: Option<String>,
    completers: Vec<Completer>,
    focus_count: usize,
}

/// Headless [`TextEditor`] backed by a string.
///
/// Clones share the same buffer, so an embedding (or a test) can keep a
/// handle to inspect what the visual did to it.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    state: Rc<RefCell<BufferState>>,
}

impl TextBuffer {
    pub fn new(text: &str) -> Self {
        let buffer = Self::default();
        buffer.state.borrow_mut().text = text.to_string();
        buffer
    }

    pub fn text(&self) -> String {
        self.state.borrow().text.clone()
    }

    /// Simulate the user typing over the whole buffer
    pub fn type_text(&self, text: &str) {
        self.state.borrow_mut().text = text.to_string();
    }

    pub fn schema_url(&self) -> Option<String> {
        self.state.borrow().schema_url.clone()
    }

    pub fn completers(&self) -> Vec<Completer> {
        self.state.borrow().completers.clone()
    }

    pub fn focus_count(&self) -> usize {
        self.state.borrow().focus_count
    }
}

impl TextEditor for TextBuffer {
    fn get_text(&self) -> String {
        self.text()
    }

    fn set_text(&mut self, text: &str) {
        self.type_text(text);
    }

    fn focus(&mut self) {
        self.state.borrow_mut().focus_count += 1;
    }

    fn set_schema(&mut self, schema_url: Option<&str>) {
        self.state.borrow_mut().schema_url = schema_url.map(str::to_string);
    }

    fn set_completers(&mut self, completers: Vec<Completer>) {
        self.state.borrow_mut().completers = completers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::map_dataset;
    use crate::dataview::DataViewTable;
    use crate::host::KeyLocalizationManager;
    use serde_json::json;

    fn metadata() -> IndexMap<String, ColumnMeta> {
        let table: DataViewTable = serde_json::from_value(json!({
            "columns": [
                {"displayName": "Region", "roles": {"values": true}},
                {"displayName": "Sales", "isMeasure": true, "roles": {"values": true}}
            ],
            "rows": [["North", 1]]
        }))
        .unwrap();
        map_dataset(&table, true).metadata
    }

    #[test]
    fn test_completers_for_columns_and_measures() {
        let completers = build_completers(&metadata(), &KeyLocalizationManager);
        assert_eq!(completers.len(), 2);
        assert_eq!(completers[0].name, "Region");
        assert_eq!(completers[0].meta, "Completer_Cap_Column");
        assert_eq!(completers[0].score, 2000);
        assert_eq!(completers[1].meta, "Completer_Cap_Measure");
        assert_eq!(completers[1].score, 2001);
    }

    #[test]
    fn test_raw_completers_rank_first() {
        let mut metadata = metadata();
        if let Some(sales) = metadata.get_mut("Sales") {
            sales.is_raw = true;
        }
        let completers = build_completers(&metadata, &KeyLocalizationManager);
        assert_eq!(completers[1].meta, "Completer_Cap_Measure Completer_Cap_Raw");
        assert_eq!(completers[1].score, 1001);
    }

    #[test]
    fn test_dirty_tracking() {
        let buffer = TextBuffer::new("{}");
        let mut editor = EditorService::new();
        editor.attach(Box::new(buffer.clone()));

        editor.resolve_dirty_status(Some("{}"));
        assert!(!editor.is_dirty());

        buffer.type_text("{\"mark\": \"bar\"}");
        editor.resolve_dirty_status(Some("{}"));
        assert!(editor.is_dirty());

        editor.resolve_dirty_status(None);
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_schema_swap() {
        let buffer = TextBuffer::default();
        let mut editor = EditorService::new();
        editor.attach(Box::new(buffer.clone()));

        editor.set_provider(Some(Provider::Vega));
        assert_eq!(buffer.schema_url().as_deref(), Some(naming::VEGA_SCHEMA));
        editor.set_provider(Some(Provider::VegaLite));
        assert_eq!(buffer.schema_url().as_deref(), Some(naming::VEGA_LITE_SCHEMA));
        editor.set_provider(None);
        assert_eq!(buffer.schema_url(), None);
    }

    #[test]
    fn test_detached_editor_is_inert() {
        let mut editor = EditorService::new();
        assert_eq!(editor.get_text(), None);
        editor.set_text("{}");
        editor.focus();
        editor.resolve_dirty_status(Some("{}"));
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_update_completers_reaches_widget() {
        let buffer = TextBuffer::default();
        let mut editor = EditorService::new();
        editor.attach(Box::new(buffer.clone()));
        editor.update_completers(&metadata(), &KeyLocalizationManager);
        assert_eq!(buffer.completers().len(), 2);
    }
}
