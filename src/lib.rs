/*!
# Deneb - Declarative Vega / Vega-Lite visuals for report hosts

Deneb lets report authors embed a Vega or Vega-Lite specification directly in
a report visual, edit it in place with a JSON editor, bind it to the tabular
query result the host delivers, and persist it back into the report.

## Example

```rust,ignore
use deneb::{Visual, VisualConfiguration};

let mut visual = Visual::new(host, VisualConfiguration::default());

// Once per host update (data page, resize, view mode change...)
visual.update(&options);

// Once per candidate paint
visual.paint(&mut renderer)?;
```

## Architecture

The hard part is not any single algorithm but keeping four concerns
consistent while the host fires partial, repeated update events:

- **Data loading** → [`data_limit`] requests further pages until the host says stop
- **Spec validation** → [`specification`] parses the editor text against the active grammar
- **Render gating** → [`render_gate`] decides when an expensive re-render is warranted
- **Persistence** → [`property`] writes editor content back into host object storage

[`service::VisualService`] owns all four and sequences them per update;
[`visual::Visual`] is the host-facing boundary that isolates failures.

## Core Components

- [`dataview`] - Host dataview model and validation
- [`dataset`] - Dataview table → dataset rows keyed by column name
- [`grammar`] - Providers and structural validation for both grammars
- [`settings`] - Report settings and property-pane enumeration
- [`interface`] - Thin presentation model consumed by a view layer
*/

pub mod config;
pub mod data_limit;
pub mod dataset;
pub mod dataview;
pub mod editor;
pub mod grammar;
pub mod host;
pub mod interface;
pub mod logging;
pub mod naming;
pub mod property;
pub mod render_gate;
pub mod service;
pub mod settings;
pub mod specification;
pub mod tooltip;
pub mod visual;

// Re-export key types for convenience
pub use config::{VisualConfiguration, VisualFeatures};
pub use dataset::{Dataset, DataValue};
pub use dataview::{DataView, OperationKind, VisualUpdateOptions, VisualUpdateType};
pub use grammar::{Provider, RenderMode};
pub use host::VisualHost;
pub use render_gate::RenderGate;
pub use service::{VisualService, VisualState};
pub use settings::VisualSettings;
pub use specification::CompiledSpec;
pub use visual::Visual;

/// Main library error type
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DenebError {
    #[error("Dataview error: {0}")]
    DataViewError(String),

    #[error("Mapping error: {0}")]
    MappingError(String),

    #[error("Specification error: {0}")]
    SpecificationError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Settings error: {0}")]
    SettingsError(String),

    #[error("Host error: {0}")]
    HostError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DenebError {
    /// The message without its category prefix, as shown to report authors
    pub fn message(&self) -> &str {
        match self {
            DenebError::DataViewError(m)
            | DenebError::MappingError(m)
            | DenebError::SpecificationError(m)
            | DenebError::PersistenceError(m)
            | DenebError::SettingsError(m)
            | DenebError::HostError(m)
            | DenebError::InternalError(m) => m,
        }
    }
}

pub type Result<T> = std::result::Result<T, DenebError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
