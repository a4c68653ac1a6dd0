//! Data-limit coordination
//!
//! The host delivers large query results in segments and only sends the next
//! one when asked. On every data update the coordinator decides whether to
//! ask; the host's reply to that request, and the next update it triggers,
//! drive the loop until the host says there is nothing more or the settings
//! don't allow it.
//!
//! Each new query bumps a generation counter that travels with the fetch
//! request. A continuation whose echoed generation is older than the current
//! one answers a request from an abandoned query and is ignored.

use std::rc::Rc;

use serde::Serialize;

use crate::dataview::{OperationKind, VisualUpdateOptions};
use crate::host::{DataFetchRequest, VisualHost};
use crate::settings::DataLimitSettings;

/// Counters describing the current load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataLimitState {
    pub can_fetch_more: bool,
    pub windows_loaded: u32,
    pub rows_loaded: usize,
}

/// What a call to [`DataLimitCoordinator::handle_fetch`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDecision {
    /// Feature switched off; nothing changed
    Disabled,
    /// Continuation for an earlier query; nothing changed
    Stale,
    /// Another segment was requested; `accepted` is the host's reply
    Requested { accepted: bool },
    /// No further segments will be requested for this query
    Complete,
}

pub struct DataLimitCoordinator {
    host: Rc<dyn VisualHost>,
    feature_enabled: bool,
    state: DataLimitState,
    generation: u64,
}

impl DataLimitCoordinator {
    pub fn new(host: Rc<dyn VisualHost>, feature_enabled: bool) -> Self {
        Self {
            host,
            feature_enabled,
            state: DataLimitState::default(),
            generation: 0,
        }
    }

    pub fn state(&self) -> DataLimitState {
        self.state
    }

    pub fn can_fetch_more(&self) -> bool {
        self.state.can_fetch_more
    }

    pub fn windows_loaded(&self) -> u32 {
        self.state.windows_loaded
    }

    pub fn rows_loaded(&self) -> usize {
        self.state.rows_loaded
    }

    /// Generation of the query currently being loaded
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `options` continues a query that has since been replaced
    pub fn is_stale(&self, options: &VisualUpdateOptions) -> bool {
        self.feature_enabled
            && options.operation_kind != OperationKind::Create
            && options
                .fetch_generation
                .is_some_and(|generation| generation != self.generation)
    }

    /// Update the counters for a data update and request the next segment
    /// when one exists, the override setting allows it and the host has not
    /// yet refused.
    pub fn handle_fetch(
        &mut self,
        options: &VisualUpdateOptions,
        settings: &DataLimitSettings,
    ) -> FetchDecision {
        if !self.feature_enabled {
            tracing::debug!("Fetching more data is disabled");
            return FetchDecision::Disabled;
        }
        if self.is_stale(options) {
            tracing::warn!(
                current = self.generation,
                received = ?options.fetch_generation,
                "Ignoring segment from a superseded query"
            );
            return FetchDecision::Stale;
        }

        let _span = tracing::debug_span!("handle_fetch", generation = self.generation).entered();

        if options.operation_kind == OperationKind::Create {
            self.generation += 1;
            self.state.can_fetch_more = true;
            self.reset_counters();
        } else {
            self.state.windows_loaded += 1;
        }

        let data_view = options.data_view();
        self.state.rows_loaded = data_view.map(|dv| dv.row_count()).unwrap_or(0);
        tracing::debug!(rows = self.state.rows_loaded, "Rows currently available");

        let has_segment = data_view.map(|dv| dv.has_more_segments()).unwrap_or(false);
        if has_segment && settings.override_limit && self.state.can_fetch_more {
            let request = DataFetchRequest {
                generation: self.generation,
            };
            let accepted = self.host.fetch_more_data(request);
            tracing::info!(
                windows = self.state.windows_loaded,
                accepted,
                "Requested another data segment"
            );
            self.state.can_fetch_more = accepted;
            FetchDecision::Requested { accepted }
        } else {
            self.state.can_fetch_more = false;
            FetchDecision::Complete
        }
    }

    fn reset_counters(&mut self) {
        self.state.windows_loaded = 1;
        self.state.rows_loaded = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataview::{DataView, VisualUpdateType};
    use crate::host::testing::RecordingHost;
    use serde_json::json;

    fn options(kind: OperationKind, rows: usize, segment: bool) -> VisualUpdateOptions {
        let mut metadata = json!({"columns": []});
        if segment {
            metadata["segment"] = json!({});
        }
        let rows: Vec<_> = (0..rows).map(|i| json!([i])).collect();
        let dv: DataView = serde_json::from_value(json!({
            "metadata": metadata,
            "table": {"rows": rows}
        }))
        .unwrap();
        let mut options = VisualUpdateOptions::new(VisualUpdateType::Data);
        options.operation_kind = kind;
        options.data_views = vec![dv];
        options
    }

    fn overriding() -> DataLimitSettings {
        DataLimitSettings {
            override_limit: true,
            ..DataLimitSettings::default()
        }
    }

    fn coordinator(host: &Rc<RecordingHost>) -> DataLimitCoordinator {
        DataLimitCoordinator::new(host.clone(), true)
    }

    #[test]
    fn test_create_resets_counters() {
        let host = Rc::new(RecordingHost::new());
        let mut limit = coordinator(&host);

        limit.handle_fetch(&options(OperationKind::Create, 5, false), &overriding());
        assert_eq!(limit.windows_loaded(), 1);
        assert_eq!(limit.rows_loaded(), 5);

        limit.handle_fetch(&options(OperationKind::Append, 8, false), &overriding());
        assert_eq!(limit.windows_loaded(), 2);
        assert_eq!(limit.rows_loaded(), 8);

        limit.handle_fetch(&options(OperationKind::Create, 3, false), &overriding());
        assert_eq!(limit.windows_loaded(), 1);
        assert_eq!(limit.rows_loaded(), 3);
    }

    #[test]
    fn test_continuations_increment_by_one() {
        let host = Rc::new(RecordingHost::new());
        let mut limit = coordinator(&host);
        limit.handle_fetch(&options(OperationKind::Create, 1, true), &overriding());
        for expected in 2..6 {
            limit.handle_fetch(&options(OperationKind::Segment, 1, true), &overriding());
            assert_eq!(limit.windows_loaded(), expected);
        }
    }

    #[test]
    fn test_requests_while_segments_remain() {
        let host = Rc::new(RecordingHost::new());
        let mut limit = coordinator(&host);

        let decision = limit.handle_fetch(&options(OperationKind::Create, 10, true), &overriding());
        assert_eq!(decision, FetchDecision::Requested { accepted: true });
        assert!(limit.can_fetch_more());
        assert_eq!(host.fetch_requests.borrow().len(), 1);

        let decision = limit.handle_fetch(&options(OperationKind::Append, 20, false), &overriding());
        assert_eq!(decision, FetchDecision::Complete);
        assert!(!limit.can_fetch_more());
        assert_eq!(host.fetch_requests.borrow().len(), 1);
    }

    #[test]
    fn test_host_refusal_ends_load() {
        let host = Rc::new(RecordingHost::new());
        host.fetch_response.set(false);
        let mut limit = coordinator(&host);

        let decision = limit.handle_fetch(&options(OperationKind::Create, 10, true), &overriding());
        assert_eq!(decision, FetchDecision::Requested { accepted: false });
        assert!(!limit.can_fetch_more());

        // Refusal is terminal for the query even if the host sends another segment
        limit.handle_fetch(&options(OperationKind::Append, 20, true), &overriding());
        assert_eq!(host.fetch_requests.borrow().len(), 1);
        assert!(!limit.can_fetch_more());
    }

    #[test]
    fn test_no_request_without_override() {
        let host = Rc::new(RecordingHost::new());
        let mut limit = coordinator(&host);
        let decision = limit.handle_fetch(
            &options(OperationKind::Create, 10, true),
            &DataLimitSettings::default(),
        );
        assert_eq!(decision, FetchDecision::Complete);
        assert!(!limit.can_fetch_more());
        assert!(host.fetch_requests.borrow().is_empty());
    }

    #[test]
    fn test_disabled_feature_is_noop() {
        let host = Rc::new(RecordingHost::new());
        let mut limit = DataLimitCoordinator::new(host.clone(), false);
        let decision = limit.handle_fetch(&options(OperationKind::Create, 10, true), &overriding());
        assert_eq!(decision, FetchDecision::Disabled);
        assert_eq!(limit.state(), DataLimitState::default());
        assert!(host.fetch_requests.borrow().is_empty());
    }

    #[test]
    fn test_stale_continuation_is_ignored() {
        let host = Rc::new(RecordingHost::new());
        let mut limit = coordinator(&host);

        limit.handle_fetch(&options(OperationKind::Create, 10, true), &overriding());
        let first = host.fetch_requests.borrow()[0].generation;

        limit.handle_fetch(&options(OperationKind::Create, 4, true), &overriding());
        let second = limit.generation();
        assert_ne!(first, second);
        let before = limit.state();

        let mut late = options(OperationKind::Append, 50, true);
        late.fetch_generation = Some(first);
        assert!(limit.is_stale(&late));
        assert_eq!(limit.handle_fetch(&late, &overriding()), FetchDecision::Stale);
        assert_eq!(limit.state(), before);

        let mut current = options(OperationKind::Append, 8, false);
        current.fetch_generation = Some(second);
        assert!(!limit.is_stale(&current));
        limit.handle_fetch(&current, &overriding());
        assert_eq!(limit.windows_loaded(), 2);
    }
}
