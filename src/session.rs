// 🎛️ Dashboard Session - the one active (sink, size) configuration
// Owns the load outcome and recomputes metrics on every input change

use crate::metrics::{calculate, DerivedMetrics};
use crate::workbook::{LoadError, WorkbookCache, WorkbookSnapshot};
use std::path::Path;
use std::sync::Arc;

/// Default sink size when the workbook gives none
pub const DEFAULT_SINK_SIZE: f64 = 200000.0;

/// Sink list shown when the workbook could not be loaded
pub const FALLBACK_SINK_OPTIONS: [&str; 4] = [
    "AWD in Paddy",
    "Crop Residue Management",
    "Biofertilizers",
    "SolarIrrigation Efficiency",
];

/// Process-local interaction state for one running dashboard.
///
/// A failed load is reported once (the message is kept for display) and the
/// session continues on the built-in fallback sink list; it never aborts.
pub struct DashboardSession {
    snapshot: Option<Arc<WorkbookSnapshot>>,
    load_error: Option<String>,
    sink_options: Vec<String>,
    sink: String,
    size: f64,
}

impl DashboardSession {
    /// Open a session over the workbook at `path`, going through the cache
    pub fn open(cache: &mut WorkbookCache, path: &Path) -> Self {
        match cache.load(path) {
            Ok(snapshot) => Self::from_snapshot(snapshot),
            Err(e) => Self::fallback(e),
        }
    }

    pub fn from_snapshot(snapshot: Arc<WorkbookSnapshot>) -> Self {
        let sink_options = snapshot.sink_names.clone();

        // Default selection: the unified sheet's sink if it is a known option
        let sink = if sink_options.iter().any(|name| name == &snapshot.unified.sink) {
            snapshot.unified.sink.clone()
        } else {
            sink_options.first().cloned().unwrap_or_default()
        };

        let size = if snapshot.unified.sink_size > 0.0 {
            snapshot.unified.sink_size
        } else {
            DEFAULT_SINK_SIZE
        };

        DashboardSession {
            snapshot: Some(snapshot),
            load_error: None,
            sink_options,
            sink,
            size,
        }
    }

    pub fn fallback(error: LoadError) -> Self {
        let sink_options: Vec<String> =
            FALLBACK_SINK_OPTIONS.iter().map(|s| s.to_string()).collect();
        let sink = sink_options[0].clone();

        DashboardSession {
            snapshot: None,
            load_error: Some(error.to_string()),
            sink_options,
            sink,
            size: DEFAULT_SINK_SIZE,
        }
    }

    pub fn snapshot(&self) -> Option<&WorkbookSnapshot> {
        self.snapshot.as_deref()
    }

    /// The load failure message, if the session is running on fallbacks
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn sink_options(&self) -> &[String] {
        &self.sink_options
    }

    pub fn sink(&self) -> &str {
        &self.sink
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn selected_index(&self) -> usize {
        self.sink_options
            .iter()
            .position(|name| name == &self.sink)
            .unwrap_or(0)
    }

    pub fn select_sink(&mut self, sink: &str) {
        self.sink = sink.to_string();
    }

    pub fn select_next(&mut self) {
        if self.sink_options.is_empty() {
            return;
        }
        let i = (self.selected_index() + 1) % self.sink_options.len();
        self.sink = self.sink_options[i].clone();
    }

    pub fn select_previous(&mut self) {
        if self.sink_options.is_empty() {
            return;
        }
        let i = match self.selected_index() {
            0 => self.sink_options.len() - 1,
            i => i - 1,
        };
        self.sink = self.sink_options[i].clone();
    }

    /// Sink size is non-negative; anything below zero clamps to zero
    pub fn set_size(&mut self, size: f64) {
        self.size = if size.is_finite() && size > 0.0 { size } else { 0.0 };
    }

    /// Recompute the derived metrics for the current (sink, size)
    pub fn metrics(&self) -> DerivedMetrics {
        calculate(&self.sink, self.size, self.snapshot())
    }
}

// ============================================================================
// TESTS
// ============================================================================
