// Carbon Credit Dashboard - Core Library
// Exposes the loader, calculator, and session for use in CLI, API server, and tests

pub mod metrics;
pub mod session;
pub mod workbook;

// Re-export commonly used types
pub use metrics::{calculate, emitter_unit_for, DerivedMetrics, EmitterUnit, EXPECTED_PRICE_MARGIN};
pub use session::{DashboardSession, DEFAULT_SINK_SIZE, FALLBACK_SINK_OPTIONS};
pub use workbook::{
    cell_to_number, load_workbook, LoadError, SinkCoefficients, UnifiedConfig, WorkbookCache,
    WorkbookSnapshot,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
