// 📊 Workbook Loader - Excel → WorkbookSnapshot
// Reads the carbon-credit economics workbook and builds an immutable snapshot

use crate::metrics::{emitter_unit_for, EmitterUnit};
use calamine::{open_workbook_auto, Data, Range, Reader};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// FIXED CELL POSITIONS (0-based row, col)
// ============================================================================

// Unified sheet: B1..B4 hold the sink-level defaults, E1..E4 the financial ones
pub const UNIFIED_SINK_CELL: (u32, u32) = (0, 1); // B1
pub const UNIFIED_EMITTER_UNIT_CELL: (u32, u32) = (1, 1); // B2
pub const UNIFIED_CC_PER_YEAR_CELL: (u32, u32) = (2, 1); // B3
pub const UNIFIED_SINK_SIZE_CELL: (u32, u32) = (3, 1); // B4
pub const UNIFIED_TOTAL_COST_CELL: (u32, u32) = (0, 4); // E1
pub const UNIFIED_FAIR_TRADE_CELL: (u32, u32) = (1, 4); // E2
pub const UNIFIED_TOTAL_CC_CELL: (u32, u32) = (2, 4); // E3
pub const UNIFIED_EXPECTED_PRICE_CELL: (u32, u32) = (3, 4); // E4

// Every sink sheet exposes its two coefficients at the same positions
pub const SINK_CC_PER_YEAR_CELL: (u32, u32) = (3, 1); // B4
pub const SINK_TOTAL_COST_CELL: (u32, u32) = (5, 5); // F6

/// Substring that identifies the default-configuration sheet (case-insensitive)
pub const UNIFIED_SHEET_MARKER: &str = "unified";

pub const DEFAULT_SINK: &str = "Biofertilizers";
pub const DEFAULT_EMITTER_UNIT: &str = "Hectare";

// ============================================================================
// SNAPSHOT TYPES
// ============================================================================

/// Defaults read from the unified configuration sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedConfig {
    pub sink: String,
    pub emitter_unit: String,
    pub carbon_credits_per_year: f64,
    pub sink_size: f64,
    pub total_project_cost: f64,
    pub fair_trade_price: f64,
    pub total_cc_generated: f64,
    pub expected_price_per_cc: f64,
}

/// Per-unit economics of one carbon sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SinkCoefficients {
    pub cc_per_year_per_unit: f64,
    pub total_cost_per_unit: f64,
}

/// Result of one successful workbook load. Immutable for the session.
///
/// Invariant: `sink_coefficients` and `emitter_units` hold exactly one entry
/// per name in `sink_names`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkbookSnapshot {
    pub unified: UnifiedConfig,
    pub sink_coefficients: HashMap<String, SinkCoefficients>,
    pub sink_names: Vec<String>,
    pub emitter_units: HashMap<String, EmitterUnit>,
}

// ============================================================================
// LOAD ERRORS
// ============================================================================

#[derive(Debug)]
pub enum LoadError {
    /// No sheet name contains "unified" (case-insensitive)
    MissingSheet,
    /// Any other open/read/format error from the workbook reader
    Workbook(calamine::Error),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::MissingSheet => {
                write!(f, "could not find 'UNIFIED USER INPUT' sheet in Excel file")
            }
            LoadError::Workbook(e) => write!(f, "error loading Excel file: {}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::MissingSheet => None,
            LoadError::Workbook(e) => Some(e),
        }
    }
}

impl From<calamine::Error> for LoadError {
    fn from(e: calamine::Error) -> Self {
        LoadError::Workbook(e)
    }
}

// ============================================================================
// CELL CONVERSION
// ============================================================================

/// Total conversion from a raw cell to a number. Numbers pass through,
/// integers, booleans and numeric text coerce; everything else (empty,
/// missing, non-numeric text, error cells) is 0.0. Never fails.
pub fn cell_to_number(cell: Option<&Data>) -> f64 {
    match cell {
        Some(Data::Float(f)) => *f,
        Some(Data::Int(i)) => *i as f64,
        Some(Data::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(Data::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Text cell with a fixed default for empty or non-text values
fn cell_to_text(cell: Option<&Data>, default: &str) -> String {
    match cell {
        Some(Data::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => default.to_string(),
    }
}

// ============================================================================
// LOADER
// ============================================================================

/// Load the workbook at `path` into a snapshot.
///
/// Formula cells yield their last computed value; nothing is recalculated.
/// Every sheet whose name does not contain "unified" becomes a sink, keyed by
/// its whitespace-trimmed name.
pub fn load_workbook(path: &Path) -> Result<WorkbookSnapshot, LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names();

    let unified_name = sheet_names
        .iter()
        .find(|name| is_unified_sheet(name))
        .cloned()
        .ok_or(LoadError::MissingSheet)?;

    let range = workbook.worksheet_range(&unified_name)?;
    let unified = UnifiedConfig {
        sink: cell_to_text(range.get_value(UNIFIED_SINK_CELL), DEFAULT_SINK),
        emitter_unit: cell_to_text(range.get_value(UNIFIED_EMITTER_UNIT_CELL), DEFAULT_EMITTER_UNIT),
        carbon_credits_per_year: cell_to_number(range.get_value(UNIFIED_CC_PER_YEAR_CELL)),
        sink_size: cell_to_number(range.get_value(UNIFIED_SINK_SIZE_CELL)),
        total_project_cost: cell_to_number(range.get_value(UNIFIED_TOTAL_COST_CELL)),
        fair_trade_price: cell_to_number(range.get_value(UNIFIED_FAIR_TRADE_CELL)),
        total_cc_generated: cell_to_number(range.get_value(UNIFIED_TOTAL_CC_CELL)),
        expected_price_per_cc: cell_to_number(range.get_value(UNIFIED_EXPECTED_PRICE_CELL)),
    };

    let mut sink_names = Vec::new();
    let mut sink_coefficients = HashMap::new();
    let mut emitter_units = HashMap::new();

    for sheet_name in &sheet_names {
        if is_unified_sheet(sheet_name) {
            continue;
        }

        let display_name = sheet_name.trim().to_string();
        if sink_coefficients.contains_key(&display_name) {
            // Two sheet names trimming to the same sink; first one wins
            continue;
        }

        let range = workbook.worksheet_range(sheet_name)?;
        sink_coefficients.insert(display_name.clone(), read_coefficients(&range));
        emitter_units.insert(display_name.clone(), emitter_unit_for(&display_name));
        sink_names.push(display_name);
    }

    Ok(WorkbookSnapshot {
        unified,
        sink_coefficients,
        sink_names,
        emitter_units,
    })
}

fn is_unified_sheet(name: &str) -> bool {
    name.to_lowercase().contains(UNIFIED_SHEET_MARKER)
}

fn read_coefficients(range: &Range<Data>) -> SinkCoefficients {
    SinkCoefficients {
        cc_per_year_per_unit: cell_to_number(range.get_value(SINK_CC_PER_YEAR_CELL)),
        total_cost_per_unit: cell_to_number(range.get_value(SINK_TOTAL_COST_CELL)),
    }
}

// ============================================================================
// MEMOIZED LOADS
// ============================================================================

/// Memoization table over `load_workbook`, keyed by path.
///
/// The workbook is not expected to change during a session, so a repeated
/// path returns the previously computed snapshot without touching the file.
/// Failed loads are not cached; each call with a bad path retries.
pub struct WorkbookCache {
    snapshots: HashMap<String, Arc<WorkbookSnapshot>>,
}

impl WorkbookCache {
    pub fn new() -> Self {
        WorkbookCache {
            snapshots: HashMap::new(),
        }
    }

    pub fn load(&mut self, path: &Path) -> Result<Arc<WorkbookSnapshot>, LoadError> {
        let key = cache_key(path);
        if let Some(snapshot) = self.snapshots.get(&key) {
            return Ok(Arc::clone(snapshot));
        }

        let snapshot = Arc::new(load_workbook(path)?);
        self.snapshots.insert(key, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Drop the cached snapshot for `path`, forcing a re-read on next load
    pub fn invalidate(&mut self, path: &Path) {
        self.snapshots.remove(&cache_key(path));
    }
}

impl Default for WorkbookCache {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("carbon_credits.xlsx");
        let mut workbook = Workbook::new();

        let unified = workbook.add_worksheet();
        unified.set_name("UNIFIED USER INPUT").unwrap();
        unified.write_string(0, 1, "Biofertilizers").unwrap();
        unified.write_string(1, 1, "Hectare").unwrap();
        unified.write_number(2, 1, 1.2).unwrap();
        unified.write_number(3, 1, 150000.0).unwrap();
        unified.write_number(0, 4, 900000.0).unwrap();
        unified.write_number(1, 4, 5.0).unwrap();
        unified.write_number(2, 4, 180000.0).unwrap();
        unified.write_number(3, 4, 7.5).unwrap();

        let bio = workbook.add_worksheet();
        bio.set_name("Biofertilizers").unwrap();
        bio.write_number(3, 1, 1.2).unwrap();
        bio.write_number(5, 5, 40.0).unwrap();

        let awd = workbook.add_worksheet();
        awd.set_name("AWD in Paddy").unwrap();
        awd.write_number(3, 1, 3.5).unwrap();
        awd.write_number(5, 5, 120.0).unwrap();

        // Leading space in the sheet name; numeric text and a junk cost cell
        let solar = workbook.add_worksheet();
        solar.set_name(" SolarIrrigation Efficiency").unwrap();
        solar.write_string(3, 1, "2.0").unwrap();
        solar.write_string(5, 5, "not a number").unwrap();

        workbook.save(&path).unwrap();
        path
    }

    #[test]
    fn test_load_builds_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        let snapshot = load_workbook(&path).unwrap();

        assert_eq!(snapshot.unified.sink, "Biofertilizers");
        assert_eq!(snapshot.unified.emitter_unit, "Hectare");
        assert_eq!(snapshot.unified.carbon_credits_per_year, 1.2);
        assert_eq!(snapshot.unified.sink_size, 150000.0);
        assert_eq!(snapshot.unified.total_project_cost, 900000.0);
        assert_eq!(snapshot.unified.fair_trade_price, 5.0);
        assert_eq!(snapshot.unified.total_cc_generated, 180000.0);
        assert_eq!(snapshot.unified.expected_price_per_cc, 7.5);

        assert_eq!(
            snapshot.sink_names,
            vec!["Biofertilizers", "AWD in Paddy", "SolarIrrigation Efficiency"]
        );

        let bio = &snapshot.sink_coefficients["Biofertilizers"];
        assert_eq!(bio.cc_per_year_per_unit, 1.2);
        assert_eq!(bio.total_cost_per_unit, 40.0);
    }

    #[test]
    fn test_snapshot_invariant_one_entry_per_sink() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        let snapshot = load_workbook(&path).unwrap();

        assert_eq!(snapshot.sink_coefficients.len(), snapshot.sink_names.len());
        assert_eq!(snapshot.emitter_units.len(), snapshot.sink_names.len());
        for name in &snapshot.sink_names {
            assert!(snapshot.sink_coefficients.contains_key(name));
            assert!(snapshot.emitter_units.contains_key(name));
        }
    }

    #[test]
    fn test_sink_names_are_trimmed() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        let snapshot = load_workbook(&path).unwrap();

        // " SolarIrrigation Efficiency" sheet shows up trimmed, unit derived
        assert!(snapshot
            .sink_names
            .contains(&"SolarIrrigation Efficiency".to_string()));
        assert_eq!(
            snapshot.emitter_units["SolarIrrigation Efficiency"],
            EmitterUnit::Unit
        );
        assert_eq!(snapshot.emitter_units["Biofertilizers"], EmitterUnit::Hectare);
    }

    #[test]
    fn test_numeric_text_coerces_junk_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        let snapshot = load_workbook(&path).unwrap();
        let solar = &snapshot.sink_coefficients["SolarIrrigation Efficiency"];

        assert_eq!(solar.cc_per_year_per_unit, 2.0); // "2.0" as text
        assert_eq!(solar.total_cost_per_unit, 0.0); // "not a number"
    }

    #[test]
    fn test_unified_detection_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mixed_case.xlsx");

        let mut workbook = Workbook::new();
        let unified = workbook.add_worksheet();
        unified.set_name("Unified User Input").unwrap();
        unified.write_string(0, 1, "AWD in Paddy").unwrap();
        let sink = workbook.add_worksheet();
        sink.set_name("AWD in Paddy").unwrap();
        sink.write_number(3, 1, 3.5).unwrap();
        sink.write_number(5, 5, 120.0).unwrap();
        workbook.save(&path).unwrap();

        let snapshot = load_workbook(&path).unwrap();
        assert_eq!(snapshot.unified.sink, "AWD in Paddy");
        assert_eq!(snapshot.sink_names, vec!["AWD in Paddy"]);
    }

    #[test]
    fn test_empty_unified_cells_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sparse.xlsx");

        let mut workbook = Workbook::new();
        let unified = workbook.add_worksheet();
        unified.set_name("UNIFIED USER INPUT").unwrap();
        // Only one cell written; everything else is missing
        unified.write_number(2, 1, 0.8).unwrap();
        workbook.save(&path).unwrap();

        let snapshot = load_workbook(&path).unwrap();
        assert_eq!(snapshot.unified.sink, DEFAULT_SINK);
        assert_eq!(snapshot.unified.emitter_unit, DEFAULT_EMITTER_UNIT);
        assert_eq!(snapshot.unified.carbon_credits_per_year, 0.8);
        assert_eq!(snapshot.unified.sink_size, 0.0);
        assert_eq!(snapshot.unified.total_project_cost, 0.0);
        assert!(snapshot.sink_names.is_empty());
    }

    #[test]
    fn test_missing_unified_sheet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no_unified.xlsx");

        let mut workbook = Workbook::new();
        let sink = workbook.add_worksheet();
        sink.set_name("Biofertilizers").unwrap();
        sink.write_number(3, 1, 1.2).unwrap();
        workbook.save(&path).unwrap();

        let err = load_workbook(&path).unwrap_err();
        assert!(matches!(err, LoadError::MissingSheet));
    }

    #[test]
    fn test_nonexistent_file_is_workbook_error() {
        let err = load_workbook(Path::new("/no/such/carbon_credits.xlsx")).unwrap_err();
        assert!(matches!(err, LoadError::Workbook(_)));
    }

    #[test]
    fn test_cell_to_number_is_total() {
        assert_eq!(cell_to_number(None), 0.0);
        assert_eq!(cell_to_number(Some(&Data::Empty)), 0.0);
        assert_eq!(cell_to_number(Some(&Data::Float(2.5))), 2.5);
        assert_eq!(cell_to_number(Some(&Data::Int(7))), 7.0);
        assert_eq!(cell_to_number(Some(&Data::Bool(true))), 1.0);
        assert_eq!(cell_to_number(Some(&Data::Bool(false))), 0.0);
        assert_eq!(cell_to_number(Some(&Data::String(" 3.25 ".to_string()))), 3.25);
        assert_eq!(cell_to_number(Some(&Data::String("abc".to_string()))), 0.0);
        assert_eq!(cell_to_number(Some(&Data::String(String::new()))), 0.0);
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        let snapshot = load_workbook(&path).unwrap();
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["unified"]["sink"], "Biofertilizers");
        assert_eq!(value["unified"]["sink_size"], 150000.0);
        assert_eq!(
            value["sink_coefficients"]["Biofertilizers"]["cc_per_year_per_unit"],
            1.2
        );
        assert_eq!(value["emitter_units"]["SolarIrrigation Efficiency"], "Unit");
        assert_eq!(value["emitter_units"]["Biofertilizers"], "Hectare");
    }

    #[test]
    fn test_cache_returns_snapshot_without_rereading() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        let mut cache = WorkbookCache::new();
        let first = cache.load(&path).unwrap();

        // Even with the file gone, the cached snapshot is reused
        std::fs::remove_file(&path).unwrap();
        let second = cache.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_cache_invalidate_forces_reload() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        let mut cache = WorkbookCache::new();
        let first = cache.load(&path).unwrap();

        cache.invalidate(&path);
        let second = cache.load(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.xlsx");

        let mut cache = WorkbookCache::new();
        assert!(cache.load(&path).is_err());

        // The file shows up afterwards; the next load succeeds
        write_fixture_at(&path);
        assert!(cache.load(&path).is_ok());
    }

    fn write_fixture_at(path: &Path) {
        let mut workbook = Workbook::new();
        let unified = workbook.add_worksheet();
        unified.set_name("UNIFIED USER INPUT").unwrap();
        unified.write_string(0, 1, "Biofertilizers").unwrap();
        workbook.save(path).unwrap();
    }
}
