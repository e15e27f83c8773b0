// 💰 Derived Metrics - the pricing arithmetic behind the dashboard
// Pure functions over a WorkbookSnapshot; recomputed on every interaction

use crate::workbook::WorkbookSnapshot;
use serde::Serialize;

/// Expected price is fair trade price inflated by this fixed margin.
/// Hardcoded business assumption; not configurable.
pub const EXPECTED_PRICE_MARGIN: f64 = 1.5;

// ============================================================================
// EMITTER UNIT
// ============================================================================

/// Measurement unit for sink size: land-based sinks are sized in hectares,
/// equipment-based sinks (solar, irrigation) per unit installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EmitterUnit {
    #[default]
    Hectare,
    Unit,
}

impl EmitterUnit {
    pub fn as_str(&self) -> &str {
        match self {
            EmitterUnit::Hectare => "Hectare",
            EmitterUnit::Unit => "Unit",
        }
    }
}

impl std::fmt::Display for EmitterUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "Unit" iff the sink name contains "solar" or "irrigation"
/// (case-insensitive), otherwise "Hectare". No overrides from sheet contents.
pub fn emitter_unit_for(sink: &str) -> EmitterUnit {
    let lower = sink.to_lowercase();
    if lower.contains("solar") || lower.contains("irrigation") {
        EmitterUnit::Unit
    } else {
        EmitterUnit::Hectare
    }
}

// ============================================================================
// DERIVED METRICS
// ============================================================================

/// Financial metrics for one (sink, size) selection. Ephemeral; holds no
/// identity and is recomputed from the snapshot on every change.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DerivedMetrics {
    pub emitter_unit: EmitterUnit,
    pub carbon_credits_per_year: f64,
    pub total_cc_generated: f64,
    pub total_project_cost: f64,
    pub fair_trade_price: f64,
    pub expected_price_per_cc: f64,
}

/// Compute the derived metrics for `sink` at `size`.
///
/// Total and pure: an absent snapshot, empty or unknown sink name, or zero
/// credits all degrade to 0.0 outputs (emitter unit Hectare) instead of
/// failing. The fair trade price guards against division by zero.
pub fn calculate(sink: &str, size: f64, snapshot: Option<&WorkbookSnapshot>) -> DerivedMetrics {
    let snapshot = match snapshot {
        Some(s) => s,
        None => return DerivedMetrics::default(),
    };

    if sink.is_empty() {
        return DerivedMetrics::default();
    }

    let coefficients = match snapshot.sink_coefficients.get(sink) {
        Some(c) => *c,
        None => return DerivedMetrics::default(),
    };

    let carbon_credits_per_year = coefficients.cc_per_year_per_unit;
    let total_cc_generated = carbon_credits_per_year * size;
    let total_project_cost = coefficients.total_cost_per_unit * size;
    let fair_trade_price = if total_cc_generated > 0.0 {
        total_project_cost / total_cc_generated
    } else {
        0.0
    };
    let expected_price_per_cc = fair_trade_price * EXPECTED_PRICE_MARGIN;

    DerivedMetrics {
        emitter_unit: snapshot
            .emitter_units
            .get(sink)
            .copied()
            .unwrap_or(EmitterUnit::Hectare),
        carbon_credits_per_year,
        total_cc_generated,
        total_project_cost,
        fair_trade_price,
        expected_price_per_cc,
    }
}

// ============================================================================
// TESTS
// ============================================================================
