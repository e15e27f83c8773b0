// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use std::env;
use std::path::Path;

#[cfg(feature = "tui")]
use carbon_dashboard::DashboardSession;
use carbon_dashboard::WorkbookCache;

const DEFAULT_WORKBOOK_PATH: &str = "data/carbon_credits.xlsx";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && args[1] == "inspect" {
        // Inspect mode: print the loaded snapshot and exit
        let rest: Vec<&str> = args[2..].iter().map(String::as_str).collect();
        let as_json = rest.contains(&"--json");
        let path = rest
            .iter()
            .find(|arg| **arg != "--json")
            .copied()
            .unwrap_or(DEFAULT_WORKBOOK_PATH);
        run_inspect(Path::new(path), as_json)?;
    } else {
        // Dashboard mode (default)
        let path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_WORKBOOK_PATH);
        run_ui_mode(Path::new(path))?;
    }

    Ok(())
}

fn run_inspect(path: &Path, as_json: bool) -> Result<()> {
    let mut cache = WorkbookCache::new();

    if as_json {
        // Machine-readable snapshot dump
        let snapshot = cache.load(path)?;
        println!("{}", serde_json::to_string_pretty(&*snapshot)?);
        return Ok(());
    }

    println!("📊 Carbon Credit Dashboard - Workbook Inspect");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Loading workbook: {}", path.display());
    let snapshot = cache.load(path)?;
    println!("✓ Loaded {} sink sheets", snapshot.sink_names.len());

    println!("\n🔧 Unified defaults:");
    println!("   SINK:                    {}", snapshot.unified.sink);
    println!("   Emitter Unit:            {}", snapshot.unified.emitter_unit);
    println!("   Carbon Credits Per Year: {:.2}", snapshot.unified.carbon_credits_per_year);
    println!("   Sink Size:               {:.0}", snapshot.unified.sink_size);
    println!("   Total Project Cost:      {:.2}", snapshot.unified.total_project_cost);
    println!("   Fair Trade Price:        {:.2}", snapshot.unified.fair_trade_price);
    println!("   Total CC Generated:      {:.2}", snapshot.unified.total_cc_generated);
    println!("   Expected Price/CC:       {:.2}", snapshot.unified.expected_price_per_cc);

    println!("\n🌱 Sinks:");
    for name in &snapshot.sink_names {
        let coefficients = &snapshot.sink_coefficients[name];
        let unit = &snapshot.emitter_units[name];
        println!(
            "   {:<30} {:>8.2} CC/yr per {:<7}  cost/unit {:>10.2}",
            name, coefficients.cc_per_year_per_unit, unit.as_str(), coefficients.total_cost_per_unit
        );
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Workbook OK");

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(path: &Path) -> Result<()> {
    println!("🖥️  Loading Carbon Credit Dashboard...\n");

    let mut cache = WorkbookCache::new();
    let session = DashboardSession::open(&mut cache, path);

    if let Some(message) = session.load_error() {
        eprintln!("⚠️  {}", message);
        eprintln!("   Continuing with built-in defaults.\n");
    } else {
        println!("✓ Workbook loaded: {}", path.display());
    }

    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(session, path.display().to_string());
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_path: &Path) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use web UI: cargo run --bin carbon-server --features server");
    std::process::exit(1);
}
