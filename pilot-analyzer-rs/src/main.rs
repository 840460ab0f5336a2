// pilot-analyzer-rs/src/main.rs
// Pilot Study Analysis - offline report over telemetry partitions
//
// Reads the date-partitioned JSONL files the capture side wrote and
// prints the summary report to stdout. Exits non-zero only when no
// analysis is possible at all: a date argument that does not parse, or
// a missing analytics directory. Missing partitions inside a valid
// range are simply zero events.

use std::path::PathBuf;

use clap::Parser;

use pilot_analyzer::{load_partitions, DateFilter, PilotReport};

#[derive(Parser)]
#[command(name = "pilot-analyzer")]
#[command(about = "Summarize pilot study telemetry from date-partitioned JSONL files")]
#[command(version)]
struct Args {
    /// Single day (YYYYMMDD) or inclusive range (YYYYMMDD-YYYYMMDD);
    /// analyzes every partition when omitted
    date_range: Option<String>,

    /// Directory holding the pilot_data_<YYYYMMDD>.jsonl partitions
    #[arg(long, env = "ANALYTICS_DIR", default_value = "analytics")]
    dir: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let filter = match args.date_range.as_deref() {
        Some(arg) => DateFilter::parse(arg)?,
        None => DateFilter::All,
    };

    let scan = load_partitions(&args.dir, &filter)?;
    let report = PilotReport::build(&scan);
    print!("{}", report.render());

    println!(
        "\nAnalysis complete. Analyzed {} events across {} partition file(s).",
        scan.records.len(),
        scan.partitions_read
    );
    println!("Analytics data location: {}", args.dir.display());

    Ok(())
}
