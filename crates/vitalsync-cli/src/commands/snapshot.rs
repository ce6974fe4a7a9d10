use chrono::NaiveDate;
use vitalsync_core::SnapshotBuilder;

use super::{EngineOptions, format_value, make_engine, runtime, source_tag, today};

pub fn run(opts: &EngineOptions, date: Option<NaiveDate>, json: bool) -> anyhow::Result<()> {
    let engine = make_engine(opts)?;
    let date = date.unwrap_or_else(today);
    let snapshot = runtime()?.block_on(engine.snapshot(date));

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let builder = SnapshotBuilder::new(engine.catalog(), &snapshot);
    println!(
        "Snapshot for {date}: {}/{} metrics with data",
        snapshot.len(),
        engine.catalog().len()
    );
    for group in builder.by_category() {
        println!("\n{}", group.category);
        for entry in group.entries {
            println!(
                "  {:<34} {:>10} {:<12} {}",
                entry.name,
                format_value(entry.value),
                entry.unit,
                source_tag(entry.source)
            );
        }
    }

    let missing = builder.missing();
    if !missing.is_empty() {
        println!("\nNo data: {} metrics", missing.len());
    }

    let stats = engine.guard_stats();
    if stats.timeouts + stats.failures > 0 {
        println!(
            "Device reads: {} timed out, {} failed (of {})",
            stats.timeouts, stats.failures, stats.reads
        );
    }
    Ok(())
}
