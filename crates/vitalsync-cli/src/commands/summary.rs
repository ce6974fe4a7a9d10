use chrono::NaiveDate;
use vitalsync_core::{SnapshotBuilder, SourceKind};

use super::{EngineOptions, format_value, make_engine, runtime, source_tag, today};

pub fn run(opts: &EngineOptions, date: Option<NaiveDate>, top: usize) -> anyhow::Result<()> {
    let engine = make_engine(opts)?;
    let date = date.unwrap_or_else(today);
    let snapshot = runtime()?.block_on(engine.snapshot(date));
    let builder = SnapshotBuilder::new(engine.catalog(), &snapshot);

    println!("Summary for {date}");
    println!();
    for entry in builder.top_n(top) {
        println!(
            "  {:<34} {:>10} {:<12} {}",
            entry.name,
            format_value(entry.value),
            entry.unit,
            source_tag(entry.source)
        );
    }

    println!();
    println!("  {:<16} {:>6}", "category", "with data");
    for group in builder.by_category() {
        let total = engine.catalog().by_category(group.category).len();
        println!(
            "  {:<16} {:>6}/{total}",
            group.category.to_string(),
            group.entries.len()
        );
    }

    let cloud = snapshot
        .iter()
        .filter(|(id, _)| snapshot.source_of(id) == Some(SourceKind::Cloud))
        .count();
    println!();
    println!(
        "  {} metrics with data, {cloud} from cloud, {} without data",
        snapshot.len(),
        builder.missing().len()
    );
    Ok(())
}
