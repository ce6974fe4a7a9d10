use chrono::NaiveDate;
use vitalsync_core::{DateRange, MetricSeries};

use super::{EngineOptions, format_value, make_engine, runtime, source_tag, today};

pub fn run(
    opts: &EngineOptions,
    metric: &str,
    days: u32,
    end: Option<NaiveDate>,
    json: bool,
) -> anyhow::Result<()> {
    let engine = make_engine(opts)?;
    let range = DateRange::last_days(end.unwrap_or_else(today), days)?;

    if engine.catalog().definition_of(metric).is_none() {
        log::warn!("'{metric}' is not in the catalog; see `vitalsync catalog`");
    }
    let series = runtime()?.block_on(engine.series(metric, range));

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
    } else {
        let unit = engine
            .catalog()
            .definition_of(metric)
            .map(|d| d.unit)
            .unwrap_or("");
        print_series(&series, unit);
    }
    Ok(())
}

fn print_series(series: &MetricSeries, unit: &str) {
    println!(
        "{} over {} ({} days) from {}",
        series.metric_id,
        series.range,
        series.range.days(),
        source_tag(series.source)
    );
    if !series.has_data() {
        println!("  no data");
        return;
    }

    for point in &series.points {
        let bounds = match (point.min, point.max) {
            (Some(lo), Some(hi)) => format!("  [{} - {}]", format_value(lo), format_value(hi)),
            _ => String::new(),
        };
        println!(
            "  {}  {:>10} {unit}{bounds}",
            point.timestamp.format("%Y-%m-%d %H:%M"),
            format_value(point.value)
        );
    }

    let s = &series.stats;
    println!();
    println!("  total    {:>10} {unit}", format_value(s.total));
    println!("  average  {:>10} {unit}", format_value(s.average));
    println!("  min      {:>10} {unit}", format_value(s.min));
    println!("  max      {:>10} {unit}", format_value(s.max));
    println!("  trend    {:>+9.1}%", s.trend_percent);
}
