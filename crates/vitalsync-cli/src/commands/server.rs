use std::sync::Arc;

use super::{EngineOptions, make_engine, runtime};

pub fn run(opts: &EngineOptions, host: &str, port: u16) -> anyhow::Result<()> {
    let engine = Arc::new(make_engine(opts)?);

    let base = format!("http://{host}:{port}");
    let cloud = match &opts.cloud_url {
        Some(url) => url.as_str(),
        None if opts.offline_cloud => "simulated (offline)",
        None => "simulated",
    };

    println!("vitalsync server v{}", vitalsync_core::VERSION);
    println!("   {base}");
    println!("   {} metrics, cloud history: {cloud}", engine.catalog().len());
    println!();
    println!("   Endpoints:");
    println!("     GET /                          API index (try: curl {base})");
    println!("     GET /health                    Device read counters");
    println!("     GET /metrics?category=         Metric catalog");
    println!("     GET /api/v1/snapshot?date=     Every metric with data for one day");
    println!("     GET /api/v1/series/<metric>    Readings and stats (?days=N&end= or ?start=&end=)");
    println!("     GET /api/v1/summary?top=N      Headline metrics by category");
    println!();
    println!("   Examples:");
    println!("     curl {base}/api/v1/snapshot");
    println!("     curl {base}/api/v1/series/steps?days=30");
    println!("     curl {base}/metrics?category=heart");
    println!();

    runtime()?.block_on(vitalsync_server::run_server(engine, host, port))?;
    Ok(())
}
