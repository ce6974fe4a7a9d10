pub mod catalog;
pub mod series;
pub mod server;
pub mod snapshot;
pub mod summary;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use vitalsync_core::{
    EngineConfig, HttpCloudSource, MetricAggregationEngine, MetricCatalog, SimulatedCloudSource,
    SimulatedNativeSource, SourceKind,
};

/// Everything needed to assemble an engine from the command line.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub config_path: Option<PathBuf>,
    pub native_latency_ms: u64,
    pub native_failure_rate: f64,
    pub native_missing: Vec<String>,
    pub offline_cloud: bool,
    pub cloud_url: Option<String>,
    pub cloud_token: Option<String>,
    pub seed: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            native_latency_ms: 0,
            native_failure_rate: 0.0,
            native_missing: Vec::new(),
            offline_cloud: false,
            cloud_url: None,
            cloud_token: None,
            seed: 42,
        }
    }
}

/// Load the engine config, falling back to defaults when no path is given.
pub fn load_config(opts: &EngineOptions) -> anyhow::Result<EngineConfig> {
    match &opts.config_path {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Build an engine over the simulated native store.
///
/// The cloud side is a real HTTP client when `--cloud-url` is given, the
/// simulated cloud otherwise.
pub fn make_engine(opts: &EngineOptions) -> anyhow::Result<MetricAggregationEngine> {
    if !(0.0..=1.0).contains(&opts.native_failure_rate) {
        anyhow::bail!(
            "--native-failure-rate must be within 0.0..=1.0, got {}",
            opts.native_failure_rate
        );
    }
    let config = load_config(opts)?;
    let catalog = Arc::new(MetricCatalog::builtin());

    let native = SimulatedNativeSource::new(catalog.clone(), opts.seed)
        .with_latency(Duration::from_millis(opts.native_latency_ms))
        .with_failure_rate(opts.native_failure_rate)
        .with_missing(opts.native_missing.iter().cloned());

    let engine = MetricAggregationEngine::new(catalog.clone(), Arc::new(native), config);
    let engine = match &opts.cloud_url {
        Some(url) => {
            let cloud = HttpCloudSource::new(url.as_str(), opts.cloud_token.clone())
                .context("building cloud history client")?;
            engine.with_cloud(Arc::new(cloud))
        }
        None => engine.with_cloud(Arc::new(
            SimulatedCloudSource::new(catalog, opts.seed).offline(opts.offline_cloud),
        )),
    };
    Ok(engine)
}

/// Runtime for one-shot commands.
pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Render a value with a precision suited to its magnitude.
pub fn format_value(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1000.0 {
        format!("{value:.0}")
    } else if abs >= 10.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    }
}

/// Short provenance tag for table output.
pub fn source_tag(source: Option<SourceKind>) -> &'static str {
    match source {
        Some(SourceKind::Native) => "device",
        Some(SourceKind::Cloud) => "cloud",
        None => "-",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // -----------------------------------------------------------------------
    // make_engine tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_make_engine_defaults() {
        let engine = make_engine(&EngineOptions::default()).unwrap();
        assert!(engine.has_cloud());
        assert_eq!(engine.config(), &EngineConfig::default());
        assert!(engine.catalog().len() >= 100);
    }

    #[test]
    fn test_make_engine_rejects_bad_failure_rate() {
        let opts = EngineOptions {
            native_failure_rate: 1.5,
            ..EngineOptions::default()
        };
        assert!(make_engine(&opts).is_err());
    }

    #[test]
    fn test_make_engine_with_http_cloud() {
        let opts = EngineOptions {
            cloud_url: Some("http://127.0.0.1:9".into()),
            cloud_token: Some("t".into()),
            ..EngineOptions::default()
        };
        assert!(make_engine(&opts).unwrap().has_cloud());
    }

    #[test]
    fn test_make_engine_reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"native_timeout_ms": 250, "trend": "off"}}"#).unwrap();
        let opts = EngineOptions {
            config_path: Some(file.path().to_path_buf()),
            ..EngineOptions::default()
        };
        let engine = make_engine(&opts).unwrap();
        assert_eq!(engine.config().native_timeout_ms, 250);
        assert_eq!(engine.config().cloud_timeout_ms, 15_000);
    }

    #[test]
    fn test_make_engine_missing_config_is_error() {
        let opts = EngineOptions {
            config_path: Some(PathBuf::from("/definitely/not/here.json")),
            ..EngineOptions::default()
        };
        let Err(err) = make_engine(&opts) else {
            panic!("expected make_engine to fail");
        };
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn test_make_engine_invalid_config_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_concurrent_reads": 0}}"#).unwrap();
        let opts = EngineOptions {
            config_path: Some(file.path().to_path_buf()),
            ..EngineOptions::default()
        };
        assert!(make_engine(&opts).is_err());
    }

    // -----------------------------------------------------------------------
    // Formatting
    // -----------------------------------------------------------------------

    #[test]
    fn test_format_value_precision() {
        assert_eq!(format_value(12345.6), "12346");
        assert_eq!(format_value(72.34), "72.3");
        assert_eq!(format_value(0.5), "0.50");
        assert_eq!(format_value(0.0), "0.00");
    }

    #[test]
    fn test_source_tag() {
        assert_eq!(source_tag(Some(SourceKind::Native)), "device");
        assert_eq!(source_tag(Some(SourceKind::Cloud)), "cloud");
        assert_eq!(source_tag(None), "-");
    }
}
