//! Logging bootstrap for attrscope tools
//!
//! Console output on stderr as `timestamp [LEVEL] message`, an optional
//! daily-rolling file under `log_dir`, and a filter that can be swapped at
//! runtime from the REPL (`log debug`).

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::{Layered, SubscriberExt},
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type FilteredRegistry = Layered<reload::Layer<EnvFilter, Registry>, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

/// Bracketed label and ANSI color for a level
fn level_style(level: Level) -> (&'static str, &'static str) {
    match level {
        Level::ERROR => ("[ERROR]", "\x1b[31m"),
        Level::WARN => ("[WARN]", "\x1b[33m"),
        Level::INFO => ("[INFO]", "\x1b[32m"),
        Level::DEBUG => ("[DEBUG]", "\x1b[34m"),
        Level::TRACE => ("[TRACE]", "\x1b[35m"),
    }
}

/// Event line: `2026-10-17T08:12:03.114Z [WARN] 0x0003: Not supported`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        let (label, color) = level_style(*event.metadata().level());
        if writer.has_ansi_escapes() {
            write!(writer, "{stamp} {color}{label}\x1b[0m ")?;
        } else {
            write!(writer, "{stamp} {label} ")?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Reload handle plus the filter string currently applied
struct FilterControl {
    handle: reload::Handle<EnvFilter, Registry>,
    spec: Mutex<String>,
}

static FILTER: OnceLock<FilterControl> = OnceLock::new();
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter target and log file prefix
    pub service_name: String,
    /// Used when `RUST_LOG` is unset
    pub console_level: Level,
    /// `None` keeps logging on the console only
    pub log_dir: Option<PathBuf>,
    /// JSON lines in the log file instead of bracketed text
    pub enable_json: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "attrscope".to_string(),
            console_level: Level::INFO,
            log_dir: None,
            enable_json: false,
            ansi: true,
        }
    }
}

/// `RUST_LOG` if set, otherwise the console level with the service's own
/// target kept at debug when the console level is quieter than that.
fn filter_spec(config: &LogConfig) -> String {
    match std::env::var("RUST_LOG") {
        Ok(spec) if !spec.trim().is_empty() => spec,
        _ => {
            let level = config.console_level.as_str().to_ascii_lowercase();
            if config.console_level < Level::DEBUG {
                let target = config.service_name.replace('-', "_");
                format!("{level},{target}=debug")
            } else {
                level
            }
        },
    }
}

fn file_layer(config: &LogConfig, dir: &Path) -> std::io::Result<BoxedLayer> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);

    let layer = fmt::layer().with_writer(writer).with_ansi(false);
    Ok(if config.enable_json {
        layer.json().with_target(true).boxed()
    } else {
        layer.event_format(BracketedLevelFormat).boxed()
    })
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_with_config(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let spec = filter_spec(&config);
    let (filter, handle) = reload::Layer::new(EnvFilter::try_new(&spec)?);

    let mut layers: Vec<BoxedLayer> = vec![fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .event_format(BracketedLevelFormat)
        .boxed()];
    if let Some(dir) = &config.log_dir {
        layers.push(file_layer(&config, dir)?);
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init()?;

    let _ = FILTER.set(FilterControl {
        handle,
        spec: Mutex::new(spec),
    });
    tracing::debug!(service = %config.service_name, log_dir = ?config.log_dir, "logging ready");
    Ok(())
}

/// Console-only init from a level name; unknown names fall back to info
pub fn init(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    init_with_config(LogConfig {
        console_level: level.parse().unwrap_or(Level::INFO),
        ..Default::default()
    })
}

/// Replace the active filter, e.g. `debug` or `info,attr_explorer=trace`
pub fn set_log_level(spec: &str) -> Result<(), String> {
    let control = FILTER.get().ok_or("Logging not initialized")?;
    let filter = EnvFilter::try_new(spec).map_err(|e| format!("Invalid log filter '{spec}': {e}"))?;
    control
        .handle
        .reload(filter)
        .map_err(|e| format!("Failed to reload log filter: {e}"))?;
    if let Ok(mut current) = control.spec.lock() {
        *current = spec.to_string();
    }
    tracing::info!("Log filter set to {}", spec);
    Ok(())
}

/// Active filter string, or `unknown` before init
pub fn get_log_level() -> String {
    FILTER
        .get()
        .and_then(|control| control.spec.lock().ok().map(|spec| spec.clone()))
        .unwrap_or_else(|| "unknown".to_string())
}
