use arbor_core::api::{LoggingConfig, DEPRECATION_TARGET};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

/// Filter for the configured level.
///
/// A non-empty `RUST_LOG` replaces it entirely. Otherwise ordering
/// deprecations stay visible at `warn` unless the level names their target.
pub fn env_filter(level: &str, rust_log: Option<&str>) -> Result<EnvFilter, String> {
    if let Some(directives) = rust_log.map(str::trim).filter(|v| !v.is_empty()) {
        return EnvFilter::try_new(directives).map_err(|e| e.to_string());
    }

    let mut directives = level.trim().to_string();
    if !directives.contains(DEPRECATION_TARGET) {
        if !directives.is_empty() {
            directives.push(',');
        }
        directives.push_str(DEPRECATION_TARGET);
        directives.push_str("=warn");
    }
    EnvFilter::try_new(directives).map_err(|e| e.to_string())
}

pub fn init_tracing(logging: &LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = env_filter(&logging.level, rust_log.as_deref())?;

    let writer = match logging.file {
        true => Some(file_writer(logging.directory.as_deref())?),
        false => None,
    };
    if !logging.console && writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });
    let file_layer = writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

/// One log file per process under `directory`, or `$TMP/arbor`.
fn file_writer(
    directory: Option<&str>,
) -> Result<tracing_appender::non_blocking::NonBlocking, String> {
    let dir = match directory.map(str::trim).filter(|s| !s.is_empty()) {
        Some(d) => std::path::PathBuf::from(d),
        None => std::env::temp_dir().join("arbor"),
    };
    std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;

    let file_name = format!("arbor.{}.log", std::process::id());
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Ok(non_blocking)
}
