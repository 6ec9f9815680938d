use std::fs;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

struct LocalTimer;

impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = chrono::Local::now();
        write!(w, "{}", now.to_rfc3339())
    }
}

/// Installs the global subscriber: console always, plus a daily rolling file
/// under `log_dir` when given. Later calls are no-ops.
pub fn init_logger(log_dir: Option<&Path>) {
    let _ = tracing_log::LogTracer::init();

    let console_layer = fmt::Layer::new()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_timer(LocalTimer);

    let file_layer = log_dir.and_then(|dir| match fs::create_dir_all(dir) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::daily(dir, "quota.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            // The writer must outlive the process-wide subscriber.
            std::mem::forget(guard);
            Some(
                fmt::Layer::new()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(LocalTimer)
                    .boxed(),
            )
        }
        Err(e) => {
            eprintln!("Failed to create log directory {}: {}", dir.display(), e);
            None
        }
    });

    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    match installed {
        Ok(()) => info!(
            "Log system initialized ({})",
            if log_dir.is_some() {
                "Console + File persistence"
            } else {
                "Console"
            }
        ),
        Err(e) => warn!("Logger already initialized: {}", e),
    }
}
