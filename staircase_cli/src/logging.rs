//! Console and file tracing setup.

use std::path::Path;

use eyre::WrapErr;
use staircase_config::Logging;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::cli::FILE_GUARD;

fn rotation(name: Option<&str>) -> eyre::Result<Rotation> {
    match name.unwrap_or("never") {
        "never" => Ok(Rotation::NEVER),
        "daily" => Ok(Rotation::DAILY),
        "hourly" => Ok(Rotation::HOURLY),
        other => eyre::bail!("invalid configuration: logging.rotation = {other}"),
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `--log-level` for the console. Console output goes to
/// stderr so stdout only carries results. With `[logging] file` set, JSON
/// lines are also written there through a non-blocking appender whose guard
/// lives in `FILE_GUARD` until exit.
pub fn init_tracing(json: bool, level: &str, cfg: &Logging) -> eyre::Result<()> {
    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("invalid log level {level:?}"))?,
    };

    let file_layer = match cfg.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("invalid configuration: logging.file has no file name"))?;
            let appender = RollingFileAppender::new(rotation(cfg.rotation.as_deref())?, dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            let file_filter = EnvFilter::try_new(cfg.level.as_deref().unwrap_or("info"))
                .wrap_err("invalid configuration: logging.level")?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(file_filter),
            )
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(file_layer);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_filter(console_filter),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_filter(console_filter),
            )
            .try_init()
    }
    .wrap_err("failed to install tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_names() {
        assert!(matches!(rotation(None), Ok(r) if r == Rotation::NEVER));
        assert!(matches!(rotation(Some("hourly")), Ok(r) if r == Rotation::HOURLY));
        assert!(rotation(Some("weekly")).is_err());
    }
}
