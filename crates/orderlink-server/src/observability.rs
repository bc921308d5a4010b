//! Log subscriber setup.
//!
//! The subscriber starts at `info` (or `RUST_LOG`) so startup is logged
//! before the config file is read; the configured level is swapped in
//! afterwards through a reload handle. `RUST_LOG` always wins.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

/// Filter for a configured level. Noisy HTTP internals stay at `warn` unless
/// the level asks for more detail.
fn filter_for(level: &str) -> EnvFilter {
    let level = level.trim().to_ascii_lowercase();
    let directives = match level.as_str() {
        "trace" | "debug" => level.clone(),
        _ => format!("{level},tower_http=warn"),
    };
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn"))
}

fn env_override() -> Option<EnvFilter> {
    std::env::var_os("RUST_LOG")?;
    EnvFilter::try_from_default_env().ok()
}

pub fn init_tracing() {
    init_tracing_with_level("info");
}

pub fn init_tracing_with_level(level: &str) {
    let filter = env_override().unwrap_or_else(|| filter_for(level));
    let (filter_layer, handle) = reload::Layer::new(filter);

    let installed = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok();
    // A second init (tests, embedding) keeps the first subscriber and handle.
    if installed {
        let _ = FILTER_HANDLE.set(handle);
    }
}

/// Switch to the configured level. Returns `false` when `RUST_LOG` is set
/// or no subscriber was installed by [`init_tracing`].
pub fn apply_logging_level(level: &str) -> bool {
    if std::env::var_os("RUST_LOG").is_some() {
        return false;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return false;
    };
    match handle.reload(filter_for(level)) {
        Ok(()) => {
            tracing::info!(level, "Log level applied");
            true
        }
        Err(e) => {
            tracing::warn!(level, error = %e, "Failed to apply log level");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_for_levels() {
        let debug = filter_for(" DEBUG ").to_string();
        assert!(debug.contains("debug"));
        assert!(!debug.contains("tower_http"));
        assert!(filter_for("warn").to_string().contains("tower_http=warn"));
    }
}
