//! Tracing subscriber setup.

use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

use crate::error::{ServiceError, ServiceResult};

/// Handle for swapping the active filter after the subscriber is installed.
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// ## Summary
/// Installs the global subscriber: a reloadable `EnvFilter` starting at
/// `debug` and a `fmt` layer with targets, thread ids, files and lines.
///
/// Settings are usually loaded after this, so the returned handle is used
/// to apply the configured level once they are known.
///
/// ## Errors
/// Returns `ServiceError::TracingError` if a global subscriber is already set.
pub fn init_tracing() -> ServiceResult<FilterHandle> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|e| ServiceError::TracingError(e.to_string()))?;

    Ok(filter_handle)
}

/// ## Summary
/// Replaces the active filter with `level` (any `EnvFilter` directive).
///
/// An invalid directive keeps the current filter and logs a warning.
pub fn apply_log_level(handle: &FilterHandle, level: &str) {
    if let Ok(filter) = EnvFilter::try_new(level) {
        if let Err(e) = handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level, "Invalid log level in config, keeping current filter");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(handle: &FilterHandle) -> String {
        handle.with_current(ToString::to_string).unwrap()
    }

    #[test]
    fn applies_configured_level() {
        let (layer, handle) = reload::Layer::<_, Registry>::new(EnvFilter::new("debug"));
        let _subscriber = tracing_subscriber::registry().with(layer);

        apply_log_level(&handle, "warn");
        assert_eq!(current(&handle), "warn");
    }

    #[test]
    fn invalid_level_keeps_filter() {
        let (layer, handle) = reload::Layer::<_, Registry>::new(EnvFilter::new("debug"));
        let _subscriber = tracing_subscriber::registry().with(layer);

        apply_log_level(&handle, "almanac=loud");
        assert_eq!(current(&handle), "debug");
    }
}
