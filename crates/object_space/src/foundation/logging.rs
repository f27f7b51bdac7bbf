//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with a default level
///
/// `level` uses the same spelling as the configuration file ("error",
/// "warn", "info", "debug", "trace"). `RUST_LOG` still overrides it.
/// Unknown strings fall back to `info`. Calling this twice is harmless.
pub fn init_with_level(level: &str) {
    let _ = builder_with_level(level).parse_default_env().try_init();
}

/// Builder with `level` as the global filter, before environment overrides
fn builder_with_level(level: &str) -> env_logger::Builder {
    let filter = level.parse::<log::LevelFilter>().unwrap_or(log::LevelFilter::Info);
    let mut builder = env_logger::Builder::new();
    builder.filter_level(filter);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;
    
    #[test]
    fn test_configured_level_applies_without_overrides() {
        assert_eq!(builder_with_level("warn").build().filter(), LevelFilter::Warn);
        assert_eq!(builder_with_level("loud").build().filter(), LevelFilter::Info);
    }
    
    #[test]
    fn test_environment_filters_override_configured_level() {
        let mut builder = builder_with_level("info");
        builder.parse_filters("debug");
        assert_eq!(builder.build().filter(), LevelFilter::Debug);
    }
}
