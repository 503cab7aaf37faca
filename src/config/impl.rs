use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

fn cell() -> &'static ArcSwap<StaticConfig> {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
}

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks. Falls back to in-memory defaults when
/// nothing has been loaded yet.
pub fn get_config() -> Arc<StaticConfig> {
    cell().load_full()
}

/// Initialize the global configuration
///
/// Loads configuration from `path` (default "config.toml") and environment
/// variables. If the file doesn't exist, uses in-memory defaults.
pub fn init_config(path: Option<&str>) -> Arc<StaticConfig> {
    let config = Arc::new(StaticConfig::load(path));
    cell().store(config.clone());
    config
}

/// Replace the global configuration with an already built value
pub fn set_config(config: StaticConfig) {
    cell().store(Arc::new(config));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_config_defaults_before_init() {
        let config = get_config();
        assert!(config.selection.top_k >= 1);
    }
}
