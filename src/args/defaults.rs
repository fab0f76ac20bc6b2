pub(crate) const DEFAULT_USER_AGENT: &str = concat!("httpbench/", env!("CARGO_PKG_VERSION"));

/// Config files picked up from the working directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG_FILES: [&str; 2] = ["httpbench.toml", "httpbench.json"];
