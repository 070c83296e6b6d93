//! Configuration merge system
//!
//! Implements the layered configuration merge:
//! 1. Built-in defaults
//! 2. Target from the process environment (GOOS, GOARCH)
//! 3. User config (~/.config/sizeof/config.toml)
//! 4. Project config (--config, or ./.sizeof.toml)
//! 5. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::{
    BuiltinDefaults, DEFAULT_GO, DEFAULT_HEADER_NAME, DEFAULT_STUB_NAME, DEFAULT_TEMP_PREFIX,
};
pub use effective::{
    Cleanup, ConfigError, ConfigLayers, ConfigOrigin, ConfigSource, EffectiveConfig,
    SizeofConfig, Target,
};
pub use merge::{deep_merge, merge_layers};
