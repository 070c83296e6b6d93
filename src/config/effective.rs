//! Effective configuration with provenance
//!
//! Merges every layer into a single JSON value, then deserializes it into a
//! typed [`SizeofConfig`]. The contributing sources are kept so `-v` can
//! say where the settings came from.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;

/// Project config file looked up in the current directory
pub const PROJECT_CONFIG_FILE: &str = ".sizeof.toml";

/// Origin of a configuration source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Env,
    User,
    Project,
    Cli,
}

/// A contributing config source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/env/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Target platform handed to every go invocation.
///
/// Unset fields are not passed at all, leaving the go command's own default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goos: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goarch: Option<String>,
}

impl Target {
    /// Environment variables that select this target.
    pub fn env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if let Some(ref goos) = self.goos {
            env.push(("GOOS".to_string(), goos.clone()));
        }
        if let Some(ref goarch) = self.goarch {
            env.push(("GOARCH".to_string(), goarch.clone()));
        }
        env
    }
}

/// Which temporary files are removed once the header has been read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cleanup {
    /// Remove the staleness stub written into the package directory
    pub stub: bool,

    /// Remove the go command's work directory (`-work`)
    pub work_dir: bool,
}

/// Typed, merged configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizeofConfig {
    /// go binary to run
    pub go: String,

    /// File name of the assembler header
    pub header_name: String,

    /// File name of the staleness stub
    pub stub_name: String,

    /// Prefix for the `-asmhdr` temporary file
    pub temp_prefix: String,

    #[serde(default)]
    pub target: Target,

    pub cleanup: Cleanup,

    #[serde(default)]
    pub verbose: bool,
}

impl Default for SizeofConfig {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            go: defaults.go,
            header_name: defaults.header_name,
            stub_name: defaults.stub_name,
            temp_prefix: defaults.temp_prefix,
            target: Target::default(),
            cleanup: Cleanup {
                stub: defaults.remove_stub,
                work_dir: defaults.remove_work_dir,
            },
            verbose: false,
        }
    }
}

/// Where each optional layer comes from
#[derive(Debug, Clone, Default)]
pub struct ConfigLayers {
    /// Target picked up from GOOS/GOARCH
    pub env: Option<Value>,

    /// User config file
    pub user: Option<PathBuf>,

    /// Project config file
    pub project: Option<PathBuf>,

    /// Overrides from command-line flags
    pub cli: Option<Value>,
}

impl ConfigLayers {
    /// Discover layers from the process environment and the filesystem.
    ///
    /// An explicit project config must exist; the implicit user and project
    /// files are skipped when absent.
    pub fn discover(explicit_project: Option<PathBuf>) -> Self {
        let env = target_from_env(|key| std::env::var(key).ok());

        let user = std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".config/sizeof/config.toml"))
            .filter(|path| path.exists());

        let project = explicit_project.or_else(|| {
            let path = PathBuf::from(PROJECT_CONFIG_FILE);
            path.exists().then_some(path)
        });

        Self {
            env,
            user,
            project,
            cli: None,
        }
    }

    /// Attach CLI overrides
    pub fn with_cli(mut self, cli: Value) -> Self {
        self.cli = Some(cli);
        self
    }
}

/// Build the env layer from GOOS/GOARCH, if either is set and non-empty.
pub fn target_from_env<F>(lookup: F) -> Option<Value>
where
    F: Fn(&str) -> Option<String>,
{
    let mut target = serde_json::Map::new();
    for (var, key) in [("GOOS", "goos"), ("GOARCH", "goarch")] {
        if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
            target.insert(key.to_string(), Value::String(value));
        }
    }

    if target.is_empty() {
        None
    } else {
        Some(serde_json::json!({ "target": target }))
    }
}

/// Merged configuration plus the sources that contributed to it
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub config: SizeofConfig,
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build effective config from layers
    pub fn build(layers: &ConfigLayers) -> Result<Self, ConfigError> {
        let mut values = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
        }];

        if let Some(ref env) = layers.env {
            values.push(env.clone());
            sources.push(ConfigSource {
                origin: ConfigOrigin::Env,
                path: None,
            });
        }

        for (origin, path) in [
            (ConfigOrigin::User, &layers.user),
            (ConfigOrigin::Project, &layers.project),
        ] {
            if let Some(path) = path {
                values.push(load_toml_file(path)?);
                sources.push(ConfigSource {
                    origin,
                    path: Some(path.clone()),
                });
            }
        }

        if let Some(ref cli) = layers.cli {
            values.push(cli.clone());
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
            });
        }

        let merged = merge_layers(values);
        let config: SizeofConfig = serde_json::from_value(merged)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        validate(&config)?;

        Ok(Self { config, sources })
    }
}

/// Load a TOML file as a JSON value for merging
fn load_toml_file(path: &Path) -> Result<Value, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let table: toml::Value = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    serde_json::to_value(table).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn validate(config: &SizeofConfig) -> Result<(), ConfigError> {
    if config.go.is_empty() {
        return Err(ConfigError::Invalid("go must not be empty".to_string()));
    }

    if config.header_name.is_empty() || config.header_name.contains(['/', '\\']) {
        return Err(ConfigError::Invalid(format!(
            "header_name must be a plain file name, got {:?}",
            config.header_name
        )));
    }

    // The go command skips files starting with _ or ., and anything not .go
    let stub = &config.stub_name;
    if !stub.ends_with(".go")
        || stub.starts_with(['_', '.'])
        || stub.ends_with("_test.go")
        || stub.contains(['/', '\\'])
    {
        return Err(ConfigError::Invalid(format!(
            "stub_name must be a non-test .go file name the go command will compile, got {:?}",
            stub
        )));
    }

    for (key, value) in [("goos", &config.target.goos), ("goarch", &config.target.goarch)] {
        if matches!(value, Some(v) if v.is_empty()) {
            return Err(ConfigError::Invalid(format!("target.{} must not be empty", key)));
        }
    }

    Ok(())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
