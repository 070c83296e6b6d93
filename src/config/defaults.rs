//! Built-in defaults (layer 1)
//!
//! Hardcoded values used when no other layer sets them.

use serde_json::Value;

/// Name of the go command looked up on PATH
pub const DEFAULT_GO: &str = "go";

/// Header the compiler writes for `-asmhdr` and for packages with .s files
pub const DEFAULT_HEADER_NAME: &str = "go_asm.h";

/// Stub dropped into an up-to-date package to make it stale again.
/// Must not start with `_` or `.`, or the go command ignores it.
pub const DEFAULT_STUB_NAME: &str = "xxx_sizeof_tmp_.go";

/// Prefix of the temporary file handed to `-asmhdr`
pub const DEFAULT_TEMP_PREFIX: &str = "go-sizeof-";

/// Built-in default configuration values
#[derive(Debug, Clone)]
pub struct BuiltinDefaults {
    pub go: String,
    pub header_name: String,
    pub stub_name: String,
    pub temp_prefix: String,
    pub remove_stub: bool,
    pub remove_work_dir: bool,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            go: DEFAULT_GO.to_string(),
            header_name: DEFAULT_HEADER_NAME.to_string(),
            stub_name: DEFAULT_STUB_NAME.to_string(),
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            remove_stub: true,
            remove_work_dir: true,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "go": self.go,
            "header_name": self.header_name,
            "stub_name": self.stub_name,
            "temp_prefix": self.temp_prefix,
            "target": {},
            "cleanup": {
                "stub": self.remove_stub,
                "work_dir": self.remove_work_dir
            },
            "verbose": false
        })
    }
}
