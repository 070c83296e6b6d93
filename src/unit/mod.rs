//! Unit lookup
//!
//! Resolves the package to inspect and asks the go command what it knows
//! about it: import path, staleness, whether it has assembly sources, and
//! its declared package name. Both queries use `go list -json`.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::SizeofConfig;
use crate::tool::{command_line, GoTool, ToolOutput};

/// What the go command reports about the package being inspected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitInfo {
    /// Directory the build runs in
    pub dir: PathBuf,

    /// Canonical import path
    pub import_path: String,

    /// Whether `go build` would recompile the package anyway
    pub stale: bool,

    /// Whether the package has .s files (and so already gets a go_asm.h)
    pub has_asm_sources: bool,

    /// Declared package name
    pub name: String,
}

/// Subset of `go list -json` output. The go command omits false and empty
/// fields, so only the identifying ones are required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedPackage {
    #[serde(default)]
    dir: Option<PathBuf>,

    #[serde(default)]
    import_path: Option<String>,

    #[serde(default)]
    stale: bool,

    #[serde(default)]
    s_files: Vec<String>,

    #[serde(default)]
    name: Option<String>,
}

/// Unit lookup errors
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The go command failed and said why
    #[error("{0}")]
    Tool(String),

    /// The go command failed silently
    #[error("go list: {0}")]
    Status(String),

    #[error("go list: {0}")]
    Spawn(#[source] io::Error),

    #[error("go list: unexpected output")]
    UnexpectedOutput,
}

/// Find the unit, in `package`'s directory if given, else in `.`.
///
/// The unit's directory is the one the go command reports, so later steps
/// never depend on the process working directory.
pub fn locate(
    tool: &dyn GoTool,
    config: &SizeofConfig,
    package: Option<&str>,
) -> Result<UnitInfo, LookupError> {
    let resolved = match package {
        Some(path) => {
            let listed = query(tool, config, Path::new("."), Some(path))?;
            Some(non_empty_dir(listed.dir).ok_or(LookupError::UnexpectedOutput)?)
        }
        None => None,
    };

    let listed = query(
        tool,
        config,
        resolved.as_deref().unwrap_or(Path::new(".")),
        None,
    )?;
    let dir = resolved
        .or_else(|| non_empty_dir(listed.dir))
        .unwrap_or_else(|| PathBuf::from("."));

    let import_path = listed
        .import_path
        .filter(|p| !p.is_empty())
        .ok_or(LookupError::UnexpectedOutput)?;
    let name = listed
        .name
        .filter(|n| !n.is_empty())
        .ok_or(LookupError::UnexpectedOutput)?;

    Ok(UnitInfo {
        dir,
        import_path,
        stale: listed.stale,
        has_asm_sources: !listed.s_files.is_empty(),
        name,
    })
}

fn non_empty_dir(dir: Option<PathBuf>) -> Option<PathBuf> {
    dir.filter(|d| !d.as_os_str().is_empty())
}

fn query(
    tool: &dyn GoTool,
    config: &SizeofConfig,
    dir: &Path,
    package: Option<&str>,
) -> Result<ListedPackage, LookupError> {
    let mut args = vec!["list".to_string(), "-json".to_string()];
    if let Some(path) = package {
        args.push(path.to_string());
    }

    if config.verbose {
        eprintln!(
            "sizeof: {} (in {})",
            command_line(&config.go, &args),
            dir.display()
        );
    }

    let output = tool
        .run(dir, &args, &config.target.env())
        .map_err(LookupError::Spawn)?;

    if !output.success {
        return Err(failure(&output));
    }

    serde_json::from_str(&output.stdout).map_err(|_| LookupError::UnexpectedOutput)
}

/// Prefer the go command's own diagnostics over a generic message
fn failure(output: &ToolOutput) -> LookupError {
    let diagnostics = output.combined();
    let diagnostics = diagnostics.trim_end();
    if diagnostics.is_empty() {
        LookupError::Status(output.status_text())
    } else {
        LookupError::Tool(diagnostics.to_string())
    }
}
