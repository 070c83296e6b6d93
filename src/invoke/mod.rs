//! Build invocation
//!
//! Runs the planned `go build` in the package directory and picks the
//! `WORK=<dir>` announcement off the front of its output.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::SizeofConfig;
use crate::plan::BuildPlan;
use crate::tool::{command_line, GoTool};
use crate::unit::UnitInfo;

/// Prefix of the line `go build -work` prints first
pub const WORK_PREFIX: &str = "WORK=";

/// The go command's temporary work directory.
///
/// Removed on drop unless it is to be kept; [`WorkDir::remove`] does the
/// same but reports errors.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    keep: bool,
}

impl WorkDir {
    pub fn new(path: impl Into<PathBuf>, keep: bool) -> Self {
        Self {
            path: path.into(),
            keep,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the directory survives this guard
    pub fn is_kept(&self) -> bool {
        self.keep
    }

    /// Remove the directory now, unless it is kept
    pub fn remove(mut self) -> io::Result<()> {
        if self.keep {
            return Ok(());
        }
        self.keep = true;
        match fs::remove_dir_all(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if !self.keep {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}

/// A successful build
#[derive(Debug)]
pub struct Invocation {
    /// Combined output with any WORK= line removed
    pub output: String,

    pub work_dir: Option<WorkDir>,
}

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The build failed and said why
    #[error("{0}")]
    Tool(String),

    /// The build failed silently
    #[error("go build: {0}")]
    Status(String),

    #[error("go build: {0}")]
    Spawn(#[source] io::Error),
}

/// Split a leading `WORK=<dir>` line off `output`.
///
/// Only a complete first line counts.
pub fn split_work_line(output: &str) -> (Option<&str>, &str) {
    if let Some(rest) = output.strip_prefix(WORK_PREFIX) {
        if let Some(end) = rest.find('\n') {
            let dir = rest[..end].trim_end_matches('\r');
            return (Some(dir), &rest[end + 1..]);
        }
    }
    (None, output)
}

/// Run the planned build for `unit`
pub fn invoke(
    tool: &dyn GoTool,
    config: &SizeofConfig,
    unit: &UnitInfo,
    plan: &BuildPlan,
) -> Result<Invocation, BuildError> {
    if config.verbose {
        eprintln!("sizeof: {}", command_line(&config.go, plan.args()));
    }

    let result = tool
        .run(&unit.dir, plan.args(), &config.target.env())
        .map_err(BuildError::Spawn)?;

    let combined = result.combined();
    let (work, output) = split_work_line(&combined);
    let work = work.filter(|dir| !dir.is_empty());

    if !result.success {
        // No header will be read, so the work directory goes regardless.
        if let Some(dir) = work {
            let _ = WorkDir::new(dir, false).remove();
        }
        let diagnostics = output.trim_end();
        if diagnostics.is_empty() {
            return Err(BuildError::Status(result.status_text()));
        }
        return Err(BuildError::Tool(diagnostics.to_string()));
    }

    let work_dir = work.map(|dir| WorkDir::new(dir, !config.cleanup.work_dir));
    if config.verbose {
        if let Some(ref dir) = work_dir {
            eprintln!("sizeof: work directory {}", dir.path().display());
        }
    }

    Ok(Invocation {
        output: output.to_string(),
        work_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan;
    use crate::tool::{MockBuild, MockGoTool};
    use tempfile::TempDir;

    fn unit(dir: &Path, has_asm_sources: bool) -> UnitInfo {
        UnitInfo {
            dir: dir.to_path_buf(),
            import_path: "example.com/geom".to_string(),
            stale: true,
            has_asm_sources,
            name: "geom".to_string(),
        }
    }

    #[test]
    fn test_split_work_line() {
        assert_eq!(
            split_work_line("WORK=/tmp/go-build123\nrest\n"),
            (Some("/tmp/go-build123"), "rest\n")
        );
        assert_eq!(split_work_line("WORK=/tmp/x\r\n"), (Some("/tmp/x"), ""));
        assert_eq!(split_work_line("WORK=/tmp/x"), (None, "WORK=/tmp/x"));
        assert_eq!(split_work_line("# pkg\nWORK=/tmp/x\n"), (None, "# pkg\nWORK=/tmp/x\n"));
        assert_eq!(split_work_line(""), (None, ""));
    }

    #[test]
    fn test_successful_build_keeps_work_dir_for_reader() {
        let temp = TempDir::new().unwrap();
        let work = temp.path().join("go-build1");
        let tool = MockGoTool::for_package("example.com/geom", "geom", true, &["a.s"])
            .with_build(MockBuild::Header("#define T__size 8\n".to_string()))
            .with_work_root(&work);
        let unit = unit(temp.path(), true);
        let config = SizeofConfig::default();
        let plan = plan(&unit, &config).unwrap();

        let invocation = invoke(&tool, &config, &unit, &plan).unwrap();

        let work_dir = invocation.work_dir.unwrap();
        assert_eq!(work_dir.path(), work.as_path());
        assert!(work.exists());
        assert!(invocation.output.is_empty());

        drop(work_dir);
        assert!(!work.exists());
    }

    #[test]
    fn test_failed_build_removes_work_dir() {
        let temp = TempDir::new().unwrap();
        let work = temp.path().join("go-build2");
        let tool = MockGoTool::for_package("example.com/geom", "geom", true, &["a.s"])
            .with_build(MockBuild::Fail {
                code: 2,
                output: "./geom.go:3:1: syntax error\n".to_string(),
            })
            .with_work_root(&work);
        let unit = unit(temp.path(), true);
        let mut config = SizeofConfig::default();
        config.cleanup.work_dir = false;
        let plan = plan(&unit, &config).unwrap();

        let err = invoke(&tool, &config, &unit, &plan).unwrap_err();

        assert_eq!(err.to_string(), "./geom.go:3:1: syntax error");
        assert!(!work.exists());
    }

    #[test]
    fn test_silent_failure_is_generic() {
        let temp = TempDir::new().unwrap();
        let tool = MockGoTool::for_package("m", "m", true, &[]).with_build(MockBuild::Fail {
            code: 1,
            output: String::new(),
        });
        let unit = unit(temp.path(), false);
        let config = SizeofConfig::default();
        let plan = plan(&unit, &config).unwrap();

        let err = invoke(&tool, &config, &unit, &plan).unwrap_err();
        assert_eq!(err.to_string(), "go build: exit status 1");
    }

    #[test]
    fn test_runs_in_unit_dir_with_target() {
        let temp = TempDir::new().unwrap();
        let tool = MockGoTool::for_package("m", "m", true, &[])
            .with_build(MockBuild::Header(String::new()));
        let unit = unit(temp.path(), false);
        let mut config = SizeofConfig::default();
        config.target.goarch = Some("arm64".to_string());
        let plan = plan(&unit, &config).unwrap();

        let invocation = invoke(&tool, &config, &unit, &plan).unwrap();
        assert!(invocation.work_dir.is_none());

        let calls = tool.calls();
        let call = &calls[0];
        assert_eq!(call.dir, temp.path());
        assert_eq!(call.args, plan.args());
        assert_eq!(call.env, vec![("GOARCH".to_string(), "arm64".to_string())]);
    }

    #[test]
    fn test_work_dir_remove_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gone");
        WorkDir::new(&path, false).remove().unwrap();

        let kept = temp.path().join("kept");
        fs::create_dir(&kept).unwrap();
        WorkDir::new(&kept, true).remove().unwrap();
        assert!(kept.exists());
    }
}
