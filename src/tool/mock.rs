//! Scripted go command for tests
//!
//! Answers `go list -json` from canned package data and emulates the two
//! ways `go build` leaves a header behind: written to the `-asmhdr` path, or
//! left inside a `-work` directory announced as `WORK=<dir>`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{GoTool, ToolOutput};

/// One recorded invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub dir: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

/// What `go build` does
#[derive(Debug, Clone)]
pub enum MockBuild {
    /// Succeed and leave `header` behind
    Header(String),

    /// Succeed without producing any header
    NoHeader,

    /// Exit with `code`, printing `output` after any WORK line
    Fail { code: i32, output: String },
}

/// Scripted stand-in for the go binary
#[derive(Debug)]
pub struct MockGoTool {
    /// `go list -json` output for the unit directory
    unit: Value,

    /// Package path -> directory, for `go list -json <path>`
    packages: HashMap<String, PathBuf>,

    list_failure: Option<ToolOutput>,

    build: MockBuild,

    /// Where `-work` builds create their work directory
    work_root: Option<PathBuf>,

    /// Header location relative to the work directory
    work_header: Option<PathBuf>,

    /// Never print a WORK= line
    skip_work_announcement: bool,

    calls: RefCell<Vec<MockCall>>,
}

impl MockGoTool {
    /// Mock whose unit is described by the given `go list -json` object
    pub fn new(unit: Value) -> Self {
        Self {
            unit,
            packages: HashMap::new(),
            list_failure: None,
            build: MockBuild::NoHeader,
            work_root: None,
            work_header: None,
            skip_work_announcement: false,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Mock for a package with the usual facts
    pub fn for_package(import_path: &str, name: &str, stale: bool, s_files: &[&str]) -> Self {
        Self::new(serde_json::json!({
            "Dir": format!("/src/{}", import_path),
            "ImportPath": import_path,
            "Name": name,
            "Stale": stale,
            "SFiles": s_files,
        }))
    }

    /// Resolve `path` to `dir` for `go list -json <path>`
    pub fn with_package(mut self, path: &str, dir: impl Into<PathBuf>) -> Self {
        self.packages.insert(path.to_string(), dir.into());
        self
    }

    /// Make every `go list` fail with this output
    pub fn with_list_failure(mut self, output: ToolOutput) -> Self {
        self.list_failure = Some(output);
        self
    }

    /// Set what `go build` does
    pub fn with_build(mut self, build: MockBuild) -> Self {
        self.build = build;
        self
    }

    /// Create `-work` directories at `root`
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    /// Place the header at `rel` inside the work directory instead of the
    /// conventional `<ImportPath>/_obj/<header>`
    pub fn with_work_header(mut self, rel: impl Into<PathBuf>) -> Self {
        self.work_header = Some(rel.into());
        self
    }

    /// Ignore `-work` entirely, as a go command that never prints WORK=
    pub fn without_work_announcement(mut self) -> Self {
        self.skip_work_announcement = true;
        self
    }

    /// Invocations seen so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.borrow().clone()
    }

    fn list(&self, args: &[String]) -> ToolOutput {
        if let Some(ref failure) = self.list_failure {
            return failure.clone();
        }

        match args.get(2) {
            Some(path) => match self.packages.get(path) {
                Some(dir) => ToolOutput::ok(
                    serde_json::json!({
                        "Dir": dir,
                        "ImportPath": path,
                        "Name": path.rsplit('/').next().unwrap_or(path),
                    })
                    .to_string(),
                ),
                None => ToolOutput::failed(
                    1,
                    format!("no required module provides package {}\n", path),
                ),
            },
            None => ToolOutput::ok(self.unit.to_string()),
        }
    }

    fn build(&self, args: &[String]) -> io::Result<ToolOutput> {
        let mut announcement = String::new();
        let mut header_path = None;

        if args.iter().any(|a| a == "-work") && !self.skip_work_announcement {
            let root = self.work_root.clone().ok_or_else(|| {
                io::Error::new(io::ErrorKind::Other, "mock: -work without a work root")
            })?;
            fs::create_dir_all(&root)?;
            announcement = format!("WORK={}\n", root.display());

            let rel = match self.work_header {
                Some(ref rel) => rel.clone(),
                None => {
                    let import_path = self.unit["ImportPath"].as_str().unwrap_or_default();
                    Path::new(import_path).join("_obj").join("go_asm.h")
                }
            };
            header_path = Some(root.join(rel));
        }

        if let Some(path) = args
            .iter()
            .find_map(|a| unquote(a).strip_prefix("-asmhdr="))
        {
            header_path = Some(PathBuf::from(path));
        }

        match self.build {
            MockBuild::Header(ref text) => {
                if let Some(path) = header_path {
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(path, text)?;
                }
                Ok(ToolOutput {
                    success: true,
                    code: Some(0),
                    stdout: String::new(),
                    stderr: announcement,
                })
            }
            MockBuild::NoHeader => Ok(ToolOutput {
                success: true,
                code: Some(0),
                stdout: String::new(),
                stderr: announcement,
            }),
            MockBuild::Fail { code, ref output } => {
                Ok(ToolOutput::failed(code, announcement + output))
            }
        }
    }
}

/// Strip one pair of quotes wrapping a whole `-gcflags` field
fn unquote(field: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = field
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    field
}

impl GoTool for MockGoTool {
    fn run(&self, dir: &Path, args: &[String], env: &[(String, String)]) -> io::Result<ToolOutput> {
        self.calls.borrow_mut().push(MockCall {
            dir: dir.to_path_buf(),
            args: args.to_vec(),
            env: env.to_vec(),
        });

        match args.first().map(String::as_str) {
            Some("list") => Ok(self.list(args)),
            Some("build") => self.build(args),
            _ => Ok(ToolOutput::failed(2, "go: unknown command\n")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_list_unit_and_package() {
        let tool = MockGoTool::for_package("example.com/m", "m", false, &[])
            .with_package("example.com/m/sub", "/src/sub");

        let unit = tool.run(Path::new("."), &args(&["list", "-json"]), &[]).unwrap();
        assert!(unit.success);
        assert!(unit.stdout.contains("\"ImportPath\":\"example.com/m\""));

        let sub = tool
            .run(Path::new("."), &args(&["list", "-json", "example.com/m/sub"]), &[])
            .unwrap();
        assert!(sub.stdout.contains("/src/sub"));

        let missing = tool
            .run(Path::new("."), &args(&["list", "-json", "nope"]), &[])
            .unwrap();
        assert!(!missing.success);
        assert_eq!(tool.calls().len(), 3);
    }

    #[test]
    fn test_build_writes_asmhdr_path() {
        let temp = TempDir::new().unwrap();
        let hdr = temp.path().join("hdr.h");
        let tool = MockGoTool::for_package("m", "m", true, &[])
            .with_build(MockBuild::Header("#define T__size 8\n".to_string()));

        let flag = format!("-asmhdr={}", hdr.display());
        let out = tool
            .run(temp.path(), &args(&["build", "-gcflags", flag.as_str()]), &[])
            .unwrap();

        assert!(out.success);
        assert_eq!(fs::read_to_string(hdr).unwrap(), "#define T__size 8\n");
    }

    #[test]
    fn test_build_accepts_quoted_asmhdr_field() {
        let temp = TempDir::new().unwrap();
        let hdr = temp.path().join("with space").join("hdr.h");
        let tool = MockGoTool::for_package("m", "m", true, &[])
            .with_build(MockBuild::Header("#define T__size 8\n".to_string()));

        let flag = format!("'-asmhdr={}'", hdr.display());
        tool.run(temp.path(), &args(&["build", "-gcflags", flag.as_str()]), &[])
            .unwrap();

        assert!(hdr.exists());
    }

    #[test]
    fn test_build_work_announces_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("work");
        let tool = MockGoTool::for_package("example.com/m", "m", true, &["a.s"])
            .with_build(MockBuild::Header("x".to_string()))
            .with_work_root(&root);

        let out = tool.run(temp.path(), &args(&["build", "-work"]), &[]).unwrap();

        assert!(out.stderr.starts_with("WORK="));
        assert!(root.join("example.com/m/_obj/go_asm.h").exists());
    }
}
