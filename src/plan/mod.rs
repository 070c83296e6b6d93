//! Forced-build planning
//!
//! Decides how `go build` is coerced into writing the assembler header and
//! makes sure the build actually recompiles the package:
//!
//! - With .s files the go command already writes go_asm.h into its work
//!   directory, so `-work` is enough to find it afterwards.
//! - Without them `-gcflags -asmhdr=<tmp>` asks the compiler for it. The flag
//!   applies to every package compiled, but the target package is compiled
//!   last, so whatever it writes is what remains in the file.
//! - An up-to-date package is not recompiled at all. A stub file declaring
//!   only the package clause makes it stale; if the stub cannot be written,
//!   `-a` rebuilds everything instead.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::config::SizeofConfig;
use crate::unit::UnitInfo;

/// How the header is located after the build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStrategy {
    /// The go command writes go_asm.h into its `-work` directory
    WorkDir,

    /// The compiler writes the header to a temporary file via `-asmhdr`
    ExplicitPath,
}

/// Stub source file written into the package directory.
///
/// Removed on drop unless it is to be kept.
#[derive(Debug)]
pub struct StubFile {
    path: PathBuf,
    remove: bool,
}

impl StubFile {
    /// Create `dir/name` containing only `package <package>`.
    ///
    /// Never overwrites an existing file.
    pub fn write(dir: &Path, name: &str, package: &str, remove: bool) -> io::Result<Self> {
        let path = dir.join(name);
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        let stub = Self { path, remove };
        writeln!(file, "package {}", package)?;
        Ok(stub)
    }

    /// Path of the stub
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StubFile {
    fn drop(&mut self) {
        if self.remove {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Planning errors
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("creating header file: {0}")]
    TempFile(#[source] io::Error),
}

/// A planned `go build` invocation and the files it owns
#[derive(Debug)]
pub struct BuildPlan {
    strategy: HeaderStrategy,
    header_file: Option<NamedTempFile>,
    stub: Option<StubFile>,
    args: Vec<String>,
}

impl BuildPlan {
    pub fn strategy(&self) -> HeaderStrategy {
        self.strategy
    }

    /// Arguments after the go binary, starting with `build`
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The `-asmhdr` file, for [`HeaderStrategy::ExplicitPath`]
    pub fn header_path(&self) -> Option<&Path> {
        self.header_file.as_ref().map(|f| f.path())
    }

    /// Hand the `-asmhdr` file over to whoever reads it
    pub fn take_header_file(&mut self) -> Option<NamedTempFile> {
        self.header_file.take()
    }

    /// The staleness stub, if one was written
    pub fn stub_path(&self) -> Option<&Path> {
        self.stub.as_ref().map(StubFile::path)
    }

    /// Whether the plan falls back to rebuilding everything
    pub fn forces_full_rebuild(&self) -> bool {
        self.args.iter().any(|a| a == "-a")
    }
}

/// Plan the build for `unit`
pub fn plan(unit: &UnitInfo, config: &SizeofConfig) -> Result<BuildPlan, PlanError> {
    let mut args = vec!["build".to_string()];
    let mut header_file = None;

    let strategy = if unit.has_asm_sources {
        if config.verbose {
            eprintln!("sizeof: package has .s files; using -work");
        }
        args.push("-work".to_string());
        HeaderStrategy::WorkDir
    } else {
        if config.verbose {
            eprintln!("sizeof: package has no .s files; using -asmhdr");
        }
        let file = tempfile::Builder::new()
            .prefix(&config.temp_prefix)
            .suffix(".h")
            .tempfile()
            .map_err(PlanError::TempFile)?;
        args.push("-gcflags".to_string());
        args.push(asmhdr_flag(file.path()));
        header_file = Some(file);
        HeaderStrategy::ExplicitPath
    };

    let mut stub = None;
    if !unit.stale {
        if config.verbose {
            eprintln!("sizeof: package is not stale");
        }
        match StubFile::write(&unit.dir, &config.stub_name, &unit.name, config.cleanup.stub) {
            Ok(file) => stub = Some(file),
            Err(e) => {
                if config.verbose {
                    eprintln!("sizeof: cannot write {}: {}", config.stub_name, e);
                }
                args.push("-a".to_string());
            }
        }
    }

    Ok(BuildPlan {
        strategy,
        header_file,
        stub,
        args,
    })
}

/// `-asmhdr=<path>` as one `-gcflags` field.
///
/// The go command only honors a quote that opens a field, so a path with
/// whitespace quotes the whole flag. Quotes cannot be escaped; a path with
/// both kinds of quote and whitespace is passed as is.
fn asmhdr_flag(path: &Path) -> String {
    let flag = format!("-asmhdr={}", path.display());
    if !flag.contains(char::is_whitespace) {
        flag
    } else if !flag.contains('\'') {
        format!("'{}'", flag)
    } else if !flag.contains('"') {
        format!("\"{}\"", flag)
    } else {
        flag
    }
}
