//! Pipeline orchestration
//!
//! Locates the unit, plans and runs the forced build, reads the header it
//! produced, and reports the requested records. Any failure before the
//! header is parsed aborts the run.

use std::io::{self, Write};

use serde::Serialize;
use sizeof_asmhdr::Records;
use thiserror::Error;

use crate::artifact::{read_header, ArtifactError};
use crate::config::{ConfigError, SizeofConfig};
use crate::invoke::{invoke, BuildError};
use crate::plan::{plan, PlanError};
use crate::report::{Report, ReportMode, Reporter, RequestSet};
use crate::tool::GoTool;
use crate::unit::{locate, LookupError};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum SizeofError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Lookup(#[from] LookupError),

    #[error("{0}")]
    Plan(#[from] PlanError),

    #[error("{0}")]
    Build(#[from] BuildError),

    #[error("{0}")]
    Artifact(#[from] ArtifactError),

    #[error("writing output: {0}")]
    Io(#[from] io::Error),
}

impl SizeofError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SizeofError::Config(_) => 2,
            _ => 1,
        }
    }
}

/// Result type for pipeline operations
pub type SizeofResult<T> = Result<T, SizeofError>;

/// What to report, and about which package
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    /// Import path or directory; the current directory when unset
    pub package: Option<String>,

    pub mode: ReportMode,

    /// Names to report; everything when empty
    pub names: Vec<String>,
}

impl Query {
    pub fn new(mode: ReportMode) -> Self {
        Self {
            package: None,
            mode,
            names: Vec::new(),
        }
    }

    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Run a query, printing each match to `out` as it is found.
///
/// Pass `None` to only collect the report. Names never found are listed in
/// [`Report::missing`] rather than treated as errors.
pub fn run(
    tool: &dyn GoTool,
    config: &SizeofConfig,
    query: &Query,
    out: Option<&mut dyn Write>,
) -> SizeofResult<Report> {
    let unit = locate(tool, config, query.package.as_deref())?;
    if config.verbose {
        eprintln!(
            "sizeof: {} in {} (stale: {}, asm: {})",
            unit.import_path,
            unit.dir.display(),
            unit.stale,
            unit.has_asm_sources
        );
    }

    let mut build_plan = plan(&unit, config)?;
    if config.verbose {
        if let Some(stub) = build_plan.stub_path() {
            eprintln!("sizeof: wrote {}", stub.display());
        }
        if build_plan.forces_full_rebuild() {
            eprintln!("sizeof: rebuilding all dependencies (-a)");
        }
    }
    let invocation = invoke(tool, config, &unit, &build_plan)?;
    if !invocation.output.trim().is_empty() {
        // Warnings from a successful build are passed through.
        eprint!("{}", invocation.output);
    }

    let header = read_header(&mut build_plan, invocation, &unit, config)?;
    // Stub goes once the build is done.
    drop(build_plan);

    let requests = RequestSet::new(query.names.iter().cloned());
    let mut reporter = match out {
        Some(out) => Reporter::streaming(requests, query.mode, out),
        None => Reporter::new(requests, query.mode),
    };
    for record in Records::new(&header, query.mode.parse_mode()) {
        reporter.offer(record)?;
    }

    Ok(reporter.finish(unit.import_path))
}
