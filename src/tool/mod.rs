//! Go command collaborator
//!
//! Abstracts the `go` binary for testability. Provides:
//! - GoTool trait: run one go subcommand in a directory
//! - GoCommand: spawns the real go binary
//! - MockGoTool: scripted in-process stand-in for tests

pub mod mock;

use std::io;
use std::path::Path;
use std::process::Command;

pub use mock::{MockBuild, MockGoTool};

/// Captured result of one go invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Whether the process exited with status 0
    pub success: bool,

    /// Exit code, None when killed by a signal
    pub code: Option<i32>,

    pub stdout: String,

    pub stderr: String,
}

impl ToolOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Both streams as one blob.
    ///
    /// The go command writes its `WORK=` announcement and compiler
    /// diagnostics to stderr, so stderr goes first.
    pub fn combined(&self) -> String {
        let mut blob = String::with_capacity(self.stderr.len() + self.stdout.len());
        blob.push_str(&self.stderr);
        blob.push_str(&self.stdout);
        blob
    }

    /// Short description of how the process ended, for generic errors
    pub fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Interface to the go command
pub trait GoTool {
    /// Run `go <args>` in `dir` with `env` added to the inherited environment.
    fn run(&self, dir: &Path, args: &[String], env: &[(String, String)]) -> io::Result<ToolOutput>;
}

/// The real go binary
#[derive(Debug, Clone)]
pub struct GoCommand {
    program: String,
}

impl GoCommand {
    /// Use `program` (a name on PATH or a path) as the go binary
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl GoTool for GoCommand {
    fn run(&self, dir: &Path, args: &[String], env: &[(String, String)]) -> io::Result<ToolOutput> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()?;

        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Render a command line for verbose logs
pub fn command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
