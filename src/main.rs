//! sizeof CLI
//!
//! Entry point for the `sizeof` command-line tool.

use clap::Parser;
use go_sizeof::config::{ConfigLayers, EffectiveConfig};
use go_sizeof::{run, GoCommand, Query, Report, ReportMode, SizeofError};
use serde_json::{json, Map, Value};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "sizeof")]
#[command(
    about = "Print the size, field offsets and constants of Go types",
    version
)]
struct Cli {
    /// Print integer constants instead of type sizes
    #[arg(short = 'c')]
    constants: bool,

    /// Also print field offsets of each reported type
    #[arg(short = 'f')]
    fields: bool,

    /// Package to inspect (default: the package in the current directory)
    #[arg(short = 'p', value_name = "PATH")]
    package: Option<String>,

    /// Log each step to stderr
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Print one JSON report instead of text lines
    #[arg(long)]
    json: bool,

    /// Path to project config file (default: ./.sizeof.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// go binary to run
    #[arg(long, value_name = "BIN")]
    go: Option<String>,

    /// Target operating system
    #[arg(long, value_name = "OS")]
    goos: Option<String>,

    /// Target architecture
    #[arg(long, value_name = "ARCH")]
    goarch: Option<String>,

    /// Keep the build's work directory and the staleness stub
    #[arg(long)]
    keep_work: bool,

    /// Type or constant names to report (default: all)
    names: Vec<String>,
}

impl Cli {
    /// Flags that override configuration files
    fn overrides(&self) -> Value {
        let mut root = Map::new();

        if let Some(ref go) = self.go {
            root.insert("go".to_string(), json!(go));
        }

        let mut target = Map::new();
        if let Some(ref goos) = self.goos {
            target.insert("goos".to_string(), json!(goos));
        }
        if let Some(ref goarch) = self.goarch {
            target.insert("goarch".to_string(), json!(goarch));
        }
        if !target.is_empty() {
            root.insert("target".to_string(), Value::Object(target));
        }

        if self.keep_work {
            root.insert(
                "cleanup".to_string(),
                json!({ "stub": false, "work_dir": false }),
            );
        }
        if self.verbose {
            root.insert("verbose".to_string(), json!(true));
        }

        Value::Object(root)
    }
}

fn main() {
    let cli = Cli::parse();

    let layers = ConfigLayers::discover(cli.config.clone()).with_cli(cli.overrides());
    let effective = match EffectiveConfig::build(&layers) {
        Ok(c) => c,
        Err(e) => fail(SizeofError::from(e)),
    };
    let config = effective.config;

    if config.verbose {
        for source in &effective.sources {
            match source.path {
                Some(ref path) => eprintln!("sizeof: config {:?} {}", source.origin, path.display()),
                None => eprintln!("sizeof: config {:?}", source.origin),
            }
        }
    }

    let mut query = Query::new(ReportMode::from_flags(cli.constants, cli.fields))
        .names(cli.names.iter().cloned());
    query.package = cli.package.clone();

    let tool = GoCommand::new(config.go.clone());
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    let result = if cli.json {
        run(&tool, &config, &query, None)
    } else {
        run(&tool, &config, &query, Some(&mut stdout as &mut dyn Write))
    };

    let report = match result {
        Ok(r) => r,
        Err(e) => fail(e),
    };

    if cli.json {
        print_json(&mut stdout, &report);
    }
    if let Err(e) = stdout.flush() {
        fail(SizeofError::Io(e));
    }

    for line in report.missing_lines() {
        eprintln!("sizeof: {}", line);
    }
    process::exit(report.exit_code());
}

fn print_json(out: &mut impl Write, report: &Report) {
    match serde_json::to_string_pretty(report) {
        Ok(text) => {
            if let Err(e) = writeln!(out, "{}", text) {
                fail(SizeofError::Io(e));
            }
        }
        Err(e) => {
            eprintln!("sizeof: serializing report: {}", e);
            process::exit(1);
        }
    }
}

fn fail(err: SizeofError) -> ! {
    eprintln!("sizeof: {}", err);
    process::exit(err.exit_code());
}
