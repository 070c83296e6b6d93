//! go-sizeof - type layout and constants of Go packages
//!
//! This crate forces `go build` to emit the assembler header (go_asm.h) for
//! a package, then reports the type sizes, field offsets and integer
//! constants the compiler recorded there.

pub mod artifact;
pub mod config;
pub mod invoke;
pub mod pipeline;
pub mod plan;
pub mod report;
pub mod tool;
pub mod unit;

pub use config::{ConfigLayers, EffectiveConfig, SizeofConfig};
pub use pipeline::{run, Query, SizeofError, SizeofResult};
pub use report::{Report, ReportMode};
pub use sizeof_asmhdr::Record;
pub use tool::{GoCommand, GoTool};
