//! Parser for Go assembler headers.
//!
//! The Go compiler writes `go_asm.h` when asked with `-asmhdr`. Among other
//! things it contains one `#define` per named type size, per struct field
//! offset, and per integer constant:
//!
//! ```text
//! #define Regexp__size 160
//! #define Regexp_expr 0
//! #define const_maxBacktrackProg 500
//! ```
//!
//! This crate turns that text into a stream of [`Record`]s. It does not know
//! or care how the header was produced.

mod parser;
mod record;

pub use parser::{parse, ParseMode, Records};
pub use record::Record;

/// Marker that opens every significant header line.
pub const DEFINE_MARKER: &str = "#define";

/// Suffix of a type size symbol (`<Type>__size`).
pub const SIZE_SUFFIX: &str = "__size";

/// Prefix of a constant symbol (`const_<Name>`).
pub const CONST_PREFIX: &str = "const_";
