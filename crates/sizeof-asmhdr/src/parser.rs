//! go_asm.h line parser.
//!
//! The grammar is deliberately loose: a line counts only when it splits into
//! exactly three whitespace-separated fields, the first being `#define`.
//! Comments, blank lines, function-like macros and anything else are skipped
//! without error.

use std::str::Lines;

use crate::record::Record;
use crate::{CONST_PREFIX, DEFINE_MARKER, SIZE_SUFFIX};

/// Which records the parser produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Only `const_` symbols, as [`Record::Constant`].
    Constants,

    /// Type sizes, plus field offsets when `fields` is set.
    Types { fields: bool },
}

/// Parse a whole header into records, in file order.
pub fn parse(text: &str, mode: ParseMode) -> Vec<Record> {
    Records::new(text, mode).collect()
}

/// Lazy iterator over the records of a header.
pub struct Records<'a> {
    lines: Lines<'a>,
    mode: ParseMode,
    /// Name of the latest `__size` symbol seen.
    current_type: Option<String>,
}

impl<'a> Records<'a> {
    /// Start parsing `text` in the given mode.
    pub fn new(text: &'a str, mode: ParseMode) -> Self {
        Self {
            lines: text.lines(),
            mode,
            current_type: None,
        }
    }

    fn record_for(&mut self, symbol: &str, value: &str) -> Option<Record> {
        match self.mode {
            ParseMode::Constants => {
                let name = symbol.strip_prefix(CONST_PREFIX)?;
                Some(Record::Constant {
                    name: name.to_string(),
                    value: value.to_string(),
                })
            }
            ParseMode::Types { fields } => {
                if let Some(name) = symbol.strip_suffix(SIZE_SUFFIX) {
                    // Unconditional: later fields belong to this type.
                    self.current_type = Some(name.to_string());
                    return Some(Record::TypeSize {
                        name: name.to_string(),
                        size: value.to_string(),
                    });
                }

                if !fields {
                    return None;
                }

                let type_name = self.current_type.as_deref()?;
                let field = symbol
                    .strip_prefix(type_name)
                    .and_then(|rest| rest.strip_prefix('_'))?;

                Some(Record::FieldOffset {
                    type_name: type_name.to_string(),
                    field: field.to_string(),
                    offset: value.to_string(),
                })
            }
        }
    }
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            let line = self.lines.next()?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 3 || fields[0] != DEFINE_MARKER {
                continue;
            }
            if let Some(record) = self.record_for(fields[1], fields[2]) {
                return Some(record);
            }
        }
    }
}
