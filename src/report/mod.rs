//! Name matching and reporting
//!
//! Filters parsed header records against the names asked for on the command
//! line, prints each match as it is found, and remembers which names were
//! never seen.

use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use sizeof_asmhdr::{ParseMode, Record};

/// What a run reports. Constants and type layouts are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportMode {
    /// Integer constant values
    Constants,

    /// Type sizes, and field offsets when `fields` is set
    Types { fields: bool },
}

impl ReportMode {
    /// Mode for the `-c` / `-f` flags; `-c` wins.
    pub fn from_flags(constants: bool, fields: bool) -> Self {
        if constants {
            ReportMode::Constants
        } else {
            ReportMode::Types { fields }
        }
    }

    pub fn parse_mode(self) -> ParseMode {
        match self {
            ReportMode::Constants => ParseMode::Constants,
            ReportMode::Types { fields } => ParseMode::Types { fields },
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportMode::Constants => write!(f, "constants"),
            ReportMode::Types { fields: false } => write!(f, "sizes"),
            ReportMode::Types { fields: true } => write!(f, "sizes and fields"),
        }
    }
}

#[derive(Debug, Clone)]
struct Request {
    name: String,
    found: bool,
}

/// Names asked for, each pending until first matched.
///
/// An empty set asks for everything.
#[derive(Debug, Clone, Default)]
pub struct RequestSet {
    requests: Vec<Request>,
}

impl RequestSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            requests: names
                .into_iter()
                .map(|name| Request {
                    name: name.into(),
                    found: false,
                })
                .collect(),
        }
    }

    /// Whether no names were asked for
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Mark the first pending request for `name` found.
    ///
    /// Returns false when no pending request has that name, including when
    /// it was already found.
    pub fn mark_found(&mut self, name: &str) -> bool {
        match self
            .requests
            .iter_mut()
            .find(|r| !r.found && r.name == name)
        {
            Some(request) => {
                request.found = true;
                true
            }
            None => false,
        }
    }

    /// Whether a record called `name` should be reported
    pub fn accepts(&mut self, name: &str) -> bool {
        self.is_empty() || self.mark_found(name)
    }

    /// Requested names never found, in request order
    pub fn pending(&self) -> Vec<String> {
        self.requests
            .iter()
            .filter(|r| !r.found)
            .map(|r| r.name.clone())
            .collect()
    }
}

/// Outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Import path of the inspected package
    pub unit: String,

    pub mode: ReportMode,

    /// Reported records, in header order
    pub matches: Vec<Record>,

    /// Requested names that were never found
    pub missing: Vec<String>,
}

impl Report {
    /// 0 when every requested name was found, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.missing.is_empty() {
            0
        } else {
            1
        }
    }

    /// One diagnostic line per missing name
    pub fn missing_lines(&self) -> Vec<String> {
        self.missing
            .iter()
            .map(|name| format!("cannot find type {}", name))
            .collect()
    }
}

/// Matches records against a [`RequestSet`], printing as it goes.
pub struct Reporter<'a> {
    requests: RequestSet,
    mode: ReportMode,
    /// Whether the latest type size record was reported
    in_matched_type: bool,
    matches: Vec<Record>,
    out: Option<&'a mut dyn Write>,
}

impl<'a> Reporter<'a> {
    /// Reporter that only collects matches
    pub fn new(requests: RequestSet, mode: ReportMode) -> Self {
        Self {
            requests,
            mode,
            in_matched_type: false,
            matches: Vec::new(),
            out: None,
        }
    }

    /// Also print every match to `out` the moment it is found
    pub fn streaming(requests: RequestSet, mode: ReportMode, out: &'a mut dyn Write) -> Self {
        Self {
            out: Some(out),
            ..Self::new(requests, mode)
        }
    }

    /// Consider one record. Returns whether it was reported.
    pub fn offer(&mut self, record: Record) -> io::Result<bool> {
        let reported = match (&record, self.mode) {
            (Record::Constant { .. }, ReportMode::Constants) => {
                self.requests.accepts(record.name())
            }
            (Record::TypeSize { .. }, ReportMode::Types { .. }) => {
                self.in_matched_type = self.requests.accepts(record.name());
                self.in_matched_type
            }
            (Record::FieldOffset { .. }, ReportMode::Types { fields: true }) => {
                self.in_matched_type
            }
            _ => false,
        };

        if reported {
            if let Some(out) = self.out.as_mut() {
                writeln!(out, "{}", record)?;
            }
            self.matches.push(record);
        }
        Ok(reported)
    }

    /// Finish, producing the report for `unit`
    pub fn finish(self, unit: impl Into<String>) -> Report {
        Report {
            unit: unit.into(),
            mode: self.mode,
            matches: self.matches,
            missing: self.requests.pending(),
        }
    }
}
