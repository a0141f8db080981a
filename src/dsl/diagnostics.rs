//! Recorded (recoverable) parse errors and their line/caret rendering.

use std::fmt;

use thiserror::Error;

use super::lexer::Keyword;
use crate::error::LogsimError;

/// A problem the parser records before carrying on with the next entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("KEYWORD: {keyword} not found")]
    MissingKeyword { keyword: Keyword },

    #[error("Incorrect keyword: expected {expected}")]
    IncorrectKeyword { expected: Keyword },

    #[error("{name} not found")]
    UndefinedDevice { name: String },

    #[error("Device not defined: {name}")]
    DeviceNotDefined { name: String },

    #[error("{port} is not an output of {device}")]
    NotAnOutputOf { port: String, device: String },

    #[error("Expected an output")]
    ExpectedOutput,

    #[error("{device} needs an output port (Q or QBAR)")]
    MissingOutputPort { device: String },

    #[error("Expected an input to be connected")]
    OutputToOutput,

    #[error("Expected an output to drive this input")]
    InputToInput,

    #[error("Input is already connected to another port")]
    InputConnected,

    #[error("{port} is not an input of {device}")]
    NotAnInputOf { port: String, device: String },

    #[error("Incorrect input {port}. Expected integer between 1 and {max}")]
    InputOutOfRange { port: String, max: u64 },

    #[error("{device}.{port} not found")]
    PortNotFound { device: String, port: String },

    #[error("Invalid port for {device}")]
    InvalidPort { device: String },

    #[error("Selected output is already getting monitored")]
    AlreadyMonitored,

    #[error("{device}'s input {port} is floating")]
    FloatingInput { device: String, port: String },
}

/// Either severity of parse fault. Checks that can end either way return
/// this, and the parser records or aborts by matching on it.
#[derive(Debug)]
pub enum Fault {
    /// Abort the parse
    Fatal(LogsimError),
    /// Count, keep, continue
    Recorded(SemanticError),
}

impl From<LogsimError> for Fault {
    fn from(err: LogsimError) -> Self {
        Self::Fatal(err)
    }
}

impl From<SemanticError> for Fault {
    fn from(err: SemanticError) -> Self {
        Self::Recorded(err)
    }
}

/// A recorded error with the source position it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 0-indexed (line, column), when the error has a position
    pub location: Option<(usize, usize)>,
    /// Text of the offending line
    pub line_text: Option<String>,
    pub error: SemanticError,
}

impl Diagnostic {
    pub fn new(source: &str, location: Option<(usize, usize)>, error: SemanticError) -> Self {
        let line_text = location.and_then(|(line, _)| source.lines().nth(line).map(str::to_string));
        Self {
            location,
            line_text,
            error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some((line, column)), Some(text)) = (self.location, &self.line_text) {
            write!(f, "{}", caret_block(line, column, text))?;
        }
        write!(f, "{}", self.error)
    }
}

/// Render the `Line N` header, the source line and a caret under `column`.
///
/// Returns an empty string if `line` is past the end of `source`.
pub fn render_location(source: &str, line: usize, column: usize) -> String {
    source
        .lines()
        .nth(line)
        .map(|text| caret_block(line, column, text))
        .unwrap_or_default()
}

fn caret_block(line: usize, column: usize, text: &str) -> String {
    let width = text.chars().count();
    format!("Line {}:\n{}\n{}^\n", line, text, " ".repeat(column.min(width)))
}
