//! Error types for the logic simulator.
//!
//! [`LogsimError`] covers every condition that aborts work immediately: lexical
//! faults, rigid-grammar syntax faults, parameter values out of their domain,
//! and failures while simulating. Faults that the parser records and steps over
//! are [`SemanticError`](crate::dsl::SemanticError)s instead.

use thiserror::Error;

use crate::circuit::DeviceError;

/// Result type alias using [`LogsimError`].
pub type Result<T> = std::result::Result<T, LogsimError>;

/// Unified fatal error type for all Logsim operations.
///
/// Lines and columns are 0-based.
#[derive(Error, Debug)]
pub enum LogsimError {
    // ============ Lexical Errors ============
    /// A character that starts no token
    #[error("Unknown symbol '{symbol}' at line {line}, column {column}")]
    UnknownSymbol {
        symbol: char,
        line: usize,
        column: usize,
    },

    /// '-' not followed by '>'
    #[error("Expected a '>' after '-' at line {line}, column {column}")]
    ExpectedArrow { line: usize, column: usize },

    // ============ Syntax Errors ============
    /// A device name was required
    #[error("Expected a device name at line {line}, column {column}")]
    ExpectedName { line: usize, column: usize },

    /// Missing '=' in a device declaration
    #[error("Expected '=' at line {line}, column {column}")]
    ExpectedEquals { line: usize, column: usize },

    /// Missing ';' at the end of an entry
    #[error("Expected ';' at line {line}, column {column}")]
    ExpectedSemicolon { line: usize, column: usize },

    /// Missing ',' between parameters or destinations
    #[error("Expected ',' at line {line}, column {column}")]
    ExpectedComma { line: usize, column: usize },

    /// A numeric parameter was required
    #[error("Expected a number at line {line}, column {column}")]
    ExpectedNumber { line: usize, column: usize },

    /// Something other than '->' where a connection was expected
    #[error("This is not the symbol for connection at line {line}, column {column}")]
    ExpectedConnection { line: usize, column: usize },

    /// ',' directly after a connection source
    #[error("Expected only an output at line {line}, column {column}")]
    InvalidVariable { line: usize, column: usize },

    /// Device named after a device type, port or keyword
    #[error("'{name}' is not a valid device name (line {line})")]
    InvalidDeviceName {
        name: String,
        line: usize,
        column: usize,
    },

    /// Device name declared twice
    #[error("'{name}' has already been used (line {line})")]
    DuplicateDevice {
        name: String,
        line: usize,
        column: usize,
    },

    /// Type name that is neither a gate nor a device kind
    #[error("'{name}' is not a valid device type (line {line})")]
    UnknownDeviceType {
        name: String,
        line: usize,
        column: usize,
    },

    /// Kind that needs parameters declared without them
    #[error("Expected input specifications for {kind} type (line {line})")]
    MissingParameter {
        kind: String,
        line: usize,
        column: usize,
    },

    /// Kind that takes no parameters declared with one
    #[error("{kind} does not need input specification (line {line})")]
    UnexpectedParameter {
        kind: String,
        line: usize,
        column: usize,
    },

    // ============ Value Errors ============
    /// Parameter outside its valid range
    #[error("Invalid value {value} for {kind} (line {line}): {message}")]
    ParameterOutOfRange {
        kind: String,
        value: u64,
        message: String,
        line: usize,
        column: usize,
    },

    /// Numeric literal too large to represent
    #[error("Number {text} is too large (line {line})")]
    NumberTooLarge {
        text: String,
        line: usize,
        column: usize,
    },

    // ============ Model Errors ============
    /// The device model refused a validated declaration
    #[error("Could not create device '{name}': {source}")]
    DeviceCreation {
        name: String,
        #[source]
        source: DeviceError,
    },

    // ============ Lifecycle Errors ============
    /// `parse_network` called twice on one parser
    #[error("This parser has already parsed its input")]
    AlreadyParsed,

    /// Parse reached the end with recorded errors
    #[error("Compilation failed with {errors} error(s)")]
    CompilationFailed { errors: usize },

    // ============ Simulation Errors ============
    /// Network did not settle within the iteration limit
    #[error("Network oscillating at cycle {cycle}")]
    Oscillation { cycle: usize },

    /// Switch override naming a device that is not a switch
    #[error("'{name}' is not a switch")]
    UnknownSwitch { name: String },

    // ============ I/O Errors ============
    /// Error reading the definition file
    #[error("Failed to read definition file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl LogsimError {
    /// Create a parameter range error
    pub fn out_of_range(
        kind: impl Into<String>,
        value: u64,
        message: impl Into<String>,
        (line, column): (usize, usize),
    ) -> Self {
        Self::ParameterOutOfRange {
            kind: kind.into(),
            value,
            message: message.into(),
            line,
            column,
        }
    }

    /// Source position the error refers to, if any.
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            Self::UnknownSymbol { line, column, .. }
            | Self::ExpectedArrow { line, column }
            | Self::ExpectedName { line, column }
            | Self::ExpectedEquals { line, column }
            | Self::ExpectedSemicolon { line, column }
            | Self::ExpectedComma { line, column }
            | Self::ExpectedNumber { line, column }
            | Self::ExpectedConnection { line, column }
            | Self::InvalidVariable { line, column }
            | Self::InvalidDeviceName { line, column, .. }
            | Self::DuplicateDevice { line, column, .. }
            | Self::UnknownDeviceType { line, column, .. }
            | Self::MissingParameter { line, column, .. }
            | Self::UnexpectedParameter { line, column, .. }
            | Self::ParameterOutOfRange { line, column, .. }
            | Self::NumberTooLarge { line, column, .. } => Some((*line, *column)),
            _ => None,
        }
    }

    /// Whether this is a value-domain error rather than a syntax error.
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            Self::ParameterOutOfRange { .. } | Self::NumberTooLarge { .. }
        )
    }

    /// Whether the lexer raised this error.
    pub fn is_lexical(&self) -> bool {
        matches!(self, Self::UnknownSymbol { .. } | Self::ExpectedArrow { .. })
    }
}
