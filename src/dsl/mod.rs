//! Compiler for the circuit definition language.
//!
//! A definition file has four sections, always in this order, each opened
//! by its keyword. Whitespace is free-form and `//` opens a comment that
//! runs to the next `//`.
//!
//! # Grammar Overview
//!
//! ```text
//! network     = "DEVICES" { device } "CONNECT" { connection }
//!               "MONITOR" { monitor } "END"
//! device      = name "=" type [ "," number [ "," number ] ] ";"
//! connection  = signal "->" signal { "," signal } ";"
//! monitor     = signal ";"
//! signal      = name [ "." name ]
//!
//! name        = letter { letter | digit }
//! number      = digit { digit }
//! type        = "AND" | "OR" | "NAND" | "NOR" | "XOR"
//!             | "CLOCK" | "SWITCH" | "DTYPE" | "SIGGEN"
//! ```
//!
//! # Device Types
//!
//! | Type | Parameters | Inputs | Outputs |
//! |------|------------|--------|---------|
//! | AND, OR, NAND, NOR | input count, 1-16 | `I1`..`In` | unnamed |
//! | XOR | none | `I1`, `I2` | unnamed |
//! | CLOCK | half-period in cycles, >= 1 | none | unnamed |
//! | SWITCH | initial state, 0 or 1 | none | unnamed |
//! | DTYPE | none | `CLK`, `SET`, `CLEAR`, `DATA` | `Q`, `QBAR` |
//! | SIGGEN | cycles high, cycles low, both >= 1 | none | unnamed |
//!
//! Unconnected D-type inputs are tied low. Any other unconnected input is an
//! error.
//!
//! # Example
//!
//! ```text
//! DEVICES
//! G1 = AND, 2;
//! SW1 = SWITCH, 0;
//! SW2 = SWITCH, 1;
//!
//! CONNECT
//! SW1 -> G1.I1;
//! SW2 -> G1.I2;
//!
//! MONITOR
//! G1;   // the AND output //
//!
//! END
//! ```

mod diagnostics;
mod lexer;
mod parser;
mod prescan;

use std::fs;
use std::path::Path;

pub use diagnostics::{render_location, Diagnostic, Fault, SemanticError};
pub use lexer::{Keyword, Lexer, Token, TokenKind};
pub use parser::{Parser, GROUND_NAME};
pub use prescan::missing_keywords;

use crate::circuit::Circuit;
use crate::error::{LogsimError, Result};
use crate::names::NameId;

/// Outcome of a parse that did not hit a fatal error.
#[derive(Debug)]
pub struct Compiled {
    pub circuit: Circuit,
    pub diagnostics: Vec<Diagnostic>,
    /// Id of the `END` keyword, present only when nothing was recorded
    pub terminator: Option<NameId>,
}

impl Compiled {
    pub fn is_ok(&self) -> bool {
        self.terminator.is_some()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }
}

/// Compile definition-language source into a circuit.
pub fn compile(source: &str) -> Result<Compiled> {
    compile_into(source, Circuit::new())
}

/// Compile into a caller-supplied (empty) circuit, e.g. one built with a
/// custom [`NetworkConfig`](crate::circuit::NetworkConfig).
pub fn compile_into(source: &str, circuit: Circuit) -> Result<Compiled> {
    let mut parser = Parser::new(source, circuit);
    let terminator = parser.parse_network()?;
    let diagnostics = parser.diagnostics().to_vec();
    Ok(Compiled {
        circuit: parser.into_circuit(),
        diagnostics,
        terminator,
    })
}

/// Read a definition file.
pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| LogsimError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Compile a definition file.
pub fn compile_file(path: &Path) -> Result<Compiled> {
    let source = read_source(path)?;
    compile(&source)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::circuit::NetworkConfig;

    const RS_LATCH: &str = "\
DEVICES
S = SWITCH, 1;
R = SWITCH, 1;
N1 = NAND, 2;
N2 = NAND, 2;
CONNECT
S -> N1.I1;
R -> N2.I2;
N1 -> N2.I1;
N2 -> N1.I2;
MONITOR
N1;
N2;
END
";

    #[test]
    fn test_compile_ok() {
        let compiled = compile(RS_LATCH).unwrap();
        assert!(compiled.is_ok());
        assert_eq!(compiled.error_count(), 0);
        assert_eq!(compiled.circuit.monitors.len(), 2);
    }

    #[test]
    fn test_compile_recorded_errors() {
        let compiled = compile("DEVICES\nG1 = AND, 1;\nCONNECT\nMONITOR\nG1;\nEND").unwrap();
        assert!(!compiled.is_ok());
        assert_eq!(compiled.error_count(), 1);
        assert_eq!(
            compiled.diagnostics[0].error,
            SemanticError::FloatingInput {
                device: "G1".into(),
                port: "I1".into()
            }
        );
    }

    #[test]
    fn test_compile_fatal() {
        let err = compile("DEVICES\nG1 = AND, 17;\nCONNECT\nMONITOR\nEND").unwrap_err();
        assert!(err.is_value_error());
    }

    #[test]
    fn test_compile_into_custom_config() {
        let circuit = Circuit::with_config(NetworkConfig::new().with_max_iterations(3));
        let compiled = compile_into(RS_LATCH, circuit).unwrap();
        assert_eq!(compiled.circuit.network.config().max_iterations, 3);
    }

    #[test]
    fn test_compile_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(RS_LATCH.as_bytes()).unwrap();
        let compiled = compile_file(file.path()).unwrap();
        assert!(compiled.is_ok());
    }

    #[test]
    fn test_compile_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = compile_file(&dir.path().join("absent.def")).unwrap_err();
        assert!(matches!(err, LogsimError::FileReadError { .. }));
    }
}
