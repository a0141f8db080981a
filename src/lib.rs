//! # Logsim Core
//!
//! A compiler and cycle-based simulator for small digital logic circuits.
//!
//! This library provides:
//! - A definition language for declaring devices, wiring them and choosing
//!   which outputs to watch
//! - A parser that reports as many problems as it can in one pass, with the
//!   offending source line and a caret under each
//! - Logic gates, clocks, switches, signal generators and D-type flip-flops
//! - Cycle-by-cycle execution with per-output signal traces
//!
//! ## Architecture
//!
//! - [`names`] - Interning table shared by every part of a circuit
//! - [`dsl`] - Lexer and parser for the definition language
//! - [`circuit`] - Devices, wiring, monitors and network execution
//! - [`error`] - Fatal error type
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! logsim circuit.def --cycles 20 --switch SW1=1
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use logsim_core::dsl;
//!
//! let compiled = dsl::compile_file("circuit.def".as_ref())?;
//! for diagnostic in &compiled.diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! if compiled.is_ok() {
//!     let mut circuit = compiled.circuit;
//!     circuit.run(10)?;
//!     print!("{}", circuit.display_signals());
//! }
//! # Ok::<(), logsim_core::LogsimError>(())
//! ```

pub mod circuit;
pub mod dsl;
pub mod error;
pub mod names;

// Re-export main types for convenience
pub use circuit::Circuit;
pub use dsl::Parser;
pub use error::{LogsimError, Result};

/// Default number of cycles the CLI simulates
pub const DEFAULT_CYCLES: usize = 10;
