//! Parser for the circuit definition language.
//!
//! Faults come in two severities. Anything that leaves the grammar with no
//! recovery point is a [`LogsimError`] and ends the parse at once. Semantic
//! faults (unknown devices, bad ports, floating inputs, a section keyword out
//! of place) are recorded as [`Diagnostic`]s and parsing carries on, so one
//! pass can report several of them.

use std::collections::HashMap;

use log::{debug, info};

use super::diagnostics::{Diagnostic, Fault, SemanticError};
use super::lexer::{Keyword, Lexer, Token, TokenKind};
use super::prescan;
use crate::circuit::{
    Circuit, ConnectOutcome, DeviceKind, MonitorOutcome, Signal, MAX_GATE_INPUTS,
};
use crate::error::{LogsimError, Result};
use crate::names::NameId;

/// Name of the always-low source wired to unused D-type inputs. The lexer
/// cannot produce it, so it never clashes with a declared device.
pub const GROUND_NAME: &str = "#GND";

/// Parser for one definition file. Single use.
pub struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    circuit: Circuit,
    error_count: usize,
    diagnostics: Vec<Diagnostic>,
    missing_keywords: Vec<Keyword>,
    /// Position of the most recently read token
    last: (usize, usize),
    declared_at: HashMap<NameId, (usize, usize)>,
    parsed: bool,
}

impl<'a> Parser<'a> {
    /// Create a parser that builds into `circuit`.
    pub fn new(source: &'a str, mut circuit: Circuit) -> Self {
        let lexer = Lexer::new(source, &mut circuit.names);
        Self {
            source,
            lexer,
            circuit,
            error_count: 0,
            diagnostics: Vec::new(),
            missing_keywords: Vec::new(),
            last: (0, 0),
            declared_at: HashMap::new(),
            parsed: false,
        }
    }

    /// Number of recorded errors so far.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Recorded errors, in the order found.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Section keywords the pre-scan could not find.
    pub fn missing_keywords(&self) -> &[Keyword] {
        &self.missing_keywords
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn into_circuit(self) -> Circuit {
        self.circuit
    }

    /// Parse the whole file and build the circuit.
    ///
    /// Returns the id of the `END` keyword if the file was parsed with no
    /// recorded errors, `None` if errors were recorded, and `Err` on the
    /// first fatal error.
    pub fn parse_network(&mut self) -> Result<Option<NameId>> {
        if self.parsed {
            return Err(LogsimError::AlreadyParsed);
        }
        self.parsed = true;

        self.missing_keywords = prescan::missing_keywords(self.source);
        for keyword in self.missing_keywords.clone() {
            self.record(None, SemanticError::MissingKeyword { keyword });
        }

        let mut token = self.advance()?;
        if !token.is_keyword() {
            self.record_once(
                Some(token.location()),
                SemanticError::IncorrectKeyword {
                    expected: Keyword::Devices,
                },
            );
            info!("number of errors found: {}", self.error_count);
            return Ok(None);
        }

        for expected in [Keyword::Devices, Keyword::Connect, Keyword::Monitor] {
            if token.keyword() != Some(expected) {
                self.record_once(
                    Some(token.location()),
                    SemanticError::IncorrectKeyword { expected },
                );
                continue;
            }
            debug!("parsing {} section at line {}", expected, token.line);
            token = match expected {
                Keyword::Devices => self.parse_devices()?,
                Keyword::Connect => self.parse_connections()?,
                _ => self.parse_monitors()?,
            };
        }

        if token.keyword() != Some(Keyword::End) {
            self.record_once(
                Some(token.location()),
                SemanticError::IncorrectKeyword {
                    expected: Keyword::End,
                },
            );
        }

        info!("number of errors found: {}", self.error_count);
        if token.keyword() == Some(Keyword::End) && self.error_count == 0 {
            Ok(token.name_id())
        } else {
            Ok(None)
        }
    }

    // ============ Devices ============

    /// Parse `NAME = TYPE [, N [, N]] ;` entries up to the next section.
    fn parse_devices(&mut self) -> Result<Token> {
        let mut token = self.advance()?;
        loop {
            if token.is_keyword() || token.kind == TokenKind::Eof {
                return Ok(token);
            }
            match self.parse_device(token) {
                Ok(()) => token = self.advance()?,
                Err(Fault::Fatal(err)) => return Err(err),
                Err(Fault::Recorded(error)) => {
                    self.record_once(Some(self.last), error);
                    return self.skip_to_section();
                }
            }
        }
    }

    fn parse_device(&mut self, name_token: Token) -> std::result::Result<(), Fault> {
        let id = expect_name(&name_token)?;
        let name = self.name(id);
        let (line, column) = name_token.location();

        if self.circuit.devices.is_reserved(id) {
            return Err(self.unless_missing(
                Keyword::Connect,
                LogsimError::InvalidDeviceName { name, line, column },
            ));
        }
        if self.circuit.devices.get_device(id).is_some() {
            return Err(self.unless_missing(
                Keyword::Connect,
                LogsimError::DuplicateDevice { name, line, column },
            ));
        }

        let equals = self.advance()?;
        if equals.kind != TokenKind::Equals {
            return Err(self.unless_missing(
                Keyword::Connect,
                LogsimError::ExpectedEquals {
                    line: equals.line,
                    column: equals.column,
                },
            ));
        }

        let kind_token = self.advance()?;
        let kind_id = expect_name(&kind_token)?;
        let kind = self.circuit.devices.kind_of(kind_id).ok_or_else(|| {
            LogsimError::UnknownDeviceType {
                name: self.name(kind_id),
                line: kind_token.line,
                column: kind_token.column,
            }
        })?;

        let mut params = Vec::with_capacity(2);
        let mut next = self.advance()?;
        if next.kind == TokenKind::Comma {
            let number = self.advance()?;
            params.push(check_parameter(kind, &number)?);
            next = self.advance()?;

            if kind == DeviceKind::SigGen {
                if next.kind != TokenKind::Comma {
                    return Err(LogsimError::ExpectedComma {
                        line: next.line,
                        column: next.column,
                    }
                    .into());
                }
                let number = self.advance()?;
                params.push(check_parameter(kind, &number)?);
                next = self.advance()?;
            }
        } else if next.kind == TokenKind::Semicolon && kind.parameter_count() > 0 {
            return Err(LogsimError::MissingParameter {
                kind: kind.to_string(),
                line: kind_token.line,
                column: kind_token.column,
            }
            .into());
        }

        if next.kind != TokenKind::Semicolon {
            return Err(LogsimError::ExpectedSemicolon {
                line: next.line,
                column: next.column,
            }
            .into());
        }

        self.circuit
            .devices
            .make_device(id, kind, params.first().copied(), params.get(1).copied())
            .map_err(|source| LogsimError::DeviceCreation {
                name: name.clone(),
                source,
            })?;
        self.declared_at.insert(id, (line, column));
        debug!("declared {} = {} {:?}", name, kind, params);
        Ok(())
    }

    // ============ Connections ============

    /// Parse `SRC[.PORT] -> DST[.PORT] {, DST[.PORT]} ;` entries up to the
    /// next section.
    fn parse_connections(&mut self) -> Result<Token> {
        let mut token = self.advance()?;
        loop {
            match token.kind {
                TokenKind::Name(id) => match self.parse_connection(token, id) {
                    Ok(next) => token = next,
                    Err(Fault::Fatal(err)) => return Err(err),
                    Err(Fault::Recorded(error)) => {
                        self.record_once(Some(self.last), error);
                        return self.skip_to_section();
                    }
                },
                TokenKind::Keyword(..) | TokenKind::Eof => return Ok(token),
                _ => {
                    return Err(LogsimError::ExpectedName {
                        line: token.line,
                        column: token.column,
                    })
                }
            }
        }
    }

    /// Parse one connection entry and return the token after it.
    fn parse_connection(
        &mut self,
        source_token: Token,
        source_id: NameId,
    ) -> std::result::Result<Token, Fault> {
        let Some(source_kind) = self.circuit.devices.get_device(source_id).map(|d| d.kind) else {
            let name = self.name(source_id);
            self.record(
                Some(source_token.location()),
                SemanticError::UndefinedDevice { name },
            );
            return Ok(self.skip_entry()?);
        };

        let mut source_port = None;
        let mut source_valid = true;
        let mut token = self.advance()?;

        if source_kind == DeviceKind::DType {
            if token.kind == TokenKind::Dot {
                let port_token = self.advance()?;
                let port = expect_name(&port_token)?;
                if self.circuit.devices.is_dtype_output(port) {
                    source_port = Some(port);
                } else {
                    let error = SemanticError::NotAnOutputOf {
                        port: self.name(port),
                        device: self.name(source_id),
                    };
                    self.record(Some(port_token.location()), error);
                    source_valid = false;
                }
                token = self.advance()?;
            } else {
                let error = SemanticError::MissingOutputPort {
                    device: self.name(source_id),
                };
                self.record(Some(token.location()), error);
                source_valid = false;
            }
        }

        match token.kind {
            TokenKind::Arrow => {}
            TokenKind::Dot if source_kind != DeviceKind::DType => {
                let port_token = self.advance()?;
                let error = match port_token.kind {
                    TokenKind::Name(port) if self.circuit.devices.is_dtype_output(port) => {
                        SemanticError::NotAnOutputOf {
                            port: self.name(port),
                            device: self.name(source_id),
                        }
                    }
                    _ => SemanticError::ExpectedOutput,
                };
                self.record(Some(port_token.location()), error);
                self.skip_to_arrow()?;
            }
            TokenKind::Comma => {
                return Err(LogsimError::InvalidVariable {
                    line: token.line,
                    column: token.column,
                }
                .into());
            }
            _ => {
                return Err(self.unless_missing(
                    Keyword::Monitor,
                    LogsimError::ExpectedConnection {
                        line: token.line,
                        column: token.column,
                    },
                ));
            }
        }

        let mut token = self.advance()?;
        loop {
            let dest_id = expect_name(&token)?;
            let dest_token = token;
            let mut dest_port = None;
            let mut separator = self.advance()?;
            if separator.kind == TokenKind::Dot {
                let port_token = self.advance()?;
                dest_port = Some(expect_name(&port_token)?);
                separator = self.advance()?;
            }

            if source_valid {
                let outcome = self.circuit.network.make_connection(
                    &mut self.circuit.devices,
                    source_id,
                    source_port,
                    dest_id,
                    dest_port,
                );
                self.check_connection(outcome, &dest_token, dest_id, dest_port);
            }

            match separator.kind {
                TokenKind::Comma => token = self.advance()?,
                TokenKind::Semicolon => return Ok(self.advance()?),
                TokenKind::Name(_) => {
                    return Err(LogsimError::ExpectedComma {
                        line: separator.line,
                        column: separator.column,
                    }
                    .into())
                }
                _ => {
                    return Err(LogsimError::ExpectedSemicolon {
                        line: separator.line,
                        column: separator.column,
                    }
                    .into())
                }
            }
        }
    }

    /// Record the error, if any, behind a connection outcome.
    fn check_connection(
        &mut self,
        outcome: ConnectOutcome,
        dest_token: &Token,
        dest_id: NameId,
        dest_port: Option<NameId>,
    ) {
        let error = match outcome {
            ConnectOutcome::Ok => return,
            ConnectOutcome::DeviceAbsent => SemanticError::DeviceNotDefined {
                name: self.name(dest_id),
            },
            ConnectOutcome::OutputToOutput => SemanticError::OutputToOutput,
            ConnectOutcome::InputToInput => SemanticError::InputToInput,
            ConnectOutcome::InputConnected => SemanticError::InputConnected,
            ConnectOutcome::PortAbsent => self.port_absent(dest_id, dest_port),
        };
        self.record(Some(dest_token.location()), error);
    }

    fn port_absent(&self, dest_id: NameId, dest_port: Option<NameId>) -> SemanticError {
        let device = self.name(dest_id);
        let Some(port_id) = dest_port else {
            return SemanticError::InvalidPort { device };
        };
        let port = self.name(port_id);

        if self.circuit.devices.is_dtype_input(port_id) {
            return SemanticError::NotAnInputOf { port, device };
        }
        let index = port.strip_prefix('I').and_then(|n| n.parse::<u64>().ok());
        match index {
            Some(n) if !(1..=MAX_GATE_INPUTS).contains(&n) => SemanticError::InputOutOfRange {
                port,
                max: MAX_GATE_INPUTS,
            },
            _ => SemanticError::PortNotFound { device, port },
        }
    }

    // ============ Monitors ============

    /// Parse `NAME[.PORT] ;` entries, then ground unused D-type inputs and
    /// record every input still floating.
    fn parse_monitors(&mut self) -> Result<Token> {
        let mut token = self.advance()?;
        while let TokenKind::Name(id) = token.kind {
            self.parse_monitor(token, id)?;
            token = self.advance()?;
        }
        self.ground_dtype_inputs();
        self.record_floating_inputs();
        Ok(token)
    }

    fn parse_monitor(&mut self, name_token: Token, id: NameId) -> Result<()> {
        let kind = self.circuit.devices.get_device(id).map(|d| d.kind);
        let mut port = None;
        let mut valid = true;
        let mut token = self.advance()?;

        if kind == Some(DeviceKind::DType) {
            if token.kind == TokenKind::Dot {
                let port_token = self.advance()?;
                let port_id = expect_name(&port_token)?;
                if self.circuit.devices.is_dtype_output(port_id) {
                    port = Some(port_id);
                } else {
                    self.record(Some(port_token.location()), SemanticError::ExpectedOutput);
                    valid = false;
                }
                token = self.advance()?;
            } else {
                self.record(Some(token.location()), SemanticError::ExpectedOutput);
                valid = false;
            }
        } else if token.kind == TokenKind::Dot {
            let port_token = self.advance()?;
            expect_name(&port_token)?;
            // an unknown device is reported once, below
            if kind.is_some() {
                self.record(Some(port_token.location()), SemanticError::ExpectedOutput);
                valid = false;
            }
            token = self.advance()?;
        }

        if token.kind != TokenKind::Semicolon {
            return Err(LogsimError::ExpectedSemicolon {
                line: token.line,
                column: token.column,
            });
        }

        if valid {
            let outcome = self
                .circuit
                .monitors
                .make_monitor(&self.circuit.devices, id, port, 0);
            let error = match outcome {
                MonitorOutcome::Ok => None,
                MonitorOutcome::NotOutput => Some(SemanticError::ExpectedOutput),
                MonitorOutcome::DeviceAbsent => Some(SemanticError::DeviceNotDefined {
                    name: self.name(id),
                }),
                MonitorOutcome::AlreadyMonitored => Some(SemanticError::AlreadyMonitored),
            };
            if let Some(error) = error {
                self.record(Some(name_token.location()), error);
            }
        }
        Ok(())
    }

    /// Wire every unconnected D-type input to an always-low source.
    fn ground_dtype_inputs(&mut self) {
        let network = &self.circuit.network;
        let floating: Vec<(NameId, NameId)> = self
            .circuit
            .devices
            .iter()
            .filter(|d| d.kind == DeviceKind::DType)
            .flat_map(|d| network.floating_inputs(d).into_iter().map(move |p| (d.id, p)))
            .collect();
        if floating.is_empty() {
            return;
        }

        let ground = self.circuit.names.lookup_one(GROUND_NAME);
        if self.circuit.devices.get_device(ground).is_none() {
            self.circuit.devices.make_switch(ground, Signal::Low);
        }
        for (device, port) in floating {
            self.circuit.network.make_connection(
                &mut self.circuit.devices,
                ground,
                None,
                device,
                Some(port),
            );
        }
        debug!("grounded unused D-type inputs");
    }

    /// Record one error per unconnected input outside clocks and switches.
    fn record_floating_inputs(&mut self) {
        let network = &self.circuit.network;
        let floating: Vec<(NameId, NameId)> = self
            .circuit
            .devices
            .iter()
            .filter(|d| !matches!(d.kind, DeviceKind::Clock | DeviceKind::Switch))
            .flat_map(|d| network.floating_inputs(d).into_iter().map(move |p| (d.id, p)))
            .collect();

        for (device, port) in floating {
            let location = self.declared_at.get(&device).copied();
            let error = SemanticError::FloatingInput {
                device: self.name(device),
                port: self.name(port),
            };
            self.record(location, error);
        }
    }

    // ============ Helpers ============

    fn advance(&mut self) -> Result<Token> {
        let token = self.lexer.next_token(&mut self.circuit.names)?;
        self.last = token.location();
        Ok(token)
    }

    /// Skip to the next section keyword or end of input.
    fn skip_to_section(&mut self) -> Result<Token> {
        loop {
            let token = self.advance()?;
            if token.is_keyword() || token.kind == TokenKind::Eof {
                return Ok(token);
            }
        }
    }

    /// Skip the rest of a malformed entry; return the token after its `;`.
    fn skip_entry(&mut self) -> Result<Token> {
        loop {
            let token = self.advance()?;
            match token.kind {
                TokenKind::Semicolon => return self.advance(),
                TokenKind::Keyword(..) | TokenKind::Eof => return Ok(token),
                _ => {}
            }
        }
    }

    /// Skip up to and including the next `->` of this entry.
    fn skip_to_arrow(&mut self) -> Result<()> {
        loop {
            let token = self.advance()?;
            match token.kind {
                TokenKind::Arrow => return Ok(()),
                TokenKind::Semicolon | TokenKind::Keyword(..) | TokenKind::Eof => {
                    return Err(LogsimError::ExpectedConnection {
                        line: token.line,
                        column: token.column,
                    })
                }
                _ => {}
            }
        }
    }

    /// `err` is fatal unless the pre-scan found `keyword` missing, in which
    /// case the likelier cause is the missing section.
    fn unless_missing(&self, keyword: Keyword, err: LogsimError) -> Fault {
        if self.missing_keywords.contains(&keyword) {
            debug!("{} downgraded: {} is missing", err, keyword);
            Fault::Recorded(SemanticError::IncorrectKeyword { expected: keyword })
        } else {
            Fault::Fatal(err)
        }
    }

    fn record(&mut self, location: Option<(usize, usize)>, error: SemanticError) {
        debug!("error at {:?}: {}", location, error);
        self.error_count += 1;
        self.diagnostics
            .push(Diagnostic::new(self.source, location, error));
    }

    /// Like `record`, but skip an exact repeat of the previous error.
    fn record_once(&mut self, location: Option<(usize, usize)>, error: SemanticError) {
        if self.diagnostics.last().map_or(false, |d| d.error == error) {
            return;
        }
        self.record(location, error);
    }

    fn name(&self, id: NameId) -> String {
        self.circuit.names.display(id)
    }
}

fn expect_name(token: &Token) -> Result<NameId> {
    match token.kind {
        TokenKind::Name(id) => Ok(id),
        _ => Err(LogsimError::ExpectedName {
            line: token.line,
            column: token.column,
        }),
    }
}

/// Read a numeric parameter and check it against the range `kind` accepts.
fn check_parameter(kind: DeviceKind, token: &Token) -> Result<u64> {
    let at = token.location();
    let TokenKind::Number(value) = token.kind else {
        return Err(LogsimError::ExpectedNumber {
            line: token.line,
            column: token.column,
        });
    };
    match kind {
        DeviceKind::Xor | DeviceKind::DType => Err(LogsimError::UnexpectedParameter {
            kind: kind.to_string(),
            line: token.line,
            column: token.column,
        }),
        DeviceKind::And | DeviceKind::Or | DeviceKind::Nand | DeviceKind::Nor
            if !(1..=MAX_GATE_INPUTS).contains(&value) =>
        {
            Err(LogsimError::out_of_range(
                kind.as_str(),
                value,
                format!("expected gate input number between 1 and {}", MAX_GATE_INPUTS),
                at,
            ))
        }
        DeviceKind::Clock if value == 0 => Err(LogsimError::out_of_range(
            kind.as_str(),
            value,
            "expected a half-period greater than 0",
            at,
        )),
        DeviceKind::Switch if value > 1 => Err(LogsimError::out_of_range(
            kind.as_str(),
            value,
            "expected initial state 0 or 1",
            at,
        )),
        DeviceKind::SigGen if value == 0 => Err(LogsimError::out_of_range(
            kind.as_str(),
            value,
            "expected a cycle count greater than 0",
            at,
        )),
        _ => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const DEVICES: &str = "G1 = AND, 1;\nG2 = NAND, 2;\nG3 = OR, 3;\nG4 = NOR, 4;\n\
                           G5 = SWITCH, 1;\nG6 = CLOCK, 4;\nG7 = DTYPE;\nG8 = XOR;\n\n";

    const AND_FILE: &str = "G1 = AND, 2;\nSW1 = SWITCH, 0;\nSW2 = SWITCH, 0;\n\nCONNECT\n\
                            SW1 -> G1.I1;\nSW2 -> G1.I2;\n\nMONITOR\nG1;\n\nEND\n";

    fn parser(source: &str) -> Parser<'_> {
        Parser::new(source, Circuit::new())
    }

    fn parse(source: &str) -> (Result<Option<NameId>>, Parser<'_>) {
        let mut parser = parser(source);
        let result = parser.parse_network();
        (result, parser)
    }

    /// Parse the fixture devices, then the connections in `text`.
    fn connect(text: &str) -> (Result<Token>, Parser<'_>) {
        let mut parser = parser(text);
        let token = parser.parse_devices().and_then(|t| {
            assert_eq!(t.keyword(), Some(Keyword::Connect));
            parser.parse_connections()
        });
        (token, parser)
    }

    /// Parse the fixture devices, then the monitors in `text`.
    fn monitor(text: &str) -> (Result<Token>, Parser<'_>) {
        let mut parser = parser(text);
        let token = parser.parse_devices().and_then(|t| {
            assert_eq!(t.keyword(), Some(Keyword::Monitor));
            parser.parse_monitors()
        });
        (token, parser)
    }

    fn errors(parser: &Parser<'_>) -> Vec<SemanticError> {
        parser.diagnostics().iter().map(|d| d.error.clone()).collect()
    }

    // ============ Whole files ============

    #[test]
    fn test_and_gate_file() {
        let source = format!("DEVICES\n{}", AND_FILE);
        let (result, parser) = parse(&source);

        let end = result.unwrap();
        assert_eq!(end.and_then(|id| parser.circuit().names.get_name_string(id)), Some("END"));
        assert_eq!(parser.error_count(), 0);

        let circuit = parser.circuit();
        let g1 = circuit.names.query("G1").unwrap();
        let sw1 = circuit.names.query("SW1").unwrap();
        let i1 = circuit.names.query("I1").unwrap();
        assert_eq!(circuit.devices.find_devices(Some(DeviceKind::Switch)).len(), 2);
        assert_eq!(circuit.network.get_connected_output(&circuit.devices, g1, i1), Some((sw1, None)));
        assert_eq!(circuit.monitors.len(), 1);
    }

    #[test]
    fn test_and_gate_sections_without_header() {
        let mut parser = parser(AND_FILE);
        let token = parser.parse_devices().unwrap();
        assert_eq!(token.keyword(), Some(Keyword::Connect));
        let token = parser.parse_connections().unwrap();
        assert_eq!(token.keyword(), Some(Keyword::Monitor));
        let token = parser.parse_monitors().unwrap();
        assert_eq!(token.keyword(), Some(Keyword::End));
        assert_eq!(parser.error_count(), 0);
    }

    #[test]
    fn test_parse_twice() {
        let (result, mut parser) = parse("DEVICES CONNECT MONITOR END");
        assert!(result.unwrap().is_some());
        assert!(matches!(parser.parse_network(), Err(LogsimError::AlreadyParsed)));
    }

    #[test]
    fn test_empty_sections() {
        let (result, parser) = parse("DEVICES\nCONNECT\nMONITOR\nEND\n");
        assert!(result.unwrap().is_some());
        assert!(parser.circuit().devices.is_empty());
    }

    #[rstest]
    #[case("SW1 = SWITCH, 0;\nCONNECT\nMONITOR\nSW1;\nEND", Keyword::Devices)]
    #[case("DEVICES\nSW1 = SWITCH, 0;\nCONNECT\nMONITOR\nSW1;\n", Keyword::End)]
    #[case("DEVICES\nSW1 = SWITCH, 0;\nCONNECT\nSW1;\nEND", Keyword::Monitor)]
    fn test_missing_keyword_fails(#[case] source: &str, #[case] keyword: Keyword) {
        let (result, parser) = parse(source);
        assert_eq!(result.unwrap(), None);
        assert_eq!(parser.missing_keywords(), [keyword]);
        assert_eq!(errors(&parser)[0], SemanticError::MissingKeyword { keyword });
    }

    #[test]
    fn test_missing_connect_downgrades_device_error() {
        let source = "DEVICES\nSW1 = SWITCH, 0;\nSW1 -> G1.I1;\nMONITOR\nSW1;\nEND";
        let (result, parser) = parse(source);
        assert_eq!(result.unwrap(), None);
        assert_eq!(
            errors(&parser),
            vec![
                SemanticError::MissingKeyword { keyword: Keyword::Connect },
                SemanticError::IncorrectKeyword { expected: Keyword::Connect },
            ]
        );
        assert_eq!(parser.circuit().monitors.len(), 1);
    }

    #[test]
    fn test_missing_monitor_downgrades_connection_error() {
        let source = "DEVICES\nSW1 = SWITCH, 0;\nG1 = AND, 1;\nCONNECT\nSW1 -> G1.I1;\nG1;\nEND";
        let (result, parser) = parse(source);
        assert_eq!(result.unwrap(), None);
        assert_eq!(parser.error_count(), 2);
        assert_eq!(
            errors(&parser)[1],
            SemanticError::IncorrectKeyword { expected: Keyword::Monitor }
        );
    }

    #[test]
    fn test_duplicate_device_is_fatal_when_connect_present() {
        let source = "DEVICES\nSW1 = SWITCH, 0;\nSW1 = SWITCH, 1;\nCONNECT\nMONITOR\nEND";
        let (result, _) = parse(source);
        assert!(matches!(result, Err(LogsimError::DuplicateDevice { line: 2, .. })));
    }

    #[test]
    fn test_lexical_error_is_fatal() {
        let (result, _) = parse("DEVICES\nG1 = AND, 1 @;\nCONNECT\nMONITOR\nEND");
        let err = result.unwrap_err();
        assert!(err.is_lexical());
        assert_eq!(err.location(), Some((1, 12)));
    }

    // ============ Devices ============

    #[rstest]
    #[case("G1 = AND;")]
    #[case("G1 = NAND;")]
    #[case("G1 = OR;")]
    #[case("G1 = NOR;")]
    #[case("G1 = SWITCH;")]
    #[case("G1 = CLOCK;")]
    #[case("G1 = SIGGEN;")]
    fn test_missing_parameter(#[case] text: &str) {
        let err = parser(text).parse_devices().unwrap_err();
        assert!(matches!(err, LogsimError::MissingParameter { .. }), "{:?}", err);
    }

    #[rstest]
    #[case("G1 = DTYPE,1;")]
    #[case("G1 = XOR,1;")]
    fn test_unexpected_parameter(#[case] text: &str) {
        let err = parser(text).parse_devices().unwrap_err();
        assert!(matches!(err, LogsimError::UnexpectedParameter { .. }), "{:?}", err);
    }

    #[rstest]
    #[case("DTYPE = DTYPE;")]
    #[case("QBAR = XOR;")]
    fn test_reserved_device_name(#[case] text: &str) {
        let err = parser(text).parse_devices().unwrap_err();
        assert!(matches!(err, LogsimError::InvalidDeviceName { .. }), "{:?}", err);
    }

    #[rstest]
    #[case("G1 = DTYPE", "ExpectedSemicolon")]
    #[case("G1 -> DTYPE;", "ExpectedEquals")]
    #[case("G1 = 3;", "ExpectedName")]
    #[case("G1 = LATCH;", "UnknownDeviceType")]
    #[case("G1 = AND, X;", "ExpectedNumber")]
    #[case("G1 = AND, 2, 3;", "ExpectedSemicolon")]
    #[case("G1 = SIGGEN, 2;", "ExpectedComma")]
    #[case("G1 = XOR;\nG1 = XOR;", "DuplicateDevice")]
    #[case("G1 = XOR;\n;", "ExpectedName")]
    fn test_device_syntax_error(#[case] text: &str, #[case] variant: &str) {
        let err = parser(text).parse_devices().unwrap_err();
        assert!(format!("{:?}", err).starts_with(variant), "{:?}", err);
    }

    #[rstest]
    #[case("G1 = AND, 0;")]
    #[case("G1 = AND, 17;")]
    #[case("G1 = CLOCK, 0;")]
    #[case("G1 = SWITCH, 2;")]
    #[case("G1 = SIGGEN, 0, 1;")]
    #[case("G1 = SIGGEN, 1, 0;")]
    #[case("G1 = SWITCH, 18446744073709551617;")]
    #[case("G1 = SIGGEN, 99999999999999999999999, 1;")]
    fn test_parameter_out_of_range(#[case] text: &str) {
        let err = parser(text).parse_devices().unwrap_err();
        assert!(err.is_value_error(), "{:?}", err);
    }

    #[test]
    fn test_devices_created() {
        let mut parser = parser("G1 = AND, 16;\nCK = CLOCK, 3;\nS = SIGGEN, 2, 5;\nEND");
        let token = parser.parse_devices().unwrap();
        assert_eq!(token.keyword(), Some(Keyword::End));

        let circuit = parser.circuit();
        let g1 = circuit.names.query("G1").unwrap();
        assert_eq!(circuit.devices.get_device(g1).unwrap().inputs.len(), 16);
        let siggen = circuit.names.query("S").unwrap();
        assert_eq!(circuit.devices.get_device(siggen).unwrap().kind, DeviceKind::SigGen);
    }

    // ============ Connections ============

    #[rstest]
    #[case("G1 -> G2.I;")]
    #[case("G1 -> G2.I3;")]
    #[case("G9 -> G2.I1;")]
    #[case("G2.I1 -> G2.I2;")]
    #[case("G1 -> G2;")]
    #[case("G1 -> G2.I1;\nG2 -> G2.I1;")]
    #[case("G7 -> G1.I1;")]
    #[case("G7.DATA -> G1.I1;")]
    #[case("G1 -> G9.I1;")]
    #[case("G1 -> G7.Q;")]
    fn test_connection_records_one_error(#[case] text: &str) {
        let source = format!("{}CONNECT\n{}\nMONITOR\nEND", DEVICES, text);
        let (token, parser) = connect(&source);
        assert_eq!(token.unwrap().keyword(), Some(Keyword::Monitor));
        assert_eq!(parser.error_count(), 1, "{:?}", errors(&parser));
    }

    #[rstest]
    #[case("G1 -> G2.I;", SemanticError::PortNotFound { device: "G2".into(), port: "I".into() })]
    #[case("G1 -> G2.I3;", SemanticError::PortNotFound { device: "G2".into(), port: "I3".into() })]
    #[case("G1 -> G2.I17;", SemanticError::InputOutOfRange { port: "I17".into(), max: 16 })]
    #[case("G1 -> G3.Q;", SemanticError::PortNotFound { device: "G3".into(), port: "Q".into() })]
    #[case("G1 -> G2.DATA;", SemanticError::NotAnInputOf { port: "DATA".into(), device: "G2".into() })]
    #[case("G9 -> G2.I1;", SemanticError::UndefinedDevice { name: "G9".into() })]
    #[case("G1 -> G9.I1;", SemanticError::DeviceNotDefined { name: "G9".into() })]
    #[case("G1 -> G2;", SemanticError::OutputToOutput)]
    #[case("G1 -> G8;", SemanticError::OutputToOutput)]
    #[case("G1 -> G7;", SemanticError::InvalidPort { device: "G7".into() })]
    #[case("G2.I1 -> G2.I2;", SemanticError::ExpectedOutput)]
    #[case("G2.Q -> G1.I1;", SemanticError::NotAnOutputOf { port: "Q".into(), device: "G2".into() })]
    #[case("G7 -> G1.I1;", SemanticError::MissingOutputPort { device: "G7".into() })]
    #[case("G5 -> G3;", SemanticError::OutputToOutput)]
    #[case("G1 -> G2.I1, G3.I1, G2.I1;", SemanticError::InputConnected)]
    fn test_connection_error_kind(#[case] text: &str, #[case] expected: SemanticError) {
        let source = format!("{}CONNECT\n{}\nMONITOR\nEND", DEVICES, text);
        let (token, parser) = connect(&source);
        token.unwrap();
        assert_eq!(errors(&parser), vec![expected]);
    }

    #[rstest]
    #[case("G1 - G2.I1;", "ExpectedArrow")]
    #[case("G1 = G2.I1;", "ExpectedConnection")]
    #[case("G1 > G2.I1;", "UnknownSymbol")]
    #[case("G1 -> G2.I1\nMONITOR", "ExpectedSemicolon")]
    #[case("G1 -> G2.I1 G3.I1;", "ExpectedComma")]
    #[case("G1, G2.I1;", "InvalidVariable")]
    #[case("G1 -> ;", "ExpectedName")]
    #[case("G2.I1 G2.I2;", "ExpectedConnection")]
    fn test_connection_fatal(#[case] text: &str, #[case] variant: &str) {
        let source = format!("{}CONNECT\n{}\nMONITOR\nEND", DEVICES, text);
        let (token, _) = connect(&source);
        let err = token.unwrap_err();
        assert!(format!("{:?}", err).starts_with(variant), "{:?}", err);
    }

    #[test]
    fn test_connection_fanout() {
        let source = format!("{}CONNECT\nG5 -> G2.I1, G2.I2, G7.DATA;\nMONITOR\nEND", DEVICES);
        let (token, parser) = connect(&source);
        token.unwrap();
        assert_eq!(parser.error_count(), 0);

        let circuit = parser.circuit();
        let g5 = circuit.names.query("G5").unwrap();
        let g7 = circuit.names.query("G7").unwrap();
        let data = circuit.names.query("DATA").unwrap();
        assert_eq!(circuit.network.get_connected_output(&circuit.devices, g7, data), Some((g5, None)));
    }

    #[test]
    fn test_connection_ends_at_eof() {
        let (token, parser) = connect("SW = SWITCH, 0;\nCONNECT\n");
        assert_eq!(token.unwrap().kind, TokenKind::Eof);
        assert_eq!(parser.error_count(), 0);
    }

    // ============ Monitors ============

    #[rstest]
    #[case("G9;")]
    #[case("G1.I1;")]
    #[case("G7.DATA;")]
    #[case("G7;")]
    #[case("G1;\nG1;")]
    fn test_monitor_records_one_error_plus_floating(#[case] text: &str) {
        let source = format!("{}MONITOR\n{}\nEND", DEVICES, text);
        let (token, parser) = monitor(&source);
        assert_eq!(token.unwrap().keyword(), Some(Keyword::End));
        // 1 + 2 + 3 + 4 gate inputs and both XOR inputs float
        assert_eq!(parser.error_count(), 13, "{:?}", errors(&parser));
    }

    #[rstest]
    #[case("G9;", SemanticError::DeviceNotDefined { name: "G9".into() })]
    #[case("G9.Q;", SemanticError::DeviceNotDefined { name: "G9".into() })]
    #[case("G1.I1;", SemanticError::ExpectedOutput)]
    #[case("G7;", SemanticError::ExpectedOutput)]
    #[case("G1;\nG1;", SemanticError::AlreadyMonitored)]
    fn test_monitor_error_kind(#[case] text: &str, #[case] expected: SemanticError) {
        let source = format!("{}MONITOR\n{}\nEND", DEVICES, text);
        let (token, parser) = monitor(&source);
        token.unwrap();
        assert_eq!(errors(&parser)[0], expected);
    }

    #[rstest]
    #[case("G1\nEND")]
    #[case("G7.Q\nEND")]
    fn test_monitor_missing_semicolon(#[case] text: &str) {
        let source = format!("{}MONITOR\n{}", DEVICES, text);
        let (token, _) = monitor(&source);
        assert!(matches!(token, Err(LogsimError::ExpectedSemicolon { .. })));
    }

    #[test]
    fn test_monitor_dtype_outputs() {
        let source = "FF = DTYPE;\nMONITOR\nFF.Q;\nFF.QBAR;\nEND";
        let (token, parser) = monitor(source);
        token.unwrap();
        assert_eq!(parser.error_count(), 0);
        assert_eq!(parser.circuit().monitors.len(), 2);
    }

    #[test]
    fn test_dtype_inputs_grounded() {
        let (token, parser) = monitor("FF = DTYPE;\nMONITOR\nEND");
        token.unwrap();
        assert_eq!(parser.error_count(), 0);

        let circuit = parser.circuit();
        let ground = circuit.names.query(GROUND_NAME).unwrap();
        let ff = circuit.names.query("FF").unwrap();
        let device = circuit.devices.get_device(ff).unwrap();
        assert!(device.inputs.values().all(|source| *source == Some((ground, None))));
        assert!(circuit.network.check_network(&circuit.devices));
    }

    #[test]
    fn test_floating_input_located_at_declaration() {
        let (token, parser) = monitor("SW = SWITCH, 0;\nG1 = AND, 1;\nMONITOR\nEND");
        token.unwrap();
        let diag = &parser.diagnostics()[0];
        assert_eq!(
            diag.error,
            SemanticError::FloatingInput { device: "G1".into(), port: "I1".into() }
        );
        assert_eq!(diag.location, Some((1, 0)));
        assert_eq!(diag.line_text.as_deref(), Some("G1 = AND, 1;"));
    }
}
