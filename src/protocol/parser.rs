// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Line parser for the operator command protocol.
//!
//! Bytes are pushed one at a time, as they arrive from the console. A command is one line of
//! whitespace-separated words, case-insensitive, terminated by `\n` (a trailing `\r` is dropped):
//!
//! ```text
//! start | stop | quit | reset
//! force <f>
//! steps <up_ms> <down_ms>
//! hold <ms>
//! cycles <n>
//! samples <1|2>
//! turn <on|off>
//! lot <A|B> <lot> <serial>
//! ```

use core::str::FromStr;

use crate::error::ParseError;
use crate::protocol::messages::*;
use crate::sample::SampleId;

enum State {
    /// Collecting bytes of the current line.
    Line,
    /// Current line overflowed; skip to the next newline.
    Discard,
}

pub struct Parser {
    state: State,
    buf: Vec<u8>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: State::Line,
            buf: Vec::with_capacity(MAX_LINE),
        }
    }

    /// Process a single incoming byte. Returns `Some` once a complete, non-blank line is received.
    pub fn push(&mut self, byte: u8) -> Option<Result<Command, ParseError>> {
        match self.state {
            State::Line => match byte {
                b'\n' => {
                    let result = self.finish_line();
                    self.buf.clear();
                    result
                }
                b'\r' => None,
                _ => {
                    if self.buf.len() >= MAX_LINE {
                        self.buf.clear();
                        self.state = State::Discard;
                    } else {
                        self.buf.push(byte);
                    }
                    None
                }
            },
            State::Discard => {
                if byte == b'\n' {
                    self.state = State::Line;
                    return Some(Err(ParseError::LineTooLong));
                }
                None
            }
        }
    }

    fn finish_line(&self) -> Option<Result<Command, ParseError>> {
        let line = match core::str::from_utf8(&self.buf) {
            Ok(line) => line,
            Err(_) => return Some(Err(ParseError::InvalidUtf8)),
        };
        if line.trim().is_empty() {
            return None;
        }
        Some(line.parse())
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let keyword = words
            .next()
            .ok_or(ParseError::MissingArgument("command"))?
            .to_ascii_lowercase();

        let command = match keyword.as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "quit" => Command::Quit,
            "reset" => Command::Reset,
            "force" => Command::SetForce(number(words.next(), "force")?),
            "steps" => Command::SetSteps {
                up_ms: number(words.next(), "up step ms")?,
                down_ms: number(words.next(), "down step ms")?,
            },
            "hold" => Command::SetHold(number(words.next(), "hold ms")?),
            "cycles" => Command::SetCycles(number(words.next(), "cycle count")?),
            "samples" => Command::SetSamples(number(words.next(), "sample count")?),
            "turn" => {
                let word = words.next().ok_or(ParseError::MissingArgument("on|off"))?;
                match word.to_ascii_lowercase().as_str() {
                    "on" => Command::SetTurnPlates(true),
                    "off" => Command::SetTurnPlates(false),
                    _ => return Err(ParseError::InvalidArgument(word.into())),
                }
            }
            "lot" => {
                let word = words.next().ok_or(ParseError::MissingArgument("sample"))?;
                let sample = SampleId::from_str(word)
                    .map_err(|_| ParseError::InvalidArgument(word.into()))?;
                let lot = words.next().ok_or(ParseError::MissingArgument("lot"))?;
                let serial = words.next().ok_or(ParseError::MissingArgument("serial"))?;
                Command::SetLot {
                    sample,
                    lot: lot.into(),
                    serial: serial.into(),
                }
            }
            _ => return Err(ParseError::UnknownCommand(keyword)),
        };

        let rest: Vec<&str> = words.collect();
        if !rest.is_empty() {
            return Err(ParseError::TrailingInput(rest.join(" ")));
        }
        Ok(command)
    }
}

fn number<T: FromStr>(word: Option<&str>, what: &'static str) -> Result<T, ParseError> {
    let word = word.ok_or(ParseError::MissingArgument(what))?;
    word.parse()
        .map_err(|_| ParseError::InvalidNumber(word.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut Parser, text: &str) -> Vec<Result<Command, ParseError>> {
        text.bytes().filter_map(|b| parser.push(b)).collect()
    }

    #[test]
    fn parses_one_command_per_line() {
        let mut parser = Parser::new();
        let out = feed(&mut parser, "start\r\nFORCE 42.5\nsteps 400 600\n\nquit\n");
        assert_eq!(
            out,
            vec![
                Ok(Command::Start),
                Ok(Command::SetForce(42.5)),
                Ok(Command::SetSteps {
                    up_ms: 400,
                    down_ms: 600
                }),
                Ok(Command::Quit),
            ]
        );
    }

    #[test]
    fn no_output_until_newline() {
        let mut parser = Parser::new();
        assert!(feed(&mut parser, "cycles 5").is_empty());
        assert_eq!(feed(&mut parser, "\n"), vec![Ok(Command::SetCycles(5))]);
    }

    #[test]
    fn negative_durations_reach_validation() {
        assert_eq!("hold -10".parse::<Command>(), Ok(Command::SetHold(-10)));
    }

    #[test]
    fn lot_and_turn_arguments() {
        assert_eq!(
            "lot b L-77 SN0042".parse::<Command>(),
            Ok(Command::SetLot {
                sample: SampleId::B,
                lot: "L-77".into(),
                serial: "SN0042".into()
            })
        );
        assert_eq!("Turn OFF".parse::<Command>(), Ok(Command::SetTurnPlates(false)));
        assert_eq!(
            "turn maybe".parse::<Command>(),
            Err(ParseError::InvalidArgument("maybe".into()))
        );
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert_eq!(
            "jump".parse::<Command>(),
            Err(ParseError::UnknownCommand("jump".into()))
        );
        assert_eq!(
            "force".parse::<Command>(),
            Err(ParseError::MissingArgument("force"))
        );
        assert_eq!(
            "force lots".parse::<Command>(),
            Err(ParseError::InvalidNumber("lots".into()))
        );
        assert_eq!(
            "start now".parse::<Command>(),
            Err(ParseError::TrailingInput("now".into()))
        );
    }

    #[test]
    fn overlong_line_is_discarded_and_parser_recovers() {
        let mut parser = Parser::new();
        let long = "x".repeat(MAX_LINE + 10);
        let out = feed(&mut parser, &format!("{}\nstop\n", long));
        assert_eq!(out, vec![Err(ParseError::LineTooLong), Ok(Command::Stop)]);
    }
}
