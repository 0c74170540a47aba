//! Line loop: tokenize, resolve, dispatch, print.

use std::io::{self, BufRead, Write};

use hatch_shell::{CommandOutput, CommandRegistry, Dispatcher, ParsedInput, Tokenizer};
use hatch_types::config::HatchConfig;
use hatch_types::error::Result;

/// Whether the loop keeps reading after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// A registry plus the settings that govern how lines reach it.
pub struct Session {
    registry: CommandRegistry,
    tokenizer: Tokenizer,
    config: HatchConfig,
}

impl Session {
    pub fn new(config: HatchConfig, registry: CommandRegistry) -> Self {
        Self {
            registry,
            tokenizer: Tokenizer::with_dash_prefix(config.dash_prefix),
            config,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Read lines until EOF or an exit signal.
    ///
    /// With `interactive` set, the configured prompt is written before each
    /// line.
    pub fn run(&mut self, input: impl BufRead, out: &mut impl Write, interactive: bool) -> io::Result<()> {
        let mut lines = input.lines();
        loop {
            if interactive {
                write!(out, "{}", self.config.prompt)?;
                out.flush()?;
            }
            let Some(line) = lines.next() else {
                break;
            };
            if self.execute_line(&line?, out)? == Flow::Exit {
                break;
            }
        }
        Ok(())
    }

    /// Execute one line. Blank lines and `#` comments are skipped.
    pub fn execute_line(&mut self, line: &str, out: &mut impl Write) -> io::Result<Flow> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(Flow::Continue);
        }

        let parsed = self.tokenizer.parse(trimmed, self.config.dash_args);
        match self.dispatch(&parsed) {
            Some(result) => self.render(result, out),
            None => {
                writeln!(out, "unknown command: {}", parsed.command)?;
                Ok(Flow::Continue)
            },
        }
    }

    fn dispatch(&self, parsed: &ParsedInput) -> Option<Result<CommandOutput>> {
        let dispatcher = Dispatcher::new(&self.registry);
        if self.config.case_sensitive {
            return dispatcher.run_parsed(parsed);
        }
        let command = self.registry.lookup(&parsed.command, false)?;
        Some(dispatcher.run_command_parsed(&command, parsed))
    }

    fn render(&mut self, result: Result<CommandOutput>, out: &mut impl Write) -> io::Result<Flow> {
        match result {
            Ok(CommandOutput::Text(text)) => {
                for l in text.lines() {
                    writeln!(out, "{l}")?;
                }
            },
            Ok(CommandOutput::Lines(lines)) => {
                for l in &lines {
                    writeln!(out, "{l}")?;
                }
            },
            Ok(CommandOutput::None) => {},
            Ok(CommandOutput::Exit) => return Ok(Flow::Exit),
            Ok(CommandOutput::Help) => {
                writeln!(out, "commands:")?;
                for cmd in self.registry.commands() {
                    if cmd.is_alias() {
                        writeln!(out, "  {} (alias)", cmd.trigger())?;
                    } else {
                        writeln!(out, "  {}", cmd.trigger())?;
                    }
                }
            },
            Ok(CommandOutput::Alias { target, alias }) => {
                match self.registry.lookup(&target, self.config.case_sensitive) {
                    Some(command) => match self.registry.add_alias(&command, alias.as_str()) {
                        Ok(_) => writeln!(out, "{alias} -> {}", command.trigger())?,
                        Err(e) => writeln!(out, "error: {e}")?,
                    },
                    None => writeln!(out, "unknown command: {target}")?,
                }
            },
            Err(e) => writeln!(out, "error: {e}")?,
        }
        Ok(Flow::Continue)
    }
}
