//! Trigger resolution and action invocation.
//!
//! An unknown trigger is not an error: every string entry point returns
//! `None` for it and leaves the reporting to the caller. An action that
//! runs and fails comes back as `Some(Err(..))`.

use hatch_types::error::Result;

use crate::registry::{Command, CommandOutput, CommandRegistry};
use crate::tokenizer::ParsedInput;

/// Dispatches commands against a borrowed registry.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'r> {
    registry: &'r CommandRegistry,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r CommandRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r CommandRegistry {
        self.registry
    }

    /// Resolve `trigger` by exact match and run it.
    ///
    /// Case-insensitive resolution is never attempted here; callers that
    /// want it use [`CommandRegistry::lookup`] and [`run_command`](Self::run_command).
    pub fn run_by_trigger(&self, trigger: &str, args: &[String]) -> Option<Result<CommandOutput>> {
        let Some(command) = self.registry.lookup(trigger, true) else {
            log::debug!("No command for trigger {trigger:?}");
            return None;
        };
        Some(self.run_command(&command, args))
    }

    /// Run an already-resolved command.
    pub fn run_command(&self, command: &Command, args: &[String]) -> Result<CommandOutput> {
        log::debug!("Running {} with {} args", command.trigger(), args.len());
        command.invoke(args, None)
    }

    /// Resolve `parsed.command` by exact match and run it with the parsed
    /// parameters, forwarding dash parameters when present.
    pub fn run_parsed(&self, parsed: &ParsedInput) -> Option<Result<CommandOutput>> {
        let Some(command) = self.registry.lookup(&parsed.command, true) else {
            log::debug!("No command for trigger {:?}", parsed.command);
            return None;
        };
        Some(self.run_command_parsed(&command, parsed))
    }

    /// Run an already-resolved command with a parsed line's arguments.
    pub fn run_command_parsed(&self, command: &Command, parsed: &ParsedInput) -> Result<CommandOutput> {
        log::debug!("Running {} as {:?}", command.trigger(), parsed.raw);
        command.invoke(&parsed.parameters, parsed.dash_parameters.as_deref())
    }
}
