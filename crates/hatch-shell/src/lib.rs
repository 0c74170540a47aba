//! Command tokenizer and trigger-based dispatch.
//!
//! A raw line goes through the [`Tokenizer`], optionally has its dash
//! arguments split out, and is handed to a [`Dispatcher`] which resolves
//! the command word against a [`CommandRegistry`] and invokes the bound
//! [`Action`]. Registries are plain values; nothing here is global.

mod dispatcher;
mod registry;
mod tokenizer;

/// Resolves triggers against a registry and invokes actions.
pub use dispatcher::Dispatcher;
/// Behaviour bound to a command (plain or dash-aware closure).
pub use registry::Action;
/// A registered command record.
pub use registry::Command;
/// Output produced by an action (text, lines, signals).
pub use registry::CommandOutput;
/// Trigger-keyed command table with alias support.
pub use registry::CommandRegistry;
/// Tokenize a line with the default dash prefix.
pub use tokenizer::parse;
/// Default dash-argument prefix (`-`).
pub use tokenizer::DEFAULT_DASH_PREFIX;
/// Result of tokenizing a line.
pub use tokenizer::ParsedInput;
/// Quote- and escape-aware line tokenizer.
pub use tokenizer::Tokenizer;
