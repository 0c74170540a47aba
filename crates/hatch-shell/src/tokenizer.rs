//! Input line tokenizer and dash-argument splitter.
//!
//! A line is split into a command word and its parameters. Double quotes
//! group words, a backslash emits the next character literally, and
//! nothing else is special: no globbing, pipes, or variable expansion.
//! Malformed input (unmatched quote, dangling backslash) never fails; the
//! tokenizer flushes whatever it has accumulated.

/// Prefix marking a dash argument unless configured otherwise.
pub const DEFAULT_DASH_PREFIX: char = '-';

/// Result of tokenizing one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInput {
    /// First space-delimited word, outer double quotes stripped.
    pub command: String,
    /// Remaining arguments in input order (dash arguments removed when
    /// extraction was requested).
    pub parameters: Vec<String>,
    /// Arguments beginning with the dash prefix, in input order.
    ///
    /// `None` when extraction was not requested, which is distinct from
    /// `Some(vec![])` (requested, nothing found).
    pub dash_parameters: Option<Vec<String>>,
    /// Canonical re-rendering: the command followed by every parameter in
    /// double quotes. Rendered before dash extraction.
    pub raw: String,
}

/// Tokenizer configured with a dash prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tokenizer {
    dash_prefix: char,
}

impl Tokenizer {
    /// Tokenizer using [`DEFAULT_DASH_PREFIX`].
    pub fn new() -> Self {
        Self::with_dash_prefix(DEFAULT_DASH_PREFIX)
    }

    pub fn with_dash_prefix(dash_prefix: char) -> Self {
        Self { dash_prefix }
    }

    pub fn dash_prefix(&self) -> char {
        self.dash_prefix
    }

    /// Tokenize `input`, optionally separating dash arguments.
    pub fn parse(&self, input: &str, with_dash_args: bool) -> ParsedInput {
        let (head, rest) = input.split_once(' ').unwrap_or((input, ""));
        let command = head.trim().trim_matches('"').to_string();

        let mut parameters = tokenize(rest);
        let raw = render_raw(&command, &parameters);
        let dash_parameters = with_dash_args.then(|| self.split_dash_args(&mut parameters));

        ParsedInput {
            command,
            parameters,
            dash_parameters,
            raw,
        }
    }

    /// Move every parameter starting with the dash prefix out of
    /// `parameters`, returning them in their original relative order.
    pub fn split_dash_args(&self, parameters: &mut Vec<String>) -> Vec<String> {
        let (dash, positional): (Vec<String>, Vec<String>) = std::mem::take(parameters)
            .into_iter()
            .partition(|p| p.starts_with(self.dash_prefix));
        *parameters = positional;
        dash
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokenize `input` with the default dash prefix.
pub fn parse(input: &str, with_dash_args: bool) -> ParsedInput {
    Tokenizer::new().parse(input, with_dash_args)
}

/// Split the text after the command word into parameters.
fn tokenize(input: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(next) => current.push(next),
                // Dangling escape at end of input.
                None => break,
            },
            '"' => {
                in_quotes = !in_quotes;
                flush(&mut params, &mut current);
            },
            ' ' if !in_quotes => flush(&mut params, &mut current),
            _ => current.push(ch),
        }
    }
    flush(&mut params, &mut current);

    params
}

fn flush(params: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        params.push(std::mem::take(current));
    }
}

fn render_raw(command: &str, parameters: &[String]) -> String {
    let mut raw = command.to_string();
    for param in parameters {
        raw.push_str(" \"");
        raw.push_str(param);
        raw.push('"');
    }
    raw
}
