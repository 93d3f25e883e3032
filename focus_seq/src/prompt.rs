//! Interactive prompting for sweep tunables.
//!
//! [`LinePrompter`] asks on any writer and reads replies from any buffered
//! reader; [`LinePrompter::stdio`] wires it to the terminal.
//! [`parse_reply`] turns a raw reply into a typed value, falling back to
//! the offered default on an empty line.

use focus_common::focus::driver::{FocusError, Prompter};
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

/// Prompter over a line-oriented reader and writer.
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    /// Create a prompter reading from `input` and writing prompts to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl LinePrompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompter on stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn prompt(&mut self, label: &str, default: &str) -> Result<String, FocusError> {
        write!(self.output, "{label} [{default}]: ")
            .and_then(|_| self.output.flush())
            .map_err(|e| FocusError::Prompt(e.to_string()))?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| FocusError::Prompt(e.to_string()))?;
        if read == 0 {
            return Err(FocusError::Prompt(format!("no reply for '{label}'")));
        }
        Ok(line.trim().to_string())
    }
}

/// Prompter that accepts every default without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptDefaults;

impl Prompter for AcceptDefaults {
    fn prompt(&mut self, _label: &str, _default: &str) -> Result<String, FocusError> {
        Ok(String::new())
    }
}

/// Prompt for `label` and parse the reply, keeping `current` on an empty reply.
pub fn prompt_value<T>(prompter: &mut dyn Prompter, label: &str, current: T) -> Result<T, FocusError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    let reply = prompter.prompt(label, &current.to_string())?;
    parse_reply(label, &reply, current)
}

/// Parse a prompt reply. Empty replies yield `default`.
pub fn parse_reply<T>(label: &str, reply: &str, default: T) -> Result<T, FocusError>
where
    T: FromStr,
    T::Err: Display,
{
    let reply = reply.trim();
    if reply.is_empty() {
        return Ok(default);
    }
    reply
        .parse()
        .map_err(|e| FocusError::InvalidParameter(format!("{label}: '{reply}' ({e})")))
}
