//! Interactive questions for the operator.
//!
//! Deploy steps ask through the [`Prompt`] trait so they can be driven by a
//! terminal, by any input stream, or by a script in tests.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};

/// Asks the operator questions.
pub trait Prompt {
    /// Ask a yes/no question.
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool>;

    /// Ask for a line of text. An empty answer yields `default` (or `""`).
    fn input(&mut self, question: &str, default: Option<&str>) -> Result<String>;
}

/// Prompts on an arbitrary input/output stream pair.
///
/// Reads block with no timeout. End of input counts as an empty answer.
pub struct StreamPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> StreamPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        StreamPrompt { input, output }
    }

    fn ask(&mut self, text: &str) -> Result<String> {
        write!(self.output, "{}", text).context("failed to write prompt")?;
        self.output.flush().context("failed to write prompt")?;

        let mut line = String::new();
        self.input
            .read_line(&mut line)
            .context("failed to read answer")?;
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompt for StreamPrompt<R, W> {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let answer = self.ask(&format!("{} {} ", question, hint))?;
        Ok(parse_yes_no(&answer).unwrap_or(default))
    }

    fn input(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        let text = match default {
            Some(d) if !d.is_empty() => format!("{}: [{}] ", question, d),
            _ => format!("{}: ", question),
        };
        let answer = self.ask(&text)?;
        if answer.is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(answer)
    }
}

/// `y`/`yes` and `n`/`no`, case-insensitive. Empty means "use the default";
/// anything else is a no.
fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.to_lowercase().as_str() {
        "" => None,
        "y" | "yes" => Some(true),
        _ => Some(false),
    }
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TermPrompt;

impl Prompt for TermPrompt {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(question)
            .default(default)
            .interact()
            .context("failed to read answer")
    }

    fn input(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        let mut input = dialoguer::Input::<String>::new()
            .with_prompt(question)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input.interact_text().context("failed to read answer")
    }
}

/// Prompt for the process's own stdio.
///
/// Uses the terminal when stdin is one. Otherwise answers are read line by
/// line from stdin, with questions written to stderr.
pub fn stdio_prompt() -> Box<dyn Prompt> {
    if io::stdin().is_terminal() {
        Box::new(TermPrompt)
    } else {
        Box::new(StreamPrompt::new(io::stdin().lock(), io::stderr()))
    }
}
