//! Line-oriented user input for the interactive shell.

use std::io::{BufRead, Write};

use crate::error::BoxerError;

pub trait Prompter {
    /// Ask for one line of input. `Ok(None)` means input ended or the user
    /// backed out of the prompt.
    fn ask(&mut self, prompt: &str) -> Result<Option<String>, BoxerError>;
}

/// Reads plain lines; used for piped stdin and in tests.
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn ask(&mut self, prompt: &str) -> Result<Option<String>, BoxerError> {
        write!(self.output, "{prompt} ")
            .and_then(|_| self.output.flush())
            .map_err(|source| BoxerError::Io {
                context: "writing prompt".into(),
                source,
            })?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|source| BoxerError::Io {
                context: "reading input".into(),
                source,
            })?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Terminal prompts rendered by inquire.
#[derive(Debug, Default)]
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn ask(&mut self, prompt: &str) -> Result<Option<String>, BoxerError> {
        match inquire::Text::new(prompt).prompt() {
            Ok(answer) => Ok(Some(answer)),
            Err(inquire::InquireError::OperationCanceled) => Ok(None),
            Err(e) => Err(map_inquire_err(e)),
        }
    }
}

pub fn map_inquire_err(e: inquire::InquireError) -> BoxerError {
    match e {
        inquire::InquireError::OperationCanceled | inquire::InquireError::OperationInterrupted => {
            BoxerError::Cancelled
        }
        other => BoxerError::Prompt {
            message: other.to_string(),
        },
    }
}
