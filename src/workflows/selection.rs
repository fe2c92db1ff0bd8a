use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::domain::models::Candidate;
use crate::error::{Result, SubtitlerError};

/// Chooses one of the candidates a remote search returned.
pub trait SelectionStrategy {
    /// Returns an index into `candidates`, which is never empty.
    fn select(&mut self, language: &str, candidates: &[Candidate]) -> Result<usize>;
}

/// Always takes the first candidate, in the order the service returned them.
#[derive(Debug, Default)]
pub struct FirstCandidate;

impl SelectionStrategy for FirstCandidate {
    fn select(&mut self, _language: &str, _candidates: &[Candidate]) -> Result<usize> {
        Ok(0)
    }
}

/// Source of user input lines.
pub trait LineReader {
    /// `Ok(None)` means the input ended or was interrupted.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

impl LineReader for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(e)) => Err(SubtitlerError::io("<stdin>", e)),
            Err(_) => Ok(None),
        }
    }
}

/// Lists the candidates and asks for an index until a valid one is entered.
pub struct PromptSelection<R> {
    reader: R,
}

impl<R: LineReader> PromptSelection<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: LineReader> SelectionStrategy for PromptSelection<R> {
    fn select(&mut self, language: &str, candidates: &[Candidate]) -> Result<usize> {
        if candidates.len() <= 1 {
            return Ok(0);
        }

        println!("Language: {language}");
        for (i, candidate) in candidates.iter().enumerate() {
            println!("[{i}] {}", candidate.display_name);
        }

        loop {
            let Some(line) = self.reader.read_line("Select a subtitle: ")? else {
                return Err(SubtitlerError::SelectionAborted);
            };
            match parse_selection(&line, candidates.len()) {
                Ok(index) => return Ok(index),
                Err(e) => println!("{e}, enter a number between 0 and {}.", candidates.len() - 1),
            }
        }
    }
}

pub fn parse_selection(input: &str, count: usize) -> Result<usize> {
    let trimmed = input.trim();
    match trimmed.parse::<usize>() {
        Ok(index) if index < count => Ok(index),
        _ => Err(SubtitlerError::InvalidSelection {
            input: trimmed.to_string(),
        }),
    }
}

/// Builds the strategy the configuration asks for. Falls back to the first
/// candidate when no terminal editor can be created.
pub fn from_config(interactive: bool) -> Box<dyn SelectionStrategy> {
    if !interactive {
        return Box::new(FirstCandidate);
    }
    match DefaultEditor::new() {
        Ok(editor) => Box::new(PromptSelection::new(editor)),
        Err(e) => {
            tracing::warn!(error = %e, "interactive selection unavailable, using first candidate");
            Box::new(FirstCandidate)
        }
    }
}
