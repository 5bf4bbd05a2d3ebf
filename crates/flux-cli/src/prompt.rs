// ABOUTME: Line prompts on the terminal.
// ABOUTME: Generic over reader and writer so prompts can be driven from tests.

use std::io::{self, BufRead, Write};

pub const PHONE_PROMPT: &str = "Enter your phone number (e.g. +15551234567): ";

/// Print `question`, read one line, and return it trimmed. EOF is an error.
pub fn ask_from<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<String> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no input"));
    }
    Ok(line.trim().to_string())
}

pub fn ask(question: &str) -> io::Result<String> {
    ask_from(&mut io::stdin().lock(), &mut io::stdout(), question)
}

pub fn ask_phone() -> io::Result<String> {
    ask(PHONE_PROMPT)
}
