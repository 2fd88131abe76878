//! Yes/no confirmation on the terminal.

use std::io::{self, BufRead, Write};
use std::str::FromStr;
use thiserror::Error;

/// Default answer used when the user just presses enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

impl Answer {
    fn parse_reply(reply: &str) -> Option<Answer> {
        match reply {
            "y" | "yes" => Some(Answer::Yes),
            "n" | "no" => Some(Answer::No),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid default answer: {0}")]
pub struct InvalidAnswer(String);

impl FromStr for Answer {
    type Err = InvalidAnswer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Answer::parse_reply(&s.to_lowercase()).ok_or_else(|| InvalidAnswer(s.to_string()))
    }
}

fn hint(default: Option<Answer>) -> &'static str {
    match default {
        None => "[y/n]",
        Some(Answer::Yes) => "[Y/n]",
        Some(Answer::No) => "[y/N]",
    }
}

/// Asks `question` on stdout and reads the reply from stdin.
pub fn confirm(question: &str, default: Option<Answer>) -> io::Result<bool> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    confirm_with(&mut stdin.lock(), &mut stdout.lock(), question, default)
}

/// Keeps asking until the reply is y/yes/n/no (any case), or empty with a
/// default. End of input also selects the default when there is one.
pub fn confirm_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    default: Option<Answer>,
) -> io::Result<bool> {
    loop {
        write!(output, "{} {} ", question, hint(default))?;
        output.flush()?;

        let mut line = String::new();
        let read = input.read_line(&mut line)?;
        let reply = line.trim().to_lowercase();

        if reply.is_empty() {
            if let Some(answer) = default {
                return Ok(answer == Answer::Yes);
            }
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "no answer given",
                ));
            }
            continue;
        }

        if let Some(answer) = Answer::parse_reply(&reply) {
            return Ok(answer == Answer::Yes);
        }
    }
}
