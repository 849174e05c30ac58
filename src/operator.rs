//! Operator interaction: the device prompt and the "record next song?" prompt.

use std::io::{self, BufRead, Write};

/// A source of operator answers.
pub trait OperatorPrompt {
    /// Show `message` and read one line of input.
    ///
    /// `Ok(None)` means the input is closed.
    fn ask(&mut self, message: &str) -> io::Result<Option<String>>;

    /// Print information the operator needs before answering.
    fn show(&mut self, text: &str);
}

/// Is the answer an affirmative "y"?
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Ask whether to record the next song.  Closed input or read errors end the loop.
pub fn confirm_next(prompt: &mut dyn OperatorPrompt) -> bool {
    match prompt.ask("Record Next Song [y/n]: ") {
        Ok(Some(answer)) => is_affirmative(&answer),
        Ok(None) => false,
        Err(e) => {
            tracing::warn!("Could not read answer: {}", e);
            false
        }
    }
}

/// Interactive prompt on stdin/stdout.
pub struct StdinPrompt;

impl OperatorPrompt for StdinPrompt {
    fn ask(&mut self, message: &str) -> io::Result<Option<String>> {
        print!("{}", message);
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }

    fn show(&mut self, text: &str) {
        println!("{}", text);
    }
}
