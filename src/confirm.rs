//! Human-confirmation collaborator
//!
//! Release mutations require an affirmative answer unless forced. The
//! trait keeps the prompt out of the engine and lets tests script the
//! answer.

use std::io::{BufRead, Write};

/// Asks the operator a yes/no question
pub trait Confirmer {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Reads the answer from stdin
#[derive(Debug, Default)]
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N]: ");
        let _ = std::io::stdout().flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// Fixed answer, used for `--force` and in tests
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmer(pub bool);

impl Confirmer for FixedConfirmer {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}
