//! Interactive choices, behind a trait so the flows can run without a terminal.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

pub trait Prompt: Send + Sync {
    /// Offers numbered `options`; `None` means the operator picked none.
    fn choose(&self, question: &str, options: &[String]) -> Option<usize>;

    /// Yes/no question. `default` is used for an empty answer.
    fn confirm(&self, question: &str, default: bool) -> bool;
}

/// Reads answers from stdin.
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn read_answer() -> Option<String> {
        let _ = io::stdout().flush();
        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            // EOF: nobody is there to answer
            Ok(0) | Err(_) => None,
            Ok(_) => Some(input.trim().to_string()),
        }
    }
}

impl Prompt for TerminalPrompt {
    fn choose(&self, question: &str, options: &[String]) -> Option<usize> {
        for (i, option) in options.iter().enumerate() {
            println!("{}) {}", i + 1, option);
        }
        println!();

        loop {
            println!("{question}");
            println!(
                " Please respond with a number in the list (1-{}) or n for none.",
                options.len()
            );

            let answer = Self::read_answer()?;
            if answer.eq_ignore_ascii_case("n") {
                return None;
            }

            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Some(n - 1),
                _ => println!("Invalid selection."),
            }
        }
    }

    fn confirm(&self, question: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };

        loop {
            println!("{question} {hint}");

            let Some(answer) = Self::read_answer() else {
                return false;
            };

            match answer.to_ascii_lowercase().as_str() {
                "" => return default,
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => println!("Please answer y or n."),
            }
        }
    }
}

/// A canned answer for [`ScriptedPrompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Choose(Option<usize>),
    Confirm(bool),
}

/// Replays canned answers in order. Runs out as "none" / "no".
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<Answer>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far, in order.
    #[must_use]
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }

    fn next(&self, question: &str) -> Option<Answer> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.to_string());
        }
        self.answers.lock().ok().and_then(|mut a| a.pop_front())
    }
}

impl Prompt for ScriptedPrompt {
    fn choose(&self, question: &str, options: &[String]) -> Option<usize> {
        match self.next(question) {
            Some(Answer::Choose(choice)) => choice.filter(|i| *i < options.len()),
            _ => None,
        }
    }

    fn confirm(&self, question: &str, _default: bool) -> bool {
        matches!(self.next(question), Some(Answer::Confirm(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_prompt_replays_in_order() {
        let prompt = ScriptedPrompt::new([Answer::Choose(Some(1)), Answer::Confirm(true)]);
        let options = vec!["a".to_string(), "b".to_string()];
        assert_eq!(prompt.choose("pick", &options), Some(1));
        assert!(prompt.confirm("sure?", false));
        assert!(!prompt.confirm("again?", true));
        assert_eq!(prompt.asked(), vec!["pick", "sure?", "again?"]);
    }

    #[test]
    fn scripted_prompt_ignores_out_of_range_choice() {
        let prompt = ScriptedPrompt::new([Answer::Choose(Some(5))]);
        assert_eq!(prompt.choose("pick", &["only".to_string()]), None);
    }
}
