use std::io::Write as _;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// One option of a selection prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Channel between the engine and whoever is guiding the run.
///
/// `select` falls back to the choice at `default` whenever no explicit answer
/// is available.
#[async_trait]
pub trait Interaction: Send + Sync {
    /// Show text without expecting an answer.
    async fn present(&self, text: &str);

    async fn confirm(&self, message: &str, default: bool) -> bool;

    /// Returns the `value` of the chosen option.
    async fn select(&self, message: &str, choices: &[Choice], default: usize) -> String;

    /// Free-form answer, trimmed. Empty when nothing was entered.
    async fn input(&self, message: &str) -> String;
}

/// Stream that guided text and prompts are written to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputStream {
    #[default]
    Stdout,
    /// Keeps stdout free for machine-readable results.
    Stderr,
}

impl OutputStream {
    fn line(self, text: &str) {
        match self {
            OutputStream::Stdout => println!("{}", text),
            OutputStream::Stderr => eprintln!("{}", text),
        }
    }

    fn prompt(self, text: &str) {
        match self {
            OutputStream::Stdout => {
                print!("{}", text);
                let _ = std::io::stdout().flush();
            }
            OutputStream::Stderr => {
                eprint!("{}", text);
                let _ = std::io::stderr().flush();
            }
        }
    }
}

fn default_value(choices: &[Choice], default: usize) -> String {
    choices
        .get(default)
        .or(choices.first())
        .map(|c| c.value.clone())
        .unwrap_or_default()
}

/// Prompts on stdout and reads answers from stdin.
pub struct TerminalInteraction {
    lines: Mutex<Lines<BufReader<Stdin>>>,
    output: OutputStream,
}

impl TerminalInteraction {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            output: OutputStream::Stdout,
        }
    }

    pub fn with_output(mut self, output: OutputStream) -> Self {
        self.output = output;
        self
    }

    async fn ask(&self, prompt: &str) -> Option<String> {
        self.output.prompt(prompt);

        match self.lines.lock().await.next_line().await {
            Ok(Some(line)) => Some(line.trim().to_string()),
            _ => None,
        }
    }
}

impl Default for TerminalInteraction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Interaction for TerminalInteraction {
    async fn present(&self, text: &str) {
        self.output.line(text);
    }

    async fn confirm(&self, message: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let Some(answer) = self.ask(&format!("{} {} ", message, hint)).await else {
                return default;
            };
            match answer.to_lowercase().as_str() {
                "" => return default,
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => self.output.line("Please answer yes or no."),
            }
        }
    }

    async fn select(&self, message: &str, choices: &[Choice], default: usize) -> String {
        if choices.is_empty() {
            return String::new();
        }

        self.output.line(message);
        for (i, choice) in choices.iter().enumerate() {
            let marker = if i == default { " (default)" } else { "" };
            self.output
                .line(&format!("  {}) {}{}", i + 1, choice.label, marker));
        }

        loop {
            let Some(answer) = self.ask(&format!("Choose [1-{}]: ", choices.len())).await else {
                return default_value(choices, default);
            };
            if answer.is_empty() {
                return default_value(choices, default);
            }
            if let Ok(n) = answer.parse::<usize>()
                && (1..=choices.len()).contains(&n)
            {
                return choices[n - 1].value.clone();
            }
            if let Some(choice) = choices.iter().find(|c| c.value.eq_ignore_ascii_case(&answer)) {
                return choice.value.clone();
            }
            self.output.line(&format!("Invalid choice: {}", answer));
        }
    }

    async fn input(&self, message: &str) -> String {
        self.ask(&format!("{} ", message)).await.unwrap_or_default()
    }
}

/// Prints everything and answers every prompt with its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive {
    output: OutputStream,
}

impl NonInteractive {
    pub fn new(output: OutputStream) -> Self {
        Self { output }
    }

    pub fn output(&self) -> OutputStream {
        self.output
    }
}

#[async_trait]
impl Interaction for NonInteractive {
    async fn present(&self, text: &str) {
        self.output.line(text);
    }

    async fn confirm(&self, _message: &str, default: bool) -> bool {
        default
    }

    async fn select(&self, _message: &str, choices: &[Choice], default: usize) -> String {
        default_value(choices, default)
    }

    async fn input(&self, _message: &str) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_non_interactive_takes_defaults() {
        let channel = NonInteractive::new(OutputStream::Stderr);
        let choices = [Choice::new("Retry", "retry"), Choice::new("Abort", "abort")];

        assert_eq!(channel.output(), OutputStream::Stderr);
        assert!(!channel.confirm("Record outputs?", false).await);
        assert_eq!(channel.select("Proceed?", &choices, 1).await, "abort");
        assert_eq!(channel.select("Proceed?", &choices, 9).await, "retry");
        assert!(channel.input("Value:").await.is_empty());
    }
}
