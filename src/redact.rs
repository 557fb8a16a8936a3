//! Redaction of credentials from logged commands and captured output.
//!
//! Tokens and passwords end up on `svn` and `ghr` command lines; everything
//! that reaches the log goes through [`Redactor::redact`] first.

use regex::Regex;

/// Known secret values and the names they are replaced with.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    /// (name, value) pairs, longest value first.
    secrets: Vec<(String, String)>,
    /// Alternation of every escaped value in the same order.
    pattern: Option<Regex>,
}

impl Redactor {
    /// Creates a redactor with no secrets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret. Empty values are ignored.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() || self.secrets.iter().any(|(_, v)| *v == value) {
            return;
        }

        self.secrets.push((name.into(), value));
        self.secrets.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        let alternation = self
            .secrets
            .iter()
            .map(|(_, value)| regex::escape(value))
            .collect::<Vec<_>>()
            .join("|");
        self.pattern = Regex::new(&alternation).ok();
    }

    /// Adds a secret, builder style.
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(name, value);
        self
    }

    /// Replaces every known secret value with `[REDACTED:<name>]`.
    ///
    /// The text is scanned once, so replacement labels are never matched
    /// again. At a given position the longest secret wins.
    pub fn redact(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };

        pattern
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let found = &caps[0];
                let name = self
                    .secrets
                    .iter()
                    .find(|(_, value)| value == found)
                    .map_or("SECRET", |(name, _)| name.as_str());
                format!("[REDACTED:{}]", name)
            })
            .into_owned()
    }

    /// Renders a command line for logging.
    pub fn command_line(&self, program: &str, args: &[&str]) -> String {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.redact(&line)
    }

    /// Returns true if no secret is known.
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}
