//! Structured query construction.
//!
//! A [`Query`] is the resource path plus its attribute and filter words.
//! Building one is pure data work; retries, timeouts and I/O all belong to
//! the session layer. The builder methods consume `self`, so a finished
//! query value is immutable.

/// A single command to send over a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    command: String,
    attributes: Vec<(String, String)>,
    filters: Vec<(String, String)>,
}

impl Query {
    /// A `print` over a resource path, e.g. `/ppp/secret/print`.
    pub fn print(path: &str) -> Self {
        Self::command(&format!("{path}/print"))
    }

    /// A `set` targeting one row by its `.id`.
    pub fn set(path: &str, id: &str) -> Self {
        Self::command(&format!("{path}/set")).attribute(".id", id)
    }

    /// A `remove` targeting one row by its `.id`.
    pub fn remove(path: &str, id: &str) -> Self {
        Self::command(&format!("{path}/remove")).attribute(".id", id)
    }

    /// A bare command word with no implied verb.
    pub fn command(command: &str) -> Self {
        Self {
            command: command.to_string(),
            attributes: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Adds an assignment word (`=key=value`).
    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    /// Adds a filter word (`?key=value`), narrowing a `print`.
    pub fn filter(mut self, key: &str, value: &str) -> Self {
        self.filters.push((key.to_string(), value.to_string()));
        self
    }

    pub fn command_word(&self) -> &str {
        &self.command
    }

    /// Renders the query as the word sequence that goes on the wire.
    pub fn to_words(&self) -> Vec<String> {
        let mut words = Vec::with_capacity(1 + self.attributes.len() + self.filters.len());
        words.push(self.command.clone());
        for (k, v) in &self.attributes {
            words.push(format!("={k}={v}"));
        }
        for (k, v) in &self.filters {
            words.push(format!("?{k}={v}"));
        }
        words
    }
}
