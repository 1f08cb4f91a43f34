//! Accumulates raw input lines until they form a complete unit.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Complete(String),
    StillIncomplete,
}

#[derive(Debug, Default)]
pub struct SnippetBuffer {
    pending: Vec<String>,
}

impl SnippetBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the pending lines with `line` and ask `is_complete` about the
    /// result. A complete unit empties the buffer.
    pub fn submit(&mut self, line: &str, is_complete: impl Fn(&str) -> bool) -> Submission {
        let joined = if self.pending.is_empty() {
            line.to_string()
        } else {
            let mut joined = self.pending.join("\n");
            joined.push('\n');
            joined.push_str(line);
            joined
        };
        if is_complete(&joined) {
            self.pending.clear();
            Submission::Complete(joined)
        } else {
            self.pending.push(line.to_string());
            Submission::StillIncomplete
        }
    }

    /// Put a unit the compiler found incomplete back as pending lines.
    pub fn restore(&mut self, source: &str) {
        self.pending = source.split('\n').map(str::to_string).collect();
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
