//! The session-owned, versioned environment handle.
//!
//! The executor binds one [`Frame`] per evaluated snippet. The shell owns the
//! environment and lends it to the executor for each evaluation; history
//! rollback truncates it so both views stay aligned.

use std::sync::Arc;

use crate::frame::{Frame, Member};
use crate::ids::SnippetId;

#[derive(Debug, Default, Clone)]
pub struct Environment {
    frames: Vec<Arc<Frame>>,
    version: u64,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped on every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn bind(&mut self, frame: Arc<Frame>) {
        self.frames.push(frame);
        self.version += 1;
    }

    pub fn frame(&self, snippet: SnippetId) -> Option<&Arc<Frame>> {
        self.frames.iter().rev().find(|f| f.snippet == snippet)
    }

    pub fn lookup(&self, snippet: SnippetId, name: &str) -> Option<&Member> {
        self.frame(snippet)?.member(name)
    }

    pub fn frames(&self) -> impl Iterator<Item = &Arc<Frame>> {
        self.frames.iter()
    }

    /// Drop every frame bound after `snippet`. Returns how many were dropped.
    pub fn truncate_after(&mut self, snippet: SnippetId) -> usize {
        let before = self.frames.len();
        self.frames.retain(|f| f.snippet <= snippet);
        let dropped = before - self.frames.len();
        if dropped > 0 {
            self.version += 1;
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MemberKind;
    use crate::types::TypeDesc;
    use crate::value::Value;

    fn frame_with(id: u64, name: &str, value: i64) -> Arc<Frame> {
        let mut frame = Frame::new(SnippetId(id), format!("repl.Line_{id}"));
        frame.members.push(Member {
            name: name.to_string(),
            declared_in: SnippetId(id),
            kind: MemberKind::Property {
                value: Value::Int(value),
                ty: TypeDesc::Int,
            },
        });
        Arc::new(frame)
    }

    #[test]
    fn lookup_finds_member_of_specific_snippet() {
        let mut env = Environment::new();
        env.bind(frame_with(1, "x", 1));
        env.bind(frame_with(2, "x", 2));
        match env.lookup(SnippetId(1), "x").map(|m| &m.kind) {
            Some(MemberKind::Property { value, .. }) => assert_eq!(*value, Value::Int(1)),
            other => panic!("unexpected lookup result: {:?}", other),
        }
        assert!(env.lookup(SnippetId(3), "x").is_none());
    }

    #[test]
    fn truncate_keeps_target_and_bumps_version() {
        let mut env = Environment::new();
        env.bind(frame_with(1, "a", 1));
        env.bind(frame_with(4, "b", 2));
        env.bind(frame_with(7, "c", 3));
        let v = env.version();
        assert_eq!(env.truncate_after(SnippetId(4)), 1);
        assert_eq!(env.len(), 2);
        assert!(env.version() > v);

        let v = env.version();
        assert_eq!(env.truncate_after(SnippetId(4)), 0);
        assert_eq!(env.version(), v);
    }
}
