//! History ledgers and the generation pair.
//!
//! The compiler side records every snippet that compiled; the executor side
//! records every snippet it ran, with the outcome. Each ledger's size is its
//! generation. After a compile error the compiler ledger is cut back to the
//! executor ledger so the two agree again.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tern_core::{CompiledRecord, Generation, Namespace, Snippet, SnippetId};
use tracing::warn;

use crate::error::InternalError;

pub trait HistoryEntry {
    fn snippet(&self) -> &Snippet;

    fn id(&self) -> SnippetId {
        self.snippet().id
    }
}

impl HistoryEntry for CompiledRecord {
    fn snippet(&self) -> &Snippet {
        &self.snippet
    }
}

/// Append-only log ordered by insertion.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: Vec<T>,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: HistoryEntry> History<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: T) {
        self.entries.push(entry);
    }

    /// Drop every entry. Returns how many were dropped.
    pub fn reset(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    /// Drop everything after `id`, keeping `id` itself.
    pub fn reset_to(&mut self, id: SnippetId) -> usize {
        let keep = self
            .entries
            .iter()
            .rposition(|e| e.id() == id)
            .map_or(0, |idx| idx + 1);
        let dropped = self.entries.len() - keep;
        self.entries.truncate(keep);
        dropped
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn generation(&self) -> Generation {
        Generation::from_len(self.entries.len())
    }

    pub fn peek(&self) -> Option<&T> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries.iter()
    }

    /// Most recent entry matching `pred`.
    pub fn find_last(&self, pred: impl Fn(&T) -> bool) -> Option<&T> {
        self.entries.iter().rev().find(|e| pred(*e))
    }

    pub fn get(&self, id: SnippetId) -> Option<&T> {
        self.find_last(|e| e.id() == id)
    }

    pub fn contains(&self, id: SnippetId) -> bool {
        self.get(id).is_some()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }
}

// ── Executor ledger ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EvalStatus {
    Unit,
    Value,
    Failed,
    Mismatch,
}

impl EvalStatus {
    pub fn is_ok(self) -> bool {
        matches!(self, EvalStatus::Unit | EvalStatus::Value)
    }
}

/// A snippet as the executor saw it. With a non-empty `names` list this is
/// a named snippet: it binds those names in `namespace`.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluatedRecord {
    pub snippet: Snippet,
    pub namespace: Namespace,
    pub names: Vec<String>,
    pub status: EvalStatus,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluatedRecord {
    pub fn new(
        snippet: Snippet,
        namespace: Namespace,
        names: Vec<String>,
        status: EvalStatus,
    ) -> Self {
        Self {
            snippet,
            namespace,
            names,
            status,
            evaluated_at: Utc::now(),
        }
    }

    /// Whether this entry's evaluation bound `name` in `namespace`.
    pub fn binds(&self, namespace: &Namespace, name: &str) -> bool {
        self.status.is_ok() && &self.namespace == namespace && self.names.iter().any(|n| n == name)
    }
}

impl HistoryEntry for EvaluatedRecord {
    fn snippet(&self) -> &Snippet {
        &self.snippet
    }
}

// ── Generation pair ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationPair {
    pub compiler: Generation,
    pub executor: Generation,
}

impl fmt::Display for GenerationPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compiler {} / executor {}", self.compiler, self.executor)
    }
}

/// What a reconciliation did to the compiler ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    InSync,
    Cleared { dropped: usize },
    RolledBack { to: SnippetId, dropped: usize },
}

#[derive(Debug, Default)]
pub struct Ledgers {
    pub compiler: History<CompiledRecord>,
    pub executor: History<EvaluatedRecord>,
}

impl Ledgers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generations(&self) -> GenerationPair {
        GenerationPair {
            compiler: self.compiler.generation(),
            executor: self.executor.generation(),
        }
    }

    /// Cut the compiler ledger back to the executor ledger. An empty
    /// executor ledger resets the compiler ledger outright; otherwise it is
    /// rolled back to the executor's last entry. Calling this again without
    /// a compile in between does nothing.
    pub fn reconcile(&mut self) -> Result<Reconciled, InternalError> {
        if self.compiler.size() == self.executor.size() {
            return Ok(Reconciled::InSync);
        }
        let outcome = match self.executor.peek() {
            None => Reconciled::Cleared {
                dropped: self.compiler.reset(),
            },
            Some(last) => {
                let to = last.id();
                Reconciled::RolledBack {
                    to,
                    dropped: self.compiler.reset_to(to),
                }
            }
        };
        let generations = self.generations();
        warn!(?outcome, %generations, "reconciled compiler history");
        if generations.compiler != generations.executor {
            return Err(InternalError::ReconcileMismatch {
                compiler: generations.compiler,
                executor: generations.executor,
            });
        }
        Ok(outcome)
    }

    pub fn check_invariant(&self) -> Result<(), InternalError> {
        let GenerationPair { compiler, executor } = self.generations();
        if compiler < executor {
            return Err(InternalError::GenerationInvariant { compiler, executor });
        }
        Ok(())
    }

    /// Truncate both ledgers after `id`. Returns the number of executor
    /// entries dropped.
    pub fn rollback(&mut self, id: SnippetId) -> usize {
        self.compiler.reset_to(id);
        self.executor.reset_to(id)
    }

    pub fn reset(&mut self) {
        self.compiler.reset();
        self.executor.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_core::Manifest;

    fn snippet(id: u64) -> Snippet {
        Snippet::new(SnippetId(id), Generation(0), format!("line {}", id))
    }

    fn compiled(id: u64) -> CompiledRecord {
        CompiledRecord {
            snippet: snippet(id),
            manifest: Manifest::new(Namespace::default(), format!("repl.Line_{}", id)),
        }
    }

    fn evaluated(id: u64, names: &[&str], status: EvalStatus) -> EvaluatedRecord {
        EvaluatedRecord::new(
            snippet(id),
            Namespace::default(),
            names.iter().map(|n| n.to_string()).collect(),
            status,
        )
    }

    #[test]
    fn reset_to_keeps_the_given_entry() {
        let mut history = History::new();
        for id in 1..=4 {
            history.append(compiled(id));
        }
        assert_eq!(history.reset_to(SnippetId(2)), 2);
        assert_eq!(history.peek().map(|e| e.id()), Some(SnippetId(2)));
        assert_eq!(history.generation(), Generation(2));
    }

    #[test]
    fn reset_to_unknown_id_clears_everything() {
        let mut history = History::new();
        history.append(compiled(1));
        assert_eq!(history.reset_to(SnippetId(9)), 1);
        assert!(history.is_empty());
    }

    #[test]
    fn reconcile_with_empty_executor_clears_compiler() {
        let mut ledgers = Ledgers::new();
        ledgers.compiler.append(compiled(1));
        assert_eq!(ledgers.reconcile(), Ok(Reconciled::Cleared { dropped: 1 }));
        assert_eq!(ledgers.compiler.size(), 0);
    }

    #[test]
    fn reconcile_rolls_back_to_last_evaluated_and_is_idempotent() {
        let mut ledgers = Ledgers::new();
        ledgers.compiler.append(compiled(1));
        ledgers.executor.append(evaluated(1, &[], EvalStatus::Unit));
        ledgers.compiler.append(compiled(2));
        assert_eq!(
            ledgers.reconcile(),
            Ok(Reconciled::RolledBack {
                to: SnippetId(1),
                dropped: 1
            })
        );
        assert_eq!(ledgers.reconcile(), Ok(Reconciled::InSync));
        let generations = ledgers.generations();
        assert_eq!(generations.compiler, generations.executor);
    }

    #[test]
    fn reconcile_reports_entries_it_cannot_line_up() {
        let mut ledgers = Ledgers::new();
        ledgers.compiler.append(compiled(1));
        ledgers.compiler.append(compiled(2));
        ledgers.executor.append(evaluated(2, &[], EvalStatus::Unit));
        ledgers.compiler.append(compiled(3));
        assert!(matches!(
            ledgers.reconcile(),
            Err(InternalError::ReconcileMismatch { .. })
        ));
    }

    #[test]
    fn invariant_flags_executor_ahead_of_compiler() {
        let mut ledgers = Ledgers::new();
        ledgers.executor.append(evaluated(1, &[], EvalStatus::Unit));
        assert_eq!(
            ledgers.check_invariant(),
            Err(InternalError::GenerationInvariant {
                compiler: Generation(0),
                executor: Generation(1),
            })
        );
    }

    #[test]
    fn failed_entries_bind_nothing() {
        let ns = Namespace::default();
        assert!(evaluated(1, &["x"], EvalStatus::Value).binds(&ns, "x"));
        assert!(!evaluated(1, &["x"], EvalStatus::Failed).binds(&ns, "x"));
        assert!(!evaluated(1, &["x"], EvalStatus::Unit).binds(&Namespace::new("other"), "x"));
    }
}
