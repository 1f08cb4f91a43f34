//! The symbol table: declarations discovered across the session.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use strum::{Display, EnumString};
use tern_core::{FunctionSignature, Namespace, SnippetId, TypeDesc, Value};

use crate::error::ShellError;
use crate::history::{EvaluatedRecord, History, HistoryEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Instance,
    Function,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolDetail {
    Class,
    Instance { value: Value, ty: TypeDesc },
    Function { signature: FunctionSignature },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Symbol {
    pub namespace: Namespace,
    pub name: String,
    /// Snippet whose evaluation introduced the symbol.
    pub origin: SnippetId,
    pub detail: SymbolDetail,
}

impl Symbol {
    pub fn kind(&self) -> SymbolKind {
        match self.detail {
            SymbolDetail::Class => SymbolKind::Class,
            SymbolDetail::Instance { .. } => SymbolKind::Instance,
            SymbolDetail::Function { .. } => SymbolKind::Function,
        }
    }

    /// One-line rendering, e.g. `val x: Int = 1` or `fun f(n: Int): Int`.
    pub fn describe(&self) -> String {
        match &self.detail {
            SymbolDetail::Class => format!("class {}", self.name),
            SymbolDetail::Instance { value, ty } => {
                format!("val {}: {} = {}", self.name, ty, value)
            }
            SymbolDetail::Function { signature } => {
                let rendered = signature.render();
                // generic signatures render as `<T> (x: T): T`
                match rendered.split_once("> ") {
                    Some((tps, rest)) if rendered.starts_with('<') => {
                        format!("fun {}> {}{}", tps, self.name, rest)
                    }
                    _ => format!("fun {}{}", self.name, rendered),
                }
            }
        }
    }
}

/// Filter for [`SymbolTable::list`]. An empty kind set means every kind.
#[derive(Debug, Clone, Default)]
pub struct SymbolQuery {
    pattern: Option<glob::Pattern>,
    kinds: Vec<SymbolKind>,
}

impl SymbolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to names matching a glob (`*`, `?`).
    pub fn pattern(mut self, pattern: &str) -> Result<Self, ShellError> {
        let compiled = glob::Pattern::new(pattern)
            .map_err(|e| ShellError::InvalidUsage(format!("bad pattern '{}': {}", pattern, e)))?;
        self.pattern = Some(compiled);
        Ok(self)
    }

    pub fn kind(mut self, kind: SymbolKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    pub fn matches(&self, symbol: &Symbol) -> bool {
        let kind_ok = self.kinds.is_empty() || self.kinds.contains(&symbol.kind());
        let name_ok = self
            .pattern
            .as_ref()
            .map_or(true, |p| p.matches(&symbol.name));
        kind_ok && name_ok
    }
}

/// Append-only, shareable symbol store. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Arc<RwLock<Vec<Symbol>>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, symbol: Symbol) {
        self.symbols.write().push(symbol);
    }

    pub fn len(&self) -> usize {
        self.symbols.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.read().is_empty()
    }

    pub fn clear(&self) {
        self.symbols.write().clear();
    }

    /// Every recorded symbol, shadowed or not, in insertion order.
    pub fn all(&self) -> Vec<Symbol> {
        self.symbols.read().clone()
    }

    /// Symbols matching `query` that are still live in `history`: their
    /// origin is present, and no later successful snippet rebinds the same
    /// name in the same namespace.
    pub fn list(&self, history: &History<EvaluatedRecord>, query: &SymbolQuery) -> Vec<Symbol> {
        self.symbols
            .read()
            .iter()
            .filter(|symbol| query.matches(symbol))
            .filter(|symbol| is_live(symbol, history))
            .cloned()
            .collect()
    }
}

fn is_live(symbol: &Symbol, history: &History<EvaluatedRecord>) -> bool {
    if !history.contains(symbol.origin) {
        return false;
    }
    match history.find_last(|entry| entry.binds(&symbol.namespace, &symbol.name)) {
        Some(latest) => latest.id() <= symbol.origin,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::EvalStatus;
    use std::str::FromStr;
    use tern_core::{Generation, Param, Snippet, TypeParam, Variance};

    fn instance(id: u64, name: &str, value: i64) -> Symbol {
        Symbol {
            namespace: Namespace::default(),
            name: name.into(),
            origin: SnippetId(id),
            detail: SymbolDetail::Instance {
                value: Value::Int(value),
                ty: TypeDesc::Int,
            },
        }
    }

    fn entry(id: u64, names: &[&str]) -> EvaluatedRecord {
        EvaluatedRecord::new(
            Snippet::new(SnippetId(id), Generation(0), ""),
            Namespace::default(),
            names.iter().map(|n| n.to_string()).collect(),
            EvalStatus::Unit,
        )
    }

    #[test]
    fn later_binding_shadows_earlier_symbol() {
        let table = SymbolTable::new();
        let mut history = History::new();
        history.append(entry(1, &["x"]));
        table.record(instance(1, "x", 1));
        history.append(entry(2, &["x"]));
        table.record(instance(2, "x", 2));

        let listed = table.list(&history, &SymbolQuery::new());
        assert_eq!(listed, vec![instance(2, "x", 2)]);

        history.reset_to(SnippetId(1));
        let listed = table.list(&history, &SymbolQuery::new());
        assert_eq!(listed, vec![instance(1, "x", 1)]);
    }

    #[test]
    fn query_filters_by_kind_and_glob() {
        let table = SymbolTable::new();
        let mut history = History::new();
        history.append(entry(1, &["alpha", "beta", "Point"]));
        table.record(instance(1, "alpha", 1));
        table.record(instance(1, "beta", 2));
        table.record(Symbol {
            namespace: Namespace::default(),
            name: "Point".into(),
            origin: SnippetId(1),
            detail: SymbolDetail::Class,
        });

        let query = SymbolQuery::new().pattern("a*").unwrap();
        assert_eq!(table.list(&history, &query).len(), 1);
        let query = SymbolQuery::new().kind(SymbolKind::Class);
        assert_eq!(table.list(&history, &query)[0].name, "Point");
        let query = SymbolQuery::new().pattern("?eta").unwrap().kind(SymbolKind::Instance);
        assert_eq!(table.list(&history, &query)[0].name, "beta");
    }

    #[test]
    fn bad_pattern_is_a_usage_error() {
        assert!(matches!(
            SymbolQuery::new().pattern("[oops"),
            Err(ShellError::InvalidUsage(_))
        ));
    }

    #[test]
    fn kinds_parse_from_lowercase_names() {
        assert_eq!(SymbolKind::from_str("function").unwrap(), SymbolKind::Function);
        assert_eq!(SymbolKind::Instance.to_string(), "instance");
    }

    #[test]
    fn generic_function_description() {
        let signature = FunctionSignature {
            type_params: vec![TypeParam {
                name: "T".into(),
                variance: Variance::Out,
                bound: None,
            }],
            params: vec![Param {
                name: "x".into(),
                ty: TypeDesc::Param { name: "T".into() },
            }],
            ret: TypeDesc::Param { name: "T".into() },
        };
        let symbol = Symbol {
            namespace: Namespace::default(),
            name: "id".into(),
            origin: SnippetId(1),
            detail: SymbolDetail::Function { signature },
        };
        assert_eq!(symbol.describe(), "fun <out T> id(x: T): T");
    }
}
