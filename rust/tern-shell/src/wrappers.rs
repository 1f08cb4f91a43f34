//! Around-advice over the executor call.
//!
//! Each wrapper receives the rest of the chain as an explicit `proceed`
//! callable. The chain is fixed while a cycle runs.

use std::sync::Arc;

use tern_core::{Execution, Manifest, Snippet};

use crate::error::ShellError;

/// What a wrapper may look at while it runs.
#[derive(Debug, Clone, Copy)]
pub struct WrapContext<'a> {
    pub snippet: &'a Snippet,
    pub manifest: &'a Manifest,
}

pub type Proceed<'p> = dyn FnMut() -> Result<Execution, ShellError> + 'p;

pub trait ExecutionWrapper: Send + Sync {
    fn name(&self) -> &str;

    /// Run around the inner chain. Implementations call `proceed` at most
    /// once and normally return its result unchanged.
    fn around(
        &self,
        cx: &WrapContext<'_>,
        proceed: &mut Proceed<'_>,
    ) -> Result<Execution, ShellError>;
}

/// A wrapper built from a closure.
pub struct FnWrapper<F> {
    name: String,
    f: F,
}

impl<F> ExecutionWrapper for FnWrapper<F>
where
    F: Fn(&WrapContext<'_>, &mut Proceed<'_>) -> Result<Execution, ShellError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn around(
        &self,
        cx: &WrapContext<'_>,
        proceed: &mut Proceed<'_>,
    ) -> Result<Execution, ShellError> {
        (self.f)(cx, proceed)
    }
}

pub fn wrap_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn ExecutionWrapper>
where
    F: Fn(&WrapContext<'_>, &mut Proceed<'_>) -> Result<Execution, ShellError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnWrapper {
        name: name.into(),
        f,
    })
}

/// Registered wrappers, outermost first.
#[derive(Default, Clone)]
pub struct WrapperChain {
    wrappers: Vec<Arc<dyn ExecutionWrapper>>,
}

impl WrapperChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the current chain in `wrapper`; it becomes the outermost.
    pub fn register(&mut self, wrapper: Arc<dyn ExecutionWrapper>) -> Result<(), ShellError> {
        if self.wrappers.iter().any(|w| w.name() == wrapper.name()) {
            return Err(ShellError::DuplicateWrapper(wrapper.name().to_string()));
        }
        self.wrappers.insert(0, wrapper);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.wrappers.len();
        self.wrappers.retain(|w| w.name() != name);
        self.wrappers.len() != before
    }

    /// Wrapper names, outermost first.
    pub fn names(&self) -> Vec<String> {
        self.wrappers.iter().map(|w| w.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    /// Run `base` inside every wrapper.
    pub fn run(
        &self,
        cx: &WrapContext<'_>,
        base: &mut Proceed<'_>,
    ) -> Result<Execution, ShellError> {
        self.run_from(0, cx, base)
    }

    fn run_from(
        &self,
        idx: usize,
        cx: &WrapContext<'_>,
        base: &mut Proceed<'_>,
    ) -> Result<Execution, ShellError> {
        match self.wrappers.get(idx) {
            None => base(),
            Some(wrapper) => wrapper.around(cx, &mut || self.run_from(idx + 1, cx, &mut *base)),
        }
    }
}

impl std::fmt::Debug for WrapperChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tern_core::{EvalOutcome, Generation, Namespace, SnippetId, TypeDesc, Value};

    fn recorder(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<dyn ExecutionWrapper> {
        wrap_fn(name, move |_cx, proceed| {
            log.lock().push(format!("enter {}", name));
            let result = proceed();
            log.lock().push(format!("exit {}", name));
            result
        })
    }

    fn run(chain: &WrapperChain, log: &Arc<Mutex<Vec<String>>>) -> Execution {
        let snippet = Snippet::new(SnippetId(1), Generation(0), "1");
        let manifest = Manifest::new(Namespace::default(), "repl.Line_1");
        let cx = WrapContext {
            snippet: &snippet,
            manifest: &manifest,
        };
        let log = log.clone();
        chain
            .run(&cx, &mut || {
                log.lock().push("base".into());
                Ok(Execution::without_frame(EvalOutcome::Value {
                    value: Value::Int(1),
                    ty: TypeDesc::Int,
                }))
            })
            .unwrap()
    }

    #[test]
    fn newest_wrapper_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = WrapperChain::new();
        chain.register(recorder("first", log.clone())).unwrap();
        chain.register(recorder("second", log.clone())).unwrap();
        run(&chain, &log);
        assert_eq!(
            *log.lock(),
            ["enter second", "enter first", "base", "exit first", "exit second"]
        );
    }

    #[test]
    fn removing_a_wrapper_leaves_the_others() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = WrapperChain::new();
        chain.register(recorder("a", log.clone())).unwrap();
        chain.register(recorder("b", log.clone())).unwrap();
        assert!(chain.remove("a"));
        assert!(!chain.remove("a"));
        let execution = run(&chain, &log);
        assert_eq!(*log.lock(), ["enter b", "base", "exit b"]);
        assert!(execution.outcome.is_success());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = WrapperChain::new();
        chain.register(recorder("a", log.clone())).unwrap();
        assert!(matches!(
            chain.register(recorder("a", log)),
            Err(ShellError::DuplicateWrapper(_))
        ));
    }
}
