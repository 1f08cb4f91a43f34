//! Lifecycle events raised by the engine. Listeners run synchronously, in
//! registration order.

use tern_core::{CompiledSnippet, EvalOutcome, Snippet};

pub type CompileListener<A> = Box<dyn Fn(&CompiledSnippet<A>) + Send + Sync>;
pub type EvalListener = Box<dyn Fn(&Snippet, &EvalOutcome) + Send + Sync>;

pub struct EventBus<A> {
    on_compile: Vec<CompileListener<A>>,
    on_eval: Vec<EvalListener>,
}

impl<A> Default for EventBus<A> {
    fn default() -> Self {
        Self {
            on_compile: Vec::new(),
            on_eval: Vec::new(),
        }
    }
}

impl<A> EventBus<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with every compiled snippet before it is evaluated.
    pub fn on_compile(&mut self, listener: impl Fn(&CompiledSnippet<A>) + Send + Sync + 'static) {
        self.on_compile.push(Box::new(listener));
    }

    /// Called with the outcome of every evaluation.
    pub fn on_eval(&mut self, listener: impl Fn(&Snippet, &EvalOutcome) + Send + Sync + 'static) {
        self.on_eval.push(Box::new(listener));
    }

    pub fn emit_compile(&self, compiled: &CompiledSnippet<A>) {
        for listener in &self.on_compile {
            listener(compiled);
        }
    }

    pub fn emit_eval(&self, snippet: &Snippet, outcome: &EvalOutcome) {
        for listener in &self.on_eval {
            listener(snippet, outcome);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.on_compile.len() + self.on_eval.len()
    }
}

impl<A> std::fmt::Debug for EventBus<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("on_compile", &self.on_compile.len())
            .field("on_eval", &self.on_eval.len())
            .finish()
    }
}
