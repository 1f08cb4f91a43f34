//! Plugins extend a shell with directives, event listeners and wrappers.

use std::sync::Arc;

use tern_core::{CompiledSnippet, EvalOutcome, Snippet};

use crate::commands::{CommandRegistry, CommandSpec};
use crate::error::ShellError;
use crate::events::EventBus;
use crate::extractor::EXTRACTOR_NAME;
use crate::wrappers::{ExecutionWrapper, WrapperChain};

pub trait Plugin<A> {
    fn name(&self) -> &str;

    fn load(&self, registrar: &mut PluginRegistrar<'_, A>) -> Result<(), ShellError>;
}

/// The registration points a plugin gets while loading.
pub struct PluginRegistrar<'s, A> {
    commands: &'s mut CommandRegistry,
    events: &'s mut EventBus<A>,
    wrappers: &'s mut WrapperChain,
}

impl<'s, A> PluginRegistrar<'s, A> {
    pub(crate) fn new(
        commands: &'s mut CommandRegistry,
        events: &'s mut EventBus<A>,
        wrappers: &'s mut WrapperChain,
    ) -> Self {
        Self {
            commands,
            events,
            wrappers,
        }
    }

    pub fn register_command(&mut self, spec: CommandSpec) -> Result<(), ShellError> {
        self.commands.register(spec)
    }

    pub fn on_compile(&mut self, listener: impl Fn(&CompiledSnippet<A>) + Send + Sync + 'static) {
        self.events.on_compile(listener);
    }

    pub fn on_eval(&mut self, listener: impl Fn(&Snippet, &EvalOutcome) + Send + Sync + 'static) {
        self.events.on_eval(listener);
    }

    pub fn register_wrapper(
        &mut self,
        wrapper: Arc<dyn ExecutionWrapper>,
    ) -> Result<(), ShellError> {
        register_wrapper(self.wrappers, wrapper)
    }
}

/// Add a user wrapper, keeping the extractor's name reserved.
pub(crate) fn register_wrapper(
    chain: &mut WrapperChain,
    wrapper: Arc<dyn ExecutionWrapper>,
) -> Result<(), ShellError> {
    if wrapper.name() == EXTRACTOR_NAME {
        return Err(ShellError::DuplicateWrapper(EXTRACTOR_NAME.to_string()));
    }
    chain.register(wrapper)
}
