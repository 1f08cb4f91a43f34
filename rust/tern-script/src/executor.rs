//! The snippet executor: runs a checked artifact against the session
//! environment and binds the resulting frame.

use std::io::Write;
use std::sync::Arc;

use tern_core::{
    CompiledSnippet, Environment, EvalOutcome, Execution, Frame, FunctionSignature, Member,
    MemberKind, Opaque, ServiceError, SnippetExecutor, TypeDesc, RESULT_MEMBER, RUN_MEMBER,
};
use tracing::{debug, warn};

use crate::interp::{Interpreter, RuntimeError};
use crate::ir::{IrItem, ScriptArtifact};

pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

pub struct ScriptExecutor {
    max_call_depth: usize,
    out: Box<dyn Write + Send>,
}

impl Default for ScriptExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptExecutor")
            .field("max_call_depth", &self.max_call_depth)
            .finish_non_exhaustive()
    }
}

impl ScriptExecutor {
    /// Executor printing program output to stdout.
    pub fn new() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            out: Box::new(std::io::stdout()),
        }
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Redirect `print` output.
    pub fn with_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// Check that every binding the artifact reads from earlier snippets
    /// is present in the environment.
    fn missing_dependency(
        compiled: &CompiledSnippet<ScriptArtifact>,
        env: &Environment,
    ) -> Option<String> {
        compiled
            .artifact
            .deps
            .iter()
            .find(|dep| env.lookup(dep.snippet, &dep.name).is_none())
            .map(|dep| {
                format!(
                    "line {} reads '{}' from line {}, which has not been evaluated",
                    compiled.snippet.id, dep.name, dep.snippet
                )
            })
    }
}

impl SnippetExecutor for ScriptExecutor {
    type Artifact = ScriptArtifact;

    fn eval(
        &mut self,
        compiled: &CompiledSnippet<ScriptArtifact>,
        env: &mut Environment,
    ) -> Result<Execution, ServiceError> {
        let id = compiled.snippet.id;
        if let Some(reason) = Self::missing_dependency(compiled, env) {
            warn!(snippet = %id, "{}", reason);
            return Ok(Execution::without_frame(EvalOutcome::HistoryMismatch(reason)));
        }

        let mut frame = Frame::new(id, compiled.manifest.type_name.clone());
        let mut members = Vec::new();
        for item in &compiled.artifact.items {
            match item {
                IrItem::Class { name, .. } => frame.nested_types.push(name.clone()),
                IrItem::Fun(function) => members.push(Member {
                    name: function.name.clone(),
                    declared_in: id,
                    kind: MemberKind::Function {
                        signature: function.signature.clone(),
                        entry: function.clone() as Opaque,
                    },
                }),
                IrItem::Let { .. } | IrItem::Expr(_) => {}
            }
        }

        let (result, members) = {
            let mut interp =
                Interpreter::new(env, id, members, self.max_call_depth, &mut *self.out);
            let result = interp.run(&compiled.artifact.items);
            (result, interp.into_members())
        };
        if let Err(e) = self.out.flush() {
            warn!(snippet = %id, error = %e, "failed to flush program output");
        }

        let value = match result {
            Ok(value) => value,
            Err(RuntimeError::BadEntry { name }) => return Err(ServiceError::OpaquePayload(name)),
            Err(e) if e.is_internal() => {
                return Err(ServiceError::MalformedArtifact(id.get(), e.to_string()))
            }
            Err(e) => {
                debug!(snippet = %id, error = %e, "evaluation failed");
                return Ok(Execution::without_frame(EvalOutcome::Error(e.to_string())));
            }
        };

        let result_type = compiled.artifact.result_type.clone();
        frame.members = members;
        frame.members.push(Member {
            name: RESULT_MEMBER.to_string(),
            declared_in: id,
            kind: MemberKind::Property {
                value: value.clone(),
                ty: result_type.clone(),
            },
        });
        frame.members.push(Member {
            name: RUN_MEMBER.to_string(),
            declared_in: id,
            kind: MemberKind::Function {
                signature: FunctionSignature::new(Vec::new(), result_type.clone()),
                entry: Arc::new(compiled.artifact.clone()) as Opaque,
            },
        });
        let frame = Arc::new(frame);
        env.bind(frame.clone());

        let outcome = if result_type == TypeDesc::Unit {
            EvalOutcome::Unit
        } else {
            EvalOutcome::Value {
                value,
                ty: result_type,
            }
        };
        Ok(Execution::new(outcome, Some(frame)))
    }
}
