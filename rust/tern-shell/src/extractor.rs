//! Records the declarations of each evaluated snippet in the symbol table.
//!
//! The extractor wraps the whole execution chain. It reads the frame the
//! executor bound and checks it against the compiler's manifest: a
//! declaration missing from the frame, or a member of a kind the shell does
//! not know, means the compiler and executor disagree and is fatal.

use tern_core::{DeclarationKind, Execution, Frame, MemberKind, Namespace};
use tracing::{debug, error};

use crate::error::{InternalError, ShellError};
use crate::symbols::{Symbol, SymbolDetail, SymbolTable};
use crate::wrappers::{ExecutionWrapper, Proceed, WrapContext};

pub const EXTRACTOR_NAME: &str = "symbol-extractor";

#[derive(Debug, Clone)]
pub struct SymbolExtractor {
    table: SymbolTable,
}

impl SymbolExtractor {
    pub fn new(table: SymbolTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    fn extract(&self, cx: &WrapContext<'_>, frame: &Frame) -> Result<(), InternalError> {
        let namespace = Namespace::of_type_name(&frame.type_name);
        let origin = cx.snippet.id;
        let mut symbols = Vec::new();

        for nested in &frame.nested_types {
            symbols.push(Symbol {
                namespace: namespace.clone(),
                name: nested.clone(),
                origin,
                detail: SymbolDetail::Class,
            });
        }

        for member in &frame.members {
            if member.declared_in != origin || member.is_reserved() {
                continue;
            }
            let detail = match &member.kind {
                MemberKind::Property { value, ty } => SymbolDetail::Instance {
                    value: value.clone(),
                    ty: ty.clone(),
                },
                MemberKind::Function { signature, .. } => SymbolDetail::Function {
                    signature: signature.clone(),
                },
                MemberKind::Other { descriptor } => {
                    return Err(InternalError::UnknownMemberKind {
                        type_name: frame.type_name.clone(),
                        member: member.name.clone(),
                        descriptor: descriptor.clone(),
                    })
                }
            };
            symbols.push(Symbol {
                namespace: namespace.clone(),
                name: member.name.clone(),
                origin,
                detail,
            });
        }

        for decl in &cx.manifest.declarations {
            let present = match decl.kind {
                DeclarationKind::Class { .. } => frame.has_nested_type(&decl.name),
                DeclarationKind::Property { .. } | DeclarationKind::Function { .. } => frame
                    .member(&decl.name)
                    .is_some_and(|m| m.declared_in == origin),
            };
            if !present {
                return Err(InternalError::MissingMember {
                    type_name: frame.type_name.clone(),
                    member: decl.name.clone(),
                });
            }
        }

        debug!(snippet = %origin, %namespace, count = symbols.len(), "extracted symbols");
        for symbol in symbols {
            self.table.record(symbol);
        }
        Ok(())
    }
}

impl ExecutionWrapper for SymbolExtractor {
    fn name(&self) -> &str {
        EXTRACTOR_NAME
    }

    fn around(
        &self,
        cx: &WrapContext<'_>,
        proceed: &mut Proceed<'_>,
    ) -> Result<Execution, ShellError> {
        let execution = proceed()?;
        if !execution.outcome.is_success() {
            return Ok(execution);
        }
        let result = match &execution.frame {
            Some(frame) => self.extract(cx, frame),
            None => Err(InternalError::MissingFrame(cx.snippet.id)),
        };
        if let Err(e) = result {
            error!(snippet = %cx.snippet.id, error = %e, "symbol extraction failed");
            return Err(e.into());
        }
        Ok(execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tern_core::{
        Declaration, EvalOutcome, Generation, Manifest, Member, Snippet, SnippetId, TypeDesc,
        Value, RESULT_MEMBER,
    };

    fn run(manifest: &Manifest, frame: Frame) -> (SymbolTable, Result<Execution, ShellError>) {
        let table = SymbolTable::new();
        let extractor = SymbolExtractor::new(table.clone());
        let snippet = Snippet::new(SnippetId(3), Generation(2), "");
        let cx = WrapContext {
            snippet: &snippet,
            manifest,
        };
        let frame = Arc::new(frame);
        let result = extractor.around(&cx, &mut || {
            Ok(Execution::new(EvalOutcome::Unit, Some(frame.clone())))
        });
        (table, result)
    }

    fn property(name: &str, declared_in: u64) -> Member {
        Member {
            name: name.into(),
            declared_in: SnippetId(declared_in),
            kind: MemberKind::Property {
                value: Value::Int(7),
                ty: TypeDesc::Int,
            },
        }
    }

    #[test]
    fn records_own_members_and_nested_types() {
        let mut manifest = Manifest::new(Namespace::new("geo"), "geo.Line_3");
        manifest.declarations.push(Declaration {
            name: "seven".into(),
            kind: DeclarationKind::Property { ty: TypeDesc::Int },
        });
        let mut frame = Frame::new(SnippetId(3), "geo.Line_3");
        frame.nested_types.push("Shape".into());
        frame.members.push(property("seven", 3));
        frame.members.push(property("inherited", 1));
        frame.members.push(property(RESULT_MEMBER, 3));

        let (table, result) = run(&manifest, frame);
        assert!(result.is_ok());
        let names: Vec<String> = table.all().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["Shape", "seven"]);
        assert!(table.all().iter().all(|s| s.namespace.as_str() == "geo"));
    }

    #[test]
    fn unknown_member_kind_is_fatal() {
        let manifest = Manifest::new(Namespace::default(), "repl.Line_3");
        let mut frame = Frame::new(SnippetId(3), "repl.Line_3");
        frame.members.push(Member {
            name: "mystery".into(),
            declared_in: SnippetId(3),
            kind: MemberKind::Other {
                descriptor: "field-accessor".into(),
            },
        });
        let (table, result) = run(&manifest, frame);
        assert!(matches!(
            result,
            Err(ShellError::Internal(InternalError::UnknownMemberKind { .. }))
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn declared_member_absent_from_frame_is_fatal() {
        let mut manifest = Manifest::new(Namespace::default(), "repl.Line_3");
        manifest.declarations.push(Declaration {
            name: "ghost".into(),
            kind: DeclarationKind::Property { ty: TypeDesc::Int },
        });
        let frame = Frame::new(SnippetId(3), "repl.Line_3");
        let (_, result) = run(&manifest, frame);
        match result {
            Err(ShellError::Internal(InternalError::MissingMember { member, .. })) => {
                assert_eq!(member, "ghost")
            }
            other => panic!("expected missing member, got {:?}", other),
        }
    }
}
