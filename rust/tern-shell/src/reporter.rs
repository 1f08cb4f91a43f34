//! Where the engine sends user-visible results.

use std::sync::Arc;

use parking_lot::Mutex;
use tern_core::{Location, TypeDesc, Value};

pub trait Reporter: Send + Sync {
    fn report_compile_error(&self, message: &str, location: Option<Location>);

    fn report_eval_error(&self, detail: &str);

    fn report_value(&self, name: &str, ty: &TypeDesc, value: &Value);

    /// Text produced by a directive. Dropped unless overridden.
    fn report_output(&self, _text: &str) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    CompileError {
        message: String,
        location: Option<Location>,
    },
    EvalError(String),
    Value {
        name: String,
        ty: TypeDesc,
        value: Value,
    },
    Output(String),
}

/// Keeps every report in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    reports: Arc<Mutex<Vec<Report>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    pub fn take(&self) -> Vec<Report> {
        std::mem::take(&mut *self.reports.lock())
    }

    /// Rendered `name: Type = value` lines, in order.
    pub fn values(&self) -> Vec<String> {
        self.reports
            .lock()
            .iter()
            .filter_map(|r| match r {
                Report::Value { name, ty, value } => Some(format!("{}: {} = {}", name, ty, value)),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.reports
            .lock()
            .iter()
            .filter_map(|r| match r {
                Report::CompileError { message, .. } => Some(message.clone()),
                Report::EvalError(detail) => Some(detail.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn output(&self) -> String {
        self.reports
            .lock()
            .iter()
            .filter_map(|r| match r {
                Report::Output(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn report_compile_error(&self, message: &str, location: Option<Location>) {
        self.reports.lock().push(Report::CompileError {
            message: message.to_string(),
            location,
        });
    }

    fn report_eval_error(&self, detail: &str) {
        self.reports.lock().push(Report::EvalError(detail.to_string()));
    }

    fn report_value(&self, name: &str, ty: &TypeDesc, value: &Value) {
        self.reports.lock().push(Report::Value {
            name: name.to_string(),
            ty: ty.clone(),
            value: value.clone(),
        });
    }

    fn report_output(&self, text: &str) {
        self.reports.lock().push(Report::Output(text.to_string()));
    }
}
