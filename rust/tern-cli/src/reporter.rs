//! Prints engine results to the terminal.

use std::io::Write;

use tern_core::{Location, TypeDesc, Value};
use tern_shell::Reporter;
use tracing::warn;

use crate::colors::Palette;

/// Values and directive output go to stdout, errors to stderr.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    palette: Palette,
}

impl ConsoleReporter {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }
}

/// `res1: Int = 42`, colored when the palette is enabled.
pub fn render_value(palette: &Palette, name: &str, ty: &TypeDesc, value: &Value) -> String {
    format!(
        "{}: {} = {}",
        palette.cyan(name),
        palette.gray(&ty.to_string()),
        value
    )
}

pub fn render_compile_error(palette: &Palette, message: &str) -> String {
    format!("{} {}", palette.red("error:"), message)
}

impl Reporter for ConsoleReporter {
    // tern script messages already end with the position
    fn report_compile_error(&self, message: &str, _location: Option<Location>) {
        eprintln!("{}", render_compile_error(&self.palette, message));
    }

    fn report_eval_error(&self, detail: &str) {
        eprintln!("{} {}", self.palette.red("runtime error:"), detail);
    }

    fn report_value(&self, name: &str, ty: &TypeDesc, value: &Value) {
        println!("{}", render_value(&self.palette, name, ty, value));
    }

    fn report_output(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
            warn!(error = %e, "failed to write directive output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_render_as_name_type_value() {
        let plain = Palette::plain();
        assert_eq!(
            render_value(&plain, "res1", &TypeDesc::Int, &Value::Int(42)),
            "res1: Int = 42"
        );
        assert_eq!(
            render_value(
                &plain,
                "res2",
                &TypeDesc::list(TypeDesc::String),
                &Value::List(vec![Value::Str("a".into())])
            ),
            "res2: List<String> = [\"a\"]"
        );
    }

    #[test]
    fn compile_errors_are_prefixed() {
        let rendered = render_compile_error(&Palette::plain(), "unresolved name 'x' at 1:1");
        assert_eq!(rendered, "error: unresolved name 'x' at 1:1");
    }
}
