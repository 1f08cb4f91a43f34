//! Runtime values produced by the executor.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::ids::SnippetId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(Arc<Object>),
}

/// An instance of a user class. Fields keep declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Object {
    /// Simple class name as written in source.
    pub class: String,
    /// Snippet that declared the class.
    #[serde(skip)]
    pub origin: SnippetId,
    pub fields: Vec<(String, Value)>,
}

impl Object {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

impl Value {
    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    /// Render the value as tern script source that evaluates back to it.
    /// Constructors are pinned to their declaring line (`Point@3(1, 2)`), so
    /// the source stays valid after the class name is redeclared.
    ///
    /// ```
    /// use tern_core::Value;
    /// assert_eq!(Value::Str("a\"b".into()).to_source(), r#""a\"b""#);
    /// assert_eq!(Value::Float(2.0).to_source(), "2.0");
    /// ```
    pub fn to_source(&self) -> String {
        match self {
            Value::Unit => "{ }".to_string(),
            Value::Bool(b) => b.to_string(),
            // The literal 9223372036854775808 does not fit, so spell MIN as arithmetic.
            Value::Int(n) if *n == i64::MIN => format!("({} - 1)", i64::MIN + 1),
            Value::Int(n) => n.to_string(),
            Value::Float(x) => float_source(*x),
            Value::Str(s) => quote(s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::to_source).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Object(obj) => {
                let parts: Vec<String> = obj.fields.iter().map(|(_, v)| v.to_source()).collect();
                format!("{}@{}({})", obj.class, obj.origin, parts.join(", "))
            }
        }
    }
}

fn float_source(x: f64) -> String {
    if x.is_nan() {
        "(0.0 / 0.0)".to_string()
    } else if x.is_infinite() {
        if x > 0.0 {
            "(1.0 / 0.0)".to_string()
        } else {
            "(-1.0 / 0.0)".to_string()
        }
    } else {
        // Debug formatting always keeps a fractional part (`2.0`, not `2`).
        format!("{:?}", x)
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{}", quote(s)),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => {
                write!(f, "{}(", obj.class)?;
                for (i, (name, value)) in obj.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", name, value)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: i64, y: i64) -> Value {
        Value::Object(Arc::new(Object {
            class: "Point".into(),
            origin: SnippetId(3),
            fields: vec![("x".into(), Value::Int(x)), ("y".into(), Value::Int(y))],
        }))
    }

    #[test]
    fn objects_display_with_field_names() {
        assert_eq!(point(1, 2).to_string(), "Point(x=1, y=2)");
    }

    #[test]
    fn objects_render_as_constructor_calls() {
        let list = Value::List(vec![point(1, 2), point(3, -4)]);
        assert_eq!(list.to_source(), "[Point@3(1, 2), Point@3(3, -4)]");
    }

    #[test]
    fn non_finite_floats_render_as_expressions() {
        assert_eq!(Value::Float(f64::INFINITY).to_source(), "(1.0 / 0.0)");
        assert_eq!(Value::Float(f64::NAN).to_source(), "(0.0 / 0.0)");
    }

    #[test]
    fn strings_escape_control_characters() {
        assert_eq!(Value::Str("a\nb\t\\".into()).to_source(), r#""a\nb\t\\""#);
    }

    #[test]
    fn values_serialize_untagged() {
        let json = serde_json::to_string(&Value::List(vec![Value::Int(1), Value::Bool(true)]))
            .expect("serialize");
        assert_eq!(json, "[1,true]");
    }
}
