//! Name lookup against the data context.

use serde_json::Value;

/// The chain of values a template can see, innermost last. Each section
/// that renders pushes its value for the duration of its body.
pub(super) struct Stack<'a> {
    frames: Vec<&'a Value>,
}

impl<'a> Stack<'a> {
    pub(super) fn new(root: &'a Value) -> Self {
        Self { frames: vec![root] }
    }

    pub(super) fn push(&mut self, value: &'a Value) {
        self.frames.push(value);
    }

    pub(super) fn pop(&mut self) {
        self.frames.pop();
    }

    /// Resolve `name`, `a.b.c` or `.`.
    ///
    /// The first segment of a dotted name is searched from the innermost
    /// frame outwards; the rest must resolve inside whatever it found.
    pub(super) fn lookup(&self, name: &str) -> Option<&'a Value> {
        if name == "." {
            return self.frames.last().copied();
        }
        let mut segments = name.split('.');
        let first = segments.next()?;
        let mut value = self
            .frames
            .iter()
            .rev()
            .find_map(|&frame| frame.get(first))?;
        for segment in segments {
            value = value.get(segment)?;
        }
        Some(value)
    }
}

/// Whether a section over `value` renders its body.
///
/// `null`, `false`, `0`, `""` and `[]` are falsy. Objects always count.
pub(super) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Text written for an interpolated value.
pub(super) fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}
