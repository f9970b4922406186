//! Renderer for the literal mapping syntax
//!
//! Writes a record back in its comment-delimited layout: one key per line,
//! aligned colons, a `# section` line whenever the section changes.

use super::value::{Mapping, Value};

/// Render a top-level record
pub fn render(mapping: &Mapping) -> String {
    let width = mapping
        .keys()
        .map(|k| quote(k).chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::from("{\n");
    let mut current: Option<&str> = None;

    for entry in mapping.entries() {
        let section = entry.section.as_deref();
        if section.is_some() && section != current {
            out.push('\n');
            out.push_str(&format!("# {}\n", section.unwrap_or_default()));
            current = section;
        }
        let key = quote(&entry.key);
        out.push_str(&format!(
            "{:<width$} :   {},\n",
            key,
            render_value(&entry.value),
            width = width
        ));
    }

    out.push_str("}\n");
    out
}

/// Render a single value on one line
pub fn render_value(value: &Value) -> String {
    match value {
        Value::None => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => render_float(*f),
        Value::Str(s) => quote(s),
        Value::Tuple(items) => {
            let inner: Vec<String> = items.iter().map(render_value).collect();
            if items.len() == 1 {
                format!("({},)", inner[0])
            } else {
                format!("({})", inner.join(", "))
            }
        }
        Value::List(items) => {
            let inner: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Dict(m) => {
            let inner: Vec<String> = m
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), render_value(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        "float('nan')".to_string()
    } else if f.is_infinite() {
        if f > 0.0 {
            "float('inf')".to_string()
        } else {
            "float('-inf')".to_string()
        }
    } else {
        // Debug always keeps a '.' or exponent, so the value re-reads as a float
        format!("{:?}", f)
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
