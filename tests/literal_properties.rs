//! Property tests for the literal reader and writer

use mbrl_jobs::literal::{self, Mapping, Value};
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

const SECTIONS: &[&str] = &["general inputs", "dynamics learning", "NPG params"];

fn scalar(i: i64, f: f64, s: &str, pick: u8) -> Value {
    match pick % 5 {
        0 => Value::Int(i),
        1 => Value::Float(f),
        2 => Value::Str(s.to_string()),
        3 => Value::Bool(i % 2 == 0),
        _ => Value::None,
    }
}

#[quickcheck]
fn prop_render_then_parse_is_stable(entries: Vec<(String, i64, f64, String, u8)>) -> TestResult {
    if entries.iter().any(|(_, _, f, _, _)| !f.is_finite()) {
        return TestResult::discard();
    }

    let mut mapping = Mapping::new();
    for (key, i, f, s, pick) in &entries {
        if mapping.contains_key(key) {
            continue;
        }
        let value = if pick % 7 == 6 {
            Value::Tuple(vec![Value::Int(*i), scalar(*i, *f, s, pick / 7)])
        } else {
            scalar(*i, *f, s, *pick)
        };
        let section = SECTIONS[*pick as usize % SECTIONS.len()];
        mapping.insert_in_section(key.clone(), value, section);
    }

    let rendered = literal::render(&mapping);
    match literal::parse(&rendered) {
        Ok(parsed) => TestResult::from_bool(parsed == mapping),
        Err(_) => TestResult::failed(),
    }
}

#[quickcheck]
fn prop_int_literals_parse(n: i64) -> bool {
    let text = format!("{{'n': {}}}", n);
    literal::parse(&text)
        .map(|m| m.get("n") == Some(&Value::Int(n)))
        .unwrap_or(false)
}
