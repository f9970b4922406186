//! Key-level comparison of two records

use crate::literal::{Mapping, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Only in the right-hand record
    Added { key: String, value: Value },
    /// Only in the left-hand record
    Removed { key: String, value: Value },
    Changed { key: String, left: Value, right: Value },
}

impl Change {
    pub fn key(&self) -> &str {
        match self {
            Change::Added { key, .. } | Change::Removed { key, .. } | Change::Changed { key, .. } => key,
        }
    }
}

/// Changes in left-key order, followed by right-only keys
pub fn diff(left: &Mapping, right: &Mapping) -> Vec<Change> {
    let mut changes = Vec::new();

    for (key, l) in left.iter() {
        match right.get(key) {
            None => changes.push(Change::Removed {
                key: key.to_string(),
                value: l.clone(),
            }),
            Some(r) if r != l => changes.push(Change::Changed {
                key: key.to_string(),
                left: l.clone(),
                right: r.clone(),
            }),
            Some(_) => {}
        }
    }

    for (key, r) in right.iter() {
        if !left.contains_key(key) {
            changes.push(Change::Added {
                key: key.to_string(),
                value: r.clone(),
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::parse;

    #[test]
    fn test_diff_order_and_kinds() {
        let a = parse("{'a': 1, 'b': 2, 'c': 3}").unwrap();
        let b = parse("{'d': 4, 'c': 3, 'b': 5}").unwrap();
        let changes = diff(&a, &b);
        let keys: Vec<&str> = changes.iter().map(Change::key).collect();
        assert_eq!(keys, vec!["a", "b", "d"]);
        assert!(matches!(changes[0], Change::Removed { .. }));
        assert!(matches!(changes[1], Change::Changed { .. }));
        assert!(matches!(changes[2], Change::Added { .. }));
    }

    #[test]
    fn test_identical() {
        let a = parse("{'x': (1, 2)}").unwrap();
        assert!(diff(&a, &a.clone()).is_empty());
    }
}
