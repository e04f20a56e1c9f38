/// OSMR: Canonical Trace Hashing
///
/// Deterministic canonical serialization + SHA-256 hashing of a trace.
///
/// Rules:
///   - Events in trace order
///   - Event fields in fixed order: kind, object, class, source, callee
///   - Absent source/callee fields are omitted
///   - UTF-8 JSON, no whitespace

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::domain::TraceEvent;
use crate::RULESET_VERSION;

/// Canonical serialization of a trace to UTF-8 JSON bytes.
/// Includes ruleset_version as the first field.
pub fn canonical_serialize(events: &[TraceEvent]) -> Vec<u8> {
    build_canonical_value(events).to_string().into_bytes()
}

/// SHA-256 of the canonical serialization. Lowercase hex string.
pub fn canonical_hash(events: &[TraceEvent]) -> String {
    digest_hex(&canonical_serialize(events))
}

/// Lowercase hex SHA-256 of arbitrary bytes.
pub fn digest_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn build_canonical_value(events: &[TraceEvent]) -> Value {
    let mut list: Vec<Value> = Vec::with_capacity(events.len());
    for e in events {
        let mut m = Map::new();
        m.insert("kind".to_string(), Value::String(e.kind.name().to_string()));
        m.insert("object".to_string(), Value::Number(e.object.0.into()));
        m.insert("class".to_string(), Value::String(e.class.clone()));
        if let Some(source) = e.source {
            m.insert("source".to_string(), Value::Number(source.0.into()));
        }
        if let Some(callee) = &e.callee {
            m.insert("callee".to_string(), Value::String(callee.clone()));
        }
        list.push(Value::Object(m));
    }

    let mut root = Map::new();
    root.insert(
        "ruleset_version".to_string(),
        Value::Number(RULESET_VERSION.into()),
    );
    root.insert("events".to_string(), Value::Array(list));
    Value::Object(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventKind, ObjectId};

    fn sample() -> Vec<TraceEvent> {
        vec![
            TraceEvent {
                kind: EventKind::Construct,
                object: ObjectId(1),
                class: "Wd".to_string(),
                source: None,
                callee: None,
            },
            TraceEvent {
                kind: EventKind::MoveConstruct,
                object: ObjectId(2),
                class: "Wd".to_string(),
                source: Some(ObjectId(1)),
                callee: None,
            },
        ]
    }

    #[test]
    fn test_canonical_form_is_compact_and_ordered() {
        let json = String::from_utf8(canonical_serialize(&sample())).unwrap();
        assert_eq!(
            json,
            "{\"ruleset_version\":1,\"events\":[\
             {\"kind\":\"construct\",\"object\":1,\"class\":\"Wd\"},\
             {\"kind\":\"move-construct\",\"object\":2,\"class\":\"Wd\",\"source\":1}]}"
        );
    }

    #[test]
    fn test_hash_is_lowercase_hex_and_stable() {
        let h1 = canonical_hash(&sample());
        let h2 = canonical_hash(&sample());
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_empty_trace_digest() {
        // sha256 of {"ruleset_version":1,"events":[]}
        assert_eq!(
            canonical_hash(&[]),
            digest_hex(b"{\"ruleset_version\":1,\"events\":[]}")
        );
    }
}
