//! Duplicate-key detection for schema text.
//!
//! `serde_json` keeps the last of two equal keys in an object and drops the
//! first without a word. For a schema that means a message defined twice
//! under the same path silently loses one definition. Before the text is
//! turned into a `serde_json::Value`, it is walked once with a seeded
//! visitor that records every key seen twice in the same object.

use std::collections::HashSet;
use std::fmt;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};

/// One step of a path into a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Key(String),
    Index(usize),
}

/// Returns the path of every repeated object key in `text`, in document
/// order. The last segment of each path is the repeated key.
pub(crate) fn duplicate_keys(
    text: &str,
) -> Result<Vec<Vec<Segment>>, serde_json::Error> {
    let mut found = Vec::new();
    let mut de = serde_json::Deserializer::from_str(text);
    KeyAudit {
        path: Vec::new(),
        found: &mut found,
    }
    .deserialize(&mut de)?;
    de.end()?;
    Ok(found)
}

struct KeyAudit<'a> {
    path: Vec<Segment>,
    found: &'a mut Vec<Vec<Segment>>,
}

impl KeyAudit<'_> {
    fn child(&mut self, segment: Segment) -> KeyAudit<'_> {
        let mut path = self.path.clone();
        path.push(segment);
        KeyAudit {
            path,
            found: &mut *self.found,
        }
    }
}

impl<'de> DeserializeSeed<'de> for KeyAudit<'_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for KeyAudit<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E>(self, _: bool) -> Result<(), E>
    where
        E: de::Error,
    {
        Ok(())
    }

    fn visit_i64<E>(self, _: i64) -> Result<(), E>
    where
        E: de::Error,
    {
        Ok(())
    }

    fn visit_u64<E>(self, _: u64) -> Result<(), E>
    where
        E: de::Error,
    {
        Ok(())
    }

    fn visit_f64<E>(self, _: f64) -> Result<(), E>
    where
        E: de::Error,
    {
        Ok(())
    }

    fn visit_str<E>(self, _: &str) -> Result<(), E>
    where
        E: de::Error,
    {
        Ok(())
    }

    fn visit_unit<E>(self) -> Result<(), E>
    where
        E: de::Error,
    {
        Ok(())
    }

    fn visit_seq<A>(mut self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut index = 0;
        while seq
            .next_element_seed(self.child(Segment::Index(index)))?
            .is_some()
        {
            index += 1;
        }
        Ok(())
    }

    fn visit_map<A>(mut self, mut map: A) -> Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut seen = HashSet::new();
        while let Some(key) = map.next_key::<String>()? {
            let mut child = self.child(Segment::Key(key.clone()));
            if !seen.insert(key) {
                child.found.push(child.path.clone());
            }
            map.next_value_seed(child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(path: &[Segment]) -> Vec<String> {
        path.iter()
            .map(|s| match s {
                Segment::Key(k) => k.clone(),
                Segment::Index(i) => i.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_no_duplicates() {
        let found =
            duplicate_keys(r#"{"a": {"b": [1, 2]}, "c": {"b": null}}"#).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_nested_duplicate_is_reported_with_path() {
        let text = r#"{"messages": {"A": {"X": [], "X": []}}}"#;
        let found = duplicate_keys(text).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(keys(&found[0]), vec!["messages", "A", "X"]);
    }

    #[test]
    fn test_duplicate_inside_array_records_index() {
        let text = r#"[{"name": "a"}, {"name": "a", "name": "b"}]"#;
        let found = duplicate_keys(text).unwrap();
        assert_eq!(
            found,
            vec![vec![Segment::Index(1), Segment::Key("name".into())]]
        );
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(duplicate_keys(r#"{"a": }"#).is_err());
        assert!(duplicate_keys(r#"{"a": 1} trailing"#).is_err());
    }
}
