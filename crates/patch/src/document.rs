//! The constructed merge patch and RFC 7396 application

use crate::error::SerializationError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// A JSON Merge Patch body holding only the populated fields
///
/// Key order is deterministic, so serializing the same document twice
/// always yields the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PatchDocument(Map<String, Value>);

impl PatchDocument {
    /// An empty document; sending it changes nothing
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Number of top-level keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if no field was populated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if the wire name is present (including as `null`)
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// The value sent for a wire name
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Wire names present in the document
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Borrow the underlying map
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Take the underlying map
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Take the document as a JSON object value
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Serialize to the bytes sent on the wire
    pub fn to_vec(&self) -> Result<Vec<u8>, SerializationError> {
        Ok(serde_json::to_vec(&self.0)?)
    }

    /// Apply this patch to a local JSON value (RFC 7396)
    pub fn apply_to(&self, target: &mut Value) {
        merge_object(target, &self.0);
    }
}

impl fmt::Display for PatchDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl From<PatchDocument> for Value {
    fn from(document: PatchDocument) -> Self {
        document.into_value()
    }
}

/// Apply `patch` to `target` following RFC 7396
///
/// A non-object patch replaces the target. An object patch is merged key by
/// key: `null` removes the key, objects merge recursively, anything else
/// (arrays included) replaces the existing value.
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(patch_map) => merge_object(target, patch_map),
        other => *target = other.clone(),
    }
}

fn merge_object(target: &mut Value, patch: &Map<String, Value>) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch {
            if value.is_null() {
                target_map.remove(key);
            } else {
                let slot = target_map.entry(key.clone()).or_insert(Value::Null);
                apply_merge_patch(slot, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> PatchDocument {
        match value {
            Value::Object(map) => PatchDocument::from_map(map),
            _ => panic!("test documents must be objects"),
        }
    }

    #[test]
    fn test_empty_document_serializes_to_empty_object() {
        let doc = PatchDocument::new();
        assert!(doc.is_empty());
        assert_eq!(doc.to_vec().unwrap(), b"{}");
        assert_eq!(doc.to_string(), "{}");
    }

    #[test]
    fn test_lookup_distinguishes_null_from_missing() {
        let doc = document(json!({"name": "Acme", "contact": null}));
        assert_eq!(doc.len(), 2);
        assert!(doc.contains_key("contact"));
        assert_eq!(doc.get("contact"), Some(&Value::Null));
        assert!(!doc.contains_key("provider_access_group"));
        assert_eq!(doc.get("provider_access_group"), None);
    }

    #[test]
    fn test_serialization_is_stable() {
        let doc = document(json!({"name": "Acme", "contact": null, "account": 1}));
        assert_eq!(doc.to_string(), doc.clone().to_string());
        assert_eq!(doc.to_vec().unwrap(), doc.to_string().into_bytes());
    }

    #[test]
    fn test_rfc7396_examples() {
        // Appendix A of RFC 7396
        let cases = [
            (json!({"a": "b"}), json!({"a": "c"}), json!({"a": "c"})),
            (json!({"a": "b"}), json!({"b": "c"}), json!({"a": "b", "b": "c"})),
            (json!({"a": "b"}), json!({"a": null}), json!({})),
            (json!({"a": "b", "b": "c"}), json!({"a": null}), json!({"b": "c"})),
            (json!({"a": ["b"]}), json!({"a": "c"}), json!({"a": "c"})),
            (json!({"a": "c"}), json!({"a": ["b"]}), json!({"a": ["b"]})),
            (
                json!({"a": {"b": "c"}}),
                json!({"a": {"b": "d", "c": null}}),
                json!({"a": {"b": "d"}}),
            ),
            (json!({"a": [{"b": "c"}]}), json!({"a": [1]}), json!({"a": [1]})),
            (json!(["a", "b"]), json!(["c", "d"]), json!(["c", "d"])),
            (json!({"a": "b"}), json!(["c"]), json!(["c"])),
            (json!({"a": "foo"}), json!(null), json!(null)),
            (json!({"a": "foo"}), json!("bar"), json!("bar")),
            (json!({"e": null}), json!({"a": 1}), json!({"e": null, "a": 1})),
            (json!([1, 2]), json!({"a": "b", "c": null}), json!({"a": "b"})),
            (json!({}), json!({"a": {"bb": {"ccc": null}}}), json!({"a": {"bb": {}}})),
        ];

        for (mut target, patch, expected) in cases {
            apply_merge_patch(&mut target, &patch);
            assert_eq!(target, expected, "patch {patch}");
        }
    }

    #[test]
    fn test_document_apply_to_merges_nested_objects() {
        let mut registration = json!({
            "name": "Old Co",
            "contact": {"name": "Old Rep", "email": "old@example.com", "phone": "555"},
            "provider_access_group": "AccessGroupId-1"
        });
        let doc = document(json!({
            "contact": {"name": "New Rep", "email": "new@example.com"},
            "provider_access_group": null
        }));

        doc.apply_to(&mut registration);

        assert_eq!(
            registration,
            json!({
                "name": "Old Co",
                "contact": {"name": "New Rep", "email": "new@example.com", "phone": "555"}
            })
        );
    }
}
