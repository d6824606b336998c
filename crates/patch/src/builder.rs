//! Turning a patch struct into a [`PatchDocument`]
//!
//! Field enumeration is done by serde's derive, generated per type at compile
//! time. The `skip_serializing_if` attribute on each [`Field`](crate::Field)
//! is what drops unset fields; `construct` only checks that the result is a
//! JSON object and wraps it.

use crate::document::PatchDocument;
use crate::error::SerializationError;
use crate::finite::ensure_finite;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// A struct of [`Field`](crate::Field)s that can be sent as a merge patch
///
/// Implemented by [`merge_patch!`](crate::merge_patch). Hand-written
/// implementations must mark every field
/// `#[serde(default, skip_serializing_if = "Field::is_unset")]`.
pub trait MergePatch: Serialize {
    /// Build the patch document for the fields set so far
    fn to_patch_document(&self) -> Result<PatchDocument, SerializationError> {
        construct(self)
    }
}

/// Build the minimal merge patch document for `representation`
///
/// The result holds exactly the fields that were set, by value or to null,
/// under their wire names. Nested values are copied whole. Nothing is
/// validated beyond JSON encodability.
///
/// # Errors
///
/// [`SerializationError`] if a populated value cannot be encoded as JSON
/// (NaN and infinite floats included), or if the representation does not
/// encode as a JSON object. No partial document is produced.
pub fn construct<P: MergePatch + ?Sized>(
    representation: &P,
) -> Result<PatchDocument, SerializationError> {
    ensure_finite(representation)?;
    match serde_json::to_value(representation)? {
        Value::Object(map) => {
            debug!(fields = map.len(), "constructed merge patch document");
            Ok(PatchDocument::from_map(map))
        }
        other => Err(SerializationError::custom(format_args!(
            "merge patch must encode as a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Declare a patch struct
///
/// Every field type `T` is wrapped in [`Field<T>`](crate::Field) and tagged so
/// that unset fields are omitted from the patch and missing keys deserialize
/// as unset. The struct gets `Serialize`, `Deserialize`, and
/// [`MergePatch`]. Other attributes, `#[serde(rename = "...")]` on fields
/// included, pass through.
///
/// ```rust
/// use partnersell_patch::{Field, MergePatch, merge_patch};
///
/// merge_patch! {
///     #[derive(Debug, Default)]
///     pub struct PlanPatch {
///         pub label: String,
///         #[serde(rename = "priceCents")]
///         pub price_cents: u64,
///     }
/// }
///
/// let patch = PlanPatch { price_cents: Field::Value(0), ..Default::default() };
/// assert_eq!(patch.to_patch_document()?.to_string(), r#"{"priceCents":0}"#);
/// # Ok::<(), partnersell_patch::SerializationError>(())
/// ```
#[macro_export]
macro_rules! merge_patch {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            ::partnersell_patch::__private::serde::Serialize,
            ::partnersell_patch::__private::serde::Deserialize
        )]
        #[serde(crate = "::partnersell_patch::__private::serde")]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                #[serde(default, skip_serializing_if = "::partnersell_patch::Field::is_unset")]
                $field_vis $field: ::partnersell_patch::Field<$ty>,
            )*
        }

        impl ::partnersell_patch::MergePatch for $name {}
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Field;
    use proptest::prelude::*;
    use serde::Serializer;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
    struct Contact {
        name: String,
        email: String,
    }

    crate::merge_patch! {
        #[derive(Debug, Clone, Default)]
        struct CompanyPatch {
            name: String,
            contact: Contact,
            default_catalog_id: String,
            provider_access_group: String,
            tags: Vec<String>,
        }
    }

    /// A value with no JSON representation
    #[derive(Debug, Clone)]
    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("value refers back to itself"))
        }
    }

    crate::merge_patch! {
        #[derive(Debug, Default)]
        struct FragilePatch {
            name: String,
            payload: Unencodable,
            labels: BTreeMap<(u8, u8), String>,
        }
    }

    impl<'de> serde::Deserialize<'de> for Unencodable {
        fn deserialize<D: serde::Deserializer<'de>>(_deserializer: D) -> Result<Self, D::Error> {
            Ok(Self)
        }
    }

    #[test]
    fn test_only_populated_fields_are_emitted() {
        let patch = CompanyPatch {
            name: Field::Value("Acme".to_string()),
            contact: Field::Value(Contact {
                name: "Company Representative".to_string(),
                email: "companyrep@email.com".to_string(),
            }),
            ..Default::default()
        };

        let doc = construct(&patch).unwrap();

        assert_eq!(
            doc.into_value(),
            json!({
                "name": "Acme",
                "contact": {"name": "Company Representative", "email": "companyrep@email.com"}
            })
        );
    }

    #[test]
    fn test_explicit_null_is_kept() {
        let patch = CompanyPatch {
            provider_access_group: Field::Null,
            ..Default::default()
        };

        let doc = patch.to_patch_document().unwrap();

        assert_eq!(doc.into_value(), json!({"provider_access_group": null}));
    }

    #[test]
    fn test_untouched_patch_is_empty_object() {
        let doc = CompanyPatch::default().to_patch_document().unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.to_string(), "{}");
    }

    #[test]
    fn test_nested_values_are_copied_whole() {
        let patch = CompanyPatch {
            tags: Field::Value(vec![]),
            ..Default::default()
        };

        let doc = patch.to_patch_document().unwrap();

        assert_eq!(doc.get("tags"), Some(&json!([])));
    }

    #[test]
    fn test_failing_value_is_serialization_error() {
        let patch = FragilePatch {
            name: Field::Value("Acme".to_string()),
            payload: Field::Value(Unencodable),
            ..Default::default()
        };

        let err = construct(&patch).unwrap_err();
        assert!(err.to_string().contains("refers back to itself"));
    }

    crate::merge_patch! {
        #[derive(Debug, Default)]
        struct PricePatch {
            price: f64,
            discounts: Vec<f32>,
        }
    }

    #[test]
    fn test_nan_price_is_serialization_error() {
        let patch = PricePatch {
            price: Field::Value(f64::NAN),
            ..Default::default()
        };

        let err = construct(&patch).unwrap_err();
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn test_infinite_float_in_list_is_serialization_error() {
        let patch = PricePatch {
            discounts: Field::Value(vec![0.1, f32::NEG_INFINITY]),
            ..Default::default()
        };

        assert!(construct(&patch).is_err());
    }

    #[test]
    fn test_finite_price_and_null_are_kept() {
        let patch = PricePatch {
            price: Field::Value(19.5),
            discounts: Field::Null,
        };

        assert_eq!(
            construct(&patch).unwrap().into_value(),
            json!({"price": 19.5, "discounts": null})
        );
    }

    #[test]
    fn test_non_string_map_keys_are_serialization_error() {
        let patch = FragilePatch {
            labels: Field::Value(BTreeMap::from([((1, 2), "x".to_string())])),
            ..Default::default()
        };

        assert!(construct(&patch).is_err());
    }

    #[test]
    fn test_unencodable_field_left_unset_is_fine() {
        let patch = FragilePatch {
            name: Field::Value("Acme".to_string()),
            ..Default::default()
        };

        assert_eq!(construct(&patch).unwrap().into_value(), json!({"name": "Acme"}));
    }

    #[test]
    fn test_non_object_representation_is_rejected() {
        #[derive(Serialize)]
        struct Bare(u32);
        impl MergePatch for Bare {}

        let err = construct(&Bare(7)).unwrap_err();
        assert!(err.to_string().contains("got a number"));
    }

    #[test]
    fn test_patch_deserializes_back() {
        let patch: CompanyPatch =
            serde_json::from_value(json!({"name": "Acme", "default_catalog_id": null})).unwrap();

        assert_eq!(patch.name, Field::Value("Acme".to_string()));
        assert_eq!(patch.default_catalog_id, Field::Null);
        assert!(patch.contact.is_unset());
    }

    fn field_strategy() -> impl Strategy<Value = Field<String>> {
        prop_oneof![
            Just(Field::<String>::Unset),
            Just(Field::<String>::Null),
            ".{0,12}".prop_map(Field::Value),
        ]
    }

    fn tags_strategy() -> impl Strategy<Value = Field<Vec<String>>> {
        prop_oneof![
            Just(Field::<Vec<String>>::Unset),
            Just(Field::<Vec<String>>::Null),
            prop::collection::vec("[a-z]{0,6}", 0..4).prop_map(Field::Value),
        ]
    }

    fn company_patch_strategy() -> impl Strategy<Value = CompanyPatch> {
        (
            field_strategy(),
            field_strategy(),
            field_strategy(),
            tags_strategy(),
        )
            .prop_map(|(name, default_catalog_id, provider_access_group, tags)| {
                CompanyPatch {
                    name,
                    contact: Field::Unset,
                    default_catalog_id,
                    provider_access_group,
                    tags,
                }
            })
    }

    fn expected_entry<T: Serialize>(field: &Field<T>) -> Option<serde_json::Value> {
        match field {
            Field::Unset => None,
            Field::Null => Some(serde_json::Value::Null),
            Field::Value(v) => Some(serde_json::to_value(v).unwrap()),
        }
    }

    proptest! {
        #[test]
        fn prop_document_holds_exactly_the_set_fields(patch in company_patch_strategy()) {
            let doc = construct(&patch).unwrap();

            let expected = [
                ("name", expected_entry(&patch.name)),
                ("contact", expected_entry(&patch.contact)),
                ("default_catalog_id", expected_entry(&patch.default_catalog_id)),
                ("provider_access_group", expected_entry(&patch.provider_access_group)),
                ("tags", expected_entry(&patch.tags)),
            ];

            for (key, entry) in &expected {
                prop_assert_eq!(doc.get(key), entry.as_ref(), "key {}", key);
            }
            let set_count = expected.iter().filter(|(_, e)| e.is_some()).count();
            prop_assert_eq!(doc.len(), set_count);
        }

        #[test]
        fn prop_construct_is_idempotent(patch in company_patch_strategy()) {
            let first = construct(&patch).unwrap().to_vec().unwrap();
            let second = construct(&patch).unwrap().to_vec().unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
