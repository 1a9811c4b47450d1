//! Field classification and custom-field history.
//!
//! A complete record is split into standard fields, which map onto a fixed
//! schema, and custom fields, whose presence can change at any time on the
//! NetSuite side. Custom fields are persisted as envelopes so that a field
//! removed upstream is flagged rather than lost.

mod known;
mod merge;

pub use known::KnownFieldSet;
pub use merge::{
    custom_fields_from_json, merge, simple_values, CustomFieldEnvelope, CustomFieldMap,
};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::types::Record;

/// Name prefixes NetSuite uses for custom fields.
pub const CUSTOM_FIELD_PREFIXES: &[&str] = &[
    "custentity",
    "custbody",
    "custcol",
    "custitem",
    "custrecord",
    "custevent",
];

/// Response metadata that is neither a standard nor a custom field.
const METADATA_KEYS: &[&str] = &["links"];

pub fn is_custom_field_name(name: &str) -> bool {
    CUSTOM_FIELD_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Normalize a reference object (`{"id": "1", "refName": "USD"}`) to its
/// display name, falling back to the id. Other values are returned as-is.
pub fn normalize_reference(value: &Value) -> Value {
    let Value::Object(obj) = value else {
        return value.clone();
    };

    let is_reference = (obj.contains_key("id") || obj.contains_key("refName"))
        && obj
            .keys()
            .all(|k| matches!(k.as_str(), "id" | "refName" | "links"));
    if !is_reference {
        return value.clone();
    }

    match (obj.get("refName"), obj.get("id")) {
        (Some(name), _) if !name.is_null() => name.clone(),
        (_, Some(id)) => id.clone(),
        _ => Value::Null,
    }
}

/// A record split into standard and custom fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitRecord {
    pub known_fields: Map<String, Value>,
    pub custom_fields: Map<String, Value>,
}

/// Split a complete record. Custom-prefixed names are always custom; other
/// names are standard when they are in `known`.
pub fn split(record: &Record, known: &KnownFieldSet) -> SplitRecord {
    let mut split = SplitRecord::default();

    for (name, value) in record {
        if METADATA_KEYS.contains(&name.as_str()) {
            continue;
        }

        let value = normalize_reference(value);
        if !is_custom_field_name(name) && known.contains(name) {
            split.known_fields.insert(name.clone(), value);
        } else {
            split.custom_fields.insert(name.clone(), value);
        }
    }

    split
}

/// A record ready for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    pub id: Option<String>,
    pub known_fields: Map<String, Value>,
    pub custom_fields: CustomFieldMap,
    /// The record as fetched.
    pub raw: Record,
}

/// Splits records for one record type and merges their custom fields.
#[derive(Debug, Clone)]
pub struct FieldClassifier {
    known: KnownFieldSet,
}

impl FieldClassifier {
    pub fn new(known: KnownFieldSet) -> Self {
        Self { known }
    }

    pub fn for_record_type(record_type: &str) -> Self {
        Self::new(KnownFieldSet::for_record_type(record_type))
    }

    pub fn known_fields(&self) -> &KnownFieldSet {
        &self.known
    }

    pub fn split(&self, record: &Record) -> SplitRecord {
        split(record, &self.known)
    }

    /// Split `record` and merge its custom fields into `existing`.
    pub fn classify(
        &self,
        record: Record,
        existing: &CustomFieldMap,
        now: DateTime<Utc>,
    ) -> ClassifiedRecord {
        let SplitRecord {
            known_fields,
            custom_fields,
        } = self.split(&record);

        ClassifiedRecord {
            id: record_id(&record),
            known_fields,
            custom_fields: merge(existing, &custom_fields, now),
            raw: record,
        }
    }
}

/// The record's `id`, as a string.
pub fn record_id(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
