//! Custom-field envelopes and the history-preserving merge.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle metadata around one custom field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldEnvelope {
    pub value: Value,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub deprecated: bool,
}

impl CustomFieldEnvelope {
    /// A field seen for the first time at `now`.
    pub fn new(value: Value, now: DateTime<Utc>) -> Self {
        Self {
            value,
            first_seen: now,
            last_seen: now,
            deprecated: false,
        }
    }
}

/// Persisted custom fields keyed by field name.
pub type CustomFieldMap = BTreeMap<String, CustomFieldEnvelope>;

/// Merge freshly fetched custom fields into the persisted envelopes.
///
/// Fields present in `new` take the new value, `last_seen = now` and are
/// not deprecated; `first_seen` is kept from the existing envelope. Fields
/// only in `existing` are copied with `deprecated = true`. No field name is
/// ever dropped.
pub fn merge(
    existing: &CustomFieldMap,
    new: &Map<String, Value>,
    now: DateTime<Utc>,
) -> CustomFieldMap {
    let mut merged = CustomFieldMap::new();

    for (name, value) in new {
        let first_seen = existing
            .get(name)
            .map(|envelope| envelope.first_seen)
            .unwrap_or(now);

        merged.insert(
            name.clone(),
            CustomFieldEnvelope {
                value: value.clone(),
                first_seen,
                last_seen: now,
                deprecated: false,
            },
        );
    }

    for (name, envelope) in existing {
        if !merged.contains_key(name) {
            merged.insert(
                name.clone(),
                CustomFieldEnvelope {
                    deprecated: true,
                    ..envelope.clone()
                },
            );
        }
    }

    merged
}

#[derive(Deserialize)]
struct StoredEnvelope {
    value: Value,
    first_seen: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    deprecated: bool,
}

/// Read a persisted custom-field object.
///
/// Older rows stored plain values instead of envelopes; those are wrapped
/// with `first_seen = last_seen = now`. Missing timestamps on partial
/// envelopes also default to `now`. Anything other than a JSON object reads
/// as an empty map.
pub fn custom_fields_from_json(stored: &Value, now: DateTime<Utc>) -> CustomFieldMap {
    let Value::Object(fields) = stored else {
        return CustomFieldMap::new();
    };

    fields
        .iter()
        .map(|(name, raw)| {
            let envelope = match raw {
                Value::Object(obj) if obj.contains_key("value") => {
                    match serde_json::from_value::<StoredEnvelope>(raw.clone()) {
                        Ok(stored) => CustomFieldEnvelope {
                            value: stored.value,
                            first_seen: stored.first_seen.unwrap_or(now),
                            last_seen: stored.last_seen.unwrap_or(now),
                            deprecated: stored.deprecated,
                        },
                        Err(_) => CustomFieldEnvelope::new(raw.clone(), now),
                    }
                }
                _ => CustomFieldEnvelope::new(raw.clone(), now),
            };
            (name.clone(), envelope)
        })
        .collect()
}

/// Strip envelopes down to `name -> value`.
pub fn simple_values(fields: &CustomFieldMap) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, envelope)| (name.clone(), envelope.value.clone()))
        .collect()
}
