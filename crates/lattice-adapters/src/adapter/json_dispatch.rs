//! Type-directed predicate dispatch for loosely-typed items.
//!
//! Each [`JsonKind`] has a fixed fallback chain over the registration slots
//! ([`PredicateKind`]). The chain is walked once, when a [`JsonPredicates`] is
//! resolved into a [`JsonDispatch`], and the winning predicate per kind is
//! stored in a table. Filtering then costs one table lookup per item.
//!
//! A classifier may tag values with a custom type name. A predicate registered
//! for that exact tag wins over the per-kind table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Runtime kind of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonKind {
    Null,
    Bool,
    /// Integer that fits in `i32`.
    Int,
    /// Integer that needs `i64`.
    Long,
    /// Any other number.
    Double,
    String,
    Array,
    Object,
}

impl JsonKind {
    const COUNT: usize = 8;

    /// Classifies `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(n) => match n.as_i64() {
                Some(i) if i32::try_from(i).is_ok() => JsonKind::Int,
                Some(_) => JsonKind::Long,
                None => JsonKind::Double,
            },
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }

    /// Whether the kind is numeric.
    pub fn is_number(self) -> bool {
        matches!(self, JsonKind::Int | JsonKind::Long | JsonKind::Double)
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Registration slots tried for this kind, most specific first.
    pub fn fallback_chain(self) -> &'static [PredicateKind] {
        use PredicateKind as P;
        match self {
            JsonKind::Bool => &[P::Boolean, P::Object],
            JsonKind::Int => &[P::Integer, P::Long, P::Number, P::Object],
            JsonKind::Long => &[P::Long, P::Number, P::Object],
            JsonKind::Double => &[P::Number, P::Object],
            JsonKind::String => &[P::String, P::Object],
            JsonKind::Null | JsonKind::Array | JsonKind::Object => &[P::Object],
        }
    }

    const ALL: [JsonKind; Self::COUNT] = [
        JsonKind::Null,
        JsonKind::Bool,
        JsonKind::Int,
        JsonKind::Long,
        JsonKind::Double,
        JsonKind::String,
        JsonKind::Array,
        JsonKind::Object,
    ];
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "boolean",
            JsonKind::Int => "integer",
            JsonKind::Long => "long",
            JsonKind::Double => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// Slot a predicate can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    Boolean,
    Integer,
    Long,
    Number,
    String,
    /// Catch-all, receives the raw value.
    Object,
}

/// Predicate over a raw JSON value.
pub type JsonPredicate = Arc<dyn Fn(&Value, &str) -> bool + Send + Sync>;

/// Assigns a custom type tag to a value, if it has one.
pub type TypeClassifier = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Builder for the predicates a [`JsonArrayAdapter`](super::JsonArrayAdapter) filters with.
///
/// # Example
///
/// ```
/// use lattice_adapters::adapter::JsonPredicates;
/// use serde_json::json;
///
/// let dispatch = JsonPredicates::new()
///     .on_long(|n, c| n.to_string().starts_with(c))
///     .on_string(|s, c| s.contains(c))
///     .resolve();
///
/// // Integers fall back to the long predicate.
/// assert!(dispatch.matches(&json!(123), "12"));
/// assert!(dispatch.matches(&json!("abc"), "b"));
/// // No predicate covers objects: the item is kept.
/// assert!(dispatch.matches(&json!({"a": 1}), "zzz"));
/// assert!(dispatch.predicate_for(&json!(true)).is_none());
/// ```
#[derive(Default, Clone)]
pub struct JsonPredicates {
    by_kind: HashMap<PredicateKind, JsonPredicate>,
    custom: HashMap<String, JsonPredicate>,
    classifier: Option<TypeClassifier>,
}

impl JsonPredicates {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a raw predicate for a slot.
    pub fn on_kind<F>(mut self, kind: PredicateKind, predicate: F) -> Self
    where
        F: Fn(&Value, &str) -> bool + Send + Sync + 'static,
    {
        self.by_kind.insert(kind, Arc::new(predicate));
        self
    }

    /// Predicate for booleans.
    pub fn on_bool<F>(self, predicate: F) -> Self
    where
        F: Fn(bool, &str) -> bool + Send + Sync + 'static,
    {
        self.on_kind(PredicateKind::Boolean, move |v, c| {
            v.as_bool().is_some_and(|b| predicate(b, c))
        })
    }

    /// Predicate for integers that fit in `i32`.
    pub fn on_int<F>(self, predicate: F) -> Self
    where
        F: Fn(i32, &str) -> bool + Send + Sync + 'static,
    {
        self.on_kind(PredicateKind::Integer, move |v, c| {
            v.as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .is_some_and(|n| predicate(n, c))
        })
    }

    /// Predicate for integers (also used for `i32` values without an int predicate).
    pub fn on_long<F>(self, predicate: F) -> Self
    where
        F: Fn(i64, &str) -> bool + Send + Sync + 'static,
    {
        self.on_kind(PredicateKind::Long, move |v, c| {
            v.as_i64().is_some_and(|n| predicate(n, c))
        })
    }

    /// Predicate for any number.
    pub fn on_number<F>(self, predicate: F) -> Self
    where
        F: Fn(f64, &str) -> bool + Send + Sync + 'static,
    {
        self.on_kind(PredicateKind::Number, move |v, c| {
            v.as_f64().is_some_and(|n| predicate(n, c))
        })
    }

    /// Predicate for strings.
    pub fn on_string<F>(self, predicate: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.on_kind(PredicateKind::String, move |v, c| {
            v.as_str().is_some_and(|s| predicate(s, c))
        })
    }

    /// Catch-all predicate, used for any kind without a more specific one.
    pub fn on_object<F>(self, predicate: F) -> Self
    where
        F: Fn(&Value, &str) -> bool + Send + Sync + 'static,
    {
        self.on_kind(PredicateKind::Object, predicate)
    }

    /// Predicate for values the classifier tags as `tag`.
    pub fn on_custom<F>(mut self, tag: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value, &str) -> bool + Send + Sync + 'static,
    {
        self.custom.insert(tag.into(), Arc::new(predicate));
        self
    }

    /// Sets the classifier assigning custom type tags.
    pub fn classify_with<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Walks every kind's fallback chain once and freezes the result.
    pub fn resolve(self) -> JsonDispatch {
        let table = JsonKind::ALL.map(|kind| {
            kind.fallback_chain()
                .iter()
                .find_map(|slot| self.by_kind.get(slot).cloned())
        });
        JsonDispatch {
            table,
            custom: self.custom,
            classifier: self.classifier,
        }
    }
}

impl fmt::Debug for JsonPredicates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonPredicates")
            .field("kinds", &self.by_kind.keys().collect::<Vec<_>>())
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .field("classifier", &self.classifier.is_some())
            .finish()
    }
}

/// Resolved kind-to-predicate bindings.
#[derive(Clone, Default)]
pub struct JsonDispatch {
    table: [Option<JsonPredicate>; JsonKind::COUNT],
    custom: HashMap<String, JsonPredicate>,
    classifier: Option<TypeClassifier>,
}

impl JsonDispatch {
    /// The predicate that applies to `value`, if any.
    pub fn predicate_for(&self, value: &Value) -> Option<&JsonPredicate> {
        if let Some(classifier) = &self.classifier
            && let Some(tag) = classifier(value)
            && let Some(predicate) = self.custom.get(&tag)
        {
            return Some(predicate);
        }
        self.table[JsonKind::of(value).index()].as_ref()
    }

    /// Whether `value` passes. Values without an applicable predicate pass.
    pub fn matches(&self, value: &Value, constraint: &str) -> bool {
        self.predicate_for(value)
            .is_none_or(|predicate| predicate(value, constraint))
    }

    /// Whether no predicate at all is registered.
    pub fn is_empty(&self) -> bool {
        self.table.iter().all(Option::is_none) && self.custom.is_empty()
    }
}

impl fmt::Debug for JsonDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound: Vec<JsonKind> = JsonKind::ALL
            .into_iter()
            .filter(|kind| self.table[kind.index()].is_some())
            .collect();
        f.debug_struct("JsonDispatch")
            .field("bound", &bound)
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_of() {
        assert_eq!(JsonKind::of(&json!(null)), JsonKind::Null);
        assert_eq!(JsonKind::of(&json!(true)), JsonKind::Bool);
        assert_eq!(JsonKind::of(&json!(7)), JsonKind::Int);
        assert_eq!(JsonKind::of(&json!(8_000_000_000_i64)), JsonKind::Long);
        assert_eq!(JsonKind::of(&json!(1.5)), JsonKind::Double);
        assert_eq!(JsonKind::of(&json!(u64::MAX)), JsonKind::Double);
        assert_eq!(JsonKind::of(&json!("x")), JsonKind::String);
        assert_eq!(JsonKind::of(&json!([1])), JsonKind::Array);
        assert_eq!(JsonKind::of(&json!({})), JsonKind::Object);
    }

    #[test]
    fn test_most_specific_predicate_wins() {
        let dispatch = JsonPredicates::new()
            .on_int(|_, _| true)
            .on_number(|_, _| false)
            .resolve();

        assert!(dispatch.matches(&json!(5), "x"));
        assert!(!dispatch.matches(&json!(8_000_000_000_i64), "x"));
        assert!(!dispatch.matches(&json!(2.5), "x"));
    }

    #[test]
    fn test_object_is_last_resort() {
        let dispatch = JsonPredicates::new()
            .on_object(|v, c| v.to_string().contains(c))
            .resolve();

        assert!(dispatch.matches(&json!(true), "true"));
        assert!(!dispatch.matches(&json!("abc"), "z"));
        assert!(dispatch.predicate_for(&json!(null)).is_some());
    }

    #[test]
    fn test_custom_tag_takes_precedence() {
        let dispatch = JsonPredicates::new()
            .on_object(|_, _| false)
            .on_custom("person", |v, c| v["name"].as_str().is_some_and(|n| n.starts_with(c)))
            .classify_with(|v| v.get("name").map(|_| "person".to_string()))
            .resolve();

        assert!(dispatch.matches(&json!({"name": "Ada"}), "A"));
        assert!(!dispatch.matches(&json!({"title": "Ada"}), "A"));
    }

    #[test]
    fn test_unregistered_kind_passes() {
        let dispatch = JsonPredicates::new().on_string(|_, _| false).resolve();
        assert!(dispatch.matches(&json!(1), "x"));
        assert!(!dispatch.matches(&json!("s"), "x"));
        assert!(!dispatch.is_empty());
        assert!(JsonPredicates::new().resolve().is_empty());
    }
}
