//! Adapter over loosely-typed JSON values.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use lattice_adapters_core::logging::targets;

use super::array_adapter::{ArrayAdapter, PredicateSlot};
use super::config::AdapterConfig;
use super::filter::{Filter, FilterStrategy};
use super::json_dispatch::{JsonDispatch, JsonKind, JsonPredicates};
use super::renderer::ItemRenderer;
use super::signals::AdapterSignals;
use crate::error::{AdapterError, AdapterResult};

impl FilterStrategy<Vec<Arc<Value>>> for PredicateSlot<Arc<JsonDispatch>> {
    fn perform(&self, source: Vec<Arc<Value>>, constraint: &str) -> Vec<Arc<Value>> {
        let dispatch = self.get().unwrap_or_default();
        let mut missed = HashSet::new();
        source
            .into_iter()
            .filter(|value| match dispatch.predicate_for(value) {
                Some(predicate) => predicate(&**value, constraint),
                None => {
                    let kind = JsonKind::of(value);
                    if missed.insert(kind) {
                        warn!(target: targets::FILTER, %kind, constraint, "no predicate for kind, keeping items");
                    }
                    true
                }
            })
            .collect()
    }
}

/// A thread-safe, filterable list of JSON values.
///
/// Filtering dispatches on each value's runtime kind through a resolved
/// [`JsonPredicates`] table. Typed getters fail with
/// [`AdapterError::TypeMismatch`] instead of coercing.
///
/// # Example
///
/// ```
/// use lattice_adapters::adapter::{AdapterConfig, JsonArrayAdapter, JsonPredicates};
///
/// let adapter = JsonArrayAdapter::parse(r#"[3, "three", 30, true]"#, AdapterConfig::inline())
///     .unwrap()
///     .with_predicates(
///         JsonPredicates::new()
///             .on_number(|n, c| n.to_string().starts_with(c))
///             .on_string(|s, c| s.starts_with(c))
///             .on_bool(|_, _| false),
///     );
///
/// adapter.filter().filter("3");
/// assert_eq!(adapter.len(), 2);
/// assert_eq!(adapter.get_i32(1).unwrap(), 30);
/// ```
pub struct JsonArrayAdapter {
    inner: ArrayAdapter<Value>,
    dispatch: Arc<PredicateSlot<Arc<JsonDispatch>>>,
}

impl JsonArrayAdapter {
    /// Creates an empty adapter with the default configuration.
    pub fn new() -> Self {
        Self::from_values(std::iter::empty(), AdapterConfig::default())
    }

    /// Creates an adapter over `values`.
    pub fn from_values(values: impl IntoIterator<Item = Value>, config: AdapterConfig) -> Self {
        let dispatch: Arc<PredicateSlot<Arc<JsonDispatch>>> = Arc::new(PredicateSlot::new(None));
        let inner = ArrayAdapter::with_strategy(values, config, dispatch.clone());
        Self { inner, dispatch }
    }

    /// Creates an adapter over the elements of a JSON array.
    pub fn from_json_array(array: Value, config: AdapterConfig) -> AdapterResult<Self> {
        match array {
            Value::Array(values) => Ok(Self::from_values(values, config)),
            other => Err(AdapterError::TypeMismatch {
                index: 0,
                expected: JsonKind::Array,
                found: JsonKind::of(&other),
            }),
        }
    }

    /// Parses `json`, which must be an array.
    pub fn parse(json: &str, config: AdapterConfig) -> AdapterResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_array(value, config)
    }

    /// Resolves and installs filter predicates.
    pub fn with_predicates(self, predicates: JsonPredicates) -> Self {
        self.set_predicates(predicates);
        self
    }

    /// Resolves and installs filter predicates. Takes effect on the next pass.
    pub fn set_predicates(&self, predicates: JsonPredicates) {
        self.dispatch.set(Arc::new(predicates.resolve()));
    }

    /// The filter handle.
    pub fn filter(&self) -> &Filter<Vec<Arc<Value>>> {
        self.inner.filter()
    }

    /// The change signals.
    pub fn signals(&self) -> &AdapterSignals {
        self.inner.signals()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of visible values.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no values are visible.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The visible value at `position`.
    pub fn get(&self, position: usize) -> AdapterResult<Arc<Value>> {
        self.inner.get(position)
    }

    /// Position-derived identifier; JSON values carry no stable id.
    pub fn item_id(&self, position: usize) -> AdapterResult<u64> {
        self.inner.item_id(position)
    }

    /// Kind of the visible value at `position`.
    pub fn kind_at(&self, position: usize) -> AdapterResult<JsonKind> {
        Ok(JsonKind::of(&*self.get(position)?))
    }

    fn typed<R>(
        &self,
        position: usize,
        expected: JsonKind,
        read: impl FnOnce(&Value) -> Option<R>,
    ) -> AdapterResult<R> {
        let value = self.get(position)?;
        read(&*value).ok_or_else(|| AdapterError::TypeMismatch {
            index: position,
            expected,
            found: JsonKind::of(&value),
        })
    }

    /// Boolean at `position`.
    pub fn get_bool(&self, position: usize) -> AdapterResult<bool> {
        self.typed(position, JsonKind::Bool, Value::as_bool)
    }

    /// Integer at `position`; fails for values outside `i32`.
    pub fn get_i32(&self, position: usize) -> AdapterResult<i32> {
        self.typed(position, JsonKind::Int, |v| {
            v.as_i64().and_then(|n| i32::try_from(n).ok())
        })
    }

    /// Integer at `position`.
    pub fn get_i64(&self, position: usize) -> AdapterResult<i64> {
        self.typed(position, JsonKind::Long, Value::as_i64)
    }

    /// Any number at `position`.
    pub fn get_f64(&self, position: usize) -> AdapterResult<f64> {
        self.typed(position, JsonKind::Double, Value::as_f64)
    }

    /// String at `position`.
    pub fn get_str(&self, position: usize) -> AdapterResult<String> {
        self.typed(position, JsonKind::String, |v| v.as_str().map(str::to_owned))
    }

    /// Object at `position`.
    pub fn get_object(&self, position: usize) -> AdapterResult<Map<String, Value>> {
        self.typed(position, JsonKind::Object, |v| v.as_object().cloned())
    }

    /// Array at `position`.
    pub fn get_array(&self, position: usize) -> AdapterResult<Vec<Value>> {
        self.typed(position, JsonKind::Array, |v| v.as_array().cloned())
    }

    /// Whether the full collection contains `value`.
    pub fn contains(&self, value: &Value) -> bool {
        self.inner.contains(value)
    }

    /// Whether the full collection contains every value of `values`.
    pub fn contains_all(&self, values: &[Value]) -> bool {
        self.inner.contains_all(values)
    }

    /// Visible position of the first value equal to `value`.
    pub fn position_of(&self, value: &Value) -> Option<usize> {
        self.inner.position_of(value)
    }

    /// The visible values.
    pub fn visible_items(&self) -> Vec<Arc<Value>> {
        self.inner.visible_items()
    }

    /// Every value as one JSON array, ignoring the active filter.
    pub fn to_json(&self) -> Value {
        Value::Array(self.inner.all_items().iter().map(|v| Value::clone(v)).collect())
    }

    /// Renders the visible value at `position`.
    pub fn render<R: ItemRenderer<Value>>(&self, position: usize, renderer: &R) -> AdapterResult<R::View> {
        self.inner.render(position, renderer)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Appends a value.
    pub fn add(&self, value: Value) {
        self.inner.add(value);
    }

    /// Appends several values.
    pub fn add_all(&self, values: impl IntoIterator<Item = Value>) -> bool {
        self.inner.add_all(values)
    }

    /// Inserts a value at `position` of the full collection.
    pub fn insert(&self, position: usize, value: Value) -> AdapterResult<()> {
        self.inner.insert(position, value)
    }

    /// Inserts several values at `position` of the full collection.
    pub fn insert_all(&self, position: usize, values: impl IntoIterator<Item = Value>) -> AdapterResult<bool> {
        self.inner.insert_all(position, values)
    }

    /// Removes the first value equal to `value`.
    pub fn remove(&self, value: &Value) -> bool {
        self.inner.remove(value)
    }

    /// Removes every value equal to one of `values`.
    pub fn remove_all(&self, values: &[Value]) -> bool {
        self.inner.remove_all(values)
    }

    /// Keeps only values equal to one of `values`.
    pub fn retain_all(&self, values: &[Value]) -> bool {
        self.inner.retain_all(values)
    }

    /// Removes the visible value at `position`.
    pub fn remove_at(&self, position: usize) -> AdapterResult<Arc<Value>> {
        self.inner.remove_at(position)
    }

    /// Replaces the visible value at `position`.
    pub fn update(&self, position: usize, value: Value) -> AdapterResult<Arc<Value>> {
        self.inner.update(position, value)
    }

    /// Removes every value.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Replaces the whole collection.
    pub fn replace_all(&self, values: impl IntoIterator<Item = Value>) {
        self.inner.replace_all(values);
    }

    /// Sorts the full collection with `compare`.
    pub fn sort_by<F>(&self, compare: F)
    where
        F: Fn(&Value, &Value) -> Ordering,
    {
        self.inner.sort_by(compare);
    }

    /// Sorts by natural order.
    ///
    /// Works when every value is a boolean, every value is a number, or every
    /// value is a string. Anything else fails with
    /// [`AdapterError::NotComparable`] and leaves the order untouched.
    pub fn sort(&self) -> AdapterResult<()> {
        self.inner.try_sort_with(natural_order)
    }

    /// Sets the notify flag. Re-enabling it emits `data_changed` immediately.
    pub fn set_notify_on_change(&self, notify: bool) {
        self.inner.set_notify_on_change(notify);
    }

    /// Emits `data_changed` and re-enables automatic notification.
    pub fn notify_data_set_changed(&self) {
        self.inner.notify_data_set_changed();
    }
}

type Comparator = fn(&Value, &Value) -> Ordering;

fn natural_order(values: &[Arc<Value>]) -> AdapterResult<Comparator> {
    let Some(first) = values.first() else {
        return Ok(|_, _| Ordering::Equal);
    };
    let first_kind = JsonKind::of(first);
    let same_class = |kind: JsonKind| kind == first_kind || (kind.is_number() && first_kind.is_number());

    if let Some(odd) = values.iter().map(|v| JsonKind::of(v)).find(|k| !same_class(*k)) {
        return Err(AdapterError::NotComparable(format!(
            "mixed {first_kind} and {odd} values"
        )));
    }

    match first_kind {
        JsonKind::Bool => Ok(|a, b| a.as_bool().cmp(&b.as_bool())),
        JsonKind::Int | JsonKind::Long | JsonKind::Double => Ok(|a, b| {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        }),
        JsonKind::String => Ok(|a, b| a.as_str().cmp(&b.as_str())),
        other => Err(AdapterError::NotComparable(format!(
            "{other} values have no natural order"
        ))),
    }
}

impl Default for JsonArrayAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonArrayAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonArrayAdapter")
            .field("len", &self.len())
            .field("dispatch", &self.dispatch.get())
            .finish()
    }
}

static_assertions::assert_impl_all!(JsonArrayAdapter: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mixed() -> JsonArrayAdapter {
        JsonArrayAdapter::from_values(
            [json!(7), json!(8_000_000_000_i64), json!(2.5), json!("seven"), json!(true), json!({"n": 7})],
            AdapterConfig::inline(),
        )
    }

    #[test]
    fn test_typed_getters() {
        let adapter = mixed();
        assert_eq!(adapter.get_i32(0).unwrap(), 7);
        assert_eq!(adapter.get_i64(0).unwrap(), 7);
        assert_eq!(adapter.get_i64(1).unwrap(), 8_000_000_000);
        assert_eq!(adapter.get_f64(2).unwrap(), 2.5);
        assert_eq!(adapter.get_str(3).unwrap(), "seven");
        assert!(adapter.get_bool(4).unwrap());
        assert_eq!(adapter.get_object(5).unwrap()["n"], json!(7));
        assert_eq!(adapter.kind_at(1).unwrap(), JsonKind::Long);
    }

    #[test]
    fn test_wrong_kind_is_type_mismatch() {
        let adapter = mixed();
        match adapter.get_i32(1) {
            Err(AdapterError::TypeMismatch { index, expected, found }) => {
                assert_eq!(index, 1);
                assert_eq!(expected, JsonKind::Int);
                assert_eq!(found, JsonKind::Long);
            }
            other => panic!("expected a type mismatch, got {other:?}"),
        }
        assert!(matches!(adapter.get_str(0), Err(AdapterError::TypeMismatch { .. })));
        assert!(matches!(adapter.get_array(0), Err(AdapterError::TypeMismatch { .. })));
        assert!(matches!(adapter.get_bool(99), Err(AdapterError::IndexOutOfBounds { .. })));
    }

    #[test]
    fn test_parse_requires_array() {
        assert!(JsonArrayAdapter::parse("[1, 2]", AdapterConfig::inline()).is_ok());
        assert!(matches!(
            JsonArrayAdapter::parse(r#"{"a": 1}"#, AdapterConfig::inline()),
            Err(AdapterError::TypeMismatch { expected: JsonKind::Array, .. })
        ));
        assert!(matches!(
            JsonArrayAdapter::parse("[1,", AdapterConfig::inline()),
            Err(AdapterError::Json(_))
        ));
    }

    #[test]
    fn test_dispatch_filter_keeps_unmatched_kinds() {
        let adapter = mixed().with_predicates(
            JsonPredicates::new()
                .on_int(|n, c| n.to_string() == c)
                .on_string(|s, c| s.starts_with(c)),
        );

        adapter.filter().filter("7");
        // 7 matches; long, double, bool and object have no predicate and are kept.
        assert_eq!(adapter.len(), 5);
        assert_eq!(adapter.position_of(&json!("seven")), None);
    }

    /// Collects the `kind` field of every warning on the filter target.
    #[derive(Clone, Default)]
    struct MissedKinds(Arc<parking_lot::Mutex<Vec<String>>>);

    struct KindField(Option<String>);

    impl tracing::field::Visit for KindField {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
            if field.name() == "kind" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for MissedKinds {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            let meta = event.metadata();
            if *meta.level() == tracing::Level::WARN && meta.target() == targets::FILTER {
                let mut kind = KindField(None);
                event.record(&mut kind);
                if let Some(kind) = kind.0 {
                    self.0.lock().push(kind);
                }
            }
        }
    }

    #[test]
    fn test_dispatch_miss_warns_once_per_kind_per_pass() {
        use tracing_subscriber::layer::SubscriberExt;

        let adapter = JsonArrayAdapter::from_values(
            [
                json!("apple"),
                json!({"a": 1}),
                json!({"b": 2}),
                json!([1]),
                json!([2]),
                json!(2.5),
                json!(3.5),
                json!("banana"),
            ],
            AdapterConfig::inline(),
        )
        .with_predicates(JsonPredicates::new().on_string(|s, c| s.starts_with(c)));

        let missed = MissedKinds::default();
        let subscriber = tracing_subscriber::registry().with(missed.clone());
        tracing::subscriber::with_default(subscriber, || {
            adapter.filter().filter("a");
            let mut first: Vec<String> = missed.0.lock().clone();
            first.sort();
            assert_eq!(first, ["array", "number", "object"]);

            adapter.filter().filter("b");
            assert_eq!(missed.0.lock().len(), 6);
        });

        // Unmatched kinds are kept; only "apple" fails the last constraint.
        assert_eq!(adapter.len(), 7);
        assert_eq!(adapter.position_of(&json!("apple")), None);
    }

    #[test]
    fn test_custom_tag_filter() {
        let adapter = JsonArrayAdapter::from_values(
            [json!({"kind": "fruit", "name": "apple"}), json!({"kind": "fruit", "name": "pear"}), json!({"id": 1})],
            AdapterConfig::inline(),
        )
        .with_predicates(
            JsonPredicates::new()
                .on_object(|_, _| false)
                .classify_with(|v| v["kind"].as_str().map(str::to_owned))
                .on_custom("fruit", |v, c| v["name"].as_str().is_some_and(|n| n.contains(c))),
        );

        adapter.filter().filter("ea");
        assert_eq!(adapter.len(), 1);
        assert_eq!(adapter.get_object(0).unwrap()["name"], json!("pear"));
    }

    #[test]
    fn test_natural_sort() {
        let numbers = JsonArrayAdapter::from_values([json!(3), json!(1.5), json!(8_000_000_000_i64), json!(-2)], AdapterConfig::inline());
        numbers.sort().unwrap();
        assert_eq!(numbers.to_json(), json!([-2, 1.5, 3, 8_000_000_000_i64]));

        let words = JsonArrayAdapter::from_values([json!("b"), json!("a")], AdapterConfig::inline());
        words.sort().unwrap();
        assert_eq!(words.get_str(0).unwrap(), "a");
    }

    #[test]
    fn test_natural_sort_rejects_mixed() {
        let adapter = mixed();
        let before = adapter.to_json();
        assert!(matches!(adapter.sort(), Err(AdapterError::NotComparable(_))));
        assert_eq!(adapter.to_json(), before);

        let objects = JsonArrayAdapter::from_values([json!({}), json!({})], AdapterConfig::inline());
        assert!(matches!(objects.sort(), Err(AdapterError::NotComparable(_))));
    }

    #[test]
    fn test_value_equality_mutations() {
        let adapter = mixed();
        assert!(adapter.remove(&json!("seven")));
        assert!(!adapter.remove(&json!("seven")));
        assert!(adapter.contains(&json!(2.5)));
        assert!(adapter.retain_all(&[json!(7), json!(true)]));
        assert_eq!(adapter.to_json(), json!([7, true]));
    }
}
