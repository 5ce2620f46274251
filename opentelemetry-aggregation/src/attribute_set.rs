use std::{
    cmp::Ordering,
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
};

use opentelemetry::{Key, KeyValue, Value};

/// A unique set of attributes identifying one time series.
///
/// Attributes are sorted by key and de-duplicated, the last value recorded
/// for a key wins. The hash is computed once on construction so the set can
/// be used as a `HashMap` key on the measurement path cheaply.
///
/// Floating point values compare by their bit pattern, which keeps `Eq`
/// reflexive for `NaN` attribute values.
#[derive(Clone, Default)]
pub struct AttributeSet(Vec<KeyValue>, u64);

impl From<&[KeyValue]> for AttributeSet {
    fn from(values: &[KeyValue]) -> Self {
        let mut vec = values.to_vec();
        // stable sort keeps the recording order of duplicate keys
        vec.sort_by(|a, b| a.key.cmp(&b.key));

        // dedup_by keeps the first duplicate, the last one must survive
        let mut i = vec.len();
        while i > 1 {
            i -= 1;
            if vec[i - 1].key == vec[i].key {
                vec.remove(i - 1);
            }
        }

        let hash = calculate_hash(&vec);
        AttributeSet(vec, hash)
    }
}

impl<const N: usize> From<[KeyValue; N]> for AttributeSet {
    fn from(values: [KeyValue; N]) -> Self {
        AttributeSet::from(&values[..])
    }
}

fn calculate_hash(values: &[KeyValue]) -> u64 {
    let mut hasher = DefaultHasher::default();
    for kv in values {
        kv.key.hash(&mut hasher);
        hash_value(&kv.value, &mut hasher);
    }
    hasher.finish()
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Bool(b) => {
            state.write_u8(0);
            b.hash(state);
        }
        Value::I64(i) => {
            state.write_u8(1);
            i.hash(state);
        }
        Value::F64(f) => {
            state.write_u8(2);
            f.to_bits().hash(state);
        }
        Value::String(s) => {
            state.write_u8(3);
            s.as_str().hash(state);
        }
        other => {
            state.write_u8(4);
            other.as_str().hash(state);
        }
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
        _ => a == b,
    }
}

impl AttributeSet {
    /// Iterate over key value pairs in the set
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.0.iter().map(|kv| (&kv.key, &kv.value))
    }

    /// Returns `true` if an attribute with this key is part of the set.
    pub fn contains_key(&self, key: &Key) -> bool {
        self.0.binary_search_by(|kv| kv.key.cmp(key)).is_ok()
    }

    /// The number of attributes in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set holds no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The sorted attributes.
    pub fn as_slice(&self) -> &[KeyValue] {
        &self.0
    }

    /// Consumes the set, returning the sorted attributes.
    pub fn into_vec(self) -> Vec<KeyValue> {
        self.0
    }

    /// A total order over attribute sets, used to emit data points in a
    /// deterministic order.
    pub(crate) fn canonical_cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            let ord = a
                .key
                .cmp(&b.key)
                .then_with(|| a.value.as_str().cmp(&b.value.as_str()));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.1 == other.1
            && self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.key == b.key && value_eq(&a.value, &b.value))
    }
}

impl Eq for AttributeSet {}

impl Hash for AttributeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.1)
    }
}

impl fmt::Debug for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        write!(f, "}}")
    }
}
