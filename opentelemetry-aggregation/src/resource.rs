use std::{borrow::Cow, sync::Arc};

use opentelemetry::{Key, KeyValue, Value};

use crate::AttributeSet;

/// This structure is designed to be shared among `Resource` instances via `Arc`.
#[derive(Debug, PartialEq)]
struct ResourceInner {
    attrs: AttributeSet,
    schema_url: Option<Cow<'static, str>>,
}

/// An immutable representation of the entity producing telemetry as attributes.
///
/// Resource detection is not the business of this crate. The resource is
/// carried through collection untouched and attached to every
/// [`MetricData`](crate::data::MetricData) produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

impl Default for Resource {
    fn default() -> Self {
        Resource::empty()
    }
}

impl Resource {
    /// Creates an empty resource.
    pub fn empty() -> Self {
        Resource::from_schema_url(Vec::new(), "")
    }

    /// Create a new `Resource` from key value pairs.
    ///
    /// Values are de-duplicated by key, and the last key-value pair will be retained
    pub fn new<T: IntoIterator<Item = KeyValue>>(kvs: T) -> Self {
        Resource::from_schema_url(kvs, "")
    }

    /// Create a new `Resource` from key value pairs and a schema URL.
    ///
    /// An empty schema URL is treated as no schema URL.
    pub fn from_schema_url<KV, S>(kvs: KV, schema_url: S) -> Self
    where
        KV: IntoIterator<Item = KeyValue>,
        S: Into<Cow<'static, str>>,
    {
        let kvs: Vec<KeyValue> = kvs.into_iter().collect();
        let schema_url = Some(schema_url.into()).filter(|s| !s.is_empty());
        Resource {
            inner: Arc::new(ResourceInner {
                attrs: AttributeSet::from(&kvs[..]),
                schema_url,
            }),
        }
    }

    /// Schema url of the resource, if any.
    pub fn schema_url(&self) -> Option<&str> {
        self.inner.schema_url.as_deref()
    }

    /// Returns the number of attributes for this resource
    pub fn len(&self) -> usize {
        self.inner.attrs.len()
    }

    /// Returns `true` if the resource contains no attributes.
    pub fn is_empty(&self) -> bool {
        self.inner.attrs.is_empty()
    }

    /// Gets an iterator over the attributes of this resource.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.inner.attrs.iter()
    }

    /// Retrieve the value from resource associate with given key.
    pub fn get(&self, key: &Key) -> Option<Value> {
        self.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    }
}
