use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Identifies one cached query: the resource collection plus an optional
/// parameter string (an item id, a report name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: String,
    pub params: Option<String>,
}

impl QueryKey {
    pub fn collection(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
            params: None,
        }
    }

    pub fn item(resource: &str, params: impl ToString) -> Self {
        Self {
            resource: resource.to_string(),
            params: Some(params.to_string()),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.params {
            Some(p) => write!(f, "{}[{}]", self.resource, p),
            None => write!(f, "{}", self.resource),
        }
    }
}

#[async_trait]
pub trait Cache<K, V>: Send + Sync {
    async fn get(&self, key: &K) -> Option<V>;
    async fn put(&self, key: K, value: V, ttl: Option<Duration>);
    async fn remove(&self, key: &K);
    /// Drops every entry whose key matches `predicate`.
    async fn invalidate_where(&self, predicate: &(dyn for<'k> Fn(&'k K) -> bool + Send + Sync));
    async fn clear(&self);
}
