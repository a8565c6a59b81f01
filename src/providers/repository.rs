//! Cached, typed access to backend collections.
//!
//! Reads go through a query cache keyed by resource and parameters. Every
//! successful mutation invalidates the touched resource and its dependents so
//! the next read comes from the backend.
use super::wire;
use crate::core::backend::Backend;
use crate::core::cache::{Cache, QueryKey};
use crate::core::error::ApiError;
use crate::core::model::{
    Asset, Expense, Funding, Id, Investor, Ownership, ProfitDistribution, Project, Settings,
};
use crate::core::resource::{DISTRIBUTION_PREVIEW_PATH, Resource, report_path};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct Repository<'a> {
    backend: &'a dyn Backend,
    cache: Arc<dyn Cache<QueryKey, Value>>,
    ttl: Option<Duration>,
}

impl<'a> Repository<'a> {
    pub fn new(
        backend: &'a dyn Backend,
        cache: Arc<dyn Cache<QueryKey, Value>>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            backend,
            cache,
            ttl,
        }
    }

    async fn query(&self, key: QueryKey, path: &str) -> Result<Value, ApiError> {
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }
        let value = self.backend.get(path).await?;
        self.cache.put(key, value.clone(), self.ttl).await;
        Ok(value)
    }

    pub async fn list(&self, resource: Resource) -> Result<Vec<Value>, ApiError> {
        let value = self
            .query(QueryKey::collection(resource.name()), resource.list_path())
            .await?;
        Ok(wire::records(value))
    }

    pub async fn get(&self, resource: Resource, id: Id) -> Result<Value, ApiError> {
        let value = self
            .query(QueryKey::item(resource.name(), id), &resource.item_path(id))
            .await?;
        Ok(wire::record(value))
    }

    async fn typed_list<T: DeserializeOwned>(&self, resource: Resource) -> Result<Vec<T>, ApiError> {
        let value = self
            .query(QueryKey::collection(resource.name()), resource.list_path())
            .await?;
        wire::decode_list(value)
    }

    pub async fn settings(&self) -> Result<Settings, ApiError> {
        let value = self
            .query(
                QueryKey::collection(Resource::Settings.name()),
                Resource::Settings.list_path(),
            )
            .await?;
        wire::settings(value)
    }

    pub async fn fundings(&self) -> Result<Vec<Funding>, ApiError> {
        self.typed_list(Resource::Funding).await
    }

    pub async fn ownerships(&self) -> Result<Vec<Ownership>, ApiError> {
        self.typed_list(Resource::Ownership).await
    }

    pub async fn expenses(&self) -> Result<Vec<Expense>, ApiError> {
        self.typed_list(Resource::Expense).await
    }

    pub async fn projects(&self) -> Result<Vec<Project>, ApiError> {
        self.typed_list(Resource::Project).await
    }

    pub async fn investors(&self) -> Result<Vec<Investor>, ApiError> {
        self.typed_list(Resource::Investor).await
    }

    pub async fn assets(&self) -> Result<Vec<Asset>, ApiError> {
        self.typed_list(Resource::Asset).await
    }

    pub async fn distributions(&self) -> Result<Vec<ProfitDistribution>, ApiError> {
        self.typed_list(Resource::ProfitDistribution).await
    }

    pub async fn distribution(&self, id: Id) -> Result<ProfitDistribution, ApiError> {
        wire::decode_one(self.get(Resource::ProfitDistribution, id).await?)
    }

    pub async fn report(&self, name: &str) -> Result<Value, ApiError> {
        self.query(QueryKey::item("reports", name), &report_path(name))
            .await
    }

    /// Drops cached queries for `resource` and everything derived from it.
    pub async fn invalidate(&self, resource: Resource) {
        let mut names: Vec<&str> = vec![resource.name()];
        names.extend(resource.dependents().iter().map(|r| r.name()));
        debug!(resources = ?names, "Invalidating cached queries");
        self.cache
            .invalidate_where(&|key: &QueryKey| {
                names.contains(&key.resource.as_str()) || key.resource == "reports"
            })
            .await;
    }

    pub async fn create(&self, resource: Resource, body: &Value) -> Result<Value, ApiError> {
        let created = self.backend.post(resource.create_path(), body).await?;
        self.invalidate(resource).await;
        Ok(wire::record(created))
    }

    pub async fn update(&self, resource: Resource, id: Id, body: &Value) -> Result<Value, ApiError> {
        let updated = self.backend.put(&resource.item_path(id), body).await?;
        self.invalidate(resource).await;
        Ok(wire::record(updated))
    }

    pub async fn delete(&self, resource: Resource, id: Id) -> Result<(), ApiError> {
        self.backend.delete(&resource.item_path(id)).await?;
        self.invalidate(resource).await;
        Ok(())
    }

    /// Settings is a singleton written with POST.
    pub async fn update_settings(&self, settings: &Settings) -> Result<Settings, ApiError> {
        let body = serde_json::to_value(settings)?;
        let saved = self
            .backend
            .post(Resource::Settings.list_path(), &body)
            .await?;
        self.invalidate(Resource::Settings).await;
        match saved {
            Value::Null => Ok(settings.clone()),
            other => wire::settings(other),
        }
    }

    /// Asks the backend how an amount would be split. Nothing is stored.
    pub async fn preview_distribution(&self, body: &Value) -> Result<ProfitDistribution, ApiError> {
        wire::decode_one(self.backend.post(DISTRIBUTION_PREVIEW_PATH, body).await?)
    }
}

/// Finds a record by id in an already fetched collection.
pub fn find_by_id<T, F>(items: Vec<T>, id: Id, id_of: F) -> Option<T>
where
    F: Fn(&T) -> Id,
{
    items.into_iter().find(|item| id_of(item) == id)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned backend recording every call it receives.
    #[derive(Default)]
    pub struct FakeBackend {
        pub responses: Mutex<HashMap<String, Value>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        pub fn with(entries: &[(&str, Value)]) -> Self {
            let backend = Self::default();
            for (path, value) in entries {
                backend.set(path, value.clone());
            }
            backend
        }

        pub fn set(&self, path: &str, value: Value) {
            self.responses
                .lock()
                .unwrap()
                .insert(path.to_string(), value);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn answer(&self, call: String, path: &str) -> Result<Value, ApiError> {
            self.calls.lock().unwrap().push(call);
            self.responses
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| ApiError::from_status(404, "Not found."))
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn get(&self, path: &str) -> Result<Value, ApiError> {
            self.answer(format!("GET {path}"), path)
        }

        async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
            self.answer(format!("POST {path} {body}"), path)
        }

        async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
            self.answer(format!("PUT {path} {body}"), path)
        }

        async fn delete(&self, path: &str) -> Result<(), ApiError> {
            self.answer(format!("DELETE {path}"), path).map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeBackend;
    use super::*;
    use crate::store::memory::MemoryCache;
    use serde_json::json;

    fn repo(backend: &FakeBackend) -> Repository<'_> {
        Repository::new(backend, Arc::new(MemoryCache::<QueryKey, Value>::new()), None)
    }

    #[tokio::test]
    async fn test_reads_are_cached_until_mutation() {
        let backend = FakeBackend::with(&[
            (
                "/api/funding/",
                json!([{"id": 1, "source_type": "investor", "status": "available", "shares": 10}]),
            ),
            ("/api/funding/1/", json!({"id": 1})),
        ]);
        let repo = repo(&backend);

        assert_eq!(repo.fundings().await.unwrap().len(), 1);
        assert_eq!(repo.fundings().await.unwrap().len(), 1);
        assert_eq!(backend.calls(), vec!["GET /api/funding/"]);

        repo.update(Resource::Funding, 1, &json!({"shares": 12}))
            .await
            .unwrap();
        repo.fundings().await.unwrap();

        let gets = backend
            .calls()
            .iter()
            .filter(|c| c.as_str() == "GET /api/funding/")
            .count();
        assert_eq!(gets, 2);
    }

    #[tokio::test]
    async fn test_mutation_invalidates_dependents_only() {
        let backend = FakeBackend::with(&[
            ("/api/expense/", json!([])),
            ("/api/funding/", json!([])),
            ("/api/asset/aset/", json!([])),
        ]);
        let repo = repo(&backend);

        repo.expenses().await.unwrap();
        repo.fundings().await.unwrap();
        repo.assets().await.unwrap();
        repo.create(Resource::Expense, &json!({"category": "Bibit"}))
            .await
            .unwrap();
        repo.expenses().await.unwrap();
        repo.fundings().await.unwrap();
        repo.assets().await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls.iter().filter(|c| *c == "GET /api/expense/").count(), 2);
        assert_eq!(calls.iter().filter(|c| *c == "GET /api/funding/").count(), 2);
        assert_eq!(calls.iter().filter(|c| *c == "GET /api/asset/aset/").count(), 1);
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_cache() {
        let backend = FakeBackend::with(&[("/projects/", json!([]))]);
        let repo = repo(&backend);

        repo.projects().await.unwrap();
        let err = repo
            .create(Resource::Project, &json!({"name": "Kebun"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { status: 404, .. }));
        repo.projects().await.unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                "GET /projects/".to_string(),
                r#"POST /projectss/tambah/ {"name":"Kebun"}"#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_settings_update_posts_singleton() {
        let backend = FakeBackend::with(&[(
            "/api/settings/",
            json!({"total_shares": 2000, "share_price": "100000"}),
        )]);
        let repo = repo(&backend);

        let saved = repo
            .update_settings(&Settings {
                total_shares: 2000,
                share_price: rust_decimal::Decimal::from(100_000),
            })
            .await
            .unwrap();
        assert_eq!(saved.total_shares, 2000);
        assert!(backend.calls()[0].starts_with("POST /api/settings/"));
    }

    #[test]
    fn test_find_by_id() {
        let items = vec![(1, "a"), (2, "b")];
        assert_eq!(find_by_id(items.clone(), 2, |i| i.0), Some((2, "b")));
        assert_eq!(find_by_id(items, 3, |i| i.0), None);
    }
}
