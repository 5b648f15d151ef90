//! Remote document store seam and an in-memory implementation.
//!
//! Documents are JSON values addressed by slash-separated paths
//! (`users/{uid}/habits/{habitId}/checkIns/{date}`). Reads right after a write are
//! not guaranteed to observe it; transactions on a single document are
//! all-or-nothing.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use pulse_core::{PulseError, PulseResult};
use serde_json::Value;
use tokio::sync::Mutex;

/// Write options for [`DocumentStore::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge top-level fields into an existing document instead of replacing it.
    pub merge: bool,
    /// Field the store fills with its own clock on write.
    pub server_timestamp: Option<&'static str>,
}

impl SetOptions {
    pub fn merge() -> Self {
        Self {
            merge: true,
            server_timestamp: None,
        }
    }

    pub fn stamp(mut self, field: &'static str) -> Self {
        self.server_timestamp = Some(field);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

/// Ordered, optionally limited listing of a collection (ordered by document id).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Query {
    pub order: Order,
    pub limit: Option<usize>,
}

impl Query {
    pub fn newest_first(limit: usize) -> Self {
        Self {
            order: Order::Descending,
            limit: Some(limit),
        }
    }
}

/// Read-modify-write step of a transaction. Returning an error aborts without writing.
pub type TxnFn = Box<dyn FnOnce(Option<Value>) -> PulseResult<Value> + Send>;

/// Document state on both sides of a committed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TxnOutcome {
    pub before: Option<Value>,
    pub after: Value,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Signed-in user id, if any.
    fn current_user(&self) -> Option<String>;

    async fn get(&self, path: &str) -> PulseResult<Option<Value>>;

    async fn set(&self, path: &str, doc: Value, options: SetOptions) -> PulseResult<()>;

    /// Deleting a missing document is not an error.
    async fn delete(&self, path: &str) -> PulseResult<()>;

    /// Documents directly under `collection` as `(id, document)` pairs.
    async fn query(&self, collection: &str, query: Query) -> PulseResult<Vec<(String, Value)>>;

    async fn transact(&self, path: &str, apply: TxnFn) -> PulseResult<TxnOutcome>;
}

pub fn require_user(store: &dyn DocumentStore) -> PulseResult<String> {
    store.current_user().ok_or(PulseError::NotAuthenticated)
}

/// Per-user document paths.
pub mod paths {
    use chrono::NaiveDate;

    pub fn habits(uid: &str) -> String {
        format!("users/{uid}/habits")
    }

    pub fn habit(uid: &str, habit_id: &str) -> String {
        format!("{}/{habit_id}", habits(uid))
    }

    pub fn check_ins(uid: &str, habit_id: &str) -> String {
        format!("{}/checkIns", habit(uid, habit_id))
    }

    pub fn check_in(uid: &str, habit_id: &str, date: NaiveDate) -> String {
        format!("{}/{}", check_ins(uid, habit_id), date.format("%Y-%m-%d"))
    }

    pub fn goals(uid: &str) -> String {
        format!("users/{uid}/goals")
    }

    pub fn goal(uid: &str, goal_id: &str) -> String {
        format!("{}/{goal_id}", goals(uid))
    }

    pub fn notifications(uid: &str) -> String {
        format!("users/{uid}/notifications")
    }

    pub fn notification(uid: &str, trigger_id: &str) -> String {
        format!("{}/{trigger_id}", notifications(uid))
    }
}

/// In-process store: a sorted map of path -> document.
#[derive(Debug, Default)]
pub struct MemoryStore {
    user: Option<String>,
    docs: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// A store with nobody signed in.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            docs: Mutex::default(),
        }
    }

    pub fn from_snapshot(user: Option<String>, docs: BTreeMap<String, Value>) -> Self {
        Self {
            user,
            docs: Mutex::new(docs),
        }
    }

    pub async fn snapshot(&self) -> BTreeMap<String, Value> {
        self.docs.lock().await.clone()
    }

    fn write(docs: &mut BTreeMap<String, Value>, path: &str, doc: Value, options: SetOptions) {
        let mut doc = match (options.merge, docs.remove(path)) {
            (true, Some(Value::Object(mut existing))) => {
                if let Value::Object(fields) = doc {
                    existing.extend(fields);
                    Value::Object(existing)
                } else {
                    doc
                }
            }
            _ => doc,
        };
        if let (Some(field), Value::Object(fields)) = (options.server_timestamp, &mut doc) {
            fields.insert(field.to_string(), Value::String(Utc::now().to_rfc3339()));
        }
        docs.insert(path.to_string(), doc);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn current_user(&self) -> Option<String> {
        self.user.clone()
    }

    async fn get(&self, path: &str) -> PulseResult<Option<Value>> {
        Ok(self.docs.lock().await.get(path).cloned())
    }

    async fn set(&self, path: &str, doc: Value, options: SetOptions) -> PulseResult<()> {
        let mut docs = self.docs.lock().await;
        Self::write(&mut docs, path, doc, options);
        Ok(())
    }

    async fn delete(&self, path: &str) -> PulseResult<()> {
        self.docs.lock().await.remove(path);
        Ok(())
    }

    async fn query(&self, collection: &str, query: Query) -> PulseResult<Vec<(String, Value)>> {
        let prefix = format!("{}/", collection.trim_end_matches('/'));
        let docs = self.docs.lock().await;
        let children = docs.range(prefix.clone()..).take_while(|(k, _)| k.starts_with(&prefix));

        let mut out: Vec<(String, Value)> = children
            .filter_map(|(k, v)| {
                let id = &k[prefix.len()..];
                (!id.contains('/')).then(|| (id.to_string(), v.clone()))
            })
            .collect();

        if query.order == Order::Descending {
            out.reverse();
        }
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn transact(&self, path: &str, apply: TxnFn) -> PulseResult<TxnOutcome> {
        let mut docs = self.docs.lock().await;
        let before = docs.get(path).cloned();
        let after = apply(before.clone())?;
        Self::write(&mut docs, path, after.clone(), SetOptions::default());
        Ok(TxnOutcome { before, after })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_merge_keeps_untouched_fields() {
        let store = MemoryStore::signed_in("u1");
        store
            .set("users/u1/habits/h1", json!({"name": "Read", "target": 10}), SetOptions::default())
            .await
            .unwrap();
        store
            .set("users/u1/habits/h1", json!({"target": 20}), SetOptions::merge())
            .await
            .unwrap();

        let doc = store.get("users/u1/habits/h1").await.unwrap().unwrap();
        assert_eq!(doc, json!({"name": "Read", "target": 20}));
    }

    #[tokio::test]
    async fn test_server_timestamp_is_filled() {
        let store = MemoryStore::signed_in("u1");
        store
            .set("a/b", json!({"completedAt": null}), SetOptions::merge().stamp("completedAt"))
            .await
            .unwrap();
        let doc = store.get("a/b").await.unwrap().unwrap();
        assert!(doc["completedAt"].is_string());
    }

    #[tokio::test]
    async fn test_query_lists_direct_children_in_order() {
        let store = MemoryStore::signed_in("u1");
        for path in [
            "users/u1/habits/h2",
            "users/u1/habits/h1",
            "users/u1/habits/h1/checkIns/2026-02-20",
            "users/u1/habitsX/other",
        ] {
            store.set(path, json!({}), SetOptions::default()).await.unwrap();
        }

        let ids: Vec<String> = store
            .query("users/u1/habits", Query::default())
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["h1", "h2"]);

        let newest = store.query("users/u1/habits", Query::newest_first(1)).await.unwrap();
        assert_eq!(newest[0].0, "h2");
    }

    #[tokio::test]
    async fn test_failed_transaction_writes_nothing() {
        let store = MemoryStore::signed_in("u1");
        let err = store
            .transact("users/u1/goals/g1", Box::new(|_| Err(PulseError::missing("g1"))))
            .await;
        assert!(err.is_err());
        assert!(store.get("users/u1/goals/g1").await.unwrap().is_none());
    }

    #[test]
    fn test_require_user() {
        assert!(matches!(
            require_user(&MemoryStore::new()),
            Err(PulseError::NotAuthenticated)
        ));
        assert_eq!(require_user(&MemoryStore::signed_in("u1")).unwrap(), "u1");
    }
}
