use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Storage key of the single persisted record.
pub const STATE_KEY: &str = "learnshell-state";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingState {
    #[serde(default)]
    pub initial_load_timestamp: Option<i64>,
    #[serde(default)]
    pub has_read: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_track_alias: Option<String>,
    #[serde(default)]
    pub skipped_auth: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRecord>,
}

impl ReadingState {
    pub fn has_read(&self, alias: &str) -> bool {
        self.has_read.get(alias).copied().unwrap_or(false)
    }

    /// Project id of the signed-in user, if any and non-empty.
    pub fn project_id(&self) -> Option<&str> {
        self.user
            .as_ref()
            .map(|u| u.project_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

pub trait Storage: Send + Sync {
    fn read(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn write(&self, key: &str, bytes: &[u8]) -> anyhow::Result<()>;
}

/// One JSON file per key under `base_dir`.
#[derive(Debug, Clone)]
pub struct LocalFsStorage {
    base_dir: PathBuf,
}

impl LocalFsStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn record_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

impl Storage for LocalFsStorage {
    fn read(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.record_path(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("read: {}", path.display())),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> anyhow::Result<()> {
        write_atomic(&self.record_path(key), bytes)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage lock poisoned"))?;
        entries.insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }
}

/// The reading-state record: a JSON document addressed by key paths.
///
/// Keys the typed [`ReadingState`] does not know about are kept as-is. When
/// storage fails the store keeps working in memory for the rest of the
/// session.
pub struct StateStore {
    storage: Arc<dyn Storage>,
    document: Value,
    state: ReadingState,
    durable: bool,
}

impl StateStore {
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let (document, durable) = match storage.read(STATE_KEY) {
            Ok(Some(bytes)) => (parse_record(&bytes), true),
            Ok(None) => (Value::Object(Map::new()), true),
            Err(err) => {
                tracing::warn!(?err, "reading state unavailable; using in-memory defaults");
                (Value::Object(Map::new()), false)
            }
        };

        let (document, state) = match with_defaults(document) {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::warn!(?err, "stored reading state is malformed; using defaults");
                let state = ReadingState::default();
                (default_document(), state)
            }
        };

        Self {
            storage,
            document,
            state,
            durable,
        }
    }

    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryStorage::new()))
    }

    pub fn get(&self) -> &ReadingState {
        &self.state
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn value_at(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.document, |node, key| node.as_object()?.get(*key))
    }

    /// Whether writes still reach durable storage.
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    /// Replaces the value at `path`, creating missing objects on the way, and
    /// persists the whole record.
    pub fn update<V: Serialize>(&mut self, path: &[&str], value: V) -> anyhow::Result<&ReadingState> {
        if path.is_empty() {
            anyhow::bail!("update path is empty");
        }
        let value = serde_json::to_value(value).context("serialize update value")?;

        let mut document = self.document.clone();
        set_path(&mut document, path, value)
            .with_context(|| format!("update path {}", path.join(".")))?;
        let state: ReadingState = serde_json::from_value(document.clone())
            .with_context(|| format!("update at {} breaks reading state", path.join(".")))?;

        self.persist(&document);
        self.document = document;
        self.state = state;
        tracing::debug!(path = %path.join("."), "reading state updated");
        Ok(&self.state)
    }

    fn persist(&mut self, document: &Value) {
        if !self.durable {
            return;
        }
        let result = serde_json::to_vec_pretty(document)
            .context("serialize reading state")
            .and_then(|bytes| self.storage.write(STATE_KEY, &bytes));
        if let Err(err) = result {
            tracing::warn!(?err, "persisting reading state failed; keeping it in memory");
            self.durable = false;
        }
    }
}

fn parse_record(bytes: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) if value.is_object() => value,
        Ok(_) => {
            tracing::warn!("stored reading state is not an object; using defaults");
            Value::Object(Map::new())
        }
        Err(err) => {
            tracing::warn!(?err, "stored reading state is not valid json; using defaults");
            Value::Object(Map::new())
        }
    }
}

fn default_document() -> Value {
    serde_json::to_value(ReadingState::default()).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn with_defaults(mut document: Value) -> anyhow::Result<(Value, ReadingState)> {
    if let (Some(map), Value::Object(defaults)) = (document.as_object_mut(), default_document()) {
        for (key, value) in defaults {
            map.entry(key).or_insert(value);
        }
    }
    let state = serde_json::from_value(document.clone()).context("deserialize reading state")?;
    Ok((document, state))
}

fn set_path(target: &mut Value, path: &[&str], value: Value) -> anyhow::Result<()> {
    let Some((head, rest)) = path.split_first() else {
        *target = value;
        return Ok(());
    };

    if target.is_null() {
        *target = Value::Object(Map::new());
    }
    let map = target
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("cannot set {head:?} inside a non-object value"))?;

    if rest.is_empty() {
        map.insert((*head).to_owned(), value);
        return Ok(());
    }
    let child = map.entry((*head).to_owned()).or_insert(Value::Null);
    set_path(child, rest, value)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    std::fs::write(&tmp_path, bytes)
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct FailingStorage;

    impl Storage for FailingStorage {
        fn read(&self, _key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            Ok(None)
        }

        fn write(&self, _key: &str, _bytes: &[u8]) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn fresh_store_is_default_filled() {
        let store = StateStore::in_memory();
        assert_eq!(store.get(), &ReadingState::default());
        assert_eq!(store.value_at(&["hasRead"]), Some(&json!({})));
        assert_eq!(store.value_at(&["initialLoadTimestamp"]), Some(&Value::Null));
        assert_eq!(store.value_at(&["skippedAuth"]), Some(&json!(false)));
    }

    #[test]
    fn nested_update_touches_only_the_addressed_value() -> anyhow::Result<()> {
        let mut store = StateStore::in_memory();
        store.update(&["a", "x"], "keep")?;
        store.update(&["skippedAuth"], true)?;
        let before = store.document().clone();

        store.update(&["a", "b"], 7)?;

        assert_eq!(store.value_at(&["a", "b"]), Some(&json!(7)));
        let mut expected = before;
        expected["a"]["b"] = json!(7);
        assert_eq!(store.document(), &expected);
        Ok(())
    }

    #[test]
    fn update_creates_missing_intermediate_objects() -> anyhow::Result<()> {
        let mut store = StateStore::in_memory();
        store.update(&["deep", "er", "est"], json!([1, 2]))?;
        assert_eq!(store.value_at(&["deep", "er", "est"]), Some(&json!([1, 2])));
        Ok(())
    }

    #[test]
    fn repeated_update_is_idempotent() -> anyhow::Result<()> {
        let mut once = StateStore::in_memory();
        once.update(&["hasRead", "a"], true)?;

        let mut twice = StateStore::in_memory();
        twice.update(&["hasRead", "a"], true)?;
        twice.update(&["hasRead", "a"], true)?;

        assert_eq!(once.document(), twice.document());
        assert_eq!(once.get(), twice.get());
        Ok(())
    }

    #[test]
    fn typed_view_follows_updates() -> anyhow::Result<()> {
        let mut store = StateStore::in_memory();
        let user = UserRecord {
            project_id: "proj_1".to_owned(),
            email: "ada@example.com".to_owned(),
            name: "Ada".to_owned(),
        };
        let state = store.update(&["user"], &user)?;
        assert_eq!(state.user.as_ref(), Some(&user));
        assert_eq!(state.project_id(), Some("proj_1"));

        let state = store.update(&["hasRead", "react-01"], true)?;
        assert!(state.has_read("react-01"));
        assert!(!state.has_read("react-02"));
        Ok(())
    }

    #[test]
    fn rejects_updates_that_break_the_shape() -> anyhow::Result<()> {
        let mut store = StateStore::in_memory();
        store.update(&["hasRead", "a"], true)?;
        let before = store.document().clone();

        let err = store.update(&["hasRead", "a"], "yes").unwrap_err();
        assert!(format!("{err:#}").contains("breaks reading state"));
        assert!(store.update(&["skippedAuth", "nested"], 1).is_err());
        assert!(store.update(&[], 1).is_err());

        assert_eq!(store.document(), &before);
        Ok(())
    }

    #[test]
    fn file_storage_round_trips_and_keeps_unknown_keys() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let storage = Arc::new(LocalFsStorage::new(temp.path().join("state")));

        let mut store = StateStore::open(storage.clone());
        store.update(&["hasRead", "get-started"], true)?;
        store.update(&["extra", "flag"], "on")?;
        assert!(store.is_durable());

        let reopened = StateStore::open(storage.clone());
        assert_eq!(reopened.get(), store.get());
        assert_eq!(reopened.value_at(&["extra", "flag"]), Some(&json!("on")));

        let raw = std::fs::read_to_string(storage.record_path(STATE_KEY))?;
        assert!(raw.contains("\"hasRead\""));
        Ok(())
    }

    #[test]
    fn partial_record_gets_defaults() -> anyhow::Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(STATE_KEY, br#"{"selectedTrackAlias":"tutorial-angular"}"#)?;

        let store = StateStore::open(storage);
        assert_eq!(
            store.get().selected_track_alias.as_deref(),
            Some("tutorial-angular")
        );
        assert!(store.get().has_read.is_empty());
        assert_eq!(store.value_at(&["skippedAuth"]), Some(&json!(false)));
        Ok(())
    }

    #[test]
    fn corrupt_record_falls_back_to_defaults() -> anyhow::Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(STATE_KEY, b"not json")?;
        let store = StateStore::open(storage.clone());
        assert_eq!(store.get(), &ReadingState::default());

        storage.write(STATE_KEY, br#"{"hasRead":{"a":"yes"}}"#)?;
        let store = StateStore::open(storage);
        assert_eq!(store.get(), &ReadingState::default());
        Ok(())
    }

    #[test]
    fn write_failure_degrades_to_memory() -> anyhow::Result<()> {
        let mut store = StateStore::open(Arc::new(FailingStorage));
        store.update(&["skippedAuth"], true)?;
        assert!(!store.is_durable());
        assert!(store.get().skipped_auth);

        store.update(&["hasRead", "a"], true)?;
        assert!(store.get().has_read("a"));
        Ok(())
    }
}
