use anyhow::Context;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

pub const KEY_NOTIFICATIONS_ENABLED: &str = "notificationsEnabled";
pub const KEY_NOTIFICATION_TIMING: &str = "notificationTiming";
pub const KEY_LAST_SCHEDULED_DATE: &str = "lastScheduledDate";
pub const KEY_PRAYER_SCHOOL: &str = "prayerSchool";
pub const KEY_CALCULATION_METHOD: &str = "calculationMethod";
pub const KEY_IS_MANUAL_LOCATION: &str = "isManualLocation";
pub const KEY_MANUAL_LATITUDE: &str = "manualLatitude";
pub const KEY_MANUAL_LONGITUDE: &str = "manualLongitude";

/// Persistance clé/valeur (chaînes).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// Stockage en mémoire (tests, sessions éphémères).
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Fichier JSON `{clé: valeur}`, réécrit de manière atomique à chaque mutation.
pub struct JsonKvStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonKvStore {
    /// Ouvre le fichier ; absent, il sera créé à la première écriture.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let data = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_slice(&data)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<F>(&self, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut entries);
        write_atomic(&self.path, &serde_json::to_vec_pretty(&*entries)?)
    }
}

#[async_trait]
impl KeyValueStore for JsonKvStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }
}

/// Écriture atomique : fichier temporaire voisin puis renommage.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).with_context(|| "creating temp file")?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).with_context(|| "atomic rename")?;
    Ok(())
}
