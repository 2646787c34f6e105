//! Persistent registry of user-configured services.
//!
//! Each service is one JSON file named after its id inside the services
//! directory. Records are independent: there is no transaction spanning two
//! services, but writes to the same id are serialized through a per-id lock.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::catalog::{Catalog, ServiceDefinition};
use crate::error::{ShellError, ShellResult, StorageError};

/// Length of the random part of a generated service id.
const ID_RANDOM_LEN: usize = 24;

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Storage key of a configured service: `<random>_<type>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceId(String);

impl ServiceId {
    /// Accepts only ids that are safe to use as a file name.
    pub fn parse(raw: &str) -> ShellResult<Self> {
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(ServiceId(raw.to_string()))
        } else {
            Err(ShellError::NotFound(raw.to_string()))
        }
    }

    pub fn generate(service_type: &str) -> Self {
        let random: String = (0..ID_RANDOM_LEN)
            .map(|_| ID_ALPHABET[fastrand::usize(..ID_ALPHABET.len())] as char)
            .collect();
        let id = ServiceId(format!("{}_{}", random, service_type));
        tracing::debug!(service_id = %id, "Generated a new service id");
        id
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The type suffix encoded in the id, if the id follows the generated shape.
    pub fn service_type(&self) -> Option<&str> {
        self.0.split_once('_').map(|(_, ty)| ty).filter(|ty| !ty.is_empty())
    }
}

impl TryFrom<String> for ServiceId {
    type Error = ShellError;

    fn try_from(raw: String) -> ShellResult<Self> {
        ServiceId::parse(&raw)
    }
}

impl From<ServiceId> for String {
    fn from(id: ServiceId) -> Self {
        id.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One configured service instance as stored on disk.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    #[serde(skip)]
    pub id: ServiceId,
    #[serde(rename = "type")]
    pub service_type: String,
    pub name: String,
    pub icon: String,
    pub url: String,
    #[serde(default)]
    pub inject_code: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub service_enable_status: bool,
}

impl ServiceConfig {
    /// A fresh, enabled instance pre-filled from its catalog entry.
    pub fn from_definition(id: ServiceId, definition: &ServiceDefinition) -> Self {
        ServiceConfig {
            id,
            service_type: definition.id.clone(),
            name: definition.name.clone(),
            icon: definition.icon.clone(),
            url: definition.url.clone(),
            inject_code: definition.inject_code.clone(),
            service_enable_status: true,
        }
    }
}

/// Older files stored the enable flag as the strings "true"/"false".
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Text(text) => text.trim().eq_ignore_ascii_case("true"),
    })
}

/// Per-key mutexes, created on first use.
#[derive(Default)]
struct KeyedLocks {
    inner: Mutex<HashMap<ServiceId, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    fn handle(&self, id: &ServiceId) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(id.clone()).or_default())
    }
}

pub struct Registry {
    dir: PathBuf,
    locks: KeyedLocks,
}

impl Registry {
    pub fn open(dir: impl Into<PathBuf>) -> ShellResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        tracing::debug!(dir = %dir.display(), "Opened service registry");
        Ok(Registry {
            dir,
            locks: KeyedLocks::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &ServiceId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// All configured services keyed by id.
    ///
    /// Unreadable records are skipped with a warning so one corrupt file does
    /// not hide every other service.
    pub fn list(&self) -> ShellResult<BTreeMap<ServiceId, ServiceConfig>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;
        let mut services = BTreeMap::new();

        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.dir, e))?;
            let path = entry.path();

            let Some(stem) = path
                .file_name()
                .and_then(|n| n.to_str())
                .filter(|n| !n.starts_with('.'))
                .and_then(|n| n.strip_suffix(".json"))
            else {
                continue;
            };

            let Ok(id) = ServiceId::parse(stem) else {
                tracing::warn!(path = %path.display(), "Ignoring record with invalid id");
                continue;
            };

            match self.read_record(&id) {
                Ok(config) => {
                    services.insert(id, config);
                }
                Err(e) => tracing::warn!("Skipping service record: {}", e),
            }
        }

        tracing::debug!(count = services.len(), "Listed configured services");
        Ok(services)
    }

    pub fn get(&self, id: &ServiceId) -> ShellResult<ServiceConfig> {
        match self.read_record(id) {
            Err(StorageError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Err(ShellError::NotFound(id.to_string()))
            }
            other => Ok(other?),
        }
    }

    pub fn contains(&self, id: &ServiceId) -> bool {
        self.record_path(id).exists()
    }

    /// Persist a new service.
    ///
    /// Fails with `DuplicateSingleInstance` when the type allows a single
    /// instance and one (enabled or not) already exists.
    pub fn create(&self, catalog: &Catalog, config: &ServiceConfig) -> ShellResult<()> {
        let definition = catalog.require(&config.service_type)?;
        if !definition.multiple {
            self.ensure_no_instance_of(&definition.id)?;
        }

        let lock = self.locks.handle(&config.id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let path = self.record_path(&config.id);
        if path.exists() {
            return Err(StorageError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "record already exists"),
            )
            .into());
        }

        self.write_record(config)?;
        tracing::info!(service_id = %config.id, service_type = %config.service_type, "Created service");
        Ok(())
    }

    /// Fails with `DuplicateSingleInstance` if any record of `service_type` exists.
    pub fn ensure_no_instance_of(&self, service_type: &str) -> ShellResult<()> {
        let exists = self
            .list()?
            .values()
            .any(|existing| existing.service_type == service_type);
        if exists {
            tracing::warn!(service_type, "Type allows a single instance and one exists");
            return Err(ShellError::DuplicateSingleInstance(service_type.to_string()));
        }
        Ok(())
    }

    pub fn update(&self, config: &ServiceConfig) -> ShellResult<()> {
        let lock = self.locks.handle(&config.id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.contains(&config.id) {
            return Err(ShellError::NotFound(config.id.to_string()));
        }
        self.write_record(config)?;
        tracing::info!(service_id = %config.id, "Updated service");
        Ok(())
    }

    /// Flip the persisted enable flag and return the updated record.
    pub fn set_enabled(&self, id: &ServiceId, enabled: bool) -> ShellResult<ServiceConfig> {
        let lock = self.locks.handle(id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut config = self.get(id)?;
        config.service_enable_status = enabled;
        self.write_record(&config)?;
        tracing::info!(service_id = %id, enabled, "Changed service enable status");
        Ok(config)
    }

    pub fn delete(&self, id: &ServiceId) -> ShellResult<()> {
        let lock = self.locks.handle(id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let path = self.record_path(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(service_id = %id, "Deleted service");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ShellError::NotFound(id.to_string()))
            }
            Err(e) => Err(StorageError::io(path, e).into()),
        }
    }

    fn read_record(&self, id: &ServiceId) -> Result<ServiceConfig, StorageError> {
        let path = self.record_path(id);
        let content = fs::read_to_string(&path).map_err(|e| StorageError::io(&path, e))?;
        let mut config: ServiceConfig = serde_json::from_str(&content)
            .map_err(|source| StorageError::Malformed { path, source })?;
        config.id = id.clone();
        Ok(config)
    }

    /// Write to a hidden temp file first, then rename over the record.
    fn write_record(&self, config: &ServiceConfig) -> Result<(), StorageError> {
        let final_path = self.record_path(&config.id);
        let temp_path = self.dir.join(format!(".{}.json.tmp", config.id));

        let body = serde_json::to_string_pretty(config).map_err(|source| {
            StorageError::Malformed {
                path: final_path.clone(),
                source,
            }
        })?;

        fs::write(&temp_path, body).map_err(|e| StorageError::io(&temp_path, e))?;
        fs::rename(&temp_path, &final_path).map_err(|e| StorageError::io(&final_path, e))
    }
}
