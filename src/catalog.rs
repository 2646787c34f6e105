//! Catalog of supported service types.
//!
//! The manifest is bundled into the binary and never changes while the shell
//! runs; configured services copy their defaults out of it at creation time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{ShellError, ShellResult};

const BUNDLED_MANIFEST: &str = include_str!("assets/services.json");

/// A supported service type.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub id: String,
    pub name_long: String,
    pub name: String,
    pub icon: String,
    pub url: String,
    pub inject_code: String,
    /// Whether more than one instance of this type may be configured.
    pub multiple: bool,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<ServiceDefinition>,
}

impl Catalog {
    /// The manifest shipped with the application.
    pub fn bundled() -> ShellResult<Self> {
        Self::from_json(BUNDLED_MANIFEST)
    }

    pub fn from_json(manifest: &str) -> ShellResult<Self> {
        let entries: Vec<ServiceDefinition> = serde_json::from_str(manifest)
            .map_err(|e| ShellError::Catalog(format!("invalid manifest: {}", e)))?;

        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.id.is_empty() {
                return Err(ShellError::Catalog("entry with empty id".into()));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(ShellError::Catalog(format!("duplicate id {}", entry.id)));
            }
        }

        tracing::debug!(count = entries.len(), "Loaded service catalog");
        Ok(Catalog { entries })
    }

    pub fn get(&self, id: &str) -> Option<&ServiceDefinition> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn require(&self, id: &str) -> ShellResult<&ServiceDefinition> {
        self.get(id)
            .ok_or_else(|| ShellError::UnknownServiceType(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceDefinition> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
