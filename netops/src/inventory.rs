//! Device inventories.
//!
//! An inventory is a YAML file in the inventory directory mapping device
//! names to connection details:
//!
//! ```yaml
//! r1:
//!   ip: 10.0.0.1
//! r2:
//!   ip: 10.0.0.2
//!   port: 830
//!   site: ams
//! ```
//!
//! Keys other than `ip` and `port` are kept as-is in [`Device::extra`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::error::{InventoryError, Result};

const EXTENSIONS: &[&str] = &["yml", "yaml"];
const DEFAULT_SSH_PORT: u16 = 22;

/// One inventory entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub ip: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Device {
    /// SSH port, 22 unless the inventory says otherwise.
    pub fn ssh_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SSH_PORT)
    }
}

/// A named set of devices, iterated in name order.
#[derive(Debug, Clone)]
pub struct Inventory {
    name: String,
    devices: BTreeMap<String, Device>,
}

impl Inventory {
    /// Load `<dir>/<name>.yml` (or `.yaml`).
    ///
    /// A missing inventory yields [`InventoryError::NotFound`] listing the
    /// inventories that do exist.
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let path = find(dir, name).ok_or_else(|| InventoryError::NotFound {
            name: name.to_string(),
            available: available(dir),
        })?;
        debug!("loading inventory {}", path.display());

        let content = fs::read_to_string(&path).map_err(|source| InventoryError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml(name, &content).map_err(|source| {
            InventoryError::Parse {
                path: path.clone(),
                source,
            }
            .into()
        })
    }

    /// Parse inventory content.
    pub fn from_yaml(
        name: &str,
        content: &str,
    ) -> std::result::Result<Self, serde_yaml::Error> {
        let devices = if content.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_yaml::from_str::<Option<BTreeMap<String, Device>>>(content)?.unwrap_or_default()
        };
        Ok(Self {
            name: name.to_string(),
            devices,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, device: &str) -> Option<&Device> {
        self.devices.get(device)
    }

    /// Device names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// Devices in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Device)> {
        self.devices.iter().map(|(name, device)| (name.as_str(), device))
    }
}

fn find(dir: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return None;
    }
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|path| path.is_file())
}

/// Names of the inventories present in `dir`, sorted.
pub fn available(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext))
        })
        .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .collect();
    names.sort();
    names.dedup();
    names
}
