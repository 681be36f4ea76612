use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RelayError, Result};

/// A saved device record.
///
/// Devices are schema-less beyond `id`: whatever extra members a client
/// supplies on registration are kept and served back unchanged. `status`
/// holds the last state observed on the realtime bus, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: None,
            extra: Map::new(),
        }
    }
}

/// The durable list of saved devices, mirrored to one JSON file.
///
/// The file is rewritten in full after every mutation, so on-disk state
/// always matches memory once a mutating call returns. The write is a plain
/// overwrite, not an atomic rename; durability hardening is out of scope.
#[derive(Debug)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    path: PathBuf,
}

impl DeviceRegistry {
    /// Load the registry from `path`, or start empty if the file is absent.
    ///
    /// A file that exists but does not parse is a fatal condition: the
    /// caller must not run over a corrupt store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Ok(Self {
                devices: Vec::new(),
                path,
            });
        }

        let content = fs::read_to_string(&path)?;
        let devices = serde_json::from_str(&content).map_err(|source| RelayError::CorruptStore {
            path: path.clone(),
            source,
        })?;

        Ok(Self { devices, path })
    }

    /// Append a device and persist. Rejects duplicate ids without touching
    /// anything.
    pub fn add(&mut self, device: Device) -> Result<()> {
        if self.devices.iter().any(|d| d.id == device.id) {
            return Err(RelayError::DeviceExists(device.id));
        }
        self.devices.push(device);
        self.persist()
    }

    /// Remove every record with `id` and persist. Removing an unknown id is
    /// a no-op that still rewrites the file.
    pub fn remove(&mut self, id: &str) -> Result<()> {
        self.devices.retain(|d| d.id != id);
        self.persist()
    }

    /// Read-only lookup by id.
    pub fn find_by_id(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Overwrite the status of `id` in place and persist; returns whether
    /// the device was found. An unknown id leaves both memory and file
    /// untouched.
    pub fn update_status(&mut self, id: &str, status: &str) -> Result<bool> {
        match self.devices.iter_mut().find(|d| d.id == id) {
            Some(device) => {
                device.status = Some(status.to_string());
                self.persist()?;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    /// Serialize the full in-memory sequence as pretty-printed JSON and
    /// overwrite the backing file.
    pub fn persist(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.devices)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// All saved devices, insertion order preserved.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
