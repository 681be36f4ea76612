use crate::registry::Device;

/// Ephemeral list of devices observed on the network but not yet saved.
///
/// Nothing in the relay writes here: `/devices` serves whatever an external
/// discovery integration has published, which for a bare deployment is
/// nothing. `publish` and `clear` are the seam such an integration plugs
/// into; the cache itself never touches disk and dies with the process.
#[derive(Debug, Default)]
pub struct DiscoveredDevices {
    devices: Vec<Device>,
}

impl DiscoveredDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cache contents, insertion order preserved.
    pub fn snapshot(&self) -> Vec<Device> {
        self.devices.clone()
    }

    /// Record a discovered device. A record with the same id replaces the
    /// cached one in place; ids stay unique like everywhere else.
    pub fn publish(&mut self, device: Device) {
        match self.devices.iter_mut().find(|d| d.id == device.id) {
            Some(existing) => *existing = device,
            None => self.devices.push(device),
        }
    }

    /// Forget everything, e.g. before a discovery rescan.
    pub fn clear(&mut self) {
        self.devices.clear();
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
