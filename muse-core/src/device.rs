//! Audio output device enumeration and selection.

use crate::error::DeviceError;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Opaque system identifier of an audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioDeviceId(pub u32);

impl std::fmt::Display for AudioDeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// System service that lists audio hardware and selects the default output.
pub trait AudioDeviceDirectory: Send + Sync {
    /// All devices known to the system, in system order.
    fn device_ids(&self) -> Result<Vec<AudioDeviceId>, DeviceError>;

    /// Whether the device exposes at least one output stream.
    fn has_output_streams(&self, device: AudioDeviceId) -> Result<bool, DeviceError>;

    /// Human-readable device name.
    fn device_name(&self, device: AudioDeviceId) -> Result<String, DeviceError>;

    fn set_default_output_device(&self, device: AudioDeviceId) -> Result<(), DeviceError>;
}

/// Output devices from one enumeration, keyed by display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceNameMap {
    names: Vec<String>,
    ids: HashMap<String, AudioDeviceId>,
}

impl DeviceNameMap {
    /// Enumerate output devices.
    ///
    /// Devices without output streams or without a readable name are skipped.
    /// When two devices share a name the later one wins the lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the device list itself cannot be read.
    pub fn enumerate(directory: &dyn AudioDeviceDirectory) -> Result<Self, DeviceError> {
        let mut map = Self::default();

        for device in directory.device_ids()? {
            match directory.has_output_streams(device) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    debug!("Skipping device {}: {}", device, e);
                    continue;
                }
            }

            match directory.device_name(device) {
                Ok(name) => map.insert(name, device),
                Err(e) => debug!("Skipping unnamed device {}: {}", device, e),
            }
        }

        Ok(map)
    }

    fn insert(&mut self, name: String, device: AudioDeviceId) {
        if self.ids.insert(name.clone(), device).is_some() {
            warn!("Duplicate audio output device name: {}", name);
        } else {
            self.names.push(name);
        }
    }

    /// Device names in enumeration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<AudioDeviceId> {
        self.ids.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeDevice, FakeDeviceDirectory};

    #[test]
    fn test_enumerate_filters_inputs_and_unnamed() {
        let directory = FakeDeviceDirectory::new(vec![
            FakeDevice::output(1, "MacBook Speakers"),
            FakeDevice::input(2, "Microphone"),
            FakeDevice::unnamed_output(3),
            FakeDevice::output(4, "Living Room"),
        ]);

        let map = DeviceNameMap::enumerate(&directory).unwrap();

        assert_eq!(map.names(), ["MacBook Speakers", "Living Room"]);
        assert_eq!(map.get("Living Room"), Some(AudioDeviceId(4)));
        assert_eq!(map.get("Microphone"), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_enumerate_propagates_list_failure() {
        let directory = FakeDeviceDirectory::failing_enumeration();
        assert_eq!(
            DeviceNameMap::enumerate(&directory),
            Err(DeviceError::Enumeration { status: -1 })
        );
    }

    #[test]
    fn test_duplicate_names_keep_single_entry() {
        let directory = FakeDeviceDirectory::new(vec![
            FakeDevice::output(1, "Speakers"),
            FakeDevice::output(2, "Speakers"),
        ]);

        let map = DeviceNameMap::enumerate(&directory).unwrap();
        assert_eq!(map.names(), ["Speakers"]);
        assert_eq!(map.get("Speakers"), Some(AudioDeviceId(2)));
    }
}
