//! Audio device enumeration via cpal.
//!
//! Lists every device of one host with its channel capabilities. Device ids
//! are the device's position in the host's enumeration order; lookups also
//! accept the exact device name.

use cpal::traits::{DeviceTrait, HostTrait};

use duplex_capture_core::models::audio_models::DeviceDescriptor;
use duplex_capture_core::models::error::RecorderError;

/// Audio device catalog for one cpal host.
pub struct DeviceCatalog {
    host: cpal::Host,
}

impl DeviceCatalog {
    /// Catalog of the platform's default host (WASAPI, ALSA/PulseAudio, Core Audio).
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn for_host(id: cpal::HostId) -> Result<Self, RecorderError> {
        let host = cpal::host_from_id(id)
            .map_err(|e| RecorderError::DeviceOpenFailed(format!("audio host {} unavailable: {}", id.name(), e)))?;
        Ok(Self { host })
    }

    /// List every device the host reports.
    pub fn list(&self) -> Result<Vec<DeviceDescriptor>, RecorderError> {
        Ok(self.devices()?.into_iter().map(|(_, descriptor)| descriptor).collect())
    }

    /// Look up a device by id or exact name.
    pub fn describe(&self, device_id: &str) -> Result<DeviceDescriptor, RecorderError> {
        self.find(device_id).map(|(_, descriptor)| descriptor)
    }

    /// Look up a device by id or exact name, returning the cpal handle as well.
    pub fn find(&self, device_id: &str) -> Result<(cpal::Device, DeviceDescriptor), RecorderError> {
        let devices = self.devices()?;
        let descriptors: Vec<&DeviceDescriptor> = devices.iter().map(|(_, d)| d).collect();
        let index = match_device(&descriptors, device_id)
            .ok_or_else(|| RecorderError::DeviceOpenFailed(format!("no audio device with id {}", device_id)))?;
        devices
            .into_iter()
            .nth(index)
            .ok_or_else(|| RecorderError::Internal(format!("device {} vanished during lookup", device_id)))
    }

    /// Id of the host's default input device, if any.
    pub fn default_input_id(&self) -> Option<String> {
        let name = self.host.default_input_device()?.name().ok()?;
        self.id_for_name(&name)
    }

    /// Id of the host's default output device, if any.
    pub fn default_output_id(&self) -> Option<String> {
        let name = self.host.default_output_device()?.name().ok()?;
        self.id_for_name(&name)
    }

    fn id_for_name(&self, name: &str) -> Option<String> {
        self.list().ok()?.into_iter().find(|d| d.name == name).map(|d| d.id)
    }

    fn devices(&self) -> Result<Vec<(cpal::Device, DeviceDescriptor)>, RecorderError> {
        let host_api = self.host.id().name();
        let devices = self
            .host
            .devices()
            .map_err(|e| RecorderError::DeviceOpenFailed(format!("failed to enumerate devices: {}", e)))?;

        Ok(devices
            .enumerate()
            .map(|(index, device)| {
                let descriptor = describe_device(index, &device, host_api);
                (device, descriptor)
            })
            .collect())
    }
}

impl Default for DeviceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_device(index: usize, device: &cpal::Device, host_api: &str) -> DeviceDescriptor {
    let name = device.name().unwrap_or_else(|_| format!("Device {}", index));
    let max_input_channels = max_channels(
        device
            .supported_input_configs()
            .ok()
            .into_iter()
            .flatten()
            .map(|c| c.channels()),
    );
    let max_output_channels = max_channels(
        device
            .supported_output_configs()
            .ok()
            .into_iter()
            .flatten()
            .map(|c| c.channels()),
    );

    DeviceDescriptor {
        id: index.to_string(),
        name,
        host_api: host_api.to_string(),
        max_input_channels,
        max_output_channels,
    }
}

/// Largest channel count among a device's supported configs (0 if none).
pub(crate) fn max_channels(counts: impl Iterator<Item = u16>) -> u16 {
    counts.max().unwrap_or(0)
}

/// Index of the device whose id, or failing that whose name, equals `device_id`.
pub(crate) fn match_device(devices: &[&DeviceDescriptor], device_id: &str) -> Option<usize> {
    let wanted = device_id.trim();
    devices
        .iter()
        .position(|d| d.id == wanted)
        .or_else(|| devices.iter().position(|d| d.name == wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, name: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            id: id.into(),
            name: name.into(),
            host_api: "ALSA".into(),
            max_input_channels: 2,
            max_output_channels: 0,
        }
    }

    #[test]
    fn max_channels_of_no_configs_is_zero() {
        assert_eq!(max_channels(std::iter::empty()), 0);
        assert_eq!(max_channels([1, 8, 2].into_iter()), 8);
    }

    #[test]
    fn match_by_id_then_name() {
        let a = device("0", "default");
        let b = device("1", "pulse");
        let c = device("2", "1");
        let devices = [&a, &b, &c];

        assert_eq!(match_device(&devices, "1"), Some(1));
        assert_eq!(match_device(&devices, " 2 "), Some(2));
        assert_eq!(match_device(&devices, "pulse"), Some(1));
        assert_eq!(match_device(&devices, "hw:0"), None);
    }
}
