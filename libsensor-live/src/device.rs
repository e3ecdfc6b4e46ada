use crate::error::CaptureError;
use std::fmt;

/// A capture device, as enumerated by libpcap
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub description: Option<String>,
}

impl From<&pcap::Device> for DeviceInfo {
    fn from(dev: &pcap::Device) -> Self {
        DeviceInfo {
            name: dev.name.clone(),
            description: dev.desc.clone(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.description {
            Some(desc) if !desc.is_empty() => write!(f, "{} ({})", desc, self.name),
            _ => f.write_str(&self.name),
        }
    }
}

/// List capture devices, in libpcap enumeration order
pub fn list_devices() -> Result<Vec<DeviceInfo>, CaptureError> {
    let devices = pcap::Device::list().map_err(CaptureError::DeviceList)?;
    Ok(devices.iter().map(DeviceInfo::from).collect())
}

/// Convert a 1-based device number into an index in `devices`
pub fn select_device(index: usize, devices: &[DeviceInfo]) -> Result<usize, CaptureError> {
    if devices.is_empty() {
        return Err(CaptureError::NoDevices);
    }
    match index.checked_sub(1) {
        Some(i) if i < devices.len() => Ok(i),
        _ => Err(CaptureError::DeviceNotFound {
            index,
            available: devices.to_vec(),
        }),
    }
}

/// Render a device list for operators, numbered from 1
pub fn format_device_list(devices: &[DeviceInfo]) -> String {
    devices
        .iter()
        .enumerate()
        .map(|(i, dev)| format!("   {}: {}\n", i + 1, dev))
        .collect()
}
