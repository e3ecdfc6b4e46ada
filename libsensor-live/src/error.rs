use crate::device::DeviceInfo;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("could not list capture devices: {0} (are you running with CAP_NET_RAW?)")]
    DeviceList(pcap::Error),
    #[error("no capture device found")]
    NoDevices,
    #[error("device number {index} not found")]
    DeviceNotFound {
        index: usize,
        available: Vec<DeviceInfo>,
    },
    #[error("unsupported link type {0} on capture device (Ethernet required)")]
    UnsupportedLinkType(i32),
    #[error("capture error: {0}")]
    Pcap(#[from] pcap::Error),
    #[error(transparent)]
    Analyzer(#[from] libsensor_tools::Error),
}
