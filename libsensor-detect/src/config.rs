use crate::dns::DEFAULT_DNS_TTL;
use crate::icmp::{DEFAULT_ICMP_THRESHOLD, DEFAULT_ICMP_WINDOW};
use crate::output::DEFAULT_ALERT_LOG;
use crate::policy::DEFAULT_SAFE_PORTS;
use crate::scan::{DEFAULT_SYN_THRESHOLD, DEFAULT_SYN_WINDOW};
use libsensor_tools::{Config, Error};
use std::path::PathBuf;
use std::time::Duration;

/// Detection parameters, read from the `detect`, `dns` and `output` sections
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectionConfig {
    pub syn_threshold: u32,
    pub syn_window: Duration,
    pub icmp_threshold: u32,
    pub icmp_window: Duration,
    pub icmp_exempt_private: bool,
    pub max_tracked_flows: usize,
    pub safe_ports: Vec<u16>,

    pub dns_enabled: bool,
    pub dns_ttl: Duration,
    pub dns_timeout: Duration,
    pub dns_cache_size: usize,

    pub alert_log: Option<PathBuf>,
    pub alert_stdout: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            syn_threshold: DEFAULT_SYN_THRESHOLD,
            syn_window: DEFAULT_SYN_WINDOW,
            icmp_threshold: DEFAULT_ICMP_THRESHOLD,
            icmp_window: DEFAULT_ICMP_WINDOW,
            icmp_exempt_private: false,
            max_tracked_flows: 65536,
            safe_ports: DEFAULT_SAFE_PORTS.to_vec(),
            dns_enabled: true,
            dns_ttl: DEFAULT_DNS_TTL,
            dns_timeout: Duration::from_millis(1000),
            dns_cache_size: 4096,
            alert_log: Some(PathBuf::from(DEFAULT_ALERT_LOG)),
            alert_stdout: true,
        }
    }
}

fn invalid(key: &str, expected: &str) -> Error {
    Error::Config(format!("{key}: expected {expected}"))
}

fn get_usize(config: &Config, key: &str, default: usize) -> Result<usize, Error> {
    match config.get_usize(key) {
        Some(v) => Ok(v),
        None if config.contains(key) => Err(invalid(key, "a non-negative integer")),
        None => Ok(default),
    }
}

fn get_u32(config: &Config, key: &str, default: u32) -> Result<u32, Error> {
    let v = get_usize(config, key, default as usize)?;
    u32::try_from(v).map_err(|_| Error::Config(format!("{key}: value out of range")))
}

fn get_bool(config: &Config, key: &str, default: bool) -> Result<bool, Error> {
    match config.get_bool(key) {
        Some(v) => Ok(v),
        None if config.contains(key) => Err(invalid(key, "a boolean")),
        None => Ok(default),
    }
}

fn get_millis(config: &Config, key: &str, default: Duration) -> Result<Duration, Error> {
    let ms = get_usize(config, key, default.as_millis() as usize)?;
    Ok(Duration::from_millis(ms as u64))
}

fn get_secs(config: &Config, key: &str, default: Duration) -> Result<Duration, Error> {
    let secs = get_usize(config, key, default.as_secs() as usize)?;
    Ok(Duration::from_secs(secs as u64))
}

impl DetectionConfig {
    /// Read detection parameters. A key present with the wrong type is an error.
    pub fn from_config(config: &Config) -> Result<DetectionConfig, Error> {
        let d = DetectionConfig::default();
        let safe_ports = match config.get_u16_list("detect.safe_ports") {
            Some(ports) => ports,
            None if config.contains("detect.safe_ports") => {
                return Err(invalid("detect.safe_ports", "a list of ports"))
            }
            None => d.safe_ports,
        };
        let alert_log = match config.get("output.alert_log") {
            Some("") => None,
            Some(path) => Some(PathBuf::from(path)),
            None if config.contains("output.alert_log") => {
                return Err(invalid("output.alert_log", "a path"))
            }
            None => d.alert_log,
        };
        Ok(DetectionConfig {
            syn_threshold: get_u32(config, "detect.syn_threshold", d.syn_threshold)?,
            syn_window: get_millis(config, "detect.syn_window_ms", d.syn_window)?,
            icmp_threshold: get_u32(config, "detect.icmp_threshold", d.icmp_threshold)?,
            icmp_window: get_secs(config, "detect.icmp_window_secs", d.icmp_window)?,
            icmp_exempt_private: get_bool(
                config,
                "detect.icmp_exempt_private",
                d.icmp_exempt_private,
            )?,
            max_tracked_flows: get_usize(config, "detect.max_tracked_flows", d.max_tracked_flows)?,
            safe_ports,
            dns_enabled: get_bool(config, "dns.enabled", d.dns_enabled)?,
            dns_ttl: get_secs(config, "dns.ttl_secs", d.dns_ttl)?,
            dns_timeout: get_millis(config, "dns.timeout_ms", d.dns_timeout)?,
            dns_cache_size: get_usize(config, "dns.cache_size", d.dns_cache_size)?,
            alert_log,
            alert_stdout: get_bool(config, "output.stdout", d.alert_stdout)?,
        })
    }
}
