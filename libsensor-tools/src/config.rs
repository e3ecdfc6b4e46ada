use std::io;

/// Sensor configuration, backed by a TOML document
///
/// Keys are addressed by dotted paths (`detect.syn_threshold`), so that sections of
/// the file map to components of the sensor.
pub struct Config {
    value: toml::Value,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            value: toml::Value::Table(toml::map::Map::new()),
        }
    }
}

impl Config {
    fn lookup<T: AsRef<str>>(&self, k: T) -> Option<&toml::Value> {
        let mut item = &self.value;
        for key in k.as_ref().split('.') {
            item = item.get(key)?;
        }
        Some(item)
    }

    /// Test if an entry exists, whatever its type
    pub fn contains<T: AsRef<str>>(&self, k: T) -> bool {
        self.lookup(k).is_some()
    }

    /// Get an entry by path. If the input argument contains dots, the path is split
    /// into keys, each key being requested recursively.
    pub fn get<T: AsRef<str>>(&self, k: T) -> Option<&str> {
        self.lookup(k)?.as_str()
    }

    /// Get an entry of type integer by path
    pub fn get_usize<T: AsRef<str>>(&self, k: T) -> Option<usize> {
        self.lookup(k)?
            .as_integer()
            .and_then(|i| usize::try_from(i).ok())
    }

    /// Get an entry of type boolean by path
    pub fn get_bool<T: AsRef<str>>(&self, k: T) -> Option<bool> {
        self.lookup(k)?.as_bool()
    }

    /// Get a list of port numbers by path
    ///
    /// Returns `None` if the entry is missing, or if any element is not a valid port.
    pub fn get_u16_list<T: AsRef<str>>(&self, k: T) -> Option<Vec<u16>> {
        self.lookup(k)?
            .as_array()?
            .iter()
            .map(|v| v.as_integer().and_then(|i| u16::try_from(i).ok()))
            .collect()
    }

    /// Set an entry by path, creating intermediate tables if needed.
    ///
    /// An existing non-table value on the path is replaced by a table.
    pub fn set<T: AsRef<str>, V: Into<toml::Value>>(&mut self, k: T, v: V) {
        let mut keys: Vec<&str> = k.as_ref().split('.').collect();
        let last = match keys.pop() {
            Some(last) => last,
            None => return,
        };
        let mut item = &mut self.value;
        for key in keys {
            if !item.is_table() {
                *item = toml::Value::Table(toml::map::Map::new());
            }
            let toml::Value::Table(table) = item else {
                return;
            };
            item = table
                .entry(key.to_owned())
                .or_insert(toml::Value::Table(toml::map::Map::new()));
        }
        if !item.is_table() {
            *item = toml::Value::Table(toml::map::Map::new());
        }
        if let toml::Value::Table(table) = item {
            table.insert(last.to_owned(), v.into());
        }
    }

    /// Load configuration from input object. If keys are already present, they are overwritten
    pub fn load_config<R: io::Read>(&mut self, mut config: R) -> Result<(), io::Error> {
        let mut s = String::new();
        config.read_to_string(&mut s)?;
        match toml::from_str::<toml::Table>(&s) {
            Ok(table) => {
                self.value = toml::Value::Table(table);
                Ok(())
            }
            Err(e) => {
                warn!("Could not parse configuration: {}", e);
                Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "Load configuration failed",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    const SAMPLE: &str = r#"
log_file = "sensor.log"

[detect]
syn_threshold = 20
icmp_exempt_private = true
safe_ports = [80, 443]

[dns]
ttl_secs = -1
"#;

    #[test]
    fn config_dotted_paths() {
        let mut config = Config::default();
        config.load_config(SAMPLE.as_bytes()).expect("load");
        assert_eq!(config.get("log_file"), Some("sensor.log"));
        assert_eq!(config.get_usize("detect.syn_threshold"), Some(20));
        assert_eq!(config.get_bool("detect.icmp_exempt_private"), Some(true));
        assert_eq!(config.get_u16_list("detect.safe_ports"), Some(vec![80, 443]));
        // negative values are not valid sizes
        assert_eq!(config.get_usize("dns.ttl_secs"), None);
        assert_eq!(config.get_usize("detect.missing"), None);
    }

    #[test]
    fn config_set_overrides() {
        let mut config = Config::default();
        config.load_config(SAMPLE.as_bytes()).expect("load");
        config.set("detect.syn_threshold", 5i64);
        config.set("output.alert_log", "/tmp/alerts.log");
        config.set("dns.enabled", false);
        assert_eq!(config.get_usize("detect.syn_threshold"), Some(5));
        assert_eq!(config.get("output.alert_log"), Some("/tmp/alerts.log"));
        assert_eq!(config.get_bool("dns.enabled"), Some(false));
        // untouched keys survive
        assert_eq!(config.get_bool("detect.icmp_exempt_private"), Some(true));
    }

    #[test]
    fn config_rejects_garbage() {
        let mut config = Config::default();
        assert!(config.load_config("[detect\nsyn = ".as_bytes()).is_err());
    }
}
