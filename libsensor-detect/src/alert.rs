use chrono::{Local, TimeZone};
use libsensor_tools::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::ser::{CharEscape, CompactFormatter, Formatter};
use std::fmt;
use std::io;
use std::net::Ipv4Addr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "ICMP")]
    Icmp,
}

/// One alert, serialized as a single JSON line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Local time of the triggering frame, `YYYY-MM-DD HH:MM:SS`
    pub time: String,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub proto: Protocol,
    pub severity: Severity,
    pub desc: String,
    /// Remote host, when enrichment was attempted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl Alert {
    pub fn new(
        ts: Timestamp,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
        proto: Protocol,
        severity: Severity,
        desc: String,
    ) -> Alert {
        Alert {
            time: format_time(ts),
            src_ip,
            dst_ip,
            proto,
            severity,
            desc,
            host: None,
        }
    }

    /// Set the enriched host name; an empty name leaves the field out
    pub fn with_host(self, host: String) -> Alert {
        let host = if host.is_empty() { None } else { Some(host) };
        Alert { host, ..self }
    }

    /// Serialize to one line of JSON (without the trailing newline)
    ///
    /// Control characters are always written as `\uXXXX`, except `\n`, `\r` and `\t`.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::with_capacity(256);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, ControlEscapes);
        self.serialize(&mut ser)?;
        // serde_json only writes valid UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Render a capture timestamp in local time
pub fn format_time(ts: Timestamp) -> String {
    let dt = Local
        .timestamp_opt(i64::from(ts.secs), ts.micros.saturating_mul(1000))
        .earliest()
        .unwrap_or_else(Local::now);
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

struct ControlEscapes;

impl Formatter for ControlEscapes {
    fn write_char_escape<W>(&mut self, writer: &mut W, char_escape: CharEscape) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match char_escape {
            CharEscape::Backspace => writer.write_all(b"\\u0008"),
            CharEscape::FormFeed => writer.write_all(b"\\u000c"),
            other => CompactFormatter.write_char_escape(writer, other),
        }
    }
}
