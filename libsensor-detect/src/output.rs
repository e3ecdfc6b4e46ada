use crate::alert::Alert;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use tracing::{error, info, warn};

pub const DEFAULT_ALERT_LOG: &str = "intrusion_alerts.log";

struct AlertSink {
    name: String,
    writer: Box<dyn Write>,
}

/// Writes alerts, one JSON line each, to every configured sink
///
/// Each line is flushed as soon as it is written. A sink that fails is dropped;
/// the remaining sinks keep receiving alerts.
#[derive(Default)]
pub struct AlertEmitter {
    sinks: Vec<AlertSink>,
    emitted: usize,
}

impl AlertEmitter {
    pub fn new() -> Self {
        AlertEmitter::default()
    }

    pub fn add_sink<S: Into<String>>(&mut self, name: S, writer: Box<dyn Write>) {
        self.sinks.push(AlertSink {
            name: name.into(),
            writer,
        });
    }

    pub fn add_stdout(&mut self) {
        self.add_sink("stdout", Box::new(io::stdout()));
    }

    /// Open `path` in append mode and add it as a sink
    ///
    /// Failure is not fatal: a warning is logged and the error returned.
    pub fn add_log_file<P: AsRef<Path>>(&mut self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                info!("Writing alerts to {}", path.display());
                self.add_sink(path.display().to_string(), Box::new(file));
                Ok(())
            }
            Err(e) => {
                warn!("Could not open alert log {}: {e}", path.display());
                Err(e)
            }
        }
    }

    pub fn emit(&mut self, alert: &Alert) {
        let mut line = match alert.to_json_line() {
            Ok(line) => line,
            Err(e) => {
                error!("Could not serialize alert: {e}");
                return;
            }
        };
        line.push('\n');
        self.sinks.retain_mut(|sink| {
            let res = sink
                .writer
                .write_all(line.as_bytes())
                .and_then(|_| sink.writer.flush());
            match res {
                Ok(()) => true,
                Err(e) => {
                    warn!("Alert sink {} failed ({e}), disabling it", sink.name);
                    false
                }
            }
        });
        self.emitted += 1;
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Number of alerts emitted so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}
