use log::{debug, error, info, warn};
use oddball_core::{line_states, TriggerTable};
use oddball_timing::Timer;
use serialport::SerialPort;
use std::io::{self, Write};
use std::time::Duration;

/// Output lines carrying the 8-bit trigger code to the EEG recorder.
pub trait TriggerPort: Send {
    fn write(&mut self, value: u8) -> io::Result<()>;
}

impl<P: TriggerPort + ?Sized> TriggerPort for Box<P> {
    fn write(&mut self, value: u8) -> io::Result<()> {
        (**self).write(value)
    }
}

/// USB/serial trigger box that mirrors each received byte onto its
/// eight output lines.
pub struct SerialTriggerPort {
    port_name: String,
    port: Box<dyn SerialPort>,
}

impl SerialTriggerPort {
    pub fn open(port_name: &str, baud_rate: u32) -> serialport::Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(50))
            .open()?;
        let mut this = Self {
            port_name: port_name.to_string(),
            port,
        };
        // all lines low before the first pulse
        if let Err(e) = this.write(0) {
            warn!("could not reset trigger port {}: {}", this.port_name, e);
        }
        Ok(this)
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl TriggerPort for SerialTriggerPort {
    fn write(&mut self, value: u8) -> io::Result<()> {
        self.port.write_all(&[value])?;
        self.port.flush()
    }
}

/// Output lines as a bit string, line 7 first.
fn line_pattern(code: u8) -> String {
    line_states(code)
        .iter()
        .rev()
        .map(|high| if *high { '1' } else { '0' })
        .collect()
}

/// Stand-in used when no trigger hardware is attached.
#[derive(Debug, Default)]
pub struct DummyTriggerPort;

impl TriggerPort for DummyTriggerPort {
    fn write(&mut self, value: u8) -> io::Result<()> {
        if value != 0 {
            info!("sent DUMMY trigger S{} lines {}", value, line_pattern(value));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentTrigger {
    pub name: String,
    pub code: u8,
    pub at: Duration,
}

/// Maps event names to codes and pulses them on the port.
pub struct TriggerEncoder<T: Timer> {
    table: TriggerTable,
    port: Box<dyn TriggerPort>,
    timer: T,
    pulse_width: Duration,
    sent: Vec<SentTrigger>,
}

impl<T: Timer> TriggerEncoder<T> {
    pub fn new(table: TriggerTable, port: Box<dyn TriggerPort>, timer: T, pulse_width: Duration) -> Self {
        Self {
            table,
            port,
            timer,
            pulse_width,
            sent: Vec::new(),
        }
    }

    /// Sends the pulse for `name`. Unknown names are logged and skipped;
    /// port failures are logged and never reach the caller.
    pub fn send(&mut self, name: &str) -> Option<u8> {
        let Some(code) = self.table.code(name) else {
            warn!("trigger name is not defined: {}", name);
            return None;
        };
        let at = self.timer.now();
        if let Err(e) = self.port.write(code) {
            error!("trigger {} (S{}) failed: {}", name, code, e);
            return None;
        }
        self.timer.sleep(self.pulse_width);
        if let Err(e) = self.port.write(0) {
            error!("could not reset trigger lines after {}: {}", name, e);
        }
        debug!("trigger {} -> S{} at {:.3}s", name, code, at.as_secs_f64());
        self.sent.push(SentTrigger {
            name: name.to_string(),
            code,
            at,
        });
        Some(code)
    }

    pub fn table(&self) -> &TriggerTable {
        &self.table
    }

    pub fn sent(&self) -> &[SentTrigger] {
        &self.sent
    }
}
