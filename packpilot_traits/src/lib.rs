pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// One end of the sensor serial link: a source of ASCII text lines.
///
/// `read_line` blocks for at most `timeout` and returns:
/// - `Ok(Some(line))` when a complete line arrived (without the trailing newline),
/// - `Ok(None)` on a quiet timeout or a still-incomplete line (transient, try again),
/// - `Err(_)` only on a hard link failure (port closed, device detached).
pub trait Transport {
    /// Discard any input buffered by the OS/driver before the first read.
    fn clear_input(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn read_line(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Relay actuator bank addressed by wire identity (1=heater, 2=solenoid, 3=pump, 4=load).
pub trait Relays {
    fn drive(
        &mut self,
        relay_id: u8,
        on: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
