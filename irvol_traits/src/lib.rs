pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Sends one opaque IR payload to the device.
///
/// Implementations own the link to the blaster (network socket, serial port,
/// simulator). Errors are surfaced as-is; callers do not retry.
pub trait Transmitter {
    fn send(&mut self, payload: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Transmitter + ?Sized> Transmitter for Box<T> {
    fn send(&mut self, payload: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).send(payload)
    }
}
