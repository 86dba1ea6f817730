/*!
    adapter running a link role on a host machine over a usb-serial dongle,
    using serial2-tokio for the port and tokio for time.
*/

use core::time::Duration;
use std::{path::Path, time::Instant, vec::Vec};

use serial2_tokio::{CharSize, Parity, SerialPort, StopBits};

use crate::hal::{Clock, SerialLink};

/// probe window standing in for a hardware "data available" flag
const PROBE: Duration = Duration::from_millis(1);

/// serial port exposed as a [SerialLink]
pub struct HostLink {
    port: SerialPort,
    pending: Vec<u8>,
}

impl HostLink {
    /// open the given serial port file in raw 8N1 mode at the given baud rate
    pub fn open(path: impl AsRef<Path>, rate: u32) -> Result<Self, std::io::Error> {
        let port = SerialPort::open(path, |mut settings: serial2_tokio::Settings| {
                settings.set_raw();
                settings.set_baud_rate(rate)?;
                settings.set_char_size(CharSize::Bits8);
                settings.set_stop_bits(StopBits::One);
                settings.set_parity(Parity::None);
                Ok(settings)
                })?;
        Ok(Self {port, pending: Vec::new()})
    }
}

impl SerialLink for HostLink {
    type Error = std::io::Error;

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.port.write_all(bytes).await
    }
    /// the port exposes no availability flag, probe it with a bounded read
    /// and stash whatever arrives for the next [read](SerialLink::read)
    async fn has_data(&mut self) -> Result<bool, Self::Error> {
        if ! self.pending.is_empty() {
            return Ok(true)
        }
        let mut probe = [0u8; 256];
        match tokio::time::timeout(PROBE, self.port.read(&mut probe)).await {
            Err(_elapsed) => Ok(false),
            Ok(Ok(0)) => Ok(false),
            Ok(Ok(count)) => {
                self.pending.extend_from_slice(&probe[.. count]);
                Ok(true)
            },
            Ok(Err(error)) => Err(error),
        }
    }
    async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let count = self.pending.len().min(buffer.len());
        buffer[.. count].copy_from_slice(&self.pending[.. count]);
        self.pending.drain(.. count);
        Ok(count)
    }
}

/// monotonic clock over the tokio runtime
pub struct HostClock {
    start: Instant,
}

impl Default for HostClock {
    fn default() -> Self {
        Self {start: Instant::now()}
    }
}

impl Clock for HostClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}
