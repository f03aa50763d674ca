//! The device capability the command engine drives.

use crate::error::Result;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Bit 7 of an endpoint address marks the device-to-host (IN) direction.
const DIRECTION_IN: u8 = 0x80;

/// Highest endpoint number (exclusive) accepted from the user.
pub const ENDPOINT_LIMIT: i64 = 127;

/// A bulk endpoint address with its direction bit already applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Endpoint(u8);

impl Endpoint {
    /// IN endpoint for a user-supplied endpoint number. The direction bit is always set.
    pub fn bulk_in(number: u8) -> Self {
        Endpoint(number | DIRECTION_IN)
    }

    /// OUT endpoint for a user-supplied endpoint number. The direction bit is always cleared.
    pub fn bulk_out(number: u8) -> Self {
        Endpoint(number & !DIRECTION_IN)
    }

    /// The raw endpoint address as used on the bus.
    pub fn address(self) -> u8 {
        self.0
    }

    pub fn is_in(self) -> bool {
        self.0 & DIRECTION_IN != 0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Statistics of a benchmarked bulk read.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BenchStats {
    /// Total number of bytes received.
    pub bytes: usize,

    /// Number of bulk transfers issued.
    pub chunks: usize,

    /// Number of transfers which returned less data than requested.
    pub short_reads: usize,

    /// Time spent inside the transfer calls.
    pub elapsed: Duration,
}

impl BenchStats {
    /// Average throughput in bytes per second, or `None` if no time has elapsed.
    pub fn bytes_per_second(&self) -> Option<f64> {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            Some(self.bytes as f64 / seconds)
        } else {
            None
        }
    }
}

impl fmt::Display for BenchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Read {} bytes in {} chunks in {:.3} s",
            self.bytes,
            self.chunks,
            self.elapsed.as_secs_f64()
        )?;
        if let Some(rate) = self.bytes_per_second() {
            write!(f, " ({:.1} kb/s)", rate / 1024.0)?;
        }
        if self.short_reads > 0 {
            write!(f, ", {} short reads", self.short_reads)?;
        }
        Ok(())
    }
}

/// Operations a connected target offers to the command engine.
///
/// All calls block until the transfer is complete. Implementations must not retry failed
/// transfers.
pub trait Device {
    /// Holds the target's CPU in reset (`run == false`) or releases it (`run == true`).
    fn reset(&mut self, run: bool) -> Result<()>;

    /// Loads an Intel hex image into the target. The target is left in reset.
    fn program(&mut self, path: &Path) -> Result<()>;

    fn read_ram(&mut self, address: u32, length: usize) -> Result<Vec<u8>>;

    fn write_ram(&mut self, address: u32, data: &[u8]) -> Result<()>;

    /// Reads up to `length` bytes from a bulk IN endpoint. Unless `allow_short` is set, receiving
    /// fewer bytes is an error.
    fn bulk_read(&mut self, endpoint: Endpoint, length: usize, allow_short: bool)
        -> Result<Vec<u8>>;

    /// Writes a buffer as a single bulk transfer and returns the number of bytes written.
    fn bulk_write(&mut self, endpoint: Endpoint, data: &[u8]) -> Result<usize>;

    /// Reads `total` bytes in transfers of at most `chunk_size` bytes and measures the time spent.
    fn benchmarked_bulk_read(
        &mut self,
        endpoint: Endpoint,
        total: usize,
        chunk_size: usize,
    ) -> Result<BenchStats>;

    /// Selects the alternate interface used for subsequent bulk transfers. `None` restores the
    /// device default.
    fn force_alt_interface(&mut self, alt: Option<u8>);

    /// Sends a zero-length control transfer.
    fn control_transfer(&mut self, request_type: u8, request: u8, value: u16, index: u16)
        -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_is_normalized() {
        assert_eq!(Endpoint::bulk_in(1).address(), 0x81);
        assert_eq!(Endpoint::bulk_in(0x86).address(), 0x86);
        assert_eq!(Endpoint::bulk_out(0x82).address(), 0x02);
        assert!(Endpoint::bulk_in(6).is_in());
        assert!(!Endpoint::bulk_out(6).is_in());
        assert_eq!(Endpoint::bulk_in(2).to_string(), "0x82");
    }

    #[test]
    fn throughput() {
        let stats = BenchStats {
            bytes: 2 * 1024 * 1024,
            chunks: 32,
            short_reads: 0,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(stats.bytes_per_second(), Some(1024.0 * 1024.0));
        assert_eq!(
            stats.to_string(),
            "Read 2097152 bytes in 32 chunks in 2.000 s (1024.0 kb/s)"
        );
        assert_eq!(BenchStats::default().bytes_per_second(), None);
    }
}
