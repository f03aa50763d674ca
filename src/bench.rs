//! Timed, chunked bulk reads for throughput measurement.

use crate::device::BenchStats;
use crate::error::Result;
use std::time::{Duration, Instant};

/// Upper limit for both the total benchmark length and the chunk size.
pub const MAX_BENCH_LENGTH: usize = 32 * 1024 * 1024;

/// Default number of bytes read by a benchmark.
pub const DEFAULT_BENCH_LENGTH: usize = 1024 * 1024;

/// Default size of a single benchmark transfer.
pub const DEFAULT_BENCH_CHUNK_SIZE: usize = 64 * 1024;

/// Reads `total` bytes in transfers of at most `chunk_size` bytes using `read`, which receives the
/// requested length and returns the number of bytes actually transferred.
///
/// Only the time spent inside `read` is accounted. A transfer returning less than requested is
/// counted as a short read; the loop carries on with the next chunk. A transfer returning nothing
/// ends the loop, since the endpoint has no more data to offer.
pub fn timed_chunks<F>(total: usize, chunk_size: usize, mut read: F) -> Result<BenchStats>
where
    F: FnMut(usize) -> Result<usize>,
{
    let mut stats = BenchStats::default();
    let mut elapsed = Duration::default();
    let mut remaining = total;

    while remaining > 0 && chunk_size > 0 {
        let request = remaining.min(chunk_size);

        let start = Instant::now();
        let received = read(request);
        elapsed += start.elapsed();
        let received = received?;

        stats.chunks += 1;
        stats.bytes += received;
        if received < request {
            stats.short_reads += 1;
        }
        if received == 0 {
            break;
        }
        remaining -= received.min(remaining);
    }

    stats.elapsed = elapsed;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn reads_total_in_chunks() {
        let mut requests = Vec::new();
        let stats = timed_chunks(10, 4, |length| {
            requests.push(length);
            Ok(length)
        })
        .unwrap();
        assert_eq!(requests, vec![4, 4, 2]);
        assert_eq!(stats.bytes, 10);
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.short_reads, 0);
    }

    #[test]
    fn counts_short_reads() {
        let mut requests = Vec::new();
        let stats = timed_chunks(8, 4, |length| {
            requests.push(length);
            Ok(length.min(3))
        })
        .unwrap();
        assert_eq!(requests, vec![4, 4, 2]);
        assert_eq!(stats.bytes, 8);
        assert_eq!(stats.short_reads, 2);
    }

    #[test]
    fn empty_transfer_stops() {
        let stats = timed_chunks(1024, 64, |_| Ok(0)).unwrap();
        assert_eq!(stats.chunks, 1);
        assert_eq!(stats.bytes, 0);
        assert_eq!(stats.short_reads, 1);
    }

    #[test]
    fn error_aborts() {
        let mut calls = 0;
        let result = timed_chunks(1024, 64, |length| {
            calls += 1;
            if calls == 2 {
                Err(Error::Usb(rusb::Error::Timeout))
            } else {
                Ok(length)
            }
        });
        assert!(matches!(result, Err(Error::Usb(rusb::Error::Timeout))));
        assert_eq!(calls, 2);
    }
}
