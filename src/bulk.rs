//! Streams a byte source to a bulk OUT endpoint in fixed-size chunks.

use crate::device::{Device, Endpoint};
use crate::error::{Error, Result};
use crate::operation::Operation;
use std::io::{self, Read};

/// Fills `buffer` from `source` until it is full or the source is exhausted. Returns the number of
/// bytes read, which is only less than the buffer length at the end of the source.
fn fill<R: Read>(source: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match source.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Writes everything a reader produces to a bulk endpoint, one transfer per chunk.
pub struct StreamWrite<'a, D: ?Sized, R> {
    device: &'a mut D,
    endpoint: Endpoint,
    source: R,
    buffer: Vec<u8>,
    sent: usize,
    chunks: usize,
    done: bool,
}

impl<'a, D: Device + ?Sized, R: Read> StreamWrite<'a, D, R> {
    /// Prepares a stream. `chunk_size` must not be zero.
    pub fn new(device: &'a mut D, endpoint: Endpoint, source: R, chunk_size: usize) -> Self {
        Self {
            device,
            endpoint,
            source,
            buffer: vec![0; chunk_size],
            sent: 0,
            chunks: 0,
            done: chunk_size == 0,
        }
    }

    /// Number of bulk transfers completed so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }
}

impl<D: Device + ?Sized, R: Read> Operation for StreamWrite<'_, D, R> {
    fn transferred(&self) -> usize {
        self.sent
    }
}

impl<D: Device + ?Sized, R: Read> Iterator for StreamWrite<'_, D, R> {
    type Item = Result<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let length = match fill(&mut self.source, &mut self.buffer) {
            Ok(0) => {
                self.done = true;
                return None;
            }
            Ok(length) => length,
            Err(error) => {
                self.done = true;
                return Some(Err(error.into()));
            }
        };

        // A partially filled buffer means the source is exhausted
        if length < self.buffer.len() {
            self.done = true;
        }

        Some(
            match self
                .device
                .bulk_write(self.endpoint, &self.buffer[..length])
            {
                Ok(written) if written == length => {
                    self.sent += length;
                    self.chunks += 1;
                    Ok(self.sent)
                }
                Ok(written) => {
                    self.done = true;
                    Err(Error::ShortWrite {
                        expected: length,
                        actual: written,
                    })
                }
                Err(error) => {
                    self.done = true;
                    Err(error)
                }
            },
        )
    }
}

/// Outcome of streaming a source to an endpoint.
#[derive(Debug)]
pub struct StreamReport {
    /// Bytes transferred before the stream ended or was abandoned.
    pub sent: usize,

    /// Number of bulk transfers issued successfully.
    pub chunks: usize,

    /// The error which ended the stream early, if any.
    pub error: Option<Error>,
}

/// Sends the complete contents of `source` to `endpoint` in transfers of `chunk_size` bytes. The
/// first failing transfer abandons the rest of the source.
pub fn send_stream<D: Device + ?Sized, R: Read>(
    device: &mut D,
    endpoint: Endpoint,
    source: R,
    chunk_size: usize,
) -> StreamReport {
    let mut stream = StreamWrite::new(device, endpoint, source, chunk_size);
    let error = stream.execute().err();
    StreamReport {
        sent: stream.transferred(),
        chunks: stream.chunks(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockDevice};

    fn written_lengths(device: &MockDevice) -> Vec<usize> {
        device
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::BulkWrite { data, .. } => Some(data.len()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn splits_source_into_chunks() {
        let mut device = MockDevice::new();
        let data = vec![0x5a; 130];
        let report = send_stream(&mut device, Endpoint::bulk_out(2), &data[..], 64);
        assert!(report.error.is_none());
        assert_eq!(report.sent, 130);
        assert_eq!(report.chunks, 3);
        assert_eq!(written_lengths(&device), vec![64, 64, 2]);
    }

    #[test]
    fn exact_multiple_needs_no_empty_transfer() {
        let mut device = MockDevice::new();
        let report = send_stream(&mut device, Endpoint::bulk_out(2), &[1u8; 128][..], 64);
        assert_eq!(report.sent, 128);
        assert_eq!(written_lengths(&device), vec![64, 64]);
    }

    #[test]
    fn failed_write_abandons_stream() {
        let mut device = MockDevice::new();
        device.fail_write_at = Some(1);
        let report = send_stream(&mut device, Endpoint::bulk_out(2), &[0u8; 130][..], 64);
        assert_eq!(report.sent, 64);
        assert_eq!(report.chunks, 1);
        assert!(report.error.is_some());
        assert_eq!(written_lengths(&device), vec![64, 64]);
    }

    #[test]
    fn short_write_is_an_error() {
        let mut device = MockDevice::new();
        device.short_write_at = Some(0);
        let report = send_stream(&mut device, Endpoint::bulk_out(2), &[0u8; 10][..], 64);
        assert_eq!(report.sent, 0);
        assert!(matches!(
            report.error,
            Some(Error::ShortWrite {
                expected: 10,
                actual: 9
            })
        ));
    }

    #[test]
    fn empty_source_sends_nothing() {
        let mut device = MockDevice::new();
        let report = send_stream(&mut device, Endpoint::bulk_out(2), io::empty(), 64);
        assert!(report.error.is_none());
        assert_eq!(report.sent, 0);
        assert!(device.calls.is_empty());
    }

    #[test]
    fn stream_yields_running_totals() {
        let mut device = MockDevice::new();
        let stream = StreamWrite::new(&mut device, Endpoint::bulk_out(4), &[0u8; 5][..], 2);
        let totals: Vec<usize> = stream.map(|step| step.unwrap()).collect();
        assert_eq!(totals, vec![2, 4, 5]);
    }
}
