use crate::device::{BenchStats, Device, Endpoint};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// A call received by the [`MockDevice`], together with the alternate interface in effect.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Reset(bool),
    Program(PathBuf),
    ReadRam(u32, usize),
    WriteRam(u32, Vec<u8>),
    BulkRead {
        endpoint: Endpoint,
        length: usize,
        allow_short: bool,
        alt: Option<u8>,
    },
    BulkWrite {
        endpoint: Endpoint,
        data: Vec<u8>,
        alt: Option<u8>,
    },
    Bench {
        endpoint: Endpoint,
        total: usize,
        chunk_size: usize,
        alt: Option<u8>,
    },
    ForceAlt(Option<u8>),
    Control(u8, u8, u16, u16),
}

/// In-memory stand-in for a target which records every call.
pub struct MockDevice {
    pub calls: Vec<Call>,

    /// Target RAM backing `read_ram` and `write_ram`.
    pub ram: Vec<u8>,

    /// Responses for successive bulk reads. Once exhausted, reads return zeros.
    pub reads: VecDeque<Result<Vec<u8>>>,

    /// Index of the bulk write which fails, counting from zero.
    pub fail_write_at: Option<usize>,

    /// Index of the bulk write which transfers one byte less than requested.
    pub short_write_at: Option<usize>,

    pub fail_reset: bool,

    pub bench: BenchStats,

    writes: usize,
    alt: Option<u8>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            ram: vec![0; 0x10000],
            reads: VecDeque::new(),
            fail_write_at: None,
            short_write_at: None,
            fail_reset: false,
            bench: BenchStats::default(),
            writes: 0,
            alt: None,
        }
    }
}

impl Device for MockDevice {
    fn reset(&mut self, run: bool) -> Result<()> {
        self.calls.push(Call::Reset(run));
        if self.fail_reset {
            Err(Error::Usb(rusb::Error::NoDevice))
        } else {
            Ok(())
        }
    }

    fn program(&mut self, path: &Path) -> Result<()> {
        self.calls.push(Call::Program(path.to_path_buf()));
        Ok(())
    }

    fn read_ram(&mut self, address: u32, length: usize) -> Result<Vec<u8>> {
        self.calls.push(Call::ReadRam(address, length));
        let start = address as usize;
        self.ram
            .get(start..start + length)
            .map(|bytes| bytes.to_vec())
            .ok_or(Error::InvalidRequest)
    }

    fn write_ram(&mut self, address: u32, data: &[u8]) -> Result<()> {
        self.calls.push(Call::WriteRam(address, data.to_vec()));
        let start = address as usize;
        self.ram
            .get_mut(start..start + data.len())
            .ok_or(Error::InvalidRequest)?
            .copy_from_slice(data);
        Ok(())
    }

    fn bulk_read(
        &mut self,
        endpoint: Endpoint,
        length: usize,
        allow_short: bool,
    ) -> Result<Vec<u8>> {
        self.calls.push(Call::BulkRead {
            endpoint,
            length,
            allow_short,
            alt: self.alt,
        });
        let data = match self.reads.pop_front() {
            Some(response) => response?,
            None => vec![0; length],
        };
        if data.len() < length && !allow_short {
            return Err(Error::ShortRead {
                expected: length,
                actual: data.len(),
            });
        }
        Ok(data)
    }

    fn bulk_write(&mut self, endpoint: Endpoint, data: &[u8]) -> Result<usize> {
        self.calls.push(Call::BulkWrite {
            endpoint,
            data: data.to_vec(),
            alt: self.alt,
        });
        let index = self.writes;
        self.writes += 1;
        if self.fail_write_at == Some(index) {
            Err(Error::Usb(rusb::Error::Pipe))
        } else if self.short_write_at == Some(index) {
            Ok(data.len().saturating_sub(1))
        } else {
            Ok(data.len())
        }
    }

    fn benchmarked_bulk_read(
        &mut self,
        endpoint: Endpoint,
        total: usize,
        chunk_size: usize,
    ) -> Result<BenchStats> {
        self.calls.push(Call::Bench {
            endpoint,
            total,
            chunk_size,
            alt: self.alt,
        });
        Ok(self.bench)
    }

    fn force_alt_interface(&mut self, alt: Option<u8>) {
        self.calls.push(Call::ForceAlt(alt));
        self.alt = alt;
    }

    fn control_transfer(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
    ) -> Result<()> {
        self.calls
            .push(Call::Control(request_type, request, value, index));
        Ok(())
    }
}
