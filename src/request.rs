//! Validated commands, ready for execution.

use crate::bench::{DEFAULT_BENCH_CHUNK_SIZE, DEFAULT_BENCH_LENGTH, MAX_BENCH_LENGTH};
use crate::command::Command;
use crate::device::{Endpoint, ENDPOINT_LIMIT};
use crate::error::{Error, Result};
use std::convert::TryFrom;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

/// Delay used when `delay` gets no valid duration.
pub const DEFAULT_DELAY_MS: u64 = 250;

/// Largest RAM area a single `dram` dumps.
pub const MAX_RAM_DUMP_LENGTH: usize = 1024 * 1024;

/// Buffer size of a `dbulk` read if none is given.
pub const DEFAULT_BULK_READ_LENGTH: usize = 512;

/// Largest buffer a single `dbulk` read may request.
pub const MAX_BULK_READ_LENGTH: usize = 32 * 1024 * 1024;

/// Chunk size of `fbulk` if none is given.
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 64;

/// Largest chunk `fbulk` sends in one transfer.
pub const MAX_STREAM_CHUNK_SIZE: usize = 2048;

/// A command with all arguments checked and defaults applied.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// Hold the target in reset.
    Reset,

    /// Release the target from reset.
    Run,

    /// Reset the target and load an Intel hex image.
    Program { path: PathBuf },

    /// Block for a while.
    Delay { duration: Duration },

    /// Read and dump target RAM.
    DumpRam { address: u32, length: usize },

    /// Write a single byte of target RAM.
    SetByte { address: u32, value: u8 },

    /// Read and dump `count` buffers from a bulk endpoint.
    DumpBulk {
        endpoint: Endpoint,
        length: usize,
        allow_short: bool,
        count: usize,
    },

    /// Send a literal string as one bulk transfer.
    SendBulk { endpoint: Endpoint, data: Vec<u8> },

    /// Stream a file, or standard input without a path, to a bulk endpoint.
    FileBulk {
        endpoint: Endpoint,
        path: Option<PathBuf>,
        chunk_size: usize,
    },

    /// Measure bulk read throughput.
    BenchBulk {
        endpoint: Endpoint,
        length: usize,
        chunk_size: usize,
    },

    /// Override the alternate interface for bulk transfers, or restore the default.
    AltInterface(Option<u8>),

    /// Send a zero-length control transfer.
    Control {
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
    },
}

/// Argument accessor which reports problems in terms of the command being parsed.
struct Args<'a> {
    command: &'a Command,
    name: &'static str,
}

impl<'a> Args<'a> {
    fn error(&self, reason: impl Into<String>) -> Error {
        Error::invalid_argument(self.name, reason)
    }

    fn int(&self, index: usize) -> Result<Option<i64>> {
        self.command.int_arg(index).map_err(|reason| self.error(reason))
    }

    fn required(&self, index: usize, what: &str, range: RangeInclusive<i64>) -> Result<i64> {
        match self.int(index)? {
            Some(value) if range.contains(&value) => Ok(value),
            Some(value) => Err(self.error(format!("Illegal {} {}", what, value))),
            None => Err(self.error(format!("Missing {}", what))),
        }
    }

    fn optional(
        &self,
        index: usize,
        what: &str,
        default: i64,
        range: RangeInclusive<i64>,
    ) -> Result<i64> {
        match self.int(index)?.unwrap_or(default) {
            value if range.contains(&value) => Ok(value),
            value => Err(self.error(format!("Illegal {} {}", what, value))),
        }
    }

    fn endpoint(&self, index: usize) -> Result<u8> {
        let number = self.required(index, "endpoint", 0..=ENDPOINT_LIMIT - 1)?;
        Ok(number as u8)
    }

    fn path(&self, index: usize) -> Option<PathBuf> {
        self.command.arg(index).map(PathBuf::from)
    }
}

fn to_u32(args: &Args<'_>, value: i64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| args.error(format!("Illegal {} {}", what, value)))
}

impl Request {
    /// Checks a command's verb and arguments.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fx2prog::{Command, Endpoint, Request};
    ///
    /// let request = Request::parse(&Command::parse("dbulk:6,-64")).unwrap();
    /// assert_eq!(
    ///     request,
    ///     Request::DumpBulk {
    ///         endpoint: Endpoint::bulk_in(6),
    ///         length: 64,
    ///         allow_short: true,
    ///         count: 1,
    ///     }
    /// );
    /// ```
    pub fn parse(command: &Command) -> Result<Self> {
        match command.verb() {
            "reset" => Ok(Request::Reset),
            "run" => Ok(Request::Run),
            "prg" => Self::program(Args { command, name: "prg" }),
            "delay" => Ok(Self::delay(command)),
            "dram" => Self::dump_ram(Args { command, name: "dram" }),
            "set" => Self::set_byte(Args { command, name: "set" }),
            "dbulk" => Self::dump_bulk(Args { command, name: "dbulk" }),
            "sbulk" => Self::send_bulk(Args { command, name: "sbulk" }),
            "fbulk" => Self::file_bulk(Args { command, name: "fbulk" }),
            "bench_bulk" => Self::bench_bulk(Args { command, name: "bench_bulk" }),
            "altif" => Self::alt_interface(Args { command, name: "altif" }),
            "ctrl" => Self::control(Args { command, name: "ctrl" }),
            verb => Err(Error::UnknownCommand(verb.to_string())),
        }
    }

    fn program(args: Args<'_>) -> Result<Self> {
        let path = args
            .path(0)
            .ok_or_else(|| args.error("Missing file to download"))?;
        Ok(Request::Program { path })
    }

    fn delay(command: &Command) -> Self {
        let millis = match command.arg(0).and_then(crate::command::parse_int) {
            Some(millis) if millis >= 0 => millis as u64,
            _ => DEFAULT_DELAY_MS,
        };
        Request::Delay {
            duration: Duration::from_millis(millis),
        }
    }

    fn dump_ram(args: Args<'_>) -> Result<Self> {
        let address = args.int(0)?.unwrap_or(0).max(0);
        let length = args
            .int(1)?
            .unwrap_or(1)
            .max(1)
            .min(MAX_RAM_DUMP_LENGTH as i64);
        Ok(Request::DumpRam {
            address: to_u32(&args, address, "address")?,
            length: length as usize,
        })
    }

    fn set_byte(args: Args<'_>) -> Result<Self> {
        let address = args.required(0, "address", 0..=i64::from(u32::MAX))?;
        let value = args.required(1, "value", 0..=0xff)?;
        Ok(Request::SetByte {
            address: address as u32,
            value: value as u8,
        })
    }

    fn dump_bulk(args: Args<'_>) -> Result<Self> {
        let endpoint = args.endpoint(0)?;
        let length = args.int(1)?.unwrap_or(DEFAULT_BULK_READ_LENGTH as i64);
        let count = args.optional(2, "number", 1, 1..=i64::MAX)?;
        let magnitude = length.unsigned_abs() as usize;
        if magnitude == 0 || magnitude > MAX_BULK_READ_LENGTH {
            return Err(args.error(format!("Illegal length {}", length)));
        }
        Ok(Request::DumpBulk {
            endpoint: Endpoint::bulk_in(endpoint),
            length: magnitude,
            allow_short: length < 0,
            count: count as usize,
        })
    }

    fn send_bulk(args: Args<'_>) -> Result<Self> {
        let endpoint = args.endpoint(0)?;
        let data = args.command.arg(1).unwrap_or("").as_bytes().to_vec();
        Ok(Request::SendBulk {
            endpoint: Endpoint::bulk_out(endpoint),
            data,
        })
    }

    fn file_bulk(args: Args<'_>) -> Result<Self> {
        let endpoint = args.endpoint(0)?;
        let chunk_size = args.optional(
            2,
            "chunk size",
            DEFAULT_STREAM_CHUNK_SIZE as i64,
            1..=MAX_STREAM_CHUNK_SIZE as i64,
        )?;
        Ok(Request::FileBulk {
            endpoint: Endpoint::bulk_out(endpoint),
            path: args.path(1),
            chunk_size: chunk_size as usize,
        })
    }

    fn bench_bulk(args: Args<'_>) -> Result<Self> {
        let endpoint = args.endpoint(0)?;
        let length = args.optional(
            1,
            "length",
            DEFAULT_BENCH_LENGTH as i64,
            1..=MAX_BENCH_LENGTH as i64,
        )?;
        let chunk_size = args.optional(
            2,
            "chunk size",
            DEFAULT_BENCH_CHUNK_SIZE as i64,
            1..=MAX_BENCH_LENGTH as i64,
        )?;
        Ok(Request::BenchBulk {
            endpoint: Endpoint::bulk_in(endpoint),
            length: length as usize,
            chunk_size: chunk_size as usize,
        })
    }

    fn alt_interface(args: Args<'_>) -> Result<Self> {
        match args.int(0)? {
            None => Ok(Request::AltInterface(None)),
            Some(alt) if alt < 0 => Ok(Request::AltInterface(None)),
            Some(alt) => u8::try_from(alt)
                .map(|alt| Request::AltInterface(Some(alt)))
                .map_err(|_| args.error(format!("Illegal alternate interface {}", alt))),
        }
    }

    fn control(args: Args<'_>) -> Result<Self> {
        let request_type = args.optional(0, "request type", 0, 0..=0xff)?;
        let request = args.optional(1, "request", 0, 0..=0xff)?;
        let value = args.optional(2, "value", 0, 0..=0xffff)?;
        let index = args.optional(3, "index", 0, 0..=0xffff)?;
        Ok(Request::Control {
            request_type: request_type as u8,
            request: request as u8,
            value: value as u16,
            index: index as u16,
        })
    }
}
