//! Sequential execution of commands against a device.

use crate::bulk::send_stream;
use crate::command::Command;
use crate::device::{Device, Endpoint};
use crate::error::{Error, Result};
use crate::hexdump::hexdump;
use crate::request::Request;
use log::{error, info, warn};
use std::fmt::Display;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::thread;

/// Mutable state which outlives a single command.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Session {
    /// Alternate interface forced for bulk transfers, `None` for the device default.
    pub alt_interface: Option<u8>,

    /// Number of errors recorded so far. Never decreases.
    pub errors: usize,
}

/// Runs commands one after another against a device.
///
/// Progress and diagnostics are logged; dumps are rendered to `out`. An `fbulk` without a file
/// streams from `input`, which is never closed.
pub struct Dispatcher<D: Device, W: Write, R: Read = io::Stdin> {
    device: D,
    out: W,
    input: R,
    session: Session,
}

impl<D: Device, W: Write> Dispatcher<D, W> {
    /// Creates a dispatcher reading `fbulk` data without a file from standard input.
    pub fn new(device: D, out: W) -> Self {
        Self::with_input(device, out, io::stdin())
    }
}

impl<D: Device, W: Write, R: Read> Dispatcher<D, W, R> {
    pub fn with_input(device: D, out: W, input: R) -> Self {
        Self {
            device,
            out,
            input,
            session: Session::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Number of errors recorded by all commands executed so far.
    pub fn errors(&self) -> usize {
        self.session.errors
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn input(&self) -> &R {
        &self.input
    }

    pub fn into_parts(self) -> (D, W) {
        (self.device, self.out)
    }

    /// Executes all commands in order and returns the total error count.
    pub fn run_all<I, S>(&mut self, commands: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for command in commands {
            self.execute(command.as_ref());
        }
        self.errors()
    }

    /// Tokenizes, validates and runs a single command string. Failures are logged and counted;
    /// they never stop the caller from executing further commands.
    pub fn execute(&mut self, input: &str) {
        let command = Command::parse(input);
        if command.dropped() > 0 {
            self.fail(format!(
                "Too many arguments for command \"{}\" (further args ignored)",
                command.verb()
            ));
        }

        let request = match Request::parse(&command) {
            Ok(request) => request,
            Err(Error::UnknownCommand(verb)) => {
                self.fail(format!("Ignoring unknown command \"{}\".", verb));
                return;
            }
            Err(error) => {
                self.fail(error);
                return;
            }
        };

        if let Err(error) = self.run(request) {
            self.fail(error);
        }
    }

    fn fail(&mut self, message: impl Display) {
        error!("{}", message);
        self.session.errors += 1;
    }

    fn run(&mut self, request: Request) -> Result<()> {
        match request {
            Request::Reset => {
                info!("Putting 8051 into reset.");
                self.device.reset(false)
            }
            Request::Run => {
                info!("Putting 8051 out of reset.");
                self.device.reset(true)
            }
            Request::Program { path } => {
                // The target stays in reset afterwards, a `run` has to follow
                info!("Putting 8051 into reset.");
                if let Err(error) = self.device.reset(false) {
                    self.fail(error);
                }
                info!("Programming 8051 using \"{}\".", path.display());
                self.device.program(&path)
            }
            Request::Delay { duration } => {
                info!("Delay: {} msec", duration.as_millis());
                thread::sleep(duration);
                Ok(())
            }
            Request::DumpRam { address, length } => {
                info!("Dumping {} bytes of RAM at 0x{:x}:", length, address);
                let data = self.device.read_ram(address, length)?;
                hexdump(&mut self.out, &data, true)?;
                Ok(())
            }
            Request::SetByte { address, value } => {
                info!("Setting value at 0x{:x} to 0x{:x}", address, value);
                self.device.write_ram(address, &[value])
            }
            Request::DumpBulk {
                endpoint,
                length,
                allow_short,
                count,
            } => {
                self.dump_bulk(endpoint, length, allow_short, count);
                Ok(())
            }
            Request::SendBulk { endpoint, data } => {
                info!("Sending {} bytes to EP adr {}", data.len(), endpoint);
                let written = self.device.bulk_write(endpoint, &data)?;
                if written != data.len() {
                    return Err(Error::ShortWrite {
                        expected: data.len(),
                        actual: written,
                    });
                }
                Ok(())
            }
            Request::FileBulk {
                endpoint,
                path,
                chunk_size,
            } => {
                self.file_bulk(endpoint, path.as_deref(), chunk_size);
                Ok(())
            }
            Request::BenchBulk {
                endpoint,
                length,
                chunk_size,
            } => {
                info!(
                    "Benchmarking {} bytes from EP adr {} in chunks of {} bytes",
                    length, endpoint, chunk_size
                );
                let stats = self
                    .device
                    .benchmarked_bulk_read(endpoint, length, chunk_size)?;
                info!("{}", stats);
                Ok(())
            }
            Request::AltInterface(alt) => {
                match alt {
                    Some(alt) => info!("Using alternate interface {} for bulk IO", alt),
                    None => info!("Using default alternate interface for bulk IO"),
                }
                self.session.alt_interface = alt;
                self.device.force_alt_interface(alt);
                Ok(())
            }
            Request::Control {
                request_type,
                request,
                value,
                index,
            } => {
                info!(
                    "Sending control message type 0x{:02x}, request 0x{:02x} (value={},index={})",
                    request_type, request, value, index
                );
                self.device
                    .control_transfer(request_type, request, value, index)
            }
        }
    }

    /// Reads `count` buffers, dumping each non-empty one. A failed read is counted and the
    /// remaining reads are still attempted.
    fn dump_bulk(&mut self, endpoint: Endpoint, length: usize, allow_short: bool, count: usize) {
        for _ in 0..count {
            info!(
                "Reading {}{} bytes from EP adr {}",
                if allow_short { "<=" } else { "" },
                length,
                endpoint
            );
            let result = self
                .device
                .bulk_read(endpoint, length, allow_short)
                .and_then(|data| {
                    if !data.is_empty() {
                        hexdump(&mut self.out, &data, true)?;
                    }
                    Ok(())
                });
            if let Err(error) = result {
                self.fail(error);
            }
        }
    }

    /// Streams a file or the dispatcher's input to `endpoint`.
    fn file_bulk(&mut self, endpoint: Endpoint, path: Option<&Path>, chunk_size: usize) {
        let name = path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "[stdin]".to_string());

        let report = match path {
            Some(path) => match File::open(path) {
                // The file is closed once the report has been produced
                Ok(file) => {
                    info!(
                        "Sending \"{}\" in chunks of {} bytes to EP adr {}",
                        name, chunk_size, endpoint
                    );
                    send_stream(&mut self.device, endpoint, file, chunk_size)
                }
                Err(error) => {
                    self.fail(format!(
                        "Failed to open \"{}\" for reading: {}",
                        name, error
                    ));
                    return;
                }
            },
            None => {
                info!(
                    "Sending \"{}\" in chunks of {} bytes to EP adr {}",
                    name, chunk_size, endpoint
                );
                send_stream(&mut self.device, endpoint, &mut self.input, chunk_size)
            }
        };

        match report.error {
            Some(error) => self.fail(error),
            None if report.chunks == 0 => warn!("\"{}\" was empty, nothing has been sent", name),
            None => {}
        }
        info!("Sent {} bytes to EP adr {}", report.sent, endpoint);
    }
}
