//! This crate drives a Cypress FX2 development board connected via USB: it resets and runs the
//! 8051, loads Intel hex firmware, peeks and pokes RAM and exercises the bulk endpoints.
//!
//! Work is expressed in a small command language. Each command is a verb, optionally followed by
//! a colon and comma-separated arguments (e.g. `dram:0xe600,16` or `dbulk:6,-512,4`). A
//! [`Dispatcher`] executes such commands one after another against any [`Device`], keeping count
//! of the errors that occurred.
//!
//! # Example: Loading firmware and reading from a bulk endpoint
//! ```rust, no_run
//! use fx2prog::{Context, Dispatcher, Selector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Find an unconfigured FX2 and open it
//! let context = Context::new()?;
//! let device = context
//!     .pick_device(&Selector::default())?
//!     .open(&context.usb_context)?;
//!
//! // Load firmware, start it and dump 512 bytes from endpoint 6
//! let mut dispatcher = Dispatcher::new(device, std::io::stdout());
//! let errors = dispatcher.run_all(&["prg:firmware.ihx", "run", "delay:100", "dbulk:6,512"]);
//!
//! println!("{} errors", errors);
//! # Ok(())
//! # }
//! ```
//!
//! Bulk uploads of arbitrary size are performed chunk by chunk. See the [`Operation`] trait for
//! details.
//!
//! [`Dispatcher`]: struct.Dispatcher.html
//! [`Device`]: trait.Device.html
//! [`Operation`]: trait.Operation.html

extern crate crc_any;
extern crate rusb;

mod bench;
mod bulk;
mod command;
mod context;
mod device;
mod dispatch;
mod error;
mod fx2;
mod hexdump;
pub mod ihex;
#[cfg(test)]
mod mock;
mod operation;
mod request;

pub use bench::{timed_chunks, DEFAULT_BENCH_CHUNK_SIZE, DEFAULT_BENCH_LENGTH, MAX_BENCH_LENGTH};
pub use bulk::{send_stream, StreamReport, StreamWrite};
pub use command::{parse_int, Command, MAX_ARGS};
pub use context::{
    select, Context, DeviceInfo, Selector, UsbContext, FX2_PRODUCT_ID, FX2_VENDOR_ID,
};
pub use device::{BenchStats, Device, Endpoint, ENDPOINT_LIMIT};
pub use dispatch::{Dispatcher, Session};
pub use error::{Error, Result};
pub use fx2::{Fx2Device, CPUCS_ADDRESS, DEFAULT_ALT_INTERFACE, RAM_CHUNK_SIZE};
pub use hexdump::hexdump;
pub use operation::Operation;
pub use request::{
    Request, DEFAULT_BULK_READ_LENGTH, DEFAULT_DELAY_MS, DEFAULT_STREAM_CHUNK_SIZE,
    MAX_BULK_READ_LENGTH, MAX_RAM_DUMP_LENGTH, MAX_STREAM_CHUNK_SIZE,
};

/// Timeout for all usb transactions.
const TIMEOUT: std::time::Duration = std::time::Duration::from_millis(1000);
