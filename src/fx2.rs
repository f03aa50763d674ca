use crate::bench::timed_chunks;
use crate::context::UsbContext;
use crate::device::{BenchStats, Device, Endpoint};
use crate::error::{Error, Result};
use crate::ihex::Image;
use crate::TIMEOUT;
use log::{debug, info};
use rusb::DeviceHandle;
use std::convert::TryFrom;
use std::path::Path;

/// Address of the CPU control and status register. Bit 0 holds the 8051 in reset.
pub const CPUCS_ADDRESS: u16 = 0xe600;

/// Largest amount of RAM transferred by a single control request.
pub const RAM_CHUNK_SIZE: usize = 1024;

/// Alternate setting of interface 0 used for bulk transfers unless another one is forced. The
/// FX2's default descriptors only enable the bulk endpoints in this setting.
pub const DEFAULT_ALT_INTERFACE: u8 = 1;

/// Interface carrying the bulk endpoints.
const INTERFACE: u8 = 0;

/// Direction bit of `bmRequestType` for device-to-host requests.
const REQUEST_TYPE_IN: u8 = 0x80;

/// Vendor request implemented by the FX2 boot ROM for RAM upload and download.
const FIRMWARE_LOAD: u8 = 0xa0;

/// Returns the 16-bit start address if `length` bytes starting at `address` are addressable.
fn ram_range(address: u32, length: usize) -> Result<u16> {
    if address as usize + length > 0x10000 {
        return Err(Error::InvalidRequest);
    }
    u16::try_from(address).map_err(|_| Error::InvalidRequest)
}

/// Claim and alternate setting of the bulk interface.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct InterfaceState {
    /// Whether the interface has been claimed and has to be released again.
    claimed: bool,

    /// Alternate setting the claimed interface is currently in, `None` until one was selected.
    active_alt: Option<u8>,
}

impl InterfaceState {
    /// Claims the interface unless already done, then selects `alt` unless already active.
    fn prepare<C, S>(&mut self, alt: u8, claim: C, select: S) -> Result<()>
    where
        C: FnOnce() -> Result<()>,
        S: FnOnce(u8) -> Result<()>,
    {
        if self.active_alt == Some(alt) {
            return Ok(());
        }
        if !self.claimed {
            claim()?;
            self.claimed = true;
        }
        self.active_alt = None;
        select(alt)?;
        self.active_alt = Some(alt);
        Ok(())
    }
}

/// An opened Cypress FX2 and the state of its bulk interface.
pub struct Fx2Device<T: UsbContext> {
    // USB device handle for the raw communication.
    pub(crate) usb_device_handle: DeviceHandle<T>,

    /// Alternate setting requested for bulk transfers, `None` for the default.
    alt_interface: Option<u8>,

    interface: InterfaceState,
}

impl<T: UsbContext> Fx2Device<T> {
    pub(crate) fn from_usb_device(device: rusb::Device<T>) -> Result<Self> {
        let usb_device_handle = device.open()?;
        // Not supported on every platform, in which case there is no kernel driver to detach
        if let Err(error) = usb_device_handle.set_auto_detach_kernel_driver(true) {
            debug!("Automatic kernel driver detaching unavailable: {}", error);
        }
        Ok(Fx2Device {
            usb_device_handle,
            alt_interface: None,
            interface: InterfaceState::default(),
        })
    }

    /// Claims the bulk interface and switches it to the requested alternate setting, unless that
    /// has already happened.
    fn prepare_bulk(&mut self) -> Result<()> {
        let alt = self.alt_interface.unwrap_or(DEFAULT_ALT_INTERFACE);
        let handle = &self.usb_device_handle;
        self.interface.prepare(
            alt,
            || Ok(handle.claim_interface(INTERFACE)?),
            |alt| {
                debug!("Selecting alternate interface {}", alt);
                Ok(handle.set_alternate_setting(INTERFACE, alt)?)
            },
        )
    }

    fn vendor_request_type(direction: rusb::Direction) -> u8 {
        rusb::request_type(direction, rusb::RequestType::Vendor, rusb::Recipient::Device)
    }
}

impl<T: UsbContext> Drop for Fx2Device<T> {
    fn drop(&mut self) {
        if self.interface.claimed {
            let _ = self.usb_device_handle.release_interface(INTERFACE);
        }
    }
}

impl<T: UsbContext> Device for Fx2Device<T> {
    fn reset(&mut self, run: bool) -> Result<()> {
        let value = if run { 0 } else { 1 };
        self.write_ram(u32::from(CPUCS_ADDRESS), &[value])
    }

    fn program(&mut self, path: &Path) -> Result<()> {
        let image = Image::load(path)?;
        info!(
            "Loading {} bytes in {} segments (crc32 0x{:08x})",
            image.len(),
            image.segments.len(),
            image.crc32()
        );
        for segment in &image.segments {
            debug!(
                "Writing {} bytes at 0x{:04x}",
                segment.data.len(),
                segment.address
            );
            self.write_ram(u32::from(segment.address), &segment.data)?;
        }
        Ok(())
    }

    fn read_ram(&mut self, address: u32, length: usize) -> Result<Vec<u8>> {
        let start = ram_range(address, length)?;
        let mut buffer = vec![0u8; length];
        for (i, chunk) in buffer.chunks_mut(RAM_CHUNK_SIZE).enumerate() {
            let expected = chunk.len();
            let read = self.usb_device_handle.read_control(
                Self::vendor_request_type(rusb::Direction::In),
                FIRMWARE_LOAD,
                start + (i * RAM_CHUNK_SIZE) as u16,
                0,
                chunk,
                TIMEOUT,
            )?;
            if read != expected {
                return Err(Error::ShortRead {
                    expected,
                    actual: read,
                });
            }
        }
        Ok(buffer)
    }

    fn write_ram(&mut self, address: u32, data: &[u8]) -> Result<()> {
        let start = ram_range(address, data.len())?;
        for (i, chunk) in data.chunks(RAM_CHUNK_SIZE).enumerate() {
            let written = self.usb_device_handle.write_control(
                Self::vendor_request_type(rusb::Direction::Out),
                FIRMWARE_LOAD,
                start + (i * RAM_CHUNK_SIZE) as u16,
                0,
                chunk,
                TIMEOUT,
            )?;
            if written != chunk.len() {
                return Err(Error::ShortWrite {
                    expected: chunk.len(),
                    actual: written,
                });
            }
        }
        Ok(())
    }

    fn bulk_read(
        &mut self,
        endpoint: Endpoint,
        length: usize,
        allow_short: bool,
    ) -> Result<Vec<u8>> {
        self.prepare_bulk()?;
        let mut buffer = vec![0u8; length];
        let read = self
            .usb_device_handle
            .read_bulk(endpoint.address(), &mut buffer, TIMEOUT)?;
        if read < length && !allow_short {
            return Err(Error::ShortRead {
                expected: length,
                actual: read,
            });
        }
        buffer.truncate(read);
        Ok(buffer)
    }

    fn bulk_write(&mut self, endpoint: Endpoint, data: &[u8]) -> Result<usize> {
        self.prepare_bulk()?;
        Ok(self
            .usb_device_handle
            .write_bulk(endpoint.address(), data, TIMEOUT)?)
    }

    fn benchmarked_bulk_read(
        &mut self,
        endpoint: Endpoint,
        total: usize,
        chunk_size: usize,
    ) -> Result<BenchStats> {
        self.prepare_bulk()?;
        let mut buffer = vec![0u8; chunk_size];
        let handle = &self.usb_device_handle;
        timed_chunks(total, chunk_size, |length| {
            Ok(handle.read_bulk(endpoint.address(), &mut buffer[..length], TIMEOUT)?)
        })
    }

    fn force_alt_interface(&mut self, alt: Option<u8>) {
        self.alt_interface = alt;
    }

    fn control_transfer(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
    ) -> Result<()> {
        if request_type & REQUEST_TYPE_IN != 0 {
            self.usb_device_handle.read_control(
                request_type,
                request,
                value,
                index,
                &mut [0u8; 0],
                TIMEOUT,
            )?;
        } else {
            self.usb_device_handle.write_control(
                request_type,
                request,
                value,
                index,
                &[0u8; 0],
                TIMEOUT,
            )?;
        }
        Ok(())
    }
}
