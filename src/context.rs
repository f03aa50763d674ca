use super::error::{Error, Result};
use super::fx2::Fx2Device;
use std::fmt;

pub use rusb::UsbContext;

/// Vendor ID of a Cypress FX2 without firmware.
pub const FX2_VENDOR_ID: u16 = 0x04b4;

/// Product ID of a Cypress FX2 without firmware.
pub const FX2_PRODUCT_ID: u16 = 0x8613;

/// Identifies the USB device to connect to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Selector {
    /// The device at a bus number and device address, as shown by `--list`.
    BusDevice { bus: u8, address: u8 },

    /// The `index`-th device (counting from zero) with the given vendor and product ID.
    Id {
        vendor_id: u16,
        product_id: u16,
        index: usize,
    },
}

impl Default for Selector {
    fn default() -> Self {
        Selector::Id {
            vendor_id: FX2_VENDOR_ID,
            product_id: FX2_PRODUCT_ID,
            index: 0,
        }
    }
}

impl Selector {
    /// Parses `BUS.DEV` with decimal numbers, e.g. `006.003`.
    pub fn parse_bus_device(input: &str) -> std::result::Result<Self, String> {
        let (bus, address) = input
            .split_once('.')
            .ok_or_else(|| format!("expected BUS.DEV, got \"{}\"", input))?;
        let number = |text: &str| {
            text.parse::<u8>()
                .map_err(|_| format!("illegal bus or device number \"{}\"", text))
        };
        Ok(Selector::BusDevice {
            bus: number(bus)?,
            address: number(address)?,
        })
    }

    /// Parses `VV.PP[.N]` with hexadecimal vendor and product ID and a decimal index.
    pub fn parse_id(input: &str) -> std::result::Result<Self, String> {
        let mut parts = input.split('.');
        let mut hex = |what: &str| {
            parts
                .next()
                .and_then(|text| u16::from_str_radix(text, 16).ok())
                .ok_or_else(|| format!("illegal {} in \"{}\"", what, input))
        };
        let vendor_id = hex("vendor ID")?;
        let product_id = hex("product ID")?;
        let index = match parts.next() {
            Some(text) => text
                .parse::<usize>()
                .map_err(|_| format!("illegal index in \"{}\"", input))?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(format!("expected VV.PP[.N], got \"{}\"", input));
        }
        Ok(Selector::Id {
            vendor_id,
            product_id,
            index,
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::BusDevice { bus, address } => write!(f, "device {:03}.{:03}", bus, address),
            Selector::Id {
                vendor_id,
                product_id,
                index,
            } => write!(
                f,
                "device with vendorID=0x{:04x}, productID=0x{:04x}, nth={}",
                vendor_id, product_id, index
            ),
        }
    }
}

/// Contains necessary information to connect to a device via USB.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceInfo {
    /// USB bus ID the device is connected to.
    pub bus_number: u8,

    /// USB device address of the device.
    pub address: u8,

    pub vendor_id: u16,

    pub product_id: u16,
}

impl DeviceInfo {
    /// Whether this is a Cypress FX2 which has not been loaded with firmware yet.
    pub fn is_unconfigured_fx2(&self) -> bool {
        self.vendor_id == FX2_VENDOR_ID && self.product_id == FX2_PRODUCT_ID
    }

    /// Connects to the device.
    pub fn open<T: UsbContext>(&self, context: &T) -> Result<Fx2Device<T>> {
        for device in context.devices()?.iter() {
            // Checking the IDs as well guards against a reenumeration between listing and opening
            if device.bus_number() == self.bus_number && device.address() == self.address {
                let descriptor = device.device_descriptor()?;
                if descriptor.vendor_id() != self.vendor_id
                    || descriptor.product_id() != self.product_id
                {
                    return Err(Error::DeviceNotFound);
                }
                return Fx2Device::from_usb_device(device);
            }
        }
        Err(Error::DeviceNotFound)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bus {:03} Device {:03}: ID {:04x}:{:04x}{}",
            self.bus_number,
            self.address,
            self.vendor_id,
            self.product_id,
            if self.is_unconfigured_fx2() {
                " (unconfigured FX2)"
            } else {
                ""
            }
        )
    }
}

/// Picks the device a selector refers to out of a device list.
pub fn select(devices: Vec<DeviceInfo>, selector: &Selector) -> Result<DeviceInfo> {
    let found = match *selector {
        Selector::BusDevice { bus, address } => devices
            .into_iter()
            .find(|info| info.bus_number == bus && info.address == address),
        Selector::Id {
            vendor_id,
            product_id,
            index,
        } => devices
            .into_iter()
            .filter(|info| info.vendor_id == vendor_id && info.product_id == product_id)
            .nth(index),
    };
    found.ok_or(Error::DeviceNotFound)
}

pub struct Context {
    pub usb_context: rusb::Context,
}

impl Context {
    pub fn new() -> Result<Self> {
        let usb_context = rusb::Context::new()?;
        Ok(Context { usb_context })
    }

    /// Lists all attached USB devices.
    pub fn devices(&self) -> Result<Vec<DeviceInfo>> {
        let mut devices = Vec::new();

        for device in self.usb_context.devices()?.iter() {
            match device.device_descriptor() {
                Ok(descriptor) => devices.push(DeviceInfo {
                    bus_number: device.bus_number(),
                    address: device.address(),
                    vendor_id: descriptor.vendor_id(),
                    product_id: descriptor.product_id(),
                }),
                Err(error) => log::debug!(
                    "Skipping device {:03}.{:03}: {}",
                    device.bus_number(),
                    device.address(),
                    error
                ),
            }
        }

        Ok(devices)
    }

    pub fn pick_device(&self, selector: &Selector) -> Result<DeviceInfo> {
        select(self.devices()?, selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(bus_number: u8, address: u8, vendor_id: u16, product_id: u16) -> DeviceInfo {
        DeviceInfo {
            bus_number,
            address,
            vendor_id,
            product_id,
        }
    }

    #[test]
    fn parses_bus_device() {
        assert_eq!(
            Selector::parse_bus_device("006.003"),
            Ok(Selector::BusDevice { bus: 6, address: 3 })
        );
        assert!(Selector::parse_bus_device("006").is_err());
        assert!(Selector::parse_bus_device("6.x").is_err());
    }

    #[test]
    fn parses_id() {
        assert_eq!(
            Selector::parse_id("04b4.8613"),
            Ok(Selector::default())
        );
        assert_eq!(
            Selector::parse_id("1234.abcd.2"),
            Ok(Selector::Id {
                vendor_id: 0x1234,
                product_id: 0xabcd,
                index: 2
            })
        );
        assert!(Selector::parse_id("04b4").is_err());
        assert!(Selector::parse_id("04b4.8613.1.2").is_err());
        assert!(Selector::parse_id("04b4.8613.-1").is_err());
    }

    #[test]
    fn selects_nth_matching_device() {
        let devices = vec![
            info(1, 2, 0x04b4, 0x8613),
            info(1, 3, 0x1d6b, 0x0002),
            info(2, 5, 0x04b4, 0x8613),
        ];
        let second = Selector::Id {
            vendor_id: 0x04b4,
            product_id: 0x8613,
            index: 1,
        };
        assert_eq!(select(devices.clone(), &second).unwrap(), devices[2]);
        assert_eq!(
            select(devices.clone(), &Selector::BusDevice { bus: 1, address: 3 }).unwrap(),
            devices[1]
        );
        assert!(matches!(
            select(devices, &Selector::BusDevice { bus: 9, address: 9 }),
            Err(Error::DeviceNotFound)
        ));
    }

    #[test]
    fn listing_marks_unconfigured_fx2() {
        assert_eq!(
            info(6, 3, 0x04b4, 0x8613).to_string(),
            "Bus 006 Device 003: ID 04b4:8613 (unconfigured FX2)"
        );
        assert_eq!(
            info(1, 1, 0x1d6b, 0x0002).to_string(),
            "Bus 001 Device 001: ID 1d6b:0002"
        );
    }
}
