//! Intel hex firmware images.

use crate::error::{Error, Result};
use crc_any::CRC;
use std::fs;
use std::path::Path;

/// Size of the 8051 code and data address space.
const ADDRESS_SPACE: usize = 0x10000;

const RECORD_DATA: u8 = 0x00;
const RECORD_EOF: u8 = 0x01;
const RECORD_EXTENDED_SEGMENT: u8 = 0x02;
const RECORD_START_SEGMENT: u8 = 0x03;
const RECORD_EXTENDED_LINEAR: u8 = 0x04;
const RECORD_START_LINEAR: u8 = 0x05;

/// A contiguous block of image data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Segment {
    pub address: u16,
    pub data: Vec<u8>,
}

impl Segment {
    fn end(&self) -> usize {
        self.address as usize + self.data.len()
    }
}

/// A parsed firmware image, with adjacent records merged into segments.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Image {
    pub segments: Vec<Segment>,
}

impl Image {
    /// Parses the text of an Intel hex file.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fx2prog::ihex::Image;
    ///
    /// let image = Image::parse(":03000000020006F5\n:00000001FF\n").unwrap();
    /// assert_eq!(image.segments[0].data, vec![0x02, 0x00, 0x06]);
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut image = Image::default();
        let mut terminated = false;

        for (number, line) in text.lines().enumerate() {
            let line_number = number + 1;
            let error = |reason: &str| Error::HexFile {
                line: line_number,
                reason: reason.to_string(),
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let record = line
                .strip_prefix(':')
                .ok_or_else(|| error("missing start code"))?;
            let bytes = hex::decode(record).map_err(|_| error("invalid hex digits"))?;
            if bytes.len() < 5 || bytes.len() != bytes[0] as usize + 5 {
                return Err(error("record length mismatch"));
            }
            if bytes.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte)) != 0 {
                return Err(error("checksum mismatch"));
            }

            let address = u16::from_be_bytes([bytes[1], bytes[2]]);
            let data = &bytes[4..bytes.len() - 1];
            match bytes[3] {
                RECORD_DATA => image.insert(address, data, line_number)?,
                RECORD_EOF => {
                    terminated = true;
                    break;
                }
                RECORD_EXTENDED_SEGMENT | RECORD_EXTENDED_LINEAR => {
                    if data.iter().any(|byte| *byte != 0) {
                        return Err(error("address beyond 64 KiB"));
                    }
                }
                RECORD_START_SEGMENT | RECORD_START_LINEAR => {}
                _ => return Err(error("unknown record type")),
            }
        }

        if !terminated {
            log::warn!("Intel hex file has no end-of-file record");
        }
        Ok(image)
    }

    /// Reads and parses an Intel hex file.
    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    fn insert(&mut self, address: u16, data: &[u8], line: usize) -> Result<()> {
        if address as usize + data.len() > ADDRESS_SPACE {
            return Err(Error::HexFile {
                line,
                reason: "record exceeds 64 KiB".to_string(),
            });
        }
        if data.is_empty() {
            return Ok(());
        }
        match self.segments.last_mut() {
            Some(segment) if segment.end() == address as usize => {
                segment.data.extend_from_slice(data)
            }
            _ => self.segments.push(Segment {
                address,
                data: data.to_vec(),
            }),
        }
        Ok(())
    }

    /// Total number of data bytes in the image.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|segment| segment.data.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// CRC32 over the image data in segment order, for identifying images in logs.
    pub fn crc32(&self) -> u32 {
        let mut crc = CRC::crc32();
        for segment in &self.segments {
            crc.digest(&segment.data);
        }
        crc.get_crc() as u32
    }
}
