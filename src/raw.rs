use crate::error::Error;
use crate::platform::{AlignedOps, Platform};
use crate::u24::u24;
use alloc::vec;
#[cfg(feature = "defmt")]
use defmt::trace;

pub(crate) const TAGS_FORMAT_V1: u8 = 0x1;

// Header flag bits are active-low, a flag is set by programming its bit to 0. This
// allows setting flags later on without an erase cycle.
pub(crate) const TF_DELETED: u8 = 0x1;
pub(crate) const TF_EXTRA_HEADER: u8 = 0x2;
pub(crate) const TF_SHRINK: u8 = 0x4;
pub(crate) const TF_SHADOWS: u8 = 0x8;
pub(crate) const TF_MASK: u8 = 0xF;

/// A record with a fixed on-flash size. The byte order of every multi-byte field is
/// little-endian and pinned down in the implementation of this trait.
pub(crate) trait FixedRecord: Sized {
    const SIZE: usize;

    /// `buf` has to be at least `SIZE` bytes long, trailing bytes are left untouched.
    fn encode(&self, buf: &mut [u8]);

    fn decode(buf: &[u8]) -> Result<Self, Error>;
}

/// Version 1 of the spare-area tag record.
///
/// | offset | width | field                                  |
/// |--------|-------|----------------------------------------|
/// | 0      | 1     | version (high nibble), flags (low)     |
/// | 1      | 4     | sequence number                        |
/// | 5      | 3     | object id                              |
/// | 8      | 3     | chunk id or parent object id           |
/// | 11     | 3     | byte count or file size                |
/// | 14     | 1     | object type                            |
/// | 15     | 1     | reserved                               |
#[derive(Copy, Clone, PartialEq)]
#[cfg_attr(feature = "debug-logs", derive(Debug))]
pub(crate) struct RawTags {
    pub(crate) header: u8,
    pub(crate) sequence: u32,
    pub(crate) obj_id: u24,
    pub(crate) chunk_id: u24,
    pub(crate) n_bytes: u24,
    pub(crate) obj_type: u8,
    pub(crate) reserved: u8,
}

impl RawTags {
    pub(crate) fn version(&self) -> u8 {
        self.header >> 4
    }

    /// Active-low flags turned into regular, active-high ones.
    pub(crate) fn flags(&self) -> u8 {
        !self.header & TF_MASK
    }

    pub(crate) fn header(version: u8, flags: u8) -> u8 {
        (version << 4) | (!flags & TF_MASK)
    }
}

impl FixedRecord for RawTags {
    const SIZE: usize = 16;

    fn encode(&self, buf: &mut [u8]) {
        buf[0] = self.header;
        buf[1..5].copy_from_slice(&self.sequence.to_le_bytes());
        buf[5..8].copy_from_slice(&self.obj_id.to_le_bytes());
        buf[8..11].copy_from_slice(&self.chunk_id.to_le_bytes());
        buf[11..14].copy_from_slice(&self.n_bytes.to_le_bytes());
        buf[14] = self.obj_type;
        buf[15] = self.reserved;
    }

    fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < Self::SIZE {
            return Err(Error::BufferTooSmall);
        }

        Ok(Self {
            header: buf[0],
            sequence: u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]),
            obj_id: u24::from_le_bytes([buf[5], buf[6], buf[7]]),
            chunk_id: u24::from_le_bytes([buf[8], buf[9], buf[10]]),
            n_bytes: u24::from_le_bytes([buf[11], buf[12], buf[13]]),
            obj_type: buf[14],
            reserved: buf[15],
        })
    }
}

#[inline(always)]
pub(crate) fn write_aligned<T: Platform>(
    hal: &mut T,
    offset: u32,
    bytes: &[u8],
) -> Result<(), T::Error> {
    #[cfg(feature = "defmt")]
    trace!("write_aligned @{:#08x}: [{}]", offset, bytes.len());

    if bytes.len().is_multiple_of(T::WRITE_SIZE) {
        hal.write(offset, bytes)
    } else {
        let pivot = T::align_write_floor(bytes.len());
        let header = &bytes[..pivot];
        let trailer = &bytes[pivot..];
        if !header.is_empty() {
            hal.write(offset, header)?;
        }

        // no need to write the trailer if remaining data is all ones - this the default state of the flash
        if trailer.iter().any(|&e| e != 0xFF) {
            let mut buf = vec![0xFFu8; T::WRITE_SIZE];
            buf[..trailer.len()].copy_from_slice(trailer);
            hal.write(offset + (pivot as u32), &buf)?
        }

        Ok(())
    }
}
