//! Conversion between [`ExtendedTags`] and the packed record stored in the spare area of every
//! chunk.
//!
//! The packed record never contains ECC bytes. Those belong to the flash driver, the codec only
//! reserves space for them by sizing the record to the full spare area and zero filling
//! everything behind the tag fields.

use crate::error::Error;
use crate::raw::{
    FixedRecord, RawTags, TAGS_FORMAT_V1, TF_DELETED, TF_EXTRA_HEADER, TF_SHADOWS, TF_SHRINK,
};
use crate::u24::u24;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp;
#[cfg(feature = "defmt")]
use defmt::warn;

/// Number of bytes occupied by the tag fields. Every spare area has to be at least this large.
pub const PACKED_TAGS_SIZE: usize = <RawTags as FixedRecord>::SIZE;

/// Object ids, chunk ids, byte counts, parent ids and file sizes are stored as 24-bit values.
pub const MAX_TAG_FIELD: u32 = u24::MAX;

/// Outcome of the ECC check of the last read, ordered by severity.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EccResult {
    #[default]
    NoError,
    /// Bit flips were repaired. The data is valid but the filesystem may want to rewrite the chunk.
    Fixed,
    /// Bit flips could not be repaired.
    Unfixed,
}

#[derive(strum::FromRepr, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ObjectType {
    Unknown = 0,
    File = 1,
    Symlink = 2,
    Directory = 3,
    Hardlink = 4,
    Special = 5,
}

/// Object header details mirrored into the tags of an object header chunk, so a mount scan can
/// rebuild the directory tree without reading the header itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtraHeaderInfo {
    pub obj_type: ObjectType,
    pub parent_id: u32,
    pub file_size: u32,
    /// The header was written by a truncation.
    pub is_shrink: bool,
    /// The header replaces an object of another name (rename over an existing object).
    pub shadows: bool,
}

/// Per chunk metadata as seen by the filesystem.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtendedTags {
    /// `false` for erased chunks, all other fields are zero then.
    pub chunk_used: bool,
    pub sequence_number: u32,
    pub obj_id: u32,
    /// 0 for object headers, the data chunk number starting at 1 otherwise.
    pub chunk_id: u32,
    pub n_bytes: u32,
    pub is_deleted: bool,
    /// Filled in by reads, ignored by writes.
    pub ecc_result: EccResult,
    /// Only valid for object headers, i.e. `chunk_id == 0` and `n_bytes == 0`.
    pub extra: Option<ExtraHeaderInfo>,
}

impl ExtendedTags {
    /// Tags of a data chunk.
    pub fn data(sequence_number: u32, obj_id: u32, chunk_id: u32, n_bytes: u32) -> Self {
        Self {
            chunk_used: true,
            sequence_number,
            obj_id,
            chunk_id,
            n_bytes,
            ..Default::default()
        }
    }

    /// Tags of an object header chunk.
    pub fn header(sequence_number: u32, obj_id: u32, extra: Option<ExtraHeaderInfo>) -> Self {
        Self {
            chunk_used: true,
            sequence_number,
            obj_id,
            extra,
            ..Default::default()
        }
    }

    /// Whether [`pack`] stores these tags without losing information.
    pub fn fits_packed(&self) -> bool {
        if self.obj_id > MAX_TAG_FIELD {
            return false;
        }

        match &self.extra {
            Some(extra) => {
                self.chunk_id == 0
                    && self.n_bytes == 0
                    && extra.parent_id <= MAX_TAG_FIELD
                    && extra.file_size <= MAX_TAG_FIELD
            }
            None => self.chunk_id <= MAX_TAG_FIELD && self.n_bytes <= MAX_TAG_FIELD,
        }
    }
}

/// Spare-area sized byte image of [`ExtendedTags`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedTags(Vec<u8>);

impl PackedTags {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for PackedTags {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&ExtendedTags> for RawTags {
    fn from(tags: &ExtendedTags) -> Self {
        let mut flags = 0;
        if tags.is_deleted {
            flags |= TF_DELETED;
        }

        let (chunk_id, n_bytes, obj_type) = match &tags.extra {
            Some(extra) => {
                flags |= TF_EXTRA_HEADER;
                if extra.is_shrink {
                    flags |= TF_SHRINK;
                }
                if extra.shadows {
                    flags |= TF_SHADOWS;
                }
                (extra.parent_id, extra.file_size, extra.obj_type as u8)
            }
            None => (tags.chunk_id, tags.n_bytes, 0),
        };

        RawTags {
            header: RawTags::header(TAGS_FORMAT_V1, flags),
            sequence: tags.sequence_number,
            obj_id: u24::from_u32(tags.obj_id),
            chunk_id: u24::from_u32(chunk_id),
            n_bytes: u24::from_u32(n_bytes),
            obj_type,
            reserved: 0,
        }
    }
}

/// Serializes `tags` into a record of `spare_size` bytes, or [`PACKED_TAGS_SIZE`] bytes if the
/// spare area is smaller than that.
///
/// Tags of an unused chunk pack to the erased pattern. Fields wider than 24 bits are truncated,
/// check [`ExtendedTags::fits_packed`] first if that matters.
pub fn pack(tags: &ExtendedTags, spare_size: usize) -> PackedTags {
    let size = cmp::max(spare_size, PACKED_TAGS_SIZE);

    if !tags.chunk_used {
        return PackedTags(vec![0xFF; size]);
    }

    let mut buf = vec![0u8; size];
    RawTags::from(tags).encode(&mut buf);
    PackedTags(buf)
}

/// Whether the tag fields of a record are the erased (`0xFF`) or zeroed (`0x00`) pattern.
pub(crate) fn is_blank(buffer: &[u8]) -> bool {
    let fields = &buffer[..cmp::min(buffer.len(), PACKED_TAGS_SIZE)];
    fields.iter().all(|&b| b == 0xFF) || fields.iter().all(|&b| b == 0x00)
}

/// Parses a packed record.
///
/// Blank records yield the tags of an unused chunk. So does any other record of an unknown
/// layout version, but with `ignore_ecc` unset it is reported as [`EccResult::Unfixed`], same
/// as a record with inconsistent content. With `ignore_ecc` set, `ecc_result` is left at
/// [`EccResult::NoError`] for the caller to fill in from the read result.
pub fn unpack(buffer: &[u8], ignore_ecc: bool) -> Result<ExtendedTags, Error> {
    let raw = RawTags::decode(buffer)?;

    if is_blank(buffer) {
        return Ok(ExtendedTags::default());
    }

    if raw.version() != TAGS_FORMAT_V1 {
        #[cfg(feature = "defmt")]
        warn!("unpack: unknown tag layout version {}", raw.version());

        #[cfg(feature = "debug-logs")]
        println!("tags: unknown layout version {}", raw.version());

        let mut tags = ExtendedTags::default();
        if !ignore_ecc {
            tags.ecc_result = EccResult::Unfixed;
        }
        return Ok(tags);
    }

    let flags = raw.flags();
    let obj_type = ObjectType::from_repr(raw.obj_type);

    let extra = (flags & TF_EXTRA_HEADER != 0).then(|| ExtraHeaderInfo {
        obj_type: obj_type.unwrap_or(ObjectType::Unknown),
        parent_id: raw.chunk_id.to_u32(),
        file_size: raw.n_bytes.to_u32(),
        is_shrink: flags & TF_SHRINK != 0,
        shadows: flags & TF_SHADOWS != 0,
    });

    let (chunk_id, n_bytes) = match extra {
        Some(_) => (0, 0),
        None => (raw.chunk_id.to_u32(), raw.n_bytes.to_u32()),
    };

    let mut tags = ExtendedTags {
        chunk_used: true,
        sequence_number: raw.sequence,
        obj_id: raw.obj_id.to_u32(),
        chunk_id,
        n_bytes,
        is_deleted: flags & TF_DELETED != 0,
        ecc_result: EccResult::NoError,
        extra,
    };

    if !ignore_ecc {
        let consistent = raw.reserved == 0
            && match extra {
                Some(_) => obj_type.is_some(),
                None => raw.obj_type == 0 && flags & (TF_SHRINK | TF_SHADOWS) == 0,
            };

        if !consistent {
            #[cfg(feature = "defmt")]
            warn!("unpack: inconsistent tag record");

            tags.ecc_result = EccResult::Unfixed;
        }
    }

    Ok(tags)
}
