#![doc = include_str ! ("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

pub mod error;
pub mod geometry;
mod internal;
pub mod platform;
mod raw;
pub mod tags;
mod u24;

extern crate alloc;

pub use geometry::{ChunkAddress, Geometry};
pub use tags::{EccResult, ExtendedTags, ExtraHeaderInfo, ObjectType, PackedTags, pack, unpack};

use crate::error::{Error, FlashOp};
use crate::platform::{AlignedOps, Platform};
use crate::raw::TF_DELETED;
use alloc::vec;
use core::cmp;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};
use embedded_storage::nor_flash::MultiwriteNorFlash;

/// State of an erase block as far as it can be told from its first chunk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockState {
    /// The first chunk was never written.
    Empty,
    /// The block holds data, the filesystem has to scan all of its chunks.
    NeedsScanning,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BlockStatistics {
    pub empty: u32,
    pub needs_scanning: u32,
    /// Blocks whose first chunk couldn't be read.
    pub unreadable: u32,
    pub highest_sequence: u32,
}

/// Stores chunks of a flash filesystem on NOR flash. Every chunk is a data page followed by a
/// spare area holding the packed tags, see [`geometry`] for the layout.
///
/// No operation is retried. Deciding what to do about failed writes or corrected reads is up
/// to the filesystem.
pub struct ChunkDevice<T: Platform> {
    pub(crate) hal: T,
    pub(crate) base_address: u32,
    pub(crate) geometry: Geometry,
}

impl<T: Platform> ChunkDevice<T> {
    /// The device starts at `partition_offset` and spans `geometry.block_count()` erase blocks.
    ///
    /// The erase block size has to be a multiple of the flash erase size, pages and spare areas
    /// have to respect the read and write granularity of the flash.
    pub fn new(partition_offset: u32, geometry: Geometry, hal: T) -> Result<Self, Error> {
        if !(partition_offset as usize).is_multiple_of(T::ERASE_SIZE) {
            return Err(Error::InvalidPartitionOffset);
        }

        if !(geometry.erase_block_size() as usize).is_multiple_of(T::ERASE_SIZE)
            || !T::is_aligned(geometry.bytes_per_chunk() as usize)
            || !T::is_aligned(geometry.spare_area_size() as usize)
        {
            return Err(Error::InvalidGeometry);
        }

        let end = partition_offset as u64 + geometry.total_size() as u64;
        if end > hal.capacity() as u64 || end > u32::MAX as u64 {
            return Err(Error::InvalidGeometry);
        }

        Ok(Self {
            hal,
            base_address: partition_offset,
            geometry,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Gives back the flash.
    pub fn release(self) -> T {
        self.hal
    }

    /// Writes the data page and then the packed tags of a chunk.
    ///
    /// `data` shorter than a chunk leaves the remainder of the page erased. The two writes
    /// are not atomic: if the tag write fails the page is already programmed, the chunk
    /// still reads as unused though.
    pub fn write_chunk(
        &mut self,
        chunk: u32,
        data: &[u8],
        tags: &ExtendedTags,
    ) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("write_chunk: {}", chunk);

        #[cfg(feature = "debug-logs")]
        println!("device: write_chunk {chunk} [{}] {tags:?}", data.len());

        if data.len() > self.geometry.bytes_per_chunk() as usize {
            return Err(Error::DataTooLong);
        }

        if !tags.fits_packed() {
            return Err(Error::TagsOutOfRange);
        }

        let address = self.geometry.address(chunk)?;
        let packed = tags::pack(tags, self.geometry.spare_area_size() as usize);

        if !data.is_empty() {
            self.program(address.page_offset, data)?;
        }
        self.program(address.spare_offset, packed.as_bytes())
    }

    /// Reads the data page into `data` and/or the tags into `tags` and returns the ECC outcome.
    ///
    /// A corrected ECC error succeeds with [`EccResult::Fixed`], it is up to the caller to
    /// rewrite the chunk. An uncorrectable one still fills in everything that was requested,
    /// reports [`EccResult::Unfixed`] in the tags and fails with a read error. So does a spare
    /// area that is neither blank nor a known tag record.
    pub fn read_chunk(
        &mut self,
        chunk: u32,
        data: Option<&mut [u8]>,
        tags: Option<&mut ExtendedTags>,
    ) -> Result<EccResult, Error> {
        #[cfg(feature = "defmt")]
        trace!("read_chunk: {}", chunk);

        #[cfg(feature = "debug-logs")]
        println!("device: read_chunk {chunk}");

        let address = self.geometry.address(chunk)?;
        let mut ecc = EccResult::NoError;

        if let Some(data) = data {
            let len = self.geometry.bytes_per_chunk() as usize;
            if data.len() < len {
                return Err(Error::BufferTooSmall);
            }
            ecc = cmp::max(ecc, self.load(address.page_offset, &mut data[..len])?);
        }

        if let Some(tags) = tags {
            let mut buf = vec![0xFFu8; self.geometry.spare_area_size() as usize];
            ecc = cmp::max(ecc, self.load(address.spare_offset, &mut buf)?);

            *tags = tags::unpack(&buf, true)?;
            if !tags.chunk_used && !tags::is_blank(&buf) {
                #[cfg(feature = "defmt")]
                warn!("read_chunk: damaged tags in chunk {}", chunk);

                ecc = EccResult::Unfixed;
            }
            tags.ecc_result = cmp::max(tags.ecc_result, ecc);
        }

        match ecc {
            EccResult::Unfixed => Err(Error::Flash(FlashOp::Read)),
            EccResult::Fixed | EccResult::NoError => Ok(ecc),
        }
    }

    /// Tells an empty block from one in use by looking at its first chunk. Returns the
    /// sequence number of the block, or 0 if it is empty.
    pub fn query_block(&mut self, block: u32) -> Result<(BlockState, u32), Error> {
        #[cfg(feature = "defmt")]
        trace!("query_block: {}", block);

        let first = self.geometry.first_chunk(block)?;
        let mut tags = ExtendedTags::default();
        self.read_chunk(first, None, Some(&mut tags))?;

        #[cfg(feature = "debug-logs")]
        println!("device: query_block {block}: {tags:?}");

        if tags.chunk_used {
            Ok((BlockState::NeedsScanning, tags.sequence_number))
        } else {
            Ok((BlockState::Empty, 0))
        }
    }

    pub fn erase_block(&mut self, block: u32) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("erase_block: {}", block);

        #[cfg(feature = "debug-logs")]
        println!("device: erase_block {block}");

        let from = self.base_address + self.geometry.erase_block_offset(block)?;
        let to = from + self.geometry.erase_block_size();

        self.hal
            .erase(from, to)
            .map_err(|_| Error::Flash(FlashOp::Erase))
    }

    /// Always succeeds without touching the flash.
    ///
    /// NOR flash has no out-of-band area to carry a bad block marker in this layout, so
    /// bad blocks have to be remembered by the filesystem itself.
    pub fn mark_block_bad(&mut self, _block: u32) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        warn!("mark_block_bad: {} ignored on NOR", _block);

        #[cfg(feature = "debug-logs")]
        println!("device: mark_block_bad {_block} ignored");

        Ok(())
    }

    /// Whether page and spare area of the chunk still read as erased.
    pub fn is_chunk_erased(&mut self, chunk: u32) -> Result<bool, Error> {
        #[cfg(feature = "defmt")]
        trace!("is_chunk_erased: {}", chunk);

        let address = self.geometry.address(chunk)?;
        let mut buf = vec![0u8; self.geometry.chunk_stride() as usize];
        let ecc = self.load(address.page_offset, &mut buf)?;

        Ok(ecc != EccResult::Unfixed && buf.iter().all(|&e| e == 0xFF))
    }

    /// Queries every block of the device.
    pub fn statistics(&mut self) -> Result<BlockStatistics, Error> {
        let mut stats = BlockStatistics::default();

        for block in 0..self.geometry.block_count() {
            match self.query_block(block) {
                Ok((BlockState::Empty, _)) => stats.empty += 1,
                Ok((BlockState::NeedsScanning, sequence)) => {
                    stats.needs_scanning += 1;
                    stats.highest_sequence = cmp::max(stats.highest_sequence, sequence);
                }
                Err(Error::Flash(FlashOp::Read)) => stats.unreadable += 1,
                Err(e) => return Err(e),
            }
        }

        Ok(stats)
    }
}

impl<T: Platform + MultiwriteNorFlash> ChunkDevice<T> {
    /// Sets the deleted flag in the tags of a written chunk without erasing it. Unused and
    /// already deleted chunks are left alone.
    pub fn mark_chunk_deleted(&mut self, chunk: u32) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("mark_chunk_deleted: {}", chunk);

        #[cfg(feature = "debug-logs")]
        println!("device: mark_chunk_deleted {chunk}");

        let mut tags = ExtendedTags::default();
        self.read_chunk(chunk, None, Some(&mut tags))?;
        if !tags.chunk_used || tags.is_deleted {
            return Ok(());
        }

        // programming the header byte with only the deleted bit cleared leaves all other bits as they are
        let header = !TF_DELETED;
        let address = self.geometry.address(chunk)?;
        self.program(address.spare_offset, &[header])
    }
}
