//! Maps logical chunk indices onto NOR flash byte offsets.
//!
//! Each erase block holds `chunks_per_block` chunks laid out back to back, every chunk being
//! its data page immediately followed by its spare area. Whatever is left at the end of an
//! erase block stays unused.
//!
//! ```text
//! | page 0 | spare 0 | page 1 | spare 1 | ... | page n-1 | spare n-1 | unused |
//! ```

use crate::error::Error;
use crate::tags::PACKED_TAGS_SIZE;

/// Erase block size of the default NOR layout.
pub const NOR_ERASE_BLOCK_SIZE: u32 = 64 * 1024;

/// Spare area size of the default NOR layout, exactly one packed tag record.
pub const NOR_SPARE_AREA_SIZE: u32 = PACKED_TAGS_SIZE as u32;

/// Immutable device layout. All offsets are relative to the start of the device.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    bytes_per_chunk: u32,
    chunks_per_block: u32,
    erase_block_size: u32,
    spare_area_size: u32,
    block_count: u32,
}

/// The physical location of a chunk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChunkAddress {
    pub block: u32,
    pub chunk_in_block: u32,
    pub page_offset: u32,
    pub spare_offset: u32,
}

impl Geometry {
    pub const fn new(
        bytes_per_chunk: u32,
        chunks_per_block: u32,
        erase_block_size: u32,
        spare_area_size: u32,
        block_count: u32,
    ) -> Result<Self, Error> {
        if bytes_per_chunk == 0 || chunks_per_block == 0 || erase_block_size == 0 {
            return Err(Error::InvalidGeometry);
        }

        if (spare_area_size as usize) < PACKED_TAGS_SIZE {
            return Err(Error::InvalidGeometry);
        }

        let stride = bytes_per_chunk as u64 + spare_area_size as u64;
        if stride * chunks_per_block as u64 > erase_block_size as u64 {
            return Err(Error::InvalidGeometry);
        }

        // the end of the last block has to be addressable with a u32 as well
        if block_count == 0 || block_count as u64 * erase_block_size as u64 > u32::MAX as u64 {
            return Err(Error::InvalidGeometry);
        }

        Ok(Self {
            bytes_per_chunk,
            chunks_per_block,
            erase_block_size,
            spare_area_size,
            block_count,
        })
    }

    /// 64 KiB erase blocks with a 16 byte spare area per chunk.
    pub const fn nor(
        bytes_per_chunk: u32,
        chunks_per_block: u32,
        block_count: u32,
    ) -> Result<Self, Error> {
        Self::new(
            bytes_per_chunk,
            chunks_per_block,
            NOR_ERASE_BLOCK_SIZE,
            NOR_SPARE_AREA_SIZE,
            block_count,
        )
    }

    pub const fn bytes_per_chunk(&self) -> u32 {
        self.bytes_per_chunk
    }

    pub const fn chunks_per_block(&self) -> u32 {
        self.chunks_per_block
    }

    pub const fn erase_block_size(&self) -> u32 {
        self.erase_block_size
    }

    pub const fn spare_area_size(&self) -> u32 {
        self.spare_area_size
    }

    pub const fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Distance between two consecutive chunks of the same block.
    pub const fn chunk_stride(&self) -> u32 {
        self.bytes_per_chunk + self.spare_area_size
    }

    pub const fn chunk_count(&self) -> u32 {
        self.chunks_per_block * self.block_count
    }

    /// Bytes spanned by all erase blocks.
    pub const fn total_size(&self) -> u32 {
        self.erase_block_size * self.block_count
    }

    pub const fn block_of(&self, chunk: u32) -> u32 {
        chunk / self.chunks_per_block
    }

    pub const fn first_chunk(&self, block: u32) -> Result<u32, Error> {
        if block >= self.block_count {
            return Err(Error::BlockOutOfRange);
        }
        Ok(block * self.chunks_per_block)
    }

    pub const fn address(&self, chunk: u32) -> Result<ChunkAddress, Error> {
        let block = self.block_of(chunk);
        if block >= self.block_count {
            return Err(Error::ChunkOutOfRange);
        }

        let chunk_in_block = chunk % self.chunks_per_block;
        let page_offset = self.erase_block_size * block + self.chunk_stride() * chunk_in_block;

        Ok(ChunkAddress {
            block,
            chunk_in_block,
            page_offset,
            spare_offset: page_offset + self.bytes_per_chunk,
        })
    }

    pub const fn page_offset(&self, chunk: u32) -> Result<u32, Error> {
        match self.address(chunk) {
            Ok(address) => Ok(address.page_offset),
            Err(e) => Err(e),
        }
    }

    pub const fn spare_offset(&self, chunk: u32) -> Result<u32, Error> {
        match self.address(chunk) {
            Ok(address) => Ok(address.spare_offset),
            Err(e) => Err(e),
        }
    }

    pub const fn erase_block_offset(&self, block: u32) -> Result<u32, Error> {
        if block >= self.block_count {
            return Err(Error::BlockOutOfRange);
        }
        Ok(self.erase_block_size * block)
    }
}
