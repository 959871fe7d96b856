#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use embedded_storage::nor_flash::{
    ErrorType, MultiwriteNorFlash, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use nor_chunk::Geometry;
use nor_chunk::platform::{Ecc, ReadFault};
use std::collections::BTreeMap;

pub const ERASE_BLOCK_SIZE: usize = 64 * 1024;
pub const FLASH_SECTOR_SIZE: usize = 4096;
pub const WORD_SIZE: usize = 4;

pub const BYTES_PER_CHUNK: u32 = 512;
pub const CHUNKS_PER_BLOCK: u32 = 64;
pub const SPARE_AREA_SIZE: u32 = 16;
pub const CHUNK_STRIDE: u32 = BYTES_PER_CHUNK + SPARE_AREA_SIZE;

pub fn geometry(blocks: u32) -> Geometry {
    Geometry::nor(BYTES_PER_CHUNK, CHUNKS_PER_BLOCK, blocks).unwrap()
}

#[derive(Default)]
pub struct Flash {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    pub operations: Vec<Operation>,
    /// ECC verdicts returned for reads starting at the given offset
    pub ecc_faults: BTreeMap<u32, FlashError>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { offset: u32, len: usize },
}

impl Flash {
    pub fn new(blocks: usize) -> Self {
        Self {
            buf: vec![0xffu8; ERASE_BLOCK_SIZE * blocks],
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn new_with_fault(blocks: usize, fail_after_operation: usize) -> Self {
        Self {
            buf: vec![0xffu8; ERASE_BLOCK_SIZE * blocks],
            fail_after_operation,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
        self.ecc_faults.clear();
    }

    pub fn inject_ecc(&mut self, offset: u32, fault: FlashError) {
        self.ecc_faults.insert(offset, fault);
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. }))
            .count()
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FlashError {
    Corrected,
    Uncorrectable,
    Failure,
}

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl Ecc for Flash {
    fn read_fault(error: &FlashError) -> ReadFault {
        match error {
            FlashError::Corrected => ReadFault::Corrected,
            FlashError::Uncorrectable => ReadFault::Uncorrectable,
            FlashError::Failure => ReadFault::Failure,
        }
    }
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = WORD_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::READ_SIZE as _));

        println!(
            "    flash: read:  0x{offset:05X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );
        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError::Failure);
        }
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let start = offset as usize;
        bytes.copy_from_slice(&self.buf[start..start + bytes.len()]);

        match self.ecc_faults.get(&offset) {
            Some(&fault) => {
                println!("    flash: ECC {fault:?}");
                Err(fault)
            }
            None => Ok(()),
        }
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = WORD_SIZE;

    const ERASE_SIZE: usize = FLASH_SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as _));

        println!(
            "    flash: erase: {from:05X} - {to:05X} #{:>2}",
            self.operations.len()
        );

        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError::Failure);
        }

        self.operations.push(Operation::Erase {
            offset: from,
            len: (to - from) as usize,
        });

        for addr in from..to {
            self.buf[addr as usize] = 0xff;
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE as _));

        println!(
            "    flash: write: 0x{offset:05X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );

        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError::Failure);
        }
        assert!(!bytes.is_empty());

        self.operations.push(Operation::Write {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        for (i, &val) in bytes.iter().enumerate() {
            // NOR can only flip bits from 1 to 0
            self.buf[offset + i] &= val;
        }
        Ok(())
    }
}

// programming the same word twice is fine since writes only ever clear bits
impl MultiwriteNorFlash for Flash {}
