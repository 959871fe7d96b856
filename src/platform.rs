use embedded_storage::nor_flash::{ErrorType, NorFlash};

/// Everything the chunk layer needs from a flash driver. See README.md for an example
/// implementation.
pub trait Platform: Ecc + NorFlash {}

impl<T: Ecc + NorFlash> Platform for T {}

/// How a failed read has to be interpreted.
///
/// `Corrected` and `Uncorrectable` follow the MTD convention: the read itself was carried
/// out and the buffer holds the data, but the driver's ECC had to step in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadFault {
    /// Bit flips were detected and repaired, the buffer content is valid.
    Corrected,
    /// Bit flips were detected but could not be repaired, the buffer content is not trustworthy.
    Uncorrectable,
    /// The read wasn't carried out at all.
    Failure,
}

/// Classifies the read errors of a flash driver. ECC itself is computed by the driver or
/// the hardware; this crate only consumes the verdict.
pub trait Ecc: ErrorType {
    fn read_fault(error: &Self::Error) -> ReadFault;
}

impl<T: Ecc> Ecc for &mut T {
    fn read_fault(error: &Self::Error) -> ReadFault {
        T::read_fault(error)
    }
}

pub trait AlignedOps: Platform {
    fn align_write_floor(size: usize) -> usize {
        align_floor(size, Self::WRITE_SIZE)
    }

    fn is_aligned(size: usize) -> bool {
        size.is_multiple_of(Self::WRITE_SIZE) && size.is_multiple_of(Self::READ_SIZE)
    }
}

#[inline(always)]
const fn align_floor(size: usize, alignment: usize) -> usize {
    if alignment.is_power_of_two() {
        size & !(alignment - 1)
    } else {
        size / alignment * alignment
    }
}

impl<T: Platform> AlignedOps for T {}

#[cfg(any(
    feature = "esp32",
    feature = "esp32s2",
    feature = "esp32s3",
    feature = "esp32c2",
    feature = "esp32c3",
    feature = "esp32c6",
    feature = "esp32h2",
))]
mod chip {
    use embedded_storage::nor_flash::ErrorType;
    use esp_storage::FlashStorage;

    use crate::platform::{Ecc, ReadFault};

    // The SPI NOR flash on ESP chips has no ECC, every read error is a plain failure.
    impl Ecc for FlashStorage<'_> {
        fn read_fault(_error: &<Self as ErrorType>::Error) -> ReadFault {
            ReadFault::Failure
        }
    }
}
