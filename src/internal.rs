use crate::ChunkDevice;
use crate::error::{Error, FlashOp};
use crate::platform::{Platform, ReadFault};
use crate::raw::write_aligned;
use crate::tags::EccResult;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

impl<T: Platform> ChunkDevice<T> {
    /// Writes `bytes` at the device relative `offset`.
    pub(crate) fn program(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("program: @{:#08x} [{}]", offset, bytes.len());

        #[cfg(feature = "debug-logs")]
        println!("  internal: program @{offset:#08x} [{}]", bytes.len());

        write_aligned(&mut self.hal, self.base_address + offset, bytes)
            .map_err(|_| Error::Flash(FlashOp::Write))
    }

    /// Fills `buf` from the device relative `offset` and reports what the driver's ECC had to
    /// say about it. Only reads that didn't happen at all are errors here, an uncorrectable ECC
    /// error is left for the caller to deal with.
    pub(crate) fn load(&mut self, offset: u32, buf: &mut [u8]) -> Result<EccResult, Error> {
        #[cfg(feature = "defmt")]
        trace!("load: @{:#08x} [{}]", offset, buf.len());

        #[cfg(feature = "debug-logs")]
        println!("  internal: load @{offset:#08x} [{}]", buf.len());

        match self.hal.read(self.base_address + offset, buf) {
            Ok(()) => Ok(EccResult::NoError),
            Err(e) => match T::read_fault(&e) {
                ReadFault::Corrected => {
                    #[cfg(feature = "defmt")]
                    warn!("load: corrected ECC error @{:#08x}", offset);

                    #[cfg(feature = "debug-logs")]
                    println!("  internal: corrected ECC error @{offset:#08x}");

                    Ok(EccResult::Fixed)
                }
                ReadFault::Uncorrectable => {
                    #[cfg(feature = "defmt")]
                    warn!("load: uncorrectable ECC error @{:#08x}", offset);

                    #[cfg(feature = "debug-logs")]
                    println!("  internal: uncorrectable ECC error @{offset:#08x}");

                    Ok(EccResult::Unfixed)
                }
                ReadFault::Failure => Err(Error::Flash(FlashOp::Read)),
            },
        }
    }
}
