use thiserror::Error;

/// Errors that can occur while addressing, encoding or transferring chunks. Marked as
/// non-exhaustive to allow for future additions without breaking the API.
///
/// An ECC correction is not an error: a corrected read succeeds and reports
/// [`EccResult::Fixed`](crate::tags::EccResult::Fixed) in the tags.
#[derive(Error, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Zero sized chunks or blocks, chunks not fitting into an erase block, a spare area
    /// too small for the tag record, or a layout that doesn't match the flash.
    #[error("invalid geometry")]
    InvalidGeometry,

    /// The partition offset has to be aligned to the erase size of the flash
    #[error("invalid partition offset")]
    InvalidPartitionOffset,

    /// The chunk lies beyond the last erase block of the device
    #[error("chunk out of range")]
    ChunkOutOfRange,

    /// The erase block lies beyond the end of the device
    #[error("block out of range")]
    BlockOutOfRange,

    /// A tag buffer shorter than the packed record, or a data buffer shorter than a chunk
    #[error("buffer too small")]
    BufferTooSmall,

    /// More data than fits into a single chunk
    #[error("data too long")]
    DataTooLong,

    /// Object id, chunk id or byte count don't fit into their 24-bit on-flash fields
    #[error("tag value out of range")]
    TagsOutOfRange,

    /// The flash reported a failure. Uncorrectable ECC errors are reported as failed reads.
    #[error("flash {0} failed")]
    Flash(FlashOp),
}

/// The flash operation that failed.
#[derive(strum::Display, Debug, Copy, Clone, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashOp {
    Write,
    Read,
    Erase,
}
