mod common;

use nor_chunk::error::Error;
use nor_chunk::geometry::{NOR_ERASE_BLOCK_SIZE, NOR_SPARE_AREA_SIZE};
use nor_chunk::{ChunkAddress, Geometry};
use pretty_assertions::assert_eq;

#[test]
fn page_offset_of_chunk_in_third_block() {
    let geometry = Geometry::new(512, 64, 65536, 16, 3).unwrap();

    assert_eq!(geometry.page_offset(130).unwrap(), 132128);
    assert_eq!(geometry.spare_offset(130).unwrap(), 132128 + 512);
    assert_eq!(
        geometry.address(130).unwrap(),
        ChunkAddress {
            block: 2,
            chunk_in_block: 2,
            page_offset: 132128,
            spare_offset: 132640,
        }
    );
}

#[test]
fn nor_defaults() {
    let geometry = Geometry::nor(512, 64, 3).unwrap();

    assert_eq!(geometry, Geometry::new(512, 64, 65536, 16, 3).unwrap());
    assert_eq!(NOR_ERASE_BLOCK_SIZE, 65536);
    assert_eq!(NOR_SPARE_AREA_SIZE, 16);
    assert_eq!(geometry.chunk_stride(), 528);
    assert_eq!(geometry.chunk_count(), 192);
    assert_eq!(geometry.total_size(), 3 * 65536);
}

#[test]
fn offsets_grow_within_a_block_and_jump_at_block_boundaries() {
    let geometry = common::geometry(3);

    for chunk in 0..geometry.chunk_count() - 1 {
        let this = geometry.page_offset(chunk).unwrap();
        let next = geometry.page_offset(chunk + 1).unwrap();

        if geometry.block_of(chunk) == geometry.block_of(chunk + 1) {
            assert!(next > this);
            assert_eq!(next - this, geometry.chunk_stride());
        } else {
            assert_eq!((chunk + 1) % geometry.chunks_per_block(), 0);
            let block = geometry.block_of(chunk + 1);
            assert_eq!(next, geometry.erase_block_offset(block).unwrap());
        }
    }
}

#[test]
fn block_boundaries_every_chunks_per_block() {
    let geometry = common::geometry(3);

    assert_eq!(geometry.block_of(63), 0);
    assert_eq!(geometry.block_of(64), 1);
    assert_eq!(geometry.block_of(127), 1);
    assert_eq!(geometry.block_of(128), 2);

    assert_eq!(geometry.first_chunk(0).unwrap(), 0);
    assert_eq!(geometry.first_chunk(1).unwrap(), 64);
    assert_eq!(geometry.first_chunk(2).unwrap(), 128);

    assert_eq!(geometry.erase_block_offset(0).unwrap(), 0);
    assert_eq!(geometry.erase_block_offset(2).unwrap(), 2 * 65536);
}

#[test]
fn last_chunk_of_a_block_fits_into_it() {
    let geometry = common::geometry(1);

    let last = geometry.address(63).unwrap();
    assert!(last.spare_offset + NOR_SPARE_AREA_SIZE <= NOR_ERASE_BLOCK_SIZE);
}

#[test]
fn out_of_range() {
    let geometry = common::geometry(2);

    assert!(geometry.page_offset(127).is_ok());
    assert_eq!(geometry.page_offset(128), Err(Error::ChunkOutOfRange));
    assert_eq!(geometry.spare_offset(u32::MAX), Err(Error::ChunkOutOfRange));
    assert_eq!(geometry.erase_block_offset(2), Err(Error::BlockOutOfRange));
    assert_eq!(geometry.first_chunk(2), Err(Error::BlockOutOfRange));
}

#[test]
fn rejects_invalid_geometry() {
    // no chunks per block
    assert_eq!(
        Geometry::new(512, 0, 65536, 16, 1),
        Err(Error::InvalidGeometry)
    );
    // empty chunks
    assert_eq!(Geometry::new(0, 64, 65536, 16, 1), Err(Error::InvalidGeometry));
    // empty erase blocks
    assert_eq!(Geometry::new(512, 64, 0, 16, 1), Err(Error::InvalidGeometry));
    // spare area smaller than the tag record
    assert_eq!(Geometry::new(512, 64, 65536, 8, 1), Err(Error::InvalidGeometry));
    // no blocks
    assert_eq!(Geometry::new(512, 64, 65536, 16, 0), Err(Error::InvalidGeometry));
    // beyond 4 GiB
    assert_eq!(
        Geometry::new(512, 64, 65536, 16, 65536),
        Err(Error::InvalidGeometry)
    );
    assert!(Geometry::new(512, 64, 65536, 16, 65535).is_ok());
}

#[test]
fn chunks_have_to_fit_into_the_erase_block() {
    assert!(Geometry::new(1008, 64, 65536, 16, 1).is_ok());
    assert_eq!(
        Geometry::new(1008, 65, 65536, 16, 1),
        Err(Error::InvalidGeometry)
    );
}
