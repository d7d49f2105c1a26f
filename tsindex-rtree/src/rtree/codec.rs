//! Ready-made payload codecs for [`RTree::serialize`] and
//! [`RTree::deserialize`].
//!
//! Each encoder has the shape `FnMut(&T, &mut impl BufMut)` and each decoder
//! `FnMut(&mut impl Buf) -> SpatialResult<T>`, so they can be passed by name:
//!
//! ```rust
//! use tsindex_rtree::{codec, RTree, RTreeConfig};
//!
//! let mut tree = RTree::new(RTreeConfig::default()).unwrap();
//! tree.insert_point(&[1.0, 1.0], 7i32).unwrap();
//!
//! let mut buf = Vec::new();
//! tree.serialize(&mut buf, codec::put_i32).unwrap();
//! let restored = RTree::deserialize(&mut buf.as_slice(), codec::get_i32).unwrap();
//! assert_eq!(restored.len(), 1);
//! ```
//!
//! [`RTree::serialize`]: super::RTree::serialize
//! [`RTree::deserialize`]: super::RTree::deserialize

use bytes::{Buf, BufMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::rtree_types::{SpatialError, SpatialResult};

/// Largest payload the bincode codec writes or reads.
pub const MAX_PAYLOAD_BYTES: usize = 1 << 20;

// the limit makes bincode check claimed string and sequence lengths before
// it allocates for them
fn payload_config() -> impl bincode::config::Config {
    bincode::config::legacy().with_limit::<MAX_PAYLOAD_BYTES>()
}

/// Writes a big-endian `i32`.
pub fn put_i32<B: BufMut>(value: &i32, sink: &mut B) -> SpatialResult<()> {
    sink.put_i32(*value);
    Ok(())
}

/// Reads a big-endian `i32`.
pub fn get_i32<B: Buf>(source: &mut B) -> SpatialResult<i32> {
    ensure(source, 4)?;
    Ok(source.get_i32())
}

/// Writes a big-endian `u64`.
pub fn put_u64<B: BufMut>(value: &u64, sink: &mut B) -> SpatialResult<()> {
    sink.put_u64(*value);
    Ok(())
}

/// Reads a big-endian `u64`.
pub fn get_u64<B: Buf>(source: &mut B) -> SpatialResult<u64> {
    ensure(source, 8)?;
    Ok(source.get_u64())
}

/// Writes any serde payload as a `u32` length followed by its bincode bytes.
///
/// Payloads over [`MAX_PAYLOAD_BYTES`] are rejected.
pub fn bincode_encode<T: Serialize, B: BufMut>(value: &T, sink: &mut B) -> SpatialResult<()> {
    let bytes = bincode::serde::encode_to_vec(value, payload_config())?;
    if bytes.len() > MAX_PAYLOAD_BYTES {
        return Err(SpatialError::Serialization(format!(
            "payload of {} bytes exceeds {} bytes",
            bytes.len(),
            MAX_PAYLOAD_BYTES
        )));
    }
    sink.put_u32(bytes.len() as u32);
    sink.put_slice(&bytes);
    Ok(())
}

/// Reads a payload written by [`bincode_encode`].
pub fn bincode_decode<T: DeserializeOwned, B: Buf>(source: &mut B) -> SpatialResult<T> {
    ensure(source, 4)?;
    let len = source.get_u32() as usize;
    if len > MAX_PAYLOAD_BYTES {
        return Err(SpatialError::Serialization(format!(
            "payload length {} exceeds {} bytes",
            len, MAX_PAYLOAD_BYTES
        )));
    }
    ensure(source, len)?;

    let mut bytes = vec![0u8; len];
    source.copy_to_slice(&mut bytes);
    let (value, read) = bincode::serde::decode_from_slice(&bytes, payload_config())?;
    if read != len {
        return Err(SpatialError::Serialization(format!(
            "payload used {} of {} bytes",
            read, len
        )));
    }
    Ok(value)
}

fn ensure<B: Buf>(source: &B, needed: usize) -> SpatialResult<()> {
    if source.remaining() < needed {
        return Err(SpatialError::Serialization(format!(
            "truncated payload: need {} bytes, {} left",
            needed,
            source.remaining()
        )));
    }
    Ok(())
}
