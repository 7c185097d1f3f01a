//! Hash functions that place nodes and keys on a [`HashRing`](super::HashRing).
//!
//! Any `Fn(&[u8]) -> u32` can be used as a ring hasher, which keeps tests
//! free to plug in a transparent mapping:
//!
//! ```
//! use ringcache::ring::HashRing;
//!
//! fn first_byte(data: &[u8]) -> u32 {
//!     data.first().copied().unwrap_or(0) as u32
//! }
//!
//! let mut ring = HashRing::with_hasher(1, first_byte);
//! ring.add_nodes(["a"]);
//! assert_eq!(ring.lookup("zzz"), Some("a"));
//! ```

/// Maps an arbitrary byte sequence to a ring position.
///
/// Implementations must be deterministic: every process that builds a ring
/// for the same cluster has to agree on the positions.
pub trait RingHasher {
    fn hash(&self, data: &[u8]) -> u32;
}

impl<F> RingHasher for F
where
    F: Fn(&[u8]) -> u32,
{
    #[inline]
    fn hash(&self, data: &[u8]) -> u32 {
        self(data)
    }
}

/// IEEE CRC-32 checksum, the default ring hasher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crc32Hasher;

impl RingHasher for Crc32Hasher {
    #[inline]
    fn hash(&self, data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_matches_ieee_check_value() {
        // Standard CRC-32/ISO-HDLC check value.
        assert_eq!(Crc32Hasher.hash(b"123456789"), 0xCBF4_3926);
        assert_eq!(Crc32Hasher.hash(b""), 0);
    }

    #[test]
    fn fn_items_are_hashers() {
        fn len_hash(data: &[u8]) -> u32 {
            data.len() as u32
        }
        assert_eq!(len_hash.hash(b"abcd"), 4);

        let closure = |data: &[u8]| data.iter().map(|&b| b as u32).sum::<u32>();
        assert_eq!(closure.hash(&[1, 2, 3]), 6);
    }
}
