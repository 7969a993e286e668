//! Non-cryptographic hashing for identifying byte runs, e.g. the
//! contents of a stream window.

/// Paul Hsieh's SuperFastHash of `data`.
///
/// 16-bit words are read little-endian, so the value is the same on
/// every platform. Empty input hashes to 0.
pub fn super_fast_hash(data: &[u8]) -> u32 {
    if data.is_empty() {
        return 0;
    }

    fn word(low: u8, high: u8) -> u32 {
        u32::from(u16::from_le_bytes([low, high]))
    }

    let mut hash = data.len() as u32;

    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        hash = hash.wrapping_add(word(block[0], block[1]));
        let mixed = (word(block[2], block[3]) << 11) ^ hash;
        hash = (hash << 16) ^ mixed;
        hash = hash.wrapping_add(hash >> 11);
    }

    match *blocks.remainder() {
        [a, b, c] => {
            hash = hash.wrapping_add(word(a, b));
            hash ^= hash << 16;
            hash ^= u32::from(c) << 18;
            hash = hash.wrapping_add(hash >> 11);
        }
        [a, b] => {
            hash = hash.wrapping_add(word(a, b));
            hash ^= hash << 11;
            hash = hash.wrapping_add(hash >> 17);
        }
        [a] => {
            hash = hash.wrapping_add(u32::from(a));
            hash ^= hash << 10;
            hash = hash.wrapping_add(hash >> 1);
        }
        _ => {}
    }

    // Avalanche the last bits
    hash ^= hash << 3;
    hash = hash.wrapping_add(hash >> 5);
    hash ^= hash << 4;
    hash = hash.wrapping_add(hash >> 17);
    hash ^= hash << 25;
    hash = hash.wrapping_add(hash >> 6);
    hash
}

/// Mix `value` into `seed`, so that a sequence of hashes folds into
/// one order-dependent value.
pub fn hash_combine(seed: &mut u32, value: u32) {
    *seed ^= value
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(*seed << 6)
        .wrapping_add(*seed >> 2);
}
