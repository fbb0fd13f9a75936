//! MurmurHash64A, the 64-bit hash the engine uses for every resource name.
//!
//! File ids, type ids and stream ids are all produced by this function with a
//! zero seed. It is the only link between a hierarchy entry's source id and the
//! stream record that carries its payload, so the tail handling has to match
//! the reference implementation bit for bit.

const M: u64 = 0xc6a4_a793_5bd1_e995;
const R: u32 = 47;

/// Hash `data` with seed 0.
pub fn murmur64(data: &[u8]) -> u64 {
    murmur64_seeded(data, 0)
}

pub fn murmur64_seeded(data: &[u8], seed: u64) -> u64 {
    let mut h = seed ^ (data.len() as u64).wrapping_mul(M);

    let mut words = data.chunks_exact(8);
    for word in &mut words {
        let mut k = u64::from_le_bytes([
            word[0], word[1], word[2], word[3], word[4], word[5], word[6], word[7],
        ]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = words.remainder();
    if !tail.is_empty() {
        for (i, byte) in tail.iter().enumerate().rev() {
            h ^= u64::from(*byte) << (8 * i);
        }
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}

/// Stream file id for a prefetch/streamed source:
/// `hash64(dirname(dependency_path) + "/" + source_id)`.
pub fn stream_file_id(dependency_path: &str, source_id: u32) -> u64 {
    let key = format!("{}/{}", dirname(dependency_path), source_id);
    murmur64(key.as_bytes())
}

/// POSIX `dirname` as the asset tools compute it: everything up to the last
/// `/` with trailing slashes trimmed, unless the head is made only of slashes.
pub fn dirname(path: &str) -> &str {
    let Some(idx) = path.rfind('/') else {
        return "";
    };
    let head = &path[..=idx];
    if head.bytes().all(|b| b == b'/') {
        head
    } else {
        head.trim_end_matches('/')
    }
}
