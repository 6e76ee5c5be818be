//! Seeded generators.
//!
//! Everything here is driven by a `ChaCha8Rng` seeded from a `u64`, so a
//! failing test can be replayed from its seed alone.

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Characters drawn by [`random_entries`]: ASCII, Latin-1, Greek, CJK
/// and an astral-plane emoji so surrogate pairs show up.
const ALPHABET: &[char] = &[
    'a', 'b', 'c', 'x', 'y', 'z', 'Q', '0', '7', ' ', '-', 'é', 'ß', 'λ', 'Ω', '字', '\u{1F680}',
];

/// `len` random bytes.
pub fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    bytes
}

/// `count` non-empty strings of up to `max_chars` characters with no NUL.
pub fn random_entries(seed: u64, count: usize, max_chars: usize) -> Vec<String> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let max_chars = max_chars.max(1);
    (0..count)
        .map(|_| {
            let len = 1 + (rng.next_u32() as usize % max_chars);
            (0..len)
                .map(|_| ALPHABET[rng.next_u32() as usize % ALPHABET.len()])
                .collect()
        })
        .collect()
}

/// `len` arbitrary UTF-16 units, lone surrogates and NUL included.
pub fn random_units(seed: u64, len: usize) -> Vec<u16> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len).map(|_| rng.next_u32() as u16).collect()
}
