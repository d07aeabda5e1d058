//! Constant-time cryptographic operations.
//!
//! Provides timing-safe operations to prevent side-channel attacks.
//! All comparisons are constant-time with respect to secret data.

use subtle::ConstantTimeEq;

/// Constant-time comparison of byte slices.
///
/// Returns `true` if slices are equal, `false` otherwise.
/// Execution time depends only on slice length, not content.
#[must_use]
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

/// Timing-safe 16-byte array comparison (MAC tags).
#[must_use]
#[inline(never)]
pub fn verify_16(a: &[u8; 16], b: &[u8; 16]) -> bool {
    ct_eq(a, b)
}

/// XOR `stream` into `target` in place.
///
/// # Panics
///
/// Panics if `stream` is shorter than `target`.
pub fn xor_in_place(target: &mut [u8], stream: &[u8]) {
    assert!(stream.len() >= target.len());

    for (t, s) in target.iter_mut().zip(stream) {
        *t ^= s;
    }
}

/// Returns `true` if every byte is zero, without early exit.
#[must_use]
pub fn is_all_zero(bytes: &[u8]) -> bool {
    let acc = bytes.iter().fold(0u8, |acc, b| acc | b);
    acc.ct_eq(&0u8).into()
}
