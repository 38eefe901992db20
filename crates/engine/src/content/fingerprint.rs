use sha2::{Digest, Sha256};

use crate::nav::WalkabilityMask;

/// SHA-256 over the mask dimensions and alpha channel. Two masks with the same
/// fingerprint produce the same walkability grid.
pub fn mask_fingerprint(mask: &WalkabilityMask) -> String {
    let mut hasher = Sha256::new();
    hasher.update(mask.width().to_le_bytes());
    hasher.update(mask.height().to_le_bytes());
    hasher.update(mask.alpha_values());
    to_hex_lower(&hasher.finalize())
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_tracks_dimensions_and_alpha() {
        let a = WalkabilityMask::from_alpha(2, 2, vec![0, 0, 0, 255]).expect("mask");
        let b = WalkabilityMask::from_alpha(4, 1, vec![0, 0, 0, 255]).expect("mask");
        let c = WalkabilityMask::from_alpha(2, 2, vec![0, 0, 0, 254]).expect("mask");
        assert_eq!(mask_fingerprint(&a), mask_fingerprint(&a.clone()));
        assert_ne!(mask_fingerprint(&a), mask_fingerprint(&b));
        assert_ne!(mask_fingerprint(&a), mask_fingerprint(&c));
        assert_eq!(mask_fingerprint(&a).len(), 64);
    }
}
