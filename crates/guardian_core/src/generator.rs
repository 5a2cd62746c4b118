//! crates/guardian_core/src/generator.rs
//!
//! Random secret generation for the "generate" panel.

use rand::{rngs::OsRng, CryptoRng, Rng};

/// Every generated secret has exactly this many characters.
pub const SECRET_LENGTH: usize = 16;

/// The 88 characters a generated secret is drawn from.
pub const ALPHABET: &[u8; 88] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Generates a secret from the operating system's CSPRNG.
pub fn generate_secret() -> String {
    generate_secret_with(&mut OsRng)
}

/// Generates a secret from a caller-provided cryptographically secure RNG.
pub fn generate_secret_with<R: Rng + CryptoRng>(rng: &mut R) -> String {
    (0..SECRET_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    #[test]
    fn alphabet_has_88_distinct_characters() {
        let distinct: HashSet<u8> = ALPHABET.iter().copied().collect();
        assert_eq!(distinct.len(), 88);
    }

    #[test]
    fn generated_secrets_are_16_alphabet_characters() {
        for _ in 0..200 {
            let secret = generate_secret();
            assert_eq!(secret.chars().count(), SECRET_LENGTH);
            assert!(secret.bytes().all(|b| ALPHABET.contains(&b)), "{secret}");
        }
    }

    #[test]
    fn consecutive_generations_differ() {
        let mut previous = generate_secret();
        for _ in 0..100 {
            let next = generate_secret();
            assert_ne!(previous, next);
            previous = next;
        }
    }

    #[test]
    fn seeded_generation_is_reproducible_and_seed_dependent() {
        let a = generate_secret_with(&mut StdRng::seed_from_u64(7));
        let b = generate_secret_with(&mut StdRng::seed_from_u64(7));
        let c = generate_secret_with(&mut StdRng::seed_from_u64(8));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
