//! Room code generation.

use korero_protocol::{ROOM_CODE_ALPHABET, ROOM_CODE_LEN, RoomCode};
use rand::Rng;

/// Draws random codes until one is not `taken`.
///
/// The code space holds 24^4 = 331 776 codes, far more than a single
/// server keeps alive, so the loop ends after a handful of draws.
pub fn generate_room_code<R, F>(rng: &mut R, taken: F) -> RoomCode
where
    R: Rng + ?Sized,
    F: Fn(&RoomCode) -> bool,
{
    loop {
        let code: String = (0..ROOM_CODE_LEN)
            .map(|_| char::from(ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())]))
            .collect();
        let code = RoomCode::new(code);
        if !taken(&code) {
            return code;
        }
        tracing::debug!(%code, "room code collision, redrawing");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_generate_room_code_is_well_formed() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(generate_room_code(&mut rng, |_| false).is_well_formed());
        }
    }

    #[test]
    fn test_generate_room_code_1000_never_duplicates_live() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut live = HashSet::new();
        for _ in 0..1000 {
            let code = generate_room_code(&mut rng, |c| live.contains(c));
            assert!(live.insert(code), "duplicate live code");
        }
        assert_eq!(live.len(), 1000);
    }

    #[test]
    fn test_generate_room_code_skips_taken() {
        let mut rng = StdRng::seed_from_u64(3);
        let first = generate_room_code(&mut StdRng::seed_from_u64(3), |_| false);
        let code = generate_room_code(&mut rng, |c| c == &first);
        assert_ne!(code, first);
    }
}
