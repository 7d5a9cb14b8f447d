use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Upper bound for the first id. Ids stay well inside the range a
/// JavaScript number holds exactly.
const MAX_START: u64 = 1 << 40;

/// Hands out connection and player ids.
///
/// The first id is drawn from `rng` so restarts do not reuse old ids; later
/// ids count up from it and never collide within a process.
#[derive(Debug)]
pub struct IdSource {
    next: AtomicU64,
}

impl IdSource {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            next: AtomicU64::new(rng.gen_range(1..MAX_START)),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn when_ids_are_drawn_back_to_back_then_they_count_up() {
        let ids = IdSource::new(&mut StdRng::seed_from_u64(11));
        let first = ids.next_id();
        assert_eq!(ids.next_id(), first + 1);
        assert!(first >= 1 && first < MAX_START);
    }

    #[test]
    fn when_seeds_differ_then_id_ranges_start_apart() {
        let a = IdSource::new(&mut StdRng::seed_from_u64(1)).next_id();
        let b = IdSource::new(&mut StdRng::seed_from_u64(2)).next_id();
        assert_ne!(a, b);
    }
}
