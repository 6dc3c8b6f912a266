use std::collections::BTreeSet;

use rand::{Rng, seq::SliceRandom};

use crate::error::{Result, bench_error::BenchError};

/// Pick the tool pool offered to one session: every golden tool plus uniformly drawn
/// distractors, shuffled so position does not reveal which tools are golden.
///
/// `golden` and `all` are sets, so duplicates are already gone. The caller supplies the
/// random source; a seeded `StdRng` makes the draw reproducible.
pub fn sample_pool<R: Rng + ?Sized>(
    golden: &BTreeSet<String>,
    pool_size: usize,
    all: &BTreeSet<String>,
    rng: &mut R,
) -> Result<Vec<String>> {
    if pool_size < golden.len() {
        return Err(BenchError::Configuration(format!(
            "pool size {pool_size} is smaller than the {} golden tools",
            golden.len()
        ))
        .into());
    }

    let candidates: Vec<&String> = all.difference(golden).collect();
    let wanted = pool_size - golden.len();
    if candidates.len() < wanted {
        return Err(BenchError::Configuration(format!(
            "need {wanted} distractor tools but only {} are available",
            candidates.len()
        ))
        .into());
    }

    let mut pool: Vec<String> = golden.iter().cloned().collect();
    pool.extend(candidates.choose_multiple(rng, wanted).map(|name| (*name).clone()));
    pool.shuffle(rng);

    Ok(pool)
}
