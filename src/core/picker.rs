/// Uniform selection primitives: single picks and k-of-n samples.

use rand::seq::SliceRandom;
use rand::Rng;

/// Pick one element with uniform probability.
///
/// Returns `None` only for an empty slice. Assemblers treat that as a data
/// gap in the fragment table and recover from it themselves.
pub fn pick<'a, T, R>(items: &'a [T], rng: &mut R) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    items.choose(rng)
}

/// Select `k` elements without replacement, in randomized order.
///
/// Elements are distinct by position, so duplicate values in `items` may
/// both be chosen. When `k` exceeds the slice length the whole slice comes
/// back shuffled.
pub fn sample<'a, T, R>(items: &'a [T], k: usize, rng: &mut R) -> Vec<&'a T>
where
    R: Rng + ?Sized,
{
    let mut shuffled: Vec<&T> = items.iter().collect();
    shuffled.shuffle(rng);
    shuffled.truncate(k);
    shuffled
}
