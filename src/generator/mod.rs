pub mod deck;
pub mod quiz_bank;

use rand::Rng;

/// In-place Fisher–Yates: walk from the last index down to 1, swapping each
/// slot with a uniformly chosen index in `[0, i]`.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}
