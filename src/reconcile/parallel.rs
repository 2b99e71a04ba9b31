//! Rayon-based fan-out helpers.
use anyhow::Result;
use rayon::prelude::*;

/// Run `work` on every item and collect every outcome in input order.
///
/// With `parallel` set the items are processed concurrently on the Rayon
/// pool; otherwise one after another.  No outcome short-circuits its
/// siblings.
pub(super) fn map_all<T: Send, R: Send>(
    items: Vec<T>,
    parallel: bool,
    work: impl Fn(T) -> R + Sync + Send,
) -> Vec<R> {
    if parallel {
        items.into_par_iter().map(work).collect()
    } else {
        items.into_iter().map(work).collect()
    }
}

/// Sum the counts produced by `work` over every item.
///
/// Every item is processed even when a sibling fails; the first error in
/// input order is returned.
pub(super) fn sum_all<T: Send>(
    items: Vec<T>,
    parallel: bool,
    work: impl Fn(T) -> Result<usize> + Sync + Send,
) -> Result<usize> {
    map_all(items, parallel, work).into_iter().sum()
}

/// Run two closures, concurrently when `parallel` is set.
pub(super) fn join<A: Send, B: Send>(
    parallel: bool,
    a: impl FnOnce() -> A + Send,
    b: impl FnOnce() -> B + Send,
) -> (A, B) {
    if parallel {
        rayon::join(a, b)
    } else {
        (a(), b())
    }
}
