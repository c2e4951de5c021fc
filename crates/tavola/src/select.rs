//! Bounded top-k selection by distance.
//!
//! The engine only ever needs the few closest restaurants, so candidates are
//! streamed through a max-heap of at most `k` entries whose root is the worst
//! one kept. Each candidate costs `O(log k)` and nothing beyond `k` is stored.

use std::{cmp::Ordering, collections::BinaryHeap};

/// A candidate paired with its distance from the query position.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<T> {
    pub distance: f64,
    pub item: T,
}

impl<T> ScoredCandidate<T> {
    pub const fn new(distance: f64, item: T) -> Self {
        Self { distance, item }
    }
}

/// Heap entry ordered by distance, then by arrival so that among equal
/// distances the latest arrival is the "worst" and gets evicted first.
#[derive(Debug)]
struct Ranked<T> {
    distance: f64,
    seq: usize,
    item: T,
}

impl<T> Ranked<T> {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.seq.cmp(&other.seq))
    }
}

impl<T> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_key(other) == Ordering::Equal
    }
}

impl<T> Eq for Ranked<T> {}

impl<T> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_key(other)
    }
}

/// Keeps the `k` closest candidates pushed into it.
///
/// Ties on distance keep whichever candidate arrived first, so the output is
/// deterministic for a given input order.
#[derive(Debug)]
pub struct NearestK<T> {
    k: usize,
    seen: usize,
    heap: BinaryHeap<Ranked<T>>,
}

impl<T> NearestK<T> {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            seen: 0,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of candidates pushed so far, kept or not.
    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Distance of the worst candidate currently kept.
    pub fn worst_distance(&self) -> Option<f64> {
        self.heap.peek().map(|worst| worst.distance)
    }

    pub fn push(&mut self, candidate: ScoredCandidate<T>) {
        let entry = Ranked {
            distance: candidate.distance,
            seq: self.seen,
            item: candidate.item,
        };
        self.seen += 1;

        if self.heap.len() < self.k {
            self.heap.push(entry);
            return;
        }
        if let Some(mut worst) = self.heap.peek_mut() {
            // Strictly closer only: an equal distance never displaces an
            // earlier candidate.
            if entry.distance.total_cmp(&worst.distance) == Ordering::Less {
                *worst = entry;
            }
        }
    }

    /// The kept candidates, closest first.
    pub fn into_sorted_vec(self) -> Vec<ScoredCandidate<T>> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|ranked| ScoredCandidate::new(ranked.distance, ranked.item))
            .collect()
    }
}

impl<T> Extend<ScoredCandidate<T>> for NearestK<T> {
    fn extend<I: IntoIterator<Item = ScoredCandidate<T>>>(&mut self, iter: I) {
        for candidate in iter {
            self.push(candidate);
        }
    }
}

/// Select the `k` closest candidates from a single pass over `candidates`.
///
/// Returns `min(k, n)` candidates sorted by ascending distance. An empty input
/// gives an empty output.
pub fn select_top_k<T, I>(candidates: I, k: usize) -> Vec<ScoredCandidate<T>>
where
    I: IntoIterator<Item = ScoredCandidate<T>>,
{
    let mut nearest = NearestK::new(k);
    nearest.extend(candidates);
    nearest.into_sorted_vec()
}
