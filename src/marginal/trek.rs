//! Priority-queue-driven streaming enumeration of one element's configurations.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use tracing::trace;

use super::Marginal;

/// Heap entry: a configuration keyed by its log-probability.
#[derive(Clone, Debug)]
struct TrekEntry {
    lprob: f64,
    conf: Vec<i32>,
}

impl PartialEq for TrekEntry {
    fn eq(&self, other: &Self) -> bool {
        self.lprob.total_cmp(&other.lprob) == Ordering::Equal
    }
}

impl Eq for TrekEntry {}

impl PartialOrd for TrekEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TrekEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lprob.total_cmp(&other.lprob)
    }
}

/// On-demand enumeration of one element's configurations in decreasing
/// log-probability.
///
/// A max-heap is seeded with the mode; each emission pops the best unseen
/// configuration, records it in growable parallel tables and pushes its
/// unseen neighbors. Emitted configurations stay addressable by their
/// emission index, which is what the ordered joint generator builds on.
#[derive(Debug)]
pub struct MarginalTrek {
    marginal: Marginal,
    heap: BinaryHeap<TrekEntry>,
    visited: HashSet<Vec<i32>>,
    conf_lprobs: Vec<f64>,
    conf_masses: Vec<f64>,
    confs: Vec<Vec<i32>>,
}

impl MarginalTrek {
    /// Start a trek at the marginal's mode.
    ///
    /// # Arguments
    /// * `tab_size` - Initial capacity of the emission tables
    /// * `hash_size` - Initial capacity of the deduplication set
    pub fn new(marginal: Marginal, tab_size: usize, hash_size: usize) -> Self {
        let mut heap = BinaryHeap::new();
        let mut visited = HashSet::with_capacity(hash_size);
        let mode = marginal.mode_conf().to_vec();
        visited.insert(mode.clone());
        heap.push(TrekEntry {
            lprob: marginal.mode_lprob(),
            conf: mode,
        });
        Self {
            marginal,
            heap,
            visited,
            conf_lprobs: Vec::with_capacity(tab_size),
            conf_masses: Vec::with_capacity(tab_size),
            confs: Vec::with_capacity(tab_size),
        }
    }

    /// Number of isotopes of the underlying element.
    #[inline]
    pub fn isotope_count(&self) -> usize {
        self.marginal.isotope_count()
    }

    /// Log-probability of the element's mode configuration.
    #[inline]
    pub fn mode_lprob(&self) -> f64 {
        self.marginal.mode_lprob()
    }

    /// Number of configurations emitted so far.
    #[inline]
    pub fn conf_count(&self) -> usize {
        self.confs.len()
    }

    /// Log-probability of the `idx`-th emitted configuration.
    #[inline]
    pub fn lprob(&self, idx: usize) -> f64 {
        self.conf_lprobs[idx]
    }

    /// Mass of the `idx`-th emitted configuration.
    #[inline]
    pub fn mass(&self, idx: usize) -> f64 {
        self.conf_masses[idx]
    }

    /// Isotope counts of the `idx`-th emitted configuration.
    #[inline]
    pub fn conf(&self, idx: usize) -> &[i32] {
        &self.confs[idx]
    }

    /// Make sure position `idx` exists, growing the trek as needed.
    ///
    /// Returns false when the element has fewer configurations than `idx + 1`.
    pub fn probe(&mut self, idx: usize) -> bool {
        while self.confs.len() <= idx {
            if !self.advance() {
                return false;
            }
        }
        true
    }

    /// Emit the next configuration in decreasing log-probability order.
    fn advance(&mut self) -> bool {
        let Some(entry) = self.heap.pop() else {
            return false;
        };

        self.marginal.for_each_neighbor(&entry.conf, |neighbor| {
            if self.visited.insert(neighbor.clone()) {
                self.heap.push(TrekEntry {
                    lprob: self.marginal.conf_lprob(&neighbor),
                    conf: neighbor,
                });
            }
        });

        self.conf_lprobs.push(entry.lprob);
        self.conf_masses.push(self.marginal.conf_mass(&entry.conf));
        self.confs.push(entry.conf);

        if self.confs.len() == self.confs.capacity() {
            trace!(
                confs = self.confs.len(),
                frontier = self.heap.len(),
                "marginal trek tables at capacity, next emission reallocates"
            );
        }
        true
    }
}
