//! Parallel threshold enumeration.
//!
//! The outermost dimension's configuration range is split into disjoint
//! chunks; each worker runs the single-threaded odometer restricted to its
//! chunk against a shared, read-only precalculated-marginal set, and the
//! per-chunk results are concatenated. Every joint configuration has exactly
//! one outermost index, so the union over chunks is exactly the
//! single-threaded result, with no shared mutable state at all.

use rayon::prelude::*;
use tracing::debug;

use crate::molecule::Molecule;

use super::threshold::{promote, ThresholdGenerator, ThresholdParams};
use super::{Generator, Peak};

/// Enumerate every isotopologue with probability ≥ `threshold` across the
/// rayon thread pool.
///
/// Order within the result is unspecified, like the sequential threshold
/// generator's.
///
/// # Arguments
/// * `threshold` - Minimal peak probability
/// * `params` - Cutoff interpretation and table capacities
pub fn threshold_peaks_parallel(
    mol: Molecule,
    threshold: f64,
    params: ThresholdParams,
) -> Vec<Peak> {
    let set = promote(
        mol,
        threshold,
        params.absolute,
        params.tab_size,
        params.hash_size,
    );

    let dim = set.marginals.len();
    let outer = set.marginals[dim - 1].conf_count();
    if dim == 1 || outer <= 1 {
        // Nothing to partition.
        return drain_chunk(ThresholdGenerator::from_shared(set, 0, usize::MAX));
    }

    let workers = rayon::current_num_threads().max(1);
    let chunk = outer.div_ceil(workers);
    let ranges: Vec<(usize, usize)> = (0..outer)
        .step_by(chunk)
        .map(|start| (start, (start + chunk).min(outer)))
        .collect();

    debug!(
        outer,
        chunks = ranges.len(),
        "partitioned threshold sweep"
    );

    let chunks: Vec<Vec<Peak>> = ranges
        .into_par_iter()
        .map(|(start, end)| {
            let shard = super::threshold::PromotedSet {
                marginals: set.marginals.clone(),
                isotope_numbers: set.isotope_numbers.clone(),
                lcutoff: set.lcutoff,
            };
            drain_chunk(ThresholdGenerator::from_shared(shard, start, end))
        })
        .collect();

    chunks.into_iter().flatten().collect()
}

fn drain_chunk(mut gen: ThresholdGenerator) -> Vec<Peak> {
    let mut peaks = Vec::new();
    while gen.advance() {
        peaks.push(Peak {
            mass: gen.mass(),
            lprob: gen.lprob(),
            prob: gen.eprob(),
        });
    }
    peaks
}
