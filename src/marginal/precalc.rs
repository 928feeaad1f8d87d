//! One-shot, contiguous, probability-sorted marginal down to a fixed cutoff.

use std::collections::HashSet;

use tracing::trace;

use super::Marginal;

/// Every configuration of one element with log-probability ≥ a cutoff,
/// sorted by decreasing log-probability, in cache-friendly parallel arrays.
///
/// `lprobs` carries one extra trailing `-∞` guard entry: the threshold
/// odometer reads one position past the last real configuration and the guard
/// fails its cutoff test, so the hot loop needs no explicit length check.
/// The mode is always stored, even when it falls below the cutoff, so a
/// joint generator can rely on `conf_count() ≥ 1`.
#[derive(Clone, Debug)]
pub struct PrecalculatedMarginal {
    isotope_no: usize,
    /// `conf_count() + 1` entries; the last is the `-∞` guard.
    lprobs: Vec<f64>,
    masses: Vec<f64>,
    eprobs: Vec<f64>,
    /// Flattened signatures, stride `isotope_no`.
    confs: Vec<i32>,
    mode_lprob: f64,
}

impl PrecalculatedMarginal {
    /// Precalculate every configuration with log-probability ≥ `lcutoff`.
    ///
    /// Walks the neighbor graph outward from the mode; the above-cutoff
    /// region is connected, so the walk only ever expands configurations that
    /// themselves clear the cutoff.
    pub fn new(marginal: Marginal, lcutoff: f64, tab_size: usize, hash_size: usize) -> Self {
        let isotope_no = marginal.isotope_count();
        let mode_lprob = marginal.mode_lprob();

        let mut accepted: Vec<(f64, Vec<i32>)> = Vec::with_capacity(tab_size);
        let mode = marginal.mode_conf().to_vec();

        if mode_lprob < lcutoff {
            accepted.push((mode_lprob, mode));
        } else {
            let mut visited: HashSet<Vec<i32>> = HashSet::with_capacity(hash_size);
            let mut stack = vec![(mode_lprob, mode.clone())];
            visited.insert(mode);
            while let Some((lprob, conf)) = stack.pop() {
                if lprob >= lcutoff {
                    marginal.for_each_neighbor(&conf, |neighbor| {
                        if !visited.contains(&neighbor) {
                            let nlprob = marginal.conf_lprob(&neighbor);
                            visited.insert(neighbor.clone());
                            stack.push((nlprob, neighbor));
                        }
                    });
                    accepted.push((lprob, conf));
                }
            }
            accepted.sort_by(|a, b| b.0.total_cmp(&a.0));
        }

        trace!(
            confs = accepted.len(),
            lcutoff,
            "precalculated marginal built"
        );

        let mut lprobs = Vec::with_capacity(accepted.len() + 1);
        let mut masses = Vec::with_capacity(accepted.len());
        let mut eprobs = Vec::with_capacity(accepted.len());
        let mut confs = Vec::with_capacity(accepted.len() * isotope_no);
        for (lprob, conf) in accepted {
            lprobs.push(lprob);
            masses.push(marginal.conf_mass(&conf));
            eprobs.push(lprob.exp());
            confs.extend_from_slice(&conf);
        }
        lprobs.push(f64::NEG_INFINITY);

        Self {
            isotope_no,
            lprobs,
            masses,
            eprobs,
            confs,
            mode_lprob,
        }
    }

    /// Number of stored configurations.
    #[inline]
    pub fn conf_count(&self) -> usize {
        self.masses.len()
    }

    /// Number of isotopes.
    #[inline]
    pub fn isotope_count(&self) -> usize {
        self.isotope_no
    }

    /// Log-probability of the mode configuration.
    #[inline]
    pub fn mode_lprob(&self) -> f64 {
        self.mode_lprob
    }

    /// Log-probability at position `idx`; `idx == conf_count()` reads the
    /// `-∞` guard.
    #[inline]
    pub fn lprob(&self, idx: usize) -> f64 {
        self.lprobs[idx]
    }

    /// Mass at position `idx`.
    #[inline]
    pub fn mass(&self, idx: usize) -> f64 {
        self.masses[idx]
    }

    /// Linear probability at position `idx`; may underflow to 0 in tails.
    #[inline]
    pub fn eprob(&self, idx: usize) -> f64 {
        self.eprobs[idx]
    }

    /// Isotope counts at position `idx`.
    #[inline]
    pub fn conf(&self, idx: usize) -> &[i32] {
        &self.confs[idx * self.isotope_no..(idx + 1) * self.isotope_no]
    }

    /// The whole log-probability column, guard included.
    #[inline]
    pub fn lprobs(&self) -> &[f64] {
        &self.lprobs
    }

    /// The whole mass column.
    #[inline]
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// The whole linear-probability column.
    #[inline]
    pub fn eprobs(&self) -> &[f64] {
        &self.eprobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oxygen(n: u32) -> Marginal {
        Marginal::new(
            vec![15.99491461956, 16.99913170, 17.9991610],
            vec![0.99757, 0.00038, 0.00205],
            n,
        )
    }

    #[test]
    fn test_sorted_descending_with_guard() {
        let m = PrecalculatedMarginal::new(oxygen(10), oxygen(10).mode_lprob() - 15.0, 16, 16);
        assert!(m.conf_count() > 1);
        for i in 1..m.conf_count() {
            assert!(m.lprob(i) <= m.lprob(i - 1));
        }
        assert_eq!(m.lprob(m.conf_count()), f64::NEG_INFINITY);
    }

    #[test]
    fn test_cutoff_respected() {
        let base = oxygen(10);
        let cutoff = base.mode_lprob() - 8.0;
        let m = PrecalculatedMarginal::new(base, cutoff, 16, 16);
        for i in 0..m.conf_count() {
            assert!(m.lprob(i) >= cutoff);
        }
    }

    #[test]
    fn test_full_enumeration_sums_to_one() {
        // Cutoff below everything: the whole space, Σ eprob = 1.
        let m = PrecalculatedMarginal::new(oxygen(6), -f64::MAX, 16, 16);
        // Stars and bars: C(6+2, 2) = 28 configurations.
        assert_eq!(m.conf_count(), 28);
        let total: f64 = (0..m.conf_count()).map(|i| m.eprob(i)).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mode_kept_below_cutoff() {
        let base = oxygen(4);
        let m = PrecalculatedMarginal::new(base, 10.0, 4, 4);
        assert_eq!(m.conf_count(), 1);
        assert_eq!(m.conf(0).iter().sum::<i32>(), 4);
    }

    #[test]
    fn test_parallel_columns_consistent() {
        let m = PrecalculatedMarginal::new(oxygen(5), -f64::MAX, 16, 16);
        for i in 0..m.conf_count() {
            assert!((m.eprob(i) - m.lprob(i).exp()).abs() < 1e-15);
            assert_eq!(m.conf(i).iter().sum::<i32>(), 5);
        }
    }
}
