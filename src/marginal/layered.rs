//! A precalculated marginal that grows band by band.

use std::collections::HashSet;

use tracing::debug;

use super::Marginal;

/// A marginal extensible towards lower probabilities.
///
/// Stores configurations in appended bands: each [`extend`](Self::extend)
/// admits the band between the new, lower cutoff and the previous one, sorted
/// by decreasing log-probability inside the band (not globally). A *fringe*
/// of configurations that were reached but fell below the cutoff is kept
/// between extensions, so each extension resumes exactly where the previous
/// one stopped instead of re-walking the admitted region.
#[derive(Debug)]
pub struct LayeredMarginal {
    marginal: Marginal,
    /// Admitted log-probabilities plus the trailing `-∞` guard.
    lprobs: Vec<f64>,
    masses: Vec<f64>,
    eprobs: Vec<f64>,
    confs: Vec<i32>,
    visited: HashSet<Vec<i32>>,
    /// Reached but not yet admitted: everything below `current_cutoff`.
    fringe: Vec<(f64, Vec<i32>)>,
    current_cutoff: f64,
    smallest_lprob: f64,
}

impl LayeredMarginal {
    /// Create an empty layered marginal; nothing is admitted until the first
    /// [`extend`](Self::extend).
    pub fn new(marginal: Marginal, tab_size: usize, hash_size: usize) -> Self {
        let mode = marginal.mode_conf().to_vec();
        let mode_lprob = marginal.mode_lprob();
        let mut visited = HashSet::with_capacity(hash_size);
        visited.insert(mode.clone());
        let mut lprobs = Vec::with_capacity(tab_size + 1);
        lprobs.push(f64::NEG_INFINITY);
        Self {
            marginal,
            lprobs,
            masses: Vec::with_capacity(tab_size),
            eprobs: Vec::with_capacity(tab_size),
            confs: Vec::new(),
            visited,
            fringe: vec![(mode_lprob, mode)],
            current_cutoff: f64::INFINITY,
            smallest_lprob: f64::INFINITY,
        }
    }

    /// Admit the band `[new_cutoff, current_cutoff)`.
    ///
    /// Returns true if any configuration was added. Configurations with
    /// log-probability `-∞` (zero-probability isotopes) are dropped outright:
    /// they carry no mass and would keep the fringe alive forever.
    pub fn extend(&mut self, new_cutoff: f64) -> bool {
        if new_cutoff >= self.current_cutoff {
            return false;
        }

        let mut band: Vec<(f64, Vec<i32>)> = Vec::new();
        let mut stack = std::mem::take(&mut self.fringe);
        let mut fringe = Vec::new();

        while let Some((lprob, conf)) = stack.pop() {
            if lprob >= new_cutoff {
                // Admitted; its neighbors become reachable.
                let marginal = &self.marginal;
                let visited = &mut self.visited;
                marginal.for_each_neighbor(&conf, |neighbor| {
                    if !visited.contains(&neighbor) {
                        let nlprob = marginal.conf_lprob(&neighbor);
                        visited.insert(neighbor.clone());
                        if nlprob > f64::NEG_INFINITY {
                            stack.push((nlprob, neighbor));
                        }
                    }
                });
                band.push((lprob, conf));
            } else {
                fringe.push((lprob, conf));
            }
        }
        self.fringe = fringe;

        band.sort_by(|a, b| b.0.total_cmp(&a.0));

        debug!(
            added = band.len(),
            cutoff = new_cutoff,
            fringe = self.fringe.len(),
            "extended layered marginal"
        );

        let added = !band.is_empty();
        self.lprobs.pop();
        for (lprob, conf) in band {
            self.lprobs.push(lprob);
            self.masses.push(self.marginal.conf_mass(&conf));
            self.eprobs.push(lprob.exp());
            self.confs.extend_from_slice(&conf);
            self.smallest_lprob = self.smallest_lprob.min(lprob);
        }
        self.lprobs.push(f64::NEG_INFINITY);
        self.current_cutoff = new_cutoff;
        added
    }

    /// True once the whole configuration space has been admitted.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.fringe.is_empty()
    }

    /// Smallest admitted log-probability (`+∞` while empty).
    #[inline]
    pub fn smallest_lprob(&self) -> f64 {
        self.smallest_lprob
    }

    /// Log-probability of the mode configuration.
    #[inline]
    pub fn mode_lprob(&self) -> f64 {
        self.marginal.mode_lprob()
    }

    /// Number of isotopes.
    #[inline]
    pub fn isotope_count(&self) -> usize {
        self.marginal.isotope_count()
    }

    /// Number of admitted configurations.
    #[inline]
    pub fn conf_count(&self) -> usize {
        self.masses.len()
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

    /// Linear probability at position `idx`.
    #[inline]
    pub fn eprob(&self, idx: usize) -> f64 {
        self.eprobs[idx]
    }

    /// Isotope counts at position `idx`.
    #[inline]
    pub fn conf(&self, idx: usize) -> &[i32] {
        let k = self.marginal.isotope_count();
        &self.confs[idx * k..(idx + 1) * k]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sulfur(n: u32) -> Marginal {
        Marginal::new(
            vec![31.97207100, 32.97145876, 33.96786690, 35.96708076],
            vec![0.9499, 0.0075, 0.0425, 0.0001],
            n,
        )
    }

    #[test]
    fn test_first_band_contains_mode() {
        let base = sulfur(10);
        let mode_lprob = base.mode_lprob();
        let mut m = LayeredMarginal::new(base, 16, 16);
        assert_eq!(m.conf_count(), 0);
        assert!(m.extend(mode_lprob - 3.0));
        assert!(m.conf_count() >= 1);
        assert!((m.lprob(0) - mode_lprob).abs() < 1e-12);
    }

    #[test]
    fn test_bands_are_disjoint_and_internally_sorted() {
        let base = sulfur(8);
        let c1 = base.mode_lprob() - 3.0;
        let c2 = base.mode_lprob() - 9.0;
        let mut m = LayeredMarginal::new(base, 16, 16);
        m.extend(c1);
        let first_band = m.conf_count();
        m.extend(c2);

        for i in 0..m.conf_count() {
            let lp = m.lprob(i);
            if i < first_band {
                assert!(lp >= c1);
            } else {
                assert!(lp >= c2 && lp < c1);
            }
            if i > 0 && i != first_band {
                assert!(lp <= m.lprob(i - 1));
            }
        }
    }

    #[test]
    fn test_extension_reaches_completeness() {
        let base = sulfur(3);
        let mode_lprob = base.mode_lprob();
        let mut m = LayeredMarginal::new(base, 16, 16);
        let mut cutoff = mode_lprob;
        while !m.is_complete() {
            cutoff -= 10.0;
            m.extend(cutoff);
        }
        // Stars and bars: C(3+3, 3) = 20 configurations.
        assert_eq!(m.conf_count(), 20);
        let total: f64 = (0..m.conf_count()).map(|i| m.eprob(i)).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_upward_extension_is_a_noop() {
        let base = sulfur(5);
        let c = base.mode_lprob() - 5.0;
        let mut m = LayeredMarginal::new(base, 16, 16);
        m.extend(c);
        let n = m.conf_count();
        assert!(!m.extend(c + 1.0));
        assert_eq!(m.conf_count(), n);
    }

    #[test]
    fn test_no_duplicates_across_bands() {
        let base = sulfur(6);
        let mode_lprob = base.mode_lprob();
        let mut m = LayeredMarginal::new(base, 16, 16);
        for step in 1..=6 {
            m.extend(mode_lprob - 6.0 * step as f64);
        }
        let mut seen = HashSet::new();
        for i in 0..m.conf_count() {
            assert!(seen.insert(m.conf(i).to_vec()));
        }
    }
}
