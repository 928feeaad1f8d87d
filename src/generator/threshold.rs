//! Threshold generator: every isotopologue above a probability cutoff, in
//! unspecified order, in O(N).

use std::sync::Arc;

use crate::marginal::PrecalculatedMarginal;
use crate::molecule::Molecule;

use super::Generator;

/// Tuning knobs for the threshold sweep.
#[derive(Clone, Copy, Debug)]
pub struct ThresholdParams {
    /// If true, the threshold is an absolute peak probability; otherwise it
    /// is a fraction of the mode's probability.
    pub absolute: bool,
    /// Initial capacity of the per-element configuration tables.
    pub tab_size: usize,
    /// Initial capacity of the per-element deduplication sets.
    pub hash_size: usize,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            absolute: true,
            tab_size: 1000,
            hash_size: 1000,
        }
    }
}

/// The per-element tables a threshold sweep runs against, shareable across
/// worker threads (read-only once built).
pub(crate) struct PromotedSet {
    pub marginals: Arc<[PrecalculatedMarginal]>,
    pub isotope_numbers: Vec<usize>,
    pub lcutoff: f64,
}

/// Promote a molecule's marginals for a threshold sweep.
///
/// Each element is precalculated down to `L − (mode_lprob − element_mode)`,
/// the loosest per-element bound under which every joint configuration
/// reaching `L` still has all of its components available.
pub(crate) fn promote(
    mol: Molecule,
    threshold: f64,
    absolute: bool,
    tab_size: usize,
    hash_size: usize,
) -> PromotedSet {
    let parts = mol.into_parts();
    // threshold == 0 means "everything": -MAX rather than -∞ keeps the
    // array guards failing the cutoff test.
    let lcutoff = if threshold > 0.0 {
        threshold.ln() + if absolute { 0.0 } else { parts.mode_lprob }
    } else {
        -f64::MAX
    };
    let mode_lprob = parts.mode_lprob;
    let marginals: Vec<PrecalculatedMarginal> = parts
        .marginals
        .into_iter()
        .map(|m| {
            let bound = lcutoff - (mode_lprob - m.mode_lprob());
            PrecalculatedMarginal::new(m, bound, tab_size, hash_size)
        })
        .collect();
    PromotedSet {
        marginals: marginals.into(),
        isotope_numbers: parts.isotope_numbers,
        lcutoff,
    }
}

/// Streams every joint configuration with log-probability ≥ the cutoff.
///
/// The per-element counters form a mixed-radix odometer, digit 0 innermost,
/// each digit running over that element's probability-sorted table. Because
/// the tables are sorted, a digit whose partial log-probability plus the best
/// the remaining digits can contribute (`max_prefix_lp`) falls below the
/// cutoff can be carried immediately; the pruning is exact, so the sweep is
/// O(N) in the number of emissions.
pub struct ThresholdGenerator {
    marginals: Arc<[PrecalculatedMarginal]>,
    isotope_numbers: Vec<usize>,
    counter: Vec<usize>,
    /// Prefix sums over dimensions `i..dim`; index `dim` is the identity.
    partial_lprobs: Vec<f64>,
    partial_masses: Vec<f64>,
    partial_eprobs: Vec<f64>,
    /// `max_prefix_lp[i]` = Σ mode log-probs of dimensions `0..=i`.
    max_prefix_lp: Vec<f64>,
    lcutoff: f64,
    /// One-past-the-last admissible index of the outermost digit; partitions
    /// the sweep for the parallel variant.
    outer_end: usize,
    fresh: bool,
    terminated: bool,
}

impl ThresholdGenerator {
    /// Consume a molecule and stream everything with probability ≥
    /// `threshold` (absolute, or relative to the mode's probability).
    pub fn new(mol: Molecule, threshold: f64, absolute: bool) -> Self {
        Self::with_params(
            mol,
            threshold,
            ThresholdParams {
                absolute,
                ..ThresholdParams::default()
            },
        )
    }

    /// As [`new`](Self::new), with explicit table capacities.
    pub fn with_params(mol: Molecule, threshold: f64, params: ThresholdParams) -> Self {
        let set = promote(
            mol,
            threshold,
            params.absolute,
            params.tab_size,
            params.hash_size,
        );
        Self::from_shared(set, 0, usize::MAX)
    }

    /// Build a sweep over `outer_start..outer_end` of the outermost digit,
    /// against an already-promoted (possibly shared) marginal set.
    pub(crate) fn from_shared(set: PromotedSet, outer_start: usize, outer_end: usize) -> Self {
        let dim = set.marginals.len();
        let mut counter = vec![0usize; dim];
        counter[dim - 1] = outer_start;

        let mut max_prefix_lp = Vec::with_capacity(dim.saturating_sub(1));
        let mut acc = 0.0;
        for m in set.marginals.iter().take(dim - 1) {
            acc += m.mode_lprob();
            max_prefix_lp.push(acc);
        }

        let mut partial_eprobs = vec![0.0; dim + 1];
        partial_eprobs[dim] = 1.0;

        let mut gen = Self {
            marginals: set.marginals,
            isotope_numbers: set.isotope_numbers,
            counter,
            partial_lprobs: vec![0.0; dim + 1],
            partial_masses: vec![0.0; dim + 1],
            partial_eprobs,
            max_prefix_lp,
            lcutoff: set.lcutoff,
            outer_end,
            fresh: true,
            terminated: false,
        };
        gen.recalc(dim - 1, true);
        gen
    }

    /// Recompute the prefix arrays for dimensions `from..=0`.
    fn recalc(&mut self, from: usize, with_mass: bool) {
        for i in (0..=from).rev() {
            let c = self.counter[i];
            self.partial_lprobs[i] = self.partial_lprobs[i + 1] + self.marginals[i].lprob(c);
            if with_mass {
                self.partial_masses[i] = self.partial_masses[i + 1] + self.marginals[i].mass(c);
                self.partial_eprobs[i] = self.partial_eprobs[i + 1] * self.marginals[i].eprob(c);
            }
        }
    }

    /// One odometer step; `with_mass` elides mass/probability updates for the
    /// counting variant.
    #[inline]
    fn step(&mut self, with_mass: bool) -> bool {
        if self.terminated {
            return false;
        }
        let dim = self.marginals.len();

        if self.fresh {
            self.fresh = false;
        } else {
            self.counter[0] += 1;
        }

        // No-carry path: reading one past the table end hits the -∞ guard
        // and falls through to the carry.
        let lp = self.partial_lprobs[1] + self.marginals[0].lprob(self.counter[0]);
        if lp >= self.lcutoff {
            self.partial_lprobs[0] = lp;
            if with_mass {
                self.partial_masses[0] =
                    self.partial_masses[1] + self.marginals[0].mass(self.counter[0]);
                self.partial_eprobs[0] =
                    self.partial_eprobs[1] * self.marginals[0].eprob(self.counter[0]);
            }
            return true;
        }

        let mut idx = 0;
        while idx + 1 < dim {
            self.counter[idx] = 0;
            idx += 1;
            self.counter[idx] += 1;
            if idx + 1 == dim && self.counter[idx] >= self.outer_end {
                break;
            }
            self.partial_lprobs[idx] =
                self.partial_lprobs[idx + 1] + self.marginals[idx].lprob(self.counter[idx]);
            // Sorted tables make this exact: once even the mode prefix cannot
            // reach the cutoff, no lower digit can either.
            if self.partial_lprobs[idx] + self.max_prefix_lp[idx - 1] >= self.lcutoff {
                self.recalc(idx - 1, with_mass);
                return true;
            }
        }

        self.terminate();
        false
    }

    /// Count the configurations left in the stream without computing masses
    /// or probabilities. Consumes the stream.
    pub fn count_remaining(&mut self) -> u64 {
        let mut n = 0;
        while self.step(false) {
            n += 1;
        }
        n
    }

    /// The cutoff in log-probability terms.
    #[inline]
    pub fn lcutoff(&self) -> f64 {
        self.lcutoff
    }
}

impl Generator for ThresholdGenerator {
    fn advance(&mut self) -> bool {
        self.step(true)
    }

    #[inline]
    fn lprob(&self) -> f64 {
        self.partial_lprobs[0]
    }

    #[inline]
    fn mass(&self) -> f64 {
        self.partial_masses[0]
    }

    #[inline]
    fn eprob(&self) -> f64 {
        self.partial_eprobs[0]
    }

    fn conf_signature_len(&self) -> usize {
        self.isotope_numbers.iter().sum()
    }

    fn write_conf_signature(&self, space: &mut [i32]) {
        let mut offset = 0;
        for (k, m) in self.marginals.iter().enumerate() {
            let conf = m.conf(self.counter[k]);
            space[offset..offset + conf.len()].copy_from_slice(conf);
            offset += conf.len();
        }
    }

    fn terminate(&mut self) {
        self.terminated = true;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::generator::test_support::brute_force;

    fn drain(mut gen: ThresholdGenerator) -> Vec<(Vec<i32>, f64, f64)> {
        let mut out = Vec::new();
        let mut sig = vec![0i32; gen.conf_signature_len()];
        while gen.advance() {
            gen.write_conf_signature(&mut sig);
            out.push((sig.clone(), gen.lprob(), gen.eprob()));
        }
        out
    }

    #[test]
    fn test_water_absolute_threshold() {
        let mol = Molecule::from_formula("H2O").unwrap();
        let emitted = drain(ThresholdGenerator::new(mol, 0.001, true));

        // Only the two ¹H₂ configurations with ¹⁶O and ¹⁸O clear 0.001.
        assert_eq!(emitted.len(), 2);
        let light = emitted
            .iter()
            .find(|(sig, _, _)| sig == &[2, 0, 1, 0, 0])
            .expect("¹H₂¹⁶O missing");
        assert!((light.2 - 0.9973).abs() < 1e-3);
        assert!(!emitted.iter().any(|(sig, _, _)| sig == &[0, 2, 1, 0, 0]));
    }

    #[test]
    fn test_soundness_and_completeness() {
        let mol = Molecule::from_formula("C10O2").unwrap();
        let reference = brute_force(&mol);
        let gen = ThresholdGenerator::new(mol, 0.001, false);
        let lcutoff = gen.lcutoff();
        let emitted = drain(gen);

        // Everything emitted clears the cutoff.
        assert!(!emitted.is_empty());
        for (_, lprob, _) in &emitted {
            assert!(*lprob >= lcutoff);
        }

        // Nothing above the cutoff is missing.
        let expected = reference
            .iter()
            .filter(|(_, lp, _)| *lp >= lcutoff)
            .count();
        assert_eq!(emitted.len(), expected);
    }

    #[test]
    fn test_exhaustive_sweep_sums_to_one() {
        let mol = Molecule::from_formula("C5H2").unwrap();
        let expected = brute_force(&mol).len();
        let emitted = drain(ThresholdGenerator::new(mol, 0.0, true));
        assert_eq!(emitted.len(), expected);

        let total: f64 = emitted.iter().map(|(_, _, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_relative_threshold_on_c100() {
        let mol = Molecule::from_formula("C100").unwrap();
        let mode_lprob = mol.mode_lprob();
        let emitted = drain(ThresholdGenerator::new(mol, 0.01, false));
        assert!(!emitted.is_empty());
        for (_, lprob, _) in &emitted {
            assert!(*lprob >= mode_lprob + 0.01_f64.ln());
        }
    }

    #[test]
    fn test_tiny_relative_threshold_is_exhaustive() {
        let mol = Molecule::from_formula("C100").unwrap();
        let emitted = drain(ThresholdGenerator::new(mol, 1e-200, false));
        // Two isotopes, 100 atoms: 101 configurations in the whole space.
        assert_eq!(emitted.len(), 101);
        let total: f64 = emitted.iter().map(|(_, _, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_signatures_unique_and_conserving() {
        let mol = Molecule::from_formula("H2O").unwrap();
        let emitted = drain(ThresholdGenerator::new(mol, 0.0, true));
        assert_eq!(emitted.len(), 9);

        let mut seen = HashSet::new();
        for (sig, _, _) in &emitted {
            assert!(seen.insert(sig.clone()));
            assert_eq!(sig[0] + sig[1], 2, "hydrogen atoms");
            assert_eq!(sig[2] + sig[3] + sig[4], 1, "oxygen atoms");
        }
    }

    #[test]
    fn test_first_emission_is_the_mode() {
        let mol = Molecule::from_formula("C100H202").unwrap();
        let mode_lprob = mol.mode_lprob();
        let mut gen = ThresholdGenerator::new(mol, 0.5, false);
        assert!(gen.advance());
        assert!((gen.lprob() - mode_lprob).abs() < 1e-9);
    }

    #[test]
    fn test_count_remaining_matches_enumeration() {
        let mol = Molecule::from_formula("C20H30N4O6").unwrap();
        let n = drain(ThresholdGenerator::new(mol.clone(), 0.001, false)).len();
        let mut counting = ThresholdGenerator::new(mol, 0.001, false);
        assert_eq!(counting.count_remaining(), n as u64);
    }

    #[test]
    fn test_terminate_is_final() {
        let mol = Molecule::from_formula("C10").unwrap();
        let mut gen = ThresholdGenerator::new(mol, 0.0, true);
        assert!(gen.advance());
        gen.terminate();
        assert!(!gen.advance());
        assert!(!gen.advance());
    }

    #[test]
    fn test_threshold_above_mode_emits_nothing() {
        let mol = Molecule::from_formula("C100").unwrap();
        // The mode's probability is ~0.37; 0.9 absolute excludes everything.
        let emitted = drain(ThresholdGenerator::new(mol, 0.9, true));
        assert!(emitted.is_empty());
    }

    #[test]
    fn test_monoisotopic_element() {
        let mol = Molecule::from_formula("P7").unwrap();
        let emitted = drain(ThresholdGenerator::new(mol, 0.5, true));
        assert_eq!(emitted.len(), 1);
        assert!((emitted[0].2 - 1.0).abs() < 1e-9);
        assert_eq!(emitted[0].0, vec![7]);
    }

    #[test]
    fn test_zero_atom_element() {
        let mol = Molecule::from_tables(
            &[0, 1],
            &[vec![12.0, 13.0033548378], vec![1.00782503207, 2.0141017778]],
            &[vec![0.989212, 0.010788], vec![0.999885, 0.000115]],
        )
        .unwrap();
        let emitted = drain(ThresholdGenerator::new(mol, 0.5, true));
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].0, vec![0, 0, 1, 0]);
    }

    #[test]
    fn test_randomized_against_brute_force() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let dim = rng.gen_range(1..=3);
            let mut atom_counts = Vec::new();
            let mut masses = Vec::new();
            let mut probs = Vec::new();
            for _ in 0..dim {
                let k = rng.gen_range(1..=3);
                atom_counts.push(rng.gen_range(0..=6));
                masses.push((0..k).map(|i| 10.0 + i as f64).collect());
                let raw: Vec<f64> = (0..k).map(|_| rng.gen::<f64>() + 0.05).collect();
                let sum: f64 = raw.iter().sum();
                probs.push(raw.into_iter().map(|p| p / sum).collect());
            }
            let mol = Molecule::from_tables(&atom_counts, &masses, &probs).unwrap();
            let threshold = rng.gen_range(-8.0..-0.5_f64).exp();
            let reference = brute_force(&mol);

            let gen = ThresholdGenerator::new(mol, threshold, false);
            let lcutoff = gen.lcutoff();
            let expected = reference.iter().filter(|(_, lp, _)| *lp >= lcutoff).count();
            let emitted = drain(gen);
            assert_eq!(emitted.len(), expected);
        }
    }
}
