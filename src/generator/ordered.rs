//! Ordered generator: isotopologues in strictly non-increasing probability.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::marginal::MarginalTrek;
use crate::molecule::Molecule;

use super::Generator;

/// Tuning knobs for the ordered enumeration.
#[derive(Clone, Copy, Debug)]
pub struct OrderedParams {
    /// Initial capacity of the per-element trek tables.
    pub tab_size: usize,
    /// Initial capacity of the deduplication sets.
    pub hash_size: usize,
}

impl Default for OrderedParams {
    fn default() -> Self {
        Self {
            tab_size: 1000,
            hash_size: 1000,
        }
    }
}

/// Heap entry: per-element trek positions keyed by joint log-probability.
#[derive(Clone, Debug)]
struct JointEntry {
    lprob: f64,
    indices: Vec<usize>,
}

impl PartialEq for JointEntry {
    fn eq(&self, other: &Self) -> bool {
        self.lprob.total_cmp(&other.lprob) == Ordering::Equal
    }
}

impl Eq for JointEntry {}

impl PartialOrd for JointEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for JointEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lprob.total_cmp(&other.lprob)
    }
}

/// Streams joint configurations in non-increasing log-probability.
///
/// A max-heap holds the frontier, seeded with the joint mode. Popping the top
/// yields the next emission; its successors (one element's trek position
/// advanced by one) are pushed unless already enqueued. Element marginals are
/// treks and grow on demand as the frontier reaches past what they have
/// emitted so far. Configurations of equal probability come out in
/// unspecified relative order.
pub struct OrderedGenerator {
    treks: Vec<MarginalTrek>,
    isotope_numbers: Vec<usize>,
    heap: BinaryHeap<JointEntry>,
    enqueued: HashSet<Vec<usize>>,
    indices: Vec<usize>,
    current_lprob: f64,
    current_mass: f64,
    current_eprob: f64,
    terminated: bool,
}

impl OrderedGenerator {
    /// Consume a molecule and stream its isotopologues most-probable-first.
    pub fn new(mol: Molecule) -> Self {
        Self::with_params(mol, OrderedParams::default())
    }

    /// As [`new`](Self::new), with explicit table capacities.
    pub fn with_params(mol: Molecule, params: OrderedParams) -> Self {
        let parts = mol.into_parts();
        let mut treks: Vec<MarginalTrek> = parts
            .marginals
            .into_iter()
            .map(|m| MarginalTrek::new(m, params.tab_size, params.hash_size))
            .collect();

        // Materialize each element's mode so the joint mode can be seeded.
        let mut mode_lprob = 0.0;
        for trek in &mut treks {
            trek.probe(0);
            mode_lprob += trek.lprob(0);
        }

        let dim = treks.len();
        let mut heap = BinaryHeap::new();
        let mut enqueued = HashSet::with_capacity(params.hash_size);
        let mode = vec![0usize; dim];
        enqueued.insert(mode.clone());
        heap.push(JointEntry {
            lprob: mode_lprob,
            indices: mode,
        });

        Self {
            treks,
            isotope_numbers: parts.isotope_numbers,
            heap,
            enqueued,
            indices: vec![0; dim],
            current_lprob: f64::NAN,
            current_mass: f64::NAN,
            current_eprob: f64::NAN,
            terminated: false,
        }
    }
}

impl Generator for OrderedGenerator {
    fn advance(&mut self) -> bool {
        if self.terminated {
            return false;
        }
        let Some(entry) = self.heap.pop() else {
            self.terminate();
            return false;
        };

        // Push the successors before settling on the popped configuration.
        for k in 0..self.treks.len() {
            let next_pos = entry.indices[k] + 1;
            if !self.treks[k].probe(next_pos) {
                continue;
            }
            let mut candidate = entry.indices.clone();
            candidate[k] = next_pos;
            if self.enqueued.contains(&candidate) {
                continue;
            }
            let lprob =
                entry.lprob - self.treks[k].lprob(entry.indices[k]) + self.treks[k].lprob(next_pos);
            self.enqueued.insert(candidate.clone());
            self.heap.push(JointEntry {
                lprob,
                indices: candidate,
            });
        }

        self.current_lprob = entry.lprob;
        self.current_mass = self
            .treks
            .iter()
            .zip(&entry.indices)
            .map(|(t, &i)| t.mass(i))
            .sum();
        self.current_eprob = entry.lprob.exp();
        self.indices = entry.indices;
        true
    }

    #[inline]
    fn lprob(&self) -> f64 {
        self.current_lprob
    }

    #[inline]
    fn mass(&self) -> f64 {
        self.current_mass
    }

    #[inline]
    fn eprob(&self) -> f64 {
        self.current_eprob
    }

    fn conf_signature_len(&self) -> usize {
        self.isotope_numbers.iter().sum()
    }

    fn write_conf_signature(&self, space: &mut [i32]) {
        let mut offset = 0;
        for (trek, &idx) in self.treks.iter().zip(&self.indices) {
            let conf = trek.conf(idx);
            space[offset..offset + conf.len()].copy_from_slice(conf);
            offset += conf.len();
        }
    }

    fn terminate(&mut self) {
        self.terminated = true;
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::generator::test_support::brute_force;

    #[test]
    fn test_c2_first_three_peaks() {
        let mol = Molecule::from_formula("C2").unwrap();
        let mut gen = OrderedGenerator::new(mol);

        assert!(gen.advance());
        assert!((gen.eprob() - 0.9785).abs() < 1e-3);
        let mut sig = [0i32; 2];
        gen.write_conf_signature(&mut sig);
        assert_eq!(sig, [2, 0]);

        assert!(gen.advance());
        assert!((gen.eprob() - 0.0213).abs() < 1e-3);
        gen.write_conf_signature(&mut sig);
        assert_eq!(sig, [1, 1]);

        assert!(gen.advance());
        assert!((gen.eprob() - 1.16e-4).abs() < 1e-5);
        gen.write_conf_signature(&mut sig);
        assert_eq!(sig, [0, 2]);

        assert!(!gen.advance());
    }

    #[test]
    fn test_monotone_over_ten_thousand() {
        let mol = Molecule::from_formula("C100H202N10O20").unwrap();
        let mut gen = OrderedGenerator::new(mol);
        let mut previous = f64::INFINITY;
        for _ in 0..10_000 {
            assert!(gen.advance());
            assert!(gen.lprob() <= previous);
            previous = gen.lprob();
        }
    }

    #[test]
    fn test_first_emission_is_the_mode() {
        let mol = Molecule::from_formula("C100H202").unwrap();
        let mode_lprob = mol.mode_lprob();
        let mut gen = OrderedGenerator::new(mol);
        assert!(gen.advance());
        assert!((gen.lprob() - mode_lprob).abs() < 1e-9);
    }

    #[test]
    fn test_exhaustive_enumeration_matches_brute_force() {
        let mol = Molecule::from_formula("C4O2").unwrap();
        let expected = brute_force(&mol).len();

        let mut gen = OrderedGenerator::new(mol);
        let mut sig = vec![0i32; gen.conf_signature_len()];
        let mut seen = HashSet::new();
        let mut total = 0.0;
        while gen.advance() {
            gen.write_conf_signature(&mut sig);
            assert!(seen.insert(sig.clone()), "duplicate {:?}", sig);
            total += gen.eprob();
        }
        assert_eq!(seen.len(), expected);
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_monoisotopic_molecule() {
        let mol = Molecule::from_formula("F3Na2").unwrap();
        let mut gen = OrderedGenerator::new(mol);
        assert!(gen.advance());
        assert!((gen.eprob() - 1.0).abs() < 1e-9);
        assert!(!gen.advance());
    }

    #[test]
    fn test_terminate_is_final() {
        let mol = Molecule::from_formula("C10H10").unwrap();
        let mut gen = OrderedGenerator::new(mol);
        assert!(gen.advance());
        gen.terminate();
        assert!(!gen.advance());
    }

    #[test]
    fn test_masses_match_signatures() {
        let mol = Molecule::from_formula("C3H6").unwrap();
        let mut gen = OrderedGenerator::new(mol);
        let mut sig = vec![0i32; gen.conf_signature_len()];
        while gen.advance() {
            gen.write_conf_signature(&mut sig);
            let mass = sig[0] as f64 * 12.0
                + sig[1] as f64 * 13.0033548378
                + sig[2] as f64 * 1.00782503207
                + sig[3] as f64 * 2.0141017778;
            assert!((gen.mass() - mass).abs() < 1e-9);
        }
    }
}
