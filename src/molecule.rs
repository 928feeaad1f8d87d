//! The joint molecule descriptor.
//!
//! A [`Molecule`] validates its isotope tables, eagerly builds one
//! [`Marginal`] per element and caches the joint mode log-probability and the
//! extreme peak masses. Generators *consume* the descriptor: construction
//! work done here is reused, and the moved-from handle simply no longer
//! exists; misuse of a consumed descriptor is a compile-time error.

use crate::error::MoleculeError;
use crate::formula;
use crate::marginal::Marginal;

/// Tolerance on `|Σ p − 1|` for one element's isotope probabilities.
const PROB_SUM_TOLERANCE: f64 = 1e-6;

/// Full description of a molecule: elements in insertion order, their atom
/// counts and isotope tables, and the per-element marginal distributions.
#[derive(Clone, Debug)]
pub struct Molecule {
    isotope_numbers: Vec<usize>,
    atom_counts: Vec<u32>,
    marginals: Vec<Marginal>,
    mode_lprob: f64,
}

/// A consumed descriptor, decomposed for a generator to build on.
pub(crate) struct MoleculeParts {
    pub isotope_numbers: Vec<usize>,
    pub mode_lprob: f64,
    pub marginals: Vec<Marginal>,
}

impl Molecule {
    /// Build a molecule from explicit per-element isotope tables.
    ///
    /// # Arguments
    /// * `atom_counts` - Atoms of each element, e.g. `[100, 202]` for C100H202
    /// * `isotope_masses` - Per-element isotope masses in daltons
    /// * `isotope_probs` - Per-element isotope probabilities; each sums to 1
    pub fn from_tables(
        atom_counts: &[u32],
        isotope_masses: &[Vec<f64>],
        isotope_probs: &[Vec<f64>],
    ) -> Result<Self, MoleculeError> {
        if atom_counts.is_empty() {
            return Err(MoleculeError::EmptyMolecule);
        }
        if isotope_masses.len() != atom_counts.len() || isotope_probs.len() != atom_counts.len() {
            return Err(MoleculeError::MismatchedTableLengths {
                element: 0,
                masses: isotope_masses.len(),
                probabilities: isotope_probs.len(),
            });
        }

        let mut marginals = Vec::with_capacity(atom_counts.len());
        for (element, ((&count, masses), probs)) in atom_counts
            .iter()
            .zip(isotope_masses)
            .zip(isotope_probs)
            .enumerate()
        {
            validate_element(element, masses, probs)?;
            marginals.push(Marginal::new(masses.clone(), probs.clone(), count));
        }

        Ok(Self::from_marginals(atom_counts.to_vec(), marginals))
    }

    /// Build a molecule from a chemical formula, e.g. `"C2000H40000"`.
    ///
    /// Isotope masses and abundances come from [`crate::periodic`].
    pub fn from_formula(formula: &str) -> Result<Self, MoleculeError> {
        let terms = formula::parse_formula(formula)?;
        let mut atom_counts = Vec::with_capacity(terms.len());
        let mut marginals = Vec::with_capacity(terms.len());
        for term in terms {
            atom_counts.push(term.count);
            marginals.push(Marginal::new(
                term.element.masses.to_vec(),
                term.element.abundances.to_vec(),
                term.count,
            ));
        }
        Ok(Self::from_marginals(atom_counts, marginals))
    }

    fn from_marginals(atom_counts: Vec<u32>, marginals: Vec<Marginal>) -> Self {
        let isotope_numbers = marginals.iter().map(|m| m.isotope_count()).collect();
        let mode_lprob = marginals.iter().map(|m| m.mode_lprob()).sum();
        Self {
            isotope_numbers,
            atom_counts,
            marginals,
            mode_lprob,
        }
    }

    /// Number of elements.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.marginals.len()
    }

    /// Isotope count of each element, in insertion order.
    #[inline]
    pub fn isotope_numbers(&self) -> &[usize] {
        &self.isotope_numbers
    }

    /// Atom count of each element, in insertion order.
    #[inline]
    pub fn atom_counts(&self) -> &[u32] {
        &self.atom_counts
    }

    /// Total signature length: `Σ isotope_numbers`.
    pub fn conf_signature_len(&self) -> usize {
        self.isotope_numbers.iter().sum()
    }

    /// Log-probability of the joint mode configuration.
    #[inline]
    pub fn mode_lprob(&self) -> f64 {
        self.mode_lprob
    }

    /// Mass of the lightest peak (every atom on its lightest isotope).
    pub fn lightest_peak_mass(&self) -> f64 {
        self.marginals.iter().map(|m| m.lightest_conf_mass()).sum()
    }

    /// Mass of the heaviest peak (every atom on its heaviest isotope).
    pub fn heaviest_peak_mass(&self) -> f64 {
        self.marginals.iter().map(|m| m.heaviest_conf_mass()).sum()
    }

    /// Per-element marginals.
    #[inline]
    pub fn marginals(&self) -> &[Marginal] {
        &self.marginals
    }

    /// Decompose into the pieces a generator owns.
    pub(crate) fn into_parts(self) -> MoleculeParts {
        MoleculeParts {
            isotope_numbers: self.isotope_numbers,
            mode_lprob: self.mode_lprob,
            marginals: self.marginals,
        }
    }
}

fn validate_element(element: usize, masses: &[f64], probs: &[f64]) -> Result<(), MoleculeError> {
    if masses.is_empty() {
        return Err(MoleculeError::MissingIsotopes { element });
    }
    if masses.len() != probs.len() {
        return Err(MoleculeError::MismatchedTableLengths {
            element,
            masses: masses.len(),
            probabilities: probs.len(),
        });
    }
    for &m in masses {
        if !m.is_finite() {
            return Err(MoleculeError::NonFiniteValue { element });
        }
    }
    let mut sum = 0.0;
    for &p in probs {
        if !p.is_finite() {
            return Err(MoleculeError::NonFiniteValue { element });
        }
        if !(0.0..=1.0).contains(&p) {
            return Err(MoleculeError::InvalidProbability { element, value: p });
        }
        sum += p;
    }
    if (sum - 1.0).abs() > PROB_SUM_TOLERANCE {
        return Err(MoleculeError::UnnormalizedProbabilities { element, sum });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_formula_water() {
        let mol = Molecule::from_formula("H2O").unwrap();
        assert_eq!(mol.element_count(), 2);
        assert_eq!(mol.atom_counts(), &[2, 1]);
        assert_eq!(mol.isotope_numbers(), &[2, 3]);
        assert_eq!(mol.conf_signature_len(), 5);
    }

    #[test]
    fn test_mode_lprob_is_sum_of_element_modes() {
        let mol = Molecule::from_formula("C100H202").unwrap();
        let expected: f64 = mol.marginals().iter().map(|m| m.mode_lprob()).sum();
        assert_eq!(mol.mode_lprob(), expected);
    }

    #[test]
    fn test_mode_lprob_brute_force() {
        // C3N2: enumerate every joint configuration directly.
        let mol = Molecule::from_formula("C3N2").unwrap();
        let mut best = f64::NEG_INFINITY;
        for c in 0..=3 {
            for n in 0..=2 {
                let lp = mol.marginals()[0].conf_lprob(&[3 - c, c])
                    + mol.marginals()[1].conf_lprob(&[2 - n, n]);
                best = best.max(lp);
            }
        }
        assert!((mol.mode_lprob() - best).abs() < 1e-9);
    }

    #[test]
    fn test_peak_mass_extremes() {
        let mol = Molecule::from_formula("H2O").unwrap();
        let lightest = 2.0 * 1.00782503207 + 15.99491461956;
        let heaviest = 2.0 * 2.0141017778 + 17.9991610;
        assert!((mol.lightest_peak_mass() - lightest).abs() < 1e-9);
        assert!((mol.heaviest_peak_mass() - heaviest).abs() < 1e-9);
    }

    #[test]
    fn test_from_tables() {
        let mol = Molecule::from_tables(
            &[100, 202],
            &[vec![12.0, 13.0033548378], vec![1.00782503207, 2.0141017778]],
            &[vec![0.989212, 0.010788], vec![0.999885, 0.000115]],
        )
        .unwrap();
        let by_formula = Molecule::from_formula("C100H202").unwrap();
        assert!((mol.mode_lprob() - by_formula.mode_lprob()).abs() < 1e-12);
    }

    #[test]
    fn test_validation_rejects_bad_tables() {
        // Probabilities off by more than the tolerance.
        assert!(matches!(
            Molecule::from_tables(&[1], &[vec![1.0, 2.0]], &[vec![0.6, 0.5]]),
            Err(MoleculeError::UnnormalizedProbabilities { .. })
        ));
        // Length mismatch within an element.
        assert!(matches!(
            Molecule::from_tables(&[1], &[vec![1.0, 2.0]], &[vec![1.0]]),
            Err(MoleculeError::MismatchedTableLengths { .. })
        ));
        // Empty isotope table.
        assert!(matches!(
            Molecule::from_tables(&[1], &[vec![]], &[vec![]]),
            Err(MoleculeError::MissingIsotopes { .. })
        ));
        // NaN probability.
        assert!(matches!(
            Molecule::from_tables(&[1], &[vec![1.0]], &[vec![f64::NAN]]),
            Err(MoleculeError::NonFiniteValue { .. })
        ));
        // No elements at all.
        assert!(matches!(
            Molecule::from_tables(&[], &[], &[]),
            Err(MoleculeError::EmptyMolecule)
        ));
    }

    #[test]
    fn test_zero_atom_element_is_legal() {
        let mol = Molecule::from_tables(
            &[0],
            &[vec![12.0, 13.0033548378]],
            &[vec![0.989212, 0.010788]],
        )
        .unwrap();
        assert!(mol.mode_lprob().abs() < 1e-12);
    }
}
