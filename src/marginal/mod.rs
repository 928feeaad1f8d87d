//! Marginal distributions of single elements (subisotopologues).
//!
//! This module provides:
//! - Marginal: one element's multinomial over its isotopes
//! - MarginalTrek: on-demand enumeration in decreasing probability
//! - PrecalculatedMarginal: contiguous, probability-sorted, down to a cutoff
//! - LayeredMarginal: a precalculated marginal extensible band by band

pub mod layered;
pub mod precalc;
pub mod trek;

pub use layered::LayeredMarginal;
pub use precalc::PrecalculatedMarginal;
pub use trek::MarginalTrek;

use crate::math;

/// The multinomial distribution of one element's atoms over its isotopes.
///
/// A configuration is an isotope-count vector summing to the atom count. The
/// marginal knows its mode, evaluates configuration log-probabilities and
/// masses, and enumerates neighbors (one atom moved between two isotopes).
#[derive(Clone, Debug)]
pub struct Marginal {
    masses: Vec<f64>,
    lprobs: Vec<f64>,
    probs: Vec<f64>,
    atom_cnt: u32,
    /// `log(atom_cnt!)`, the constant multinomial term.
    log_atom_cnt_factorial: f64,
    mode_conf: Vec<i32>,
    mode_lprob: f64,
}

impl Marginal {
    /// Build the marginal for one element.
    ///
    /// Inputs are assumed validated (same lengths, probabilities in [0, 1]
    /// summing to 1); [`crate::Molecule`] construction performs the checks.
    pub fn new(masses: Vec<f64>, probs: Vec<f64>, atom_cnt: u32) -> Self {
        let lprobs: Vec<f64> = probs.iter().map(|&p| p.ln()).collect();
        let log_atom_cnt_factorial = math::log_factorial_down(atom_cnt);
        let mode_conf = mode_configuration(&probs, &lprobs, atom_cnt);
        let mode_lprob =
            log_atom_cnt_factorial + math::unnormalized_log_prob(&mode_conf, &lprobs);
        Self {
            masses,
            lprobs,
            probs,
            atom_cnt,
            log_atom_cnt_factorial,
            mode_conf,
            mode_lprob,
        }
    }

    /// Number of isotopes.
    #[inline]
    pub fn isotope_count(&self) -> usize {
        self.masses.len()
    }

    /// Number of atoms of this element.
    #[inline]
    pub fn atom_count(&self) -> u32 {
        self.atom_cnt
    }

    /// The most probable configuration.
    #[inline]
    pub fn mode_conf(&self) -> &[i32] {
        &self.mode_conf
    }

    /// Log-probability of the mode.
    #[inline]
    pub fn mode_lprob(&self) -> f64 {
        self.mode_lprob
    }

    /// Isotope probabilities.
    #[inline]
    pub fn isotope_probs(&self) -> &[f64] {
        &self.probs
    }

    /// Mass of the all-lightest-isotope configuration.
    pub fn lightest_conf_mass(&self) -> f64 {
        let min = self.masses.iter().cloned().fold(f64::INFINITY, f64::min);
        min * self.atom_cnt as f64
    }

    /// Mass of the all-heaviest-isotope configuration.
    pub fn heaviest_conf_mass(&self) -> f64 {
        let max = self
            .masses
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        max * self.atom_cnt as f64
    }

    /// Log-probability of a configuration.
    #[inline]
    pub fn conf_lprob(&self, conf: &[i32]) -> f64 {
        self.log_atom_cnt_factorial + math::unnormalized_log_prob(conf, &self.lprobs)
    }

    /// Mass of a configuration.
    pub fn conf_mass(&self, conf: &[i32]) -> f64 {
        conf.iter()
            .zip(&self.masses)
            .map(|(&c, &m)| c as f64 * m)
            .sum()
    }

    /// Call `f` with every neighbor of `conf`: all configurations reachable
    /// by moving one atom from isotope `i` to isotope `j`.
    pub fn for_each_neighbor(&self, conf: &[i32], mut f: impl FnMut(Vec<i32>)) {
        let k = conf.len();
        for i in 0..k {
            if conf[i] == 0 {
                continue;
            }
            for j in 0..k {
                if j == i {
                    continue;
                }
                let mut neighbor = conf.to_vec();
                neighbor[i] -= 1;
                neighbor[j] += 1;
                f(neighbor);
            }
        }
    }
}

/// Mode of the multinomial: floor allocation, then hand out the remaining
/// atoms one at a time to the isotope with the largest marginal log-prob gain
/// (`log p_i − log(c_i + 1)`), ties to the lowest index.
fn mode_configuration(probs: &[f64], lprobs: &[f64], atom_cnt: u32) -> Vec<i32> {
    let mut conf: Vec<i32> = probs
        .iter()
        .map(|&p| (atom_cnt as f64 * p).floor() as i32)
        .collect();
    let mut left = atom_cnt as i64 - conf.iter().map(|&c| c as i64).sum::<i64>();

    while left > 0 {
        let mut best = 0;
        let mut best_gain = f64::NEG_INFINITY;
        for (i, &lp) in lprobs.iter().enumerate() {
            let gain = lp - ((conf[i] + 1) as f64).ln();
            if gain > best_gain {
                best_gain = gain;
                best = i;
            }
        }
        conf[best] += 1;
        left -= 1;
    }
    conf
}
