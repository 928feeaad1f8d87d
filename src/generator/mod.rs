//! Joint isotopologue generators.
//!
//! This module provides Rust implementations of:
//! - Generator: the common streaming interface
//! - OrderedGenerator: strictly decreasing probability, O(N log N)
//! - ThresholdGenerator: everything above a cutoff, unordered, O(N)
//! - LayeredGenerator: expanding probability bands
//! - threshold_peaks_parallel: the threshold sweep fanned out over rayon

pub mod layered;
pub mod ordered;
pub mod parallel;
pub mod threshold;

pub use layered::{LayeredGenerator, LayeredParams};
pub use ordered::{OrderedGenerator, OrderedParams};
pub use parallel::threshold_peaks_parallel;
pub use threshold::{ThresholdGenerator, ThresholdParams};

/// One emitted isotopologue.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// Mass in daltons.
    pub mass: f64,
    /// Joint log-probability.
    pub lprob: f64,
    /// Joint linear probability; may underflow to 0 in extreme tails, which
    /// is not a termination signal.
    pub prob: f64,
}

/// The common streaming interface of all joint generators.
///
/// `lprob`/`mass`/`eprob` are undefined before the first successful
/// [`advance`](Self::advance).
pub trait Generator {
    /// Step to the next configuration; false once exhausted.
    fn advance(&mut self) -> bool;

    /// Joint log-probability of the current configuration.
    fn lprob(&self) -> f64;

    /// Mass of the current configuration.
    fn mass(&self) -> f64;

    /// Joint linear probability of the current configuration.
    fn eprob(&self) -> f64;

    /// Length of a configuration signature: `Σ isotope_numbers`.
    fn conf_signature_len(&self) -> usize;

    /// Write the current configuration's isotope counts into `space`, element
    /// by element in insertion order. `space` must hold
    /// [`conf_signature_len`](Self::conf_signature_len) values.
    fn write_conf_signature(&self, space: &mut [i32]);

    /// Irrevocably mark the generator exhausted; idempotent.
    fn terminate(&mut self);

    /// Drain the generator as an iterator of [`Peak`]s.
    fn peaks(self) -> Peaks<Self>
    where
        Self: Sized,
    {
        Peaks { generator: self }
    }
}

/// Iterator adapter over a [`Generator`].
#[derive(Debug)]
pub struct Peaks<G: Generator> {
    generator: G,
}

impl<G: Generator> Iterator for Peaks<G> {
    type Item = Peak;

    fn next(&mut self) -> Option<Peak> {
        if self.generator.advance() {
            Some(Peak {
                mass: self.generator.mass(),
                lprob: self.generator.lprob(),
                prob: self.generator.eprob(),
            })
        } else {
            None
        }
    }
}
