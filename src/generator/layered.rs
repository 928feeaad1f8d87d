//! Layered generator: isotopologues in expanding probability bands.

use tracing::debug;

use crate::marginal::LayeredMarginal;
use crate::math::Summator;
use crate::molecule::Molecule;

use super::Generator;

/// Tuning knobs for the layered enumeration.
#[derive(Clone, Copy, Debug)]
pub struct LayeredParams {
    /// Log-probability width of each layer; must be negative.
    pub delta: f64,
    /// Stop once Σ eprob of the emitted configurations reaches this value
    /// (checked at layer boundaries). `None` runs to exhaustion.
    pub target_total_prob: Option<f64>,
    /// Initial capacity of the per-element configuration tables.
    pub tab_size: usize,
    /// Initial capacity of the per-element deduplication sets.
    pub hash_size: usize,
}

impl Default for LayeredParams {
    fn default() -> Self {
        Self {
            delta: -3.0,
            target_total_prob: None,
            tab_size: 1000,
            hash_size: 1000,
        }
    }
}

/// Streams joint configurations layer by layer.
///
/// A layer is the band `[current_layer_lcutoff, last_layer_lcutoff)` of joint
/// log-probability. Within a layer the odometer sweep is the same as the
/// threshold generator's, with one extra rule: a configuration at or above
/// the band's upper bound was emitted in an earlier layer and is skipped.
/// When a layer is exhausted, every element's layered marginal is extended by
/// `delta` and the sweep restarts on the next band. Earlier (more probable)
/// layers always finish before later ones begin; ordering inside a layer is
/// unspecified.
pub struct LayeredGenerator {
    marginals: Vec<LayeredMarginal>,
    isotope_numbers: Vec<usize>,
    counter: Vec<usize>,
    partial_lprobs: Vec<f64>,
    partial_masses: Vec<f64>,
    partial_eprobs: Vec<f64>,
    /// `max_prefix_lp[i]` = Σ mode log-probs of dimensions `0..=i`.
    max_prefix_lp: Vec<f64>,
    mode_lprob: f64,
    delta: f64,
    target_total_prob: Option<f64>,
    current_layer_lcutoff: f64,
    last_layer_lcutoff: f64,
    current_sum: Summator,
    fresh: bool,
    terminated: bool,
}

impl LayeredGenerator {
    /// Consume a molecule and stream it in layers of width `delta`.
    pub fn new(mol: Molecule, delta: f64) -> Self {
        Self::with_params(
            mol,
            LayeredParams {
                delta,
                ..LayeredParams::default()
            },
        )
    }

    /// As [`new`](Self::new), with explicit parameters.
    pub fn with_params(mol: Molecule, params: LayeredParams) -> Self {
        assert!(params.delta < 0.0, "layer delta must be negative");

        let parts = mol.into_parts();
        let marginals: Vec<LayeredMarginal> = parts
            .marginals
            .into_iter()
            .map(|m| LayeredMarginal::new(m, params.tab_size, params.hash_size))
            .collect();

        let dim = marginals.len();
        let mut max_prefix_lp = Vec::with_capacity(dim.saturating_sub(1));
        let mut acc = 0.0;
        for m in marginals.iter().take(dim - 1) {
            acc += m.mode_lprob();
            max_prefix_lp.push(acc);
        }

        let mut partial_eprobs = vec![0.0; dim + 1];
        partial_eprobs[dim] = 1.0;

        let mut gen = Self {
            marginals,
            isotope_numbers: parts.isotope_numbers,
            counter: vec![0; dim],
            partial_lprobs: vec![0.0; dim + 1],
            partial_masses: vec![0.0; dim + 1],
            partial_eprobs,
            max_prefix_lp,
            mode_lprob: parts.mode_lprob,
            delta: params.delta,
            target_total_prob: params.target_total_prob,
            current_layer_lcutoff: parts.mode_lprob + params.delta,
            last_layer_lcutoff: f64::INFINITY,
            current_sum: Summator::new(),
            fresh: true,
            terminated: false,
        };
        gen.extend_marginals();
        gen.restart_sweep();
        gen
    }

    /// Σ eprob of everything emitted so far.
    pub fn total_prob(&self) -> f64 {
        self.current_sum.total()
    }

    /// Grow each element's tables to cover the current layer.
    fn extend_marginals(&mut self) {
        for m in &mut self.marginals {
            let bound = self.current_layer_lcutoff - (self.mode_lprob - m.mode_lprob());
            m.extend(bound);
        }
    }

    /// Reset the odometer for a fresh pass over the current band.
    fn restart_sweep(&mut self) {
        self.counter.fill(0);
        self.recalc(self.marginals.len() - 1);
        self.fresh = true;
    }

    /// Recompute the prefix arrays for dimensions `from..=0`.
    fn recalc(&mut self, from: usize) {
        for i in (0..=from).rev() {
            let c = self.counter[i];
            self.partial_lprobs[i] = self.partial_lprobs[i + 1] + self.marginals[i].lprob(c);
            self.partial_masses[i] = self.partial_masses[i + 1] + self.marginals[i].mass(c);
            self.partial_eprobs[i] = self.partial_eprobs[i + 1] * self.marginals[i].eprob(c);
        }
    }

    /// Next configuration inside the current band, or false when the band is
    /// swept out.
    fn step_within_layer(&mut self) -> bool {
        let dim = self.marginals.len();

        if self.fresh {
            self.fresh = false;
        } else {
            self.counter[0] += 1;
        }

        loop {
            let lp = self.partial_lprobs[1] + self.marginals[0].lprob(self.counter[0]);
            if lp >= self.current_layer_lcutoff {
                if lp < self.last_layer_lcutoff {
                    self.partial_lprobs[0] = lp;
                    self.partial_masses[0] =
                        self.partial_masses[1] + self.marginals[0].mass(self.counter[0]);
                    self.partial_eprobs[0] =
                        self.partial_eprobs[1] * self.marginals[0].eprob(self.counter[0]);
                    return true;
                }
                // Emitted in an earlier layer.
                self.counter[0] += 1;
                continue;
            }

            // Carry into the higher digits.
            let mut idx = 0;
            let mut resumed = false;
            while idx + 1 < dim {
                self.counter[idx] = 0;
                idx += 1;
                self.counter[idx] += 1;
                self.partial_lprobs[idx] =
                    self.partial_lprobs[idx + 1] + self.marginals[idx].lprob(self.counter[idx]);
                if self.partial_lprobs[idx] + self.max_prefix_lp[idx - 1]
                    >= self.current_layer_lcutoff
                {
                    self.recalc(idx - 1);
                    if self.partial_lprobs[0] < self.last_layer_lcutoff {
                        return true;
                    }
                    // The mode-prefix configuration at this column belongs to
                    // an earlier layer; resume scanning the innermost digit.
                    self.counter[0] += 1;
                    resumed = true;
                    break;
                }
            }
            if !resumed {
                return false;
            }
        }
    }

    /// Move the band down by `delta`; false when nothing can remain below.
    fn next_layer(&mut self) -> bool {
        if self.marginals.iter().all(|m| m.is_complete()) {
            let min_joint: f64 = self.marginals.iter().map(|m| m.smallest_lprob()).sum();
            if self.current_layer_lcutoff <= min_joint {
                return false;
            }
        }

        self.last_layer_lcutoff = self.current_layer_lcutoff;
        self.current_layer_lcutoff += self.delta;
        self.extend_marginals();
        self.restart_sweep();

        debug!(
            lower = self.current_layer_lcutoff,
            upper = self.last_layer_lcutoff,
            total_prob = self.current_sum.total(),
            "descending into next layer"
        );
        true
    }
}

impl Generator for LayeredGenerator {
    fn advance(&mut self) -> bool {
        if self.terminated {
            return false;
        }
        loop {
            if self.step_within_layer() {
                self.current_sum.add(self.partial_eprobs[0]);
                return true;
            }
            if let Some(target) = self.target_total_prob {
                if self.current_sum.total() >= target {
                    self.terminate();
                    return false;
                }
            }
            if !self.next_layer() {
                self.terminate();
                return false;
            }
        }
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
