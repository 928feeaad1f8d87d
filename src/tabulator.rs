//! Tabulation of generator output into contiguous columns.

use crate::generator::Generator;
use crate::math::Summator;

/// Which columns a [`Tabulator`] keeps.
#[derive(Clone, Copy, Debug)]
pub struct TabulatorColumns {
    /// Keep masses.
    pub masses: bool,
    /// Keep log-probabilities.
    pub lprobs: bool,
    /// Keep linear probabilities.
    pub probs: bool,
    /// Keep configuration signatures.
    pub confs: bool,
}

impl Default for TabulatorColumns {
    fn default() -> Self {
        Self {
            masses: true,
            lprobs: true,
            probs: true,
            confs: false,
        }
    }
}

/// Drains a generator into aligned columns.
///
/// Row `i` across `masses()`, `lprobs()`, `probs()` and `conf(i)` describes
/// the `i`-th emitted isotopologue; columns that were not requested stay
/// empty.
#[derive(Clone, Debug)]
pub struct Tabulator {
    masses: Vec<f64>,
    lprobs: Vec<f64>,
    probs: Vec<f64>,
    confs: Vec<i32>,
    conf_width: usize,
    size: usize,
    total_prob: f64,
}

impl Tabulator {
    /// Run `gen` to exhaustion, keeping the requested columns.
    pub fn collect<G: Generator>(gen: &mut G, columns: TabulatorColumns) -> Self {
        let conf_width = gen.conf_signature_len();
        let mut tab = Self {
            masses: Vec::new(),
            lprobs: Vec::new(),
            probs: Vec::new(),
            confs: Vec::new(),
            conf_width,
            size: 0,
            total_prob: 0.0,
        };
        let mut signature = vec![0i32; conf_width];
        let mut total = Summator::new();

        while gen.advance() {
            if columns.masses {
                tab.masses.push(gen.mass());
            }
            if columns.lprobs {
                tab.lprobs.push(gen.lprob());
            }
            if columns.probs {
                tab.probs.push(gen.eprob());
            }
            if columns.confs {
                gen.write_conf_signature(&mut signature);
                tab.confs.extend_from_slice(&signature);
            }
            total.add(gen.eprob());
            tab.size += 1;
        }
        tab.total_prob = total.total();
        tab
    }

    /// Number of tabulated isotopologues.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// True when nothing was emitted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Masses column.
    #[inline]
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// Log-probabilities column.
    #[inline]
    pub fn lprobs(&self) -> &[f64] {
        &self.lprobs
    }

    /// Linear probabilities column.
    #[inline]
    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    /// Signature of row `idx` (requires the `confs` column).
    pub fn conf(&self, idx: usize) -> &[i32] {
        &self.confs[idx * self.conf_width..(idx + 1) * self.conf_width]
    }

    /// Compensated Σ eprob over everything tabulated.
    #[inline]
    pub fn total_prob(&self) -> f64 {
        self.total_prob
    }
}
