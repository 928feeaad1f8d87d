//! Isotopic fine structure of molecules.
//!
//! Given a chemical formula (or explicit isotope tables), this crate
//! enumerates *isotopologues*, assignments of isotopes to atoms, together
//! with their exact masses and occurrence probabilities. The configuration
//! space is a product of one multinomial per element and is astronomically
//! large for big molecules, but almost all probability mass sits in a tiny
//! subset; the generators stream exactly that subset without materializing
//! the rest.
//!
//! Three enumeration disciplines are available:
//! - [`OrderedGenerator`]: strictly decreasing probability, O(N log N)
//! - [`ThresholdGenerator`]: everything above a probability cutoff, O(N)
//! - [`LayeredGenerator`]: expanding probability bands, cheap to deepen
//!
//! ```
//! use isofine::{Generator, Molecule, ThresholdGenerator};
//!
//! let mol = Molecule::from_formula("H2O").unwrap();
//! let mut gen = ThresholdGenerator::new(mol, 0.001, true);
//! while gen.advance() {
//!     println!("{} Da, prob {}", gen.mass(), gen.eprob());
//! }
//! ```
//!
//! Generators *consume* their molecule: the descriptor's precomputed
//! marginals move into the generator, and the handle cannot be used again.
//! Clone the molecule first to drive several generators from one
//! description.

pub mod error;
pub mod formula;
pub mod generator;
pub mod marginal;
pub mod math;
pub mod molecule;
pub mod periodic;
pub mod tabulator;

pub use error::MoleculeError;
pub use generator::{
    threshold_peaks_parallel, Generator, LayeredGenerator, LayeredParams, OrderedGenerator,
    OrderedParams, Peak, Peaks, ThresholdGenerator, ThresholdParams,
};
pub use math::Summator;
pub use molecule::Molecule;
pub use tabulator::{Tabulator, TabulatorColumns};
