//! Error types for molecule construction.
//!
//! Enumeration itself does not fail: a generator that runs out of
//! configurations simply returns `false` from `advance()`. Everything that
//! can go wrong happens up front, while parsing a formula or validating the
//! isotope tables.

use thiserror::Error;

/// Errors reported while building a [`crate::Molecule`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MoleculeError {
    /// The formula string contained no element symbols.
    #[error("empty chemical formula")]
    EmptyFormula,

    /// An element symbol was not found in the periodic table.
    #[error("unknown element symbol '{symbol}' at byte {position}")]
    UnknownElement { symbol: String, position: usize },

    /// The formula contained a character that starts neither a symbol nor a count.
    #[error("malformed formula at byte {position}: expected an element symbol")]
    MalformedFormula { position: usize },

    /// An explicit atom count of zero.
    #[error("element '{symbol}' at byte {position} has a zero count")]
    ZeroCount { symbol: String, position: usize },

    /// A molecule must contain at least one element.
    #[error("molecule has no elements")]
    EmptyMolecule,

    /// An element was given an empty isotope table.
    #[error("element {element} has no isotopes")]
    MissingIsotopes { element: usize },

    /// Mass and probability tables for one element disagree in length.
    #[error("element {element}: {masses} masses but {probabilities} probabilities")]
    MismatchedTableLengths {
        element: usize,
        masses: usize,
        probabilities: usize,
    },

    /// An isotope mass or probability was NaN or infinite.
    #[error("element {element}: non-finite isotope mass or probability")]
    NonFiniteValue { element: usize },

    /// An isotope probability outside [0, 1].
    #[error("element {element}: isotope probability {value} outside [0, 1]")]
    InvalidProbability { element: usize, value: f64 },

    /// Isotope probabilities of one element must sum to 1.
    #[error("element {element}: isotope probabilities sum to {sum}, expected 1")]
    UnnormalizedProbabilities { element: usize, sum: f64 },
}
