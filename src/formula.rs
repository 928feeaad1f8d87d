//! Chemical formula parsing.
//!
//! A formula is a sequence of `Symbol[Count]` pairs: an uppercase letter,
//! optionally one lowercase letter, then an optional decimal count (a missing
//! count means 1). Whitespace between tokens is ignored. Repeated symbols are
//! kept as separate entries in encounter order, so `"CH3CH3"` produces four
//! elements; the joint distribution is unaffected, only the signature layout
//! reflects the repetition.

use crate::error::MoleculeError;
use crate::periodic::{self, ElementIsotopes};

/// One parsed `(element, count)` pair.
#[derive(Clone, Copy, Debug)]
pub struct FormulaTerm {
    /// Isotope table of the element.
    pub element: &'static ElementIsotopes,
    /// Number of atoms.
    pub count: u32,
}

/// Parse a chemical formula into `(element, count)` pairs.
///
/// # Arguments
/// * `formula` - e.g. `"C2H5OH"` or `"C100 H202"`
pub fn parse_formula(formula: &str) -> Result<Vec<FormulaTerm>, MoleculeError> {
    let bytes = formula.as_bytes();
    let mut terms = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if !bytes[pos].is_ascii_uppercase() {
            return Err(MoleculeError::MalformedFormula { position: pos });
        }

        let start = pos;
        let mut end = pos + 1;
        if end < bytes.len() && bytes[end].is_ascii_lowercase() {
            end += 1;
        }
        let symbol = &formula[start..end];
        pos = end;

        let digits_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }

        let count = if digits_start == pos {
            1
        } else {
            // Counts beyond u32 are nonsense for a molecule; treat overflow
            // like any other malformed count.
            formula[digits_start..pos]
                .parse::<u32>()
                .map_err(|_| MoleculeError::MalformedFormula {
                    position: digits_start,
                })?
        };

        if count == 0 {
            return Err(MoleculeError::ZeroCount {
                symbol: symbol.to_string(),
                position: start,
            });
        }

        let element = periodic::lookup(symbol).ok_or_else(|| MoleculeError::UnknownElement {
            symbol: symbol.to_string(),
            position: start,
        })?;

        terms.push(FormulaTerm { element, count });
    }

    if terms.is_empty() {
        return Err(MoleculeError::EmptyFormula);
    }
    Ok(terms)
}
