//! Elemental composition of a substance parsed from its chemical formula.
//!
//! A formula is a sequence of element symbols or parenthesized groups, each
//! followed by an optional count. Counts may be fractional, which is how
//! disordered or substituted sites are written ("Li0.5CoO2"). Nesting is
//! allowed: "Ca(NO3)2", "K2(SO4(H2O)2)".

use crate::Stoichiometry::periodic_table::atomic_weight;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Characters a formula may contain once whitespace is stripped.
static FORMULA_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9().]+$").unwrap());

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompositionError {
    #[error("cannot parse formula '{formula}': {reason}")]
    Parse { formula: String, reason: String },
    #[error("unknown element '{symbol}' in formula '{formula}'")]
    UnknownElement { symbol: String, formula: String },
}

/// Immutable elemental composition with its derived formula weight.
///
/// Atom counts are kept as `f64` so fractional site occupancies survive the
/// round trip into the ratio solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    formula: String,
    elements: BTreeMap<String, f64>,
    weight: f64,
}

impl Composition {
    /// Parses a chemical formula into a composition.
    ///
    /// ```
    /// use WeiCalc::Stoichiometry::composition::Composition;
    /// let comp = Composition::from_formula("Ca(NO3)2").unwrap();
    /// assert_eq!(comp.count("O"), 6.0);
    /// assert!((comp.weight() - 164.086).abs() < 1e-2);
    /// ```
    pub fn from_formula(formula: &str) -> Result<Self, CompositionError> {
        let stripped: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
        if stripped.is_empty() {
            return Err(CompositionError::Parse {
                formula: formula.to_string(),
                reason: "empty formula".to_string(),
            });
        }
        if !FORMULA_CHARSET.is_match(&stripped) {
            return Err(CompositionError::Parse {
                formula: formula.to_string(),
                reason: "contains characters outside A-Z a-z 0-9 ( ) .".to_string(),
            });
        }
        let chars: Vec<char> = stripped.chars().collect();
        let mut pos = 0usize;
        let elements = parse_group(&chars, &mut pos, formula, 0)?;
        if elements.is_empty() {
            return Err(CompositionError::Parse {
                formula: formula.to_string(),
                reason: "no elements found".to_string(),
            });
        }
        let weight = composition_weight(&elements, formula)?;
        Ok(Composition {
            formula: formula.trim().to_string(),
            elements,
            weight,
        })
    }

    /// Composition synthesized as `Σ coefficient_i × composition_i`.
    ///
    /// This is the explicit-ratio path: the caller-supplied coefficients are
    /// taken at face value and the weighted sum of the material compositions
    /// becomes the product. No equation solving is involved. The display
    /// formula is generated from the combined element counts.
    pub fn linear_combination(parts: &[(f64, &Composition)]) -> Self {
        let mut elements: BTreeMap<String, f64> = BTreeMap::new();
        let mut weight = 0.0;
        for (coeff, comp) in parts {
            weight += coeff * comp.weight;
            for (symbol, count) in &comp.elements {
                *elements.entry(symbol.clone()).or_insert(0.0) += coeff * count;
            }
        }
        // zero coefficients leave entries with zero count behind
        elements.retain(|_, count| *count > 0.0);
        let formula = format_elements(&elements);
        Composition {
            formula,
            elements,
            weight,
        }
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn elements(&self) -> &BTreeMap<String, f64> {
        &self.elements
    }

    /// Atom count of an element, 0 when absent.
    pub fn count(&self, symbol: &str) -> f64 {
        self.elements.get(symbol).copied().unwrap_or(0.0)
    }

    /// Formula weight: `Σ atom_count × atomic_weight`, g/mol.
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

fn composition_weight(
    elements: &BTreeMap<String, f64>,
    formula: &str,
) -> Result<f64, CompositionError> {
    let mut weight = 0.0;
    for (symbol, count) in elements {
        let Some(aw) = atomic_weight(symbol) else {
            return Err(CompositionError::UnknownElement {
                symbol: symbol.clone(),
                formula: formula.to_string(),
            });
        };
        weight += aw * count;
    }
    Ok(weight)
}

/// Parses one bracket level; `pos` is left on the closing ')' of the caller.
fn parse_group(
    chars: &[char],
    pos: &mut usize,
    formula: &str,
    depth: usize,
) -> Result<BTreeMap<String, f64>, CompositionError> {
    let mut counts: BTreeMap<String, f64> = BTreeMap::new();
    while *pos < chars.len() {
        let c = chars[*pos];
        if c == '(' {
            *pos += 1;
            let inner = parse_group(chars, pos, formula, depth + 1)?;
            if *pos >= chars.len() || chars[*pos] != ')' {
                return Err(CompositionError::Parse {
                    formula: formula.to_string(),
                    reason: "unbalanced '('".to_string(),
                });
            }
            *pos += 1; // consume ')'
            let mult = parse_count(chars, pos, formula)?.unwrap_or(1.0);
            for (symbol, count) in inner {
                *counts.entry(symbol).or_insert(0.0) += count * mult;
            }
        } else if c == ')' {
            if depth == 0 {
                return Err(CompositionError::Parse {
                    formula: formula.to_string(),
                    reason: "unbalanced ')'".to_string(),
                });
            }
            return Ok(counts);
        } else if c.is_ascii_uppercase() {
            let start = *pos;
            *pos += 1;
            if *pos < chars.len() && chars[*pos].is_ascii_lowercase() {
                *pos += 1;
            }
            let symbol: String = chars[start..*pos].iter().collect();
            let count = parse_count(chars, pos, formula)?.unwrap_or(1.0);
            *counts.entry(symbol).or_insert(0.0) += count;
        } else {
            return Err(CompositionError::Parse {
                formula: formula.to_string(),
                reason: format!("unexpected character '{}' at position {}", c, *pos),
            });
        }
    }
    if depth != 0 {
        return Err(CompositionError::Parse {
            formula: formula.to_string(),
            reason: "unbalanced '('".to_string(),
        });
    }
    Ok(counts)
}

/// Scans an optional count after an element or group: digits with at most one
/// decimal point. Returns `None` when the next character starts no number.
fn parse_count(
    chars: &[char],
    pos: &mut usize,
    formula: &str,
) -> Result<Option<f64>, CompositionError> {
    let start = *pos;
    while *pos < chars.len() && chars[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos < chars.len() && chars[*pos] == '.' && *pos > start {
        *pos += 1;
        while *pos < chars.len() && chars[*pos].is_ascii_digit() {
            *pos += 1;
        }
    }
    if *pos == start {
        return Ok(None);
    }
    let text: String = chars[start..*pos].iter().collect();
    match text.parse::<f64>() {
        Ok(count) if count >= 0.0 => Ok(Some(count)),
        _ => Err(CompositionError::Parse {
            formula: formula.to_string(),
            reason: format!("malformed count '{}'", text),
        }),
    }
}

/// Display formula for a synthesized composition: elements in alphabetical
/// order, unit counts omitted, fractional counts trimmed of trailing zeros.
fn format_elements(elements: &BTreeMap<String, f64>) -> String {
    let mut out = String::new();
    for (symbol, count) in elements {
        out.push_str(symbol);
        if (count - 1.0).abs() < 1e-9 {
            continue;
        }
        if (count - count.round()).abs() < 1e-9 {
            out.push_str(&format!("{}", count.round() as i64));
        } else {
            let text = format!("{:.4}", count);
            out.push_str(text.trim_end_matches('0').trim_end_matches('.'));
        }
    }
    out
}
