//! Resolves molar ratios of starting materials against target products.
//!
//! Each product is treated as a linear system: find non-negative coefficients
//! c_1..c_n such that `Σ c_i · composition(material_i)` reproduces the
//! product composition over the union of elements appearing on either side.
//! The element-count matrix (rows = elements, columns = materials) is solved
//! against the product vector by non-negative least squares.

use crate::Stoichiometry::composition::Composition;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeSet;

/// Relative per-element tolerance for exact mode. The reconstructed count of
/// every element must satisfy `|r_i| <= EXACT_TOL * max(1, |b_i|)`.
pub const EXACT_TOL: f64 = 1e-8;

/// Numerical zero for the active-set bookkeeping inside NNLS.
const NNLS_TOL: f64 = 1e-10;

/// One resolved product row: coefficients per material (same order as the
/// material list) and the largest relative element residual of the fit.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioEntry {
    pub coefficients: Vec<f64>,
    pub residual: f64,
}

impl RatioEntry {
    /// True when the fit did not reproduce the product composition within
    /// the exact-mode tolerance (only possible in tolerant mode).
    pub fn is_inexact(&self) -> bool {
        self.residual > EXACT_TOL
    }
}

/// Ratio matrix over (product, material); `None` rows are unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioTable {
    pub materials: Vec<String>,
    pub products: Vec<String>,
    pub rows: Vec<Option<RatioEntry>>,
}

impl RatioTable {
    pub fn resolved_count(&self) -> usize {
        self.rows.iter().filter(|row| row.is_some()).count()
    }
}

/// Sorted union of the elements of all materials and the product.
pub fn element_union(materials: &[Composition], product: &Composition) -> Vec<String> {
    let mut union: BTreeSet<String> = BTreeSet::new();
    for comp in materials {
        union.extend(comp.elements().keys().cloned());
    }
    union.extend(product.elements().keys().cloned());
    union.into_iter().collect()
}

/// Element-count matrix: rows = `elements`, columns = materials.
pub fn element_matrix(materials: &[Composition], elements: &[String]) -> DMatrix<f64> {
    let mut matrix = DMatrix::zeros(elements.len(), materials.len());
    for (j, comp) in materials.iter().enumerate() {
        for (i, element) in elements.iter().enumerate() {
            matrix[(i, j)] = comp.count(element);
        }
    }
    matrix
}

/// Resolves every product against the materials.
///
/// In exact mode a row whose best fit leaves any element residual above
/// [`EXACT_TOL`] is marked unresolved; no error is raised, so the caller may
/// retry in tolerant mode. In tolerant mode the best non-negative fit is
/// accepted with its residual recorded, except when some product element is
/// absent from every material (no overlap can cover it) or the fit is
/// entirely zero.
pub fn resolve_ratios(
    materials: &[Composition],
    products: &[Composition],
    exact: bool,
) -> RatioTable {
    let mut rows = Vec::with_capacity(products.len());
    for product in products {
        rows.push(resolve_row(materials, product, exact));
    }
    let table = RatioTable {
        materials: materials.iter().map(|m| m.formula().to_string()).collect(),
        products: products.iter().map(|p| p.formula().to_string()).collect(),
        rows,
    };
    info!(
        "ratio resolution: {}/{} product rows resolved (exact = {})",
        table.resolved_count(),
        table.products.len(),
        exact
    );
    table
}

fn resolve_row(materials: &[Composition], product: &Composition, exact: bool) -> Option<RatioEntry> {
    // an element required by the product which no material carries can never
    // be covered by a non-negative combination
    for (element, count) in product.elements() {
        if *count > 0.0 && materials.iter().all(|m| m.count(element) == 0.0) {
            warn!(
                "product '{}': element '{}' is not present in any material, row unresolved",
                product.formula(),
                element
            );
            return None;
        }
    }

    let elements = element_union(materials, product);
    let a = element_matrix(materials, &elements);
    let b = DVector::from_iterator(
        elements.len(),
        elements.iter().map(|element| product.count(element)),
    );

    let coefficients = nnls(&a, &b);
    if coefficients.iter().all(|c| *c <= NNLS_TOL) {
        warn!(
            "product '{}': best non-negative fit is zero, row unresolved",
            product.formula()
        );
        return None;
    }

    let reconstructed = &a * &coefficients;
    let mut residual: f64 = 0.0;
    for i in 0..elements.len() {
        let rel = (reconstructed[i] - b[i]).abs() / b[i].abs().max(1.0);
        residual = residual.max(rel);
    }

    if exact && residual > EXACT_TOL {
        info!(
            "product '{}': residual {:.3e} above exact tolerance, row unresolved",
            product.formula(),
            residual
        );
        return None;
    }
    if residual > EXACT_TOL {
        warn!(
            "product '{}': accepted tolerant fit with residual {:.3e}",
            product.formula(),
            residual
        );
    }
    Some(RatioEntry {
        coefficients: coefficients.iter().copied().collect(),
        residual,
    })
}

/// Non-negative least squares, Lawson–Hanson active set method.
///
/// Minimizes `‖A·x − b‖` subject to `x >= 0`. The passive set grows one
/// column at a time; each candidate solution comes from an SVD solve of the
/// passive submatrix, and variables driven non-positive are moved back to the
/// active set along the feasible segment.
pub fn nnls(a: &DMatrix<f64>, b: &DVector<f64>) -> DVector<f64> {
    let n = a.ncols();
    let mut x: DVector<f64> = DVector::zeros(n);
    let mut passive = vec![false; n];

    for _outer in 0..(3 * n.max(1)) {
        let ax = a * &x;
        let w = a.transpose() * (b - &ax);

        // most promising active column
        let mut candidate: Option<usize> = None;
        let mut w_max = NNLS_TOL;
        for j in 0..n {
            if !passive[j] && w[j] > w_max {
                w_max = w[j];
                candidate = Some(j);
            }
        }
        let Some(t) = candidate else {
            break;
        };
        passive[t] = true;

        for _inner in 0..=n {
            let z = passive_solve(a, b, &passive);
            let mut alpha = f64::INFINITY;
            let mut blocked = false;
            for j in 0..n {
                if passive[j] && z[j] <= NNLS_TOL {
                    blocked = true;
                    let denom = x[j] - z[j];
                    if denom > 0.0 {
                        alpha = alpha.min(x[j] / denom);
                    }
                }
            }
            if !blocked {
                x = z;
                break;
            }
            if !alpha.is_finite() {
                alpha = 0.0;
            }
            x = &x * (1.0 - alpha) + &z * alpha;
            for j in 0..n {
                if passive[j] && x[j].abs() <= NNLS_TOL {
                    x[j] = 0.0;
                    passive[j] = false;
                }
            }
        }
    }
    // clamp the numerical dust
    for j in 0..n {
        if x[j] < 0.0 {
            x[j] = 0.0;
        }
    }
    x
}

/// Least-squares solve restricted to the passive columns; zeros elsewhere.
fn passive_solve(a: &DMatrix<f64>, b: &DVector<f64>, passive: &[bool]) -> DVector<f64> {
    let cols: Vec<usize> = passive
        .iter()
        .enumerate()
        .filter_map(|(j, on)| on.then_some(j))
        .collect();
    let mut z = DVector::zeros(passive.len());
    if cols.is_empty() {
        return z;
    }
    let sub = a.select_columns(cols.iter());
    let svd = sub.svd(true, true);
    match svd.solve(b, 1e-12) {
        Ok(solution) => {
            for (k, &j) in cols.iter().enumerate() {
                z[j] = solution[k];
            }
            z
        }
        Err(_) => z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn comps(formulas: &[&str]) -> Vec<Composition> {
        formulas
            .iter()
            .map(|f| Composition::from_formula(f).unwrap())
            .collect()
    }

    #[test]
    fn test_nnls_identity() {
        let a = DMatrix::identity(2, 2);
        let b = DVector::from_vec(vec![1.0, -1.0]);
        let x = nnls(&a, &b);
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(x[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_exact_decomposition() {
        let materials = comps(&["Li2O", "SiO2"]);
        let products = comps(&["Li2SiO3"]);
        let table = resolve_ratios(&materials, &products, true);
        let entry = table.rows[0].as_ref().expect("row should resolve");
        assert_relative_eq!(entry.coefficients[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(entry.coefficients[1], 1.0, epsilon = 1e-8);
        assert!(entry.residual <= EXACT_TOL);
        assert!(!entry.is_inexact());
    }

    #[test]
    fn test_exact_decomposition_reproduces_composition() {
        let materials = comps(&["Li2O", "SiO2", "MoO3"]);
        let products = comps(&["Li2MoO6Si"]);
        let table = resolve_ratios(&materials, &products, true);
        let entry = table.rows[0].as_ref().expect("row should resolve");
        let product = &Composition::from_formula("Li2MoO6Si").unwrap();
        for element in ["Li", "Si", "Mo", "O"] {
            let reconstructed: f64 = materials
                .iter()
                .zip(&entry.coefficients)
                .map(|(m, c)| c * m.count(element))
                .sum();
            assert_relative_eq!(reconstructed, product.count(element), epsilon = 1e-7);
        }
    }

    #[test]
    fn test_missing_element_is_unresolved_in_both_modes() {
        // no material carries lithium
        let materials = comps(&["SiO2", "MoO3"]);
        let products = comps(&["Li2O"]);
        let exact = resolve_ratios(&materials, &products, true);
        assert!(exact.rows[0].is_none());
        let tolerant = resolve_ratios(&materials, &products, false);
        assert!(tolerant.rows[0].is_none());
        assert_eq!(tolerant.resolved_count(), 0);
    }

    #[test]
    fn test_tolerant_mode_accepts_residual() {
        // Li2SiO4 is not an exact combination of Li2O and SiO2
        let materials = comps(&["Li2O", "SiO2"]);
        let products = comps(&["Li2SiO4"]);

        let exact = resolve_ratios(&materials, &products, true);
        assert!(exact.rows[0].is_none());

        let tolerant = resolve_ratios(&materials, &products, false);
        let entry = tolerant.rows[0].as_ref().expect("best fit accepted");
        assert!(entry.is_inexact());
        assert!(entry.coefficients.iter().all(|c| *c >= 0.0));
        // the unconstrained optimum happens to be feasible here
        assert_relative_eq!(entry.coefficients[0], 22.0 / 21.0, epsilon = 1e-6);
        assert_relative_eq!(entry.coefficients[1], 29.0 / 21.0, epsilon = 1e-6);
    }

    #[test]
    fn test_batch_keeps_going_past_unresolved_rows() {
        let materials = comps(&["Li2O", "SiO2"]);
        let products = comps(&["Li2SiO3", "Fe2O3", "Li4SiO4"]);
        let table = resolve_ratios(&materials, &products, true);
        assert!(table.rows[0].is_some());
        assert!(table.rows[1].is_none());
        let entry = table.rows[2].as_ref().expect("Li4SiO4 = 2 Li2O + SiO2");
        assert_relative_eq!(entry.coefficients[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(entry.coefficients[1], 1.0, epsilon = 1e-8);
        assert_eq!(table.resolved_count(), 2);
    }

    #[test]
    fn test_element_matrix_shape() {
        let materials = comps(&["H2O", "NaCl", "C3H8", "CH4"]);
        let product = Composition::from_formula("H2O").unwrap();
        let elements = element_union(&materials, &product);
        assert_eq!(elements.len(), 5); // C, Cl, H, Na, O
        let matrix = element_matrix(&materials, &elements);
        assert_eq!(matrix.nrows(), 5);
        assert_eq!(matrix.ncols(), 4);
        // elements are sorted, so row 0 is carbon
        assert_eq!(elements[0], "C");
        assert_eq!(matrix[(0, 2)], 3.0);
    }
}
