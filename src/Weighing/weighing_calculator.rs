//! The weighing engine: turns resolved molar ratios, a target product mass
//! and per-material excess fractions into the masses to weigh out.

use crate::Stoichiometry::composition::{Composition, CompositionError};
use crate::Stoichiometry::ratio_resolver::{RatioEntry, RatioTable, resolve_ratios};
use log::{info, warn};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeighingError {
    #[error("you can only enter either products or ratio")]
    ConflictingInput,
    #[error("you have to enter either products or ratio")]
    MissingInput,
    #[error("bad value for {field}: {reason}")]
    Format { field: String, reason: String },
    #[error(transparent)]
    Composition(#[from] CompositionError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Computed quantities for one material within a product row.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialQuantity {
    pub material: String,
    /// Formula weight, g/mol.
    pub molar_weight: f64,
    /// Molar coefficient from the ratio table.
    pub ratio: f64,
    /// mmol needed for the target mass, without excess.
    pub moles: f64,
    pub moles_with_excess: f64,
    pub mass_mg: f64,
    pub mass_with_excess_mg: f64,
}

/// One resolved product row of a weighing result.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub product: String,
    /// Product formula weight, g/mol.
    pub product_weight: f64,
    /// mmol of product at the target mass.
    pub moles: f64,
    /// Largest relative element residual of the ratio fit (0 for explicit
    /// ratios). Nonzero above the exact tolerance means the match is inexact.
    pub residual: f64,
    pub entries: Vec<MaterialQuantity>,
}

impl ProductRow {
    pub fn total_mass_mg(&self) -> f64 {
        self.entries.iter().map(|e| e.mass_mg).sum()
    }

    pub fn total_mass_with_excess_mg(&self) -> f64 {
        self.entries.iter().map(|e| e.mass_with_excess_mg).sum()
    }
}

/// Full result of one calculation run. Rows are index-aligned with
/// `products`; `None` rows could not be decomposed and carry no masses.
#[derive(Debug, Clone, PartialEq)]
pub struct WeighingResult {
    pub materials: Vec<String>,
    pub products: Vec<String>,
    pub target_mass_mg: f64,
    pub excess: HashMap<String, f64>,
    pub rows: Vec<Option<ProductRow>>,
}

impl WeighingResult {
    pub fn resolved_rows(&self) -> impl Iterator<Item = &ProductRow> {
        self.rows.iter().filter_map(|row| row.as_ref())
    }

    pub fn first_resolved(&self) -> Option<&ProductRow> {
        self.resolved_rows().next()
    }
}

/// Weighing calculator over a fixed ordered list of starting materials.
///
/// Material formulas are resolved once at construction; every call to
/// [`WeighingCalculator::calc`] is a pure function of its arguments.
pub struct WeighingCalculator {
    materials: Vec<String>,
    compositions: Vec<Composition>,
}

impl WeighingCalculator {
    pub fn new(materials: Vec<String>) -> Result<Self, WeighingError> {
        if materials.is_empty() {
            return Err(WeighingError::Format {
                field: "materials".to_string(),
                reason: "at least one material is required".to_string(),
            });
        }
        let compositions = materials
            .iter()
            .map(|formula| Composition::from_formula(formula))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WeighingCalculator {
            materials,
            compositions,
        })
    }

    pub fn materials(&self) -> &[String] {
        &self.materials
    }

    pub fn compositions(&self) -> &[Composition] {
        &self.compositions
    }

    /// Computes the weighing table for `mg` milligrams of product.
    ///
    /// Exactly one of `products` (target formulas, resolved by the ratio
    /// resolver) and `ratio` (explicit molar coefficients, one per material,
    /// taken at face value) must be non-empty. `excess` maps a material
    /// formula to its excess fraction (0.05 = 5 mol%); unlisted materials get
    /// no excess. Product rows with no feasible decomposition are `None` in
    /// the result and skipped here, not raised.
    pub fn calc(
        &self,
        products: &[String],
        ratio: &[f64],
        mg: f64,
        excess: &HashMap<String, f64>,
        exact: bool,
    ) -> Result<WeighingResult, WeighingError> {
        if !products.is_empty() && !ratio.is_empty() {
            return Err(WeighingError::ConflictingInput);
        }
        if products.is_empty() && ratio.is_empty() {
            return Err(WeighingError::MissingInput);
        }
        if !(mg > 0.0) {
            return Err(WeighingError::Format {
                field: "mg".to_string(),
                reason: "target mass must be positive".to_string(),
            });
        }
        for (material, fraction) in excess {
            if *fraction < 0.0 {
                return Err(WeighingError::Format {
                    field: format!("excess[{}]", material),
                    reason: "excess must be 0 or positive".to_string(),
                });
            }
        }

        let (product_comps, table) = if ratio.is_empty() {
            let product_comps = products
                .iter()
                .map(|formula| Composition::from_formula(formula))
                .collect::<Result<Vec<_>, _>>()?;
            let table = resolve_ratios(&self.compositions, &product_comps, exact);
            (product_comps, table)
        } else {
            self.synthesize_product(ratio)?
        };

        let mut rows = Vec::with_capacity(product_comps.len());
        for (product, entry) in product_comps.iter().zip(&table.rows) {
            rows.push(entry.as_ref().map(|entry| {
                self.build_row(product, entry, mg, excess)
            }));
        }
        let unresolved = rows.iter().filter(|row| row.is_none()).count();
        if unresolved > 0 {
            warn!("{} product row(s) left unresolved and skipped", unresolved);
        }
        info!(
            "weighing computed for {} material(s), {} product row(s), target {} mg",
            self.materials.len(),
            rows.len(),
            mg
        );
        Ok(WeighingResult {
            materials: self.materials.clone(),
            products: table.products,
            target_mass_mg: mg,
            excess: excess.clone(),
            rows,
        })
    }

    /// The explicit-ratio path: the product composition is the ratio-weighted
    /// sum of the material compositions, no equation solving involved.
    fn synthesize_product(
        &self,
        ratio: &[f64],
    ) -> Result<(Vec<Composition>, RatioTable), WeighingError> {
        if ratio.len() != self.materials.len() {
            return Err(WeighingError::Format {
                field: "ratio".to_string(),
                reason: format!(
                    "expected {} values, got {}",
                    self.materials.len(),
                    ratio.len()
                ),
            });
        }
        if ratio.iter().any(|c| *c < 0.0) {
            return Err(WeighingError::Format {
                field: "ratio".to_string(),
                reason: "molar coefficients must be non-negative".to_string(),
            });
        }
        if ratio.iter().all(|c| *c == 0.0) {
            return Err(WeighingError::Format {
                field: "ratio".to_string(),
                reason: "at least one coefficient must be positive".to_string(),
            });
        }
        let parts: Vec<(f64, &Composition)> = ratio
            .iter()
            .copied()
            .zip(self.compositions.iter())
            .collect();
        let product = Composition::linear_combination(&parts);
        info!(
            "product '{}' synthesized from explicit ratio {:?}",
            product.formula(),
            ratio
        );
        let table = RatioTable {
            materials: self.materials.clone(),
            products: vec![product.formula().to_string()],
            rows: vec![Some(RatioEntry {
                coefficients: ratio.to_vec(),
                residual: 0.0,
            })],
        };
        Ok((vec![product], table))
    }

    fn build_row(
        &self,
        product: &Composition,
        entry: &RatioEntry,
        mg: f64,
        excess: &HashMap<String, f64>,
    ) -> ProductRow {
        let moles = mg / product.weight();
        let entries = self
            .materials
            .iter()
            .zip(&self.compositions)
            .zip(&entry.coefficients)
            .map(|((material, comp), ratio)| {
                let fraction = excess.get(material).copied().unwrap_or(0.0);
                let material_moles = ratio * moles;
                let mass_mg = material_moles * comp.weight();
                MaterialQuantity {
                    material: material.clone(),
                    molar_weight: comp.weight(),
                    ratio: *ratio,
                    moles: material_moles,
                    moles_with_excess: material_moles * (1.0 + fraction),
                    mass_mg,
                    mass_with_excess_mg: mass_mg * (1.0 + fraction),
                }
            })
            .collect();
        ProductRow {
            product: product.formula().to_string(),
            product_weight: product.weight(),
            moles,
            residual: entry.residual,
            entries,
        }
    }
}
