///////////////////////TESTS////////////////////////////////////////////
//
// End-to-end scenarios for the weighing engine, from formula strings to the
// exported grid.

use crate::Stoichiometry::ratio_resolver::EXACT_TOL;
use crate::Weighing::output_table::{ExportMode, OutputTable, read_csv_grid};
use crate::Weighing::weighing_calculator::{WeighingCalculator, WeighingError};
use approx::assert_relative_eq;
use std::collections::HashMap;

fn calculator(materials: &[&str]) -> WeighingCalculator {
    WeighingCalculator::new(materials.iter().map(|m| m.to_string()).collect()).unwrap()
}

#[test]
fn test_explicit_ratio_scenario() {
    // Li2O + SiO2 + MoO3, ratio 1:1:1, 2000 mg, no excess
    let calc = calculator(&["Li2O", "SiO2", "MoO3"]);
    let result = calc
        .calc(&[], &[1.0, 1.0, 1.0], 2000.0, &HashMap::new(), true)
        .unwrap();
    let row = result.first_resolved().unwrap();

    let li2o = 2.0 * 6.94 + 15.999;
    let sio2 = 28.085 + 2.0 * 15.999;
    let moo3 = 95.95 + 3.0 * 15.999;
    assert_relative_eq!(row.product_weight, li2o + sio2 + moo3, epsilon = 1e-9);
    assert_relative_eq!(row.moles, 2000.0 / row.product_weight, epsilon = 1e-12);

    // each material: 1 x moles x own formula weight
    assert_relative_eq!(row.entries[0].mass_mg, row.moles * li2o, epsilon = 1e-9);
    assert_relative_eq!(row.entries[1].mass_mg, row.moles * sio2, epsilon = 1e-9);
    assert_relative_eq!(row.entries[2].mass_mg, row.moles * moo3, epsilon = 1e-9);

    // conservation of mass
    assert_relative_eq!(row.total_mass_mg(), 2000.0, epsilon = 1e-6);
    assert_relative_eq!(row.total_mass_with_excess_mg(), 2000.0, epsilon = 1e-6);
}

#[test]
fn test_product_driven_scenario() {
    let calc = calculator(&["Li2O", "SiO2"]);
    let result = calc
        .calc(
            &["Li2SiO3".to_string()],
            &[],
            1000.0,
            &HashMap::new(),
            true,
        )
        .unwrap();
    let row = result.first_resolved().unwrap();
    assert_relative_eq!(row.entries[0].ratio, 1.0, epsilon = 1e-8);
    assert_relative_eq!(row.entries[1].ratio, 1.0, epsilon = 1e-8);
    assert!(row.residual <= EXACT_TOL);

    // conservation of mass: sum(coefficient x material weight x moles)
    let reconstructed: f64 = row
        .entries
        .iter()
        .map(|e| e.ratio * e.molar_weight * row.moles)
        .sum();
    assert_relative_eq!(reconstructed, row.total_mass_mg(), epsilon = 1e-9);
    assert_relative_eq!(row.total_mass_mg(), 1000.0, epsilon = 1e-6);
}

#[test]
fn test_excess_application() {
    let calc = calculator(&["Li2O", "SiO2"]);
    let mut excess = HashMap::new();
    excess.insert("Li2O".to_string(), 0.05);
    let result = calc
        .calc(&["Li2SiO3".to_string()], &[], 1000.0, &excess, true)
        .unwrap();
    let row = result.first_resolved().unwrap();

    assert_relative_eq!(
        row.entries[0].mass_with_excess_mg,
        row.entries[0].mass_mg * 1.05,
        epsilon = 1e-9
    );
    assert_relative_eq!(
        row.entries[0].moles_with_excess,
        row.entries[0].moles * 1.05,
        epsilon = 1e-9
    );
    // default excess is 0 for unlisted materials
    assert_relative_eq!(
        row.entries[1].mass_with_excess_mg,
        row.entries[1].mass_mg,
        epsilon = 1e-12
    );
    assert_relative_eq!(
        row.total_mass_with_excess_mg(),
        row.entries[0].mass_mg * 1.05 + row.entries[1].mass_mg,
        epsilon = 1e-9
    );
}

#[test]
fn test_idempotence() {
    let calc = calculator(&["Li2O", "SiO2", "MoO3"]);
    let mut excess = HashMap::new();
    excess.insert("MoO3".to_string(), 0.02);
    let a = calc
        .calc(&["Li2MoO6Si".to_string()], &[], 2000.0, &excess, true)
        .unwrap();
    let b = calc
        .calc(&["Li2MoO6Si".to_string()], &[], 2000.0, &excess, true)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_input_conflicts() {
    let calc = calculator(&["Li2O", "SiO2"]);
    let err = calc
        .calc(
            &["Li2SiO3".to_string()],
            &[1.0, 1.0],
            1000.0,
            &HashMap::new(),
            true,
        )
        .unwrap_err();
    assert!(matches!(err, WeighingError::ConflictingInput));

    let err = calc
        .calc(&[], &[], 1000.0, &HashMap::new(), true)
        .unwrap_err();
    assert!(matches!(err, WeighingError::MissingInput));
}

#[test]
fn test_bad_inputs() {
    let calc = calculator(&["Li2O", "SiO2"]);
    // wrong ratio arity
    assert!(matches!(
        calc.calc(&[], &[1.0], 1000.0, &HashMap::new(), true),
        Err(WeighingError::Format { .. })
    ));
    // negative excess
    let mut excess = HashMap::new();
    excess.insert("Li2O".to_string(), -0.05);
    assert!(matches!(
        calc.calc(&[], &[1.0, 1.0], 1000.0, &excess, true),
        Err(WeighingError::Format { .. })
    ));
    // non-positive target mass
    assert!(matches!(
        calc.calc(&[], &[1.0, 1.0], 0.0, &HashMap::new(), true),
        Err(WeighingError::Format { .. })
    ));
    // unparseable material formula fails at construction
    assert!(matches!(
        WeighingCalculator::new(vec!["Li2O".to_string(), "??".to_string()]),
        Err(WeighingError::Composition(_))
    ));
}

#[test]
fn test_unresolved_product_is_skipped_not_raised() {
    // no lithium anywhere: Li2O cannot be decomposed
    let calc = calculator(&["SiO2", "MoO3"]);
    let exact = calc
        .calc(&["Li2O".to_string()], &[], 500.0, &HashMap::new(), true)
        .unwrap();
    assert!(exact.rows[0].is_none());
    assert!(exact.first_resolved().is_none());

    // the tolerant retry still cannot cover lithium
    let tolerant = calc
        .calc(&["Li2O".to_string()], &[], 500.0, &HashMap::new(), false)
        .unwrap();
    assert!(tolerant.rows[0].is_none());
}

#[test]
fn test_tolerant_fit_reports_inexact_match() {
    let calc = calculator(&["Li2O", "SiO2"]);
    let exact = calc
        .calc(&["Li2SiO4".to_string()], &[], 1000.0, &HashMap::new(), true)
        .unwrap();
    assert!(exact.rows[0].is_none());

    let tolerant = calc
        .calc(&["Li2SiO4".to_string()], &[], 1000.0, &HashMap::new(), false)
        .unwrap();
    let row = tolerant.first_resolved().unwrap();
    assert!(row.residual > EXACT_TOL);
    // masses still follow the accepted coefficients
    assert_relative_eq!(
        row.total_mass_mg(),
        row.entries.iter().map(|e| e.ratio * e.molar_weight).sum::<f64>() * row.moles,
        epsilon = 1e-9
    );
}

#[test]
fn test_full_pipeline_to_export() {
    let calc = calculator(&["Li2O", "SiO2", "MoO3"]);
    let mut excess = HashMap::new();
    excess.insert("Li2O".to_string(), 0.05);
    excess.insert("SiO2".to_string(), 0.0);
    let result = calc
        .calc(&[], &[1.0, 1.0, 1.0], 2000.0, &excess, true)
        .unwrap();
    let table = OutputTable::build(&result, 0).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run");
    let written = table.export(path.to_str().unwrap(), ExportMode::Literal).unwrap();
    let rows = read_csv_grid(&written).unwrap();
    // weight (mg) row, product column: 2000.00 plus the Li2O excess
    let weight_row = rows.iter().find(|r| r[0] == "weight (mg)").unwrap();
    let total: f64 = weight_row.last().unwrap().parse().unwrap();
    let row = result.first_resolved().unwrap();
    assert_relative_eq!(total, row.total_mass_with_excess_mg(), epsilon = 0.01);
    assert!(total > 2000.0);
}
