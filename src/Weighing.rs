/// The weighing engine: molar quantities and masses (with and without
/// excess) for a target product mass, from resolved or explicit ratios.
///
///  # Examples
/// ```
/// use WeiCalc::Weighing::weighing_calculator::WeighingCalculator;
/// use std::collections::HashMap;
/// let calculator = WeighingCalculator::new(vec![
///     "Li2O".to_string(), "SiO2".to_string(), "MoO3".to_string(),
/// ]).unwrap();
/// let result = calculator
///     .calc(&[], &[1.0, 1.0, 1.0], 2000.0, &HashMap::new(), true)
///     .unwrap();
/// let row = result.first_resolved().unwrap();
/// println!("{} mmol of '{}'", row.moles, row.product);
/// ```
pub mod weighing_calculator;
/// Parsing of user-entered ratio ("1", "1/3") and excess (mol%) fields.
pub mod input_parser;
/// The labeled output grid: display rendering, formula-linked rendering,
/// terminal pretty printing and CSV export.
pub mod output_table;
#[cfg(test)]
mod weighing_tests;
