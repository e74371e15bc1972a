//! Assembles a weighing result into the labeled output grid.
//!
//! Rows are the named quantities, columns are the materials followed by the
//! product. Two render modes exist: a display mode with every value rounded
//! to two decimals (missing cells stay blank, never zero), and a
//! formula-linked mode whose cells are A1-notation spreadsheet expressions,
//! so the exported file recomputes when the target mass cell is edited.

use crate::Weighing::weighing_calculator::{WeighingError, WeighingResult};
use csv::ReaderBuilder;
use log::info;
use prettytable::{Cell, Row, Table};
use std::path::{Path, PathBuf};

/// Quantity row labels, in output order.
pub const QUANTITY_ROWS: [&str; 8] = [
    "M.W.",
    "molar ratio",
    "mole (mmol)",
    "excess ratio (mol%)",
    "mole w/ excess",
    "no excess weight (mg)",
    "weight (mg)",
    "measured value (mg)",
];

const ROW_MW: usize = 0;
const ROW_RATIO: usize = 1;
const ROW_MOLE: usize = 2;
const ROW_EXCESS: usize = 3;
const ROW_MOLE_EXCESS: usize = 4;
const ROW_MASS: usize = 5;
const ROW_MASS_EXCESS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// Literal cells, rendered exactly as the display table shows them.
    Literal,
    /// Cells hold spreadsheet expressions referencing other cells.
    FormulaLinked,
}

/// The quantity-by-column grid for one resolved product row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    columns: Vec<String>,
    n_materials: usize,
    grid: Vec<Vec<Option<f64>>>,
    target_mass_mg: f64,
}

impl OutputTable {
    /// Builds the grid for the product row at `row_index`; `None` when that
    /// row is unresolved (unresolved rows carry no masses at all).
    pub fn build(result: &WeighingResult, row_index: usize) -> Option<OutputTable> {
        let row = result.rows.get(row_index)?.as_ref()?;
        let n = row.entries.len();
        let mut columns = result.materials.clone();
        columns.push(row.product.clone());

        let mut grid = vec![vec![None; n + 1]; QUANTITY_ROWS.len()];
        for (j, entry) in row.entries.iter().enumerate() {
            grid[ROW_MW][j] = Some(entry.molar_weight);
            grid[ROW_RATIO][j] = Some(entry.ratio);
            grid[ROW_MOLE][j] = Some(entry.moles);
            if let Some(fraction) = result.excess.get(&entry.material) {
                grid[ROW_EXCESS][j] = Some(fraction * 100.0);
            }
            grid[ROW_MOLE_EXCESS][j] = Some(entry.moles_with_excess);
            grid[ROW_MASS][j] = Some(entry.mass_mg);
            grid[ROW_MASS_EXCESS][j] = Some(entry.mass_with_excess_mg);
        }
        grid[ROW_MW][n] = Some(row.product_weight);
        grid[ROW_RATIO][n] = Some(1.0);
        grid[ROW_MOLE][n] = Some(row.moles);
        grid[ROW_MASS][n] = Some(row.total_mass_mg());
        grid[ROW_MASS_EXCESS][n] = Some(row.total_mass_with_excess_mg());

        Some(OutputTable {
            columns,
            n_materials: n,
            grid,
            target_mass_mg: result.target_mass_mg,
        })
    }

    /// Builds one table per product, `None` for unresolved rows.
    pub fn build_all(result: &WeighingResult) -> Vec<Option<OutputTable>> {
        (0..result.rows.len())
            .map(|i| OutputTable::build(result, i))
            .collect()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Literal cell value; `None` cells render blank.
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.grid.get(row).and_then(|cells| cells.get(col)).copied().flatten()
    }

    /// Display rendering: `{:.2}`, blanks for missing values. The
    /// `measured value (mg)` row only makes sense on paper and in exports,
    /// so the terminal rendering drops it when `include_measured` is false.
    pub fn display_grid(&self, include_measured: bool) -> Vec<(String, Vec<String>)> {
        let n_rows = if include_measured {
            QUANTITY_ROWS.len()
        } else {
            QUANTITY_ROWS.len() - 1
        };
        (0..n_rows)
            .map(|i| {
                let cells = self.grid[i]
                    .iter()
                    .map(|cell| match cell {
                        Some(value) => format!("{:.2}", value),
                        None => String::new(),
                    })
                    .collect();
                (QUANTITY_ROWS[i].to_string(), cells)
            })
            .collect()
    }

    /// Formula-linked rendering in A1 notation.
    ///
    /// Sheet layout: row 1 is the header, quantity rows follow in order;
    /// column A holds labels, materials start at B. The product's
    /// `no excess weight (mg)` cell holds the literal target mass and is the
    /// cell a user edits to recompute the sheet.
    pub fn formula_grid(&self) -> Vec<(String, Vec<String>)> {
        let n = self.n_materials;
        let product_col = col_letter(n + 1);
        let last_material_col = col_letter(n);
        let mut rows = Vec::with_capacity(QUANTITY_ROWS.len());
        for (i, label) in QUANTITY_ROWS.iter().enumerate() {
            let sheet_row = i + 2;
            let mut cells = Vec::with_capacity(n + 1);
            for j in 0..n {
                let col = col_letter(j + 1);
                let cell = match i {
                    ROW_MW | ROW_RATIO => full_precision(self.grid[i][j]),
                    ROW_MOLE => format!("={}3*${}$4", col, product_col),
                    ROW_EXCESS => full_precision(self.grid[i][j]),
                    ROW_MOLE_EXCESS => format!("={}4*(1+{}5/100)", col, col),
                    ROW_MASS => format!("={}4*{}2", col, col),
                    ROW_MASS_EXCESS => format!("={}6*{}2", col, col),
                    _ => String::new(),
                };
                cells.push(cell);
            }
            let product_cell = match i {
                ROW_MW | ROW_RATIO => full_precision(self.grid[i][n]),
                ROW_MOLE => format!("={}7/{}2", product_col, product_col),
                ROW_MASS => full_precision(Some(self.target_mass_mg)),
                ROW_MASS_EXCESS => format!("=SUM(B{}:{}{})", sheet_row, last_material_col, sheet_row),
                _ => String::new(),
            };
            cells.push(product_cell);
            rows.push((label.to_string(), cells));
        }
        rows
    }

    /// Prints the display table to the terminal.
    pub fn pretty_print(&self) {
        let mut table = Table::new();
        let mut header = vec![Cell::new("")];
        for column in &self.columns {
            header.push(Cell::new(column));
        }
        table.add_row(Row::new(header));
        for (label, cells) in self.display_grid(false) {
            let mut row = vec![Cell::new(&label)];
            for cell in &cells {
                row.push(Cell::new(cell));
            }
            table.add_row(Row::new(row));
        }
        table.printstd();
    }

    /// Writes the table as a CSV spreadsheet. A filename whose extension is
    /// missing or not `.csv` is normalized first; the path actually written
    /// is returned.
    pub fn export(&self, filename: &str, mode: ExportMode) -> Result<PathBuf, WeighingError> {
        let path = normalize_export_path(filename);
        let mut writer = csv::Writer::from_path(&path)?;
        let mut header = vec![String::new()];
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;
        let rows = match mode {
            ExportMode::Literal => self.display_grid(true),
            ExportMode::FormulaLinked => self.formula_grid(),
        };
        for (label, cells) in rows {
            let mut record = vec![label];
            record.extend(cells);
            writer.write_record(&record)?;
        }
        writer.flush()?;
        info!("weighing table exported to '{}'", path.display());
        Ok(path)
    }
}

/// Reads an exported CSV back as rows of cells (header row included).
pub fn read_csv_grid(path: &Path) -> Result<Vec<Vec<String>>, WeighingError> {
    let mut reader = ReaderBuilder::new().has_headers(false).from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(rows)
}

fn normalize_export_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(filename.trim());
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => {}
        _ => {
            path.set_extension("csv");
        }
    }
    path
}

/// Shortest-roundtrip rendering for cells that must survive recomputation.
fn full_precision(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{}", value),
        None => String::new(),
    }
}

/// 0-based sheet column index to A1 letters: 0 -> A, 25 -> Z, 26 -> AA.
fn col_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Weighing::weighing_calculator::WeighingCalculator;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    fn sample_result() -> crate::Weighing::weighing_calculator::WeighingResult {
        let calculator = WeighingCalculator::new(vec![
            "Li2O".to_string(),
            "SiO2".to_string(),
            "MoO3".to_string(),
        ])
        .unwrap();
        let mut excess = HashMap::new();
        excess.insert("Li2O".to_string(), 0.05);
        calculator
            .calc(&[], &[1.0, 1.0, 1.0], 2000.0, &excess, true)
            .unwrap()
    }

    #[test]
    fn test_grid_values() {
        let result = sample_result();
        let table = OutputTable::build(&result, 0).unwrap();
        assert_eq!(table.columns().len(), 4);
        assert_eq!(table.columns()[3], "Li2MoO6Si");

        // conservation of mass: the product mass column is the material sum
        let product_mass = table.value(ROW_MASS, 3).unwrap();
        assert_relative_eq!(product_mass, 2000.0, epsilon = 1e-6);
        let sum: f64 = (0..3).map(|j| table.value(ROW_MASS, j).unwrap()).sum();
        assert_relative_eq!(sum, product_mass, epsilon = 1e-9);

        // excess only set for the listed material
        assert_relative_eq!(table.value(ROW_EXCESS, 0).unwrap(), 5.0);
        assert_eq!(table.value(ROW_EXCESS, 1), None);
        assert_relative_eq!(
            table.value(ROW_MASS_EXCESS, 0).unwrap(),
            table.value(ROW_MASS, 0).unwrap() * 1.05,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_display_grid_formatting() {
        let result = sample_result();
        let table = OutputTable::build(&result, 0).unwrap();
        let rows = table.display_grid(true);
        assert_eq!(rows.len(), QUANTITY_ROWS.len());
        // the product column of the excess row is blank, not "0.00"
        assert_eq!(rows[ROW_EXCESS].1[3], "");
        // measured value row is entirely blank
        assert!(rows[7].1.iter().all(|cell| cell.is_empty()));
        // two decimal places everywhere a value exists
        assert_eq!(rows[ROW_MASS].1[3], "2000.00");
        let without_measured = table.display_grid(false);
        assert_eq!(without_measured.len(), QUANTITY_ROWS.len() - 1);
    }

    #[test]
    fn test_formula_grid_references() {
        let result = sample_result();
        let table = OutputTable::build(&result, 0).unwrap();
        let rows = table.formula_grid();
        // materials are columns B..D, the product is column E
        assert_eq!(rows[ROW_MOLE].1[0], "=B3*$E$4");
        assert_eq!(rows[ROW_MOLE].1[3], "=E7/E2");
        assert_eq!(rows[ROW_MOLE_EXCESS].1[1], "=C4*(1+C5/100)");
        assert_eq!(rows[ROW_MASS].1[2], "=D4*D2");
        assert_eq!(rows[ROW_MASS].1[3], "2000");
        assert_eq!(rows[ROW_MASS_EXCESS].1[3], "=SUM(B8:D8)");
    }

    #[test]
    fn test_csv_round_trip() {
        let result = sample_result();
        let table = OutputTable::build(&result, 0).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("weighing.csv");
        let written = table
            .export(target.to_str().unwrap(), ExportMode::Literal)
            .unwrap();
        let rows = read_csv_grid(&written).unwrap();
        // header + 8 quantity rows
        assert_eq!(rows.len(), 1 + QUANTITY_ROWS.len());
        assert_eq!(rows[0][1], "Li2O");
        // literal cells reproduce the 2-decimal display values
        let display = table.display_grid(true);
        for (i, (label, cells)) in display.iter().enumerate() {
            assert_eq!(&rows[i + 1][0], label);
            assert_eq!(&rows[i + 1][1..], &cells[..]);
        }
    }

    #[test]
    fn test_extension_normalization() {
        let result = sample_result();
        let table = OutputTable::build(&result, 0).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let bare = dir.path().join("weighing");
        let written = table
            .export(bare.to_str().unwrap(), ExportMode::Literal)
            .unwrap();
        assert_eq!(written.extension().unwrap(), "csv");

        let mismatched = dir.path().join("weighing.xlsx");
        let written = table
            .export(mismatched.to_str().unwrap(), ExportMode::FormulaLinked)
            .unwrap();
        assert_eq!(written.file_name().unwrap(), "weighing.csv");
    }

    #[test]
    fn test_unresolved_row_has_no_table() {
        let calculator =
            WeighingCalculator::new(vec!["SiO2".to_string(), "MoO3".to_string()]).unwrap();
        let result = calculator
            .calc(&["Li2O".to_string()], &[], 500.0, &HashMap::new(), false)
            .unwrap();
        assert!(OutputTable::build(&result, 0).is_none());
        let all = OutputTable::build_all(&result);
        assert_eq!(all.len(), 1);
        assert!(all[0].is_none());
    }

    #[test]
    fn test_col_letter() {
        assert_eq!(col_letter(0), "A");
        assert_eq!(col_letter(1), "B");
        assert_eq!(col_letter(25), "Z");
        assert_eq!(col_letter(26), "AA");
        assert_eq!(col_letter(27), "AB");
    }
}
