//! Static atomic weight table.
//!
//! The table ships with the crate as a plain text resource
//! (`src/assets/atomic_weights.txt`, one `symbol weight` pair per line,
//! `#` starts a comment) and is parsed once on first access.

use log::info;
use std::collections::HashMap;
use std::sync::LazyLock;

const ATOMIC_WEIGHTS_TXT: &str = include_str!("../assets/atomic_weights.txt");

static ATOMIC_WEIGHTS: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    let mut table = HashMap::new();
    for (i, line) in ATOMIC_WEIGHTS_TXT.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(symbol), Some(weight)) = (fields.next(), fields.next()) else {
            panic!("atomic weight table: malformed line {}: '{}'", i + 1, line);
        };
        let weight: f64 = weight
            .parse()
            .unwrap_or_else(|_| panic!("atomic weight table: bad weight on line {}: '{}'", i + 1, line));
        table.insert(symbol, weight);
    }
    info!("atomic weight table loaded: {} elements", table.len());
    table
});

/// Standard atomic weight of an element symbol, g/mol.
pub fn atomic_weight(symbol: &str) -> Option<f64> {
    ATOMIC_WEIGHTS.get(symbol).copied()
}

pub fn is_known_element(symbol: &str) -> bool {
    ATOMIC_WEIGHTS.contains_key(symbol)
}
