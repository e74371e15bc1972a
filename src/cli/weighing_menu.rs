//! The weighing calculation flow: material entry (pre-filled from the input
//! cache), ratio or product input, excess and target mass, result table and
//! optional CSV export.

use super::cli_main::prompt;
use crate::Weighing::input_parser::{parse_excess_field, parse_ratio_field, parse_target_mass};
use crate::Weighing::output_table::{ExportMode, OutputTable};
use crate::Weighing::weighing_calculator::{WeighingCalculator, WeighingResult};
use crate::cache_manager::CacheManager;
use crate::settings::Settings;
use log::warn;
use std::collections::HashMap;

pub fn weighing_menu(settings: &Settings) {
    let Some(n_materials) = prompt_material_count(settings) else {
        return;
    };
    let mut cache = CacheManager::new();
    let materials = prompt_materials(settings, n_materials, &cache);
    if let Err(e) = cache.store_materials(&materials) {
        warn!("could not persist the material cache: {}", e);
    }
    let calculator = match WeighingCalculator::new(materials) {
        Ok(calculator) => calculator,
        Err(e) => {
            println!("{} ({})", settings.label("invalid_composition"), e);
            return;
        }
    };
    calculation_menu(settings, &calculator);
}

/// Asks for the number of starting materials; empty input goes back.
fn prompt_material_count(settings: &Settings) -> Option<usize> {
    loop {
        let reply = prompt(settings.label("n_materials"));
        if reply.is_empty() {
            return None;
        }
        match reply.parse::<usize>() {
            Ok(n) if n > 0 => return Some(n),
            _ => println!("{}", settings.label("enter_integer")),
        }
    }
}

/// One prompt per material, pre-filled from the cache: an empty reply takes
/// the cached formula shown in brackets, if there is one.
fn prompt_materials(settings: &Settings, n: usize, cache: &CacheManager) -> Vec<String> {
    println!("\n{}", settings.label("materials_entry"));
    let cached = cache.cached_materials(n);
    let mut materials = Vec::with_capacity(n);
    for (i, cached_material) in cached.iter().enumerate() {
        loop {
            let text = if cached_material.is_empty() {
                format!("{}{}: ", settings.label("material"), i + 1)
            } else {
                format!("{}{} [{}]: ", settings.label("material"), i + 1, cached_material)
            };
            let reply = prompt(&text);
            if !reply.is_empty() {
                materials.push(reply);
                break;
            }
            if !cached_material.is_empty() {
                materials.push(cached_material.clone());
                break;
            }
            println!("{}", settings.label("fill_all"));
        }
    }
    materials
}

fn calculation_menu(settings: &Settings, calculator: &WeighingCalculator) {
    loop {
        println!("\n{}", settings.label("calculation_menu"));
        println!("\x1b[33m1. {}\x1b[0m", settings.label("calc_ratio"));
        println!("\x1b[33m2. {}\x1b[0m", settings.label("calc_product"));
        println!("\x1b[33m0. {}\x1b[0m", settings.label("back"));
        let choice = prompt(settings.label("enter_choice"));
        let result = match choice.as_str() {
            "1" => calc_by_ratio(settings, calculator),
            "2" => calc_by_product(settings, calculator),
            "0" => return,
            _ => {
                println!("{}", settings.label("invalid_choice"));
                continue;
            }
        };
        if let Some(result) = result {
            show_result(settings, &result);
        }
    }
}

fn prompt_common_inputs(
    settings: &Settings,
    calculator: &WeighingCalculator,
) -> (f64, HashMap<String, f64>) {
    let mg = loop {
        let reply = prompt(&format!("{}: ", settings.label("target_mass")));
        match parse_target_mass(&reply) {
            Ok(mg) => break mg,
            Err(e) => println!("{} ({})", settings.label("bad_value"), e),
        }
    };

    println!("{}", settings.label("excess_heading"));
    let mut excess = HashMap::new();
    for material in calculator.materials() {
        loop {
            let reply = prompt(&format!("  {}: ", material));
            match parse_excess_field(material, &reply) {
                Ok(fraction) => {
                    excess.insert(material.clone(), fraction);
                    break;
                }
                Err(e) => println!("{} ({})", settings.label("bad_value"), e),
            }
        }
    }
    (mg, excess)
}

fn calc_by_ratio(settings: &Settings, calculator: &WeighingCalculator) -> Option<WeighingResult> {
    let (mg, excess) = prompt_common_inputs(settings, calculator);

    println!("{}", settings.label("ratio_heading"));
    let mut ratio = Vec::with_capacity(calculator.materials().len());
    for material in calculator.materials() {
        loop {
            let reply = prompt(&format!("  {}: ", material));
            match parse_ratio_field(material, &reply) {
                Ok(value) => {
                    ratio.push(value);
                    break;
                }
                Err(e) => println!("{} ({})", settings.label("bad_value"), e),
            }
        }
    }

    match calculator.calc(&[], &ratio, mg, &excess, true) {
        Ok(result) => Some(result),
        Err(e) => {
            println!("{} ({})", settings.label("bad_value"), e);
            None
        }
    }
}

fn calc_by_product(settings: &Settings, calculator: &WeighingCalculator) -> Option<WeighingResult> {
    let product = prompt(settings.label("enter_product"));
    if product.is_empty() {
        println!("{}", settings.label("nothing_entered"));
        return None;
    }
    let (mg, excess) = prompt_common_inputs(settings, calculator);
    let products = vec![product];

    // exact first, then one deliberate tolerant retry
    match calculator.calc(&products, &[], mg, &excess, true) {
        Ok(result) if result.first_resolved().is_some() => Some(result),
        Ok(_) | Err(_) => match calculator.calc(&products, &[], mg, &excess, false) {
            Ok(result) if result.first_resolved().is_some() => {
                println!("{}", settings.label("inexact_warning"));
                Some(result)
            }
            Ok(_) => {
                println!("{}", settings.label("invalid_composition"));
                None
            }
            Err(e) => {
                println!("{} ({})", settings.label("invalid_composition"), e);
                None
            }
        },
    }
}

fn show_result(settings: &Settings, result: &WeighingResult) {
    let Some(table) = OutputTable::build(result, 0) else {
        println!("{}", settings.label("invalid_composition"));
        return;
    };
    table.pretty_print();

    let filename = prompt(settings.label("save_as"));
    if filename.is_empty() {
        return;
    }
    let mode = match prompt(&format!("{}: ", settings.label("export_mode"))).as_str() {
        "2" => ExportMode::FormulaLinked,
        _ => ExportMode::Literal,
    };
    match table.export(&filename, mode) {
        Ok(path) => println!("{} ({})", settings.label("saved"), path.display()),
        Err(e) => println!("{} ({})", settings.label("bad_value"), e),
    }
}
