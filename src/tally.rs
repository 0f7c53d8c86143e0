//! # Element Tally / Mass Engine
//!
//! ## Aim
//! Read-only derived views of a compound tree: per-element atom counts,
//! total atomic mass, the set of distinct elements, and a pretty-printed
//! composition table.
//!
//! ## Key Methods
//! - `tally_elements()`: compound -> per-symbol atom counts
//! - `calculate_atomic_mass()`: recursive mass of a compound list
//! - `extract_elements()` family: distinct elements of compounds/formulas/equations
//! - `composition_table()`: prettytable view of a compound's makeup

use crate::parser::{Compound, Equation, Formula};
use crate::periodic::Element;
use prettytable::{Cell, Row, Table};
use std::collections::{HashMap, HashSet};

// multiply-then-round at 1e9 suppresses float noise in summed masses
const ERROR_FACTOR: f64 = 1e9;

/// Per-element atom counts of a compound: each child's tally times the
/// parent's multiplicity, summed across children.
pub fn tally_elements(compound: &Compound) -> HashMap<String, u32> {
    match compound {
        Compound::Atom { element, multi, .. } => {
            HashMap::from([(element.symbol.clone(), *multi)])
        }
        Compound::Group { group, multi, .. } => {
            let mut counts: HashMap<String, u32> = HashMap::new();
            for child in group {
                for (symbol, n) in tally_elements(child) {
                    *counts.entry(symbol).or_insert(0) += n;
                }
            }
            counts.values_mut().for_each(|n| *n *= multi);
            counts
        }
    }
}

fn compound_mass(compound: &Compound) -> f64 {
    match compound {
        Compound::Atom { element, multi, .. } => element.atomic_mass * f64::from(*multi),
        Compound::Group { group, multi, .. } => {
            group.iter().map(compound_mass).sum::<f64>() * f64::from(*multi)
        }
    }
}

/// Total atomic mass of a list of compounds, rounded to 9 decimal digits.
pub fn calculate_atomic_mass(compounds: &[Compound]) -> f64 {
    let total: f64 = compounds.iter().map(compound_mass).sum();
    (total * ERROR_FACTOR).round() / ERROR_FACTOR
}

fn collect_elements(compound: &Compound, out: &mut HashSet<&'static Element>) {
    match compound {
        Compound::Atom { element, .. } => {
            out.insert(*element);
        }
        Compound::Group { group, .. } => {
            for child in group {
                collect_elements(child, out);
            }
        }
    }
}

/// Distinct elements referenced by a list of compounds.
pub fn extract_elements(compounds: &[Compound]) -> HashSet<&'static Element> {
    let mut out = HashSet::new();
    for c in compounds {
        collect_elements(c, &mut out);
    }
    out
}

/// Distinct elements referenced by a formula's terms.
pub fn extract_elements_of_formula(formula: &Formula) -> HashSet<&'static Element> {
    let mut out = HashSet::new();
    for term in &formula.terms {
        collect_elements(&term.compound, &mut out);
    }
    out
}

/// Distinct elements referenced on either side of an equation.
pub fn extract_elements_of_equation(equation: &Equation) -> HashSet<&'static Element> {
    let mut out = extract_elements_of_formula(&equation.left);
    out.extend(extract_elements_of_formula(&equation.right));
    out
}

/// Tabulates a compound's composition: symbol, atom count, mass and mass
/// fraction per element, plus a total row.
pub fn composition_table(compound: &Compound) -> Table {
    let counts = tally_elements(compound);
    let total = calculate_atomic_mass(std::slice::from_ref(compound));

    let mut symbols: Vec<&String> = counts.keys().collect();
    symbols.sort();

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("element"),
        Cell::new("atoms"),
        Cell::new("mass, g/mol"),
        Cell::new("mass %"),
    ]));
    for symbol in symbols {
        let count = counts[symbol];
        let element = crate::periodic::get_element(symbol).expect("tallied symbols exist");
        let mass = element.atomic_mass * f64::from(count);
        table.add_row(Row::new(vec![
            Cell::new(symbol),
            Cell::new(&count.to_string()),
            Cell::new(&format!("{mass:.3}")),
            Cell::new(&format!("{:.2}", 100.0 * mass / total)),
        ]));
    }
    table.add_row(Row::new(vec![
        Cell::new("total"),
        Cell::new(""),
        Cell::new(&format!("{total:.3}")),
        Cell::new("100.00"),
    ]));
    table
}

/// Prints the composition table to stdout.
pub fn pretty_print_composition(compound: &Compound) {
    composition_table(compound).printstd();
}
