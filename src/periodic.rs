//! # Element Reference Table
//!
//! ## Aim
//! Static table of per-element physical/chemical attributes (atomic mass,
//! oxidation states, electronegativity, phase) keyed by symbol. The parser
//! looks symbols up here and never mutates the table.
//!
//! ## Main Data Structures and Logic
//! - `Element`: one row of the table, handed out as `&'static Element`
//! - `OxidationState`: one possible ionic state with a `common` flag
//! - the raw data ships as embedded JSON (`periodic.json`) and is
//!   deserialized exactly once into a `LazyLock<Vec<Element>>`
//!
//! ## Key Methods
//! - `get_element()`: symbol -> `Option<&'static Element>`
//! - `element_list()`: the full table, in atomic-number order

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Phase of the element at standard conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Gas,
    Liq,
    Solid,
    Artificial,
}

/// One possible oxidation state of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OxidationState {
    pub ions: i32,
    pub common: bool,
}

/// A chemical element and its display/reference attributes.
#[derive(Debug, Clone, Serialize)]
pub struct Element {
    pub atomic_number: u32,
    pub symbol: String,
    pub name: String,
    pub atomic_mass: f64,
    pub electronegativity: Option<f64>,
    pub phase: Phase,
    pub oxidation_states: Vec<OxidationState>,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.atomic_number == other.atomic_number
    }
}
impl Eq for Element {}

impl std::hash::Hash for Element {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.atomic_number.hash(state);
    }
}

// Row shape of periodic.json; oxidation states come as two plain arrays
// and are zipped into `OxidationState` records on load.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElement {
    atomic_number: u32,
    symbol: String,
    name: String,
    atomic_mass: f64,
    electronegativity: Option<f64>,
    phase: Phase,
    oxidation_states: Vec<i32>,
    common_oxidation_states: Vec<i32>,
}

impl From<RawElement> for Element {
    fn from(raw: RawElement) -> Self {
        let oxidation_states = raw
            .oxidation_states
            .iter()
            .map(|&ions| OxidationState {
                ions,
                common: raw.common_oxidation_states.contains(&ions),
            })
            .collect();
        Element {
            atomic_number: raw.atomic_number,
            symbol: raw.symbol,
            name: raw.name,
            atomic_mass: raw.atomic_mass,
            electronegativity: raw.electronegativity,
            phase: raw.phase,
            oxidation_states,
        }
    }
}

static ELEMENTS: LazyLock<Vec<Element>> = LazyLock::new(|| {
    let raw: Vec<RawElement> = serde_json::from_str(include_str!("periodic.json"))
        .expect("embedded periodic.json is well-formed");
    raw.into_iter().map(Element::from).collect()
});

static BY_SYMBOL: LazyLock<HashMap<&'static str, &'static Element>> = LazyLock::new(|| {
    ELEMENTS.iter().map(|e| (e.symbol.as_str(), e)).collect()
});

/// Look an element up by its symbol, e.g. "Na".
pub fn get_element(symbol: &str) -> Option<&'static Element> {
    BY_SYMBOL.get(symbol).copied()
}

/// All elements in atomic-number order.
pub fn element_list() -> &'static [Element] {
    &ELEMENTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_table_is_complete() {
        let list = element_list();
        assert_eq!(list.len(), 118);
        for (i, e) in list.iter().enumerate() {
            assert_eq!(e.atomic_number as usize, i + 1);
        }
    }

    #[test]
    fn test_lookup_by_symbol() {
        let na = get_element("Na").unwrap();
        assert_eq!(na.name, "Sodium");
        assert_eq!(na.atomic_number, 11);
        assert_relative_eq!(na.atomic_mass, 22.990, epsilon = 1e-3);

        assert!(get_element("Xx").is_none());
        // lookup is case sensitive, "CL" is not a symbol
        assert!(get_element("CL").is_none());
    }

    #[test]
    fn test_oxidation_states_flagging() {
        let fe = get_element("Fe").unwrap();
        assert_eq!(
            fe.oxidation_states,
            vec![
                OxidationState { ions: 2, common: true },
                OxidationState { ions: 3, common: true },
            ]
        );

        let mn = get_element("Mn").unwrap();
        let common: Vec<i32> = mn
            .oxidation_states
            .iter()
            .filter(|o| o.common)
            .map(|o| o.ions)
            .collect();
        assert_eq!(common, vec![2, 4, 7]);
    }

    #[test]
    fn test_element_identity() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(get_element("H").unwrap());
        set.insert(get_element("H").unwrap());
        set.insert(get_element("O").unwrap());
        assert_eq!(set.len(), 2);
    }
}
