//! Chemical formula parsing and stoichiometric equation balancing.
//!
//! Text like `"TiCl4 + Mg = Ti + MgCl2"` is parsed into a typed tree of
//! compounds, terms, formulas and equations; balancing builds the
//! atom/charge conservation matrix of an equation, reduces it with exact
//! integer-preserving Gauss-Jordan elimination and searches the null space
//! for the minimal all-positive integer coefficient vector.
//!
//! ```rust
//! use kemi::{parse_equation, to_balanced};
//!
//! let eq = parse_equation("H2 + O2 = H2O").unwrap();
//! let balanced = to_balanced(&eq).unwrap();
//! let counts: Vec<u32> = balanced.left.terms.iter().map(|t| t.count).collect();
//! assert_eq!(counts, vec![2, 1]);
//! ```

pub mod balance;
pub mod latex;
pub mod matrix;
pub mod parser;
pub mod periodic;
pub mod tally;

pub use balance::to_balanced;
pub use latex::{format_compound, latex_compound, latex_equation, latex_formula, latex_term};
pub use matrix::{BalanceError, build_matrix, find_integer_solutions};
pub use parser::{
    Compound, Equation, Formula, FormulaTerm, ParseError, ParseResult, parse, parse_compound,
    parse_equation, parse_formula, parse_formula_term,
};
pub use periodic::{Element, OxidationState, Phase, element_list, get_element};
pub use tally::{
    calculate_atomic_mass, composition_table, extract_elements, extract_elements_of_equation,
    extract_elements_of_formula, pretty_print_composition, tally_elements,
};
