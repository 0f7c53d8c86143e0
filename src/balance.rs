//! # Equation Balancer
//!
//! Glue over the conservation matrix and the integer solver: builds the
//! matrix, takes the first yielded coefficient vector and returns a new
//! `Equation` with rewritten term counts. The input is never mutated and a
//! failed balance always surfaces as a typed `BalanceError`.

use crate::matrix::{BalanceError, build_matrix, find_integer_solutions};
use crate::parser::{Equation, Formula, FormulaTerm};
use log::info;

/// Balances an equation, returning a copy with stoichiometric counts set to
/// the minimal positive-integer solution.
pub fn to_balanced(equation: &Equation) -> Result<Equation, BalanceError> {
    let (matrix, elements) = build_matrix(equation);
    let solutions = find_integer_solutions(matrix)?;
    let coefficients = &solutions[0];
    info!(
        "balanced over {} elements: coefficients {:?}",
        elements.len(),
        coefficients
    );

    let num_left = equation.left.terms.len();
    let rewrite = |terms: &[FormulaTerm], offset: usize| Formula {
        terms: terms
            .iter()
            .enumerate()
            .map(|(i, term)| FormulaTerm {
                count: coefficients[offset + i] as u32,
                ..term.clone()
            })
            .collect(),
    };

    Ok(Equation {
        left: rewrite(&equation.left.terms, 0),
        right: rewrite(&equation.right.terms, num_left),
    })
}
