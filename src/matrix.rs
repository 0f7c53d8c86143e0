//! # Conservation Matrix and Exact Linear Solver
//!
//! ## Aim
//! Build the atom/charge conservation matrix of an equation and find the
//! minimal positive-integer coefficient vectors in its null space.
//!
//! ## Main Data Structures and Logic
//! - the matrix is a `DMatrix<f64>` holding exact integers throughout: one
//!   row per distinct element plus one net-charge row, one column per term,
//!   left terms positive and right terms negated
//! - Gauss-Jordan elimination keeps rows integral by scaling row pairs with
//!   their pivot GCDs instead of normalizing pivots to 1
//! - the null-space basis is read off the free columns; dimension 1 scales
//!   the single ray to integers, dimension 2 enumerates integer combinations
//!   of the two basis vectors along the Cantor diagonal, dimension >= 3 is
//!   unsupported
//!
//! ## Key Methods
//! - `build_matrix()`: equation -> (matrix, element row labels)
//! - `find_integer_solutions()`: matrix -> all-positive integer vectors

use crate::parser::{Compound, Equation};
use crate::tally::tally_elements;
use log::debug;
use nalgebra::DMatrix;
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while balancing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BalanceError {
    #[error("no solutions: the system is overdetermined or inconsistent")]
    NoSolution,
    #[error("too many independent free variables: unsupported")]
    TooManyFreeVariables,
    #[error("no positive integer solution found within the search bound")]
    NoPositiveIntegerSolution,
}

// trial bound of the dimension-2 integer enumeration
const MAX_ENUMERATION_TRIALS: i64 = 1000;
// scale bound when integerizing a single basis ray
const MAX_INTEGER_SCALE: i64 = 10_000;
const INT_EPS: f64 = 1e-6;

/// Builds the conservation matrix of an equation. Rows are the distinct
/// element symbols in first-seen order (left terms, then right terms) plus
/// one final net-charge row; columns are the left terms followed by the
/// right terms. Cells hold per-unit atom counts (term counts are ignored),
/// negated on the right side. Returns the element row labels alongside.
pub fn build_matrix(equation: &Equation) -> (DMatrix<f64>, Vec<String>) {
    let left_tallies: Vec<_> = equation
        .left
        .terms
        .iter()
        .map(|t| tally_elements(&t.compound))
        .collect();
    let right_tallies: Vec<_> = equation
        .right
        .terms
        .iter()
        .map(|t| tally_elements(&t.compound))
        .collect();

    let mut element_order: Vec<String> = Vec::new();
    for term in equation.left.terms.iter().chain(equation.right.terms.iter()) {
        first_seen_symbols(&term.compound, &mut element_order);
    }

    let num_left = left_tallies.len();
    let num_cols = num_left + right_tallies.len();
    let num_rows = element_order.len() + 1;
    let mut matrix = DMatrix::zeros(num_rows, num_cols);

    for (row, symbol) in element_order.iter().enumerate() {
        for (col, tally) in left_tallies.iter().enumerate() {
            if let Some(&n) = tally.get(symbol) {
                matrix[(row, col)] = f64::from(n);
            }
        }
        for (col, tally) in right_tallies.iter().enumerate() {
            if let Some(&n) = tally.get(symbol) {
                matrix[(row, num_left + col)] = -f64::from(n);
            }
        }
    }

    let charge_row = num_rows - 1;
    for (col, term) in equation.left.terms.iter().enumerate() {
        matrix[(charge_row, col)] = f64::from(term.charge.unwrap_or(0));
    }
    for (col, term) in equation.right.terms.iter().enumerate() {
        matrix[(charge_row, num_left + col)] = -f64::from(term.charge.unwrap_or(0));
    }

    (matrix, element_order)
}

// Element row order is "first seen" while scanning left terms then right
// terms, in document order within each compound.
fn first_seen_symbols(compound: &Compound, order: &mut Vec<String>) {
    match compound {
        Compound::Atom { element, .. } => {
            if !order.iter().any(|s| *s == element.symbol) {
                order.push(element.symbol.clone());
            }
        }
        Compound::Group { group, .. } => {
            for child in group {
                first_seen_symbols(child, order);
            }
        }
    }
}

fn gcd(mut x: i64, mut y: i64) -> i64 {
    x = x.abs();
    y = y.abs();
    while y != 0 {
        (x, y) = (y, x % y);
    }
    x
}

// Divides a row by the GCD of its (integral) entries; keeps values small
// without normalizing the leading coefficient to 1.
fn simplify_row(matrix: &mut DMatrix<f64>, row: usize) {
    let mut g: i64 = 0;
    for col in 0..matrix.ncols() {
        g = gcd(g, matrix[(row, col)].round() as i64);
    }
    if g > 1 {
        for col in 0..matrix.ncols() {
            matrix[(row, col)] /= g as f64;
        }
    }
}

fn leading_col(matrix: &DMatrix<f64>, row: usize) -> Option<usize> {
    (0..matrix.ncols()).find(|&col| matrix[(row, col)] != 0.0)
}

// Row j <- row j * (pivot/g) - row i * (m[j][col]/g), which cancels column
// `col` of row j while keeping every entry an exact integer.
fn eliminate(matrix: &mut DMatrix<f64>, i: usize, j: usize, col: usize) {
    let pivot = matrix[(i, col)];
    let target = matrix[(j, col)];
    if target == 0.0 {
        return;
    }
    let g = gcd(pivot.round() as i64, target.round() as i64) as f64;
    let a = pivot / g;
    let b = target / g;
    for k in 0..matrix.ncols() {
        matrix[(j, k)] = matrix[(j, k)] * a - matrix[(i, k)] * b;
    }
    simplify_row(matrix, j);
}

/// Reduces the matrix to RREF (pivots not normalized to 1, rows GCD-reduced,
/// ascending staircase) and returns the rank.
fn gauss_jordan(matrix: &mut DMatrix<f64>) -> usize {
    let num_rows = matrix.nrows();
    let num_cols = matrix.ncols();

    for row in 0..num_rows {
        simplify_row(matrix, row);
    }

    let mut num_pivots = 0;
    for col in 0..num_cols {
        let mut pivot_row = num_pivots;
        while pivot_row < num_rows && matrix[(pivot_row, col)] == 0.0 {
            pivot_row += 1;
        }
        if pivot_row == num_rows {
            continue;
        }
        matrix.swap_rows(num_pivots, pivot_row);
        for j in (num_pivots + 1)..num_rows {
            eliminate(matrix, num_pivots, j, col);
        }
        num_pivots += 1;
    }

    for i in (0..num_pivots).rev() {
        let Some(pivot_col) = leading_col(matrix, i) else { continue };
        for j in (0..i).rev() {
            eliminate(matrix, i, j, pivot_col);
        }
    }

    num_pivots
}

fn round10(x: f64) -> f64 {
    (x * 1e10).round() / 1e10
}

// Null-space basis: one vector per free column, entries from free-variable
// back-substitution against the pivot rows.
fn null_space_basis(matrix: &DMatrix<f64>, rank: usize) -> Vec<Vec<f64>> {
    let num_cols = matrix.ncols();
    let mut basis = Vec::new();
    for free_col in rank..num_cols {
        let mut v = vec![0.0; num_cols];
        v[free_col] = 1.0;
        for row in 0..rank {
            let Some(pivot_col) = leading_col(matrix, row) else { continue };
            v[pivot_col] = round10(-matrix[(row, free_col)] / matrix[(row, pivot_col)]);
        }
        basis.push(v);
    }
    basis
}

fn is_near_integer(x: f64) -> bool {
    (x - x.round()).abs() < INT_EPS
}

// Smallest positive integer scale that makes every entry integral, then
// GCD-reduced. Errors if any entry comes out non-positive.
fn integerize_ray(v: &[f64]) -> Result<Vec<i64>, BalanceError> {
    let scale = (1..=MAX_INTEGER_SCALE)
        .find(|&k| v.iter().all(|&x| is_near_integer(x * k as f64)))
        .ok_or(BalanceError::NoPositiveIntegerSolution)?;
    let mut ints: Vec<i64> = v.iter().map(|&x| (x * scale as f64).round() as i64).collect();
    let g = ints.iter().fold(0, |acc, &x| gcd(acc, x));
    if g > 1 {
        ints.iter_mut().for_each(|x| *x /= g);
    }
    if ints.iter().any(|&x| x <= 0) {
        return Err(BalanceError::NoPositiveIntegerSolution);
    }
    Ok(ints)
}

// Cantor diagonal decode: trial index -> (a, b).
fn diagonal_pair(i: i64) -> (i64, i64) {
    let t = (((8 * i + 1) as f64).sqrt() - 1.0) / 2.0;
    let t = t.floor() as i64;
    let a = i - t * (t + 1) / 2;
    let b = t - a;
    (a, b)
}

fn enumerate_two_dim(basis: &[Vec<f64>]) -> Result<Vec<Vec<i64>>, BalanceError> {
    let mut solutions = Vec::new();
    let mut seen: HashSet<Vec<i64>> = HashSet::new();

    for i in 0..MAX_ENUMERATION_TRIALS {
        let (a, b) = diagonal_pair(i);
        let candidate: Vec<f64> = basis[0]
            .iter()
            .zip(basis[1].iter())
            .map(|(&x, &y)| round10(a as f64 * x + b as f64 * y))
            .collect();
        if !candidate.iter().all(|&x| x > 0.0 && is_near_integer(x)) {
            continue;
        }
        let mut ints: Vec<i64> = candidate.iter().map(|&x| x.round() as i64).collect();
        let g = ints.iter().fold(0, |acc, &x| gcd(acc, x));
        if g > 1 {
            ints.iter_mut().for_each(|x| *x /= g);
        }
        if seen.insert(ints.clone()) {
            debug!("integer solution at trial {i} (a={a}, b={b}): {ints:?}");
            solutions.push(ints);
        }
    }

    if solutions.is_empty() {
        return Err(BalanceError::NoPositiveIntegerSolution);
    }
    Ok(solutions)
}

/// Finds the minimal positive-integer coefficient vectors satisfying every
/// conservation row. The first vector is the one balancing callers take.
pub fn find_integer_solutions(mut matrix: DMatrix<f64>) -> Result<Vec<Vec<i64>>, BalanceError> {
    let rank = gauss_jordan(&mut matrix);
    let num_cols = matrix.ncols();
    debug!("conservation matrix: rank {rank}, {num_cols} columns");

    if rank >= num_cols {
        return Err(BalanceError::NoSolution);
    }
    let basis = null_space_basis(&matrix, rank);
    match basis.len() {
        1 => Ok(vec![integerize_ray(&basis[0])?]),
        2 => enumerate_two_dim(&basis),
        _ => Err(BalanceError::TooManyFreeVariables),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_equation;

    // double init across tests is fine, only the first one sticks
    fn init_logging() {
        let _ = simplelog::SimpleLogger::init(
            log::LevelFilter::Debug,
            simplelog::Config::default(),
        );
    }

    #[test]
    fn test_build_matrix_layout() {
        let eq = parse_equation("H2 + O2 = H2O").unwrap();
        let (m, elements) = build_matrix(&eq);
        assert_eq!(elements, vec!["H".to_string(), "O".to_string()]);
        // 2 element rows + 1 charge row, 3 term columns
        assert_eq!(m.shape(), (3, 3));
        assert_eq!(m[(0, 0)], 2.0);
        assert_eq!(m[(0, 2)], -2.0);
        assert_eq!(m[(1, 1)], 2.0);
        assert_eq!(m[(1, 2)], -1.0);
        // charge row all zero for a neutral equation
        assert!((0..3).all(|c| m[(2, c)] == 0.0));
    }

    #[test]
    fn test_build_matrix_charge_row() {
        let eq = parse_equation("H+ + OH- = H2O").unwrap();
        let (m, _) = build_matrix(&eq);
        let charge_row = m.nrows() - 1;
        assert_eq!(m[(charge_row, 0)], 1.0);
        assert_eq!(m[(charge_row, 1)], -1.0);
        assert_eq!(m[(charge_row, 2)], 0.0);
    }

    #[test]
    fn test_term_count_ignored_in_matrix() {
        let plain = parse_equation("H2 + O2 = H2O").unwrap();
        let counted = parse_equation("7H2 + 3O2 = 5H2O").unwrap();
        assert_eq!(build_matrix(&plain).0, build_matrix(&counted).0);
    }

    #[test]
    fn test_gauss_jordan_staircase() {
        let mut m = DMatrix::from_row_slice(3, 3, &[0.0, 2.0, -1.0, 2.0, 0.0, -2.0, 0.0, 0.0, 0.0]);
        let rank = gauss_jordan(&mut m);
        assert_eq!(rank, 2);
        // rows permuted so leading columns ascend, rows GCD-reduced
        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(0, 2)], -1.0);
        assert_eq!(m[(1, 1)], 2.0);
        assert_eq!(m[(1, 2)], -1.0);
    }

    #[test]
    fn test_unique_ray_solution() {
        let eq = parse_equation("H2 + O2 = H2O").unwrap();
        let (m, _) = build_matrix(&eq);
        let solutions = find_integer_solutions(m).unwrap();
        assert_eq!(solutions, vec![vec![2, 1, 2]]);
    }

    #[test]
    fn test_charge_constrained_solution() {
        let eq = parse_equation("H+ + OH- = H2O").unwrap();
        let (m, _) = build_matrix(&eq);
        let solutions = find_integer_solutions(m).unwrap();
        assert_eq!(solutions[0], vec![1, 1, 1]);
    }

    #[test]
    fn test_two_free_variables_enumeration() {
        init_logging();
        // two independent reactions share one equation: the null space has
        // dimension 2 and several positive solutions exist
        let eq = parse_equation("CO + CO2 + H2 = CH4 + H2O").unwrap();
        let (m, _) = build_matrix(&eq);
        let solutions = find_integer_solutions(m).unwrap();
        assert_eq!(solutions[0], vec![1, 1, 7, 2, 3]);
        assert!(solutions.len() > 1);
        // every yielded vector is GCD-reduced
        for s in &solutions {
            assert_eq!(s.iter().fold(0, |acc, &x| gcd(acc, x)), 1);
        }
    }

    #[test]
    fn test_three_free_variables_rejected() {
        let eq = parse_equation("H2 + O2 + H2O = H2O + H2 + O2").unwrap();
        let (m, _) = build_matrix(&eq);
        assert_eq!(
            find_integer_solutions(m),
            Err(BalanceError::TooManyFreeVariables)
        );
    }

    #[test]
    fn test_zero_coefficient_ray_rejected() {
        // the only ray zeroes the O2 coefficient, so no all-positive
        // integer solution exists even though the null space is nontrivial
        let eq = parse_equation("H2 = H2 + O2").unwrap();
        let (m, _) = build_matrix(&eq);
        assert_eq!(
            find_integer_solutions(m),
            Err(BalanceError::NoPositiveIntegerSolution)
        );
    }

    #[test]
    fn test_inconsistent_system() {
        // C cannot appear from nowhere: the null space is trivial
        let eq = parse_equation("H2 = CH4").unwrap();
        let (m, _) = build_matrix(&eq);
        assert_eq!(find_integer_solutions(m), Err(BalanceError::NoSolution));
    }
}
