//! # Formula and Equation Parser
//!
//! ## Aim
//! Turn chemical formula/equation text into a typed tree. `"2H2O"` becomes a
//! `FormulaTerm` with count 2 over a compound of H(x2) and O; `"H2 + O2 = H2O"`
//! becomes an `Equation` of two formulas.
//!
//! ## Main Data Structures and Logic
//! - `Compound`: recursive sum type, either a single `Atom` or a `Group` of
//!   sub-compounds, each with a repeat multiplicity and optional ionic charge
//! - `FormulaTerm` / `Formula` / `Equation`: the layers above compounds
//! - `ParseResult`: discriminated outcome of the top-level `parse` entry
//! - scanning is left-to-right, greedy longest match; parenthesized groups
//!   take priority over bare element symbols; suffix order is charge before
//!   multiplicity (`(...)2+` is a charge of +2, `(...)2` is a multiplicity)
//!
//! ## Key Methods
//! - `parse()`: progressive fallback equation -> formula -> term, never panics
//! - `parse_equation()` / `parse_formula()` / `parse_formula_term()` /
//!   `parse_compound()`: the strict single-shape entry points
//!
//! ## Interesting Features
//! - A trailing charge on the last unit of a multi-unit body is hoisted to
//!   the wrapping group (so `NaO2ClP)2+`-style input charges the whole ion,
//!   not the last atom); a charge on a non-last unit stays on that unit.
//! - A parenthesized group with both an outer suffix charge and a charge
//!   hoisted out of its body is rejected as ambiguous.

use crate::periodic::{Element, get_element};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;

/// Errors raised while parsing formula/equation text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown element symbol '{0}'")]
    UnknownSymbol(String),
    #[error("multiple charges on one compound: '{0}'")]
    AmbiguousCharge(String),
    #[error("malformed input: {0}")]
    Malformed(String),
}

/// A node of the compound tree: a single element atom or a group of
/// sub-compounds. `multi` is the structural repeat count (the trailing
/// digits), `charge` the parsed ionic suffix, `oxidation` an externally
/// assigned oxidation number (never set by the parser).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Compound {
    Atom {
        element: &'static Element,
        multi: u32,
        charge: Option<i32>,
        oxidation: Option<i32>,
    },
    Group {
        group: Vec<Compound>,
        multi: u32,
        charge: Option<i32>,
        oxidation: Option<i32>,
    },
}

impl Compound {
    pub fn atom(element: &'static Element, multi: u32) -> Self {
        Compound::Atom { element, multi, charge: None, oxidation: None }
    }

    pub fn group(group: Vec<Compound>, multi: u32) -> Self {
        Compound::Group { group, multi, charge: None, oxidation: None }
    }

    pub fn multi(&self) -> u32 {
        match self {
            Compound::Atom { multi, .. } | Compound::Group { multi, .. } => *multi,
        }
    }

    pub fn charge(&self) -> Option<i32> {
        match self {
            Compound::Atom { charge, .. } | Compound::Group { charge, .. } => *charge,
        }
    }

    fn charge_mut(&mut self) -> &mut Option<i32> {
        match self {
            Compound::Atom { charge, .. } | Compound::Group { charge, .. } => charge,
        }
    }

    pub fn oxidation(&self) -> Option<i32> {
        match self {
            Compound::Atom { oxidation, .. } | Compound::Group { oxidation, .. } => *oxidation,
        }
    }
}

/// One `+`-separated piece of a formula: leading stoichiometric count plus
/// the compound body and its net ionic charge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaTerm {
    pub compound: Compound,
    pub count: u32,
    pub charge: Option<i32>,
}

/// An ordered sequence of terms joined by `+`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Formula {
    pub terms: Vec<FormulaTerm>,
}

/// Reactants and products of a chemical equation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Equation {
    pub left: Formula,
    pub right: Formula,
}

/// Discriminated outcome of top-level parsing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParseResult {
    Equation(Equation),
    Formula(Formula),
    Term(FormulaTerm),
}

static SYMBOL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z][a-z]*").unwrap());
static CHARGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d*)([+-])").unwrap());
static MULTI_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+").unwrap());

/// Parses a charge suffix at the start of `rest`. Absent digits mean
/// magnitude 1; the sign comes from the trailing character.
fn scan_charge<'a>(rest: &'a str) -> Result<(Option<i32>, &'a str), ParseError> {
    match CHARGE_RE.captures(rest) {
        Some(cap) => {
            let digits = cap.get(1).unwrap().as_str();
            let magnitude: i32 = if digits.is_empty() {
                1
            } else {
                digits
                    .parse()
                    .map_err(|_| ParseError::Malformed(format!("bad charge magnitude '{digits}'")))?
            };
            let sign = if cap.get(2).unwrap().as_str() == "-" { -1 } else { 1 };
            Ok((Some(sign * magnitude), &rest[cap.get(0).unwrap().end()..]))
        }
        None => Ok((None, rest)),
    }
}

/// Parses a multiplicity suffix at the start of `rest`; defaults to 1.
fn scan_multi<'a>(rest: &'a str) -> Result<(u32, &'a str), ParseError> {
    match MULTI_RE.find(rest) {
        Some(m) => {
            let multi: u32 = m
                .as_str()
                .parse()
                .map_err(|_| ParseError::Malformed(format!("bad multiplicity '{}'", m.as_str())))?;
            if multi == 0 {
                return Err(ParseError::Malformed(format!(
                    "zero multiplicity in '{rest}'"
                )));
            }
            Ok((multi, &rest[m.end()..]))
        }
        None => Ok((1, rest)),
    }
}

/// Finds the byte index of the `)` matching the `(` at position 0.
fn matching_paren(s: &str) -> Result<usize, ParseError> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(ParseError::Malformed(format!("unbalanced parentheses in '{s}'")))
}

/// Scans one compound body into its sequence of units. Each unit keeps any
/// charge suffix on its own node; hoisting happens in the callers that wrap
/// units into groups.
fn parse_body(s: &str) -> Result<Vec<Compound>, ParseError> {
    let mut units = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        if rest.starts_with('(') {
            let close = matching_paren(rest)?;
            let inner = &rest[1..close];
            if inner.is_empty() {
                return Err(ParseError::Malformed(format!("empty group in '{s}'")));
            }
            rest = &rest[close + 1..];
            let (outer_charge, after_charge) = scan_charge(rest)?;
            let (multi, after_multi) = scan_multi(after_charge)?;
            rest = after_multi;

            let mut children = parse_body(inner)?;
            let hoisted = children.last_mut().and_then(|last| last.charge_mut().take());
            let charge = match (outer_charge, hoisted) {
                (Some(_), Some(_)) => {
                    return Err(ParseError::AmbiguousCharge(inner.to_string()));
                }
                (outer, inner_charge) => outer.or(inner_charge),
            };
            units.push(Compound::Group { group: children, multi, charge, oxidation: None });
        } else if let Some(m) = SYMBOL_RE.find(rest) {
            let symbol = m.as_str();
            let element = get_element(symbol)
                .ok_or_else(|| ParseError::UnknownSymbol(symbol.to_string()))?;
            rest = &rest[m.end()..];
            let (charge, after_charge) = scan_charge(rest)?;
            let (multi, after_multi) = scan_multi(after_charge)?;
            rest = after_multi;
            units.push(Compound::Atom { element, multi, charge, oxidation: None });
        } else {
            return Err(ParseError::Malformed(format!(
                "cannot tokenize '{rest}' in '{s}'"
            )));
        }
    }
    Ok(units)
}

/// Parses a compound body (no leading stoichiometric count). A single-unit
/// body is returned as-is; a multi-unit body is wrapped in a group with
/// multiplicity 1, hoisting the last unit's charge to the group node.
pub fn parse_compound(text: &str) -> Result<Compound, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Malformed("empty compound".to_string()));
    }
    let mut units = parse_body(text)?;
    if units.len() == 1 {
        Ok(units.pop().unwrap())
    } else {
        let hoisted = units.last_mut().and_then(|last| last.charge_mut().take());
        Ok(Compound::Group { group: units, multi: 1, charge: hoisted, oxidation: None })
    }
}

/// Parses one formula term: optional leading decimal count, then a compound.
/// The charge at the outermost level of the compound becomes the term charge.
pub fn parse_formula_term(text: &str) -> Result<FormulaTerm, ParseError> {
    let text = text.trim();
    let (count, rest) = match MULTI_RE.find(text) {
        Some(m) => {
            let count: u32 = m.as_str().parse().map_err(|_| {
                ParseError::Malformed(format!("bad term count '{}'", m.as_str()))
            })?;
            if count == 0 {
                return Err(ParseError::Malformed(format!("zero term count in '{text}'")));
            }
            (count, &text[m.end()..])
        }
        None => (1, text),
    };
    let mut compound = parse_compound(rest)?;
    let charge = compound.charge_mut().take();
    Ok(FormulaTerm { compound, count, charge })
}

/// Parses a `" + "`-joined sequence of terms.
pub fn parse_formula(text: &str) -> Result<Formula, ParseError> {
    let terms = text
        .split(" + ")
        .map(parse_formula_term)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Formula { terms })
}

/// Parses an equation: exactly one `=` with a non-empty formula on each side.
pub fn parse_equation(text: &str) -> Result<Equation, ParseError> {
    let sides: Vec<&str> = text.split('=').collect();
    if sides.len() != 2 {
        return Err(ParseError::Malformed(format!(
            "expected exactly one '=' in '{text}'"
        )));
    }
    if sides.iter().any(|s| s.trim().is_empty()) {
        return Err(ParseError::Malformed(format!("empty equation side in '{text}'")));
    }
    Ok(Equation {
        left: parse_formula(sides[0].trim())?,
        right: parse_formula(sides[1].trim())?,
    })
}

/// Top-level entry point: tries equation, then formula (two or more terms),
/// then a single term. Returns `None` when nothing matched; no parse error
/// ever crosses this boundary.
pub fn parse(text: &str) -> Option<ParseResult> {
    if let Ok(eq) = parse_equation(text) {
        return Some(ParseResult::Equation(eq));
    }
    if let Ok(formula) = parse_formula(text) {
        return Some(if formula.terms.len() >= 2 {
            ParseResult::Formula(formula)
        } else {
            ParseResult::Term(formula.terms.into_iter().next()?)
        });
    }
    parse_formula_term(text).ok().map(ParseResult::Term)
}
