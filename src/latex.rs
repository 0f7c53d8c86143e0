//! Deterministic renderers for the parse tree: a plain-text form that
//! round-trips the input notation and a LaTeX form for typesetting.
//! Pure string building, no side effects.

use crate::parser::{Compound, Equation, Formula, FormulaTerm};

fn charge_suffix(charge: Option<i32>) -> String {
    match charge {
        None | Some(0) => String::new(),
        Some(1) => "^+".to_string(),
        Some(-1) => "^-".to_string(),
        Some(n) => format!("^{{{}{}}}", n.abs(), if n > 0 { "+" } else { "-" }),
    }
}

/// Plain-text rendering of a compound, e.g. `Mg(OH)2`.
pub fn format_compound(compound: &Compound) -> String {
    match compound {
        Compound::Atom { element, multi, .. } => {
            if *multi == 1 {
                element.symbol.clone()
            } else {
                format!("{}{}", element.symbol, multi)
            }
        }
        Compound::Group { group, multi, .. } => {
            let inner: String = group.iter().map(format_compound).collect();
            if *multi == 1 {
                inner
            } else {
                format!("({inner}){multi}")
            }
        }
    }
}

/// LaTeX rendering of a compound with subscript multiplicities and
/// superscript charges.
pub fn latex_compound(compound: &Compound) -> String {
    match compound {
        Compound::Atom { element, multi, charge, .. } => {
            let m = if *multi == 1 { String::new() } else { format!("_{{{multi}}}") };
            format!("\\text{{{}}}{}{}", element.symbol, m, charge_suffix(*charge))
        }
        Compound::Group { group, multi, charge, .. } => {
            let inner: Vec<String> = group.iter().map(latex_compound).collect();
            let inner = inner.join(" ");
            if *multi == 1 {
                format!("{}{}", inner, charge_suffix(*charge))
            } else {
                format!("({inner})_{{{multi}}}{}", charge_suffix(*charge))
            }
        }
    }
}

/// LaTeX rendering of a formula term: inline count (elided when 1), the
/// compound body, then the term's net ionic charge.
pub fn latex_term(term: &FormulaTerm) -> String {
    let count = if term.count == 1 { String::new() } else { term.count.to_string() };
    format!(
        "{}{}{}",
        count,
        latex_compound(&term.compound),
        charge_suffix(term.charge)
    )
}

/// LaTeX rendering of a formula, terms joined with `+`.
pub fn latex_formula(formula: &Formula) -> String {
    formula
        .terms
        .iter()
        .map(latex_term)
        .collect::<Vec<_>>()
        .join(" + ")
}

/// LaTeX rendering of a full equation.
pub fn latex_equation(equation: &Equation) -> String {
    format!(
        "{} = {}",
        latex_formula(&equation.left),
        latex_formula(&equation.right)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::to_balanced;
    use crate::parser::{parse_compound, parse_equation, parse_formula_term};

    #[test]
    fn test_format_round_trips_notation() {
        for input in ["H2O", "Mg(OH)2", "Fe2(SO4)3", "C6H8O6"] {
            let c = parse_compound(input).unwrap();
            assert_eq!(format_compound(&c), input);
        }
    }

    #[test]
    fn test_latex_compound() {
        let c = parse_compound("H2O").unwrap();
        assert_eq!(latex_compound(&c), "\\text{H}_{2} \\text{O}");

        let c = parse_compound("Mg(OH)2").unwrap();
        assert_eq!(
            latex_compound(&c),
            "\\text{Mg} (\\text{O} \\text{H})_{2}"
        );
    }

    #[test]
    fn test_latex_term_with_count_and_charge() {
        let t = parse_formula_term("2H2O").unwrap();
        assert_eq!(latex_term(&t), "2\\text{H}_{2} \\text{O}");

        let t = parse_formula_term("H+").unwrap();
        assert_eq!(latex_term(&t), "\\text{H}^+");

        let t = parse_formula_term("Cu2+").unwrap();
        assert_eq!(latex_term(&t), "\\text{Cu}^{2+}");
    }

    #[test]
    fn test_latex_balanced_equation() {
        let eq = parse_equation("H2 + O2 = H2O").unwrap();
        let balanced = to_balanced(&eq).unwrap();
        assert_eq!(
            latex_equation(&balanced),
            "2\\text{H}_{2} + \\text{O}_{2} = 2\\text{H}_{2} \\text{O}"
        );
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let eq = parse_equation("Fe2(SO4)3 + KOH = K2SO4 + Fe(OH)3").unwrap();
        assert_eq!(latex_equation(&eq), latex_equation(&eq));
    }
}
