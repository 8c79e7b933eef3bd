//! Evaluation of match criteria against the in-progress extraction result.

use std::cmp::Ordering;

use crate::mdb::{Comparison, ComparisonOperator, MatchCriteria};
use crate::pvlist::ParameterValueList;
use crate::value::Value;

/// Three-valued outcome: a comparison whose referenced parameter has no value
/// yet (or whose operands cannot be compared) is `Undef`, not `Nok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Ok,
    Nok,
    Undef,
}

/// True only for a definite match; `Undef` counts as non-matching.
pub fn matches(criteria: &MatchCriteria, pvlist: &ParameterValueList) -> bool {
    evaluate(criteria, pvlist) == MatchResult::Ok
}

pub fn evaluate(criteria: &MatchCriteria, pvlist: &ParameterValueList) -> MatchResult {
    match criteria {
        MatchCriteria::Comparison(c) => evaluate_comparison(c, pvlist),
        MatchCriteria::ComparisonList(list) => {
            combine_and(list.iter().map(|c| evaluate_comparison(c, pvlist)))
        }
        MatchCriteria::And(subs) => combine_and(subs.iter().map(|s| evaluate(s, pvlist))),
        MatchCriteria::Or(subs) => combine_or(subs.iter().map(|s| evaluate(s, pvlist))),
    }
}

/// Nok dominates, then Undef, then Ok. An empty conjunction is Ok.
fn combine_and(results: impl Iterator<Item = MatchResult>) -> MatchResult {
    let mut r = MatchResult::Ok;
    for x in results {
        match x {
            MatchResult::Nok => return MatchResult::Nok,
            MatchResult::Undef => r = MatchResult::Undef,
            MatchResult::Ok => {}
        }
    }
    r
}

/// Ok dominates, then Undef, then Nok. An empty disjunction is Nok.
fn combine_or(results: impl Iterator<Item = MatchResult>) -> MatchResult {
    let mut r = MatchResult::Nok;
    for x in results {
        match x {
            MatchResult::Ok => return MatchResult::Ok,
            MatchResult::Undef => r = MatchResult::Undef,
            MatchResult::Nok => {}
        }
    }
    r
}

fn evaluate_comparison(c: &Comparison, pvlist: &ParameterValueList) -> MatchResult {
    // The reference value is the most recently extracted instance.
    let pv = match pvlist.last_inserted(c.reference.parameter) {
        Some(pv) => pv,
        None => return MatchResult::Undef,
    };
    let actual = match pv.value(c.reference.use_calibrated) {
        Some(v) => v,
        None => return MatchResult::Undef,
    };
    match compare_values(actual, &c.value) {
        Some(ord) => {
            if apply_operator(c.operator, ord) {
                MatchResult::Ok
            } else {
                MatchResult::Nok
            }
        }
        None => MatchResult::Undef,
    }
}

fn apply_operator(op: ComparisonOperator, ord: Ordering) -> bool {
    match op {
        ComparisonOperator::Eq => ord == Ordering::Equal,
        ComparisonOperator::Ne => ord != Ordering::Equal,
        ComparisonOperator::Lt => ord == Ordering::Less,
        ComparisonOperator::Le => ord != Ordering::Greater,
        ComparisonOperator::Gt => ord == Ordering::Greater,
        ComparisonOperator::Ge => ord != Ordering::Less,
    }
}

/// Orders two values when they are of comparable kinds: numerics against
/// numerics, strings against strings, booleans against booleans.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.as_str().cmp(y.as_str())),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        (Value::Binary(x), Value::Binary(y)) => Some(x.cmp(y)),
        _ => {
            // Integer pairs compare exactly; mixed numerics go through f64.
            if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                return Some(x.cmp(&y));
            }
            let x = a.as_f64()?;
            let y = b.as_f64()?;
            x.partial_cmp(&y)
        }
    }
}
