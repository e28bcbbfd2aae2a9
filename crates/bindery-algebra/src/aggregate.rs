//! Aggregate functions for GROUP BY.

use std::cmp::Ordering;
use std::fmt;

use ahash::AHashSet;
use bindery_core::{compare_for_ordering, Numeric, Solution, Term};
use serde::{Deserialize, Serialize};

use crate::error::ExpressionError;
use crate::expression::{Expression, ExpressionEvaluator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Sample,
    GroupConcat { separator: String },
}

/// `FUNCTION([DISTINCT] expression)`; `expression: None` is `COUNT(*)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub function: AggregateFunction,
    #[serde(default)]
    pub expression: Option<Expression>,
    #[serde(default)]
    pub distinct: bool,
}

impl Aggregate {
    pub fn count_all() -> Self {
        Self {
            function: AggregateFunction::Count,
            expression: None,
            distinct: false,
        }
    }

    pub fn new(function: AggregateFunction, expression: Expression) -> Self {
        Self {
            function,
            expression: Some(expression),
            distinct: false,
        }
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn can_parallelise(&self) -> bool {
        self.expression
            .as_ref()
            .map_or(true, Expression::can_parallelise)
    }

    /// Aggregate value over one group.
    ///
    /// Rows whose expression errors are skipped, except for SUM/AVG where a
    /// non-numeric value makes the whole aggregate an error.
    pub fn apply<'a>(
        &self,
        rows: impl IntoIterator<Item = &'a Solution>,
        evaluator: &dyn ExpressionEvaluator,
    ) -> Result<Term, ExpressionError> {
        let Some(expression) = &self.expression else {
            let rows: Vec<&Solution> = rows.into_iter().collect();
            let count = if self.distinct {
                rows.iter().collect::<AHashSet<_>>().len()
            } else {
                rows.len()
            };
            return Ok(Term::integer(count as i64));
        };

        let mut values: Vec<Term> = rows
            .into_iter()
            .filter_map(|row| evaluator.evaluate(expression, row).ok())
            .collect();
        if self.distinct {
            let mut seen = AHashSet::new();
            values.retain(|v| seen.insert(v.clone()));
        }

        match &self.function {
            AggregateFunction::Count => Ok(Term::integer(values.len() as i64)),
            AggregateFunction::Sum => sum(&values).map(Numeric::into_term),
            AggregateFunction::Avg => {
                if values.is_empty() {
                    return Ok(Term::integer(0));
                }
                let total = sum(&values)?.as_f64();
                Ok(Term::double(total / values.len() as f64))
            }
            AggregateFunction::Min => extreme(values, Ordering::Less),
            AggregateFunction::Max => extreme(values, Ordering::Greater),
            AggregateFunction::Sample => values.into_iter().next().ok_or(ExpressionError::EmptyGroup),
            AggregateFunction::GroupConcat { separator } => {
                let parts = values
                    .iter()
                    .map(|v| {
                        v.as_literal()
                            .map(|lit| lit.lexical.to_string())
                            .ok_or_else(|| ExpressionError::Type(format!("GROUP_CONCAT of {v}")))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Term::string(parts.join(separator)))
            }
        }
    }
}

fn sum(values: &[Term]) -> Result<Numeric, ExpressionError> {
    let mut total = Numeric::Integer(0);
    for value in values {
        let n = value
            .as_number()
            .ok_or_else(|| ExpressionError::Type(format!("cannot sum {value}")))?;
        total = match (total, n) {
            (Numeric::Integer(a), Numeric::Integer(b)) => {
                Numeric::Integer(a.checked_add(b).ok_or(ExpressionError::Overflow)?)
            }
            (a, b) => Numeric::Double(a.as_f64() + b.as_f64()),
        };
    }
    Ok(total)
}

fn extreme(values: Vec<Term>, keep: Ordering) -> Result<Term, ExpressionError> {
    values
        .into_iter()
        .reduce(|best, v| {
            if compare_for_ordering(Some(&v), Some(&best)) == keep {
                v
            } else {
                best
            }
        })
        .ok_or(ExpressionError::EmptyGroup)
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match &self.function {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Sample => "SAMPLE",
            AggregateFunction::GroupConcat { .. } => "GROUP_CONCAT",
        };
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        match &self.expression {
            Some(e) => write!(f, "{name}({distinct}{e})"),
            None => write!(f, "{name}({distinct}*)"),
        }
    }
}
