//! Filter/assignment expressions and the evaluator seam.
//!
//! The operator tree stores [`Expression`] values; evaluating them is the job
//! of an [`ExpressionEvaluator`]. Failures come back as `Err` and each
//! operator decides locally what a failure means (drop the row, leave a
//! variable unbound, treat a join candidate as non-matching).

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use bindery_core::{Numeric, PredicateError, Solution, SolutionPredicate, Term, Variable};
use serde::{Deserialize, Serialize};

use crate::error::ExpressionError;

/// Functions whose result differs between calls; such expressions must not be
/// evaluated from several threads in arbitrary order.
const NON_DETERMINISTIC_FUNCTIONS: &[&str] = &["rand", "bnode", "uuid", "struuid", "now"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expr", content = "args", rename_all = "snake_case")]
pub enum Expression {
    Variable(Variable),
    Constant(Term),
    Bound(Variable),
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Compare(CompareOp, Box<Expression>, Box<Expression>),
    Arithmetic(ArithmeticOp, Box<Expression>, Box<Expression>),
    Negate(Box<Expression>),
    SameTerm(Box<Expression>, Box<Expression>),
    If(Box<Expression>, Box<Expression>, Box<Expression>),
    Coalesce(Vec<Expression>),
    Call(String, Vec<Expression>),
}

impl Expression {
    pub fn var(name: &str) -> Self {
        Expression::Variable(Variable::new(name))
    }

    pub fn constant(term: Term) -> Self {
        Expression::Constant(term)
    }

    pub fn bound(name: &str) -> Self {
        Expression::Bound(Variable::new(name))
    }

    pub fn compare(op: CompareOp, lhs: Expression, rhs: Expression) -> Self {
        Expression::Compare(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn arithmetic(op: ArithmeticOp, lhs: Expression, rhs: Expression) -> Self {
        Expression::Arithmetic(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn and(lhs: Expression, rhs: Expression) -> Self {
        Expression::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Expression, rhs: Expression) -> Self {
        Expression::Or(Box::new(lhs), Box::new(rhs))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Expression) -> Self {
        Expression::Not(Box::new(inner))
    }

    pub fn call(name: &str, args: Vec<Expression>) -> Self {
        Expression::Call(name.to_ascii_lowercase(), args)
    }

    fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Variable(_) | Expression::Constant(_) | Expression::Bound(_) => Vec::new(),
            Expression::Not(e) | Expression::Negate(e) => vec![&**e],
            Expression::And(a, b)
            | Expression::Or(a, b)
            | Expression::Compare(_, a, b)
            | Expression::Arithmetic(_, a, b)
            | Expression::SameTerm(a, b) => vec![&**a, &**b],
            Expression::If(c, a, b) => vec![&**c, &**a, &**b],
            Expression::Coalesce(args) | Expression::Call(_, args) => args.iter().collect(),
        }
    }

    /// Distinct variables mentioned, in first-occurrence order.
    pub fn variables(&self) -> Vec<Variable> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<Variable>) {
        match self {
            Expression::Variable(v) | Expression::Bound(v) => {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            _ => {
                for child in self.children() {
                    child.collect_variables(out);
                }
            }
        }
    }

    pub fn can_parallelise(&self) -> bool {
        match self {
            Expression::Call(name, args) => {
                !NON_DETERMINISTIC_FUNCTIONS.contains(&name.as_str())
                    && args.iter().all(Expression::can_parallelise)
            }
            _ => self.children().into_iter().all(Expression::can_parallelise),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Variable(v) => write!(f, "{v}"),
            Expression::Constant(t) => write!(f, "{t}"),
            Expression::Bound(v) => write!(f, "BOUND({v})"),
            Expression::Not(e) => write!(f, "!({e})"),
            Expression::And(a, b) => write!(f, "({a} && {b})"),
            Expression::Or(a, b) => write!(f, "({a} || {b})"),
            Expression::Compare(op, a, b) => {
                let sym = match op {
                    CompareOp::Eq => "=",
                    CompareOp::Ne => "!=",
                    CompareOp::Lt => "<",
                    CompareOp::Le => "<=",
                    CompareOp::Gt => ">",
                    CompareOp::Ge => ">=",
                };
                write!(f, "({a} {sym} {b})")
            }
            Expression::Arithmetic(op, a, b) => {
                let sym = match op {
                    ArithmeticOp::Add => "+",
                    ArithmeticOp::Sub => "-",
                    ArithmeticOp::Mul => "*",
                    ArithmeticOp::Div => "/",
                };
                write!(f, "({a} {sym} {b})")
            }
            Expression::Negate(e) => write!(f, "-({e})"),
            Expression::SameTerm(a, b) => write!(f, "SAMETERM({a}, {b})"),
            Expression::If(c, a, b) => write!(f, "IF({c}, {a}, {b})"),
            Expression::Coalesce(args) => write!(f, "COALESCE({})", join_display(args)),
            Expression::Call(name, args) => {
                write!(f, "{}({})", name.to_uppercase(), join_display(args))
            }
        }
    }
}

fn join_display(args: &[Expression]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Evaluator seam
// ============================================================================

pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &Expression, solution: &Solution) -> Result<Term, ExpressionError>;

    fn effective_boolean_value(
        &self,
        expression: &Expression,
        solution: &Solution,
    ) -> Result<bool, ExpressionError> {
        effective_boolean_value(&self.evaluate(expression, solution)?)
    }
}

/// Effective boolean value of a term.
pub fn effective_boolean_value(term: &Term) -> Result<bool, ExpressionError> {
    if let Some(b) = term.as_boolean() {
        return Ok(b);
    }
    if let Some(n) = term.as_number() {
        return Ok(match n {
            Numeric::Integer(i) => i != 0,
            Numeric::Double(d) => d != 0.0 && !d.is_nan(),
        });
    }
    if let Some(s) = term.as_str() {
        return Ok(!s.is_empty());
    }
    Err(ExpressionError::Type(format!("{term} has no effective boolean value")))
}

/// Adapts an expression into a join/filter predicate over candidate rows.
pub struct ExpressionPredicate<'a> {
    expression: &'a Expression,
    evaluator: &'a dyn ExpressionEvaluator,
}

impl<'a> ExpressionPredicate<'a> {
    pub fn new(expression: &'a Expression, evaluator: &'a dyn ExpressionEvaluator) -> Self {
        Self {
            expression,
            evaluator,
        }
    }
}

impl SolutionPredicate for ExpressionPredicate<'_> {
    fn test(&self, solution: &Solution) -> Result<bool, PredicateError> {
        self.evaluator
            .effective_boolean_value(self.expression, solution)
            .map_err(|err| PredicateError(err.to_string()))
    }

    fn can_parallelise(&self) -> bool {
        self.expression.can_parallelise()
    }
}

// ============================================================================
// Standard evaluator
// ============================================================================

pub type CustomFunction = Arc<dyn Fn(&[Term]) -> Result<Term, ExpressionError> + Send + Sync>;

/// Evaluates the built-in operators plus a small function library; further
/// functions can be registered by name.
#[derive(Clone, Default)]
pub struct StandardEvaluator {
    functions: AHashMap<String, CustomFunction>,
}

impl fmt::Debug for StandardEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("StandardEvaluator")
            .field("functions", &names)
            .finish()
    }
}

impl StandardEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(
        mut self,
        name: &str,
        function: impl Fn(&[Term]) -> Result<Term, ExpressionError> + Send + Sync + 'static,
    ) -> Self {
        self.functions
            .insert(name.to_ascii_lowercase(), Arc::new(function));
        self
    }

    fn ebv(&self, expression: &Expression, solution: &Solution) -> Result<bool, ExpressionError> {
        self.effective_boolean_value(expression, solution)
    }

    fn call(&self, name: &str, args: &[Term]) -> Result<Term, ExpressionError> {
        if let Some(function) = self.functions.get(name) {
            return function(args);
        }
        let unary = |args: &[Term]| -> Result<Term, ExpressionError> {
            match args {
                [only] => Ok(only.clone()),
                _ => Err(ExpressionError::Arity {
                    name: name.to_string(),
                    expected: 1,
                    actual: args.len(),
                }),
            }
        };
        match name {
            "str" => {
                let t = unary(args)?;
                Ok(Term::string(lexical_form(&t)?))
            }
            "isiri" | "isuri" => Ok(Term::boolean(unary(args)?.is_iri())),
            "isblank" => Ok(Term::boolean(unary(args)?.is_blank())),
            "isliteral" => Ok(Term::boolean(unary(args)?.as_literal().is_some())),
            "isnumeric" => Ok(Term::boolean(unary(args)?.as_number().is_some())),
            "lang" => {
                let t = unary(args)?;
                let lit = t
                    .as_literal()
                    .ok_or_else(|| ExpressionError::Type(format!("LANG of non-literal {t}")))?;
                Ok(Term::string(lit.language.as_deref().unwrap_or("")))
            }
            "datatype" => {
                let t = unary(args)?;
                let lit = t
                    .as_literal()
                    .ok_or_else(|| ExpressionError::Type(format!("DATATYPE of non-literal {t}")))?;
                Ok(Term::iri(&*lit.datatype))
            }
            "strlen" => {
                let t = unary(args)?;
                Ok(Term::integer(string_arg(&t)?.chars().count() as i64))
            }
            "ucase" => Ok(Term::string(string_arg(&unary(args)?)?.to_uppercase())),
            "lcase" => Ok(Term::string(string_arg(&unary(args)?)?.to_lowercase())),
            "abs" => match unary(args)?.as_number() {
                Some(Numeric::Integer(i)) => {
                    Ok(Term::integer(i.checked_abs().ok_or(ExpressionError::Overflow)?))
                }
                Some(Numeric::Double(d)) => Ok(Term::double(d.abs())),
                None => Err(ExpressionError::Type("ABS of a non-numeric value".into())),
            },
            "contains" | "strstarts" | "strends" => {
                let [haystack, needle] = args else {
                    return Err(ExpressionError::Arity {
                        name: name.to_string(),
                        expected: 2,
                        actual: args.len(),
                    });
                };
                let (h, n) = (string_arg(haystack)?, string_arg(needle)?);
                Ok(Term::boolean(match name {
                    "contains" => h.contains(n),
                    "strstarts" => h.starts_with(n),
                    _ => h.ends_with(n),
                }))
            }
            "concat" => {
                let mut out = String::new();
                for a in args {
                    out.push_str(string_arg(a)?);
                }
                Ok(Term::string(out))
            }
            _ => Err(ExpressionError::UnknownFunction(name.to_string())),
        }
    }
}

fn string_arg(term: &Term) -> Result<&str, ExpressionError> {
    term.as_str()
        .ok_or_else(|| ExpressionError::Type(format!("{term} is not a string")))
}

fn lexical_form(term: &Term) -> Result<String, ExpressionError> {
    match term {
        Term::Iri { iri } => Ok(iri.to_string()),
        Term::Literal(lit) => Ok(lit.lexical.to_string()),
        Term::BlankNode { .. } => Err(ExpressionError::Type("STR of a blank node".into())),
    }
}

/// Value comparison: numeric when both sides are numbers, lexical for two
/// simple strings, otherwise only (in)equality of identical terms is defined.
fn compare_values(op: CompareOp, a: &Term, b: &Term) -> Result<bool, ExpressionError> {
    let ordering = if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        x.partial_cmp_numeric(y)
    } else if let (Some(x), Some(y)) = (a.as_boolean(), b.as_boolean()) {
        Some(x.cmp(&y))
    } else if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        if language_of(a) != language_of(b) {
            return incomparable(op, a, b);
        }
        Some(x.cmp(y))
    } else {
        return incomparable(op, a, b);
    };
    // NaN compares unequal to everything.
    let Some(ordering) = ordering else {
        return Ok(op == CompareOp::Ne);
    };
    Ok(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    })
}

fn language_of(term: &Term) -> Option<&str> {
    term.as_literal().and_then(|lit| lit.language.as_deref())
}

/// Identical terms are equal; IRIs and blank nodes are unequal to anything
/// else. Ordering or comparing unknown literals is a type error.
fn incomparable(op: CompareOp, a: &Term, b: &Term) -> Result<bool, ExpressionError> {
    match op {
        CompareOp::Eq | CompareOp::Ne if a == b => Ok(op == CompareOp::Eq),
        CompareOp::Eq | CompareOp::Ne if a.as_literal().is_none() || b.as_literal().is_none() => {
            Ok(op == CompareOp::Ne)
        }
        _ => Err(ExpressionError::Type(format!("cannot compare {a} and {b}"))),
    }
}

fn arithmetic(op: ArithmeticOp, a: &Term, b: &Term) -> Result<Term, ExpressionError> {
    let (Some(x), Some(y)) = (a.as_number(), b.as_number()) else {
        return Err(ExpressionError::Type(format!("cannot apply arithmetic to {a} and {b}")));
    };
    let result = match (op, x, y) {
        (ArithmeticOp::Add, Numeric::Integer(i), Numeric::Integer(j)) => {
            Numeric::Integer(i.checked_add(j).ok_or(ExpressionError::Overflow)?)
        }
        (ArithmeticOp::Sub, Numeric::Integer(i), Numeric::Integer(j)) => {
            Numeric::Integer(i.checked_sub(j).ok_or(ExpressionError::Overflow)?)
        }
        (ArithmeticOp::Mul, Numeric::Integer(i), Numeric::Integer(j)) => {
            Numeric::Integer(i.checked_mul(j).ok_or(ExpressionError::Overflow)?)
        }
        (ArithmeticOp::Div, Numeric::Integer(_), Numeric::Integer(0)) => {
            return Err(ExpressionError::DivisionByZero)
        }
        (ArithmeticOp::Add, x, y) => Numeric::Double(x.as_f64() + y.as_f64()),
        (ArithmeticOp::Sub, x, y) => Numeric::Double(x.as_f64() - y.as_f64()),
        (ArithmeticOp::Mul, x, y) => Numeric::Double(x.as_f64() * y.as_f64()),
        (ArithmeticOp::Div, x, y) => Numeric::Double(x.as_f64() / y.as_f64()),
    };
    Ok(result.into_term())
}

impl ExpressionEvaluator for StandardEvaluator {
    fn evaluate(&self, expression: &Expression, solution: &Solution) -> Result<Term, ExpressionError> {
        match expression {
            Expression::Variable(v) => solution
                .get(v)
                .cloned()
                .ok_or_else(|| ExpressionError::Unbound(v.clone())),
            Expression::Constant(t) => Ok(t.clone()),
            Expression::Bound(v) => Ok(Term::boolean(solution.contains(v))),
            Expression::Not(e) => Ok(Term::boolean(!self.ebv(e, solution)?)),
            Expression::And(a, b) => {
                match (self.ebv(a, solution), self.ebv(b, solution)) {
                    (Ok(false), _) | (_, Ok(false)) => Ok(Term::boolean(false)),
                    (Ok(true), Ok(true)) => Ok(Term::boolean(true)),
                    (Err(err), _) | (_, Err(err)) => Err(err),
                }
            }
            Expression::Or(a, b) => {
                match (self.ebv(a, solution), self.ebv(b, solution)) {
                    (Ok(true), _) | (_, Ok(true)) => Ok(Term::boolean(true)),
                    (Ok(false), Ok(false)) => Ok(Term::boolean(false)),
                    (Err(err), _) | (_, Err(err)) => Err(err),
                }
            }
            Expression::Compare(op, a, b) => {
                let x = self.evaluate(a, solution)?;
                let y = self.evaluate(b, solution)?;
                Ok(Term::boolean(compare_values(*op, &x, &y)?))
            }
            Expression::Arithmetic(op, a, b) => {
                let x = self.evaluate(a, solution)?;
                let y = self.evaluate(b, solution)?;
                arithmetic(*op, &x, &y)
            }
            Expression::Negate(e) => match self.evaluate(e, solution)?.as_number() {
                Some(Numeric::Integer(i)) => {
                    Ok(Term::integer(i.checked_neg().ok_or(ExpressionError::Overflow)?))
                }
                Some(Numeric::Double(d)) => Ok(Term::double(-d)),
                None => Err(ExpressionError::Type("cannot negate a non-numeric value".into())),
            },
            Expression::SameTerm(a, b) => {
                let x = self.evaluate(a, solution)?;
                let y = self.evaluate(b, solution)?;
                Ok(Term::boolean(x == y))
            }
            Expression::If(c, a, b) => {
                if self.ebv(c, solution)? {
                    self.evaluate(a, solution)
                } else {
                    self.evaluate(b, solution)
                }
            }
            Expression::Coalesce(args) => args
                .iter()
                .find_map(|a| self.evaluate(a, solution).ok())
                .ok_or_else(|| ExpressionError::Custom("COALESCE found no bound argument".into())),
            Expression::Call(name, args) => {
                let values = args
                    .iter()
                    .map(|a| self.evaluate(a, solution))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(name, &values)
            }
        }
    }
}
