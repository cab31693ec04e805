//! FILENAME: formula-engine/src/evaluator.rs
//! PURPOSE: Executes a parsed AST against a `Dataset`, producing a value
//! column and a list of non-fatal warnings.
//! CONTEXT: Column-vectorised: every sub-expression evaluates to a full
//! `Vec<Value>` the length of the dataset, rather than being re-evaluated
//! row by row. Observable results are identical to a row-at-a-time
//! implementation; this form is preferred for performance and matches the
//! dataset's own columnar shape.
//!
//! Sandboxing: the only host capability exposed to a formula is the
//! function set matched in `call_function` below. No dynamic dispatch to
//! arbitrary host code, no I/O, no environment access. Recursion/nesting
//! depth is capped (`MAX_DEPTH`) to bound stack usage on adversarial input.

use chrono::{Datelike, Local, NaiveDate};

use formula_parser::{BinaryOperator, BuiltinFunction, Expression, Literal, UnaryOperator};

use crate::dataset::Dataset;
use crate::error::EvalError;
use crate::value::Value;
use crate::warnings::DataWarning;

/// Maximum AST nesting depth a formula may reach during evaluation.
pub const MAX_DEPTH: usize = 64;

/// The outcome of evaluating a formula against a dataset.
#[derive(Debug, Clone)]
pub struct EvalOutcome {
    pub values: Vec<Value>,
    pub warnings: Vec<DataWarning>,
}

/// Evaluates `expr` against `dataset`, returning a full-length value column
/// plus any non-fatal warnings collected along the way.
pub fn evaluate(expr: &Expression, dataset: &Dataset) -> Result<EvalOutcome, EvalError> {
    let mut ctx = EvalContext {
        dataset,
        warnings: Vec::new(),
        today: Local::now().date_naive(),
    };
    let values = ctx.eval(expr, 0)?;
    Ok(EvalOutcome { values, warnings: ctx.warnings })
}

/// As `evaluate`, but additionally coerces every position to Boolean for
/// use as a validation outcome. Positions that don't coerce become
/// `Value::Missing` and record a `NonBooleanResult` warning — per the
/// evaluator's top-level contract when the result feeds a rule.
pub fn evaluate_as_boolean(expr: &Expression, dataset: &Dataset) -> Result<(Vec<Value>, Vec<DataWarning>), EvalError> {
    let outcome = evaluate(expr, dataset)?;
    let mut warnings = outcome.warnings;
    let values = outcome
        .values
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Value::Boolean(_) => v,
            Value::Missing => Value::Missing,
            other => match other.as_boolean() {
                Some(b) => Value::Boolean(b),
                None => {
                    warnings.push(DataWarning::NonBooleanResult { row });
                    Value::Missing
                }
            },
        })
        .collect();
    Ok((values, warnings))
}

struct EvalContext<'a> {
    dataset: &'a Dataset,
    warnings: Vec<DataWarning>,
    today: NaiveDate,
}

impl<'a> EvalContext<'a> {
    fn row_count(&self) -> usize {
        self.dataset.row_count()
    }

    fn eval(&mut self, expr: &Expression, depth: usize) -> Result<Vec<Value>, EvalError> {
        if depth > MAX_DEPTH {
            return Err(EvalError::RecursionLimitExceeded { limit: MAX_DEPTH });
        }

        match expr {
            Expression::Literal(lit) => Ok(self.broadcast(literal_value(lit))),
            Expression::ColumnRef(name) => self.lookup_column(name),
            Expression::Unary { op, operand } => self.eval_unary(*op, operand, depth),
            Expression::Binary { left, op, right } => self.eval_binary(left, *op, right, depth),
            Expression::FunctionCall { func, args } => self.eval_function(func, args, depth),
            Expression::If { cond, then_branch, else_branch } => self.eval_if(cond, then_branch, else_branch, depth),
        }
    }

    fn broadcast(&self, value: Value) -> Vec<Value> {
        vec![value; self.row_count()]
    }

    fn lookup_column(&mut self, name: &str) -> Result<Vec<Value>, EvalError> {
        match self.dataset.column(name) {
            Some(col) => Ok(col.values.clone()),
            None => Err(EvalError::UnknownColumn(name.to_string())),
        }
    }

    fn eval_unary(&mut self, op: UnaryOperator, operand: &Expression, depth: usize) -> Result<Vec<Value>, EvalError> {
        let operand_values = self.eval(operand, depth + 1)?;

        let values = operand_values
            .into_iter()
            .enumerate()
            .map(|(row, v)| match op {
                UnaryOperator::Negate => match v.as_number() {
                    Some(n) => Value::Number(-n),
                    None => {
                        log::debug!("row {row}: could not coerce operand to a number for unary minus");
                        self.warnings.push(DataWarning::CoercionFailure { row, context: "unary minus".to_string() });
                        Value::Missing
                    }
                },
                UnaryOperator::Not => match v.as_boolean() {
                    Some(b) => Value::Boolean(!b),
                    None if v.is_missing() => Value::Missing,
                    None => {
                        log::debug!("row {row}: could not coerce operand to a boolean for NOT");
                        self.warnings.push(DataWarning::CoercionFailure { row, context: "NOT".to_string() });
                        Value::Missing
                    }
                },
            })
            .collect();

        Ok(values)
    }

    fn eval_binary(
        &mut self,
        left: &Expression,
        op: BinaryOperator,
        right: &Expression,
        depth: usize,
    ) -> Result<Vec<Value>, EvalError> {
        if is_comparison(op) && matches!(left, Expression::Binary { op: inner_op, .. } if is_comparison(*inner_op)) {
            self.warnings.push(DataWarning::NonChainingComparison { formula: left.to_string() });
        }

        let left_values = self.eval(left, depth + 1)?;
        let right_values = self.eval(right, depth + 1)?;

        let values = left_values
            .into_iter()
            .zip(right_values)
            .enumerate()
            .map(|(row, (l, r))| self.apply_binary(op, l, r, row))
            .collect();

        Ok(values)
    }

    fn apply_binary(&mut self, op: BinaryOperator, l: Value, r: Value, row: usize) -> Value {
        use BinaryOperator::*;

        match op {
            Or => three_valued_or(l.as_boolean(), r.as_boolean()),
            And => three_valued_and(l.as_boolean(), r.as_boolean()),

            Equal | NotEqual | LessThan | GreaterThan | LessEqual | GreaterEqual => {
                self.apply_comparison(op, l, r)
            }

            Concat => Value::Text(format!("{}{}", l.as_text(), r.as_text())),

            // Date +/- a day count, e.g. `TODAY() - 30`. Checked before the
            // generic numeric path because Value::as_number() never coerces
            // a Date (so the generic path would otherwise treat this as a
            // coercion failure).
            Add | Subtract if matches!(l, Value::Date(_)) => {
                let Some(date) = l.as_date() else { unreachable!() };
                match r.as_number() {
                    Some(days) => {
                        let delta = chrono::Duration::days(days as i64);
                        let shifted = if op == Add { date + delta } else { date - delta };
                        Value::Date(shifted)
                    }
                    None => {
                        log::debug!("row {row}: could not coerce right operand to a day count for date arithmetic '{op}'");
                        self.warnings.push(DataWarning::CoercionFailure {
                            row,
                            context: format!("date arithmetic '{op}'"),
                        });
                        Value::Missing
                    }
                }
            }

            Add | Subtract | Multiply | Divide => {
                let (a, b) = match (l.as_number(), r.as_number()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => {
                        log::debug!("row {row}: could not coerce both operands to numbers for arithmetic '{op}'");
                        self.warnings.push(DataWarning::CoercionFailure {
                            row,
                            context: format!("arithmetic '{op}'"),
                        });
                        return Value::Missing;
                    }
                };
                match op {
                    Add => Value::Number(a + b),
                    Subtract => Value::Number(a - b),
                    Multiply => Value::Number(a * b),
                    Divide => {
                        if b == 0.0 {
                            log::debug!("row {row}: division by zero");
                            self.warnings
                                .push(DataWarning::CoercionFailure { row, context: "division by zero".to_string() });
                            Value::Missing
                        } else {
                            Value::Number(a / b)
                        }
                    }
                    _ => unreachable!(),
                }
            }
        }
    }

    fn apply_comparison(&mut self, op: BinaryOperator, l: Value, r: Value) -> Value {
        use BinaryOperator::*;

        if l.is_missing() || r.is_missing() {
            return Value::Missing;
        }

        let ordering = if let (Some(a), Some(b)) = (l.as_number(), r.as_number()) {
            a.partial_cmp(&b)
        } else if let (Some(a), Some(b)) = (l.as_date(), r.as_date()) {
            Some(a.cmp(&b))
        } else {
            Some(l.as_text().cmp(&r.as_text()))
        };

        let Some(ordering) = ordering else {
            return Value::Missing;
        };

        let result = match op {
            Equal => ordering.is_eq(),
            NotEqual => !ordering.is_eq(),
            LessThan => ordering.is_lt(),
            GreaterThan => ordering.is_gt(),
            LessEqual => ordering.is_le(),
            GreaterEqual => ordering.is_ge(),
            _ => unreachable!(),
        };

        Value::Boolean(result)
    }

    fn eval_if(
        &mut self,
        cond: &Expression,
        then_branch: &Expression,
        else_branch: &Expression,
        depth: usize,
    ) -> Result<Vec<Value>, EvalError> {
        // No side effects exist in this formula dialect, so both branches
        // can be evaluated eagerly without changing observable behaviour.
        let cond_values = self.eval(cond, depth + 1)?;
        let then_values = self.eval(then_branch, depth + 1)?;
        let else_values = self.eval(else_branch, depth + 1)?;

        let values = cond_values
            .into_iter()
            .zip(then_values)
            .zip(else_values)
            .map(|((c, t), e)| match c.as_boolean() {
                Some(true) => t,
                Some(false) => e,
                None => Value::Missing,
            })
            .collect();

        Ok(values)
    }

    fn eval_function(&mut self, func: &BuiltinFunction, args: &[Expression], depth: usize) -> Result<Vec<Value>, EvalError> {
        match func {
            BuiltinFunction::If => unreachable!("IF is parsed as Expression::If"),
            BuiltinFunction::Custom(name) => Err(EvalError::UnknownFunction(name.clone())),

            BuiltinFunction::Not => self.call_unary_fn(args, depth, "NOT", |v| match v.as_boolean() {
                Some(b) => Value::Boolean(!b),
                None => Value::Missing,
            }),

            BuiltinFunction::And => self.call_variadic_logical(args, depth, true),
            BuiltinFunction::Or => self.call_variadic_logical(args, depth, false),

            BuiltinFunction::IsBlank => self.call_unary_fn(args, depth, "ISBLANK", |v| Value::Boolean(v.is_blank())),
            BuiltinFunction::IsNumber => {
                self.call_unary_fn(args, depth, "ISNUMBER", |v| Value::Boolean(v.is_number_like()))
            }
            BuiltinFunction::IsError => {
                self.call_unary_fn(args, depth, "ISERROR", |v| Value::Boolean(v.is_missing()))
            }

            BuiltinFunction::Len => self.call_unary_fn(args, depth, "LEN", |v| Value::Number(v.as_text().chars().count() as f64)),
            BuiltinFunction::Upper => self.call_unary_fn(args, depth, "UPPER", |v| Value::Text(v.as_text().to_uppercase())),
            BuiltinFunction::Lower => self.call_unary_fn(args, depth, "LOWER", |v| Value::Text(v.as_text().to_lowercase())),
            BuiltinFunction::Trim => self.call_unary_fn(args, depth, "TRIM", |v| Value::Text(v.as_text().trim().to_string())),

            BuiltinFunction::Left => self.call_text_and_count(args, depth, "LEFT", |text, n| {
                text.chars().take(n).collect::<String>()
            }),
            BuiltinFunction::Right => self.call_text_and_count(args, depth, "RIGHT", |text, n| {
                let len = text.chars().count();
                let skip = len.saturating_sub(n);
                text.chars().skip(skip).collect::<String>()
            }),
            BuiltinFunction::Mid => self.call_mid(args, depth),

            BuiltinFunction::Today => {
                self.expect_arity("TODAY", args, 0)?;
                Ok(self.broadcast(Value::Date(self.today)))
            }
            BuiltinFunction::Date => self.call_date(args, depth),

            BuiltinFunction::CountIf => self.call_countif(args, depth),
        }
    }

    fn expect_arity(&self, name: &str, args: &[Expression], expected: usize) -> Result<(), EvalError> {
        if args.len() != expected {
            return Err(EvalError::WrongArgumentCount {
                func: name.to_string(),
                expected: expected.to_string(),
                found: args.len(),
            });
        }
        Ok(())
    }

    fn call_unary_fn(
        &mut self,
        args: &[Expression],
        depth: usize,
        name: &str,
        f: impl Fn(&Value) -> Value,
    ) -> Result<Vec<Value>, EvalError> {
        self.expect_arity(name, args, 1)?;
        let values = self.eval(&args[0], depth + 1)?;
        Ok(values.iter().map(f).collect())
    }

    fn call_variadic_logical(&mut self, args: &[Expression], depth: usize, is_and: bool) -> Result<Vec<Value>, EvalError> {
        if args.is_empty() {
            return Err(EvalError::WrongArgumentCount {
                func: if is_and { "AND".to_string() } else { "OR".to_string() },
                expected: "at least 1".to_string(),
                found: 0,
            });
        }

        let mut columns = Vec::with_capacity(args.len());
        for arg in args {
            columns.push(self.eval(arg, depth + 1)?);
        }

        let row_count = self.row_count();
        let mut result = Vec::with_capacity(row_count);
        for row in 0..row_count {
            let mut acc: Option<bool> = Some(is_and);
            for col in &columns {
                let operand = col[row].as_boolean();
                acc = if is_and {
                    three_valued_and(acc, operand).as_boolean()
                } else {
                    three_valued_or(acc, operand).as_boolean()
                };
            }
            result.push(match acc {
                Some(b) => Value::Boolean(b),
                None => Value::Missing,
            });
        }
        Ok(result)
    }

    fn call_text_and_count(
        &mut self,
        args: &[Expression],
        depth: usize,
        name: &str,
        f: impl Fn(&str, usize) -> String,
    ) -> Result<Vec<Value>, EvalError> {
        self.expect_arity(name, args, 2)?;
        let text_values = self.eval(&args[0], depth + 1)?;
        let count_values = self.eval(&args[1], depth + 1)?;

        let values = text_values
            .iter()
            .zip(count_values.iter())
            .enumerate()
            .map(|(row, (t, c))| match c.as_number() {
                Some(n) if n >= 0.0 => Value::Text(f(&t.as_text(), n as usize)),
                _ => {
                    log::debug!("row {row}: could not coerce {name} count argument to a non-negative number");
                    self.warnings
                        .push(DataWarning::CoercionFailure { row, context: format!("{name} count argument") });
                    Value::Missing
                }
            })
            .collect();

        Ok(values)
    }

    fn call_mid(&mut self, args: &[Expression], depth: usize) -> Result<Vec<Value>, EvalError> {
        self.expect_arity("MID", args, 3)?;
        let text_values = self.eval(&args[0], depth + 1)?;
        let start_values = self.eval(&args[1], depth + 1)?;
        let len_values = self.eval(&args[2], depth + 1)?;

        let row_count = self.row_count();
        let mut result = Vec::with_capacity(row_count);
        for row in 0..row_count {
            let start = start_values[row].as_number();
            let len = len_values[row].as_number();
            match (start, len) {
                (Some(start), Some(len)) if start >= 1.0 && len >= 0.0 => {
                    let text = text_values[row].as_text();
                    let skip = (start as usize).saturating_sub(1);
                    let extracted: String = text.chars().skip(skip).take(len as usize).collect();
                    result.push(Value::Text(extracted));
                }
                _ => {
                    log::debug!("row {row}: could not coerce MID arguments (start must be >= 1, length >= 0)");
                    self.warnings.push(DataWarning::CoercionFailure { row, context: "MID arguments".to_string() });
                    result.push(Value::Missing);
                }
            }
        }
        Ok(result)
    }

    fn call_date(&mut self, args: &[Expression], depth: usize) -> Result<Vec<Value>, EvalError> {
        self.expect_arity("DATE", args, 3)?;
        let year_values = self.eval(&args[0], depth + 1)?;
        let month_values = self.eval(&args[1], depth + 1)?;
        let day_values = self.eval(&args[2], depth + 1)?;

        let row_count = self.row_count();
        let mut result = Vec::with_capacity(row_count);
        for row in 0..row_count {
            let y = year_values[row].as_number();
            let m = month_values[row].as_number();
            let d = day_values[row].as_number();
            match (y, m, d) {
                (Some(y), Some(m), Some(d)) => {
                    match NaiveDate::from_ymd_opt(y as i32, m as u32, d as u32) {
                        Some(date) => result.push(Value::Date(date)),
                        None => {
                            log::debug!("row {row}: DATE() arguments do not form a valid calendar date");
                            self.warnings
                                .push(DataWarning::CoercionFailure { row, context: "DATE() out-of-range arguments".to_string() });
                            result.push(Value::Missing);
                        }
                    }
                }
                _ => {
                    log::debug!("row {row}: could not coerce DATE() arguments to numbers");
                    self.warnings.push(DataWarning::CoercionFailure { row, context: "DATE() arguments".to_string() });
                    result.push(Value::Missing);
                }
            }
        }
        Ok(result)
    }

    fn call_countif(&mut self, args: &[Expression], depth: usize) -> Result<Vec<Value>, EvalError> {
        self.expect_arity("COUNTIF", args, 2)?;

        let column_name = match &args[0] {
            Expression::ColumnRef(name) => name.clone(),
            _ => {
                return Err(EvalError::InvalidCriterion(
                    "COUNTIF's first argument must be a bare column reference".to_string(),
                ))
            }
        };

        let target_values = self.lookup_column(&column_name)?;
        let criterion_values = self.eval(&args[1], depth + 1)?;

        let row_count = self.row_count();
        let mut result = Vec::with_capacity(row_count);
        for criterion in criterion_values.iter().take(row_count) {
            let count = count_matching(&target_values, criterion)?;
            result.push(Value::Number(count as f64));
        }
        Ok(result)
    }
}

/// Counts the rows in `column` matching `criterion`: a comparison operator
/// prefix (`>`, `>=`, `<`, `<=`, `<>`, `=`) followed by a value, or a bare
/// value meaning equality.
fn count_matching(column: &[Value], criterion: &Value) -> Result<usize, EvalError> {
    let criterion_text = criterion.as_text();
    let (op, operand_text): (&str, &str) = if let Some(rest) = criterion_text.strip_prefix(">=") {
        (">=", rest)
    } else if let Some(rest) = criterion_text.strip_prefix("<=") {
        ("<=", rest)
    } else if let Some(rest) = criterion_text.strip_prefix("<>") {
        ("<>", rest)
    } else if let Some(rest) = criterion_text.strip_prefix('>') {
        (">", rest)
    } else if let Some(rest) = criterion_text.strip_prefix('<') {
        ("<", rest)
    } else if let Some(rest) = criterion_text.strip_prefix('=') {
        ("=", rest)
    } else {
        ("=", criterion_text.as_str())
    };

    let operand_number: Option<f64> = operand_text.trim().parse().ok();

    let mut count = 0;
    for value in column {
        let matches = match (op, operand_number) {
            (op, Some(num)) if value.as_number().is_some() => {
                let v = value.as_number().unwrap();
                match op {
                    ">" => v > num,
                    ">=" => v >= num,
                    "<" => v < num,
                    "<=" => v <= num,
                    "<>" => v != num,
                    "=" => v == num,
                    _ => return Err(EvalError::InvalidCriterion(criterion_text.clone())),
                }
            }
            ("=", _) => value.as_text() == operand_text,
            ("<>", _) => value.as_text() != operand_text,
            _ => false,
        };
        if matches {
            count += 1;
        }
    }

    Ok(count)
}

fn is_comparison(op: BinaryOperator) -> bool {
    matches!(
        op,
        BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::LessThan
            | BinaryOperator::GreaterThan
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterEqual
    )
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::Text(s.clone()),
        Literal::Boolean(b) => Value::Boolean(*b),
    }
}

/// Three-valued AND: `missing AND false = false`, otherwise missing
/// propagates unless both operands are known.
fn three_valued_and(l: Option<bool>, r: Option<bool>) -> Value {
    match (l, r) {
        (Some(false), _) | (_, Some(false)) => Value::Boolean(false),
        (Some(a), Some(b)) => Value::Boolean(a && b),
        _ => Value::Missing,
    }
}

/// Three-valued OR: `missing OR true = true`, otherwise missing propagates
/// unless both operands are known.
fn three_valued_or(l: Option<bool>, r: Option<bool>) -> Value {
    match (l, r) {
        (Some(true), _) | (_, Some(true)) => Value::Boolean(true),
        (Some(a), Some(b)) => Value::Boolean(a || b),
        _ => Value::Missing,
    }
}

