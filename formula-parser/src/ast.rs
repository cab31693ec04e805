//! FILENAME: formula-parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for validation formulas.
//! CONTEXT: The Parser builds this tree from the Lexer's token stream; the
//! evaluator crate walks it against a tabular dataset.
//!
//! SUPPORTED EXPRESSIONS:
//! - Literals: numbers, strings, booleans
//! - Column references: `Submitter`, Risk, `Submit Date`
//! - Unary operations: NOT, unary minus
//! - Binary operations: comparison, arithmetic, string concat (&), AND, OR
//! - Function calls: ISBLANK(x), COUNTIF(Amount, ">5"), ...
//! - IF(cond, then, else), stored distinctly because of its per-row lazy
//!   branch semantics rather than folded into FunctionCall.

/// A parsed formula expression.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// A literal value: number, string, or boolean.
    Literal(Literal),

    /// A column reference, by exact name (backticks already stripped).
    /// Lookups against a `Dataset` are case-sensitive.
    ColumnRef(String),

    /// A unary operation: NOT or unary minus.
    Unary { op: UnaryOperator, operand: Box<Expression> },

    /// A binary operation.
    Binary {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// A function call. `func` is resolved from the name at parse time
    /// (case-insensitively, upper-cased) to avoid re-dispatching on a
    /// string at every evaluation.
    FunctionCall { func: BuiltinFunction, args: Vec<Expression> },

    /// IF(cond, then, else). Kept distinct from FunctionCall because its
    /// per-row result depends on which branch a given row's condition
    /// selects, rather than being a pure function of fully-evaluated args.
    If {
        cond: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
}

/// Literal values that can appear in formulas.
#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
}

/// Binary operators, grouped by the precedence level that produces them.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    Or,
    And,

    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,

    Concat, // &

    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Not,
    Negate,
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOperator::Or => "OR",
            BinaryOperator::And => "AND",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Concat => "&",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Not => write!(f, "NOT"),
            UnaryOperator::Negate => write!(f, "-"),
        }
    }
}

/// Built-in validation-formula functions, resolved from the function name
/// once at parse time so the evaluator dispatches on an enum instead of
/// re-comparing strings on every row.
#[derive(Debug, PartialEq, Clone)]
pub enum BuiltinFunction {
    If,
    And,
    Or,
    Not,

    IsBlank,
    IsNumber,
    IsError,

    Len,
    Left,
    Right,
    Mid,
    Upper,
    Lower,
    Trim,

    Today,
    Date,

    CountIf,

    /// Fallback for an unrecognized name. Not a parse error (the parser is
    /// function-name agnostic) — it fails at evaluation time instead.
    Custom(String),
}

impl BuiltinFunction {
    /// Resolves a function name (case-insensitive) to a `BuiltinFunction`.
    pub fn from_name(name: &str) -> Self {
        match name.to_uppercase().as_str() {
            "IF" => BuiltinFunction::If,
            "AND" => BuiltinFunction::And,
            "OR" => BuiltinFunction::Or,
            "NOT" => BuiltinFunction::Not,

            "ISBLANK" => BuiltinFunction::IsBlank,
            "ISNUMBER" => BuiltinFunction::IsNumber,
            "ISERROR" => BuiltinFunction::IsError,

            "LEN" => BuiltinFunction::Len,
            "LEFT" => BuiltinFunction::Left,
            "RIGHT" => BuiltinFunction::Right,
            "MID" => BuiltinFunction::Mid,
            "UPPER" => BuiltinFunction::Upper,
            "LOWER" => BuiltinFunction::Lower,
            "TRIM" => BuiltinFunction::Trim,

            "TODAY" => BuiltinFunction::Today,
            "DATE" => BuiltinFunction::Date,

            "COUNTIF" => BuiltinFunction::CountIf,

            other => BuiltinFunction::Custom(other.to_string()),
        }
    }

    /// The name as it should be reported in error messages (upper-cased,
    /// `CUSTOM(..)` excepted which reports the original unknown name).
    pub fn display_name(&self) -> String {
        match self {
            BuiltinFunction::Custom(name) => name.clone(),
            other => format!("{other:?}").to_uppercase(),
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{n}"),
            // `""` doubling mirrors the lexer's own escape for an embedded
            // quote (see `lexer::read_string`) so printing a literal never
            // produces text the lexer can't read back.
            Literal::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

/// Renders an expression back to formula text. Every binary/unary node is
/// fully parenthesized and every column reference is backtick-quoted, so
/// the output always re-lexes/re-parses to a structurally equal AST
/// regardless of the original formula's own parenthesization or quoting
/// style — the "modulo parenthesisation" round-trip invariant.
impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{lit}"),
            Expression::ColumnRef(name) => write!(f, "`{}`", name.replace('`', "``")),
            Expression::Unary { op: UnaryOperator::Negate, operand } => write!(f, "(-{operand})"),
            Expression::Unary { op: UnaryOperator::Not, operand } => write!(f, "(NOT {operand})"),
            Expression::Binary { left, op, right } => write!(f, "({left} {op} {right})"),
            Expression::FunctionCall { func, args } => {
                write!(f, "{}(", func.display_name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expression::If { cond, then_branch, else_branch } => {
                write!(f, "IF({cond}, {then_branch}, {else_branch})")
            }
        }
    }
}

/// A reserved-name table of function names and keyword literals that the
/// field extractor (C3) must never report as a column reference, even
/// though they are lexically indistinguishable from an identifier until
/// the `(` or keyword check is applied.
pub const RESERVED_NAMES: &[&str] = &[
    "IF", "AND", "OR", "NOT", "ISBLANK", "ISNUMBER", "ISERROR", "COUNTIF", "SUM", "AVERAGE",
    "MIN", "MAX", "LEN", "LEFT", "RIGHT", "MID", "UPPER", "LOWER", "TRIM", "PROPER", "TEXT",
    "VALUE", "TODAY", "NOW", "DATE", "VLOOKUP", "HLOOKUP", "INDEX", "MATCH", "COUNT", "TRUE",
    "FALSE",
];
