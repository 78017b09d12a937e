use std::fmt::Display;

use tcad_syntax::error::{Context, Exception};

use crate::types::Value;

/// A failure reported to the session driver.
#[derive(Debug)]
pub enum Error {
    /// A diagnostic that points into a script.
    Exception(Exception),
    /// Anything else, such as an internal failure or broken I/O.
    Generic(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Pass `{:#}` through so the source excerpt is kept
            Self::Exception(e) if f.alternate() => write!(f, "{e:#}"),
            Self::Exception(e) => write!(f, "{e}"),
            Self::Generic(msg) => write!(f, "ERROR: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<Exception> for Error {
    fn from(e: Exception) -> Self {
        Self::Exception(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}

#[derive(Debug)]
pub enum ErrorMsg {
    // Analysis errors
    NotDefined,
    NotAnIdentifier,
    NotAnExpression,
    NotAParameter,
    DuplicateParam,
    DuplicateField,
    // Runtime errors
    ExpectedNumber,
    ExpectedBool,
    ExpectedRecord,
    ExpectedSymbol,
    ExpectedCountable,
    InvalidCallExpr,
    TooFewArgs,
    TooManyArgs,
    RecursionTooDeep,
    MisresolvedVar,
    // Record errors
    MissingField,
    NoSuchField,
    NotAVariant,
    NoPayload,
}

impl Display for ErrorMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotDefined => "not defined",
            Self::NotAnIdentifier => "= not preceded by identifier",
            Self::NotAnExpression => "not an expression",
            Self::NotAParameter => "not a parameter",
            Self::DuplicateParam => "duplicate parameter",
            Self::DuplicateField => "duplicate field",
            Self::ExpectedNumber => "is not a number",
            Self::ExpectedBool => "is not a boolean",
            Self::ExpectedRecord => "is not a record",
            Self::ExpectedSymbol => "is not a symbol",
            Self::ExpectedCountable => "is not a list, string or record",
            Self::InvalidCallExpr => "is not a function",
            Self::TooFewArgs => "too few arguments",
            Self::TooManyArgs => "too many arguments",
            Self::RecursionTooDeep => "recursion too deep",
            Self::MisresolvedVar => "internal error: misresolved variable",
            Self::MissingField => "does not contain field .",
            Self::NoSuchField => "has no field named ",
            Self::NotAVariant => "is not a variant",
            Self::NoPayload => "has no payload",
        })
    }
}

/// `<value> <msg>`, for example `#foo is not a number`.
pub fn value_error(cx: &Context, val: &Value, msg: ErrorMsg) -> Exception {
    cx.error(format!("{val} {msg}"))
}

/// `<name>: <msg>`, for example `y: not defined`.
pub fn name_error(cx: &Context, name: &str, msg: ErrorMsg) -> Exception {
    cx.error(format!("{name}: {msg}"))
}

/// `<record> <msg><field>`, for example `{a:1} does not contain field .b`.
pub fn field_error(
    cx: &Context,
    record: impl Display,
    msg: ErrorMsg,
    field: impl Display,
) -> Exception {
    cx.error(format!("{record} {msg}{field}"))
}
