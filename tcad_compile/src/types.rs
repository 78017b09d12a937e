use std::{
    fmt::{Debug, Display},
    rc::Rc,
};

use tcad_syntax::{
    error::{Context, Exception},
    lex::escape,
};

use crate::{
    environment::Frame,
    error::{value_error, ErrorMsg},
    interpret::Interpreter,
    record::{write_key, Record},
    resolve::Lambda,
    symbol::Symbol,
};

#[derive(Clone, Debug)]
pub enum Value {
    /// Marks an absent field or payload. Never produced by evaluating
    /// source text.
    Missing,
    Null,
    Boolean(bool),
    Number(f64),
    Str(Rc<str>),
    Symbol(Symbol),
    List(Rc<Vec<Value>>),
    Record(Rc<dyn Record>),
    Func(Func),
    NativeFunc(NativeFunc),
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => f.write_str("<missing>"),
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(&escape(s)),
            Self::Symbol(s) => {
                f.write_str("#")?;
                write_key(f, s)
            }
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Record(r) => write!(f, "{r}"),
            Self::Func(func) => write!(f, "{func}"),
            Self::NativeFunc(func) => write!(f, "{func}"),
        }
    }
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Structural equality. Records compare field by field regardless of
    /// order, functions compare by identity.
    pub fn equal(&self, other: &Value, cx: &Context) -> Result<bool, Exception> {
        Ok(match (self, other) {
            (Self::Missing, Self::Missing) | (Self::Null, Self::Null) => true,
            (Self::Boolean(m), Self::Boolean(n)) => m == n,
            (Self::Number(m), Self::Number(n)) => m == n,
            (Self::Str(m), Self::Str(n)) => m == n,
            (Self::Symbol(m), Self::Symbol(n)) => m == n,
            (Self::List(m), Self::List(n)) => {
                if m.len() != n.len() {
                    return Ok(false);
                }
                for (x, y) in m.iter().zip(n.iter()) {
                    if !x.equal(y, cx)? {
                        return Ok(false);
                    }
                }
                true
            }
            (Self::Record(m), Self::Record(n)) => m.equal(&**n, cx)?,
            (Self::Func(m), Self::Func(n)) => m == n,
            (Self::NativeFunc(m), Self::NativeFunc(n)) => m == n,
            _ => false,
        })
    }

    pub fn to_num(&self, cx: &Context) -> Result<f64, Exception> {
        match self {
            Self::Number(n) => Ok(*n),
            _ => Err(value_error(cx, self, ErrorMsg::ExpectedNumber)),
        }
    }

    pub fn to_bool(&self, cx: &Context) -> Result<bool, Exception> {
        match self {
            Self::Boolean(b) => Ok(*b),
            _ => Err(value_error(cx, self, ErrorMsg::ExpectedBool)),
        }
    }

    pub fn to_symbol(&self, cx: &Context) -> Result<&Symbol, Exception> {
        match self {
            Self::Symbol(s) => Ok(s),
            _ => Err(value_error(cx, self, ErrorMsg::ExpectedSymbol)),
        }
    }

    pub fn to_record(&self, cx: &Context) -> Result<&Rc<dyn Record>, Exception> {
        match self {
            Self::Record(r) => Ok(r),
            _ => Err(value_error(cx, self, ErrorMsg::ExpectedRecord)),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Self::Symbol(s)
    }
}

pub trait Callable {
    fn name(&self) -> &str;
    fn arity(&self) -> usize;
    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        contexts: Vec<Context>,
    ) -> Result<Value, Exception>;
}

/// A lambda closed over the frame it was evaluated in.
#[derive(Clone, Debug)]
pub struct Func {
    pub lambda: Rc<Lambda>,
    pub env: Option<Rc<Frame>>,
}

impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        let same_env = match (&self.env, &other.env) {
            (Some(m), Some(n)) => Rc::ptr_eq(m, n),
            (None, None) => true,
            _ => false,
        };
        Rc::ptr_eq(&self.lambda, &other.lambda) && same_env
    }
}

impl Display for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<function>")
    }
}

impl Callable for Func {
    fn name(&self) -> &str {
        "function"
    }
    fn arity(&self) -> usize {
        self.lambda.params.len()
    }
    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        _: Vec<Context>,
    ) -> Result<Value, Exception> {
        interpreter.call_func(self, args)
    }
}

/// The body receives one context per argument, in argument order.
pub type NativeBody = fn(&[Value], &[Context]) -> Result<Value, Exception>;

#[derive(Clone)]
pub struct NativeFunc {
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub body: NativeBody,
}

impl PartialEq for NativeFunc {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params
    }
}

impl Debug for NativeFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunc")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

impl Display for NativeFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

impl Callable for NativeFunc {
    fn name(&self) -> &str {
        self.name
    }
    fn arity(&self) -> usize {
        self.params.len()
    }
    fn call(
        &self,
        _: &mut Interpreter,
        args: Vec<Value>,
        contexts: Vec<Context>,
    ) -> Result<Value, Exception> {
        (self.body)(&args, &contexts)
    }
}
