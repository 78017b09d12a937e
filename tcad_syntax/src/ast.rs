use std::fmt::Display;

use crate::{location::Location, token::TokenKind};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Bang,
    Minus,
}

impl UnaryOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::BANG => Self::Bang,
            TokenKind::MINUS => Self::Minus,
            _ => return None,
        };
        Some(op)
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Bang => "!",
            Self::Minus => "-",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Slash,
    Star,
    Plus,
    Minus,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    BangEqual,
    EqualEqual,
    And,
    Or,
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Slash => "/",
            Self::Star => "*",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::BangEqual => "!=",
            Self::EqualEqual => "==",
            Self::And => "&&",
            Self::Or => "||",
        })
    }
}

impl BinOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::SLASH => Self::Slash,
            TokenKind::STAR => Self::Star,
            TokenKind::PLUS => Self::Plus,
            TokenKind::MINUS => Self::Minus,
            TokenKind::GREATER => Self::Greater,
            TokenKind::GREATER_EQUAL => Self::GreaterEqual,
            TokenKind::LESS => Self::Less,
            TokenKind::LESS_EQUAL => Self::LessEqual,
            TokenKind::BANG_EQUAL => Self::BangEqual,
            TokenKind::EQUAL_EQUAL => Self::EqualEqual,
            TokenKind::AND_AND => Self::And,
            TokenKind::OR_OR => Self::Or,
            _ => return None,
        };
        Some(op)
    }
}

/// A parsed syntactic unit. Every phrase knows the span of source it was
/// parsed from.
#[derive(Clone, Debug, PartialEq)]
pub struct Phrase {
    pub location: Location,
    pub kind: PhraseKind,
    height: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PhraseKind {
    Ident,
    Number,
    Str,
    Symbol,
    Unary {
        op: UnaryOp,
        arg: Box<Phrase>,
    },
    Binary {
        lhs: Box<Phrase>,
        op: BinOp,
        rhs: Box<Phrase>,
    },
    /// `(a, b, ...)`. A single item is a grouping, anything else is only
    /// meaningful as the parameters of a lambda.
    Paren(Vec<Phrase>),
    List(Vec<Phrase>),
    Record(Vec<Field>),
    Call {
        func: Box<Phrase>,
        args: Vec<Phrase>,
    },
    Dot {
        object: Box<Phrase>,
        field: Location,
    },
    If {
        condition: Box<Phrase>,
        then_branch: Box<Phrase>,
        else_branch: Box<Phrase>,
    },
    Lambda {
        params: Box<Phrase>,
        body: Box<Phrase>,
    },
    /// `left = right`, only valid at the top level of a script.
    Definition {
        left: Box<Phrase>,
        equate: Location,
        right: Box<Phrase>,
    },
}

/// `name: value` inside a record literal. The name is an `IDENT` or a
/// `STRING` token.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: Location,
    pub value: Phrase,
}

impl Phrase {
    pub fn new(location: Location, kind: PhraseKind) -> Self {
        let height = 1 + kind.child_height();
        Self {
            location,
            kind,
            height,
        }
    }

    /// Number of phrases on the longest path from this phrase down to a
    /// leaf, counting both ends. A leaf has height 1.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The source text of a leaf phrase.
    pub fn text(&self) -> &str {
        self.location.range()
    }
}

impl PhraseKind {
    fn child_height(&self) -> usize {
        fn max_of<'a>(phrases: impl IntoIterator<Item = &'a Phrase>) -> usize {
            phrases.into_iter().map(Phrase::height).max().unwrap_or(0)
        }
        match self {
            Self::Ident | Self::Number | Self::Str | Self::Symbol => 0,
            Self::Unary { arg, .. } => arg.height,
            Self::Dot { object, .. } => object.height,
            Self::Binary { lhs, rhs, .. } => lhs.height.max(rhs.height),
            Self::Lambda { params, body } => params.height.max(body.height),
            Self::Definition { left, right, .. } => left.height.max(right.height),
            Self::Paren(items) | Self::List(items) => max_of(items),
            Self::Record(fields) => max_of(fields.iter().map(|field| &field.value)),
            Self::Call { func, args } => func.height.max(max_of(args)),
            Self::If {
                condition,
                then_branch,
                else_branch,
            } => max_of([&**condition, &**then_branch, &**else_branch]),
        }
    }
}

fn write_list(
    f: &mut std::fmt::Formatter<'_>,
    open: &str,
    items: &[Phrase],
    close: &str,
) -> std::fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

/// Fully parenthesised rendering, used for tracing and tests.
impl Display for Phrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            PhraseKind::Ident | PhraseKind::Number | PhraseKind::Str | PhraseKind::Symbol => {
                f.write_str(self.text())
            }
            PhraseKind::Unary { op, arg } => write!(f, "({op}{arg})"),
            PhraseKind::Binary { lhs, op, rhs } => write!(f, "({lhs} {op} {rhs})"),
            PhraseKind::Paren(items) => write_list(f, "(", items, ")"),
            PhraseKind::List(items) => write_list(f, "[", items, "]"),
            PhraseKind::Record(fields) => {
                f.write_str("{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name.range(), field.value)?;
                }
                f.write_str("}")
            }
            PhraseKind::Call { func, args } => {
                write!(f, "{func}")?;
                write_list(f, "(", args, ")")
            }
            PhraseKind::Dot { object, field } => write!(f, "{object}.{}", field.range()),
            PhraseKind::If {
                condition,
                then_branch,
                else_branch,
            } => write!(f, "(if {condition} {then_branch} else {else_branch})"),
            PhraseKind::Lambda { params, body } => write!(f, "({params} -> {body})"),
            PhraseKind::Definition { left, right, .. } => write!(f, "{left} = {right}"),
        }
    }
}
