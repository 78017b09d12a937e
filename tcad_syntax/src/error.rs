use std::fmt::Display;

use crate::location::Location;

/// Where a diagnostic originates. Every fallible operation receives the
/// context of its call site so failures always point back into a script.
#[derive(Clone, Debug, PartialEq)]
pub struct Context {
    location: Location,
    note: Option<String>,
}

impl Context {
    pub fn at(location: &Location) -> Self {
        Self {
            location: location.clone(),
            note: None,
        }
    }

    /// Context for the `index`th (0-based) argument of a call to `func`.
    pub fn arg(location: &Location, index: usize, func: &str) -> Self {
        Self {
            location: location.clone(),
            note: Some(format!("argument #{} of {}", index + 1, func)),
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn error(&self, msg: impl Display) -> Exception {
        Exception {
            context: self.clone(),
            message: msg.to_string(),
        }
    }
}

/// A diagnostic with a source location.
#[derive(Clone, Debug, PartialEq)]
pub struct Exception {
    context: Context,
    message: String,
}

impl Exception {
    pub fn new(context: Context, message: impl Into<String>) -> Self {
        Self {
            context,
            message: message.into(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn location(&self) -> &Location {
        &self.context.location
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Exception {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loc = self.location();
        write!(
            f,
            "{}:{}:{}: ",
            loc.script().name(),
            loc.lineno(),
            loc.column()
        )?;
        if let Some(note) = self.context.note() {
            write!(f, "{note}: ")?;
        }
        f.write_str(&self.message)?;
        // `{:#}` adds the offending source line
        if f.alternate() {
            write_excerpt(f, loc)?;
        }
        Ok(())
    }
}

/// The source line containing `loc`, underlined with carets from the start
/// of the token to its end or the end of the line.
fn write_excerpt(f: &mut std::fmt::Formatter<'_>, loc: &Location) -> std::fmt::Result {
    let line = loc.line_text();
    let indent: String = line[..loc.column() - 1]
        .chars()
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    let width = loc
        .range()
        .lines()
        .next()
        .map_or(0, |first| first.chars().count())
        .max(1);
    write!(f, "\n{line}\n{indent}{}", "^".repeat(width))
}

impl std::error::Error for Exception {}

#[derive(Debug)]
pub enum ErrorMsg {
    // Lex errors
    UnexpectedChar,
    UnterminatedString,
    MalformedNumber,
    InvalidEscape,
    MissingSymbolName,
    // Parse errors
    UnexpectedToken,
    MissingClosingParen,
    MissingClosingBracket,
    MissingClosingBrace,
    MissingColon,
    ExpectedFieldName,
    MissingIfParen,
    MissingElse,
    TrailingInput,
    TooDeeplyNested,
}

impl Display for ErrorMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::UnexpectedChar => "unexpected character",
            Self::UnterminatedString => "unterminated string",
            Self::MalformedNumber => "malformed number",
            Self::InvalidEscape => "invalid escape sequence",
            Self::MissingSymbolName => "missing symbol name after #",
            Self::UnexpectedToken => "unexpected token",
            Self::MissingClosingParen => "missing closing parenthesis",
            Self::MissingClosingBracket => "missing closing bracket",
            Self::MissingClosingBrace => "missing closing brace",
            Self::MissingColon => "expected ':' after field name",
            Self::ExpectedFieldName => "expected field name",
            Self::MissingIfParen => "expected '(' after if",
            Self::MissingElse => "expected else",
            Self::TrailingInput => "unexpected input after expression",
            Self::TooDeeplyNested => "expression too deeply nested",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        script::Script,
        token::{Token, TokenKind},
    };
    use std::rc::Rc;

    fn loc(text: &str, first: usize, last: usize) -> Location {
        let script = Rc::new(Script::new("<test>", text));
        Location::new(script, Token::new(TokenKind::PHRASE, first, first, last))
    }

    #[test]
    fn one_line_rendering() {
        let err = Context::at(&loc("x = 1\ny + 2", 6, 7)).error("y: not defined");
        assert_eq!(err.to_string(), "<test>:2:1: y: not defined");
        let err = Context::arg(&loc("max(1, #a)", 7, 9), 1, "max").error("#a is not a number");
        assert_eq!(
            err.to_string(),
            "<test>:1:8: argument #2 of max: #a is not a number"
        );
    }

    #[test]
    fn excerpt() {
        let err = Context::at(&loc("x = 1\n\tfoo + 2\n", 7, 10)).error("bad");
        assert_eq!(format!("{err:#}"), "<test>:2:2: bad\n\tfoo + 2\n\t^^^");
        // Empty tokens still get one caret
        let err = Context::at(&loc("(1 +", 4, 4)).error("unexpected token");
        assert_eq!(format!("{err:#}"), "<test>:1:5: unexpected token\n(1 +\n    ^");
        // A phrase spanning lines is underlined up to the end of its first line
        let err = Context::at(&loc("f(a,\n  b)", 0, 9)).error("bad");
        assert_eq!(format!("{err:#}"), "<test>:1:1: bad\nf(a,\n^^^^");
    }
}
