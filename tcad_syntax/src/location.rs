use std::{fmt::Debug, rc::Rc};

use crate::{
    script::Script,
    token::{Token, TokenKind},
};

/// A token inside a particular script. Holding a location keeps the
/// script alive.
#[derive(Clone)]
pub struct Location {
    script: Rc<Script>,
    token: Token,
}

impl Location {
    pub fn new(script: Rc<Script>, token: Token) -> Self {
        debug_assert!(token.last <= script.len());
        Self { script, token }
    }

    pub fn script(&self) -> &Rc<Script> {
        &self.script
    }

    pub fn token(&self) -> Token {
        self.token
    }

    /// Line number of the start of the token, counting from 1.
    /// This scans the buffer on every call.
    pub fn lineno(&self) -> usize {
        1 + self.script.buffer().as_bytes()[..self.token.first]
            .iter()
            .filter(|&&b| b == b'\n')
            .count()
    }

    /// Byte column of the start of the token, counting from 1.
    pub fn column(&self) -> usize {
        let before = &self.script.buffer()[..self.token.first];
        match before.rfind('\n') {
            Some(nl) => self.token.first - nl,
            None => self.token.first + 1,
        }
    }

    /// The source text covered by the token.
    pub fn range(&self) -> &str {
        &self.script.buffer()[self.token.first..self.token.last]
    }

    /// The whole source line on which the token starts, without the newline.
    pub fn line_text(&self) -> &str {
        let buffer = self.script.buffer();
        let start = buffer[..self.token.first]
            .rfind('\n')
            .map_or(0, |nl| nl + 1);
        let end = buffer[self.token.first..]
            .find('\n')
            .map_or(buffer.len(), |nl| self.token.first + nl);
        &buffer[start..end]
    }

    /// A phrase location that begins at `tok` and ends where `self` ends.
    pub fn starting_at(&self, tok: Token) -> Location {
        Location {
            script: Rc::clone(&self.script),
            token: Token {
                white_first: tok.white_first,
                first: tok.first,
                last: self.token.last,
                kind: TokenKind::PHRASE,
            },
        }
    }

    /// A phrase location that begins where `self` begins and ends at `tok`.
    pub fn ending_at(&self, tok: Token) -> Location {
        Location {
            script: Rc::clone(&self.script),
            token: Token {
                white_first: self.token.white_first,
                first: self.token.first,
                last: tok.last,
                kind: TokenKind::PHRASE,
            },
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.script, &other.script) && self.token == other.token
    }
}

impl Debug for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}..{} {:?}",
            self.script.name(),
            self.token.first,
            self.token.last,
            self.range()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(text: &str) -> Rc<Script> {
        Rc::new(Script::new("<test>", text))
    }

    fn token(kind: TokenKind, first: usize, last: usize) -> Token {
        Token::new(kind, first, first, last)
    }

    #[test]
    fn lineno() {
        let s = script("a\nbb\n\nccc");
        assert_eq!(Location::new(s.clone(), token(TokenKind::IDENT, 0, 1)).lineno(), 1);
        assert_eq!(Location::new(s.clone(), token(TokenKind::IDENT, 2, 4)).lineno(), 2);
        assert_eq!(Location::new(s.clone(), token(TokenKind::IDENT, 6, 9)).lineno(), 4);
        // A token that starts right after a newline is on the next line
        assert_eq!(Location::new(s, token(TokenKind::EOF, 9, 9)).lineno(), 4);
    }

    #[test]
    fn column_and_line_text() {
        let s = script("x = 1\n  foo + 2\n");
        let loc = Location::new(s, token(TokenKind::IDENT, 8, 11));
        assert_eq!(loc.column(), 3);
        assert_eq!(loc.line_text(), "  foo + 2");
        assert_eq!(loc.range(), "foo");
    }

    #[test]
    fn starting_at() {
        let s = script("alpha + beta");
        let t1 = Token::new(TokenKind::IDENT, 7, 8, 12);
        let t2 = token(TokenKind::IDENT, 0, 5);
        let loc = Location::new(s.clone(), t1).starting_at(t2);
        assert!(Rc::ptr_eq(loc.script(), &s));
        assert_eq!(loc.range(), "alpha + beta");
        assert_eq!(loc.token().white_first, 0);
        assert_eq!(loc.token().first, 0);
        assert_eq!(loc.token().last, 12);
        assert_eq!(loc.token().kind, TokenKind::PHRASE);
    }

    #[test]
    fn ending_at() {
        let s = script("alpha + beta");
        let t1 = token(TokenKind::IDENT, 0, 5);
        let t2 = Token::new(TokenKind::IDENT, 7, 8, 12);
        let original = Location::new(s.clone(), t1);
        let loc = original.ending_at(t2);
        assert!(Rc::ptr_eq(loc.script(), &s));
        assert_eq!(loc.range(), "alpha + beta");
        assert_eq!(loc.token().kind, TokenKind::PHRASE);
        // The original location is left untouched
        assert_eq!(original.range(), "alpha");
        assert_eq!(original.token().kind, TokenKind::IDENT);
    }
}
