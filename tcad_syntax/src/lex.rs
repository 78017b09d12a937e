use crate::{
    error::{Context, ErrorMsg, Exception},
    location::Location,
    script::Script,
    token::{Token, TokenKind},
};
use std::{iter::Peekable, rc::Rc, str::CharIndices};

#[derive(Debug)]
pub struct Lexer<'a> {
    script: &'a Rc<Script>,
    stream: Peekable<CharIndices<'a>>,
    white_first: usize,
    start: usize,
    current: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(script: &'a Rc<Script>) -> Self {
        Self {
            script,
            stream: script.buffer().char_indices().peekable(),
            white_first: 0,
            start: 0,
            current: 0,
        }
    }

    /// Lexes the whole script. The returned tokens always end with `EOF`.
    pub fn lex_all(mut self) -> Result<Vec<Token>, Exception> {
        let mut tokens: Vec<Token> = Vec::default();
        loop {
            let t = self.lex()?;
            tokens.push(t);
            if t.kind == TokenKind::EOF {
                return Ok(tokens);
            }
        }
    }

    pub fn lex(&mut self) -> Result<Token, Exception> {
        self.white_first = self.current;
        self.skip_whitespace();
        self.start = self.current;
        let Some(c) = self.advance() else {
            return Ok(self.make_token(TokenKind::EOF));
        };
        match c {
            '!' => Ok(self.lookahead_for_token('=', TokenKind::BANG_EQUAL, TokenKind::BANG)),
            '=' => Ok(self.lookahead_for_token('=', TokenKind::EQUAL_EQUAL, TokenKind::EQUAL)),
            '>' => Ok(self.lookahead_for_token(
                '=',
                TokenKind::GREATER_EQUAL,
                TokenKind::GREATER,
            )),
            '<' => Ok(self.lookahead_for_token('=', TokenKind::LESS_EQUAL, TokenKind::LESS)),
            '-' => Ok(self.lookahead_for_token('>', TokenKind::ARROW, TokenKind::MINUS)),
            '&' => self.lex_double('&', TokenKind::AND_AND),
            '|' => self.lex_double('|', TokenKind::OR_OR),
            '/' => Ok(self.make_token(TokenKind::SLASH)),
            '"' => self.lex_string(),
            '#' => self.lex_symbol(),
            _ => {
                if let Some(t) = TokenKind::from_char(c) {
                    Ok(self.make_token(t))
                } else if is_ident_start(c) {
                    Ok(self.lex_ident())
                } else if c.is_ascii_digit() {
                    self.lex_number()
                } else {
                    Err(self.error(ErrorMsg::UnexpectedChar))
                }
            }
        }
    }

    fn skip_whitespace(&mut self) {
        loop {
            if self
                .advance_if(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
                .is_some()
            {
                continue;
            }
            // Line comments run up to, but not including, the newline
            if self.script.buffer()[self.current..].starts_with("//") {
                self.advance_while(|c| c != '\n');
                continue;
            }
            break;
        }
    }

    fn lex_double(&mut self, second: char, kind: TokenKind) -> Result<Token, Exception> {
        if self.advance_if(|c| c == second).is_some() {
            Ok(self.make_token(kind))
        } else {
            Err(self.error(ErrorMsg::UnexpectedChar))
        }
    }

    fn lex_ident(&mut self) -> Token {
        self.advance_while(is_ident_char);
        let word = &self.script.buffer()[self.start..self.current];
        self.make_token(TokenKind::from_keyword(word).unwrap_or(TokenKind::IDENT))
    }

    /// `#name`, or `#"any text"` for names that are not identifiers.
    fn lex_symbol(&mut self) -> Result<Token, Exception> {
        if self.advance_if(|c| c == '"').is_some() {
            self.lex_quoted()?;
            return Ok(self.make_token(TokenKind::SYMBOL));
        }
        if self.advance_if(is_ident_start).is_none() {
            return Err(self.error(ErrorMsg::MissingSymbolName));
        }
        self.advance_while(is_ident_char);
        Ok(self.make_token(TokenKind::SYMBOL))
    }

    fn lex_number(&mut self) -> Result<Token, Exception> {
        // Consume the integral part
        self.advance_while(|c| c.is_ascii_digit());
        // A dot must be followed by the fractional digits
        if self.advance_if(|c| c == '.').is_some()
            && self.advance_while(|c| c.is_ascii_digit()).is_none()
        {
            return Err(self.error(ErrorMsg::MalformedNumber));
        }
        if self.advance_if(|c| c == 'e' || c == 'E').is_some() {
            self.advance_if(|c| c == '+' || c == '-');
            if self.advance_while(|c| c.is_ascii_digit()).is_none() {
                return Err(self.error(ErrorMsg::MalformedNumber));
            }
        }
        if self.stream.peek().filter(|&&(_, c)| is_ident_char(c)).is_some() {
            self.advance();
            return Err(self.error(ErrorMsg::MalformedNumber));
        }
        Ok(self.make_token(TokenKind::NUMBER))
    }

    fn lex_string(&mut self) -> Result<Token, Exception> {
        // The token keeps its quotes, the contents are decoded by `unescape`
        self.lex_quoted()?;
        Ok(self.make_token(TokenKind::STRING))
    }

    /// Consumes the rest of a quoted literal whose opening quote has
    /// already been consumed.
    fn lex_quoted(&mut self) -> Result<(), Exception> {
        loop {
            match self.advance() {
                Some('"') => return Ok(()),
                Some('\\') => {
                    if self
                        .advance_if(|c| matches!(c, '"' | '\\' | 'n' | 't'))
                        .is_none()
                    {
                        return Err(self.error(ErrorMsg::InvalidEscape));
                    }
                }
                Some('\n') | None => return Err(self.error(ErrorMsg::UnterminatedString)),
                Some(_) => (),
            }
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.white_first, self.start, self.current)
    }

    fn advance(&mut self) -> Option<char> {
        let (i, c) = self.stream.next()?;
        self.current = i + c.len_utf8();
        Some(c)
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<char>
    where
        F: FnOnce(char) -> bool,
    {
        if self.stream.peek().filter(|&&(_, c)| cond(c)).is_some() {
            self.advance()
        } else {
            None
        }
    }

    fn advance_while<F>(&mut self, cond: F) -> Option<usize>
    where
        F: Fn(char) -> bool,
    {
        let mut count: usize = 0;
        while self.stream.peek().filter(|&&(_, c)| cond(c)).is_some() {
            count += 1;
            self.advance();
        }
        count.ne(&0).then_some(count)
    }

    fn lookahead_for_token(
        &mut self,
        match_char: char,
        if_match: TokenKind,
        no_match: TokenKind,
    ) -> Token {
        if self.advance_if(|c| c == match_char).is_some() {
            self.make_token(if_match)
        } else {
            self.make_token(no_match)
        }
    }

    fn error(&self, msg: ErrorMsg) -> Exception {
        let loc = Location::new(Rc::clone(self.script), self.make_token(TokenKind::BAD));
        Context::at(&loc).error(msg)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether `name` can be written as a bare identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_ident_start)
        && chars.all(is_ident_char)
        && TokenKind::from_keyword(name).is_none()
}

/// Decodes the text of a `STRING` token, or of a quoted `SYMBOL` token
/// once its `#` is stripped, quotes included.
pub fn unescape(lexeme: &str) -> String {
    let inner = lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lexeme);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => (),
        }
    }
    out
}

/// Encodes `text` as a string literal that `unescape` maps back to `text`.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Result<Vec<Token>, Exception> {
        let script = Rc::new(Script::new("<test>", input));
        Lexer::new(&script).lex_all()
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn lex_err_test(input: &str, expected: &str) {
        assert_eq!(lex(input).unwrap_err().to_string(), expected);
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("a -> b == c != d <= e >= f && g || !h"),
            vec![
                TokenKind::IDENT,
                TokenKind::ARROW,
                TokenKind::IDENT,
                TokenKind::EQUAL_EQUAL,
                TokenKind::IDENT,
                TokenKind::BANG_EQUAL,
                TokenKind::IDENT,
                TokenKind::LESS_EQUAL,
                TokenKind::IDENT,
                TokenKind::GREATER_EQUAL,
                TokenKind::IDENT,
                TokenKind::AND_AND,
                TokenKind::IDENT,
                TokenKind::OR_OR,
                TokenKind::BANG,
                TokenKind::IDENT,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn literals_and_keywords() {
        assert_eq!(
            kinds("if (x) 1.5e3 else \"s\\\"\" #tag"),
            vec![
                TokenKind::IF,
                TokenKind::LPAREN,
                TokenKind::IDENT,
                TokenKind::RPAREN,
                TokenKind::NUMBER,
                TokenKind::ELSE,
                TokenKind::STRING,
                TokenKind::SYMBOL,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn quoted_symbols() {
        let tokens = lex("#\"b c\" #\"\\\"\" #x").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::SYMBOL,
                TokenKind::SYMBOL,
                TokenKind::SYMBOL,
                TokenKind::EOF
            ]
        );
        assert_eq!(tokens[0], Token::new(TokenKind::SYMBOL, 0, 0, 6));
        assert_eq!(tokens[1], Token::new(TokenKind::SYMBOL, 6, 7, 12));
    }

    #[test]
    fn offsets() {
        let tokens = lex("  x // note\n  = 42").unwrap();
        assert_eq!(tokens[0], Token::new(TokenKind::IDENT, 0, 2, 3));
        assert_eq!(tokens[1], Token::new(TokenKind::EQUAL, 3, 14, 15));
        assert_eq!(tokens[2], Token::new(TokenKind::NUMBER, 15, 16, 18));
        assert_eq!(tokens[3], Token::new(TokenKind::EOF, 18, 18, 18));
    }

    #[test]
    fn blank() {
        assert_eq!(kinds(""), vec![TokenKind::EOF]);
        assert_eq!(kinds("   \t// only a comment"), vec![TokenKind::EOF]);
    }

    #[test]
    fn errors() {
        lex_err_test("1 + $", "<test>:1:5: unexpected character");
        lex_err_test("\"abc", "<test>:1:1: unterminated string");
        lex_err_test("3.", "<test>:1:1: malformed number");
        lex_err_test("\n 2x", "<test>:2:2: malformed number");
        lex_err_test("\"a\\q\"", "<test>:1:1: invalid escape sequence");
        lex_err_test("# x", "<test>:1:1: missing symbol name after #");
        lex_err_test("#\"a b", "<test>:1:1: unterminated string");
    }

    #[test]
    fn string_escapes() {
        assert_eq!(unescape("\"a\\\"b\\\\c\\nd\""), "a\"b\\c\nd");
        assert_eq!(unescape(&escape("tab\there \"q\"")), "tab\there \"q\"");
        assert!(is_identifier("foo_1"));
        assert!(!is_identifier("1foo"));
        assert!(!is_identifier("if"));
        assert!(!is_identifier("a b"));
    }
}
