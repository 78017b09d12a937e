use std::{iter::Peekable, rc::Rc, slice::Iter};

use log::trace;

use crate::{
    ast::{BinOp, Field, Phrase, PhraseKind, UnaryOp},
    error::{Context, ErrorMsg, Exception},
    lex::Lexer,
    location::Location,
    script::Script,
    token::{Token, TokenKind},
};

/// Phrases nested deeper than this are rejected, so that later passes
/// which recurse over the tree cannot overflow the stack.
pub const MAX_NESTING: usize = 100;

/// Lexes and parses a whole script. Returns `None` for a script that
/// contains nothing but whitespace and comments.
pub fn parse(script: &Rc<Script>) -> Result<Option<Phrase>, Exception> {
    trace!("Lexing {:?}", script.buffer());
    let tokens = Lexer::new(script).lex_all()?;
    trace!("Parsing {tokens:?}");
    Parser::new(Rc::clone(script), &tokens).parse()
}

#[derive(Debug)]
pub struct Parser<'a> {
    script: Rc<Script>,
    stream: Peekable<Iter<'a, Token>>,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// `stream` must be the output of `Lexer::lex_all` for `script`.
    pub fn new(script: Rc<Script>, stream: &'a [Token]) -> Self {
        Self {
            script,
            stream: stream.iter().peekable(),
            depth: 0,
        }
    }

    pub fn parse(mut self) -> Result<Option<Phrase>, Exception> {
        if self.peek().kind == TokenKind::EOF {
            return Ok(None);
        }
        let lhs = self.parse_expr()?;
        let phrase = match self.advance_if(|t| t.kind == TokenKind::EQUAL) {
            Some(eq) => {
                let rhs = self.parse_expr()?;
                self.node(
                    lhs.location.ending_at(rhs.location.token()),
                    PhraseKind::Definition {
                        equate: self.location(eq),
                        left: Box::new(lhs),
                        right: Box::new(rhs),
                    },
                )?
            }
            None => lhs,
        };
        self.advance_or_err(TokenKind::EOF, ErrorMsg::TrailingInput)?;
        Ok(Some(phrase))
    }

    fn parse_expr(&mut self) -> Result<Phrase, Exception> {
        self.nested(Self::parse_lambda)
    }

    fn parse_lambda(&mut self) -> Result<Phrase, Exception> {
        let params = self.parse_logical_or()?;
        if self.advance_if(|t| t.kind == TokenKind::ARROW).is_none() {
            return Ok(params);
        }
        // Lambdas are right associative: a -> b -> c is a -> (b -> c)
        let body = self.parse_expr()?;
        self.node(
            params.location.ending_at(body.location.token()),
            PhraseKind::Lambda {
                params: Box::new(params),
                body: Box::new(body),
            },
        )
    }

    fn parse_logical_or(&mut self) -> Result<Phrase, Exception> {
        self.parse_binary(Self::parse_logical_and, &[TokenKind::OR_OR])
    }

    fn parse_logical_and(&mut self) -> Result<Phrase, Exception> {
        self.parse_binary(Self::parse_eq, &[TokenKind::AND_AND])
    }

    fn parse_eq(&mut self) -> Result<Phrase, Exception> {
        self.parse_binary(
            Self::parse_cmp,
            &[TokenKind::EQUAL_EQUAL, TokenKind::BANG_EQUAL],
        )
    }

    fn parse_cmp(&mut self) -> Result<Phrase, Exception> {
        self.parse_binary(
            Self::parse_term,
            &[
                TokenKind::GREATER,
                TokenKind::GREATER_EQUAL,
                TokenKind::LESS,
                TokenKind::LESS_EQUAL,
            ],
        )
    }

    fn parse_term(&mut self) -> Result<Phrase, Exception> {
        self.parse_binary(Self::parse_factor, &[TokenKind::PLUS, TokenKind::MINUS])
    }

    fn parse_factor(&mut self) -> Result<Phrase, Exception> {
        self.parse_binary(Self::parse_unary, &[TokenKind::STAR, TokenKind::SLASH])
    }

    /// Left associative chain of `operand (op operand)*` for any of `ops`.
    fn parse_binary(
        &mut self,
        operand: fn(&mut Self) -> Result<Phrase, Exception>,
        ops: &[TokenKind],
    ) -> Result<Phrase, Exception> {
        let mut lhs = operand(self)?;
        while let Some(op) = self.advance_if(|t| ops.contains(&t.kind)) {
            // Infallible as the token kind is checked above
            let bin_op =
                BinOp::from_token(op.kind).expect("non-binary operators cannot be present here");
            let rhs = operand(self)?;
            lhs = self.node(
                lhs.location.ending_at(rhs.location.token()),
                PhraseKind::Binary {
                    lhs: Box::new(lhs),
                    op: bin_op,
                    rhs: Box::new(rhs),
                },
            )?;
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Phrase, Exception> {
        let Some(op) = self.advance_if(|t| matches!(t.kind, TokenKind::BANG | TokenKind::MINUS))
        else {
            return self.parse_postfix();
        };
        let arg = self.nested(Self::parse_unary)?;
        self.node(
            arg.location.starting_at(op),
            PhraseKind::Unary {
                // Infallible as the token kind is checked above
                op: UnaryOp::from_token(op.kind)
                    .expect("non-unary operators cannot be present here"),
                arg: Box::new(arg),
            },
        )
    }

    fn parse_postfix(&mut self) -> Result<Phrase, Exception> {
        let mut phrase = self.parse_primary()?;
        loop {
            if self.advance_if(|t| t.kind == TokenKind::LPAREN).is_some() {
                let (args, close) =
                    self.parse_items(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;
                phrase = self.node(
                    phrase.location.ending_at(close),
                    PhraseKind::Call {
                        func: Box::new(phrase),
                        args,
                    },
                )?;
            } else if self.advance_if(|t| t.kind == TokenKind::DOT).is_some() {
                let field = self.advance_or_err(TokenKind::IDENT, ErrorMsg::ExpectedFieldName)?;
                phrase = self.node(
                    phrase.location.ending_at(field),
                    PhraseKind::Dot {
                        object: Box::new(phrase),
                        field: self.location(field),
                    },
                )?;
            } else {
                return Ok(phrase);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Phrase, Exception> {
        let t = self.peek();
        let leaf = match t.kind {
            TokenKind::NUMBER => PhraseKind::Number,
            TokenKind::STRING => PhraseKind::Str,
            TokenKind::SYMBOL => PhraseKind::Symbol,
            TokenKind::IDENT => PhraseKind::Ident,
            TokenKind::LPAREN => return self.parse_group(),
            TokenKind::LBRACKET => return self.parse_list(),
            TokenKind::LBRACE => return self.parse_record(),
            TokenKind::IF => return self.parse_if(),
            _ => return Err(self.error(t, ErrorMsg::UnexpectedToken)),
        };
        self.advance();
        Ok(Phrase::new(self.location(t), leaf))
    }

    fn parse_group(&mut self) -> Result<Phrase, Exception> {
        // Consume the opening parenthesis
        let open = self.peek();
        self.advance();
        let (items, close) = self.parse_items(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;
        self.node(
            self.location(open).ending_at(close),
            PhraseKind::Paren(items),
        )
    }

    fn parse_list(&mut self) -> Result<Phrase, Exception> {
        // Consume the opening bracket
        let open = self.peek();
        self.advance();
        let (items, close) =
            self.parse_items(TokenKind::RBRACKET, ErrorMsg::MissingClosingBracket)?;
        self.node(
            self.location(open).ending_at(close),
            PhraseKind::List(items),
        )
    }

    fn parse_record(&mut self) -> Result<Phrase, Exception> {
        // Consume the opening brace
        let open = self.peek();
        self.advance();
        let mut fields = vec![];
        let close = loop {
            if let Some(close) = self.advance_if(|t| t.kind == TokenKind::RBRACE) {
                break close;
            }
            let Some(name) =
                self.advance_if(|t| matches!(t.kind, TokenKind::IDENT | TokenKind::STRING))
            else {
                let t = self.peek();
                return Err(self.error(t, ErrorMsg::ExpectedFieldName));
            };
            self.advance_or_err(TokenKind::COLON, ErrorMsg::MissingColon)?;
            fields.push(Field {
                name: self.location(name),
                value: self.parse_expr()?,
            });
            if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none() {
                break self.advance_or_err(TokenKind::RBRACE, ErrorMsg::MissingClosingBrace)?;
            }
        };
        self.node(
            self.location(open).ending_at(close),
            PhraseKind::Record(fields),
        )
    }

    fn parse_if(&mut self) -> Result<Phrase, Exception> {
        // Consume the `if` keyword
        let if_token = self.peek();
        self.advance();
        self.advance_or_err(TokenKind::LPAREN, ErrorMsg::MissingIfParen)?;
        let condition = self.parse_expr()?;
        self.advance_or_err(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;
        let then_branch = self.parse_expr()?;
        self.advance_or_err(TokenKind::ELSE, ErrorMsg::MissingElse)?;
        let else_branch = self.parse_expr()?;
        self.node(
            self.location(if_token)
                .ending_at(else_branch.location.token()),
            PhraseKind::If {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
        )
    }

    /// Comma separated expressions up to and including the `close` token.
    /// A trailing comma is allowed.
    fn parse_items(
        &mut self,
        close: TokenKind,
        msg: ErrorMsg,
    ) -> Result<(Vec<Phrase>, Token), Exception> {
        let mut items = vec![];
        loop {
            if let Some(t) = self.advance_if(|t| t.kind == close) {
                return Ok((items, t));
            }
            items.push(self.parse_expr()?);
            if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none() {
                let t = self.advance_or_err(close, msg)?;
                return Ok((items, t));
            }
        }
    }

    /// Runs `parse` one level deeper, failing at the current token once
    /// the nesting limit is reached.
    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Phrase, Exception>,
    ) -> Result<Phrase, Exception> {
        if self.depth >= MAX_NESTING {
            let t = self.peek();
            return Err(self.error(t, ErrorMsg::TooDeeplyNested));
        }
        self.depth += 1;
        let res = parse(self);
        self.depth -= 1;
        res
    }

    /// Builds a compound phrase. Left associative chains grow the tree
    /// without recursing, so the height is checked here as well.
    fn node(&self, location: Location, kind: PhraseKind) -> Result<Phrase, Exception> {
        let phrase = Phrase::new(location, kind);
        if phrase.height() > MAX_NESTING {
            return Err(Context::at(&phrase.location).error(ErrorMsg::TooDeeplyNested));
        }
        Ok(phrase)
    }

    /// The next token. The lexer always terminates the stream with `EOF`,
    /// which is never consumed except by `parse`.
    fn peek(&mut self) -> Token {
        match self.stream.peek() {
            Some(&&t) => t,
            None => {
                let end = self.script.len();
                Token::new(TokenKind::EOF, end, end, end)
            }
        }
    }

    fn advance(&mut self) -> Option<Token> {
        self.stream.next().copied()
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<Token>
    where
        F: FnOnce(&Token) -> bool,
    {
        if self.stream.peek().filter(|&&t| cond(t)).is_some() {
            self.advance()
        } else {
            None
        }
    }

    fn advance_or_err(&mut self, kind: TokenKind, msg: ErrorMsg) -> Result<Token, Exception> {
        let t = self.peek();
        if t.kind == kind {
            self.advance();
            Ok(t)
        } else {
            Err(self.error(t, msg))
        }
    }

    fn location(&self, token: Token) -> Location {
        Location::new(Rc::clone(&self.script), token)
    }

    fn error(&self, token: Token, msg: ErrorMsg) -> Exception {
        Context::at(&self.location(token)).error(msg)
    }
}
