/// The enum variants are in SCREAMING_SNAKE_CASE as they technically
/// represent constants, but Rust does not allow const enum variants.
#[allow(nonstandard_style)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenKind {
    // Symbols
    LPAREN,
    RPAREN,
    LBRACKET,
    RBRACKET,
    LBRACE,
    RBRACE,
    COMMA,
    COLON,
    DOT,
    // Arithmetic
    BANG,
    MINUS,
    PLUS,
    SLASH,
    STAR,
    // Comparisons
    BANG_EQUAL,
    EQUAL_EQUAL,
    GREATER,
    GREATER_EQUAL,
    LESS,
    LESS_EQUAL,
    // Logical
    AND_AND,
    OR_OR,
    // Literals
    IDENT,
    STRING,
    NUMBER,
    SYMBOL,
    // Keywords
    IF,
    ELSE,
    // Miscellaneous tokens
    EQUAL,
    ARROW,
    EOF,
    /// A malformed token, only used to locate lex errors.
    BAD,
    /// A span covering more than one token. Never produced by the lexer,
    /// only by the `Location` combinators.
    PHRASE,
}

impl TokenKind {
    pub fn from_char(c: char) -> Option<Self> {
        let token = match c {
            '(' => Self::LPAREN,
            ')' => Self::RPAREN,
            '[' => Self::LBRACKET,
            ']' => Self::RBRACKET,
            '{' => Self::LBRACE,
            '}' => Self::RBRACE,
            ',' => Self::COMMA,
            ':' => Self::COLON,
            '.' => Self::DOT,
            '+' => Self::PLUS,
            '*' => Self::STAR,
            _ => return None,
        };
        Some(token)
    }

    pub fn from_keyword(kw: &str) -> Option<Self> {
        let token = match kw {
            "if" => Self::IF,
            "else" => Self::ELSE,
            _ => return None,
        };
        Some(token)
    }
}

/// A lexical span inside a `Script`. All offsets are byte offsets into
/// the script buffer, with `white_first <= first <= last`. The whitespace
/// and comments preceding the token occupy `white_first..first`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub white_first: usize,
    pub first: usize,
    pub last: usize,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(kind: TokenKind, white_first: usize, first: usize, last: usize) -> Self {
        debug_assert!(white_first <= first && first <= last);
        Self {
            white_first,
            first,
            last,
            kind,
        }
    }
}
