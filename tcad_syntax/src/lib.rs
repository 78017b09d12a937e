pub mod ast;
pub mod error;
pub mod lex;
pub mod location;
pub mod parse;
pub mod script;
pub mod token;
