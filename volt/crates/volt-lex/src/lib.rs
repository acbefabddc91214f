//! volt-lex - Lexical analysis for the Volt language
//!
//! Transforms source text into the token stream the single-pass compiler
//! consumes. The scanner is pull-based: the compiler asks for one token at a
//! time and the scanner never looks further ahead than two bytes, so the
//! whole pipeline runs without an intermediate token buffer.
//!
//! Error reporting happens at the token level: malformed input produces a
//! [`TokenKind::Error`] token whose lexeme carries the message, and the
//! compiler decides how to surface it.

mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{Token, TokenKind};
