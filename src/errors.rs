use thiserror::Error;

use crate::parser::ParseError;

/// Everything that can go wrong while running a script.
#[derive(Debug, Error)]
pub enum EvalError {
    // Malformed script text
    #[error("parse error: {0}")]
    Parse(String),

    // Identifier not bound in the binding or declared locally
    #[error("no such property: {0}")]
    MissingProperty(String),

    // Unknown function/method name, or a known one called with the wrong arity
    #[error("no such method: {name} with {arity} argument(s)")]
    MissingMethod { name: String, arity: usize },

    // Type mismatches, division by zero, overflow and friends
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl From<ParseError> for EvalError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::InvalidSyntax { message, offset } => {
                EvalError::Parse(format!("{message} at offset {offset}"))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
