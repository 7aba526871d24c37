// Filter expression parser: `<column> <operator> <value>`

pub mod lexer;
pub mod predicate;

// Public API re-exports
pub use predicate::parse_predicate;
