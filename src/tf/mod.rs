//! Tools foundation: interned tokens and Unicode identifier rules.

mod token;
pub mod unicode;

pub use token::{Interner, Token};
