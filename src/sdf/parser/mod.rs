//! Text path parser.
//!
//! The grammar is a set of PEG productions built from small combinators over
//! a byte cursor. Productions record what they match into a parse context,
//! which assembles the final [`Path`] once the whole input is consumed.

mod context;
mod grammar;
mod input;

use crate::sdf::Path;
use crate::tf::Interner;

use context::Context;
use input::Input;

/// Syntax error produced when a path text doesn't follow the grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Ill-formed path <{text}>: syntax error at offset {offset}, expected {expected}")]
pub struct ParseError {
    /// The offending input (lossily decoded if it wasn't valid UTF-8).
    pub text: String,
    /// Byte offset of the failure.
    pub offset: usize,
    /// Description of what the grammar expected at `offset`.
    pub expected: &'static str,
}

/// Path parser bound to an interner.
///
/// Every identifier in a parsed path is interned through the parser's
/// interner, so paths parsed by the same parser share their tokens.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'i> {
    interner: &'i Interner,
}

impl Default for Parser<'static> {
    fn default() -> Self {
        Parser::new(Interner::global())
    }
}

impl<'i> Parser<'i> {
    pub fn new(interner: &'i Interner) -> Self {
        Self { interner }
    }

    pub fn interner(&self) -> &'i Interner {
        self.interner
    }

    pub fn parse(&self, text: &str) -> Result<Path, ParseError> {
        self.parse_bytes(text.as_bytes())
    }

    /// Parses raw bytes. Malformed UTF-8 is reported as a syntax error at the
    /// first byte that couldn't be matched.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Path, ParseError> {
        let mut input = Input::new(bytes);
        let mut ctx = Context::new(self.interner);

        let error = |offset: usize, expected: &'static str| {
            let error = ParseError {
                text: String::from_utf8_lossy(bytes).into_owned(),
                offset,
                expected,
            };

            tracing::debug!(%error, "path rejected");
            error
        };

        match grammar::path(&mut input, &mut ctx) {
            Ok(true) => {}
            Ok(false) => return Err(error(input.pos(), "path")),
            Err(failure) => return Err(error(failure.offset, failure.expected)),
        }

        if !input.empty() {
            return Err(error(input.pos(), "end of input"));
        }

        // All brackets are closed once the grammar matched, so this only
        // fails on internal inconsistency.
        ctx.finish().ok_or_else(|| error(input.pos(), "']'"))
    }
}

/// Parses `text` with the process-wide interner.
pub fn parse_path(text: &str) -> Result<Path, ParseError> {
    Parser::default().parse(text)
}
