//! Byte cursor and PEG combinators used by the path grammar.
//!
//! Every rule either matches and advances the cursor, or returns `Ok(false)`
//! with both the cursor and the parse context left exactly as they were.
//! `Err` is a hard failure raised by [`must`] once a prefix has committed the
//! parser to a production.

use super::context::{Context, ContextMark};
use crate::tf::unicode::{self, Utf8Char};

/// Hard failure raised by a [`must`] rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Failure {
    pub offset: usize,
    pub expected: &'static str,
}

pub(crate) type Match = Result<bool, Failure>;

pub(crate) struct Input<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Input<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    #[inline]
    pub fn empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos.min(self.bytes.len())..]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.rest().first().copied()
    }

    #[inline]
    pub fn peek_utf8(&self) -> Option<Utf8Char> {
        unicode::peek_utf8(self.rest())
    }

    #[inline]
    pub fn bump(&mut self, count: usize) {
        self.pos = (self.pos + count).min(self.bytes.len());
    }

    #[inline]
    fn rewind(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Bytes consumed since `start`.
    #[inline]
    pub fn span(&self, start: usize) -> &'a [u8] {
        &self.bytes[start..self.pos]
    }
}

/// Saved cursor and context position.
struct Mark {
    pos: usize,
    ctx: ContextMark,
}

impl Mark {
    fn new(input: &Input<'_>, ctx: &Context<'_>) -> Self {
        Self {
            pos: input.pos(),
            ctx: ctx.mark(),
        }
    }

    fn restore(self, input: &mut Input<'_>, ctx: &mut Context<'_>) {
        input.rewind(self.pos);
        ctx.restore(self.ctx);
    }
}

pub(crate) trait Rule {
    fn apply(&self, input: &mut Input<'_>, ctx: &mut Context<'_>) -> Match;
}

impl<F> Rule for F
where
    F: Fn(&mut Input<'_>, &mut Context<'_>) -> Match,
{
    #[inline]
    fn apply(&self, input: &mut Input<'_>, ctx: &mut Context<'_>) -> Match {
        self(input, ctx)
    }
}

/// Pins a closure to the rule signature.
#[inline]
fn rule<F>(f: F) -> F
where
    F: Fn(&mut Input<'_>, &mut Context<'_>) -> Match,
{
    f
}

/// Matches a single byte.
pub(crate) fn one(byte: u8) -> impl Rule {
    rule(move |input, _| {
        if input.peek() == Some(byte) {
            input.bump(1);
            return Ok(true);
        }

        Ok(false)
    })
}

/// Matches the same byte twice (`..`).
pub(crate) fn two(byte: u8) -> impl Rule {
    rule(move |input, _| {
        if input.rest().starts_with(&[byte, byte]) {
            input.bump(2);
            return Ok(true);
        }

        Ok(false)
    })
}

/// Matches a space or a tab.
pub(crate) fn blank() -> impl Rule {
    rule(|input, _| {
        if matches!(input.peek(), Some(b' ' | b'\t')) {
            input.bump(1);
            return Ok(true);
        }

        Ok(false)
    })
}

/// ASCII case-insensitive keyword that is not followed by an identifier
/// character.
pub(crate) fn keyword(word: &'static str) -> impl Rule {
    rule(move |input, _| {
        let rest = input.rest();
        let len = word.len();

        if rest.len() < len || !rest[..len].eq_ignore_ascii_case(word.as_bytes()) {
            return Ok(false);
        }

        let continues = unicode::peek_utf8(&rest[len..]).map_or(false, |c| unicode::is_identifier_continue(c.cp));
        if continues {
            return Ok(false);
        }

        input.bump(len);
        Ok(true)
    })
}

/// `_` or an `XID_Start` code point.
pub(crate) fn identifier_start() -> impl Rule {
    code_point(unicode::is_identifier_start)
}

/// An `XID_Continue` code point.
pub(crate) fn identifier_continue() -> impl Rule {
    code_point(unicode::is_identifier_continue)
}

/// One UTF-8 scalar satisfying `predicate`. Malformed input never matches.
fn code_point(predicate: fn(u32) -> bool) -> impl Rule {
    rule(move |input, _| match input.peek_utf8() {
        Some(ch) if predicate(ch.cp) => {
            input.bump(ch.len);
            Ok(true)
        }
        _ => Ok(false),
    })
}

/// Unicode identifier: start character followed by continue characters.
pub(crate) fn identifier() -> impl Rule {
    seq2(identifier_start(), star(identifier_continue()))
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn ascii_identifier() -> impl Rule {
    rule(|input, _| {
        let rest = input.rest();

        match rest.first() {
            Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
            _ => return Ok(false),
        }

        let len = rest
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count();

        input.bump(len);
        Ok(true)
    })
}

/// Both rules in order; atomic.
pub(crate) fn seq2<A: Rule, B: Rule>(a: A, b: B) -> impl Rule {
    rule(move |input, ctx| {
        let mark = Mark::new(input, ctx);

        if a.apply(input, ctx)? && b.apply(input, ctx)? {
            return Ok(true);
        }

        mark.restore(input, ctx);
        Ok(false)
    })
}

/// First rule that matches.
pub(crate) fn sor2<A: Rule, B: Rule>(a: A, b: B) -> impl Rule {
    rule(move |input, ctx| Ok(a.apply(input, ctx)? || b.apply(input, ctx)?))
}

/// Zero or more.
pub(crate) fn star<R: Rule>(r: R) -> impl Rule {
    rule(move |input, ctx| {
        loop {
            let pos = input.pos();
            if !r.apply(input, ctx)? || input.pos() == pos {
                break;
            }
        }

        Ok(true)
    })
}

/// One or more.
pub(crate) fn plus<R: Rule>(r: R) -> impl Rule {
    rule(move |input, ctx| {
        if !r.apply(input, ctx)? {
            return Ok(false);
        }

        while r.apply(input, ctx)? {}

        Ok(true)
    })
}

/// Zero or one.
pub(crate) fn opt<R: Rule>(r: R) -> impl Rule {
    rule(move |input, ctx| {
        r.apply(input, ctx)?;
        Ok(true)
    })
}

/// One or more `item`s separated by `sep`. A trailing separator is not
/// consumed.
pub(crate) fn list<I, S, FI, FS>(item: FI, sep: FS) -> impl Rule
where
    I: Rule,
    S: Rule,
    FI: Fn() -> I,
    FS: Fn() -> S,
{
    seq2(item(), star(seq2(sep(), item())))
}

/// Like [`list`], but a separator is only consumed when the lookahead sees
/// it followed by an item.
pub(crate) fn lookahead_list<I, S, FI, FS>(item: FI, sep: FS) -> impl Rule
where
    I: Rule,
    S: Rule,
    FI: Fn() -> I,
    FS: Fn() -> S,
{
    seq2(item(), star(seq2(at(seq2(sep(), item())), seq2(sep(), item()))))
}

/// Lookahead: tests `r` without consuming input or recording anything.
pub(crate) fn at<R: Rule>(r: R) -> impl Rule {
    rule(move |input, ctx| {
        let mark = Mark::new(input, ctx);
        let matched = r.apply(input, ctx)?;
        mark.restore(input, ctx);

        Ok(matched)
    })
}

/// Turns a mismatch into a hard failure.
pub(crate) fn must<R: Rule>(r: R, expected: &'static str) -> impl Rule {
    rule(move |input, ctx| {
        if r.apply(input, ctx)? {
            return Ok(true);
        }

        Err(Failure {
            offset: input.pos(),
            expected,
        })
    })
}

/// `r` surrounded by optional blanks.
pub(crate) fn pad_blank<R: Rule>(r: R) -> impl Rule {
    seq2(star(blank()), seq2(r, star(blank())))
}

/// Runs `record` with the matched span once `r` matches. The match is
/// rejected (and rolled back) when `record` returns `false`.
pub(crate) fn action<R, F>(r: R, record: F) -> impl Rule
where
    R: Rule,
    F: Fn(&mut Context<'_>, &[u8]) -> bool,
{
    rule(move |input, ctx| {
        let mark = Mark::new(input, ctx);

        if !r.apply(input, ctx)? {
            return Ok(false);
        }

        if record(ctx, input.span(mark.pos)) {
            return Ok(true);
        }

        mark.restore(input, ctx);
        Ok(false)
    })
}

/// Consumes nothing and matches when `check` accepts the context.
pub(crate) fn guard<F>(check: F) -> impl Rule
where
    F: Fn(&mut Context<'_>) -> bool,
{
    rule(move |_, ctx| Ok(check(ctx)))
}

/// Sequence of rules, atomic.
macro_rules! seq {
    ($a:expr $(,)?) => { $a };
    ($a:expr, $($rest:expr),+ $(,)?) => {
        $crate::sdf::parser::input::seq2($a, $crate::sdf::parser::input::seq!($($rest),+))
    };
}

/// Ordered choice.
macro_rules! sor {
    ($a:expr $(,)?) => { $a };
    ($a:expr, $($rest:expr),+ $(,)?) => {
        $crate::sdf::parser::input::sor2($a, $crate::sdf::parser::input::sor!($($rest),+))
    };
}

pub(crate) use {seq, sor};
