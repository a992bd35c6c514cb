//! Interned string tokens.

use std::{
    borrow::Borrow,
    cmp::Ordering,
    collections::HashSet,
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    sync::{Arc, OnceLock},
};

use parking_lot::RwLock;

/// An interned, immutable string.
///
/// Tokens created by the same [`Interner`] share one allocation per distinct
/// text, so equality is usually a pointer comparison. Tokens from different
/// interners still compare equal when their text matches.
#[derive(Clone)]
pub struct Token(Arc<str>);

impl Token {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if both tokens point to the same interned instance.
    #[inline]
    pub fn ptr_eq(a: &Token, b: &Token) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for Token {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Token {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Token::ptr_eq(self, other) || self.0 == other.0
    }
}

impl Eq for Token {}

impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Token {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Thread-safe, append-only string interning table.
///
/// Lookups take a shared lock; only the first occurrence of a string takes
/// the exclusive lock to insert it.
#[derive(Default)]
pub struct Interner {
    table: RwLock<HashSet<Arc<str>>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide interner used by [`crate::sdf::Path::new`] and friends.
    pub fn global() -> &'static Interner {
        static GLOBAL: OnceLock<Interner> = OnceLock::new();
        GLOBAL.get_or_init(Interner::new)
    }

    /// Returns the token for `text`, inserting it on first use.
    pub fn intern(&self, text: &str) -> Token {
        if let Some(existing) = self.table.read().get(text) {
            return Token(Arc::clone(existing));
        }

        let mut table = self.table.write();

        // Another thread may have inserted it between the two locks.
        if let Some(existing) = table.get(text) {
            return Token(Arc::clone(existing));
        }

        let entry: Arc<str> = Arc::from(text);
        table.insert(Arc::clone(&entry));

        Token(entry)
    }

    /// Returns the token for `text` only if it was interned before.
    pub fn get(&self, text: &str) -> Option<Token> {
        self.table.read().get(text).map(|entry| Token(Arc::clone(entry)))
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner").field("len", &self.len()).finish()
    }
}
