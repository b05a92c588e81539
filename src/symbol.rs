//! String interning. Every identifier, keyword spelling, and attribute name
//! that flows through the lexer, parser, and resolver is interned once here;
//! everything downstream compares `Symbol`s by value instead of hashing or
//! comparing strings.

use hashbrown::HashMap;
use std::cell::RefCell;
use std::fmt;

/// An interned string. Cheap to copy, compare, and hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    #[must_use]
    pub fn into_usize(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        with_interner(|i| i.resolve(self))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The interner itself. Strings are leaked into `'static` storage once;
/// since compilation is single-pass-per-file and the interner outlives the
/// whole compile (§5: "Arenas are per-instance"), this is an acceptable
/// trade of memory for simplicity, mirroring the typical compiler-interner
/// pattern of keeping interned text alive for the process lifetime.
pub struct Interner {
    map: HashMap<&'static str, Symbol>,
    strings: Vec<&'static str>,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Interner { map: HashMap::new(), strings: Vec::new() }
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }
        let s: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let sym = Symbol(u32::try_from(self.strings.len()).expect("interner overflow"));
        self.strings.push(s);
        self.map.insert(s, sym);
        sym
    }

    #[must_use]
    pub fn resolve(&self, sym: Symbol) -> &'static str {
        self.strings[sym.into_usize()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

thread_local! {
    static INTERNER: RefCell<Interner> = RefCell::new(Interner::new());
}

fn with_interner<R>(f: impl FnOnce(&Interner) -> R) -> R {
    INTERNER.with(|i| f(&i.borrow()))
}

/// Intern `s` in the thread-local interner, returning its `Symbol`.
pub fn intern(s: &str) -> Symbol {
    INTERNER.with(|i| i.borrow_mut().intern(s))
}

/// Build a dense lookup table `Symbol -> Option<T>` out of a list of
/// `(symbol, value)` pairs, suitable for `O(1)` reverse lookup of a keyword
/// or primitive name back to its enum case. Unlisted symbols map to `None`.
pub fn init_dense_symbol_map<T: Copy>(pairs: &[(Symbol, T)]) -> Box<[Option<T>]> {
    let len = pairs.iter().map(|(s, _)| s.into_usize() + 1).max().unwrap_or(0);
    let mut map = vec![None; len].into_boxed_slice();
    for &(s, v) in pairs {
        map[s.into_usize()] = Some(v);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let a = intern("hello");
        let b = intern("hello");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "hello");
    }

    #[test]
    fn distinct_strings_get_distinct_symbols() {
        let a = intern("foo_sym_test");
        let b = intern("bar_sym_test");
        assert_ne!(a, b);
    }
}
