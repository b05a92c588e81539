//! Shared typed-index helpers, kept from the teacher crate's `Idx` pattern:
//! every arena-owned thing is referred to by a small `Copy` newtype index
//! rather than a raw pointer or reference, so cross-declaration links
//! (overload sets, generic specializations, constructor/destructor
//! back-links, §3 Declarations "Ownership") stay valid across the whole
//! compile without borrow-checker fighting.

pub mod typespec;
pub mod expr;
pub mod constant_value;
pub mod decl;
pub mod scope;
pub mod entity;

/// A typed index into one of the arenas below. Implementors are plain
/// `u32` newtypes; the trait exists so generic arena code
/// (`Arena<T>::push`/`Arena<T>::get`) can be written once.
pub trait Idx: Copy + Eq + std::hash::Hash {
    fn from_usize(i: usize) -> Self;
    fn into_usize(self) -> usize;
}

/// Declares a `u32`-backed index newtype implementing [`Idx`], mirroring the
/// index types `mmcc` defines for its MIR (`VarId`, `BlockId`, ...).
#[macro_export]
macro_rules! mk_idx {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        $vis struct $name(u32);

        impl $crate::types::Idx for $name {
            fn from_usize(i: usize) -> Self { $name(u32::try_from(i).expect("arena index overflow")) }
            fn into_usize(self) -> usize { self.0 as usize }
        }
    };
}

/// A simple append-only arena (§5: "The AST arena is append-only; existing
/// nodes are never moved, so raw back-pointers remain valid for the entire
/// compile"). Indices returned by `push` are stable for the arena's whole
/// lifetime.
#[derive(Debug)]
pub struct Arena<I, T> {
    items: Vec<T>,
    _marker: std::marker::PhantomData<I>,
}

impl<I: Idx, T> Default for Arena<I, T> {
    fn default() -> Self {
        Arena { items: Vec::new(), _marker: std::marker::PhantomData }
    }
}

impl<I: Idx, T> Arena<I, T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: T) -> I {
        let idx = I::from_usize(self.items.len());
        self.items.push(value);
        idx
    }

    #[must_use]
    pub fn get(&self, idx: I) -> &T {
        &self.items[idx.into_usize()]
    }

    pub fn get_mut(&mut self, idx: I) -> &mut T {
        &mut self.items[idx.into_usize()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items.iter().enumerate().map(|(i, t)| (I::from_usize(i), t))
    }
}
