//! String interning for identifiers and literal text.
//!
//! Every name that appears in a program (variables, attributes, methods,
//! classes, modules) is interned once and referred to by a 4-byte [`Atom`].
//! Atom equality is pointer-free and `Atom`s are valid for the lifetime of a
//! compilation.
//!
//! The analysis is single-threaded by contract, so the interner is a plain
//! map + vector with no sharding or locking.

use rustc_hash::FxHashMap;
use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An interned string, identified by its index in the [`Interner`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Atom(pub u32);

impl Atom {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interns strings and resolves [`Atom`]s back to text.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    map: FxHashMap<Box<str>, Atom>,
    strings: Vec<Box<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its atom. Idempotent.
    pub fn intern(&mut self, s: &str) -> Atom {
        if let Some(&atom) = self.map.get(s) {
            return atom;
        }
        let atom = Atom(self.strings.len() as u32);
        let owned: Box<str> = s.into();
        self.strings.push(owned.clone());
        self.map.insert(owned, atom);
        atom
    }

    /// Resolve an atom back to its text.
    ///
    /// Panics if the atom did not come from this interner.
    #[inline]
    pub fn resolve(&self, atom: Atom) -> &str {
        &self.strings[atom.index()]
    }

    /// Look up a string without interning it.
    pub fn get(&self, s: &str) -> Option<Atom> {
        self.map.get(s).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

// The serialized form is just the string table; the lookup map is rebuilt on
// deserialization so atoms stay stable across a round trip.
impl Serialize for Interner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.strings.len()))?;
        for s in &self.strings {
            seq.serialize_element(&**s)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Interner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StringsVisitor;

        impl<'de> Visitor<'de> for StringsVisitor {
            type Value = Interner;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a sequence of interned strings")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Interner, A::Error> {
                let mut interner = Interner::new();
                while let Some(s) = seq.next_element::<String>()? {
                    interner.intern(&s);
                }
                Ok(interner)
            }
        }

        deserializer.deserialize_seq(StringsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut interner = Interner::new();
        let a = interner.intern("append");
        let b = interner.intern("append");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a), "append");
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn distinct_strings_get_distinct_atoms() {
        let mut interner = Interner::new();
        let a = interner.intern("x");
        let b = interner.intern("y");
        assert_ne!(a, b);
        assert_eq!(interner.get("x"), Some(a));
        assert_eq!(interner.get("z"), None);
    }
}
