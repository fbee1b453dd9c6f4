//! Name interning
//!
//! Element names, attribute names and PI targets repeat throughout a
//! document, so each distinct name is stored once and nodes refer to it by
//! [`Sym`]. Character data is not interned; it lives on its node.

use std::collections::HashMap;

/// Handle to an interned name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sym(u32);

#[derive(Debug, Clone, Default)]
pub struct NamePool {
    names: Vec<Box<str>>,
    lookup: HashMap<Box<str>, Sym>,
}

impl NamePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> Sym {
        if let Some(&sym) = self.lookup.get(name) {
            return sym;
        }
        let sym = Sym(self.names.len() as u32);
        self.names.push(name.into());
        self.lookup.insert(name.into(), sym);
        sym
    }

    /// Symbols only come from this pool, so resolution cannot miss
    pub fn resolve(&self, sym: Sym) -> &str {
        self.names.get(sym.0 as usize).map_or("", |name| name)
    }

    /// Symbol of an already interned name
    pub fn get(&self, name: &str) -> Option<Sym> {
        self.lookup.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_repeated_names_share_a_symbol() {
        let mut pool = NamePool::new();
        let a = pool.intern("para");
        let b = pool.intern("note");
        assert_eq!(pool.intern("para"), a);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.resolve(b), "note");
    }

    #[test]
    fn test_lookup_without_interning() {
        let mut pool = NamePool::new();
        assert!(pool.is_empty());
        let sym = pool.intern("xml:lang");
        assert_eq!(pool.get("xml:lang"), Some(sym));
        assert_eq!(pool.get("lang"), None);
    }
}
