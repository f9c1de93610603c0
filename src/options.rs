//! Small option/config carriers for behavior left open to more than one
//! reasonable choice (§9), plus the optional ambient reference-table surface
//! (§6).

use crate::value::Value;

/// Options controlling Nibs encode/decode behavior where the revision
/// leaves more than one reasonable choice (§9 open questions).
#[derive(Clone, Debug)]
pub struct NibsOptions {
    /// If `true` (the default), `Array`/`Trie` encode identically to
    /// `List`/`Map` — the `indexed` flag is cosmetic at the wire level. If
    /// `false`, a future revision's distinct index-side-table layout would
    /// apply instead (not yet implemented; see DESIGN.md).
    pub indexed_containers_are_cosmetic: bool,

    /// If `true` (the default), `MapHandle::len()` walks the body and
    /// counts pairs. If `false`, it returns `0` unconditionally, for callers
    /// that only need an O(1) emptiness-adjacent check and would rather
    /// skip the O(n) walk.
    pub map_handle_len_counts_pairs: bool,
}

impl Default for NibsOptions {
    fn default() -> NibsOptions {
        NibsOptions {
            indexed_containers_are_cosmetic: true,
            map_handle_len_counts_pairs: true,
        }
    }
}

/// Options controlling Tibs parse/encode behavior. Currently empty: the
/// parser has no optional-behavior surface beyond what §4.5 fixes, unlike
/// the Nibs side's open questions.
#[derive(Clone, Debug, Default)]
pub struct TibsOptions;

/// An ambient reference table that `Ref(n)` values resolve against,
/// independent of any particular `Scope` (§3, §6 `register_ref`).
#[derive(Clone, Debug, Default)]
pub struct RefTable {
    entries: Vec<Option<Value>>,
}

impl RefTable {
    /// An empty table.
    pub fn new() -> RefTable {
        RefTable::default()
    }

    /// Registers `value` at `index`, growing the table with unset slots as
    /// needed.
    pub fn register_ref(&mut self, index: u64, value: Value) {
        let index = index as usize;
        if index >= self.entries.len() {
            self.entries.resize(index + 1, None);
        }
        self.entries[index] = Some(value);
    }

    /// Resolves `index`, if it has been registered.
    pub fn resolve(&self, index: u64) -> Option<&Value> {
        self.entries.get(index as usize).and_then(|v| v.as_ref())
    }

    /// Builds a table from a `Scope`'s own ref vector, where ref `n`
    /// resolves to `refs[n]`.
    pub fn from_scope_refs(refs: &[Value]) -> RefTable {
        let mut table = RefTable::new();
        for (i, v) in refs.iter().enumerate() {
            table.register_ref(i as u64, v.clone());
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_spec_decisions() {
        let opts = NibsOptions::default();
        assert!(opts.indexed_containers_are_cosmetic);
        assert!(opts.map_handle_len_counts_pairs);
    }

    #[test]
    fn ref_table_resolves_registered_entries() {
        let mut table = RefTable::new();
        table.register_ref(2, Value::Int(42));
        assert_eq!(table.resolve(2), Some(&Value::Int(42)));
        assert_eq!(table.resolve(0), None);
        assert_eq!(table.resolve(99), None);
    }

    #[test]
    fn from_scope_refs_indexes_by_position() {
        let refs = vec![Value::Int(1), Value::Int(2)];
        let table = RefTable::from_scope_refs(&refs);
        assert_eq!(table.resolve(0), Some(&Value::Int(1)));
        assert_eq!(table.resolve(1), Some(&Value::Int(2)));
    }
}
