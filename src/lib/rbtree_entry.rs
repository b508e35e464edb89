use crate::rbtree_node::{Link, NodePtr};
use crate::{Lesser, RbTreeMap};
use std::mem;

/// A single-walk view of one key's slot, occupied or not.
///
/// Produced by `RbTreeMap::entry`. The search runs once; whichever way
/// it went, the entry can then read, overwrite, fill, or remove the
/// slot without walking the tree again.
pub enum Entry<'a, K, V, L> {
    /// The key is present.
    Occupied(OccupiedEntry<'a, K, V, L>),
    /// The key is absent.
    Vacant(VacantEntry<'a, K, V, L>),
}

impl<'a, K, V, L: Lesser<K>> Entry<'a, K, V, L> {
    /// The value for the key, inserting `default` if the slot is vacant.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// The value for the key, inserting `default()` if the slot is
    /// vacant.
    pub fn or_insert_with<F: FnOnce() -> V>(self, default: F) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Like `or_insert_with`, passing the key to the default closure.
    pub fn or_insert_with_key<F: FnOnce(&K) -> V>(self, default: F) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let value = default(entry.key());
                entry.insert(value)
            }
        }
    }
}

impl<'a, K, V: Default, L: Lesser<K>> Entry<'a, K, V, L> {
    /// The value for the key, inserting the default value if the slot is
    /// vacant.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }
}

impl<K, V, L> Entry<'_, K, V, L> {
    /// The entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }

    /// Applies `f` to the value if the slot is occupied.
    pub fn and_modify<F: FnOnce(&mut V)>(self, f: F) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            vacant => vacant,
        }
    }
}

/// An occupied slot: a key together with its node.
pub struct OccupiedEntry<'a, K, V, L> {
    map: &'a mut RbTreeMap<K, V, L>,
    node: NodePtr<K, V>,
}

impl<'a, K, V, L> OccupiedEntry<'a, K, V, L> {
    pub(super) fn new(map: &'a mut RbTreeMap<K, V, L>, node: NodePtr<K, V>) -> Self {
        OccupiedEntry { map, node }
    }

    /// The stored key.
    pub fn key(&self) -> &K {
        unsafe { self.node.key() }
    }

    /// The stored value.
    pub fn get(&self) -> &V {
        unsafe { self.node.value() }
    }

    /// Mutable access to the stored value, bounded by the entry.
    pub fn get_mut(&mut self) -> &mut V {
        unsafe { self.node.value_mut() }
    }

    /// Mutable access to the stored value for the map borrow's lifetime.
    pub fn into_mut(self) -> &'a mut V {
        unsafe { self.node.value_mut() }
    }

    /// Replaces the stored value, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        mem::replace(self.get_mut(), value)
    }

    /// Removes the entry, returning its value.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Removes the entry, returning the stored pair.
    pub fn remove_entry(self) -> (K, V) {
        unsafe { self.map.remove_node(self.node) }
    }
}

/// A vacant slot: the key to insert and where its node would hang.
pub struct VacantEntry<'a, K, V, L> {
    map: &'a mut RbTreeMap<K, V, L>,
    parent: Link<K, V>,
    key: K,
}

impl<'a, K, V, L> VacantEntry<'a, K, V, L> {
    pub(super) fn new(map: &'a mut RbTreeMap<K, V, L>, parent: Link<K, V>, key: K) -> Self {
        VacantEntry { map, parent, key }
    }

    /// The key that would be inserted.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes the key back without inserting.
    pub fn into_key(self) -> K {
        self.key
    }
}

impl<'a, K, V, L: Lesser<K>> VacantEntry<'a, K, V, L> {
    /// Fills the slot with `value` and returns a reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let node = self.map.attach(self.parent, self.key, value);
        unsafe { node.value_mut() }
    }
}
