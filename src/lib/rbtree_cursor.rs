use crate::rbtree_node::Link;
use crate::{Lesser, RbTreeMap, UnorderedKeyError};

/// A read-only position in a map: either one element or the end.
///
/// The end position sits past the maximum element. Movement is cyclic
/// through it, so `move_next` at the end lands on the first element and
/// `move_prev` at the end lands on the last. A cursor on an element is
/// unaffected by how it was obtained; it stays valid as long as the map
/// is borrowed.
pub struct Cursor<'a, K, V, L> {
    map: &'a RbTreeMap<K, V, L>,
    current: Link<K, V>,
}

impl<'a, K, V, L> Cursor<'a, K, V, L> {
    pub(super) fn new(map: &'a RbTreeMap<K, V, L>, current: Link<K, V>) -> Self {
        Cursor { map, current }
    }

    /// The key under the cursor, or `None` at the end position.
    pub fn key(&self) -> Option<&'a K> {
        self.current.map(|node| unsafe { node.key() })
    }

    /// The value under the cursor, or `None` at the end position.
    pub fn value(&self) -> Option<&'a V> {
        self.current.map(|node| unsafe { node.value() })
    }

    /// The entry under the cursor, or `None` at the end position.
    pub fn key_value(&self) -> Option<(&'a K, &'a V)> {
        self.current.map(|node| unsafe { node.key_value() })
    }

    /// Moves to the next element in key order, or from the last element
    /// to the end, or from the end to the first element.
    pub fn move_next(&mut self) {
        self.current = match self.current {
            Some(node) => unsafe { node.successor() },
            None => self.map.first,
        };
    }

    /// Moves to the previous element in key order, or from the first
    /// element to the end, or from the end to the last element.
    pub fn move_prev(&mut self) {
        self.current = match self.current {
            Some(node) => unsafe { node.predecessor() },
            None => self.map.last,
        };
    }

    /// The entry after the cursor without moving it; from the end
    /// position this is the first entry.
    pub fn peek_next(&self) -> Option<(&'a K, &'a V)> {
        let node = match self.current {
            Some(node) => unsafe { node.successor() },
            None => self.map.first,
        };
        node.map(|node| unsafe { node.key_value() })
    }

    /// The entry before the cursor without moving it; from the end
    /// position this is the last entry.
    pub fn peek_prev(&self) -> Option<(&'a K, &'a V)> {
        let node = match self.current {
            Some(node) => unsafe { node.predecessor() },
            None => self.map.last,
        };
        node.map(|node| unsafe { node.key_value() })
    }
}

impl<K, V, L> Clone for Cursor<'_, K, V, L> {
    fn clone(&self) -> Self {
        Cursor {
            map: self.map,
            current: self.current,
        }
    }
}

/// A mutable position in a map: either one element or the end.
///
/// Shares `Cursor`'s cyclic movement. On top of reading and moving, a
/// mutable cursor edits the map at its position: removing the current
/// element or splicing a new one in next to it. Removing an element
/// never relocates the others, so the cursor's new position is the
/// removed element's untouched successor.
pub struct CursorMut<'a, K, V, L> {
    map: &'a mut RbTreeMap<K, V, L>,
    current: Link<K, V>,
}

impl<'a, K, V, L> CursorMut<'a, K, V, L> {
    pub(super) fn new(map: &'a mut RbTreeMap<K, V, L>, current: Link<K, V>) -> Self {
        CursorMut { map, current }
    }

    /// The key under the cursor, or `None` at the end position.
    pub fn key(&self) -> Option<&K> {
        self.current.map(|node| unsafe { node.key() })
    }

    /// The value under the cursor, or `None` at the end position.
    pub fn value(&self) -> Option<&V> {
        self.current.map(|node| unsafe { node.value() })
    }

    /// Mutable access to the value under the cursor.
    pub fn value_mut(&mut self) -> Option<&mut V> {
        self.current.map(|node| unsafe { node.value_mut() })
    }

    /// The entry under the cursor, or `None` at the end position.
    pub fn key_value(&self) -> Option<(&K, &V)> {
        self.current.map(|node| unsafe { node.key_value() })
    }

    /// Moves to the next element in key order, or from the last element
    /// to the end, or from the end to the first element.
    pub fn move_next(&mut self) {
        self.current = match self.current {
            Some(node) => unsafe { node.successor() },
            None => self.map.first,
        };
    }

    /// Moves to the previous element in key order, or from the first
    /// element to the end, or from the end to the last element.
    pub fn move_prev(&mut self) {
        self.current = match self.current {
            Some(node) => unsafe { node.predecessor() },
            None => self.map.last,
        };
    }

    /// A read-only cursor at the same position, borrowing this one.
    pub fn as_cursor(&self) -> Cursor<'_, K, V, L> {
        Cursor::new(self.map, self.current)
    }

    /// Removes the element under the cursor and returns its entry. The
    /// cursor moves to the removed element's successor, or to the end if
    /// the maximum was removed. At the end position nothing is removed.
    pub fn remove_current(&mut self) -> Option<(K, V)> {
        let node = self.current?;
        self.current = unsafe { node.successor() };
        Some(unsafe { self.map.remove_node(node) })
    }
}

impl<K, V, L: Lesser<K>> CursorMut<'_, K, V, L> {
    /// Inserts an entry immediately before the cursor, leaving the
    /// cursor where it is. At the end position the entry is appended as
    /// the new maximum, in O(1).
    ///
    /// The key must sort strictly between the element before the cursor
    /// and the cursor itself, otherwise nothing is inserted and
    /// `UnorderedKeyError` comes back.
    pub fn insert_before(&mut self, key: K, value: V) -> Result<(), UnorderedKeyError> {
        match self.current {
            Some(current) => {
                let current_key = unsafe { current.key() };
                if !self.map.lesser.lesser(&key, current_key) {
                    return Err(UnorderedKeyError);
                }
                match unsafe { current.predecessor() } {
                    None => {
                        // New minimum; the slot left of `current` is free.
                        self.map.attach(Some(current), key, value);
                    }
                    Some(prev) => {
                        if !self.map.lesser.lesser(unsafe { prev.key() }, &key) {
                            return Err(UnorderedKeyError);
                        }
                        // A predecessor below `current` has no right
                        // child; otherwise `current`'s left slot is free.
                        if unsafe { current.left() }.is_none() {
                            self.map.attach(Some(current), key, value);
                        } else {
                            self.map.attach(Some(prev), key, value);
                        }
                    }
                }
                Ok(())
            }
            None => match self.map.last {
                Some(last) => {
                    if !self.map.lesser.lesser(unsafe { last.key() }, &key) {
                        return Err(UnorderedKeyError);
                    }
                    self.map.attach(Some(last), key, value);
                    Ok(())
                }
                None => {
                    self.map.attach(None, key, value);
                    Ok(())
                }
            },
        }
    }

    /// Inserts an entry immediately after the cursor, leaving the cursor
    /// where it is.
    ///
    /// The key must sort strictly between the cursor and the element
    /// after it. The end position has no "after", so inserting there is
    /// also `UnorderedKeyError`.
    pub fn insert_after(&mut self, key: K, value: V) -> Result<(), UnorderedKeyError> {
        let Some(current) = self.current else {
            return Err(UnorderedKeyError);
        };
        if !self.map.lesser.lesser(unsafe { current.key() }, &key) {
            return Err(UnorderedKeyError);
        }
        match unsafe { current.successor() } {
            None => {
                // New maximum; the slot right of `current` is free.
                self.map.attach(Some(current), key, value);
            }
            Some(next) => {
                if !self.map.lesser.lesser(&key, unsafe { next.key() }) {
                    return Err(UnorderedKeyError);
                }
                // A successor below `current` has no left child;
                // otherwise `current`'s right slot is free.
                if unsafe { current.right() }.is_none() {
                    self.map.attach(Some(current), key, value);
                } else {
                    self.map.attach(Some(next), key, value);
                }
            }
        }
        Ok(())
    }
}
