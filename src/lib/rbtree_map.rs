//! A red-black tree map implementation.
//!
//! An ordered associative container with logarithmic point operations,
//! bidirectional in-order iteration, range queries, cursors over tree
//! positions, and value-semantics deep cloning.
#![warn(missing_docs)]

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop};
use std::ops::{Bound, Index, RangeBounds};
use std::ptr;

mod error;
mod lesser;
mod rbtree_cursor;
mod rbtree_entry;
mod rbtree_iter;
mod rbtree_node;

pub use error::{TreeError, UnorderedKeyError};
pub use lesser::{Lesser, NaturalOrder};
pub use rbtree_cursor::{Cursor, CursorMut};
pub use rbtree_entry::{Entry, OccupiedEntry, VacantEntry};
pub use rbtree_iter::{IntoIter, Iter, IterMut, Keys, Range, RangeMut, Values, ValuesMut};

use rbtree_node::{link_is_black, link_is_red, Color, Link, Node, NodePtr};

/// An ordered map backed by a red-black tree.
///
/// Keys are unique under the ordering `L` and iteration visits them in
/// ascending order. Point operations are O(log n); the minimum and maximum
/// nodes are cached, so both ends of the map are reachable in O(1).
///
/// Inserting a key that is already present keeps the first value: `insert`
/// never overwrites. Overwriting is an explicit operation through
/// `get_mut`, `entry`, or a mutable cursor.
pub struct RbTreeMap<K, V, L = NaturalOrder> {
    root: Link<K, V>,
    first: Link<K, V>,
    last: Link<K, V>,
    length: usize,
    lesser: L,
    marker: PhantomData<Box<Node<K, V>>>,
}

unsafe impl<K: Send, V: Send, L: Send> Send for RbTreeMap<K, V, L> {}
unsafe impl<K: Sync, V: Sync, L: Sync> Sync for RbTreeMap<K, V, L> {}

/// Result of the insertion walk: the matching node, or the node a fresh
/// leaf would hang under.
enum SlotSearch<K, V> {
    Occupied(NodePtr<K, V>),
    Vacant(Link<K, V>),
}

impl<K, V> RbTreeMap<K, V> {
    /// Creates an empty map ordered by the keys' natural order.
    pub fn new() -> Self {
        Self::with_lesser(NaturalOrder)
    }
}

impl<K, V, L> RbTreeMap<K, V, L> {
    /// Creates an empty map ordered by `lesser`.
    pub fn with_lesser(lesser: L) -> Self {
        RbTreeMap {
            root: None,
            first: None,
            last: None,
            length: 0,
            lesser,
            marker: PhantomData,
        }
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.length
    }
    /// Returns true if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Theoretical upper bound on the number of elements, limited by the
    /// address space available for node allocations.
    pub fn max_len(&self) -> usize {
        isize::MAX as usize / mem::size_of::<Node<K, V>>()
    }

    /// Returns a reference to the ordering the map was built with.
    pub fn lesser(&self) -> &L {
        &self.lesser
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        let root = self.root.take();
        self.first = None;
        self.last = None;
        self.length = 0;
        if let Some(root) = root {
            unsafe { root.drop_subtree() };
        }
    }

    /// Iterator over the entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.first, self.last, self.length)
    }

    /// Iterator over the entries with mutable values, in ascending key
    /// order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(self.first, self.last, self.length)
    }

    /// Iterator over the keys in ascending order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Iterator over the values, in ascending order of their keys.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Iterator over mutable values, in ascending order of their keys.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    /// The minimum-key entry, in O(1).
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.first.map(|node| unsafe { node.key_value() })
    }

    /// The maximum-key entry, in O(1).
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.last.map(|node| unsafe { node.key_value() })
    }

    /// Removes and returns the minimum-key entry.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let node = self.first?;
        Some(unsafe { self.remove_node(node) })
    }

    /// Removes and returns the maximum-key entry.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let node = self.last?;
        Some(unsafe { self.remove_node(node) })
    }

    // ---- structural surgery (no key comparisons below this line) ----

    /// Replaces the subtree rooted at `old` with the one rooted at `new`
    /// in `old`'s parent, or at the root. `old` keeps its own links.
    unsafe fn transplant(&mut self, old: NodePtr<K, V>, new: Link<K, V>) {
        let parent = old.parent();
        if let Some(new) = new {
            new.set_parent(parent);
        }
        match parent {
            None => self.root = new,
            Some(parent) => {
                if parent.left() == Some(old) {
                    parent.set_left(new);
                } else {
                    parent.set_right(new);
                }
            }
        }
    }

    /// Left-rotation around `x`: `x`'s right child takes `x`'s place and
    /// `x` becomes its left child. In-order sequence is unchanged.
    unsafe fn rotate_left(&mut self, x: NodePtr<K, V>) {
        let y = x.right().unwrap();
        let inner = y.left();
        x.set_right(inner);
        if let Some(inner) = inner {
            inner.set_parent(Some(x));
        }
        self.transplant(x, Some(y));
        y.set_left(Some(x));
        x.set_parent(Some(y));
    }

    /// Mirror of `rotate_left`.
    unsafe fn rotate_right(&mut self, x: NodePtr<K, V>) {
        let y = x.left().unwrap();
        let inner = y.right();
        x.set_left(inner);
        if let Some(inner) = inner {
            inner.set_parent(Some(x));
        }
        self.transplant(x, Some(y));
        y.set_right(Some(x));
        x.set_parent(Some(y));
    }

    /// Restores the color invariants after `node` was attached as a red
    /// leaf.
    unsafe fn insert_fixup(&mut self, mut node: NodePtr<K, V>) {
        while let Some(parent) = node.parent() {
            if parent.is_black() {
                break;
            }
            // A red parent is never the root, so the grandparent exists.
            let grandparent = parent.parent().unwrap();
            node = if Some(parent) == grandparent.left() {
                self.insert_fixup_left(node, parent, grandparent)
            } else {
                self.insert_fixup_right(node, parent, grandparent)
            };
        }
        if let Some(root) = self.root {
            root.set_color(Color::Black);
        }
    }

    // `parent` is the grandparent's left child. Returns the node to
    // continue fixing from.
    unsafe fn insert_fixup_left(
        &mut self,
        mut node: NodePtr<K, V>,
        mut parent: NodePtr<K, V>,
        grandparent: NodePtr<K, V>,
    ) -> NodePtr<K, V> {
        let uncle = grandparent.right();
        if link_is_red(uncle) {
            parent.set_color(Color::Black);
            uncle.unwrap().set_color(Color::Black);
            grandparent.set_color(Color::Red);
            grandparent
        } else {
            if Some(node) == parent.right() {
                // Inner child: rotate to the outer case first.
                node = parent;
                self.rotate_left(node);
                parent = node.parent().unwrap();
            }
            parent.set_color(Color::Black);
            grandparent.set_color(Color::Red);
            self.rotate_right(grandparent);
            node
        }
    }

    // Mirror of `insert_fixup_left`.
    unsafe fn insert_fixup_right(
        &mut self,
        mut node: NodePtr<K, V>,
        mut parent: NodePtr<K, V>,
        grandparent: NodePtr<K, V>,
    ) -> NodePtr<K, V> {
        let uncle = grandparent.left();
        if link_is_red(uncle) {
            parent.set_color(Color::Black);
            uncle.unwrap().set_color(Color::Black);
            grandparent.set_color(Color::Red);
            grandparent
        } else {
            if Some(node) == parent.left() {
                node = parent;
                self.rotate_right(node);
                parent = node.parent().unwrap();
            }
            parent.set_color(Color::Black);
            grandparent.set_color(Color::Red);
            self.rotate_left(grandparent);
            node
        }
    }

    /// Unlinks `z`, rebalances, updates the end caches, frees the node and
    /// returns its pair. Every other node keeps its address: a two-child
    /// erase splices the successor node into `z`'s structural slot rather
    /// than moving its key and value.
    unsafe fn remove_node(&mut self, z: NodePtr<K, V>) -> (K, V) {
        // Replacement ends are derived while the tree is still intact.
        if self.first == Some(z) {
            self.first = z.successor();
        }
        if self.last == Some(z) {
            self.last = z.predecessor();
        }

        let mut removed_color = z.color();
        let x: Link<K, V>;
        let x_parent: Link<K, V>;

        match (z.left(), z.right()) {
            (None, right) => {
                x = right;
                x_parent = z.parent();
                self.transplant(z, right);
            }
            (left @ Some(_), None) => {
                x = left;
                x_parent = z.parent();
                self.transplant(z, left);
            }
            (Some(z_left), Some(z_right)) => {
                let y = z_right.min();
                removed_color = y.color();
                x = y.right();
                if y.parent() == Some(z) {
                    x_parent = Some(y);
                } else {
                    x_parent = y.parent();
                    self.transplant(y, y.right());
                    y.set_right(Some(z_right));
                    z_right.set_parent(Some(y));
                }
                self.transplant(z, Some(y));
                y.set_left(Some(z_left));
                z_left.set_parent(Some(y));
                y.set_color(z.color());
            }
        }

        if removed_color == Color::Black {
            self.erase_fixup(x, x_parent);
        }
        self.length -= 1;
        z.dealloc()
    }

    /// Restores the black-height invariant after a black node was
    /// unlinked. `x` carries the extra blackness and may be absent (an
    /// absent node counts as black), so its parent is tracked separately.
    unsafe fn erase_fixup(&mut self, mut x: Link<K, V>, mut parent: Link<K, V>) {
        while x != self.root && link_is_black(x) {
            let p = parent.unwrap();
            let (next_x, next_parent) = if x == p.left() {
                self.erase_fixup_left(p)
            } else {
                self.erase_fixup_right(p)
            };
            x = next_x;
            parent = next_parent;
        }
        if let Some(x) = x {
            x.set_color(Color::Black);
        }
    }

    // The deficient side is `parent`'s left. Returns the position to
    // continue from; the caller's loop stops at a red node or the root.
    unsafe fn erase_fixup_left(&mut self, parent: NodePtr<K, V>) -> (Link<K, V>, Link<K, V>) {
        // A black deficit on one side implies a sibling on the other.
        let mut sibling = parent.right().unwrap();
        if sibling.is_red() {
            sibling.set_color(Color::Black);
            parent.set_color(Color::Red);
            self.rotate_left(parent);
            sibling = parent.right().unwrap();
        }
        if link_is_black(sibling.left()) && link_is_black(sibling.right()) {
            sibling.set_color(Color::Red);
            (Some(parent), parent.parent())
        } else {
            if link_is_black(sibling.right()) {
                if let Some(near) = sibling.left() {
                    near.set_color(Color::Black);
                }
                sibling.set_color(Color::Red);
                self.rotate_right(sibling);
                sibling = parent.right().unwrap();
            }
            sibling.set_color(parent.color());
            parent.set_color(Color::Black);
            if let Some(far) = sibling.right() {
                far.set_color(Color::Black);
            }
            self.rotate_left(parent);
            (self.root, None)
        }
    }

    // Mirror of `erase_fixup_left`.
    unsafe fn erase_fixup_right(&mut self, parent: NodePtr<K, V>) -> (Link<K, V>, Link<K, V>) {
        let mut sibling = parent.left().unwrap();
        if sibling.is_red() {
            sibling.set_color(Color::Black);
            parent.set_color(Color::Red);
            self.rotate_right(parent);
            sibling = parent.left().unwrap();
        }
        if link_is_black(sibling.left()) && link_is_black(sibling.right()) {
            sibling.set_color(Color::Red);
            (Some(parent), parent.parent())
        } else {
            if link_is_black(sibling.left()) {
                if let Some(near) = sibling.right() {
                    near.set_color(Color::Black);
                }
                sibling.set_color(Color::Red);
                self.rotate_left(sibling);
                sibling = parent.left().unwrap();
            }
            sibling.set_color(parent.color());
            parent.set_color(Color::Black);
            if let Some(far) = sibling.left() {
                far.set_color(Color::Black);
            }
            self.rotate_right(parent);
            (self.root, None)
        }
    }
}

impl<K, V, L: Lesser<K>> RbTreeMap<K, V, L> {
    fn find_node<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        let mut current = self.root;
        while let Some(node) = current {
            let node_key = unsafe { node.key() }.borrow();
            current = if self.lesser.lesser(key, node_key) {
                unsafe { node.left() }
            } else if self.lesser.lesser(node_key, key) {
                unsafe { node.right() }
            } else {
                return Some(node);
            };
        }
        None
    }

    /// Returns a reference to the value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        self.find_node(key).map(|node| unsafe { node.value() })
    }

    /// Returns a mutable reference to the value for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        self.find_node(key).map(|node| unsafe { node.value_mut() })
    }

    /// Returns the stored entry for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        self.find_node(key).map(|node| unsafe { node.key_value() })
    }

    /// Returns true if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        self.find_node(key).is_some()
    }

    /// Like `get`, but a missing key is an error rather than `None`.
    pub fn try_get<Q>(&self, key: &Q) -> Result<&V, TreeError>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        self.get(key).ok_or(TreeError::KeyNotFound)
    }

    /// Like `get_mut`, but a missing key is an error rather than `None`.
    pub fn try_get_mut<Q>(&mut self, key: &Q) -> Result<&mut V, TreeError>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        self.get_mut(key).ok_or(TreeError::KeyNotFound)
    }

    fn lower_bound_node<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        let mut best = None;
        let mut current = self.root;
        while let Some(node) = current {
            if self.lesser.lesser(unsafe { node.key() }.borrow(), key) {
                current = unsafe { node.right() };
            } else {
                best = Some(node);
                current = unsafe { node.left() };
            }
        }
        best
    }

    fn upper_bound_node<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        let mut best = None;
        let mut current = self.root;
        while let Some(node) = current {
            if self.lesser.lesser(key, unsafe { node.key() }.borrow()) {
                best = Some(node);
                current = unsafe { node.left() };
            } else {
                current = unsafe { node.right() };
            }
        }
        best
    }

    /// Cursor at the first element whose key is not less than `key`, or at
    /// the end position if every key is less.
    pub fn lower_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V, L>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        Cursor::new(self, self.lower_bound_node(key))
    }

    /// Cursor at the first element whose key is greater than `key`, or at
    /// the end position if no key is greater.
    pub fn upper_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V, L>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        Cursor::new(self, self.upper_bound_node(key))
    }

    /// Mutable cursor at the first element whose key is not less than
    /// `key`, or at the end position if every key is less.
    pub fn lower_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V, L>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        let node = self.lower_bound_node(key);
        CursorMut::new(self, node)
    }

    /// Mutable cursor at the first element whose key is greater than
    /// `key`, or at the end position if no key is greater.
    pub fn upper_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V, L>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        let node = self.upper_bound_node(key);
        CursorMut::new(self, node)
    }

    // Resolves a key range to its first and last node. Either both ends
    // are nodes or both are `None`.
    fn range_endpoints<Q, R>(&self, range: &R) -> (Link<K, V>, Link<K, V>)
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
        R: RangeBounds<Q>,
    {
        let start = range.start_bound();
        let end = range.end_bound();
        if let (
            Bound::Included(s) | Bound::Excluded(s),
            Bound::Included(e) | Bound::Excluded(e),
        ) = (start, end)
        {
            if self.lesser.lesser(e, s) {
                panic!("range start is greater than range end");
            }
            if matches!((start, end), (Bound::Excluded(_), Bound::Excluded(_)))
                && !self.lesser.lesser(s, e)
            {
                panic!("range start and end are equal and excluded");
            }
        }

        let front = match start {
            Bound::Included(key) => self.lower_bound_node(key),
            Bound::Excluded(key) => self.upper_bound_node(key),
            Bound::Unbounded => self.first,
        };
        let back = match end {
            Bound::Included(key) => match self.upper_bound_node(key) {
                Some(node) => unsafe { node.predecessor() },
                None => self.last,
            },
            Bound::Excluded(key) => match self.lower_bound_node(key) {
                Some(node) => unsafe { node.predecessor() },
                None => self.last,
            },
            Bound::Unbounded => self.last,
        };
        match (front, back) {
            (Some(front), Some(back))
                if !self.lesser.lesser(unsafe { back.key() }, unsafe { front.key() }) =>
            {
                (Some(front), Some(back))
            }
            _ => (None, None),
        }
    }

    /// Iterator over the entries whose keys lie in `range`. A single-key
    /// range (`k..=k`) spans at most one element, since keys are unique.
    ///
    /// Panics if the range's start is greater than its end, or if both
    /// bounds exclude one equal key.
    pub fn range<Q, R>(&self, range: R) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
        R: RangeBounds<Q>,
    {
        let (front, back) = self.range_endpoints(&range);
        Range::new(front, back)
    }

    /// Like `range`, with mutable values.
    ///
    /// Panics under the same conditions as `range`.
    pub fn range_mut<Q, R>(&mut self, range: R) -> RangeMut<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
        R: RangeBounds<Q>,
    {
        let (front, back) = self.range_endpoints(&range);
        RangeMut::new(front, back)
    }

    fn locate_slot(&self, key: &K) -> SlotSearch<K, V> {
        let mut parent = None;
        let mut current = self.root;
        while let Some(node) = current {
            let node_key = unsafe { node.key() };
            current = if self.lesser.lesser(key, node_key) {
                parent = Some(node);
                unsafe { node.left() }
            } else if self.lesser.lesser(node_key, key) {
                parent = Some(node);
                unsafe { node.right() }
            } else {
                return SlotSearch::Occupied(node);
            };
        }
        SlotSearch::Vacant(parent)
    }

    /// Attaches a fresh leaf under `parent` (`None` attaches the root),
    /// updates the end caches and rebalances. The node is fully built
    /// before any existing link changes.
    fn attach(&mut self, parent: Link<K, V>, key: K, value: V) -> NodePtr<K, V> {
        let node = NodePtr::alloc(key, value, parent);
        unsafe {
            match parent {
                None => {
                    node.set_color(Color::Black);
                    self.root = Some(node);
                    self.first = Some(node);
                    self.last = Some(node);
                }
                Some(parent) => {
                    if self.lesser.lesser(node.key(), parent.key()) {
                        debug_assert!(parent.left().is_none());
                        parent.set_left(Some(node));
                        if self.first == Some(parent) {
                            self.first = Some(node);
                        }
                    } else {
                        debug_assert!(parent.right().is_none());
                        parent.set_right(Some(node));
                        if self.last == Some(parent) {
                            self.last = Some(node);
                        }
                    }
                    self.insert_fixup(node);
                }
            }
        }
        self.length += 1;
        node
    }

    /// Inserts `key → value` if the key is not already present and returns
    /// whether it was inserted.
    ///
    /// The first insertion of a key wins: when an equal key exists, the map
    /// is left unchanged, `value` is dropped, and `false` comes back. Use
    /// `entry` or `get_mut` to overwrite.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        match self.locate_slot(&key) {
            SlotSearch::Occupied(_) => false,
            SlotSearch::Vacant(parent) => {
                self.attach(parent, key, value);
                true
            }
        }
    }

    // Append fast path for sorted runs: a key above the current maximum
    // attaches under the cached rightmost node without a root walk.
    fn insert_last_or_walk(&mut self, key: K, value: V) -> bool {
        if let Some(last) = self.last {
            if self.lesser.lesser(unsafe { last.key() }, &key) {
                self.attach(Some(last), key, value);
                return true;
            }
        }
        self.insert(key, value)
    }

    /// Single-walk find-or-insert position for `key`.
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, L> {
        match self.locate_slot(&key) {
            SlotSearch::Occupied(node) => Entry::Occupied(OccupiedEntry::new(self, node)),
            SlotSearch::Vacant(parent) => Entry::Vacant(VacantEntry::new(self, parent, key)),
        }
    }

    /// Removes `key`'s entry, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes `key`'s entry, returning the stored pair.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
    {
        let node = self.find_node(key)?;
        Some(unsafe { self.remove_node(node) })
    }

    /// Removes every entry whose key lies in `range` and returns how many
    /// were removed. Removing the full range is an O(1) structural reset;
    /// otherwise the range is erased front to back, re-deriving each
    /// successor before the removal that could disturb it.
    ///
    /// Panics under the same conditions as `range`.
    pub fn remove_range<Q, R>(&mut self, range: R) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized,
        L: Lesser<Q>,
        R: RangeBounds<Q>,
    {
        let (front, back) = self.range_endpoints(&range);
        let (Some(front), Some(back)) = (front, back) else {
            return 0;
        };
        if Some(front) == self.first && Some(back) == self.last {
            let removed = self.length;
            self.clear();
            return removed;
        }
        let stop = unsafe { back.successor() };
        let mut current = Some(front);
        let mut removed = 0;
        while let Some(node) = current {
            if Some(node) == stop {
                break;
            }
            current = unsafe { node.successor() };
            unsafe { self.remove_node(node) };
            removed += 1;
        }
        removed
    }
}

impl<K, V, L: Default> Default for RbTreeMap<K, V, L> {
    fn default() -> Self {
        Self::with_lesser(L::default())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, L> fmt::Debug for RbTreeMap<K, V, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone, V: Clone, L: Clone> Clone for RbTreeMap<K, V, L> {
    fn clone(&self) -> Self {
        let mut clone = RbTreeMap::with_lesser(self.lesser.clone());
        let Some(src_root) = self.root else {
            return clone;
        };
        unsafe {
            let dst_root = NodePtr::alloc(src_root.key().clone(), src_root.value().clone(), None);
            dst_root.set_color(src_root.color());
            // Linked before the recursion: should a clone panic midway, the
            // partial graph is owned and freed by `clone`'s drop.
            clone.root = Some(dst_root);
            dst_root.clone_children_from(src_root);
            clone.first = Some(dst_root.min());
            clone.last = Some(dst_root.max());
        }
        clone.length = self.length;
        clone
    }
}

impl<K: PartialEq, V: PartialEq, L> PartialEq for RbTreeMap<K, V, L> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, L> Eq for RbTreeMap<K, V, L> {}

impl<K: PartialOrd, V: PartialOrd, L> PartialOrd for RbTreeMap<K, V, L> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K: Ord, V: Ord, L> Ord for RbTreeMap<K, V, L> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K, V, Q, L> Index<&Q> for RbTreeMap<K, V, L>
where
    K: Borrow<Q>,
    Q: ?Sized,
    L: Lesser<K> + Lesser<Q>,
{
    type Output = V;

    /// Read access to `key`'s value; panics if the key is absent.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K, V, L: Lesser<K> + Default> FromIterator<(K, V)> for RbTreeMap<K, V, L> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = RbTreeMap::with_lesser(L::default());
        map.extend(iter);
        map
    }
}

impl<K, V, L: Lesser<K>> Extend<(K, V)> for RbTreeMap<K, V, L> {
    /// Duplicate keys keep their first-inserted value. Input runs sorted
    /// above the current maximum append in amortized O(1) per element.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert_last_or_walk(key, value);
        }
    }
}

impl<K, V, L> IntoIterator for RbTreeMap<K, V, L> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        let this = ManuallyDrop::new(self);
        // The node graph moves into the iterator; the ordering value is
        // dropped here, and the map itself must not run its own drop.
        unsafe { drop(ptr::read(&this.lesser)) };
        IntoIter::new(this.root, this.first, this.last, this.length)
    }
}

impl<'a, K, V, L> IntoIterator for &'a RbTreeMap<K, V, L> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, L> IntoIterator for &'a mut RbTreeMap<K, V, L> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K, V, L> Drop for RbTreeMap<K, V, L> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            unsafe { root.drop_subtree() };
        }
    }
}


#[cfg(test)]
mod prop_tests {
    use super::tests::{check_invariants, compare_with_reference};
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone)]
    enum Op {
        Insert(i32, i32),
        Remove(i32),
        RemoveRange(i32, i32),
        PopFirst,
        PopLast,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (0..200i32, any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
            2 => (0..200i32).prop_map(Op::Remove),
            1 => (0..200i32, 0..32i32).prop_map(|(a, len)| Op::RemoveRange(a, a + len)),
            1 => Just(Op::PopFirst),
            1 => Just(Op::PopLast),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn matches_reference_map(ops in proptest::collection::vec(op_strategy(), 0..200)) {
            let mut map = RbTreeMap::new();
            let mut reference = BTreeMap::new();
            for op in ops {
                match op {
                    Op::Insert(key, value) => {
                        let inserted = map.insert(key, value);
                        prop_assert_eq!(inserted, !reference.contains_key(&key));
                        reference.entry(key).or_insert(value);
                    }
                    Op::Remove(key) => {
                        prop_assert_eq!(map.remove(&key), reference.remove(&key));
                    }
                    Op::RemoveRange(start, end) => {
                        let expected: Vec<i32> =
                            reference.range(start..end).map(|(k, _)| *k).collect();
                        for key in &expected {
                            reference.remove(key);
                        }
                        prop_assert_eq!(map.remove_range(start..end), expected.len());
                    }
                    Op::PopFirst => {
                        prop_assert_eq!(map.pop_first(), reference.pop_first());
                    }
                    Op::PopLast => {
                        prop_assert_eq!(map.pop_last(), reference.pop_last());
                    }
                }
                prop_assert_eq!(map.len(), reference.len());
            }
            check_invariants(&map);
            compare_with_reference(&map, &reference);
        }

        #[test]
        fn iteration_is_strictly_ascending(keys in proptest::collection::vec(any::<i32>(), 0..300)) {
            let mut map = RbTreeMap::new();
            for key in keys {
                map.insert(key, ());
            }
            check_invariants(&map);
            prop_assert!(map.keys().zip(map.keys().skip(1)).all(|(a, b)| a < b));
        }

        #[test]
        fn clone_is_unaffected_by_later_edits(
            entries in proptest::collection::vec((0..100i32, any::<i32>()), 0..100),
            removals in proptest::collection::vec(0..100i32, 0..50),
        ) {
            let mut map: RbTreeMap<i32, i32> = entries.into_iter().collect();
            let snapshot: Vec<(i32, i32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
            let cloned = map.clone();
            for key in removals {
                map.remove(&key);
            }
            check_invariants(&cloned);
            prop_assert!(cloned.iter().map(|(k, v)| (*k, *v)).eq(snapshot.into_iter()));
        }

        #[test]
        fn range_matches_reference(
            entries in proptest::collection::vec((0..100i32, any::<i32>()), 0..100),
            a in 0..100i32,
            len in 0..40i32,
        ) {
            let map: RbTreeMap<i32, i32> = entries.iter().copied().collect();
            let mut reference = BTreeMap::new();
            for (key, value) in entries {
                reference.entry(key).or_insert(value);
            }
            let ours: Vec<(i32, i32)> = map.range(a..a + len).map(|(k, v)| (*k, *v)).collect();
            let expected: Vec<(i32, i32)> =
                reference.range(a..a + len).map(|(k, v)| (*k, *v)).collect();
            prop_assert_eq!(ours, expected);
        }

        #[test]
        fn into_iter_yields_every_entry(
            entries in proptest::collection::vec((0..100i32, any::<i32>()), 0..100),
        ) {
            let map: RbTreeMap<i32, i32> = entries.iter().copied().collect();
            let snapshot: Vec<(i32, i32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
            let owned: Vec<(i32, i32)> = map.into_iter().collect();
            prop_assert_eq!(owned, snapshot);
        }
    }
}
