use crate::rbtree_node::{Link, NodePtr};
use std::iter::FusedIterator;
use std::marker::PhantomData;

/// Borrowing iterator over a map's entries in ascending key order.
pub struct Iter<'a, K, V> {
    front: Link<K, V>,
    back: Link<K, V>,
    // Entries not yet yielded from either end. This is the source of
    // truth for exhaustion; `front` and `back` are cleared when it hits
    // zero so neither end walks past the other.
    remaining: usize,
    marker: PhantomData<(&'a K, &'a V)>,
}

unsafe impl<K: Sync, V: Sync> Send for Iter<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for Iter<'_, K, V> {}

impl<K, V> Iter<'_, K, V> {
    pub(super) fn new(front: Link<K, V>, back: Link<K, V>, remaining: usize) -> Self {
        Iter {
            front,
            back,
            remaining,
            marker: PhantomData,
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            front: self.front,
            back: self.back,
            remaining: self.remaining,
            marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front.unwrap();
        self.remaining -= 1;
        if self.remaining == 0 {
            self.front = None;
            self.back = None;
        } else {
            self.front = unsafe { node.successor() };
        }
        Some(unsafe { node.key_value() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back.unwrap();
        self.remaining -= 1;
        if self.remaining == 0 {
            self.front = None;
            self.back = None;
        } else {
            self.back = unsafe { node.predecessor() };
        }
        Some(unsafe { node.key_value() })
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over a map's entries yielding mutable value references.
pub struct IterMut<'a, K, V> {
    front: Link<K, V>,
    back: Link<K, V>,
    remaining: usize,
    marker: PhantomData<(&'a K, &'a mut V)>,
}

unsafe impl<K: Sync, V: Send> Send for IterMut<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for IterMut<'_, K, V> {}

impl<K, V> IterMut<'_, K, V> {
    pub(super) fn new(front: Link<K, V>, back: Link<K, V>, remaining: usize) -> Self {
        IterMut {
            front,
            back,
            remaining,
            marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front.unwrap();
        self.remaining -= 1;
        if self.remaining == 0 {
            self.front = None;
            self.back = None;
        } else {
            self.front = unsafe { node.successor() };
        }
        Some(unsafe { node.key_value_mut() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back.unwrap();
        self.remaining -= 1;
        if self.remaining == 0 {
            self.front = None;
            self.back = None;
        } else {
            self.back = unsafe { node.predecessor() };
        }
        Some(unsafe { node.key_value_mut() })
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Iterator over a map's keys in ascending order.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(super) fn new(inner: Iter<'a, K, V>) -> Self {
        Keys { inner }
    }
}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(key, _)| key)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Iterator over a map's values in ascending order of their keys.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Values<'a, K, V> {
    pub(super) fn new(inner: Iter<'a, K, V>) -> Self {
        Values { inner }
    }
}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, value)| value)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Iterator over a map's values yielding mutable references.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> ValuesMut<'a, K, V> {
    pub(super) fn new(inner: IterMut<'a, K, V>) -> Self {
        ValuesMut { inner }
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for ValuesMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, value)| value)
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

/// Iterator over the entries of one key range in ascending key order.
pub struct Range<'a, K, V> {
    // Both ends inclusive; either both set or both cleared.
    front: Link<K, V>,
    back: Link<K, V>,
    marker: PhantomData<(&'a K, &'a V)>,
}

unsafe impl<K: Sync, V: Sync> Send for Range<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for Range<'_, K, V> {}

impl<K, V> Range<'_, K, V> {
    pub(super) fn new(front: Link<K, V>, back: Link<K, V>) -> Self {
        Range {
            front,
            back,
            marker: PhantomData,
        }
    }
}

impl<K, V> Clone for Range<'_, K, V> {
    fn clone(&self) -> Self {
        Range {
            front: self.front,
            back: self.back,
            marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.front?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = unsafe { node.successor() };
        }
        Some(unsafe { node.key_value() })
    }
}

impl<K, V> DoubleEndedIterator for Range<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node = self.back?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = unsafe { node.predecessor() };
        }
        Some(unsafe { node.key_value() })
    }
}

impl<K, V> FusedIterator for Range<'_, K, V> {}

/// Range iterator yielding mutable value references.
pub struct RangeMut<'a, K, V> {
    front: Link<K, V>,
    back: Link<K, V>,
    marker: PhantomData<(&'a K, &'a mut V)>,
}

unsafe impl<K: Sync, V: Send> Send for RangeMut<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for RangeMut<'_, K, V> {}

impl<K, V> RangeMut<'_, K, V> {
    pub(super) fn new(front: Link<K, V>, back: Link<K, V>) -> Self {
        RangeMut {
            front,
            back,
            marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for RangeMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.front?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = unsafe { node.successor() };
        }
        Some(unsafe { node.key_value_mut() })
    }
}

impl<K, V> DoubleEndedIterator for RangeMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node = self.back?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = unsafe { node.predecessor() };
        }
        Some(unsafe { node.key_value_mut() })
    }
}

impl<K, V> FusedIterator for RangeMut<'_, K, V> {}

/// Owning iterator over a map's entries in ascending key order.
///
/// Nodes are unlinked and freed as they are yielded, without
/// rebalancing; whatever remains when the iterator is dropped is freed
/// in one pass.
pub struct IntoIter<K, V> {
    root: Link<K, V>,
    front: Link<K, V>,
    back: Link<K, V>,
    remaining: usize,
}

unsafe impl<K: Send, V: Send> Send for IntoIter<K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for IntoIter<K, V> {}

impl<K, V> IntoIter<K, V> {
    pub(super) fn new(
        root: Link<K, V>,
        front: Link<K, V>,
        back: Link<K, V>,
        remaining: usize,
    ) -> Self {
        IntoIter {
            root,
            front,
            back,
            remaining,
        }
    }

    // Unlinks the tree minimum. Its right subtree takes its place; no
    // recoloring, since only in-order extraction follows.
    unsafe fn detach_min(&mut self, node: NodePtr<K, V>) {
        debug_assert!(node.left().is_none());
        let right = node.right();
        if let Some(right) = right {
            right.set_parent(node.parent());
        }
        match node.parent() {
            None => self.root = right,
            // The minimum is its parent's left child.
            Some(parent) => parent.set_left(right),
        }
    }

    // Mirror of `detach_min` for the tree maximum.
    unsafe fn detach_max(&mut self, node: NodePtr<K, V>) {
        debug_assert!(node.right().is_none());
        let left = node.left();
        if let Some(left) = left {
            left.set_parent(node.parent());
        }
        match node.parent() {
            None => self.root = left,
            Some(parent) => parent.set_right(left),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front.unwrap();
        // The successor is read while the node is still linked.
        let next = unsafe { node.successor() };
        unsafe { self.detach_min(node) };
        self.remaining -= 1;
        if self.remaining == 0 {
            self.front = None;
            self.back = None;
        } else {
            self.front = next;
        }
        Some(unsafe { node.dealloc() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back.unwrap();
        let prev = unsafe { node.predecessor() };
        unsafe { self.detach_max(node) };
        self.remaining -= 1;
        if self.remaining == 0 {
            self.front = None;
            self.back = None;
        } else {
            self.back = prev;
        }
        Some(unsafe { node.dealloc() })
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K, V> Drop for IntoIter<K, V> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            unsafe { root.drop_subtree() };
        }
    }
}
