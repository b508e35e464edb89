use std::fmt;
use std::ptr::NonNull;

/// Node color. Absent children count as black.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Color {
    Red,
    Black,
}

/// A possibly-absent node reference; `None` is a null leaf.
pub(super) type Link<K, V> = Option<NodePtr<K, V>>;

pub(super) struct Node<K, V> {
    pub(super) key: K,
    pub(super) value: V,
    pub(super) color: Color,
    pub(super) parent: Link<K, V>,
    pub(super) left: Link<K, V>,
    pub(super) right: Link<K, V>,
}

/// Raw handle to a heap-allocated node.
///
/// A `NodePtr` is only a location: the tree that allocated the node owns it
/// and decides when it is freed. Every accessor is unsafe because the
/// caller must know the node is still allocated and that no conflicting
/// reference to it exists for the duration of the returned borrow.
pub(super) struct NodePtr<K, V>(NonNull<Node<K, V>>);

impl<K, V> Clone for NodePtr<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<K, V> Copy for NodePtr<K, V> {}

impl<K, V> PartialEq for NodePtr<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<K, V> Eq for NodePtr<K, V> {}

impl<K, V> fmt::Debug for NodePtr<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<K, V> NodePtr<K, V> {
    /// Allocates a detached red leaf. The node is complete before the
    /// caller links it anywhere, so a failed allocation cannot leave a
    /// partially inserted node behind in the tree.
    pub(super) fn alloc(key: K, value: V, parent: Link<K, V>) -> Self {
        NodePtr(NonNull::from(Box::leak(Box::new(Node {
            key,
            value,
            color: Color::Red,
            parent,
            left: None,
            right: None,
        }))))
    }

    /// Frees the node, returning its pair. The pointer (and every copy of
    /// it) is dangling afterwards.
    pub(super) unsafe fn dealloc(self) -> (K, V) {
        let node = *Box::from_raw(self.0.as_ptr());
        (node.key, node.value)
    }

    pub(super) unsafe fn color(self) -> Color {
        (*self.0.as_ptr()).color
    }
    pub(super) unsafe fn set_color(self, color: Color) {
        (*self.0.as_ptr()).color = color;
    }
    pub(super) unsafe fn is_red(self) -> bool {
        self.color() == Color::Red
    }
    pub(super) unsafe fn is_black(self) -> bool {
        self.color() == Color::Black
    }

    pub(super) unsafe fn parent(self) -> Link<K, V> {
        (*self.0.as_ptr()).parent
    }
    pub(super) unsafe fn set_parent(self, parent: Link<K, V>) {
        (*self.0.as_ptr()).parent = parent;
    }
    pub(super) unsafe fn left(self) -> Link<K, V> {
        (*self.0.as_ptr()).left
    }
    pub(super) unsafe fn set_left(self, left: Link<K, V>) {
        (*self.0.as_ptr()).left = left;
    }
    pub(super) unsafe fn right(self) -> Link<K, V> {
        (*self.0.as_ptr()).right
    }
    pub(super) unsafe fn set_right(self, right: Link<K, V>) {
        (*self.0.as_ptr()).right = right;
    }

    pub(super) unsafe fn key<'a>(self) -> &'a K {
        &(*self.0.as_ptr()).key
    }
    pub(super) unsafe fn value<'a>(self) -> &'a V {
        &(*self.0.as_ptr()).value
    }
    pub(super) unsafe fn value_mut<'a>(self) -> &'a mut V {
        &mut (*self.0.as_ptr()).value
    }
    pub(super) unsafe fn key_value<'a>(self) -> (&'a K, &'a V) {
        let node = &*self.0.as_ptr();
        (&node.key, &node.value)
    }
    pub(super) unsafe fn key_value_mut<'a>(self) -> (&'a K, &'a mut V) {
        let node = &mut *self.0.as_ptr();
        (&node.key, &mut node.value)
    }

    /// Leftmost node of the subtree rooted here.
    pub(super) unsafe fn min(self) -> Self {
        let mut node = self;
        while let Some(left) = node.left() {
            node = left;
        }
        node
    }

    /// Rightmost node of the subtree rooted here.
    pub(super) unsafe fn max(self) -> Self {
        let mut node = self;
        while let Some(right) = node.right() {
            node = right;
        }
        node
    }

    /// In-order successor; `None` past the maximum.
    pub(super) unsafe fn successor(self) -> Link<K, V> {
        if let Some(right) = self.right() {
            return Some(right.min());
        }
        let mut node = self;
        while let Some(parent) = node.parent() {
            if parent.left() == Some(node) {
                return Some(parent);
            }
            node = parent;
        }
        None
    }

    /// In-order predecessor; `None` before the minimum.
    pub(super) unsafe fn predecessor(self) -> Link<K, V> {
        if let Some(left) = self.left() {
            return Some(left.max());
        }
        let mut node = self;
        while let Some(parent) = node.parent() {
            if parent.right() == Some(node) {
                return Some(parent);
            }
            node = parent;
        }
        None
    }

    /// Recursively clones `src`'s children beneath `self`, preserving
    /// colors. Each clone is linked the moment it exists, so if a key or
    /// value clone panics midway the partial subtree is still attached to
    /// its owner and gets freed normally.
    pub(super) unsafe fn clone_children_from(self, src: Self)
    where
        K: Clone,
        V: Clone,
    {
        if let Some(src_left) = src.left() {
            let child = NodePtr::alloc(src_left.key().clone(), src_left.value().clone(), Some(self));
            child.set_color(src_left.color());
            self.set_left(Some(child));
            child.clone_children_from(src_left);
        }
        if let Some(src_right) = src.right() {
            let child =
                NodePtr::alloc(src_right.key().clone(), src_right.value().clone(), Some(self));
            child.set_color(src_right.color());
            self.set_right(Some(child));
            child.clone_children_from(src_right);
        }
    }

    /// Frees the subtree rooted here. The caller must not touch any node of
    /// the subtree again; parent links into it are left as-is.
    pub(super) unsafe fn drop_subtree(self) {
        if let Some(left) = self.left() {
            left.drop_subtree();
        }
        if let Some(right) = self.right() {
            right.drop_subtree();
        }
        drop(Box::from_raw(self.0.as_ptr()));
    }
}

/// Color of a possibly-absent node; null leaves are black.
pub(super) unsafe fn link_is_red<K, V>(link: Link<K, V>) -> bool {
    link.map_or(false, |node| node.is_red())
}

pub(super) unsafe fn link_is_black<K, V>(link: Link<K, V>) -> bool {
    !link_is_red(link)
}
