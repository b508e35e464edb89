/// A strict ordering over keys: `lesser(a, b)` is true exactly when `a`
/// sorts before `b`. Two keys where neither sorts before the other are
/// equal as far as the map is concerned.
///
/// Implementations must be a strict weak order (irreflexive, transitive).
/// When a map is queried through a borrowed key form `Q` (see
/// `K: Borrow<Q>` bounds on the lookup methods), the `Lesser<Q>` impl must
/// order borrowed keys the same way `Lesser<K>` orders the owned ones.
pub trait Lesser<K: ?Sized> {
    /// Returns true iff `a` sorts strictly before `b`.
    fn lesser(&self, a: &K, b: &K) -> bool;
}

/// The default ordering: whatever `Ord` the key type itself carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Lesser<K> for NaturalOrder {
    fn lesser(&self, a: &K, b: &K) -> bool {
        a < b
    }
}

impl<K: ?Sized, F: Fn(&K, &K) -> bool> Lesser<K> for F {
    fn lesser(&self, a: &K, b: &K) -> bool {
        self(a, b)
    }
}
