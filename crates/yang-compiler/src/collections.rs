//! Hash-based collections used across the crate, pinned to one hasher.
//!
//! Module tables (identities, features, typedefs, groupings) need to keep
//! their declaration order, so the insertion-ordered [`indexmap`] types are
//! the default; the plain std maps back prefix scopes and the interning
//! pool, where order carries no meaning.

/// [`indexmap::IndexMap`] with the crate-wide hasher.
pub type IndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

/// [`std::collections::HashMap`] with the crate-wide hasher.
pub type HashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;

/// [`std::collections::HashSet`] with the crate-wide hasher.
pub type HashSet<T> = std::collections::HashSet<T, ahash::RandomState>;
