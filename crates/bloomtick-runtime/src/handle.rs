//! Typed handles to relations owned by a [`Program`](crate::Program).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use ulid::Ulid;

/// Untyped identity of a declared relation: the owning program plus the
/// slot index inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationId {
    pub(crate) program: Ulid,
    pub(crate) index: usize,
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.program, self.index)
    }
}

/// A handle to a relation of type `R`.
///
/// Handles are `Copy` and carry no borrow of the program, so protocol code
/// can keep them in plain structs and capture them in selectors.
pub struct Rel<R> {
    id: RelationId,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Rel<R> {
    pub(crate) fn new(id: RelationId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> RelationId {
        self.id
    }
}

impl<R> Clone for Rel<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Rel<R> {}

impl<R> PartialEq for Rel<R> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<R> Eq for Rel<R> {}

impl<R> Hash for Rel<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<R> fmt::Debug for Rel<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rel")
            .field("id", &self.id)
            .field("type", &std::any::type_name::<R>())
            .finish()
    }
}
