//! Type-erased relation storage and the read-only view selectors see.

use crate::error::{Result, RuntimeError};
use crate::handle::{Rel, RelationId};
use bloomtick_lattice::{Lattice, LatticeKind, Relation};
use std::any::{type_name, Any};
use std::fmt;
use ulid::Ulid;

/// A fact on its way into a relation: either one tuple to `add` or a whole
/// relation of the destination's type to `merge`.
pub(crate) enum Write {
    Add(Box<dyn Any>),
    Merge(Box<dyn Any>),
}

impl fmt::Debug for Write {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Write::Add(_) => f.write_str("Write::Add"),
            Write::Merge(_) => f.write_str("Write::Merge"),
        }
    }
}

/// Object-safe face of [`Relation`] so one program can hold relations of
/// different types.
pub(crate) trait ErasedRelation: fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn reset(&mut self);
    fn apply(&mut self, write: Write) -> bool;
}

impl<R: Relation> ErasedRelation for R {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn reset(&mut self) {
        Relation::reset(self);
    }

    /// # Panics
    ///
    /// Panics if the payload type does not match the relation. Writes are
    /// only ever built from typed handles, so this means a broken invariant.
    fn apply(&mut self, write: Write) -> bool {
        match write {
            Write::Add(payload) => match payload.downcast::<R::Tuple>() {
                Ok(tuple) => self.add(*tuple),
                Err(_) => panic!(
                    "fact payload is not a {} for relation {}",
                    type_name::<R::Tuple>(),
                    type_name::<R>()
                ),
            },
            Write::Merge(payload) => match payload.downcast::<R>() {
                Ok(other) => Lattice::merge(self, &other),
                Err(_) => panic!("merge payload is not a {}", type_name::<R>()),
            },
        }
    }
}

/// One declared relation plus its metadata.
#[derive(Debug)]
pub(crate) struct Slot {
    pub name: String,
    pub kind: LatticeKind,
    pub type_name: &'static str,
    pub scratch: bool,
    pub channel: bool,
    pub input: bool,
    pub output: bool,
    pub cell: Box<dyn ErasedRelation>,
}

impl Slot {
    pub fn new<R: Relation>(name: String) -> Self {
        Self {
            name,
            kind: R::KIND,
            type_name: type_name::<R>(),
            scratch: false,
            channel: false,
            input: false,
            output: false,
            cell: Box::new(R::bottom()),
        }
    }
}

fn check_id(program: Ulid, slots: &[Slot], id: RelationId) -> Result<usize> {
    if id.program != program || id.index >= slots.len() {
        return Err(RuntimeError::ForeignRelation(id));
    }
    Ok(id.index)
}

pub(crate) fn slot_index<R>(program: Ulid, slots: &[Slot], rel: Rel<R>) -> Result<usize> {
    check_id(program, slots, rel.id())
}

pub(crate) fn lookup<R: Relation>(program: Ulid, slots: &[Slot], rel: Rel<R>) -> Result<&R> {
    let slot = &slots[slot_index(program, slots, rel)?];
    slot.cell
        .as_any()
        .downcast_ref::<R>()
        .ok_or_else(|| mismatch::<R>(slot))
}

pub(crate) fn lookup_mut<R: Relation>(
    program: Ulid,
    slots: &mut [Slot],
    rel: Rel<R>,
) -> Result<&mut R> {
    let index = slot_index(program, slots, rel)?;
    let slot = &mut slots[index];
    let found = slot.type_name;
    let name = slot.name.clone();
    slot.cell
        .as_any_mut()
        .downcast_mut::<R>()
        .ok_or_else(|| RuntimeError::RelationTypeMismatch {
            name,
            expected: type_name::<R>().to_owned(),
            found: found.to_owned(),
        })
}

pub(crate) fn mismatch<R>(slot: &Slot) -> RuntimeError {
    RuntimeError::RelationTypeMismatch {
        name: slot.name.clone(),
        expected: type_name::<R>().to_owned(),
        found: slot.type_name.to_owned(),
    }
}

/// Read-only access to every relation of a program.
///
/// Selectors receive a `Facts` so they can consult relations other than
/// their sources, e.g. compare a tally against a threshold.
#[derive(Clone, Copy)]
pub struct Facts<'a> {
    program: Ulid,
    slots: &'a [Slot],
}

impl<'a> Facts<'a> {
    pub(crate) fn new(program: Ulid, slots: &'a [Slot]) -> Self {
        Self { program, slots }
    }

    pub fn try_get<R: Relation>(&self, rel: Rel<R>) -> Result<&'a R> {
        lookup(self.program, self.slots, rel)
    }

    /// # Panics
    ///
    /// Panics if `rel` was declared by a different program.
    pub fn get<R: Relation>(&self, rel: Rel<R>) -> &'a R {
        match self.try_get(rel) {
            Ok(relation) => relation,
            Err(err) => panic!("{err}"),
        }
    }
}

impl fmt::Debug for Facts<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Facts")
            .field("program", &self.program)
            .field("relations", &self.slots.len())
            .finish()
    }
}
