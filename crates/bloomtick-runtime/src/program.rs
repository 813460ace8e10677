//! The program registry: one per logical node.
//!
//! A [`Program`] owns every relation declared for a node (by unique name),
//! the ordered list of join declarations, the tick counter and the queue of
//! facts waiting for the next tick. Setup declares relations and joins;
//! after that a driver calls [`Program::tick`] repeatedly and deposits
//! external facts between ticks.

use crate::config::ProgramConfig;
use crate::error::{Result, RuntimeError};
use crate::handle::{Rel, RelationId};
use crate::join::{JoinDeclaration, Sources};
use crate::store::{self, Facts, Slot, Write};
use crate::tick::PendingFact;
use bloomtick_lattice::{LBool, LMap, LMax, LMaxString, LSet, Lattice, LatticeKind, Relation};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use tracing::debug;
use ulid::Ulid;

pub struct Program {
    pub(crate) id: Ulid,
    pub(crate) addr: String,
    pub(crate) config: ProgramConfig,
    pub(crate) slots: Vec<Slot>,
    names: HashMap<String, usize>,
    pub(crate) joins: Vec<JoinDeclaration>,
    pub(crate) pending: Vec<PendingFact>,
    pub(crate) ticks: u64,
}

impl Program {
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_config(addr, ProgramConfig::default())
    }

    pub fn with_config(addr: impl Into<String>, config: ProgramConfig) -> Self {
        Self {
            id: Ulid::new(),
            addr: addr.into(),
            config,
            slots: Vec::new(),
            names: HashMap::new(),
            joins: Vec::new(),
            pending: Vec::new(),
            ticks: 0,
        }
    }

    /// The node address this program runs as. Opaque to the runtime.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Declare a relation of type `R` under a name unique in this program.
    pub fn declare<R: Relation>(&mut self, name: impl Into<String>) -> Result<Rel<R>> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(RuntimeError::DuplicateRelation(name));
        }
        let index = self.slots.len();
        debug!(addr = %self.addr, relation = %name, kind = %R::KIND, "declare relation");
        self.names.insert(name.clone(), index);
        self.slots.push(Slot::new::<R>(name));
        Ok(Rel::new(RelationId {
            program: self.id,
            index,
        }))
    }

    pub fn declare_set<T>(&mut self, name: impl Into<String>) -> Result<Rel<LSet<T>>>
    where
        T: Ord + Clone + Debug + 'static,
    {
        self.declare(name)
    }

    pub fn declare_map<V>(&mut self, name: impl Into<String>) -> Result<Rel<LMap<V>>>
    where
        V: Lattice + Debug + 'static,
    {
        self.declare(name)
    }

    pub fn declare_max(&mut self, name: impl Into<String>) -> Result<Rel<LMax>> {
        self.declare(name)
    }

    pub fn declare_max_string(&mut self, name: impl Into<String>) -> Result<Rel<LMaxString>> {
        self.declare(name)
    }

    pub fn declare_bool(&mut self, name: impl Into<String>) -> Result<Rel<LBool>> {
        self.declare(name)
    }

    /// Mark a relation scratch: it is reset to bottom at the start of every
    /// tick.
    pub fn declare_scratch<R>(&mut self, rel: Rel<R>) -> Result<Rel<R>> {
        self.slot_mut(rel)?.scratch = true;
        Ok(rel)
    }

    /// Mark a relation as written by code outside the program.
    pub fn mark_input<R>(&mut self, rel: Rel<R>) -> Result<Rel<R>> {
        self.slot_mut(rel)?.input = true;
        Ok(rel)
    }

    /// Mark a relation as read by code outside the program.
    pub fn mark_output<R>(&mut self, rel: Rel<R>) -> Result<Rel<R>> {
        self.slot_mut(rel)?.output = true;
        Ok(rel)
    }

    pub(crate) fn mark_channel<R>(&mut self, rel: Rel<R>) -> Result<Rel<R>> {
        let slot = self.slot_mut(rel)?;
        slot.scratch = true;
        slot.channel = true;
        Ok(rel)
    }

    /// Start a join declaration over `sources`: `()`, one handle, or a tuple
    /// of up to four handles.
    pub fn join<S: Sources>(&mut self, sources: S) -> crate::join::Join<'_, S> {
        crate::join::Join::new(self, sources)
    }

    pub(crate) fn push_join(
        &mut self,
        mut declaration: JoinDeclaration,
        sources: &[RelationId],
        dest: RelationId,
    ) -> Result<()> {
        let mut names = Vec::with_capacity(sources.len());
        for id in sources {
            let index = self.check(*id)?;
            declaration.sources.push(index);
            names.push(self.slots[index].name.as_str());
        }
        let dest_index = self.check(dest)?;
        declaration.dest = dest_index;
        declaration.label = format!("({}) -> {}", names.join(", "), self.slots[dest_index].name);
        debug!(
            addr = %self.addr,
            join = %declaration.label,
            mode = ?declaration.mode,
            timing = ?declaration.timing,
            "declare join"
        );
        self.joins.push(declaration);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lookup and introspection
    // ------------------------------------------------------------------

    /// Find a relation by name, checking that it really is an `R`.
    pub fn relation<R: Relation>(&self, name: &str) -> Result<Rel<R>> {
        let index = *self
            .names
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownRelation(name.to_owned()))?;
        let slot = &self.slots[index];
        if !slot.cell.as_any().is::<R>() {
            return Err(store::mismatch::<R>(slot));
        }
        Ok(Rel::new(RelationId {
            program: self.id,
            index,
        }))
    }

    pub fn name_of<R>(&self, rel: Rel<R>) -> Result<&str> {
        Ok(self.slot(rel)?.name.as_str())
    }

    pub fn kind_of<R>(&self, rel: Rel<R>) -> Result<LatticeKind> {
        Ok(self.slot(rel)?.kind)
    }

    pub fn is_scratch<R>(&self, rel: Rel<R>) -> Result<bool> {
        Ok(self.slot(rel)?.scratch)
    }

    pub fn is_channel<R>(&self, rel: Rel<R>) -> Result<bool> {
        Ok(self.slot(rel)?.channel)
    }

    /// Relation names in declaration order.
    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.name.as_str())
    }

    pub fn inputs(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .filter(|slot| slot.input)
            .map(|slot| slot.name.as_str())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .filter(|slot| slot.output)
            .map(|slot| slot.name.as_str())
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .filter(|slot| slot.channel)
            .map(|slot| slot.name.as_str())
    }

    /// Human-readable description of every join, in evaluation order.
    pub fn describe_joins(&self) -> Vec<String> {
        self.joins.iter().map(ToString::to_string).collect()
    }

    pub fn join_count(&self) -> usize {
        self.joins.len()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Read-only view of every relation.
    pub fn facts(&self) -> Facts<'_> {
        Facts::new(self.id, &self.slots)
    }

    pub fn try_get<R: Relation>(&self, rel: Rel<R>) -> Result<&R> {
        store::lookup(self.id, &self.slots, rel)
    }

    /// Current value of a relation.
    ///
    /// # Panics
    ///
    /// Panics if `rel` was declared by a different program.
    pub fn get<R: Relation>(&self, rel: Rel<R>) -> &R {
        self.facts().get(rel)
    }

    // ------------------------------------------------------------------
    // Deposits
    // ------------------------------------------------------------------

    /// Add a fact right now. Scratch relations lose it at the next reset,
    /// so deliver messages with [`Program::add_next`] instead.
    ///
    /// # Panics
    ///
    /// Panics if `rel` was declared by a different program.
    pub fn add<R: Relation>(&mut self, rel: Rel<R>, tuple: R::Tuple) -> bool {
        match store::lookup_mut(self.id, &mut self.slots, rel) {
            Ok(relation) => relation.add(tuple),
            Err(err) => panic!("{err}"),
        }
    }

    /// Merge a whole relation right now.
    ///
    /// # Panics
    ///
    /// Panics if `rel` was declared by a different program.
    pub fn merge<R: Relation>(&mut self, rel: Rel<R>, other: &R) -> bool {
        match store::lookup_mut(self.id, &mut self.slots, rel) {
            Ok(relation) => Lattice::merge(relation, other),
            Err(err) => panic!("{err}"),
        }
    }

    /// Queue a fact for the start of the next tick.
    ///
    /// # Panics
    ///
    /// Panics if `rel` was declared by a different program.
    pub fn add_next<R: Relation>(&mut self, rel: Rel<R>, tuple: R::Tuple) {
        self.defer(rel, Write::Add(Box::new(tuple)));
    }

    /// Queue a whole relation to merge at the start of the next tick.
    ///
    /// # Panics
    ///
    /// Panics if `rel` was declared by a different program.
    pub fn merge_next<R: Relation>(&mut self, rel: Rel<R>, other: R) {
        self.defer(rel, Write::Merge(Box::new(other)));
    }

    fn defer<R>(&mut self, rel: Rel<R>, write: Write) {
        match store::slot_index(self.id, &self.slots, rel) {
            Ok(dest) => self.pending.push(PendingFact { dest, write }),
            Err(err) => panic!("{err}"),
        }
    }

    // ------------------------------------------------------------------
    // Slot helpers
    // ------------------------------------------------------------------

    fn check(&self, id: RelationId) -> Result<usize> {
        if id.program != self.id || id.index >= self.slots.len() {
            return Err(RuntimeError::ForeignRelation(id));
        }
        Ok(id.index)
    }

    fn slot<R>(&self, rel: Rel<R>) -> Result<&Slot> {
        let index = self.check(rel.id())?;
        Ok(&self.slots[index])
    }

    fn slot_mut<R>(&mut self, rel: Rel<R>) -> Result<&mut Slot> {
        let index = self.check(rel.id())?;
        Ok(&mut self.slots[index])
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("addr", &self.addr)
            .field("ticks", &self.ticks)
            .field("relations", &self.slots.iter().map(|s| &s.name).collect::<Vec<_>>())
            .field("joins", &self.joins.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}
