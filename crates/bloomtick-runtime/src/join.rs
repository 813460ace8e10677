//! Join declarations and their typed builder
//!
//! A join reads 0..N source relations, feeds every combination of their
//! tuples (the full cross product, nested-loop style) to a selector, and
//! writes what the selector returns into a destination relation:
//!
//! ```text
//! program.join(sources)
//!     .select(|facts, row| Option<tuple>)        map mode: add one fact
//!     .select_merge(|facts, row| Option<rel>)    merge-whole mode
//!     .into(dest) | .into_next(dest)             same tick | next tick
//!
//! program.join(source).into(dest)                copy mode
//! ```
//!
//! Wiring is checked by the compiler. The selector's row type is fixed by
//! the sources, and `into` only accepts a destination whose tuple type (or,
//! for merge-whole joins, whose own type) matches what the selector returns:
//!
//! ```compile_fail
//! use bloomtick_runtime::Program;
//!
//! let mut program = Program::new("node");
//! let votes = program.declare_set::<String>("votes").unwrap();
//! let tally = program.declare_max("tally").unwrap();
//! // A String tuple cannot flow into an integer register.
//! program.join(votes).into(tally).unwrap();
//! ```
//!
//! Joins over more than one source must have a selector:
//!
//! ```compile_fail
//! use bloomtick_runtime::Program;
//!
//! let mut program = Program::new("node");
//! let a = program.declare_set::<String>("a").unwrap();
//! let b = program.declare_set::<String>("b").unwrap();
//! program.join((a, b)).into(a).unwrap();
//! ```

use crate::error::Result;
use crate::handle::{Rel, RelationId};
use crate::program::Program;
use crate::store::{Facts, Write};
use bloomtick_lattice::Relation;
use std::fmt;
use std::marker::PhantomData;

/// Whether a join's result is one fact or a whole relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    Add,
    Merge,
}

/// When a join's results become visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timing {
    /// Folded in during the current tick's fixpoint.
    SameTick,
    /// Queued and applied at the start of the next tick. Evaluated once,
    /// against the fixpoint state, so the selector never sees a partial pass.
    NextTick,
}

pub(crate) type Evaluator = Box<dyn Fn(&Facts<'_>) -> Vec<Write>>;

/// A standing rule, evaluated every tick.
pub(crate) struct JoinDeclaration {
    pub label: String,
    pub sources: Vec<usize>,
    pub dest: usize,
    pub mode: WriteMode,
    pub timing: Timing,
    pub evaluate: Evaluator,
}

impl JoinDeclaration {
    fn new(mode: WriteMode, timing: Timing, evaluate: Evaluator) -> Self {
        Self {
            label: String::new(),
            sources: Vec::new(),
            dest: 0,
            mode,
            timing,
            evaluate,
        }
    }
}

impl fmt::Display for JoinDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            WriteMode::Add => "add",
            WriteMode::Merge => "merge",
        };
        let timing = match self.timing {
            Timing::SameTick => "same tick",
            Timing::NextTick => "next tick",
        };
        write!(f, "{} [{mode}, {timing}]", self.label)
    }
}

impl fmt::Debug for JoinDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinDeclaration")
            .field("label", &self.label)
            .field("mode", &self.mode)
            .field("timing", &self.timing)
            .finish()
    }
}

/// The source list of a join.
///
/// Implemented for `()` (no sources, the selector runs once per pass), a
/// single handle (rows are that relation's tuples), and tuples of up to four
/// handles (rows are tuples of tuples).
pub trait Sources: Copy + 'static {
    type Row: 'static;

    fn ids(&self) -> Vec<RelationId>;

    /// Call `f` once per combination of source tuples.
    fn for_each_row(&self, facts: &Facts<'_>, f: &mut dyn FnMut(Self::Row));
}

impl Sources for () {
    type Row = ();

    fn ids(&self) -> Vec<RelationId> {
        Vec::new()
    }

    fn for_each_row(&self, _facts: &Facts<'_>, f: &mut dyn FnMut(())) {
        f(());
    }
}

impl<A: Relation> Sources for Rel<A> {
    type Row = A::Tuple;

    fn ids(&self) -> Vec<RelationId> {
        vec![self.id()]
    }

    fn for_each_row(&self, facts: &Facts<'_>, f: &mut dyn FnMut(A::Tuple)) {
        for a in facts.get(*self).tuples() {
            f(a);
        }
    }
}

impl<A: Relation> Sources for (Rel<A>,) {
    type Row = (A::Tuple,);

    fn ids(&self) -> Vec<RelationId> {
        vec![self.0.id()]
    }

    fn for_each_row(&self, facts: &Facts<'_>, f: &mut dyn FnMut(Self::Row)) {
        for a in facts.get(self.0).tuples() {
            f((a,));
        }
    }
}

impl<A: Relation, B: Relation> Sources for (Rel<A>, Rel<B>) {
    type Row = (A::Tuple, B::Tuple);

    fn ids(&self) -> Vec<RelationId> {
        vec![self.0.id(), self.1.id()]
    }

    fn for_each_row(&self, facts: &Facts<'_>, f: &mut dyn FnMut(Self::Row)) {
        let a_tuples = facts.get(self.0).tuples();
        let b_tuples = facts.get(self.1).tuples();
        for a in &a_tuples {
            for b in &b_tuples {
                f((a.clone(), b.clone()));
            }
        }
    }
}

impl<A: Relation, B: Relation, C: Relation> Sources for (Rel<A>, Rel<B>, Rel<C>) {
    type Row = (A::Tuple, B::Tuple, C::Tuple);

    fn ids(&self) -> Vec<RelationId> {
        vec![self.0.id(), self.1.id(), self.2.id()]
    }

    fn for_each_row(&self, facts: &Facts<'_>, f: &mut dyn FnMut(Self::Row)) {
        let a_tuples = facts.get(self.0).tuples();
        let b_tuples = facts.get(self.1).tuples();
        let c_tuples = facts.get(self.2).tuples();
        for a in &a_tuples {
            for b in &b_tuples {
                for c in &c_tuples {
                    f((a.clone(), b.clone(), c.clone()));
                }
            }
        }
    }
}

impl<A: Relation, B: Relation, C: Relation, D: Relation> Sources
    for (Rel<A>, Rel<B>, Rel<C>, Rel<D>)
{
    type Row = (A::Tuple, B::Tuple, C::Tuple, D::Tuple);

    fn ids(&self) -> Vec<RelationId> {
        vec![self.0.id(), self.1.id(), self.2.id(), self.3.id()]
    }

    fn for_each_row(&self, facts: &Facts<'_>, f: &mut dyn FnMut(Self::Row)) {
        let a_tuples = facts.get(self.0).tuples();
        let b_tuples = facts.get(self.1).tuples();
        let c_tuples = facts.get(self.2).tuples();
        let d_tuples = facts.get(self.3).tuples();
        for a in &a_tuples {
            for b in &b_tuples {
                for c in &c_tuples {
                    for d in &d_tuples {
                        f((a.clone(), b.clone(), c.clone(), d.clone()));
                    }
                }
            }
        }
    }
}

/// A join with its sources chosen and no selector yet.
#[must_use = "a join does nothing until it is wired with `into` or `into_next`"]
pub struct Join<'p, S> {
    program: &'p mut Program,
    sources: S,
}

impl<'p, S: Sources> Join<'p, S> {
    pub(crate) fn new(program: &'p mut Program, sources: S) -> Self {
        Self { program, sources }
    }

    /// Map mode: the selector returns one fact to add, or `None` to drop
    /// the combination.
    pub fn select<O, F>(self, selector: F) -> Select<'p, S, F, O>
    where
        O: 'static,
        F: Fn(&Facts<'_>, S::Row) -> Option<O> + 'static,
    {
        Select {
            program: self.program,
            sources: self.sources,
            selector,
            _out: PhantomData,
        }
    }

    /// Merge-whole mode: the selector returns an entire relation that is
    /// merged into the destination.
    pub fn select_merge<M, F>(self, selector: F) -> SelectMerge<'p, S, F, M>
    where
        M: Relation,
        F: Fn(&Facts<'_>, S::Row) -> Option<M> + 'static,
    {
        SelectMerge {
            program: self.program,
            sources: self.sources,
            selector,
            _out: PhantomData,
        }
    }
}

impl<'p, A: Relation> Join<'p, Rel<A>> {
    /// Copy mode: every tuple of the source is added to `dest` this tick.
    pub fn into<R>(self, dest: Rel<R>) -> Result<()>
    where
        R: Relation<Tuple = A::Tuple>,
    {
        self.select(|_, tuple| Some(tuple)).into(dest)
    }

    /// Copy mode, delivered at the start of the next tick.
    pub fn into_next<R>(self, dest: Rel<R>) -> Result<()>
    where
        R: Relation<Tuple = A::Tuple>,
    {
        self.select(|_, tuple| Some(tuple)).into_next(dest)
    }
}

/// A map-mode join waiting for its destination.
#[must_use = "a join does nothing until it is wired with `into` or `into_next`"]
pub struct Select<'p, S, F, O> {
    program: &'p mut Program,
    sources: S,
    selector: F,
    _out: PhantomData<fn() -> O>,
}

impl<'p, S, F, O> Select<'p, S, F, O>
where
    S: Sources,
    O: 'static,
    F: Fn(&Facts<'_>, S::Row) -> Option<O> + 'static,
{
    pub fn into<R>(self, dest: Rel<R>) -> Result<()>
    where
        R: Relation<Tuple = O>,
    {
        self.wire(dest.id(), Timing::SameTick)
    }

    pub fn into_next<R>(self, dest: Rel<R>) -> Result<()>
    where
        R: Relation<Tuple = O>,
    {
        self.wire(dest.id(), Timing::NextTick)
    }

    fn wire(self, dest: RelationId, timing: Timing) -> Result<()> {
        let Select {
            program,
            sources,
            selector,
            ..
        } = self;
        let evaluate: Evaluator = Box::new(move |facts: &Facts<'_>| {
            let mut writes = Vec::new();
            sources.for_each_row(facts, &mut |row| {
                if let Some(tuple) = selector(facts, row) {
                    writes.push(Write::Add(Box::new(tuple)));
                }
            });
            writes
        });
        let declaration = JoinDeclaration::new(WriteMode::Add, timing, evaluate);
        program.push_join(declaration, &sources.ids(), dest)
    }
}

/// A merge-whole join waiting for its destination.
#[must_use = "a join does nothing until it is wired with `into` or `into_next`"]
pub struct SelectMerge<'p, S, F, M> {
    program: &'p mut Program,
    sources: S,
    selector: F,
    _out: PhantomData<fn() -> M>,
}

impl<'p, S, F, M> SelectMerge<'p, S, F, M>
where
    S: Sources,
    M: Relation,
    F: Fn(&Facts<'_>, S::Row) -> Option<M> + 'static,
{
    pub fn into(self, dest: Rel<M>) -> Result<()> {
        self.wire(dest.id(), Timing::SameTick)
    }

    pub fn into_next(self, dest: Rel<M>) -> Result<()> {
        self.wire(dest.id(), Timing::NextTick)
    }

    fn wire(self, dest: RelationId, timing: Timing) -> Result<()> {
        let SelectMerge {
            program,
            sources,
            selector,
            ..
        } = self;
        let evaluate: Evaluator = Box::new(move |facts: &Facts<'_>| {
            let mut writes = Vec::new();
            sources.for_each_row(facts, &mut |row| {
                if let Some(relation) = selector(facts, row) {
                    writes.push(Write::Merge(Box::new(relation)));
                }
            });
            writes
        });
        let declaration = JoinDeclaration::new(WriteMode::Merge, timing, evaluate);
        program.push_join(declaration, &sources.ids(), dest)
    }
}
