//! The tick scheduler.
//!
//! One tick runs four phases in order:
//!
//! 1. scratch relations are reset to bottom,
//! 2. facts queued for this tick are applied,
//! 3. same-tick joins are evaluated in declaration order, over and over,
//!    until a full pass changes nothing (the local fixpoint),
//! 4. next-tick joins are evaluated once against the fixpoint and their
//!    results are queued for the following tick.
//!
//! Because every relation only grows within a tick and joins are monotone,
//! the fixpoint does not depend on declaration order.

use crate::error::{Result, RuntimeError};
use crate::join::Timing;
use crate::program::Program;
use crate::store::{Facts, Write};
use std::mem;
use tracing::{debug, debug_span, trace, warn};

/// A fact waiting in the queue for the next tick.
#[derive(Debug)]
pub(crate) struct PendingFact {
    pub dest: usize,
    pub write: Write,
}

/// What a tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Index of the tick that just ran, starting at 0.
    pub tick: u64,
    /// Same-tick passes needed to reach the fixpoint, including the final
    /// pass that changed nothing.
    pub passes: usize,
    /// Queued facts that changed their relation when applied.
    pub applied: usize,
    /// Facts queued for the next tick by next-tick joins.
    pub queued: usize,
}

impl Program {
    /// Run one tick.
    ///
    /// Fails only if [`ProgramConfig::max_passes`](crate::ProgramConfig) is
    /// set and the fixpoint needs more passes than that. The tick counter is
    /// not advanced in that case.
    pub fn tick(&mut self) -> Result<TickReport> {
        let tick = self.ticks;
        let span = debug_span!("tick", addr = %self.addr, tick);
        let _enter = span.enter();

        self.reset_scratch();
        let applied = self.apply_pending();
        let passes = self.run_fixpoint(tick)?;
        let queued = self.queue_next_tick();
        self.ticks += 1;

        debug!(passes, applied, queued, "tick complete");
        Ok(TickReport {
            tick,
            passes,
            applied,
            queued,
        })
    }

    /// Facts queued for the next tick.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn reset_scratch(&mut self) {
        for slot in self.slots.iter_mut().filter(|slot| slot.scratch) {
            slot.cell.reset();
        }
    }

    fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        for fact in mem::take(&mut self.pending) {
            if self.slots[fact.dest].cell.apply(fact.write) {
                applied += 1;
            }
        }
        applied
    }

    fn run_fixpoint(&mut self, tick: u64) -> Result<usize> {
        let mut passes = 0;
        loop {
            if let Some(max) = self.config.max_passes {
                if passes >= max {
                    warn!(passes, "fixpoint not reached");
                    return Err(RuntimeError::FixpointDiverged {
                        addr: self.addr.clone(),
                        tick,
                        passes,
                    });
                }
            }
            passes += 1;

            let mut changed = false;
            for join in &self.joins {
                if join.timing != Timing::SameTick {
                    continue;
                }
                let writes = (join.evaluate)(&Facts::new(self.id, &self.slots));
                let mut grew = 0;
                let cell = &mut self.slots[join.dest].cell;
                for write in writes {
                    if cell.apply(write) {
                        grew += 1;
                    }
                }
                trace!(join = %join.label, pass = passes, grew, "evaluate join");
                changed |= grew > 0;
            }

            if !changed {
                return Ok(passes);
            }
        }
    }

    fn queue_next_tick(&mut self) -> usize {
        let facts = Facts::new(self.id, &self.slots);
        let mut queued = Vec::new();
        for join in &self.joins {
            if join.timing != Timing::NextTick {
                continue;
            }
            let writes = (join.evaluate)(&facts);
            trace!(join = %join.label, queued = writes.len(), "evaluate join");
            queued.extend(writes.into_iter().map(|write| PendingFact {
                dest: join.dest,
                write,
            }));
        }
        let count = queued.len();
        self.pending.extend(queued);
        count
    }
}
