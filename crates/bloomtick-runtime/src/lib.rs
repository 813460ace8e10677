//! # bloomtick-runtime
//!
//! A program is a set of named lattice relations plus a list of join
//! declarations, evaluated in discrete ticks.
//!
//! ```
//! use bloomtick_runtime::Program;
//!
//! let mut program = Program::new("node-1");
//! let votes = program.declare_set::<String>("votes").unwrap();
//! let needed = program.declare_max("needed").unwrap();
//! let reached = program.declare_bool("reached").unwrap();
//!
//! program
//!     .join(votes)
//!     .select(move |facts, _vote| {
//!         Some(facts.get(votes).len() as i64 >= facts.get(needed).value())
//!     })
//!     .into(reached)
//!     .unwrap();
//!
//! program.add(needed, 2);
//! program.add(votes, "alice".into());
//! program.tick().unwrap();
//! assert!(!program.get(reached).value());
//!
//! program.add(votes, "bob".into());
//! program.tick().unwrap();
//! assert!(program.get(reached).value());
//! ```
//!
//! ## Ticks
//!
//! Within a tick every same-tick join runs to a fixpoint, so a chain of
//! derivations completes in the tick its input arrived. Next-tick joins and
//! [`Program::add_next`] deposits become visible one tick later, which is
//! how programs express state transitions and message sends.
//!
//! ## Channels
//!
//! [`Channel`]s are scratch sets of [`Addressed`] messages. Moving them
//! between programs is the job of a transport such as the simulator crate.

pub mod channel;
pub mod config;
pub mod error;
pub mod handle;
pub mod join;
pub mod program;
pub mod store;
pub mod tick;

pub use channel::{Addressed, Channel};
pub use config::{ProgramConfig, ProgramConfigBuilder};
pub use error::{Result, RuntimeError};
pub use handle::{Rel, RelationId};
pub use join::{Join, Select, SelectMerge, Sources, Timing, WriteMode};
pub use program::Program;
pub use store::Facts;
pub use tick::TickReport;

pub use bloomtick_lattice as lattice;
