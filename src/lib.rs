//! # bloomtick
//!
//! A declarative runtime for distributed protocols built from lattices.
//!
//! Protocol state lives in named relations that only ever grow
//! (join-semilattices). Join declarations derive new facts from existing
//! ones, and a tick scheduler evaluates them to a fixpoint once per logical
//! tick, deferring next-tick results and channel messages to the tick after.
//!
//! ## Crates
//!
//! - [`lattice`]: lattice and relation types
//! - [`runtime`]: programs, typed joins and the tick scheduler
//! - [`protocols`]: quorum, tallies, shortest path, KV and Raft election
//! - [`sim`]: a seeded network simulator and cluster driver for tests
//!
//! ## Example
//!
//! ```
//! use bloomtick::protocols::{shortest_path, Link, Path};
//! use bloomtick::runtime::Program;
//!
//! let mut program = Program::new("router");
//! let sp = shortest_path(&mut program, "").unwrap();
//! program.add(sp.links, Link::new("a", "b", 10));
//! program.add(sp.links, Link::new("b", "c", 10));
//! program.tick().unwrap();
//!
//! assert_eq!(sp.best(&program, "a", "c"), Some(Path::new("a", "c", "b", 20)));
//! ```

pub use bloomtick_lattice as lattice;
pub use bloomtick_protocols as protocols;
pub use bloomtick_runtime as runtime;
pub use bloomtick_sim as sim;

pub mod prelude {
    pub use bloomtick_lattice::{
        LBool, LMap, LMax, LMaxString, LSet, Lattice, LatticeValue, MapEntry, Relation,
    };
    pub use bloomtick_runtime::{Addressed, Channel, Facts, Program, ProgramConfig, Rel};
}
