//! # bloomtick-sim
//!
//! Test harness for running several bloomtick programs as a cluster.
//!
//! Programs never talk to each other directly. A [`Cluster`] owns one
//! program per node, steps them in lockstep and moves addressed channel
//! messages between them over a [`NetworkSimulator`] that can lose,
//! duplicate and reorder traffic. Everything is single-threaded and seeded,
//! so a failing run can be replayed exactly.
//!
//! ```
//! use bloomtick_sim::{Cluster, NetworkConfig};
//! use bloomtick_runtime::Program;
//!
//! let mut cluster = Cluster::new(NetworkConfig::lossy(0.2).seeded(7));
//! cluster.add_node(Program::new("n0")).unwrap();
//! cluster.add_node(Program::new("n1")).unwrap();
//! cluster.run(3).unwrap();
//! assert_eq!(cluster.steps(), 3);
//! ```

pub mod cluster;
pub mod error;
pub mod network;

pub use cluster::{Cluster, Envelope, StepReport};
pub use error::{Result, SimError};
pub use network::{NetworkConfig, NetworkSimulator};
