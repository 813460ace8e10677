//! # bloomtick-protocols
//!
//! Distributed protocol building blocks written as bloomtick programs.
//!
//! Each protocol is an explicit constructor that declares its relations
//! and joins on a [`Program`](bloomtick_runtime::Program) under a name
//! prefix and returns a struct of typed handles. Several protocols can
//! share one program as long as their prefixes differ.
//!
//! - [`quorum()`]: has a threshold of distinct voters been reached
//! - [`addressed_quorum()`]: the same, fed by vote messages, reporting to
//!   another node
//! - [`tally()`] / [`multi_tally()`]: the same count, single or per race
//! - [`shortest_path()`]: all paths over weighted links
//! - [`kv()`] / [`replicated_kv()`]: a mergeable key-value replica
//! - [`raft()`]: Raft messages and leader election

pub mod kv;
pub mod quorum;
pub mod raft;
pub mod shortest;
pub mod tally;

pub use kv::{
    kv, kv_protocol, replicated_kv, Kv, KvGet, KvGetResponse, KvProtocol, KvPut, KvPutResponse,
    KvReplMap, KvReplReq, ReplicatedKv,
};
pub use quorum::{
    addressed_quorum, quorum, quorum_protocol, AddressedQuorum, Quorum, QuorumProtocol,
    QuorumResult, QuorumVote,
};
pub use raft::{
    raft, raft_protocol, Raft, RaftAppendEntryRequest, RaftAppendEntryResponse, RaftProtocol,
    RaftVoteRequest, RaftVoteResponse,
};
pub use shortest::{shortest_path, Link, Path, ShortestPath};
pub use tally::{multi_tally, tally, MultiTally, MultiTallyVote, Tally};
