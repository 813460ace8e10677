//! Quorum detection over a set of distinct voters.
//!
//! [`quorum`] counts voter ids deposited locally. [`addressed_quorum`] takes
//! votes as messages from other nodes and, once enough distinct voters have
//! been heard, reports a [`QuorumResult`] to a fixed address every tick.

use crate::tally::threshold;
use bloomtick_lattice::{LBool, LMax, LSet};
use bloomtick_runtime::{Addressed, Channel, Program, Rel, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug)]
pub struct Quorum {
    /// Voter ids. Input.
    pub votes: Rel<LSet<String>>,
    pub needed: Rel<LMax>,
    /// Output. Never reverts once true.
    pub reached: Rel<LBool>,
    pub tally: Rel<LSet<String>>,
}

impl Quorum {
    pub fn is_reached(&self, program: &Program) -> bool {
        program.get(self.reached).value()
    }
}

/// Declare a quorum under `prefix`. Set the threshold by adding to
/// [`Quorum::needed`] before the first tick.
pub fn quorum(program: &mut Program, prefix: &str) -> Result<Quorum> {
    let (votes, needed, reached, tally) = threshold(
        program,
        format!("{prefix}QuorumVote"),
        format!("{prefix}QuorumNeeded"),
        format!("{prefix}QuorumReached"),
        format!("{prefix}quorumTally"),
    )?;
    Ok(Quorum {
        votes,
        needed,
        reached,
        tally,
    })
}

/// A vote from `voter` for the quorum held at `addr`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuorumVote {
    pub addr: String,
    pub voter: String,
}

/// Sent to the result address once the quorum is reached.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuorumResult {
    pub addr: String,
}

impl Addressed for QuorumVote {
    fn addr(&self) -> &str {
        &self.addr
    }
}

impl Addressed for QuorumResult {
    fn addr(&self) -> &str {
        &self.addr
    }
}

#[derive(Clone, Copy, Debug)]
pub struct QuorumProtocol {
    pub vote: Channel<QuorumVote>,
    pub result: Channel<QuorumResult>,
}

/// Declare the quorum channels only, for voters and result receivers.
pub fn quorum_protocol(program: &mut Program, prefix: &str) -> Result<QuorumProtocol> {
    Ok(QuorumProtocol {
        vote: program.declare_channel(format!("{prefix}QuorumVote"))?,
        result: program.declare_channel(format!("{prefix}QuorumResult"))?,
    })
}

#[derive(Clone, Copy, Debug)]
pub struct AddressedQuorum {
    pub protocol: QuorumProtocol,
    /// Every vote addressed to this node so far.
    pub votes: Rel<LSet<QuorumVote>>,
    pub tally: Rel<LMax>,
    /// Output. Never reverts once true.
    pub reached: Rel<LBool>,
}

impl AddressedQuorum {
    pub fn is_reached(&self, program: &Program) -> bool {
        program.get(self.reached).value()
    }

    pub fn tally(&self, program: &Program) -> i64 {
        program.get(self.tally).value()
    }
}

/// Declare a message-driven quorum of `size` distinct voters under
/// `prefix`. Once reached, a [`QuorumResult`] for `result_addr` is sent
/// every tick.
pub fn addressed_quorum(
    program: &mut Program,
    prefix: &str,
    size: i64,
    result_addr: impl Into<String>,
) -> Result<AddressedQuorum> {
    let protocol = quorum_protocol(program, prefix)?;
    let vote = program.mark_input(protocol.vote)?;
    let votes = program.declare_set::<QuorumVote>(format!("{prefix}quorumVotes"))?;
    let tally = program.declare_max(format!("{prefix}quorumTally"))?;
    let reached = program.declare_bool(format!("{prefix}quorumReached"))?;
    let reached = program.mark_output(reached)?;
    let here = program.addr().to_owned();
    let result_addr = result_addr.into();

    program
        .join(vote)
        .select(move |_, vote: QuorumVote| (vote.addr == here).then_some(vote))
        .into(votes)?;
    program
        .join(())
        .select(move |facts, ()| Some(facts.get(votes).len() as i64))
        .into(tally)?;
    program
        .join(())
        .select(move |facts, ()| Some(facts.get(tally).value() >= size))
        .into(reached)?;
    program
        .join(())
        .select(move |facts, ()| {
            facts.get(reached).value().then(|| QuorumResult {
                addr: result_addr.clone(),
            })
        })
        .into_next(protocol.result)?;

    Ok(AddressedQuorum {
        protocol,
        votes,
        tally,
        reached,
    })
}
