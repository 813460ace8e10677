//! Raft message types and leader election.
//!
//! Only the election half of Raft is modelled: terms, vote requests,
//! at most one granted vote per node per term, majority detection, and
//! heartbeats from the winner. Log replication is out of scope, so the
//! log fields on the messages are carried but always zero.
//!
//! Elections are started from outside: a driver that decides a node has
//! not heard from a leader for too long deposits `true` into
//! [`Raft::election_timeout`] with `add_next`.
//!
//! Terms are used as map keys in their decimal form.

use bloomtick_lattice::{LBool, LMap, LMax, LMaxString, LSet, MapEntry};
use bloomtick_runtime::{Addressed, Channel, Facts, Program, Rel, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sent by a candidate to gather votes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RaftVoteRequest {
    pub addr: String,
    pub candidate_term: i64,
    pub candidate_addr: String,
    pub last_log_term: i64,
    pub last_log_index: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RaftVoteResponse {
    pub addr: String,
    pub from_addr: String,
    /// The responder's current term.
    pub term: i64,
    pub vote_granted: bool,
}

/// Sent by a leader. An empty `entry` is a heartbeat.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RaftAppendEntryRequest {
    pub addr: String,
    pub leader_term: i64,
    pub leader_addr: String,
    pub prev_log_term: i64,
    pub prev_log_index: i64,
    pub entry: String,
    pub commit_index: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RaftAppendEntryResponse {
    pub addr: String,
    pub from_addr: String,
    pub term: i64,
    pub success: bool,
    pub commit_index: i64,
}

impl Addressed for RaftVoteRequest {
    fn addr(&self) -> &str {
        &self.addr
    }
}

impl Addressed for RaftVoteResponse {
    fn addr(&self) -> &str {
        &self.addr
    }
}

impl Addressed for RaftAppendEntryRequest {
    fn addr(&self) -> &str {
        &self.addr
    }
}

impl Addressed for RaftAppendEntryResponse {
    fn addr(&self) -> &str {
        &self.addr
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RaftProtocol {
    pub vote_request: Channel<RaftVoteRequest>,
    pub vote_response: Channel<RaftVoteResponse>,
    pub append_request: Channel<RaftAppendEntryRequest>,
    pub append_response: Channel<RaftAppendEntryResponse>,
}

/// Declare the four Raft channels.
pub fn raft_protocol(program: &mut Program, prefix: &str) -> Result<RaftProtocol> {
    Ok(RaftProtocol {
        vote_request: program.declare_channel(format!("{prefix}RaftVoteRequest"))?,
        vote_response: program.declare_channel(format!("{prefix}RaftVoteResponse"))?,
        append_request: program.declare_channel(format!("{prefix}RaftAppendEntryRequest"))?,
        append_response: program.declare_channel(format!("{prefix}RaftAppendEntryResponse"))?,
    })
}

#[derive(Clone, Copy, Debug)]
pub struct Raft {
    pub protocol: RaftProtocol,
    /// Addresses of the other members. Input.
    pub peers: Rel<LSet<String>>,
    /// Scratch. Input.
    pub election_timeout: Rel<LBool>,
    pub term: Rel<LMax>,
    /// Terms this node stood for election in.
    pub campaigns: Rel<LSet<i64>>,
    /// Term to the candidate this node voted for.
    pub voted: Rel<LMap<LMaxString>>,
    /// Term to the members that voted for this node.
    pub granted: Rel<LMap<LSet<String>>>,
    /// Terms this node won.
    pub won: Rel<LMap<LBool>>,
    /// Term to the leader this node has heard from.
    pub leaders: Rel<LMap<LMaxString>>,
    /// Whether this node leads the current term. Scratch. Output.
    pub is_leader: Rel<LBool>,
}

impl Raft {
    pub fn current_term(&self, program: &Program) -> i64 {
        program.get(self.term).value()
    }

    pub fn is_leader(&self, program: &Program) -> bool {
        program.get(self.is_leader).value()
    }

    /// The leader this node knows of for its current term.
    pub fn leader<'a>(&self, program: &'a Program) -> Option<&'a str> {
        let term = self.current_term(program).to_string();
        program.get(self.leaders).at(&term).map(LMaxString::value)
    }
}

fn majority(facts: &Facts<'_>, peers: Rel<LSet<String>>) -> i64 {
    (facts.get(peers).len() as i64 + 1) / 2 + 1
}

fn voted_for<'a>(facts: &Facts<'a>, voted: Rel<LMap<LMaxString>>, term: i64) -> Option<&'a str> {
    facts
        .get(voted)
        .at(&term.to_string())
        .map(LMaxString::value)
}

/// Declare a Raft member under `prefix`.
pub fn raft(program: &mut Program, prefix: &str) -> Result<Raft> {
    let protocol = raft_protocol(program, prefix)?;
    let RaftProtocol {
        vote_request,
        vote_response,
        append_request,
        append_response,
    } = protocol;

    let peers = program.declare_set::<String>(format!("{prefix}raftPeers"))?;
    let peers = program.mark_input(peers)?;
    let election_timeout = program.declare_bool(format!("{prefix}raftElectionTimeout"))?;
    let election_timeout = program.declare_scratch(election_timeout)?;
    let election_timeout = program.mark_input(election_timeout)?;
    let term = program.declare_max(format!("{prefix}raftTerm"))?;
    let campaigns = program.declare_set::<i64>(format!("{prefix}raftCampaigns"))?;
    let voted = program.declare_map::<LMaxString>(format!("{prefix}raftVoted"))?;
    let granted = program.declare_map::<LSet<String>>(format!("{prefix}raftGranted"))?;
    let won = program.declare_map::<LBool>(format!("{prefix}raftWon"))?;
    let leaders = program.declare_map::<LMaxString>(format!("{prefix}raftLeaders"))?;
    let is_leader = program.declare_bool(format!("{prefix}RaftIsLeader"))?;
    let is_leader = program.declare_scratch(is_leader)?;
    let is_leader = program.mark_output(is_leader)?;
    let me = program.addr().to_owned();

    // A timeout starts a campaign for the next term.
    program
        .join(election_timeout)
        .select(move |facts, fired: bool| fired.then(|| facts.get(term).value() + 1))
        .into_next(term)?;
    let here = me.clone();
    program
        .join(election_timeout)
        .select(move |facts, fired: bool| {
            let next = facts.get(term).value() + 1;
            if fired {
                debug!(node = %here, term = next, "election timeout");
            }
            fired.then_some(next)
        })
        .into_next(campaigns)?;

    // Any message from a later term moves this node to that term.
    program
        .join(vote_request)
        .select(|_, req: RaftVoteRequest| Some(req.candidate_term))
        .into(term)?;
    program
        .join(vote_response)
        .select(|_, resp: RaftVoteResponse| Some(resp.term))
        .into(term)?;
    program
        .join(append_request)
        .select(|_, req: RaftAppendEntryRequest| Some(req.leader_term))
        .into(term)?;

    // Candidates vote for themselves unless they already voted this term.
    let here = me.clone();
    program
        .join(campaigns)
        .select(move |facts, t: i64| {
            (t == facts.get(term).value() && voted_for(facts, voted, t).is_none())
                .then(|| MapEntry::new(t.to_string(), LMaxString::from(here.as_str())))
        })
        .into(voted)?;
    let here = me.clone();
    program
        .join(campaigns)
        .select(move |facts, t: i64| {
            (voted_for(facts, voted, t) == Some(here.as_str()))
                .then(|| MapEntry::new(t.to_string(), LSet::one(here.clone())))
        })
        .into(granted)?;

    // Ask every peer until someone is known to lead the current term.
    let here = me.clone();
    program
        .join((campaigns, peers))
        .select(move |facts, (t, peer): (i64, String)| {
            let open = t == facts.get(term).value()
                && !facts.get(leaders).contains_key(&t.to_string());
            open.then(|| RaftVoteRequest {
                addr: peer,
                candidate_term: t,
                candidate_addr: here.clone(),
                last_log_term: 0,
                last_log_index: 0,
            })
        })
        .into_next(vote_request)?;

    // Record at most one vote per term. Requests that arrive together race
    // through the map's max; only the survivor is granted below.
    let here = me.clone();
    program
        .join(vote_request)
        .select(move |facts, req: RaftVoteRequest| {
            let eligible = req.addr == here
                && req.candidate_term == facts.get(term).value()
                && voted_for(facts, voted, req.candidate_term).is_none();
            eligible.then(|| {
                MapEntry::new(
                    req.candidate_term.to_string(),
                    LMaxString::from(req.candidate_addr),
                )
            })
        })
        .into(voted)?;
    let here = me.clone();
    program
        .join(vote_request)
        .select(move |facts, req: RaftVoteRequest| {
            if req.addr != here {
                return None;
            }
            let current = facts.get(term).value();
            let vote_granted = req.candidate_term == current
                && voted_for(facts, voted, current) == Some(req.candidate_addr.as_str());
            Some(RaftVoteResponse {
                addr: req.candidate_addr,
                from_addr: here.clone(),
                term: current,
                vote_granted,
            })
        })
        .into_next(vote_response)?;

    // Count granted votes and declare victory on a majority.
    let here = me.clone();
    program
        .join(vote_response)
        .select(move |_, resp: RaftVoteResponse| {
            (resp.addr == here && resp.vote_granted)
                .then(|| MapEntry::new(resp.term.to_string(), LSet::one(resp.from_addr)))
        })
        .into(granted)?;
    let here = me.clone();
    program
        .join(granted)
        .select(move |facts, entry: MapEntry<LSet<String>>| {
            if (entry.val.len() as i64) < majority(facts, peers) {
                return None;
            }
            if !facts.get(won).contains_key(&entry.key) {
                debug!(node = %here, term = %entry.key, "won election");
            }
            Some(MapEntry::new(entry.key, LBool::from(true)))
        })
        .into(won)?;
    let here = me.clone();
    program
        .join(won)
        .select(move |_, entry: MapEntry<LBool>| {
            entry
                .val
                .value()
                .then(|| MapEntry::new(entry.key, LMaxString::from(here.as_str())))
        })
        .into(leaders)?;

    program
        .join(())
        .select(move |facts, ()| {
            let current = facts.get(term).value().to_string();
            Some(facts.get(won).at(&current).is_some_and(LBool::value))
        })
        .into(is_leader)?;

    // Leaders send a heartbeat to every peer each tick.
    let here = me.clone();
    program
        .join((is_leader, peers))
        .select(move |facts, (leading, peer): (bool, String)| {
            leading.then(|| RaftAppendEntryRequest {
                addr: peer,
                leader_term: facts.get(term).value(),
                leader_addr: here.clone(),
                prev_log_term: 0,
                prev_log_index: 0,
                entry: String::new(),
                commit_index: 0,
            })
        })
        .into_next(append_request)?;

    // Followers learn the leader from heartbeats and acknowledge them.
    let here = me.clone();
    program
        .join(append_request)
        .select(move |_, req: RaftAppendEntryRequest| {
            (req.addr == here).then(|| {
                MapEntry::new(
                    req.leader_term.to_string(),
                    LMaxString::from(req.leader_addr),
                )
            })
        })
        .into(leaders)?;
    let here = me;
    program
        .join(append_request)
        .select(move |facts, req: RaftAppendEntryRequest| {
            if req.addr != here {
                return None;
            }
            let current = facts.get(term).value();
            Some(RaftAppendEntryResponse {
                addr: req.leader_addr,
                from_addr: here.clone(),
                term: current,
                success: req.leader_term >= current,
                commit_index: 0,
            })
        })
        .into_next(append_response)?;

    Ok(Raft {
        protocol,
        peers,
        election_timeout,
        term,
        campaigns,
        voted,
        granted,
        won,
        leaders,
        is_leader,
    })
}
