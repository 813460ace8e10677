//! Vote counting.
//!
//! [`tally`] counts distinct voters against a threshold. [`multi_tally`]
//! runs any number of independent counts at once, one per race.

use bloomtick_lattice::{LBool, LMap, LMax, LSet, MapEntry};
use bloomtick_runtime::{Program, Rel, Result};
use serde::{Deserialize, Serialize};

/// A single threshold count.
#[derive(Clone, Copy, Debug)]
pub struct Tally {
    /// Voter ids. Input.
    pub votes: Rel<LSet<String>>,
    /// Distinct voters required.
    pub need: Rel<LMax>,
    /// Becomes true once enough distinct voters have been seen. Output.
    pub done: Rel<LBool>,
    pub total: Rel<LSet<String>>,
}

/// Declare a threshold count under `prefix`.
pub fn tally(program: &mut Program, prefix: &str) -> Result<Tally> {
    threshold(
        program,
        format!("{prefix}TallyVote"),
        format!("{prefix}TallyNeed"),
        format!("{prefix}TallyDone"),
        format!("{prefix}tallyTotal"),
    )
    .map(|(votes, need, done, total)| Tally {
        votes,
        need,
        done,
        total,
    })
}

/// Shared wiring for [`tally`] and [`crate::quorum()`]: copy votes into a
/// running total and compare its size with the threshold.
pub(crate) fn threshold(
    program: &mut Program,
    votes: String,
    need: String,
    done: String,
    total: String,
) -> Result<(Rel<LSet<String>>, Rel<LMax>, Rel<LBool>, Rel<LSet<String>>)> {
    let votes = program.declare_set::<String>(votes)?;
    let votes = program.mark_input(votes)?;
    let need = program.declare_max(need)?;
    let done = program.declare_bool(done)?;
    let done = program.mark_output(done)?;
    let total = program.declare_set::<String>(total)?;

    program.join(votes).into(total)?;
    program
        .join(())
        .select(move |facts, ()| Some(facts.get(total).len() as i64 >= facts.get(need).value()))
        .into(done)?;

    Ok((votes, need, done, total))
}

/// One vote in one race.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MultiTallyVote {
    pub race: String,
    pub voter: String,
}

impl MultiTallyVote {
    pub fn new(race: impl Into<String>, voter: impl Into<String>) -> Self {
        Self {
            race: race.into(),
            voter: voter.into(),
        }
    }
}

/// Independent threshold counts keyed by race.
#[derive(Clone, Copy, Debug)]
pub struct MultiTally {
    /// Input.
    pub votes: Rel<LSet<MultiTallyVote>>,
    /// Distinct voters required in each race.
    pub need: Rel<LMax>,
    /// Race to "has reached the threshold". A race that has votes but is
    /// below the threshold maps to false. Output.
    pub done: Rel<LMap<LBool>>,
    /// Race to the voters seen so far.
    pub totals: Rel<LMap<LSet<String>>>,
}

impl MultiTally {
    /// Whether `race` has reached the threshold.
    pub fn is_done(&self, program: &Program, race: &str) -> bool {
        program.get(self.done).at(race).is_some_and(LBool::value)
    }
}

/// Declare a multi-race count under `prefix`.
pub fn multi_tally(program: &mut Program, prefix: &str) -> Result<MultiTally> {
    let votes = program.declare_set::<MultiTallyVote>(format!("{prefix}MultiTallyVote"))?;
    let votes = program.mark_input(votes)?;
    let need = program.declare_max(format!("{prefix}MultiTallyNeed"))?;
    let done = program.declare_map::<LBool>(format!("{prefix}MultiTallyDone"))?;
    let done = program.mark_output(done)?;
    let totals = program.declare_map::<LSet<String>>(format!("{prefix}multiTallyTotal"))?;

    program
        .join(votes)
        .select(|_, vote: MultiTallyVote| Some(MapEntry::new(vote.race, LSet::one(vote.voter))))
        .into(totals)?;
    program
        .join(totals)
        .select(move |facts, entry: MapEntry<LSet<String>>| {
            let reached = entry.val.len() as i64 >= facts.get(need).value();
            Some(MapEntry::new(entry.key, LBool::from(reached)))
        })
        .into(done)?;

    Ok(MultiTally {
        votes,
        need,
        done,
        totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_counts_distinct_voters() {
        let mut program = Program::new("node");
        let t = tally(&mut program, "").unwrap();

        program.add(t.need, 3);
        for voter in ["x", "y", "x", "y"] {
            program.add(t.votes, voter.into());
        }
        program.tick().unwrap();
        assert_eq!(program.get(t.total).len(), 2);
        assert!(!program.get(t.done).value());

        program.add(t.votes, "z".into());
        program.tick().unwrap();
        assert!(program.get(t.done).value());
    }

    #[test]
    fn test_names_are_prefixed() {
        let mut program = Program::new("node");
        tally(&mut program, "a.").unwrap();
        tally(&mut program, "b.").unwrap();

        assert!(program.relation::<LSet<String>>("a.TallyVote").is_ok());
        assert!(program.relation::<LBool>("b.TallyDone").is_ok());
        assert_eq!(program.inputs().count(), 2);
    }

    #[test]
    fn test_multi_tally_below_threshold_is_explicitly_false() {
        let mut program = Program::new("node");
        let t = multi_tally(&mut program, "").unwrap();

        program.add(t.need, 2);
        program.add(t.votes, MultiTallyVote::new("A", "a0"));
        program.tick().unwrap();

        assert_eq!(program.get(t.done).at("A"), Some(&LBool::from(false)));
        assert!(!t.is_done(&program, "A"));
        assert!(!t.is_done(&program, "missing"));
    }
}
