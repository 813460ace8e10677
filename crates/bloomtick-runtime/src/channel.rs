//! Channels: scratch sets of messages addressed to other nodes.
//!
//! A channel is an [`LSet`] of messages that is cleared at the start of
//! every tick. Sending adds a message for the next tick. The runtime itself
//! never moves messages between programs; a transport (see the simulator
//! crate) drains each program's channels after a tick, reads
//! [`Addressed::addr`] on every message and delivers it into the same-named
//! channel of the target program with [`Program::send`].

use crate::error::Result;
use crate::handle::Rel;
use crate::program::Program;
use bloomtick_lattice::LSet;
use std::fmt::Debug;

pub type Channel<T> = Rel<LSet<T>>;

/// A message that knows which node it is for.
pub trait Addressed {
    fn addr(&self) -> &str;
}

impl Program {
    /// Declare a channel carrying messages of type `T`.
    pub fn declare_channel<T>(&mut self, name: impl Into<String>) -> Result<Channel<T>>
    where
        T: Ord + Clone + Debug + 'static,
    {
        let channel = self.declare_set::<T>(name)?;
        self.mark_channel(channel)
    }

    /// Queue a message on a channel for the next tick.
    ///
    /// # Panics
    ///
    /// Panics if `channel` was declared by a different program.
    pub fn send<T>(&mut self, channel: Channel<T>, message: T)
    where
        T: Ord + Clone + Debug + 'static,
    {
        self.add_next(channel, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    struct Ping {
        addr: String,
        seq: u64,
    }

    impl Addressed for Ping {
        fn addr(&self) -> &str {
            &self.addr
        }
    }

    #[test]
    fn test_channel_is_scratch() {
        let mut program = Program::new("node");
        let pings = program.declare_channel::<Ping>("ping").unwrap();

        assert!(program.is_channel(pings).unwrap());
        assert!(program.is_scratch(pings).unwrap());
        assert_eq!(program.channels().collect::<Vec<_>>(), vec!["ping"]);
    }

    #[test]
    fn test_message_lives_for_one_tick() {
        let mut program = Program::new("node");
        let pings = program.declare_channel::<Ping>("ping").unwrap();

        program.send(
            pings,
            Ping {
                addr: "node".into(),
                seq: 1,
            },
        );
        assert!(program.get(pings).is_empty());

        program.tick().unwrap();
        let delivered: Vec<_> = program.get(pings).iter().map(|p| p.seq).collect();
        assert_eq!(delivered, vec![1]);
        assert_eq!(program.get(pings).iter().next().map(|p| p.addr()), Some("node"));

        program.tick().unwrap();
        assert!(program.get(pings).is_empty());
    }
}
