//! A cluster of programs connected by a simulated network.
//!
//! Each [`Cluster::step`] ticks every node once (in address order), then
//! collects outbound messages from every routed channel and pushes them
//! through the [`NetworkSimulator`]. Messages that survive the network are
//! deposited into the same-named channel of their target node with
//! [`Program::send`], so they are visible there on the next step.
//!
//! A message in a channel is outbound when its [`Addressed::addr`] differs
//! from the node's own address. Messages addressed to the node itself stay
//! put and are never routed.

use crate::error::{Result, SimError};
use crate::network::{NetworkConfig, NetworkSimulator};
use bloomtick_lattice::LSet;
use bloomtick_runtime::{Addressed, Program, RuntimeError};
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::rc::Rc;
use tracing::{debug, trace, warn};

type Deliver = Rc<dyn Fn(&mut Program) -> bloomtick_runtime::Result<()>>;
type Route = Box<dyn Fn(&Program) -> bloomtick_runtime::Result<Vec<Envelope>>>;

/// One message in flight between two nodes.
#[derive(Clone)]
pub struct Envelope {
    pub from: String,
    pub to: String,
    pub channel: String,
    deliver: Deliver,
}

impl Envelope {
    fn new<T>(from: &str, channel: &str, message: T) -> Self
    where
        T: Addressed + Ord + Clone + Debug + 'static,
    {
        let to = message.addr().to_owned();
        let name = channel.to_owned();
        let deliver: Deliver = Rc::new(move |program: &mut Program| {
            let inbox = program.relation::<LSet<T>>(&name)?;
            program.send(inbox, message.clone());
            Ok(())
        });
        Self {
            from: from.to_owned(),
            to,
            channel: channel.to_owned(),
            deliver,
        }
    }
}

impl Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("channel", &self.channel)
            .finish()
    }
}

/// What one step did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub step: u64,
    /// Messages handed to the network.
    pub sent: usize,
    /// Messages deposited at their target.
    pub delivered: usize,
    /// Messages addressed to a node that is not in the cluster.
    pub undeliverable: usize,
}

pub struct Cluster {
    nodes: BTreeMap<String, Program>,
    routes: Vec<(String, Route)>,
    network: NetworkSimulator<Envelope>,
    steps: u64,
}

impl Cluster {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            nodes: BTreeMap::new(),
            routes: Vec::new(),
            network: NetworkSimulator::new(config),
            steps: 0,
        }
    }

    /// Add a node under its program address.
    pub fn add_node(&mut self, program: Program) -> Result<()> {
        let addr = program.addr().to_owned();
        if self.nodes.contains_key(&addr) {
            return Err(SimError::DuplicateNode(addr));
        }
        debug!(node = %addr, "add node");
        self.nodes.insert(addr, program);
        Ok(())
    }

    /// Route messages of type `T` on every node's channel called `channel`.
    /// Nodes that never declared the channel are skipped.
    pub fn route<T>(&mut self, channel: impl Into<String>)
    where
        T: Addressed + Ord + Clone + Debug + 'static,
    {
        let name = channel.into();
        let lookup = name.clone();
        let route: Route = Box::new(move |program: &Program| {
            let outbox = match program.relation::<LSet<T>>(&lookup) {
                Ok(outbox) => outbox,
                Err(RuntimeError::UnknownRelation(_)) => return Ok(Vec::new()),
                Err(err) => return Err(err),
            };
            Ok(program
                .get(outbox)
                .iter()
                .filter(|message| message.addr() != program.addr())
                .map(|message| Envelope::new(program.addr(), &lookup, message.clone()))
                .collect())
        });
        self.routes.push((name, route));
    }

    pub fn node(&self, addr: &str) -> Result<&Program> {
        self.nodes
            .get(addr)
            .ok_or_else(|| SimError::UnknownNode(addr.to_owned()))
    }

    pub fn node_mut(&mut self, addr: &str) -> Result<&mut Program> {
        self.nodes
            .get_mut(addr)
            .ok_or_else(|| SimError::UnknownNode(addr.to_owned()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Program> {
        self.nodes.values()
    }

    pub fn addrs(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn network(&self) -> &NetworkSimulator<Envelope> {
        &self.network
    }

    /// Tick every node, then move messages.
    pub fn step(&mut self) -> Result<StepReport> {
        let step = self.steps;
        for program in self.nodes.values_mut() {
            program.tick()?;
        }

        let mut sent = 0;
        for program in self.nodes.values() {
            for (channel, route) in &self.routes {
                let outbound = route(program)?;
                trace!(node = %program.addr(), channel = %channel, count = outbound.len(), "collect");
                sent += outbound.len();
                for envelope in outbound {
                    self.network.send(envelope);
                }
            }
        }

        let mut delivered = 0;
        let mut undeliverable = 0;
        while let Some(envelope) = self.network.receive() {
            match self.nodes.get_mut(&envelope.to) {
                Some(target) => {
                    (envelope.deliver)(target)?;
                    delivered += 1;
                }
                None => {
                    warn!(from = %envelope.from, to = %envelope.to, channel = %envelope.channel, "no such node");
                    undeliverable += 1;
                }
            }
        }

        self.steps += 1;
        debug!(step, sent, delivered, lost = self.network.lost_count(), "step complete");
        Ok(StepReport {
            step,
            sent,
            delivered,
            undeliverable,
        })
    }

    pub fn run(&mut self, steps: u64) -> Result<()> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    /// Step until `done` holds, for at most `max_steps` steps. Returns the
    /// number of steps taken, or `None` if `done` never held.
    pub fn run_until<F>(&mut self, max_steps: u64, done: F) -> Result<Option<u64>>
    where
        F: Fn(&Cluster) -> bool,
    {
        for taken in 0..max_steps {
            if done(self) {
                return Ok(Some(taken));
            }
            self.step()?;
        }
        Ok(done(self).then_some(max_steps))
    }

    /// Put every message the network lost back in flight. They are
    /// delivered during the next step.
    pub fn retransmit_lost(&mut self) {
        self.network.retransmit_lost();
    }
}

impl Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("routes", &self.routes.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("steps", &self.steps)
            .finish()
    }
}
