//! Unreliable in-memory network.
//!
//! Messages can be lost, duplicated and reordered with configurable
//! probabilities. All randomness comes from a seeded [`StdRng`], so a run
//! is reproducible from its [`NetworkConfig`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Network configuration for simulation
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Probability of message loss (0.0 - 1.0)
    pub loss_rate: f64,
    /// Probability of message duplication (0.0 - 1.0)
    pub dup_rate: f64,
    /// Probability of message reordering (0.0 - 1.0)
    pub reorder_rate: f64,
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            dup_rate: 0.0,
            reorder_rate: 0.0,
            seed: 12345,
        }
    }
}

impl NetworkConfig {
    pub fn lossy(loss_rate: f64) -> Self {
        Self {
            loss_rate,
            ..Default::default()
        }
    }

    pub fn with_dups(dup_rate: f64) -> Self {
        Self {
            dup_rate,
            ..Default::default()
        }
    }

    /// Loss, duplication and reordering all at once.
    pub fn chaotic() -> Self {
        Self {
            loss_rate: 0.1,
            dup_rate: 0.2,
            reorder_rate: 0.3,
            ..Default::default()
        }
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug)]
pub struct NetworkSimulator<M> {
    in_flight: VecDeque<M>,
    lost: Vec<M>,
    config: NetworkConfig,
    rng: StdRng,
    sent: u64,
}

impl<M: Clone> NetworkSimulator<M> {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            in_flight: VecDeque::new(),
            lost: Vec::new(),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            sent: 0,
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    fn roll(&mut self, rate: f64) -> bool {
        rate > 0.0 && self.rng.gen::<f64>() < rate
    }

    pub fn send(&mut self, msg: M) {
        self.sent += 1;

        if self.roll(self.config.loss_rate) {
            self.lost.push(msg);
            return;
        }

        if self.roll(self.config.dup_rate) {
            self.in_flight.push_back(msg.clone());
        }

        self.in_flight.push_back(msg);
        if self.in_flight.len() > 1 && self.roll(self.config.reorder_rate) {
            let last = self.in_flight.len() - 1;
            let pos = self.rng.gen_range(0..last);
            self.in_flight.swap(pos, last);
        }
    }

    pub fn receive(&mut self) -> Option<M> {
        self.in_flight.pop_front()
    }

    /// Put every lost message back in flight.
    pub fn retransmit_lost(&mut self) {
        self.in_flight.extend(self.lost.drain(..));
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn lost_count(&self) -> usize {
        self.lost.len()
    }

    /// Messages handed to [`send`](Self::send) so far.
    pub fn sent_count(&self) -> u64 {
        self.sent
    }
}
