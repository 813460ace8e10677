//! Program configuration.

/// Configuration for the tick scheduler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramConfig {
    /// Upper bound on fixpoint passes per tick. `None` runs every tick to
    /// its fixpoint however long that takes; with a bound, a tick that is
    /// still changing after this many passes fails instead.
    pub max_passes: Option<usize>,
}

impl ProgramConfig {
    /// A configuration that gives up after `max_passes` passes.
    pub fn bounded(max_passes: usize) -> Self {
        Self {
            max_passes: Some(max_passes),
        }
    }
}

/// Builder for program configuration.
pub struct ProgramConfigBuilder {
    config: ProgramConfig,
}

impl ProgramConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ProgramConfig::default(),
        }
    }

    pub fn max_passes(mut self, passes: usize) -> Self {
        self.config.max_passes = Some(passes);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.config.max_passes = None;
        self
    }

    pub fn build(self) -> ProgramConfig {
        self.config
    }
}

impl Default for ProgramConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
