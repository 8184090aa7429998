pub mod constants;
pub mod genesis;
pub mod params;

use std::ops::Deref;

use {
    constants::perf::{PERF_PARAMS, PerfParams},
    params::Params,
};

/// Chain configuration bundled up under a single struct. Use `Config::new` to build from
/// a `Params` instance or `ConfigBuilder` for anything more complex. NOTE: this struct can be
/// implicitly de-refed into `Params`
#[derive(Clone, Debug)]
pub struct Config {
    /// Consensus params
    pub params: Params,
    /// Performance params
    pub perf: PerfParams,

    //
    // Additional configuration arguments which are not consensus sensitive
    //
    /// Rejected blocks are deleted from disk by the pruner
    pub prune_rejected_blocks: bool,

    /// Maximum number of txs kept by the mempool
    pub mempool_max_txs: usize,
}

impl Config {
    pub fn new(params: Params) -> Self {
        Self { params, perf: PERF_PARAMS, prune_rejected_blocks: true, mempool_max_txs: 4096 }
    }

    pub fn to_builder(&self) -> ConfigBuilder {
        ConfigBuilder { config: self.clone() }
    }
}

impl AsRef<Params> for Config {
    fn as_ref(&self) -> &Params {
        &self.params
    }
}

impl Deref for Config {
    type Target = Params;

    fn deref(&self) -> &Self::Target {
        &self.params
    }
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(params: Params) -> Self {
        Self { config: Config::new(params) }
    }

    pub fn set_perf_params(mut self, perf: PerfParams) -> Self {
        self.config.perf = perf;
        self
    }

    pub fn edit_consensus_params<F>(mut self, edit_func: F) -> Self
    where
        F: Fn(&mut Params),
    {
        edit_func(&mut self.config.params);
        self
    }

    pub fn keep_rejected_blocks(mut self) -> Self {
        self.config.prune_rejected_blocks = false;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::params::LOCAL_PARAMS;

    #[test]
    fn test_builder_edits() {
        let config = ConfigBuilder::new(LOCAL_PARAMS).edit_consensus_params(|p| p.min_stake_duration = 1).keep_rejected_blocks().build();
        assert_eq!(config.min_stake_duration, 1);
        assert!(!config.prune_rejected_blocks);
        assert_eq!(config.to_builder().build().network_id, LOCAL_PARAMS.network_id);
    }
}
