pub mod perf {
    //!
    //! Cache sizes and batch sizes. None of these are consensus sensitive.
    //!

    #[derive(Clone, Debug)]
    pub struct PerfParams {
        /// Preferred cache size for stored blocks and their statuses
        pub block_cache_size: usize,

        /// Preferred cache size for accepted txs
        pub tx_cache_size: usize,

        /// Preferred cache size for UTXOs
        pub utxo_cache_size: usize,

        /// Preferred cache size for the height index
        pub block_id_cache_size: usize,

        /// Number of blocks processed by the pruner between two lock releases
        pub pruner_batch_size: usize,
    }

    pub const PERF_PARAMS: PerfParams = PerfParams {
        block_cache_size: 512,
        tx_cache_size: 4096,
        utxo_cache_size: 16384,
        block_id_cache_size: 4096,
        pruner_batch_size: 1024,
    };
}
