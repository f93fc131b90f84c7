pub mod script {
    //!
    //! A module for constants which bound script execution.
    //!

    /// Maximum number of non-push operations a single script may execute
    pub const MAX_OPS_PER_SCRIPT: usize = 201;

    /// Maximum number of items on the operand stack at any point of the execution
    pub const MAX_STACK_SIZE: usize = 244;

    /// Maximum number of public keys a multisig check may consume
    pub const MAX_PUB_KEYS_PER_MULTISIG: usize = 20;

    //
    // ~~~~~~~~~~~~~~~~~~~~~~~~~ Reserved broadcast queries ~~~~~~~~~~~~~~~~~~~~~~~~~
    //

    /// Number of blocks a query height stays fresh for OP_Q
    pub const Q_RECENCY_WINDOW: u64 = 66;

    /// Upper bound on OP_Q queries recorded by a single script run
    pub const MAX_Q_QUERIES: usize = 8;

    /// Default capacity of the shared signature cache
    pub const SIG_CACHE_SIZE: u64 = 10_000;
}
