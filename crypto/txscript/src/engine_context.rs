use crate::SigCacheKey;
use crate::caches::Cache;
use crate::crypto::{CryptoProvider, SECP256K1_PROVIDER};
use crate::environment::XEntry;
use collider_consensus_core::config::params::{MAINNET_SCRIPT_PARAMS, ScriptParams};

pub type SigCache = Cache<SigCacheKey, bool>;

/// Handler consulted by OP_EMERGENCY once a live entry is found for the requested key
pub trait EmergencyService: Send + Sync {
    fn dispatch(&self, key: &str, entry: &XEntry) -> bool;
}

/// Collaborators and configuration shared by engine runs. Cheap to copy: everything is borrowed.
#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    pub(crate) sig_cache: &'a SigCache,
    pub(crate) params: ScriptParams,
    pub(crate) crypto: &'a dyn CryptoProvider,
    pub(crate) emergency_service: Option<&'a dyn EmergencyService>,
}

impl<'a> EngineContext<'a> {
    /// Create a context with mainnet params and the secp256k1 provider.
    pub fn new(sig_cache: &'a SigCache) -> Self {
        Self { sig_cache, params: MAINNET_SCRIPT_PARAMS, crypto: &SECP256K1_PROVIDER, emergency_service: None }
    }

    #[inline]
    pub fn with_params(mut self, params: ScriptParams) -> Self {
        self.params = params;
        self
    }

    #[inline]
    pub fn with_crypto_provider(mut self, crypto: &'a dyn CryptoProvider) -> Self {
        self.crypto = crypto;
        self
    }

    #[inline]
    pub fn with_emergency_service(mut self, service: &'a dyn EmergencyService) -> Self {
        self.emergency_service = Some(service);
        self
    }

    pub fn params(&self) -> &ScriptParams {
        &self.params
    }
}
