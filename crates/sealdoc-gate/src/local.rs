//! In-process reference gateway.
//!
//! `LocalGateway` plays the part of a key-management network: it owns the
//! network X25519 secret that every content key is wrapped to, and it only
//! unwraps for callers whose chain state satisfies the bundle's policy.
//! A key's policy can only be changed by the address that encrypted it.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, warn};

use sealdoc_core::{PolicyDescriptor, PolicyKind, WorkingBundle};

use crate::crypto::{EncryptionKey, X25519PublicKey, X25519StaticSecret};
use crate::error::{GatewayError, Result};
use crate::evaluator::ConditionEvaluator;
use crate::gateway::EncryptionGateway;
use crate::wrap::{owner_id, WrappedKey};

/// Configuration for a [`LocalGateway`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocalGatewayConfig {
    /// Chains the gateway evaluates policies on.
    pub chains: Vec<String>,

    /// Address substituted for `:userAddress` when evaluating conditions.
    pub caller_address: String,
}

impl Default for LocalGatewayConfig {
    fn default() -> Self {
        Self {
            chains: vec!["ethereum".to_string(), "polygon".to_string()],
            caller_address: "0x0000000000000000000000000000000000000000".to_string(),
        }
    }
}

impl LocalGatewayConfig {
    pub fn with_caller(mut self, address: impl Into<String>) -> Self {
        self.caller_address = address.into();
        self
    }

    pub fn with_chains<I, S>(mut self, chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chains = chains.into_iter().map(Into::into).collect();
        self
    }
}

/// Reference [`EncryptionGateway`] backed by a local network key.
#[derive(Clone)]
pub struct LocalGateway {
    network: Arc<X25519StaticSecret>,
    network_public: X25519PublicKey,
    evaluator: Arc<dyn ConditionEvaluator>,
    chains: BTreeSet<String>,
    caller_address: String,
}

impl LocalGateway {
    pub fn new(
        network: X25519StaticSecret,
        evaluator: Arc<dyn ConditionEvaluator>,
        config: LocalGatewayConfig,
    ) -> Self {
        let network_public = network.public_key();
        Self {
            network: Arc::new(network),
            network_public,
            evaluator,
            chains: config.chains.into_iter().collect(),
            caller_address: config.caller_address,
        }
    }

    /// A gateway with a freshly generated network key.
    pub fn generate(evaluator: Arc<dyn ConditionEvaluator>, config: LocalGatewayConfig) -> Self {
        Self::new(X25519StaticSecret::generate(), evaluator, config)
    }

    /// The same network and chain state, seen by another caller.
    pub fn as_caller(&self, address: impl Into<String>) -> Self {
        Self {
            caller_address: address.into(),
            ..self.clone()
        }
    }

    pub fn caller_address(&self) -> &str {
        &self.caller_address
    }

    pub fn network_public(&self) -> &X25519PublicKey {
        &self.network_public
    }

    pub fn supports(&self, chain: &str) -> bool {
        self.chains.contains(chain)
    }

    fn check_chain(&self, chain: &str) -> Result<()> {
        if self.supports(chain) {
            Ok(())
        } else {
            Err(GatewayError::UnsupportedChain(chain.to_string()))
        }
    }

    fn check_kind(policy: &PolicyDescriptor, declared: PolicyKind) -> Result<()> {
        let actual = policy.kind();
        if actual == declared {
            Ok(())
        } else {
            Err(GatewayError::PolicyKindMismatch { declared, actual })
        }
    }

    /// Check every condition against the chain. Conditions are ANDed.
    async fn evaluate(&self, policy: &PolicyDescriptor, chain: &str) -> Result<()> {
        for (call, test) in policy.calls(&self.caller_address) {
            let observed = self.evaluator.call(chain, &call).await?;
            if !test.check(&observed) {
                return Err(GatewayError::ConditionsNotMet(format!(
                    "{}.{} returned {observed}, expected {} {}",
                    call.contract_address,
                    call.method,
                    test.comparator.as_str(),
                    test.value
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for LocalGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalGateway")
            .field("network_public", &self.network_public)
            .field("chains", &self.chains)
            .field("caller_address", &self.caller_address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EncryptionGateway for LocalGateway {
    async fn encrypt(
        &self,
        plaintext: &[u8],
        policy: &PolicyDescriptor,
        chain: &str,
        kind: PolicyKind,
    ) -> Result<WorkingBundle> {
        self.check_chain(chain)?;
        Self::check_kind(policy, kind)?;
        policy.validate()?;

        let content_key = EncryptionKey::generate();
        let ciphertext = content_key.seal(plaintext)?;

        let digest = policy.digest()?;
        let owner = owner_id(&self.caller_address);
        let wrapped = WrappedKey::wrap(&content_key, &self.network_public, digest, owner, chain)?;

        debug!(chain, policy_kind = %kind, policy_digest = %digest.to_hex(), "sealed payload");

        Ok(WorkingBundle::new(
            ciphertext,
            wrapped.to_bytes(),
            policy.clone(),
            chain,
            kind,
        ))
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        wrapped_key: &[u8],
        policy: &PolicyDescriptor,
        chain: &str,
        kind: PolicyKind,
    ) -> Result<Vec<u8>> {
        self.check_chain(chain)?;
        Self::check_kind(policy, kind)?;

        let wrapped = WrappedKey::from_bytes(wrapped_key)?;
        if wrapped.policy_digest != policy.digest()? {
            warn!(chain, "wrapped key is bound to another policy");
            return Err(GatewayError::PolicyMismatch);
        }

        if let Err(e) = self.evaluate(policy, chain).await {
            warn!(chain, caller = %self.caller_address, error = %e, "access refused");
            return Err(e);
        }

        let content_key = wrapped.unwrap(&self.network, chain)?;
        let plaintext = content_key.open(ciphertext)?;

        debug!(chain, policy_kind = %kind, "released payload");
        Ok(plaintext)
    }

    async fn rewrap_key(
        &self,
        wrapped_key: &[u8],
        new_policy: &PolicyDescriptor,
        chain: &str,
    ) -> Result<Bytes> {
        self.check_chain(chain)?;
        new_policy.validate()?;

        let old = WrappedKey::from_bytes(wrapped_key)?;
        if !old.is_owned_by(&self.caller_address) {
            warn!(chain, caller = %self.caller_address, "rewrap refused for non-owner");
            return Err(GatewayError::NotOwner(self.caller_address.clone()));
        }
        let content_key = old.unwrap(&self.network, chain)?;

        let digest = new_policy.digest()?;
        let rewrapped =
            WrappedKey::wrap(&content_key, &self.network_public, digest, old.owner, chain)?;

        debug!(
            chain,
            from = %old.policy_digest.to_hex(),
            to = %digest.to_hex(),
            "rewrapped content key"
        );
        Ok(Bytes::from(rewrapped.to_bytes()))
    }
}
