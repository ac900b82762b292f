//! The Orchestrator: encrypted document lifecycle.
//!
//! Ties an [`EncryptionGateway`] to a [`DocumentStore`]. Each call is
//! self-contained: the orchestrator keeps no state between calls beyond
//! its collaborators and configuration.

use std::sync::Arc;

use tracing::{debug, info, warn};

use sealdoc_core::{
    to_wire, to_working, DecodeError, DocumentHandle, PolicyDescriptor, PolicyKind, WireBundle,
    WorkingBundle,
};
use sealdoc_gate::EncryptionGateway;
use sealdoc_store::{DocumentMetadata, DocumentStore, StoreError};

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};

/// Encrypts documents under access policies, stores them, and rotates who
/// may read them.
pub struct Orchestrator<G, S> {
    gateway: Arc<G>,
    store: Arc<S>,
    config: OrchestratorConfig,
}

impl<G, S> Clone for Orchestrator<G, S> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<G: EncryptionGateway, S: DocumentStore> Orchestrator<G, S> {
    /// Create an orchestrator.
    ///
    /// The store must already hold an authenticated session.
    pub fn new(gateway: G, store: S, config: OrchestratorConfig) -> Result<Self> {
        Self::from_shared(Arc::new(gateway), Arc::new(store), config)
    }

    /// Create an orchestrator over collaborators shared with other owners.
    pub fn from_shared(gateway: Arc<G>, store: Arc<S>, config: OrchestratorConfig) -> Result<Self> {
        if config.chain.trim().is_empty() {
            return Err(OrchestratorError::InvalidConfig("chain is empty".into()));
        }
        if !store.is_authenticated() {
            return Err(OrchestratorError::NotAuthenticated);
        }

        Ok(Self {
            gateway,
            store,
            config,
        })
    }

    /// The chain new documents are encrypted against.
    pub fn chain(&self) -> &str {
        &self.config.chain
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Encrypt
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt `plaintext` under `policy` on the configured chain and store it.
    ///
    /// No handle is returned unless the document was written.
    pub async fn encrypt_and_store(
        &self,
        plaintext: &[u8],
        policy: &PolicyDescriptor,
        policy_kind: PolicyKind,
        metadata: Option<&DocumentMetadata>,
    ) -> Result<DocumentHandle> {
        self.encrypt_and_store_on(&self.config.chain, plaintext, policy, policy_kind, metadata)
            .await
    }

    /// [`Orchestrator::encrypt_and_store`] against an explicit chain.
    pub async fn encrypt_and_store_on(
        &self,
        chain: &str,
        plaintext: &[u8],
        policy: &PolicyDescriptor,
        policy_kind: PolicyKind,
        metadata: Option<&DocumentMetadata>,
    ) -> Result<DocumentHandle> {
        if chain.trim().is_empty() {
            return Err(OrchestratorError::InvalidConfig("chain is empty".into()));
        }
        check_kind(policy, policy_kind)?;
        policy.validate()?;

        info!(chain, policy_kind = %policy_kind, "encrypting document");

        let bundle = self
            .gateway
            .encrypt(plaintext, policy, chain, policy_kind)
            .await
            .map_err(OrchestratorError::Encryption)?;

        let wire = to_wire(&bundle);
        let handle = self.store.create(&wire, metadata).await?;

        info!(handle = %handle, chain, policy_kind = %policy_kind, "stored encrypted document");
        Ok(handle)
    }

    /// [`Orchestrator::encrypt_and_store`] with the kind given by name.
    ///
    /// Accepts `standard` and `contract-based` as well as the legacy
    /// `accessControlConditions` and `evmContractConditions`.
    pub async fn encrypt_and_store_str(
        &self,
        plaintext: &[u8],
        policy: &PolicyDescriptor,
        policy_kind: &str,
        metadata: Option<&DocumentMetadata>,
    ) -> Result<DocumentHandle> {
        let kind: PolicyKind = policy_kind.parse()?;
        self.encrypt_and_store(plaintext, policy, kind, metadata).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decrypt
    // ─────────────────────────────────────────────────────────────────────────

    /// Read the stored bundle without decrypting it.
    pub async fn load_bundle(&self, handle: &DocumentHandle) -> Result<WireBundle> {
        Ok(self.store.load(handle).await?.content)
    }

    /// Load the latest version of `handle` and decrypt it.
    pub async fn load_and_decrypt(&self, handle: &DocumentHandle) -> Result<Vec<u8>> {
        info!(handle = %handle, "decrypting document");

        let (bundle, _) = self.load_working(handle).await?;

        let plaintext = self
            .gateway
            .decrypt(
                &bundle.ciphertext,
                &bundle.wrapped_key,
                &bundle.policy,
                &bundle.chain,
                bundle.policy_kind,
            )
            .await
            .map_err(|source| {
                warn!(handle = %handle, chain = %bundle.chain, error = %source, "decryption denied");
                OrchestratorError::DecryptionDenied {
                    handle: handle.clone(),
                    source,
                }
            })?;

        info!(
            handle = %handle,
            chain = %bundle.chain,
            policy_kind = %bundle.policy_kind,
            "decrypted document"
        );
        Ok(plaintext)
    }

    /// [`Orchestrator::load_and_decrypt`] for text payloads.
    pub async fn load_and_decrypt_string(&self, handle: &DocumentHandle) -> Result<String> {
        let plaintext = self.load_and_decrypt(handle).await?;
        String::from_utf8(plaintext).map_err(|source| OrchestratorError::InvalidPlaintext {
            handle: handle.clone(),
            source,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rotate
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the policy governing `handle` without re-encrypting the payload.
    ///
    /// The content key is rewrapped for `new_policy` and the rewrapped key is
    /// written back with it. The ciphertext, chain and kind are unchanged.
    /// The gateway refuses callers other than the document's owner, which
    /// surfaces as [`OrchestratorError::RotationFailed`].
    /// On failure the stored bundle is left as it was.
    pub async fn rotate_access(
        &self,
        handle: &DocumentHandle,
        new_policy: &PolicyDescriptor,
    ) -> Result<DocumentHandle> {
        info!(handle = %handle, "rotating access");

        let (bundle, version) = match self.load_working(handle).await {
            Ok(loaded) => loaded,
            Err(OrchestratorError::Store(e)) => return Err(rotation_failed(handle, e)),
            Err(e) => return Err(e),
        };

        check_kind(new_policy, bundle.policy_kind)?;
        new_policy.validate()?;

        let wrapped_key = self
            .gateway
            .rewrap_key(&bundle.wrapped_key, new_policy, &bundle.chain)
            .await
            .map_err(|e| rotation_failed(handle, e))?;
        debug!(handle = %handle, chain = %bundle.chain, "rewrapped content key");

        let rotated = bundle.with_rotated_access(wrapped_key, new_policy.clone());
        let wire = to_wire(&rotated);

        let expected = self.config.compare_and_swap.then_some(version);
        match self.store.update(handle, &wire, expected).await {
            Ok(new_version) => {
                info!(
                    handle = %handle,
                    chain = %rotated.chain,
                    policy_kind = %rotated.policy_kind,
                    version = new_version,
                    "rotated access"
                );
                Ok(handle.clone())
            }
            Err(StoreError::VersionConflict {
                expected, actual, ..
            }) => {
                warn!(handle = %handle, expected, actual, "concurrent modification");
                Err(OrchestratorError::ConcurrentModification {
                    handle: handle.clone(),
                    expected,
                    actual,
                })
            }
            Err(e) => Err(rotation_failed(handle, e)),
        }
    }

    async fn load_working(&self, handle: &DocumentHandle) -> Result<(WorkingBundle, u64)> {
        let doc = self.store.load(handle).await.map_err(|e| match e {
            StoreError::Serialization(reason) => {
                corrupt_bundle(handle, DecodeError::new(DecodeError::DOCUMENT, reason))
            }
            other => OrchestratorError::Store(other),
        })?;
        debug!(handle = %handle, version = doc.version, "loaded document");

        let bundle = to_working(&doc.content).map_err(|source| corrupt_bundle(handle, source))?;

        Ok((bundle, doc.version))
    }
}

fn corrupt_bundle(handle: &DocumentHandle, source: DecodeError) -> OrchestratorError {
    warn!(handle = %handle, field = source.field, error = %source.reason, "corrupt bundle");
    OrchestratorError::CorruptBundle {
        handle: handle.clone(),
        source,
    }
}

fn check_kind(policy: &PolicyDescriptor, declared: PolicyKind) -> Result<()> {
    let actual = policy.kind();
    if actual != declared {
        return Err(OrchestratorError::InvalidPolicyKind(format!(
            "declared {declared}, policy is {actual}"
        )));
    }
    Ok(())
}

fn rotation_failed<E>(handle: &DocumentHandle, source: E) -> OrchestratorError
where
    E: std::error::Error + Send + Sync + 'static,
{
    warn!(handle = %handle, error = %source, "access rotation failed");
    OrchestratorError::RotationFailed {
        handle: handle.clone(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealdoc_core::{AccessCondition, USER_ADDRESS};
    use sealdoc_gate::{LocalGateway, LocalGatewayConfig, StaticChain};
    use sealdoc_store::{MemoryDocumentStore, Session};

    fn policy(contract: &str) -> PolicyDescriptor {
        PolicyDescriptor::standard(vec![AccessCondition::new(contract, "balanceOf")
            .param(USER_ADDRESS)])
    }

    fn gateway() -> LocalGateway {
        LocalGateway::generate(
            Arc::new(StaticChain::new().with_fallback("1")),
            LocalGatewayConfig::default(),
        )
    }

    fn orchestrator() -> Orchestrator<LocalGateway, MemoryDocumentStore> {
        Orchestrator::new(
            gateway(),
            MemoryDocumentStore::new(Session::generate()),
            OrchestratorConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_requires_session() {
        let result = Orchestrator::new(
            gateway(),
            MemoryDocumentStore::unauthenticated(),
            OrchestratorConfig::default(),
        );
        assert!(matches!(result, Err(OrchestratorError::NotAuthenticated)));
    }

    #[test]
    fn test_new_requires_chain() {
        let result = Orchestrator::new(
            gateway(),
            MemoryDocumentStore::new(Session::generate()),
            OrchestratorConfig::default().with_chain("  "),
        );
        assert!(matches!(result, Err(OrchestratorError::InvalidConfig(_))));
    }

    #[test]
    fn test_accessors() {
        let orch = orchestrator();
        assert_eq!(orch.chain(), "ethereum");
        assert!(orch.store().is_empty());
        assert!(orch.gateway().supports("ethereum"));
        assert!(orch.clone().config().compare_and_swap);
    }

    #[tokio::test]
    async fn test_roundtrip() {
        let orch = orchestrator();
        let handle = orch
            .encrypt_and_store(b"hello", &policy("0xaaa"), PolicyKind::Standard, None)
            .await
            .unwrap();

        assert_eq!(orch.load_and_decrypt(&handle).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_kind_mismatch_writes_nothing() {
        let orch = orchestrator();
        let err = orch
            .encrypt_and_store(b"hello", &policy("0xaaa"), PolicyKind::ContractBased, None)
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::InvalidPolicyKind(_)));
        assert!(err.is_invalid_input());
        assert!(orch.store().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_kind_name() {
        let orch = orchestrator();
        let err = orch
            .encrypt_and_store_str(b"hello", &policy("0xaaa"), "unknownConditions", None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidPolicyKind(k) if k == "unknownConditions"));
    }

    #[tokio::test]
    async fn test_legacy_kind_name() {
        let orch = orchestrator();
        let handle = orch
            .encrypt_and_store_str(b"hello", &policy("0xaaa"), "accessControlConditions", None)
            .await
            .unwrap();

        let wire = orch.load_bundle(&handle).await.unwrap();
        assert_eq!(wire.policy_kind, PolicyKind::Standard);
    }

    #[tokio::test]
    async fn test_empty_policy_rejected() {
        let orch = orchestrator();
        let err = orch
            .encrypt_and_store(
                b"hello",
                &PolicyDescriptor::standard(vec![]),
                PolicyKind::Standard,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidPolicy(_)));
    }

    #[tokio::test]
    async fn test_unsupported_chain_is_encryption_error() {
        let orch = orchestrator();
        let err = orch
            .encrypt_and_store_on("solana", b"hello", &policy("0xaaa"), PolicyKind::Standard, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Encryption(_)));
        assert!(orch.store().is_empty());
    }

    #[tokio::test]
    async fn test_missing_handle_is_store_error() {
        let orch = orchestrator();
        let handle = DocumentHandle::parse("sd1missing").unwrap();

        assert!(matches!(
            orch.load_and_decrypt(&handle).await,
            Err(OrchestratorError::Store(StoreError::NotFound(_)))
        ));
        assert!(matches!(
            orch.rotate_access(&handle, &policy("0xbbb")).await,
            Err(OrchestratorError::RotationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_rotation_cannot_change_kind() {
        use sealdoc_core::{AbiParam, Comparator, ContractCondition, FunctionAbi, ReturnValueTest};

        let orch = orchestrator();
        let handle = orch
            .encrypt_and_store(b"hello", &policy("0xaaa"), PolicyKind::Standard, None)
            .await
            .unwrap();

        let contract = PolicyDescriptor::contract_based(vec![ContractCondition {
            contract_address: "0xccc".into(),
            function_name: "isMember".into(),
            function_params: vec![USER_ADDRESS.into()],
            function_abi: FunctionAbi {
                name: "isMember".into(),
                inputs: vec![AbiParam::new("who", "address")],
                outputs: vec![AbiParam::new("", "bool")],
                state_mutability: "view".into(),
            },
            return_value_test: ReturnValueTest::new(Comparator::Eq, "true"),
        }]);

        let err = orch.rotate_access(&handle, &contract).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidPolicyKind(_)));

        // Untouched
        assert_eq!(orch.store().history(&handle).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_utf8_payload() {
        let orch = orchestrator();
        let handle = orch
            .encrypt_and_store(&[0xff, 0xfe], &policy("0xaaa"), PolicyKind::Standard, None)
            .await
            .unwrap();

        let err = orch.load_and_decrypt_string(&handle).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidPlaintext { .. }));
        assert!(err.is_corrupt());
    }
}
