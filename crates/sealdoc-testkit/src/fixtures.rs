//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: one simulated chain, one
//! gateway network and one shared store, seen by any number of callers.

use std::sync::Arc;

use sealdoc::{Orchestrator, OrchestratorConfig};
use sealdoc_core::{
    AbiParam, AccessCondition, ChainCall, Comparator, ContractCondition, FunctionAbi,
    PolicyDescriptor, ReturnValueTest, USER_ADDRESS,
};
use sealdoc_gate::{LocalGateway, LocalGatewayConfig, StaticChain, X25519StaticSecret};
use sealdoc_store::{MemoryDocumentStore, Session};

/// Chain every fixture evaluates on.
pub const CHAIN: &str = "ethereum";

/// Orchestrator type the fixtures hand out.
pub type TestOrchestrator = Orchestrator<LocalGateway, Arc<MemoryDocumentStore>>;

/// A test fixture with chain state, a gateway network and a memory store.
pub struct TestFixture {
    pub chain_state: Arc<StaticChain>,
    pub gateway: LocalGateway,
    pub store: Arc<MemoryDocumentStore>,
}

impl TestFixture {
    /// Create a new fixture with random network and session keys.
    pub fn new() -> Self {
        let chain_state = Arc::new(StaticChain::new());
        Self {
            gateway: LocalGateway::generate(chain_state.clone(), LocalGatewayConfig::default()),
            store: Arc::new(MemoryDocumentStore::new(Session::generate())),
            chain_state,
        }
    }

    /// Create with deterministic network and session keys.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        let chain_state = Arc::new(StaticChain::new());
        Self {
            gateway: LocalGateway::new(
                X25519StaticSecret::from_bytes(seed),
                chain_state.clone(),
                LocalGatewayConfig::default(),
            ),
            store: Arc::new(MemoryDocumentStore::new(Session::from_seed(&seed))),
            chain_state,
        }
    }

    /// Give `holder` one token of the contract behind [`holder_policy`].
    pub fn grant(&self, contract: &str, holder: &str) {
        self.set_balance(contract, holder, "1");
    }

    /// Take every token of `contract` away from `holder`.
    pub fn revoke(&self, contract: &str, holder: &str) {
        self.set_balance(contract, holder, "0");
    }

    /// Mark `member` as a member in the contract behind [`member_policy`].
    pub fn enroll(&self, contract: &str, member: &str) {
        let call = ChainCall::new(contract, "isMember", vec![member.to_string()]);
        self.chain_state
            .set(CHAIN, call, "true")
            .expect("static chain lock poisoned");
    }

    fn set_balance(&self, contract: &str, holder: &str, balance: &str) {
        let call = ChainCall::new(contract, "balanceOf", vec![holder.to_string()]);
        self.chain_state
            .set(CHAIN, call, balance)
            .expect("static chain lock poisoned");
    }

    /// An orchestrator acting as `caller` over the shared network and store.
    pub fn orchestrator_for(&self, caller: &str) -> TestOrchestrator {
        Orchestrator::new(
            self.gateway.as_caller(caller),
            Arc::clone(&self.store),
            OrchestratorConfig::default().with_chain(CHAIN),
        )
        .expect("fixture store has a session")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard policy: caller holds at least one token of `contract`.
pub fn holder_policy(contract: &str) -> PolicyDescriptor {
    PolicyDescriptor::standard(vec![AccessCondition::new(contract, "balanceOf")
        .contract_type("ERC721")
        .param(USER_ADDRESS)])
}

/// Contract-based policy: `contract.isMember(caller)` returns true.
pub fn member_policy(contract: &str) -> PolicyDescriptor {
    PolicyDescriptor::contract_based(vec![ContractCondition {
        contract_address: contract.to_string(),
        function_name: "isMember".into(),
        function_params: vec![USER_ADDRESS.into()],
        function_abi: FunctionAbi {
            name: "isMember".into(),
            inputs: vec![AbiParam::new("account", "address")],
            outputs: vec![AbiParam::new("", "bool")],
            state_mutability: "view".into(),
        },
        return_value_test: ReturnValueTest::new(Comparator::Eq, "true"),
    }])
}

/// Distinct caller addresses, `0x...01` onward.
pub fn callers(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("0x{i:040x}")).collect()
}

/// Distinct contract addresses, disjoint from [`callers`].
pub fn contracts(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("0xc{i:039x}")).collect()
}
