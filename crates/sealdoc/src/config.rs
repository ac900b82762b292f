//! Orchestrator configuration.

use serde::Deserialize;

/// Configuration for the Orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Verification network new documents are encrypted against.
    pub chain: String,
    /// Pass the loaded version to the store on rotation, so a concurrent
    /// writer surfaces as a conflict instead of being overwritten.
    pub compare_and_swap: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            chain: "ethereum".to_string(),
            compare_and_swap: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = chain.into();
        self
    }

    /// Last-writer-wins rotation.
    pub fn without_compare_and_swap(mut self) -> Self {
        self.compare_and_swap = false;
        self
    }
}
