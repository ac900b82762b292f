//! Chain reads for condition evaluation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sealdoc_core::ChainCall;

use crate::error::{GatewayError, Result};

/// Answers read-only contract calls on a verification network.
#[async_trait]
pub trait ConditionEvaluator: Send + Sync {
    /// Perform `call` on `chain` and return its result rendered as a string.
    async fn call(&self, chain: &str, call: &ChainCall) -> Result<String>;
}

#[async_trait]
impl<E: ConditionEvaluator + ?Sized> ConditionEvaluator for Arc<E> {
    async fn call(&self, chain: &str, call: &ChainCall) -> Result<String> {
        (**self).call(chain, call).await
    }
}

/// In-memory chain state, for tests and local deployments.
///
/// Calls with no recorded answer return the fallback value ("0" by default).
#[derive(Debug)]
pub struct StaticChain {
    answers: RwLock<HashMap<(String, ChainCall), String>>,
    fallback: String,
}

impl StaticChain {
    pub fn new() -> Self {
        Self {
            answers: RwLock::new(HashMap::new()),
            fallback: "0".to_string(),
        }
    }

    /// Use `fallback` for calls with no recorded answer.
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Record the answer to `call` on `chain`.
    pub fn set(&self, chain: &str, call: ChainCall, answer: impl Into<String>) -> Result<()> {
        let mut answers = self
            .answers
            .write()
            .map_err(|e| GatewayError::Evaluator(e.to_string()))?;
        answers.insert((chain.to_string(), call), answer.into());
        Ok(())
    }

    /// Forget the answer to `call` on `chain`.
    pub fn clear(&self, chain: &str, call: &ChainCall) -> Result<()> {
        let mut answers = self
            .answers
            .write()
            .map_err(|e| GatewayError::Evaluator(e.to_string()))?;
        answers.remove(&(chain.to_string(), call.clone()));
        Ok(())
    }
}

impl Default for StaticChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConditionEvaluator for StaticChain {
    async fn call(&self, chain: &str, call: &ChainCall) -> Result<String> {
        let answers = self
            .answers
            .read()
            .map_err(|e| GatewayError::Evaluator(e.to_string()))?;

        Ok(answers
            .get(&(chain.to_string(), call.clone()))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}
