//! Access policies.
//!
//! A policy is the rule set a verification network evaluates before it
//! releases a content key. Two dialects exist: `standard` conditions that
//! name a well-known contract type and method, and `contract-based`
//! conditions that carry a full function ABI. Both lower to the same
//! [`ChainCall`] + [`ReturnValueTest`] pair for evaluation.
//!
//! Policies are values. Changing who may decrypt means building a new
//! descriptor, never editing one in place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::canonical::policy_digest;
use crate::error::{CoreError, Result};
use crate::types::Blake3Hash;

/// Parameter placeholder replaced with the caller's address at evaluation time.
pub const USER_ADDRESS: &str = ":userAddress";

/// Which condition dialect a policy uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Conditions against well-known contract standards.
    #[default]
    #[serde(alias = "accessControlConditions")]
    Standard,
    /// Conditions carrying an explicit contract function ABI.
    #[serde(alias = "evmContractConditions")]
    ContractBased,
}

impl PolicyKind {
    /// Canonical wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Standard => "standard",
            PolicyKind::ContractBased => "contract-based",
        }
    }

    /// Name used by older documents for the same dialect.
    pub const fn legacy_name(&self) -> &'static str {
        match self {
            PolicyKind::Standard => "accessControlConditions",
            PolicyKind::ContractBased => "evmContractConditions",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "standard" | "accessControlConditions" => Ok(PolicyKind::Standard),
            "contract-based" | "evmContractConditions" => Ok(PolicyKind::ContractBased),
            other => Err(CoreError::InvalidPolicyKind(other.to_string())),
        }
    }
}

/// Comparison applied to the value a chain call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl Comparator {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected outcome of a chain call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReturnValueTest {
    pub comparator: Comparator,
    pub value: String,
}

impl ReturnValueTest {
    pub fn new(comparator: Comparator, value: impl Into<String>) -> Self {
        Self {
            comparator,
            value: value.into(),
        }
    }

    /// Check an observed value against this test.
    ///
    /// Both sides are compared as integers when both parse as `i128`.
    /// Otherwise only `=` and `!=` are meaningful and ordering tests fail.
    pub fn check(&self, observed: &str) -> bool {
        let expected = self.value.as_str();
        match (observed.trim().parse::<i128>(), expected.trim().parse::<i128>()) {
            (Ok(o), Ok(e)) => match self.comparator {
                Comparator::Eq => o == e,
                Comparator::Ne => o != e,
                Comparator::Gt => o > e,
                Comparator::Ge => o >= e,
                Comparator::Lt => o < e,
                Comparator::Le => o <= e,
            },
            _ => match self.comparator {
                Comparator::Eq => observed.eq_ignore_ascii_case(expected),
                Comparator::Ne => !observed.eq_ignore_ascii_case(expected),
                _ => false,
            },
        }
    }
}

/// A condition against a well-known contract standard (ERC20, ERC721, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCondition {
    pub contract_address: String,
    #[serde(default)]
    pub standard_contract_type: String,
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    pub return_value_test: ReturnValueTest,
}

impl AccessCondition {
    /// Start a condition calling `method` on `contract_address`.
    ///
    /// The default test is `> 0`, the usual "holds at least one" shape.
    pub fn new(contract_address: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            contract_address: contract_address.into(),
            standard_contract_type: String::new(),
            method: method.into(),
            parameters: Vec::new(),
            return_value_test: ReturnValueTest::new(Comparator::Gt, "0"),
        }
    }

    pub fn contract_type(mut self, standard: impl Into<String>) -> Self {
        self.standard_contract_type = standard.into();
        self
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.parameters.push(param.into());
        self
    }

    pub fn expect(mut self, comparator: Comparator, value: impl Into<String>) -> Self {
        self.return_value_test = ReturnValueTest::new(comparator, value);
        self
    }
}

/// One parameter in a function ABI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbiParam {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl AbiParam {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// ABI of the contract function a contract-based condition calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionAbi {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
    #[serde(default = "default_state_mutability")]
    pub state_mutability: String,
}

fn default_state_mutability() -> String {
    "view".to_string()
}

/// A condition calling an arbitrary contract function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCondition {
    pub contract_address: String,
    pub function_name: String,
    #[serde(default)]
    pub function_params: Vec<String>,
    pub function_abi: FunctionAbi,
    pub return_value_test: ReturnValueTest,
}

/// Policy body for [`PolicyKind::Standard`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StandardPolicy {
    pub conditions: Vec<AccessCondition>,
}

/// Policy body for [`PolicyKind::ContractBased`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractPolicy {
    pub conditions: Vec<ContractCondition>,
}

/// Who may decrypt a bundle.
///
/// All conditions must hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PolicyDescriptor {
    Standard(StandardPolicy),
    ContractBased(ContractPolicy),
}

/// A read-only contract call, after placeholder substitution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainCall {
    pub contract_address: String,
    pub method: String,
    pub parameters: Vec<String>,
}

impl ChainCall {
    pub fn new(
        contract_address: impl Into<String>,
        method: impl Into<String>,
        parameters: Vec<String>,
    ) -> Self {
        Self {
            contract_address: contract_address.into(),
            method: method.into(),
            parameters,
        }
    }
}

impl PolicyDescriptor {
    /// Build a standard policy.
    pub fn standard(conditions: Vec<AccessCondition>) -> Self {
        PolicyDescriptor::Standard(StandardPolicy { conditions })
    }

    /// Build a contract-based policy.
    pub fn contract_based(conditions: Vec<ContractCondition>) -> Self {
        PolicyDescriptor::ContractBased(ContractPolicy { conditions })
    }

    /// The dialect tag of this policy.
    pub fn kind(&self) -> PolicyKind {
        match self {
            PolicyDescriptor::Standard(_) => PolicyKind::Standard,
            PolicyDescriptor::ContractBased(_) => PolicyKind::ContractBased,
        }
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        match self {
            PolicyDescriptor::Standard(p) => p.conditions.len(),
            PolicyDescriptor::ContractBased(p) => p.conditions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Structural checks. Says nothing about whether a caller satisfies it.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(CoreError::InvalidPolicy("policy has no conditions".into()));
        }

        match self {
            PolicyDescriptor::Standard(p) => {
                for (i, c) in p.conditions.iter().enumerate() {
                    if c.contract_address.trim().is_empty() {
                        return Err(CoreError::InvalidPolicy(format!(
                            "condition {i}: empty contract address"
                        )));
                    }
                    if c.method.trim().is_empty() {
                        return Err(CoreError::InvalidPolicy(format!(
                            "condition {i}: empty method"
                        )));
                    }
                }
            }
            PolicyDescriptor::ContractBased(p) => {
                for (i, c) in p.conditions.iter().enumerate() {
                    if c.contract_address.trim().is_empty() {
                        return Err(CoreError::InvalidPolicy(format!(
                            "condition {i}: empty contract address"
                        )));
                    }
                    if c.function_name.trim().is_empty() {
                        return Err(CoreError::InvalidPolicy(format!(
                            "condition {i}: empty function name"
                        )));
                    }
                    if c.function_abi.name != c.function_name {
                        return Err(CoreError::InvalidPolicy(format!(
                            "condition {i}: abi describes {} but calls {}",
                            c.function_abi.name, c.function_name
                        )));
                    }
                    if c.function_abi.inputs.len() != c.function_params.len() {
                        return Err(CoreError::InvalidPolicy(format!(
                            "condition {i}: abi takes {} inputs, {} given",
                            c.function_abi.inputs.len(),
                            c.function_params.len()
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Lower every condition to a chain call and its expected outcome.
    ///
    /// [`USER_ADDRESS`] in any parameter is replaced with `caller`.
    pub fn calls(&self, caller: &str) -> Vec<(ChainCall, &ReturnValueTest)> {
        let substitute = |params: &[String]| -> Vec<String> {
            params
                .iter()
                .map(|p| {
                    if p == USER_ADDRESS {
                        caller.to_string()
                    } else {
                        p.clone()
                    }
                })
                .collect()
        };

        match self {
            PolicyDescriptor::Standard(p) => p
                .conditions
                .iter()
                .map(|c| {
                    (
                        ChainCall::new(&c.contract_address, &c.method, substitute(&c.parameters)),
                        &c.return_value_test,
                    )
                })
                .collect(),
            PolicyDescriptor::ContractBased(p) => p
                .conditions
                .iter()
                .map(|c| {
                    (
                        ChainCall::new(
                            &c.contract_address,
                            &c.function_name,
                            substitute(&c.function_params),
                        ),
                        &c.return_value_test,
                    )
                })
                .collect(),
        }
    }

    /// Blake3 digest of the canonical encoding.
    pub fn digest(&self) -> Result<Blake3Hash> {
        policy_digest(self)
    }
}
