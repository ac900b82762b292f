//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use sealdoc_core::{
    AbiParam, AccessCondition, Comparator, ContractCondition, FunctionAbi, PolicyDescriptor,
    PolicyKind, ReturnValueTest, WorkingBundle, USER_ADDRESS,
};

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a chain name.
pub fn chain() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("ethereum".to_string()),
        Just("polygon".to_string()),
        "[a-z][a-z0-9-]{0,15}".prop_map(String::from),
    ]
}

/// Generate a 20-byte hex contract address.
pub fn contract_address() -> impl Strategy<Value = String> {
    any::<[u8; 20]>().prop_map(|bytes| format!("0x{}", hex::encode(bytes)))
}

/// Generate a comparator.
pub fn comparator() -> impl Strategy<Value = Comparator> {
    prop_oneof![
        Just(Comparator::Eq),
        Just(Comparator::Ne),
        Just(Comparator::Gt),
        Just(Comparator::Ge),
        Just(Comparator::Lt),
        Just(Comparator::Le),
    ]
}

/// Generate a return value test with a numeric or literal expected value.
pub fn return_value_test() -> impl Strategy<Value = ReturnValueTest> {
    let value = prop_oneof![
        (0u64..1_000_000).prop_map(|n| n.to_string()),
        Just("true".to_string()),
    ];
    (comparator(), value).prop_map(|(cmp, value)| ReturnValueTest::new(cmp, value))
}

/// Generate a call parameter, often the caller placeholder.
pub fn parameter() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(USER_ADDRESS.to_string()),
        contract_address(),
        (0u64..1000).prop_map(|n| n.to_string()),
    ]
}

/// Generate a standard condition.
pub fn access_condition() -> impl Strategy<Value = AccessCondition> {
    (
        contract_address(),
        prop_oneof![Just("ERC20"), Just("ERC721"), Just("ERC1155"), Just("")],
        prop_oneof![Just("balanceOf"), Just("ownerOf"), Just("isMember")],
        prop::collection::vec(parameter(), 0..3),
        return_value_test(),
    )
        .prop_map(|(address, standard, method, params, test)| {
            let mut condition = AccessCondition::new(address, method)
                .contract_type(standard)
                .expect(test.comparator, test.value);
            condition.parameters = params;
            condition
        })
}

/// Generate a contract condition whose ABI matches its call.
pub fn contract_condition() -> impl Strategy<Value = ContractCondition> {
    (
        contract_address(),
        "[a-z][a-zA-Z]{2,15}",
        prop::collection::vec(parameter(), 0..3),
        return_value_test(),
    )
        .prop_map(|(address, function, params, test)| ContractCondition {
            contract_address: address,
            function_name: function.clone(),
            function_abi: FunctionAbi {
                name: function,
                inputs: (0..params.len())
                    .map(|i| AbiParam::new(format!("arg{i}"), "address"))
                    .collect(),
                outputs: vec![AbiParam::new("", "uint256")],
                state_mutability: "view".into(),
            },
            function_params: params,
            return_value_test: test,
        })
}

/// Generate a well-formed policy of either kind.
pub fn policy() -> impl Strategy<Value = PolicyDescriptor> {
    prop_oneof![
        prop::collection::vec(access_condition(), 1..4).prop_map(PolicyDescriptor::standard),
        prop::collection::vec(contract_condition(), 1..4)
            .prop_map(PolicyDescriptor::contract_based),
    ]
}

/// Generate a working bundle with arbitrary binary fields.
///
/// The bundle is consistent in shape only: the key does not open the ciphertext.
pub fn working_bundle() -> impl Strategy<Value = WorkingBundle> {
    (payload(512), payload(160), policy(), chain()).prop_map(
        |(ciphertext, wrapped_key, policy, chain)| {
            let kind: PolicyKind = policy.kind();
            WorkingBundle::new(
                Bytes::from(ciphertext),
                Bytes::from(wrapped_key),
                policy,
                chain,
                kind,
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealdoc_core::{codec, to_wire, to_working, WireBundle};

    proptest! {
        #[test]
        fn test_codec_roundtrip(raw in payload(1024)) {
            let encoded = codec::encode(&raw);
            prop_assert_eq!(codec::decode(&encoded).unwrap(), raw);
        }

        #[test]
        fn test_bundle_roundtrip(bundle in working_bundle()) {
            prop_assert_eq!(to_working(&to_wire(&bundle)).unwrap(), bundle);
        }

        #[test]
        fn test_wire_json_roundtrip(bundle in working_bundle()) {
            let wire = to_wire(&bundle);
            let json = serde_json::to_string(&wire).unwrap();
            let parsed: WireBundle = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(to_working(&parsed).unwrap(), bundle);
        }

        #[test]
        fn test_generated_policies_validate(policy in policy()) {
            prop_assert!(policy.validate().is_ok());
        }

        #[test]
        fn test_policy_digest_deterministic(policy in policy()) {
            prop_assert_eq!(policy.digest().unwrap(), policy.clone().digest().unwrap());
        }

        #[test]
        fn test_policy_digest_tracks_address(
            policy in policy(),
            other in contract_address(),
        ) {
            let mut changed = policy.clone();
            let first = match &mut changed {
                PolicyDescriptor::Standard(p) => &mut p.conditions[0].contract_address,
                PolicyDescriptor::ContractBased(p) => &mut p.conditions[0].contract_address,
            };
            prop_assume!(*first != other);
            *first = other;

            prop_assert_ne!(policy.digest().unwrap(), changed.digest().unwrap());
        }
    }
}
