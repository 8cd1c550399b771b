//! Contract call encodings used by the Safe account
//!
//! Only the selectors and argument layouts matter here; parameter names are local.

use crate::safe::user_operation::MetaTransaction;
use alloy::primitives::{Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    /// `Safe.setup`, executed by the proxy factory right after deployment
    #[derive(Debug)]
    function setup(
        address[] owners,
        uint256 threshold,
        address to,
        bytes data,
        address fallbackHandler,
        address paymentToken,
        uint256 payment,
        address paymentReceiver
    );

    /// `SafeModuleSetup.enableModules`, delegatecalled from `setup`
    #[derive(Debug)]
    function enableModules(address[] modules);

    /// `SafeProxyFactory.createProxyWithNonce`
    #[derive(Debug)]
    function createProxyWithNonce(address singleton, bytes initializer, uint256 saltNonce);

    /// `MultiSend.multiSend` / `MultiSendCallOnly.multiSend`
    #[derive(Debug)]
    function multiSend(bytes transactions);

    /// `Safe4337Module.executeUserOp`, the call data of every user operation
    #[derive(Debug)]
    function executeUserOp(address to, uint256 value, bytes data, uint8 operation);

    /// Passkey stored by `SafeWebAuthnSharedSigner`
    #[derive(Debug)]
    struct SharedSignerConfiguration {
        uint256 x;
        uint256 y;
        uint176 verifiers;
    }

    /// `SafeWebAuthnSharedSigner.configure`, delegatecalled from `setup`
    #[derive(Debug)]
    function configure(SharedSignerConfiguration signer);
}

/// Packs transactions in the MultiSend layout:
/// `operation (1) | to (20) | value (32) | data length (32) | data`
pub fn pack_multisend_transactions(transactions: &[MetaTransaction]) -> Bytes {
    let capacity = transactions
        .iter()
        .map(|tx| 85 + tx.data.len())
        .sum::<usize>();
    let mut packed = Vec::with_capacity(capacity);
    for tx in transactions {
        packed.push(tx.operation.as_u8());
        packed.extend_from_slice(tx.to.as_slice());
        packed.extend_from_slice(&tx.value.to_be_bytes::<32>());
        packed.extend_from_slice(&U256::from(tx.data.len()).to_be_bytes::<32>());
        packed.extend_from_slice(&tx.data);
    }
    Bytes::from(packed)
}

/// `multiSend(packed transactions)` call data
pub fn encode_multisend(transactions: &[MetaTransaction]) -> Bytes {
    multiSendCall {
        transactions: pack_multisend_transactions(transactions),
    }
    .abi_encode()
    .into()
}

/// `executeUserOp(to, value, data, operation)` call data for one transaction
pub fn encode_execute_user_op(tx: &MetaTransaction) -> Bytes {
    executeUserOpCall {
        to: tx.to,
        value: tx.value,
        data: tx.data.clone(),
        operation: tx.operation.as_u8(),
    }
    .abi_encode()
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safe::user_operation::Operation;
    use alloy::hex;
    use alloy::primitives::Address;

    #[test]
    fn selectors_match_deployed_contracts() {
        assert_eq!(setupCall::SELECTOR, hex!("b63e800d"));
        assert_eq!(enableModulesCall::SELECTOR, hex!("8d0dc49f"));
        assert_eq!(createProxyWithNonceCall::SELECTOR, hex!("1688f0b9"));
        assert_eq!(multiSendCall::SELECTOR, hex!("8d80ff0a"));
        assert_eq!(executeUserOpCall::SELECTOR, hex!("7bb37428"));
        assert_eq!(configureCall::SELECTOR, hex!("0dd9692f"));
    }

    #[test]
    fn multisend_packing_layout() {
        let tx = MetaTransaction {
            to: Address::repeat_byte(0xbb),
            value: U256::from(5),
            data: Bytes::from(vec![0xde, 0xad]),
            operation: Operation::DelegateCall,
        };
        let packed = pack_multisend_transactions(std::slice::from_ref(&tx));

        assert_eq!(packed.len(), 85 + 2);
        assert_eq!(packed[0], 1);
        assert_eq!(&packed[1..21], tx.to.as_slice());
        assert_eq!(U256::from_be_slice(&packed[21..53]), U256::from(5));
        assert_eq!(U256::from_be_slice(&packed[53..85]), U256::from(2));
        assert_eq!(&packed[85..], &[0xde, 0xad]);
    }

    #[test]
    fn multisend_keeps_transaction_order() {
        let first = MetaTransaction::call(Address::repeat_byte(0x01), U256::ZERO, Bytes::new());
        let second = MetaTransaction::call(Address::repeat_byte(0x02), U256::ZERO, Bytes::new());
        let packed = pack_multisend_transactions(&[first.clone(), second.clone()]);

        assert_eq!(&packed[1..21], first.to.as_slice());
        assert_eq!(&packed[86..106], second.to.as_slice());
        assert_ne!(
            encode_multisend(&[first.clone(), second.clone()]),
            encode_multisend(&[second, first])
        );
    }

    #[test]
    fn execute_user_op_round_trips() {
        let tx = MetaTransaction::call(
            Address::repeat_byte(0xbb),
            U256::from(1),
            Bytes::from(vec![0x01, 0x02, 0x03]),
        );
        let encoded = encode_execute_user_op(&tx);
        let decoded = executeUserOpCall::abi_decode(&encoded).unwrap();

        assert_eq!(decoded.to, tx.to);
        assert_eq!(decoded.value, tx.value);
        assert_eq!(decoded.data, tx.data);
        assert_eq!(decoded.operation, 0);
    }
}
