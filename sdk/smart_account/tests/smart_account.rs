//! End-to-end populate / sign / send flows of `SmartAccount` against a mock provider.

use std::sync::Arc;

use assert_matches::assert_matches;
use futures::FutureExt;
use test_casing::test_casing;
use zksync_aa_crypto::K256PrivateKey;
use zksync_aa_provider::{contracts, mock::MockProvider, ProviderError};
use zksync_aa_types::{
    api::BlockTag,
    ethabi::{self, Token},
    paymaster::get_approval_based_paymaster_input,
    Address, Bytes, CustomData, PackedEthSignature, PopulatedTransaction, TransactionRequest,
    TransactionType, ETHEREUM_ADDRESS, L2_BASE_TOKEN_ADDRESS, NONCE_HOLDER_ADDRESS, U256,
};
use zksync_smart_account::{
    ClientError, CustomSigner, DynProvider, EcdsaTransactionBuilder, Secret, SignerError,
    SmartAccount, TransferParams, WithdrawParams,
};

const CHAIN_ID: u64 = 270;
const GAS_PRICE: u64 = 250_000_000;

fn mock() -> Arc<MockProvider> {
    Arc::new(
        MockProvider::builder()
            .chain_id(CHAIN_ID)
            .gas_price(GAS_PRICE.into())
            .nonce(5.into())
            .gas_estimate(1_000_000.into())
            .build(),
    )
}

fn provider_of(mock: &Arc<MockProvider>) -> Option<DynProvider> {
    let provider: DynProvider = mock.clone();
    Some(provider)
}

fn recipient() -> Address {
    Address::repeat_byte(0xaa)
}

fn custom_request() -> TransactionRequest {
    TransactionRequest::default()
        .to(recipient())
        .value(7_000_000_000_u64.into())
        .transaction_type(0x71)
}

fn decode_sent(mock: &MockProvider) -> (PopulatedTransaction, Option<PackedEthSignature>) {
    let sent = mock.sent_transactions();
    assert_eq!(sent.len(), 1);
    PopulatedTransaction::from_bytes(&sent[0].0).unwrap()
}

#[tokio::test]
async fn custom_transaction_is_populated_with_network_defaults() {
    let mock = mock();
    let key = K256PrivateKey::random();
    let account = SmartAccount::ecdsa(key.clone(), provider_of(&mock));

    let tx = account.populate_transaction(custom_request()).await.unwrap();
    assert_eq!(tx.transaction_type, TransactionType::Eip712);
    assert_eq!(tx.to, Some(recipient()));
    assert_eq!(tx.value, 7_000_000_000_u64.into());
    assert_eq!(tx.from, Some(key.address()));
    assert_eq!(tx.nonce, 5.into());
    assert_eq!(tx.chain_id, Some(CHAIN_ID));
    assert_eq!(tx.gas_price, Some(GAS_PRICE.into()));
    assert_eq!(tx.gas_limit, 1_000_000.into());
    assert_eq!(tx.data, Bytes::default());
    let meta = tx.custom_data.unwrap();
    assert_eq!(meta.gas_per_pubdata, 50_000.into());
    assert!(meta.factory_deps.is_empty());

    assert_eq!(mock.nonce_queries(), [(key.address(), BlockTag::Pending)]);
}

#[tokio::test]
async fn request_without_type_or_custom_data_is_legacy() {
    let mock = mock();
    let key = K256PrivateKey::random();
    let account = SmartAccount::ecdsa(key.clone(), provider_of(&mock));

    let request = TransactionRequest::default().to(recipient()).value(1.into());
    let tx = account.populate_transaction(request.clone()).await.unwrap();
    assert_eq!(tx.transaction_type, TransactionType::Legacy);
    assert_eq!(tx.gas_price, Some(GAS_PRICE.into()));
    assert!(tx.custom_data.is_none());

    account.send_transaction(request).await.unwrap();
    let (sent, signature) = decode_sent(&mock);
    assert_eq!(sent.transaction_type, TransactionType::Legacy);
    assert_eq!(sent.chain_id, Some(CHAIN_ID));
    let message = sent.get_default_signed_message().unwrap();
    assert_eq!(
        signature.unwrap().signature_recover_signer(&message).unwrap(),
        key.address()
    );
}

#[tokio::test]
async fn mixed_fee_fields_are_rejected() {
    let account = SmartAccount::ecdsa(K256PrivateKey::random(), provider_of(&mock()));
    let request = TransactionRequest {
        gas_price: Some(1.into()),
        max_fee_per_gas: Some(2.into()),
        max_priority_fee_per_gas: Some(1.into()),
        ..TransactionRequest::default().to(recipient())
    };
    let err = account.sign_transaction(request).await.unwrap_err();
    assert_matches!(err, ClientError::ConflictingFeeFields);
}

#[tokio::test]
async fn foreign_sender_is_rejected() {
    let account = SmartAccount::ecdsa(K256PrivateKey::random(), provider_of(&mock()));
    let request = custom_request().from(Address::repeat_byte(0x01));
    let err = account.sign_transaction(request).await.unwrap_err();
    assert_matches!(
        err,
        ClientError::FromAddressMismatch { expected, actual }
            if expected == account.address() && actual == Address::repeat_byte(0x01)
    );
}

#[tokio::test]
async fn chain_id_must_match_network() {
    let account = SmartAccount::ecdsa(K256PrivateKey::random(), provider_of(&mock()));
    let request = TransactionRequest {
        chain_id: Some(324),
        ..custom_request()
    };
    let err = account.populate_transaction(request).await.unwrap_err();
    assert_matches!(
        err,
        ClientError::ChainIdMismatch {
            expected: CHAIN_ID,
            actual: 324
        }
    );
}

#[tokio::test]
async fn signed_custom_transaction_round_trips() -> anyhow::Result<()> {
    let mock = mock();
    let key = K256PrivateKey::random();
    let account = SmartAccount::ecdsa(key.clone(), provider_of(&mock));

    let populated = account.populate_transaction(custom_request()).await?;
    let response = account.send_transaction(custom_request()).await?;
    let (sent, ecdsa_slot) = decode_sent(&mock);
    assert!(ecdsa_slot.is_none());

    let signature = sent.get_custom_signature().unwrap().to_vec();
    let mut expected = populated.clone();
    expected.set_custom_signature(signature.clone());
    assert_eq!(sent.nonce, expected.nonce);
    assert_eq!(sent.to, expected.to);
    assert_eq!(sent.from, expected.from);
    assert_eq!(sent.value, expected.value);
    assert_eq!(sent.data, expected.data);
    assert_eq!(sent.gas_limit, expected.gas_limit);
    assert_eq!(sent.chain_id, expected.chain_id);
    assert_eq!(
        sent.resolved_max_fee_per_gas(),
        expected.resolved_max_fee_per_gas()
    );
    assert_eq!(sent.custom_data, expected.custom_data);
    assert_eq!(sent.serialize(None)?, expected.serialize(None)?);

    let sign_input = sent.sign_input()?;
    assert_eq!(sign_input.paymaster, Address::zero());
    assert!(sign_input.paymaster_input.is_empty());
    assert!(sign_input.factory_deps.is_empty());

    let signature = PackedEthSignature::deserialize_packed(&signature)?;
    let digest = populated.get_signed_digest()?;
    assert_eq!(signature.signature_recover_signer(&digest)?, key.address());

    assert_eq!(response.hash, sent.get_tx_hash(None)?);
    assert_eq!(response.transaction_type, TransactionType::Eip712);
    assert_eq!(response.nonce, 5.into());
    Ok(())
}

#[test_casing(3, [1, 2, 3])]
#[tokio::test]
async fn multisig_signature_concatenates_owner_signatures(key_count: usize) {
    let mock = mock();
    let keys: Vec<_> = (0..key_count).map(|_| K256PrivateKey::random()).collect();
    let account_address = Address::repeat_byte(0x3c);
    let account = SmartAccount::multisig(account_address, keys.clone(), provider_of(&mock));

    account.send_transaction(custom_request()).await.unwrap();
    let (sent, _) = decode_sent(&mock);
    assert_eq!(sent.from, Some(account_address));

    let signature = sent.get_custom_signature().unwrap();
    assert_eq!(signature.len(), 65 * key_count);
    let digest = sent.get_signed_digest().unwrap();
    for (chunk, key) in signature.chunks(65).zip(&keys) {
        let chunk = PackedEthSignature::deserialize_packed(chunk).unwrap();
        assert_eq!(chunk.signature_recover_signer(&digest).unwrap(), key.address());
    }

    let estimate = &mock.estimate_requests()[0];
    let placeholder = estimate.eip712_meta.as_ref().unwrap().custom_signature.as_ref();
    assert_eq!(placeholder.map(Vec::len), Some(65 * key_count));
}

#[tokio::test]
async fn disconnected_account_needs_provider() {
    let mock = mock();
    let account = SmartAccount::ecdsa(K256PrivateKey::random(), provider_of(&mock));
    let detached = account.connect(None);

    assert_matches!(
        detached.get_balance(None, None).await,
        Err(ClientError::MissingProvider)
    );
    assert_matches!(
        detached.get_all_balances().await,
        Err(ClientError::MissingProvider)
    );
    assert_matches!(
        detached.get_deployment_nonce().await,
        Err(ClientError::MissingProvider)
    );
    assert_matches!(
        detached.populate_transaction(custom_request()).await,
        Err(ClientError::MissingProvider)
    );

    assert_eq!(detached.address(), account.address());
    assert!(account.provider().is_some());
    account.get_balance(None, None).await.unwrap();

    let reconnected = detached.connect(provider_of(&mock));
    reconnected.get_all_balances().await.unwrap();
}

#[tokio::test]
async fn balances_and_deployment_nonce() {
    let key = K256PrivateKey::random();
    let token = Address::repeat_byte(0x70);
    let deployment_nonce = ethabi::encode(&[Token::Uint(3.into())]);
    let selector: [u8; 4] = contracts::get_deployment_nonce(key.address())[..4]
        .try_into()
        .unwrap();
    let provider: DynProvider = Arc::new(
        MockProvider::builder()
            .balance(key.address(), ETHEREUM_ADDRESS, 100.into())
            .balance(key.address(), token, 5.into())
            .call_response(NONCE_HOLDER_ADDRESS, selector, deployment_nonce)
            .build(),
    );
    let account = SmartAccount::ecdsa(key, Some(provider));

    assert_eq!(account.get_balance(None, None).await.unwrap(), 100.into());
    assert_eq!(
        account.get_balance(Some(ETHEREUM_ADDRESS), Some(BlockTag::Latest)).await.unwrap(),
        100.into()
    );
    let balances = account.get_all_balances().await.unwrap();
    assert_eq!(balances[&token], U256::from(5));
    assert_eq!(account.get_deployment_nonce().await.unwrap(), 3.into());
}

#[tokio::test]
async fn transfer_with_approval_based_paymaster() {
    let mock = mock();
    let account = SmartAccount::ecdsa(K256PrivateKey::random(), provider_of(&mock));
    let paymaster = Address::repeat_byte(0x99);
    let fee_token = Address::repeat_byte(0x77);
    let paymaster_params =
        get_approval_based_paymaster_input(paymaster, fee_token, 1.into(), vec![]).unwrap();

    let mut expected_input = selector("approvalBased(address,uint256,bytes)");
    expected_input.extend(ethabi::encode(&[
        Token::Address(fee_token),
        Token::Uint(1.into()),
        Token::Bytes(vec![]),
    ]));
    assert_eq!(paymaster_params.paymaster_input, expected_input);

    account
        .transfer(TransferParams {
            to: recipient(),
            amount: 10.into(),
            paymaster_params: Some(paymaster_params.clone()),
            ..TransferParams::default()
        })
        .await
        .unwrap();

    let (sent, _) = decode_sent(&mock);
    assert!(sent.is_eip712_tx());
    assert_eq!(sent.to, Some(recipient()));
    assert_eq!(sent.value, 10.into());
    assert_eq!(sent.get_paymaster_params(), Some(&paymaster_params));
}

fn selector(signature: &str) -> Vec<u8> {
    zksync_aa_types::web3::signing::keccak256(signature.as_bytes())[..4].to_vec()
}

#[test_casing(2, [ETHEREUM_ADDRESS, L2_BASE_TOKEN_ADDRESS])]
#[tokio::test]
async fn eth_withdrawal_targets_base_token_contract(token: Address) {
    let mock = mock();
    let account = SmartAccount::ecdsa(K256PrivateKey::random(), provider_of(&mock));
    let response = account
        .withdraw(WithdrawParams {
            token,
            amount: 42.into(),
            ..WithdrawParams::default()
        })
        .await
        .unwrap();

    assert_eq!(response.to, Some(L2_BASE_TOKEN_ADDRESS));
    assert_eq!(response.value, 42.into());
    assert_eq!(
        response.data.0,
        contracts::base_token_withdraw(account.address())
    );
}

#[tokio::test]
async fn custom_signer_output_is_used_verbatim() {
    let mock = mock();
    let signer = CustomSigner::new(|payload, secret, provider| {
        async move {
            assert!(provider.is_some());
            let tag = secret
                .downcast_ref::<String>()
                .ok_or_else(|| SignerError::InvalidSecret("expected a tag".into()))?;
            let mut signature = tag.as_bytes().to_vec();
            signature.extend_from_slice(payload.as_bytes());
            Ok::<_, SignerError>(signature)
        }
        .boxed()
    });
    let account = SmartAccount::new(
        Address::repeat_byte(0x42),
        Secret::opaque("session".to_owned()),
        provider_of(&mock),
        Arc::new(signer),
        Arc::new(EcdsaTransactionBuilder::default()),
    );

    account.send_transaction(custom_request()).await.unwrap();
    let (sent, _) = decode_sent(&mock);
    let signature = sent.get_custom_signature().unwrap();
    assert_eq!(&signature[..7], b"session");
    assert_eq!(&signature[7..], sent.get_signed_digest().unwrap().as_bytes());

    // Standard transactions only accept a single ECDSA signature.
    let legacy = TransactionRequest::default().to(recipient());
    assert_matches!(
        account.sign_transaction(legacy).await,
        Err(ClientError::UnsupportedOperation(_))
    );
}

#[tokio::test]
async fn messages_are_signed_with_personal_hash() {
    let key = K256PrivateKey::random();
    let account = SmartAccount::ecdsa(key.clone(), None);
    let signature = account.sign_message(b"zkSync").await.unwrap();
    let signature = PackedEthSignature::deserialize_packed(&signature).unwrap();
    let hash = PackedEthSignature::personal_message_hash(b"zkSync");
    assert_eq!(signature.signature_recover_signer(&hash).unwrap(), key.address());
}

#[tokio::test]
async fn broadcast_errors_are_propagated() {
    let provider: DynProvider = Arc::new(
        MockProvider::builder()
            .gas_price(GAS_PRICE.into())
            .reject_transactions("insufficient balance for paymaster")
            .build(),
    );
    let account = SmartAccount::ecdsa(K256PrivateKey::random(), Some(provider));
    let err = account
        .send_transaction(custom_request().custom_data(CustomData::default()))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ClientError::Network(ProviderError::Rejected(reason))
            if reason == "insufficient balance for paymaster"
    );
}
