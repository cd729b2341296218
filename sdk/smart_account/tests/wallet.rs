use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use zksync_aa_crypto::{
    K256PrivateKey, TypedDataDomain, TypedDataEncoder, TypedDataField, TypedDataTypes,
};
use zksync_aa_provider::mock::MockProvider;
use zksync_aa_types::{
    api::FeeData, Address, CustomData, PackedEthSignature, PopulatedTransaction,
    TransactionRequest, TransactionType, U256,
};
use zksync_smart_account::{ClientError, DynProvider, Wallet};

fn london_mock() -> Arc<MockProvider> {
    Arc::new(
        MockProvider::builder()
            .chain_id(300)
            .gas_price(100.into())
            .fee_data(FeeData {
                gas_price: Some(100.into()),
                max_fee_per_gas: Some(250.into()),
                max_priority_fee_per_gas: Some(1.into()),
            })
            .build(),
    )
}

fn wallet(mock: &Arc<MockProvider>) -> (K256PrivateKey, Wallet) {
    let key = K256PrivateKey::random();
    let provider: DynProvider = mock.clone();
    (key.clone(), Wallet::new(key, Some(provider)))
}

fn transfer() -> TransactionRequest {
    TransactionRequest::default()
        .to(Address::repeat_byte(0x12))
        .value(1_000.into())
}

#[tokio::test]
async fn ordinary_transaction_follows_base_chain_rules() {
    let mock = london_mock();
    let (key, wallet) = wallet(&mock);

    let raw = wallet.sign_transaction(transfer()).await.unwrap();
    let (tx, signature) = PopulatedTransaction::from_bytes(&raw.0).unwrap();
    assert_eq!(tx.transaction_type, TransactionType::Eip1559);
    assert_eq!(tx.chain_id, Some(300));
    assert_eq!(tx.max_fee_per_gas, Some(250.into()));
    assert_eq!(tx.max_priority_fee_per_gas, Some(1.into()));

    let message = tx.get_default_signed_message().unwrap();
    assert_eq!(
        signature.unwrap().signature_recover_signer(&message).unwrap(),
        key.address()
    );
}

#[tokio::test]
async fn custom_data_routes_to_custom_transaction() {
    let mock = london_mock();
    let (key, wallet) = wallet(&mock);
    let request = transfer().custom_data(CustomData {
        gas_per_pubdata: Some(800.into()),
        ..CustomData::default()
    });

    let response = wallet.send_transaction(request).await.unwrap();
    assert_eq!(response.transaction_type, TransactionType::Eip712);

    let sent = mock.sent_transactions();
    let tx = PopulatedTransaction::from_eip712_bytes(&sent[0].0).unwrap();
    assert_eq!(tx.custom_data.as_ref().unwrap().gas_per_pubdata, U256::from(800));
    assert_eq!(tx.from, Some(key.address()));

    let signature = PackedEthSignature::deserialize_packed(tx.get_custom_signature().unwrap())
        .unwrap();
    let digest = tx.get_signed_digest().unwrap();
    assert_eq!(signature.signature_recover_signer(&digest).unwrap(), key.address());
    assert_eq!(wallet.eip712_signer().await.unwrap().chain_id(), 300);
}

#[tokio::test]
async fn explicit_foreign_sender_is_rejected() {
    let mock = london_mock();
    let (key, wallet) = wallet(&mock);
    let stranger = Address::repeat_byte(0x66);

    for request in [transfer(), transfer().transaction_type(0x71)] {
        let err = wallet
            .sign_transaction(request.from(stranger))
            .await
            .unwrap_err();
        assert_matches!(
            err,
            ClientError::FromAddressMismatch { expected, actual }
                if expected == key.address() && actual == stranger
        );
    }
    wallet
        .sign_transaction(transfer().from(key.address()))
        .await
        .unwrap();
}

#[tokio::test]
async fn detached_wallet_still_signs_messages() {
    let mock = london_mock();
    let (key, wallet) = wallet(&mock);
    let detached = wallet.connect(None);

    assert_matches!(
        detached.sign_transaction(transfer()).await,
        Err(ClientError::MissingProvider)
    );
    assert_matches!(
        detached.eip712_signer().await,
        Err(ClientError::MissingProvider)
    );

    let signature = detached.sign_message(b"hello").await.unwrap();
    let hash = PackedEthSignature::personal_message_hash(b"hello");
    assert_eq!(signature.signature_recover_signer(&hash).unwrap(), key.address());
    assert_eq!(wallet.eip712_signer().await.unwrap().chain_id(), 300);
}

#[tokio::test]
async fn typed_data_is_signed_over_resolved_digest() {
    let mock = Arc::new(
        MockProvider::builder()
            .name("owner.eth", Address::repeat_byte(0x0f))
            .build(),
    );
    let (key, wallet) = wallet(&mock);
    let types = TypedDataTypes::from([(
        "Permit".to_owned(),
        vec![
            TypedDataField::new("owner", "address"),
            TypedDataField::new("value", "uint256"),
        ],
    )]);
    let domain = TypedDataDomain {
        name: Some("Token".into()),
        chain_id: Some(300.into()),
        ..TypedDataDomain::default()
    };

    let by_name = json!({ "owner": "owner.eth", "value": "10" });
    let by_address = json!({ "owner": format!("{:?}", Address::repeat_byte(0x0f)), "value": "10" });
    let signature = wallet
        .sign_typed_data(&domain, &types, &by_name)
        .await
        .unwrap();
    let expected = wallet
        .sign_typed_data(&domain, &types, &by_address)
        .await
        .unwrap();
    assert_eq!(signature, expected);

    let digest = TypedDataEncoder::hash_typed_data(&domain, &types, &by_address).unwrap();
    assert_eq!(signature.signature_recover_signer(&digest).unwrap(), key.address());
}
