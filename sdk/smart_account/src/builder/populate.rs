//! Population rules shared by the builders and the wallet.

use zksync_aa_provider::DynProvider;
use zksync_aa_types::{
    api::{BlockTag, CallRequest},
    Address, PopulatedTransaction, ProtocolConfig, TransactionRequest, TransactionType, U256,
};

use crate::{utils::resolve_address, ClientError};

#[derive(Debug, Clone, PartialEq)]
struct Fees {
    transaction_type: TransactionType,
    gas_price: Option<U256>,
    max_fee_per_gas: Option<U256>,
    max_priority_fee_per_gas: Option<U256>,
}

fn check_fee_fields(
    tx: &TransactionRequest,
    tx_type: Option<TransactionType>,
) -> Result<(), ClientError> {
    let has_eip1559_fees = tx.has_eip1559_fees();
    let conflict = match tx_type {
        _ if tx.gas_price.is_some() && has_eip1559_fees => true,
        Some(TransactionType::Eip1559) => tx.gas_price.is_some(),
        Some(TransactionType::Legacy | TransactionType::Eip2930) => has_eip1559_fees,
        _ => false,
    };
    if conflict {
        return Err(ClientError::ConflictingFeeFields);
    }
    Ok(())
}

async fn resolve_participants(
    tx: &TransactionRequest,
    provider: &DynProvider,
) -> Result<(Option<Address>, Address), ClientError> {
    let (to, from) = tokio::try_join!(
        resolve_address(Some(provider), tx.to.as_ref()),
        resolve_address(Some(provider), tx.from.as_ref())
    )?;
    let from = from.ok_or_else(|| ClientError::MissingRequiredField("from".into()))?;
    Ok((to, from))
}

fn check_chain_id(requested: Option<u64>, network: u64) -> Result<u64, ClientError> {
    match requested {
        Some(actual) if actual != network => Err(ClientError::ChainIdMismatch {
            expected: network,
            actual,
        }),
        _ => Ok(network),
    }
}

/// Picks the transaction type and fee fields for a non-custom transaction.
///
/// A legacy `gas_price` supplied without a type is turned into both EIP-1559 fee fields if
/// the network supports EIP-1559. Without network support, untyped and type 2 requests fall
/// back to a legacy transaction priced at the network gas price.
async fn infer_fees(
    tx: &TransactionRequest,
    tx_type: Option<TransactionType>,
    provider: &DynProvider,
) -> Result<Fees, ClientError> {
    let mut fees = Fees {
        transaction_type: tx_type.unwrap_or_default(),
        gas_price: tx.gas_price,
        max_fee_per_gas: tx.max_fee_per_gas,
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
    };
    let has_both_eip1559_fees =
        tx.max_fee_per_gas.is_some() && tx.max_priority_fee_per_gas.is_some();

    match tx_type {
        None | Some(TransactionType::Eip1559) if has_both_eip1559_fees => {
            fees.transaction_type = TransactionType::Eip1559;
        }
        Some(TransactionType::Legacy | TransactionType::Eip2930) => {
            if fees.gas_price.is_none() {
                let gas_price = provider.fee_data().await?.gas_price.ok_or_else(|| {
                    ClientError::UnsupportedOperation("network does not report a gas price".into())
                })?;
                fees.gas_price = Some(gas_price);
            }
        }
        None | Some(TransactionType::Eip1559) => {
            let fee_data = provider.fee_data().await?;
            if fee_data.supports_eip1559() {
                fees.transaction_type = TransactionType::Eip1559;
                if let Some(gas_price) = fees.gas_price.take() {
                    tracing::warn!(
                        "Network supports EIP-1559, using gas price {gas_price} as both max fee \
                         and max priority fee"
                    );
                    fees.max_fee_per_gas = Some(gas_price);
                    fees.max_priority_fee_per_gas = Some(gas_price);
                } else {
                    fees.max_fee_per_gas = fees.max_fee_per_gas.or(fee_data.max_fee_per_gas);
                    fees.max_priority_fee_per_gas = fees
                        .max_priority_fee_per_gas
                        .or(fee_data.max_priority_fee_per_gas);
                }
            } else if let Some(gas_price) = fee_data.gas_price {
                if tx.has_eip1559_fees() {
                    return Err(ClientError::UnsupportedOperation(
                        "network does not support EIP-1559".into(),
                    ));
                }
                fees.transaction_type = TransactionType::Legacy;
                fees.gas_price.get_or_insert(gas_price);
            } else {
                return Err(ClientError::UnsupportedOperation("inconsistent fee data".into()));
            }
        }
        Some(TransactionType::Eip712) => {
            return Err(ClientError::UnsupportedOperation(
                "custom transactions have no standard fee inference".into(),
            ));
        }
    }
    Ok(fees)
}

/// Populates a legacy, EIP-2930 or EIP-1559 transaction.
pub(crate) async fn populate_standard(
    tx: TransactionRequest,
    provider: &DynProvider,
) -> Result<PopulatedTransaction, ClientError> {
    let tx_type = tx
        .transaction_type
        .map(TransactionType::try_from)
        .transpose()?;
    check_fee_fields(&tx, tx_type)?;

    let (to, from) = resolve_participants(&tx, provider).await?;
    let fees = infer_fees(&tx, tx_type, provider).await?;
    let (requested_nonce, requested_gas_limit) = (tx.nonce, tx.gas_limit);
    tracing::debug!(
        "Populating {:?} transaction from {from:?} with fees {fees:?}",
        fees.transaction_type
    );

    let mut populated = PopulatedTransaction {
        transaction_type: fees.transaction_type,
        nonce: requested_nonce.unwrap_or_default(),
        gas_limit: requested_gas_limit.unwrap_or_default(),
        chain_id: None,
        from: Some(from),
        to,
        value: tx.value.unwrap_or_default(),
        data: tx.data.unwrap_or_default(),
        gas_price: fees.gas_price,
        max_fee_per_gas: fees.max_fee_per_gas,
        max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
        access_list: tx.access_list,
        custom_data: None,
    };

    let estimate_request = CallRequest::from(&populated);
    let nonce = async {
        match requested_nonce {
            Some(nonce) => Ok(nonce),
            None => provider.get_transaction_count(from, BlockTag::Pending).await,
        }
    };
    let gas_limit = async {
        match requested_gas_limit {
            Some(gas_limit) => Ok(gas_limit),
            None => provider.estimate_gas(&estimate_request).await,
        }
    };
    let (nonce, gas_limit, network_chain_id) =
        tokio::try_join!(nonce, gas_limit, provider.chain_id())?;

    populated.nonce = nonce;
    populated.gas_limit = gas_limit;
    populated.chain_id = Some(check_chain_id(tx.chain_id, network_chain_id)?);
    Ok(populated)
}

/// Populates a custom (`0x71`) transaction.
///
/// The gas price always comes from the network. `estimation_signature` is attached to the
/// gas estimation request only, unless the request already carries a custom signature.
pub(crate) async fn populate_custom(
    tx: TransactionRequest,
    provider: &DynProvider,
    config: &ProtocolConfig,
    estimation_signature: Option<Vec<u8>>,
) -> Result<PopulatedTransaction, ClientError> {
    check_fee_fields(&tx, None)?;
    let (to, from) = resolve_participants(&tx, provider).await?;

    let requested_nonce = tx.nonce;
    let nonce = async {
        match requested_nonce {
            Some(nonce) => Ok(nonce),
            None => provider.get_transaction_count(from, BlockTag::Pending).await,
        }
    };
    let (nonce, network_chain_id, gas_price) =
        tokio::try_join!(nonce, provider.chain_id(), provider.gas_price())?;
    let chain_id = check_chain_id(tx.chain_id, network_chain_id)?;
    if let Some(requested) = tx.gas_price.filter(|price| *price != gas_price) {
        tracing::warn!(
            "Replacing requested gas price {requested} with network gas price {gas_price}"
        );
    }

    let custom_data = tx
        .custom_data
        .unwrap_or_default()
        .into_meta(config.default_gas_per_pubdata.into());
    let mut populated = PopulatedTransaction {
        transaction_type: TransactionType::Eip712,
        nonce,
        gas_limit: tx.gas_limit.unwrap_or_default(),
        chain_id: Some(chain_id),
        from: Some(from),
        to,
        value: tx.value.unwrap_or_default(),
        data: tx.data.unwrap_or_default(),
        gas_price: Some(gas_price),
        max_fee_per_gas: tx.max_fee_per_gas,
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
        access_list: None,
        custom_data: Some(custom_data),
    };

    if tx.gas_limit.is_none() {
        let mut request = CallRequest::from(&populated);
        if let (Some(signature), Some(meta)) =
            (estimation_signature, request.eip712_meta.as_mut())
        {
            meta.custom_signature.get_or_insert(signature);
        }
        populated.gas_limit = provider.estimate_gas(&request).await?;
    }
    tracing::debug!(
        "Populated custom transaction from {from:?} with nonce {nonce}, gas limit {}",
        populated.gas_limit
    );
    Ok(populated)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use test_casing::test_casing;
    use zksync_aa_provider::mock::MockProvider;
    use zksync_aa_types::{api::FeeData, CustomData};

    use super::*;

    fn london_fees() -> FeeData {
        FeeData {
            gas_price: Some(100.into()),
            max_fee_per_gas: Some(300.into()),
            max_priority_fee_per_gas: Some(2.into()),
        }
    }

    fn legacy_fees() -> FeeData {
        FeeData {
            gas_price: Some(100.into()),
            ..FeeData::default()
        }
    }

    fn request() -> TransactionRequest {
        TransactionRequest::default()
            .from(Address::repeat_byte(0x5e))
            .to(Address::repeat_byte(1))
    }

    #[test]
    fn fee_field_conflicts() {
        let mixed = TransactionRequest {
            gas_price: Some(1.into()),
            max_fee_per_gas: Some(1.into()),
            ..TransactionRequest::default()
        };
        assert_matches!(
            check_fee_fields(&mixed, None),
            Err(ClientError::ConflictingFeeFields)
        );

        let legacy_with_eip1559 = TransactionRequest {
            max_priority_fee_per_gas: Some(1.into()),
            ..TransactionRequest::default()
        };
        assert_matches!(
            check_fee_fields(&legacy_with_eip1559, Some(TransactionType::Legacy)),
            Err(ClientError::ConflictingFeeFields)
        );
        check_fee_fields(&legacy_with_eip1559, None).unwrap();

        let eip1559_with_gas_price = TransactionRequest {
            gas_price: Some(1.into()),
            ..TransactionRequest::default()
        };
        assert_matches!(
            check_fee_fields(&eip1559_with_gas_price, Some(TransactionType::Eip1559)),
            Err(ClientError::ConflictingFeeFields)
        );
    }

    #[tokio::test]
    async fn untyped_request_is_upgraded_on_london_network() {
        let provider = MockProvider::builder().fee_data(london_fees()).build_dyn();
        let tx = populate_standard(request(), &provider).await.unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Eip1559);
        assert_eq!(tx.max_fee_per_gas, Some(300.into()));
        assert_eq!(tx.max_priority_fee_per_gas, Some(2.into()));
        assert_eq!(tx.gas_price, None);
        assert_eq!(tx.chain_id, Some(270));
        assert_eq!(tx.gas_limit, 21_000.into());
    }

    #[tokio::test]
    async fn legacy_gas_price_is_coerced_on_london_network() {
        let provider = MockProvider::builder().fee_data(london_fees()).build_dyn();
        let tx = populate_standard(request().gas_price(7.into()), &provider)
            .await
            .unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Eip1559);
        assert_eq!(tx.gas_price, None);
        assert_eq!(tx.max_fee_per_gas, Some(7.into()));
        assert_eq!(tx.max_priority_fee_per_gas, Some(7.into()));
    }

    #[tokio::test]
    async fn untyped_request_stays_legacy_on_pre_london_network() {
        let provider = MockProvider::builder().fee_data(legacy_fees()).build_dyn();
        let tx = populate_standard(request(), &provider).await.unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Legacy);
        assert_eq!(tx.gas_price, Some(100.into()));

        let eip1559_request = TransactionRequest {
            max_fee_per_gas: Some(1.into()),
            ..request()
        };
        let err = populate_standard(eip1559_request, &provider)
            .await
            .unwrap_err();
        assert_matches!(err, ClientError::UnsupportedOperation(_));
    }

    #[tokio::test]
    async fn inconsistent_fee_data_is_rejected() {
        let provider = MockProvider::builder().build_dyn();
        let err = populate_standard(request(), &provider).await.unwrap_err();
        assert_matches!(
            err,
            ClientError::UnsupportedOperation(msg) if msg == "inconsistent fee data"
        );
    }

    #[test_casing(2, [0, 1])]
    #[tokio::test]
    async fn explicit_legacy_types_get_gas_price(tx_type: u8) {
        let provider = MockProvider::builder().fee_data(london_fees()).build_dyn();
        let tx = populate_standard(request().transaction_type(tx_type), &provider)
            .await
            .unwrap();
        assert_eq!(u8::from(tx.transaction_type), tx_type);
        assert_eq!(tx.gas_price, Some(100.into()));
        assert_eq!(tx.max_fee_per_gas, None);

        let provider = MockProvider::builder().build_dyn();
        let err = populate_standard(request().transaction_type(tx_type), &provider)
            .await
            .unwrap_err();
        assert_matches!(err, ClientError::UnsupportedOperation(_));
    }

    #[tokio::test]
    async fn explicit_eip1559_type_falls_back_to_legacy_on_pre_london_network() {
        let provider = MockProvider::builder().fee_data(legacy_fees()).build_dyn();
        let tx = populate_standard(request().transaction_type(2), &provider)
            .await
            .unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Legacy);
        assert_eq!(tx.gas_price, Some(100.into()));
        assert_eq!(tx.max_fee_per_gas, None);

        let eip1559_request = TransactionRequest {
            max_fee_per_gas: Some(1.into()),
            ..request().transaction_type(2)
        };
        let err = populate_standard(eip1559_request, &provider)
            .await
            .unwrap_err();
        assert_matches!(err, ClientError::UnsupportedOperation(_));

        let provider = MockProvider::builder().fee_data(london_fees()).build_dyn();
        let tx = populate_standard(request().transaction_type(2), &provider)
            .await
            .unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Eip1559);
        assert_eq!(tx.max_fee_per_gas, Some(300.into()));
    }

    #[tokio::test]
    async fn chain_id_mismatch_is_detected() {
        let provider = MockProvider::builder().fee_data(legacy_fees()).build_dyn();
        let tx = TransactionRequest {
            chain_id: Some(1),
            ..request()
        };
        let err = populate_standard(tx, &provider).await.unwrap_err();
        assert_matches!(
            err,
            ClientError::ChainIdMismatch {
                expected: 270,
                actual: 1
            }
        );
    }

    #[tokio::test]
    async fn custom_population_uses_network_gas_price() {
        let provider = MockProvider::builder()
            .gas_price(250_000_000.into())
            .nonce(9.into())
            .build_dyn();
        let tx = request()
            .gas_price(1.into())
            .custom_data(CustomData::default());
        let populated = populate_custom(tx, &provider, &ProtocolConfig::default(), None)
            .await
            .unwrap();
        assert_eq!(populated.transaction_type, TransactionType::Eip712);
        assert_eq!(populated.gas_price, Some(250_000_000.into()));
        assert_eq!(populated.nonce, 9.into());
        let meta = populated.custom_data.unwrap();
        assert_eq!(meta.gas_per_pubdata, 50_000.into());
        assert!(meta.factory_deps.is_empty());
    }

    #[tokio::test]
    async fn estimation_signature_is_not_kept() {
        let mock =
            std::sync::Arc::new(MockProvider::builder().gas_estimate(500_000.into()).build());
        let provider: DynProvider = mock.clone();
        let populated = populate_custom(
            request().transaction_type(0x71),
            &provider,
            &ProtocolConfig::default(),
            Some(vec![1; 130]),
        )
        .await
        .unwrap();
        assert_eq!(populated.gas_limit, 500_000.into());
        assert_eq!(populated.get_custom_signature(), None);

        let requests = mock.estimate_requests();
        assert_eq!(requests.len(), 1);
        let meta = requests[0].eip712_meta.as_ref().unwrap();
        assert_eq!(meta.custom_signature.as_deref(), Some(&[1; 130][..]));
    }

    #[tokio::test]
    async fn names_are_resolved_before_population() {
        let recipient = Address::repeat_byte(0xee);
        let provider = MockProvider::builder()
            .name("recipient.eth", recipient)
            .fee_data(legacy_fees())
            .build_dyn();
        let tx = populate_standard(request().to("recipient.eth"), &provider)
            .await
            .unwrap();
        assert_eq!(tx.to, Some(recipient));

        let err = populate_standard(request().to("unknown.eth"), &provider)
            .await
            .unwrap_err();
        assert_matches!(err, ClientError::UnresolvedName(_));
    }
}
