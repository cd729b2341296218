use std::collections::HashMap;

use futures::future;
use serde_json::Value;
use zksync_aa_crypto::{TypedDataDomain, TypedDataEncoder, TypedDataTypes};
use zksync_aa_provider::DynProvider;
use zksync_aa_types::{Address, NameOrAddress, PackedEthSignature, H256};

use crate::ClientError;

pub(crate) async fn resolve_name(
    provider: &DynProvider,
    name: &str,
) -> Result<Address, ClientError> {
    provider
        .resolve_name(name)
        .await?
        .ok_or_else(|| ClientError::UnresolvedName(name.to_owned()))
}

pub(crate) async fn resolve_address(
    provider: Option<&DynProvider>,
    target: Option<&NameOrAddress>,
) -> Result<Option<Address>, ClientError> {
    match target {
        None => Ok(None),
        Some(NameOrAddress::Address(address)) => Ok(Some(*address)),
        Some(NameOrAddress::Name(name)) => {
            let provider = provider.ok_or(ClientError::MissingProvider)?;
            resolve_name(provider, name).await.map(Some)
        }
    }
}

/// Computes the EIP-712 digest of dynamically typed data, resolving names in `address` members
/// and in the verifying contract first. The provider is only needed if there are names.
pub(crate) async fn typed_data_digest(
    domain: &TypedDataDomain,
    types: &TypedDataTypes,
    value: &Value,
    provider: Option<&DynProvider>,
) -> Result<H256, ClientError> {
    let encoder = TypedDataEncoder::new(types.clone())?;
    let mut names = encoder.collect_names(value)?;
    let contract_name = domain
        .verifying_contract
        .as_ref()
        .filter(|contract| contract.parse::<Address>().is_err())
        .cloned();
    if let Some(name) = &contract_name {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }

    let resolved: HashMap<String, Address> = if names.is_empty() {
        HashMap::new()
    } else {
        let provider = provider.ok_or(ClientError::MissingProvider)?;
        let addresses =
            future::try_join_all(names.iter().map(|name| resolve_name(provider, name))).await?;
        names.into_iter().zip(addresses).collect()
    };

    let mut domain = domain.clone();
    if let Some(address) = contract_name.and_then(|name| resolved.get(&name)) {
        domain.verifying_contract = Some(format!("{address:?}"));
    }
    let value = encoder.replace_names(value, &resolved)?;
    Ok(PackedEthSignature::typed_data_hash(
        domain.separator()?,
        encoder.hash(&value)?,
    ))
}
