//! NFT ownership and collection-metadata resolution (spec.md §4.D,
//! component D: "NFT ownership, collection metadata fetch"). Called by the
//! ingestion pipeline the first time a token or collection is sighted;
//! failures here degrade to `None` rather than failing derivation, the
//! same soft-failure contract as `metadata::fetch_metadata`.

use alloy_sol_types::SolCall;
use indexer_rpc::RpcPool;
use indexer_types::{Address, TokenAmount, TokenType};

use crate::signatures::{IERC1155Metadata, IERC20Metadata, IERC721Metadata};

/// Resolves a token's metadata URI via `tokenURI` (ERC-721) or `uri`
/// (ERC-1155). `None` on any call/decode failure.
pub async fn resolve_token_uri(
    rpc: &RpcPool,
    token_address: Address,
    token_id: &TokenAmount,
    token_type: TokenType,
) -> Option<String> {
    let token_id = token_id.inner();
    match token_type {
        TokenType::Erc721 => {
            let calldata = IERC721Metadata::tokenURICall { tokenId: token_id }.abi_encode();
            let ret = rpc.call(token_address.inner(), calldata.into()).await.ok()?;
            IERC721Metadata::tokenURICall::abi_decode_returns(&ret).ok()
        }
        TokenType::Erc1155 => {
            let calldata = IERC1155Metadata::uriCall { tokenId: token_id }.abi_encode();
            let ret = rpc.call(token_address.inner(), calldata.into()).await.ok()?;
            IERC1155Metadata::uriCall::abi_decode_returns(&ret).ok()
        }
        TokenType::Erc20 => None,
    }
}

/// Resolves a collection's `name()`/`symbol()`/`totalSupply()` — the same
/// selectors `IERC20Metadata` declares, shared in practice by ERC-721/1155
/// contracts that choose to implement them.
pub async fn fetch_collection_fields(
    rpc: &RpcPool,
    token_address: Address,
) -> (Option<String>, Option<String>, Option<TokenAmount>) {
    let name = {
        let calldata = IERC20Metadata::nameCall {}.abi_encode();
        rpc.call(token_address.inner(), calldata.into())
            .await
            .ok()
            .and_then(|ret| IERC20Metadata::nameCall::abi_decode_returns(&ret).ok())
    };
    let symbol = {
        let calldata = IERC20Metadata::symbolCall {}.abi_encode();
        rpc.call(token_address.inner(), calldata.into())
            .await
            .ok()
            .and_then(|ret| IERC20Metadata::symbolCall::abi_decode_returns(&ret).ok())
    };
    let total_supply = {
        let calldata = IERC20Metadata::totalSupplyCall {}.abi_encode();
        rpc.call(token_address.inner(), calldata.into())
            .await
            .ok()
            .and_then(|ret| IERC20Metadata::totalSupplyCall::abi_decode_returns(&ret).ok())
            .map(TokenAmount::from_u256)
    };
    (name, symbol, total_supply)
}
