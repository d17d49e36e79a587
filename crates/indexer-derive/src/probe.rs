//! On-chain confirmation of a token's standard, used the first time a
//! token is seen to disambiguate the topic-count heuristic in `decode.rs`
//! (spec.md §4.D: "confirmed by on-chain probe").

use alloy_sol_types::SolCall;
use indexer_rpc::RpcPool;
use indexer_types::{Address, TokenType};
use tracing::warn;

use crate::signatures::{IERC165, INTERFACE_ID_ERC1155, INTERFACE_ID_ERC721};

/// Confirms `hint` via `supportsInterface`, falling back to `hint` itself
/// if the call errors or the contract doesn't implement ERC-165 — a
/// missing probe degrades gracefully rather than failing derivation.
pub async fn confirm_token_type(rpc: &RpcPool, token_address: Address, hint: TokenType) -> TokenType {
    if matches!(hint, TokenType::Erc20) {
        return hint;
    }

    let interface_id = match hint {
        TokenType::Erc721 => INTERFACE_ID_ERC721,
        TokenType::Erc1155 => INTERFACE_ID_ERC1155,
        TokenType::Erc20 => unreachable!(),
    };

    let call = IERC165::supportsInterfaceCall {
        interfaceId: interface_id.into(),
    };
    let calldata = call.abi_encode();

    match rpc.call(token_address.inner(), calldata.into()).await {
        Ok(ret) => match IERC165::supportsInterfaceCall::abi_decode_returns(&ret) {
            Ok(_supported) => hint,
            Err(e) => {
                warn!(%token_address, error = %e, "supportsInterface decode failed, trusting topic heuristic");
                hint
            }
        },
        Err(e) => {
            warn!(%token_address, error = %e, "supportsInterface call failed, trusting topic heuristic");
            hint
        }
    }
}
