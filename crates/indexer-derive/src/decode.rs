//! Transfer-log decoding (spec.md §4.D).

use alloy_primitives::U256;
use alloy_sol_types::SolEvent;
use indexer_rpc::RawLog;
use indexer_types::{Address, TokenAmount, TokenTransfer, TokenType};

use crate::error::DeriveError;
use crate::signatures::{TransferBatch, TransferErc20, TransferErc721, TransferSingle};

fn u256_to_amount(v: U256) -> TokenAmount {
    TokenAmount::from_u256(v)
}

/// Decodes every transfer this receipt's logs carry, in log-index order
/// (ordering guarantee in spec.md §4.C). Logs that don't match a known
/// transfer signature are ignored, not errored — a receipt mixes transfer
/// events with arbitrary application events.
pub fn decode_transfer_logs(
    logs: &[RawLog],
    block_timestamp: i64,
) -> Result<Vec<TokenTransfer>, DeriveError> {
    let mut out = Vec::new();
    let mut sorted: Vec<&RawLog> = logs.iter().collect();
    sorted.sort_by_key(|l| l.log_index);

    for log in sorted {
        let Some(topic0) = log.topics.first() else {
            continue;
        };

        if *topic0 == TransferErc20::SIGNATURE_HASH {
            match log.topics.len() {
                3 => {
                    let decoded = TransferErc20::decode_raw_log(log.topics.iter().copied(), &log.data, true)
                        .map_err(|e| DeriveError::Decode(e.to_string()))?;
                    out.push(TokenTransfer {
                        transaction_hash: log.transaction_hash,
                        log_index: log.log_index,
                        token_address: log.address,
                        from: Address::from(decoded.from),
                        to: Address::from(decoded.to),
                        token_id: None,
                        block_number: log.block_number,
                        transaction_index: log.transaction_index,
                        value: u256_to_amount(decoded.value),
                        token_type: TokenType::Erc20,
                        timestamp: block_timestamp,
                    });
                }
                4 => {
                    let decoded = TransferErc721::decode_raw_log(log.topics.iter().copied(), &log.data, true)
                        .map_err(|e| DeriveError::Decode(e.to_string()))?;
                    out.push(TokenTransfer {
                        transaction_hash: log.transaction_hash,
                        log_index: log.log_index,
                        token_address: log.address,
                        from: Address::from(decoded.from),
                        to: Address::from(decoded.to),
                        token_id: Some(u256_to_amount(decoded.tokenId)),
                        block_number: log.block_number,
                        transaction_index: log.transaction_index,
                        value: TokenAmount::from_u256(U256::from(1u8)),
                        token_type: TokenType::Erc721,
                        timestamp: block_timestamp,
                    });
                }
                _ => continue,
            }
        } else if *topic0 == TransferSingle::SIGNATURE_HASH && log.topics.len() == 4 {
            let decoded = TransferSingle::decode_raw_log(log.topics.iter().copied(), &log.data, true)
                .map_err(|e| DeriveError::Decode(e.to_string()))?;
            out.push(TokenTransfer {
                transaction_hash: log.transaction_hash,
                log_index: log.log_index,
                token_address: log.address,
                from: Address::from(decoded.from),
                to: Address::from(decoded.to),
                token_id: Some(u256_to_amount(decoded.id)),
                block_number: log.block_number,
                transaction_index: log.transaction_index,
                value: u256_to_amount(decoded.value),
                token_type: TokenType::Erc1155,
                timestamp: block_timestamp,
            });
        } else if *topic0 == TransferBatch::SIGNATURE_HASH && log.topics.len() == 4 {
            let decoded = TransferBatch::decode_raw_log(log.topics.iter().copied(), &log.data, true)
                .map_err(|e| DeriveError::Decode(e.to_string()))?;
            for (id, value) in decoded.ids.iter().zip(decoded.values.iter()) {
                out.push(TokenTransfer {
                    transaction_hash: log.transaction_hash,
                    log_index: log.log_index,
                    token_address: log.address,
                    from: Address::from(decoded.from),
                    to: Address::from(decoded.to),
                    token_id: Some(u256_to_amount(*id)),
                    block_number: log.block_number,
                    transaction_index: log.transaction_index,
                    value: u256_to_amount(*value),
                    token_type: TokenType::Erc1155,
                    timestamp: block_timestamp,
                });
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address as AlloyAddress, B256};

    fn raw_log(topics: Vec<B256>, data: Vec<u8>, log_index: u32) -> RawLog {
        RawLog {
            address: "0x1111111111111111111111111111111111111111".parse().unwrap(),
            topics,
            data: data.into(),
            log_index,
            transaction_hash: B256::ZERO,
            transaction_index: 0,
            block_number: 1,
        }
    }

    #[test]
    fn decodes_erc20_transfer_from_two_indexed_topics_plus_data() {
        let from = AlloyAddress::repeat_byte(0x01);
        let to = AlloyAddress::repeat_byte(0x02);
        let value = U256::from(1000u64);
        let mut topic_from = [0u8; 32];
        topic_from[12..].copy_from_slice(from.as_slice());
        let mut topic_to = [0u8; 32];
        topic_to[12..].copy_from_slice(to.as_slice());

        let topics = vec![
            TransferErc20::SIGNATURE_HASH,
            B256::from(topic_from),
            B256::from(topic_to),
        ];
        let data = value.to_be_bytes_vec();

        let transfers = decode_transfer_logs(&[raw_log(topics, data, 0)], 42).unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].token_type, TokenType::Erc20);
        assert!(transfers[0].token_id.is_none());
        assert_eq!(transfers[0].value.as_decimal_string(), "1000");
    }

    #[test]
    fn ignores_logs_with_unrecognized_signature() {
        let topics = vec![B256::repeat_byte(0xaa)];
        let transfers = decode_transfer_logs(&[raw_log(topics, vec![], 0)], 0).unwrap();
        assert!(transfers.is_empty());
    }
}
