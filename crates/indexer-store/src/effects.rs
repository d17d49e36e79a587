//! A pure, in-memory mirror of the `apply_token_transfer_effects` trigger
//! (migrations/0001_init.sql), kept in lockstep with the SQL so invariants
//! I3 (balance non-negativity) and the mint/burn bookkeeping rules can be
//! unit-tested without a running Postgres instance.

use std::collections::HashMap;

use indexer_types::{Address, TokenAmount, TokenBalance, TokenTransfer, TokenType};

/// Identity of a balance row: `(holder, token, token_id)`.
pub type BalanceKey = (Address, Address, Option<TokenAmount>);

fn balance_key(transfer: &TokenTransfer, holder: Address) -> BalanceKey {
    (holder, transfer.token_address, transfer.token_id)
}

fn entry<'a>(
    balances: &'a mut HashMap<BalanceKey, TokenBalance>,
    key: BalanceKey,
    token_type: TokenType,
    timestamp: i64,
) -> &'a mut TokenBalance {
    balances.entry(key).or_insert_with(|| TokenBalance {
        address: key.0,
        token_address: key.1,
        token_id: key.2,
        balance: TokenAmount::ZERO,
        token_type,
        is_creator: false,
        updated_at: timestamp,
    })
}

/// Applies one transfer's effects to `balances`, mirroring the trigger:
/// debit `from` (clamped at zero per I3), credit `to`, and mark `to` as the
/// token's creator when the transfer is a mint.
pub fn apply_transfer_effects(balances: &mut HashMap<BalanceKey, TokenBalance>, transfer: &TokenTransfer) {
    if !transfer.from.is_zero() {
        let key = balance_key(transfer, transfer.from);
        let row = entry(balances, key, transfer.token_type, transfer.timestamp);
        row.balance = row.balance.saturating_sub(transfer.value);
        row.updated_at = transfer.timestamp;
    }

    if !transfer.to.is_zero() {
        let is_mint = transfer.is_mint();
        let key = balance_key(transfer, transfer.to);
        let row = entry(balances, key, transfer.token_type, transfer.timestamp);
        row.balance = row.balance.saturating_add(transfer.value);
        row.is_creator = row.is_creator || is_mint;
        row.updated_at = transfer.timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexer_types::Hash32;

    fn transfer(from: &str, to: &str, value: &str) -> TokenTransfer {
        TokenTransfer {
            transaction_hash: Hash32::ZERO,
            log_index: 0,
            token_address: "0x1111111111111111111111111111111111111111"
                .parse()
                .unwrap(),
            from: from.parse().unwrap(),
            to: to.parse().unwrap(),
            token_id: None,
            block_number: 1,
            transaction_index: 0,
            value: value.parse().unwrap(),
            token_type: TokenType::Erc20,
            timestamp: 100,
        }
    }

    const ZERO_ADDR: &str = "0x0000000000000000000000000000000000000000";
    const ALICE: &str = "0x0000000000000000000000000000000000000001";
    const BOB: &str = "0x0000000000000000000000000000000000000002";

    #[test]
    fn debit_clamps_at_zero_even_when_overdrawn() {
        let mut balances = HashMap::new();
        apply_transfer_effects(&mut balances, &transfer(ALICE, BOB, "50"));
        let key = (ALICE.parse().unwrap(), "0x1111111111111111111111111111111111111111".parse().unwrap(), None);
        assert_eq!(balances[&key].balance.as_decimal_string(), "0");
    }

    #[test]
    fn mint_marks_recipient_as_creator() {
        let mut balances = HashMap::new();
        apply_transfer_effects(&mut balances, &transfer(ZERO_ADDR, ALICE, "1000"));
        let key = (ALICE.parse().unwrap(), "0x1111111111111111111111111111111111111111".parse().unwrap(), None);
        assert!(balances[&key].is_creator);
        assert_eq!(balances[&key].balance.as_decimal_string(), "1000");
    }

    #[test]
    fn burn_does_not_credit_zero_address() {
        let mut balances = HashMap::new();
        apply_transfer_effects(&mut balances, &transfer(ALICE, ZERO_ADDR, "10"));
        let zero_key = (ZERO_ADDR.parse().unwrap(), "0x1111111111111111111111111111111111111111".parse().unwrap(), None);
        assert!(!balances.contains_key(&zero_key));
    }

    #[test]
    fn sequential_transfers_accumulate() {
        let mut balances = HashMap::new();
        apply_transfer_effects(&mut balances, &transfer(ZERO_ADDR, ALICE, "1000"));
        apply_transfer_effects(&mut balances, &transfer(ALICE, BOB, "400"));
        let token: Address = "0x1111111111111111111111111111111111111111".parse().unwrap();
        let alice_key = (ALICE.parse().unwrap(), token, None);
        let bob_key = (BOB.parse().unwrap(), token, None);
        assert_eq!(balances[&alice_key].balance.as_decimal_string(), "600");
        assert_eq!(balances[&bob_key].balance.as_decimal_string(), "400");
    }
}
