// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Domain records persisted by the store.
//!
//! Amounts are decimal strings so no precision is lost for 18-decimal tokens.
//! Field names serialize in camelCase; the cleartext index and associated-data
//! declarations in [`crate::storage::schema`] refer to these serialized names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Addresses
// =============================================================================

/// HD derivation path components of an address key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyIndex {
    pub account: u32,
    /// 0 = external, 1 = internal (change).
    pub chain: u32,
    pub index: u32,
}

/// Key scheme tag. Added in schema version 8; older records default to
/// [`KeyType::STANDARD`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyType(pub u32);

impl KeyType {
    pub const STANDARD: KeyType = KeyType(0);
    pub const ALTERNATIVE: KeyType = KeyType(1);
}

/// A derived wallet address and its cached balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddress {
    pub currency: String,
    pub address: String,
    pub balance: String,
    pub unconfirmed_income: String,
    pub unconfirmed_outcome: String,
    pub key_index: KeyIndex,
    #[serde(default)]
    pub key_type: KeyType,
    pub has_activity: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_successful_update: Option<DateTime<Utc>>,
}

impl WalletAddress {
    /// Create an unused address with zero balances.
    pub fn new(currency: impl Into<String>, address: impl Into<String>, key_index: KeyIndex) -> Self {
        Self {
            currency: currency.into(),
            address: address.into(),
            balance: "0".to_string(),
            unconfirmed_income: "0".to_string(),
            unconfirmed_outcome: "0".to_string(),
            key_index,
            key_type: KeyType::STANDARD,
            has_activity: false,
            last_successful_update: None,
        }
    }

    /// Logical identifier: `{address}:{currency}`.
    pub fn unique_id(address: &str, currency: &str) -> String {
        format!("{address}:{currency}")
    }

    fn is_nonzero(amount: &str) -> bool {
        amount.chars().any(|c| c.is_ascii_digit() && c != '0')
    }

    /// Whether the address holds (or is about to hold) funds.
    pub fn has_funds(&self, include_unconfirmed: bool) -> bool {
        Self::is_nonzero(&self.balance)
            || (include_unconfirmed && Self::is_nonzero(&self.unconfirmed_income))
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// On-chain state of a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxState {
    #[default]
    Pending,
    Unconfirmed,
    Confirmed,
    Failed,
}

impl TxState {
    pub fn as_str(self) -> &'static str {
        match self {
            TxState::Pending => "pending",
            TxState::Unconfirmed => "unconfirmed",
            TxState::Confirmed => "confirmed",
            TxState::Failed => "failed",
        }
    }
}

/// Block inclusion details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub block_height: u64,
    pub block_time: DateTime<Utc>,
    pub confirmations: u64,
}

/// A wallet transaction in any supported currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub currency: String,
    pub tx_id: String,
    pub state: TxState,
    pub creation_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_info: Option<BlockInfo>,
    pub from: String,
    pub to: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    /// Legacy gas price (EVM currencies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    /// EIP-1559 fee cap (EVM currencies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
}

impl WalletTransaction {
    pub fn new_pending(
        currency: impl Into<String>,
        tx_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            currency: currency.into(),
            tx_id: tx_id.into(),
            state: TxState::Pending,
            creation_time: Utc::now(),
            block_info: None,
            from: from.into(),
            to: to.into(),
            amount: amount.into(),
            fee: None,
            gas_price: None,
            max_fee_per_gas: None,
        }
    }

    /// Logical identifier: `{currency}:{txId}`.
    pub fn unique_id(currency: &str, tx_id: &str) -> String {
        format!("{currency}:{tx_id}")
    }

    pub fn mark_confirmed(&mut self, block_info: BlockInfo) {
        self.state = TxState::Confirmed;
        self.block_info = Some(block_info);
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// Reference to a transaction input that spent an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxPoint {
    pub hash: String,
    pub index: u32,
}

/// A UTXO owned by one of the wallet's addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutput {
    pub currency: String,
    pub tx_id: String,
    pub index: u32,
    pub address: String,
    /// Value in the currency's smallest unit.
    pub value: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent_tx_point: Option<TxPoint>,
}

impl TxOutput {
    /// Logical identifier: `{currency}:{txId}:{index}`.
    pub fn unique_id(currency: &str, tx_id: &str, index: u32) -> String {
        format!("{currency}:{tx_id}:{index}")
    }

    pub fn is_spent(&self) -> bool {
        self.spent_tx_point.is_some()
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Pending,
    Placed,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Placed => "placed",
            OrderStatus::PartiallyFilled => "partiallyFilled",
            OrderStatus::Filled => "filled",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Rejected => "rejected",
        }
    }
}

/// An exchange order placed by this wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Exchange-assigned id (0 until the exchange acknowledges the order).
    pub order_id: i64,
    /// Client-generated id, unique per wallet.
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub price: String,
    pub qty: String,
    pub leave_qty: String,
    pub status: OrderStatus,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
}

// =============================================================================
// Swaps
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapStatus {
    Empty,
    Initiated,
    Accepted,
    Completed,
    Refunded,
    Canceled,
}

impl SwapStatus {
    pub const ALL: [SwapStatus; 6] = [
        SwapStatus::Empty,
        SwapStatus::Initiated,
        SwapStatus::Accepted,
        SwapStatus::Completed,
        SwapStatus::Refunded,
        SwapStatus::Canceled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SwapStatus::Empty => "empty",
            SwapStatus::Initiated => "initiated",
            SwapStatus::Accepted => "accepted",
            SwapStatus::Completed => "completed",
            SwapStatus::Refunded => "refunded",
            SwapStatus::Canceled => "canceled",
        }
    }

    pub fn is_final(self) -> bool {
        matches!(
            self,
            SwapStatus::Completed | SwapStatus::Refunded | SwapStatus::Canceled
        )
    }
}

/// An atomic swap and the progress of its on-chain legs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swap {
    pub id: i64,
    pub symbol: String,
    pub side: Side,
    pub status: SwapStatus,
    /// Bit set of completed protocol steps.
    pub state_flags: u32,
    pub time_stamp: DateTime<Utc>,
    pub price: String,
    pub qty: String,
    pub secret_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_tx_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeem_tx_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_tx_id: Option<String>,
    pub to_address: String,
    pub refund_address: String,
}

// =============================================================================
// Tokens
// =============================================================================

/// Token standard of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Fa12,
    Fa2,
    Erc20,
}

impl ContractType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContractType::Fa12 => "fa12",
            ContractType::Fa2 => "fa2",
            ContractType::Erc20 => "erc20",
        }
    }
}

/// Balance of one token held by one wallet address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    /// Token currency code (e.g. `TZBTC`).
    pub currency: String,
    pub address: String,
    pub contract: String,
    pub token_id: u64,
    pub symbol: String,
    pub decimals: u8,
    pub balance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_successful_update: Option<DateTime<Utc>>,
}

impl TokenBalance {
    /// Logical identifier: `{address}:{contract}:{tokenId}`.
    pub fn unique_id(address: &str, contract: &str, token_id: u64) -> String {
        format!("{address}:{contract}:{token_id}")
    }
}

/// A token transfer touching one of the wallet's addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    /// Operation hash.
    pub id: String,
    pub currency: String,
    pub contract: String,
    pub token_id: u64,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub state: TxState,
    pub creation_time: DateTime<Utc>,
}

impl TokenTransfer {
    /// Logical identifier: `{id}:{contract}:{tokenId}`.
    pub fn unique_id(id: &str, contract: &str, token_id: u64) -> String {
        format!("{id}:{contract}:{token_id}")
    }
}

/// Metadata of a token contract the wallet has interacted with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenContract {
    pub address: String,
    pub name: String,
    pub contract_type: ContractType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_funds_detection() {
        let mut addr = WalletAddress::new("BTC", "1abc", KeyIndex::default());
        assert!(!addr.has_funds(true));

        addr.unconfirmed_income = "0.0001".to_string();
        assert!(!addr.has_funds(false));
        assert!(addr.has_funds(true));

        addr.balance = "0.000".to_string();
        assert!(!addr.has_funds(false));
        addr.balance = "12".to_string();
        assert!(addr.has_funds(false));
    }

    #[test]
    fn key_type_defaults_when_missing() {
        let json = serde_json::json!({
            "currency": "BTC",
            "address": "1abc",
            "balance": "0",
            "unconfirmedIncome": "0",
            "unconfirmedOutcome": "0",
            "keyIndex": {"account": 0, "chain": 0, "index": 3},
            "hasActivity": true
        });
        let addr: WalletAddress = serde_json::from_value(json).unwrap();
        assert_eq!(addr.key_type, KeyType::STANDARD);
        assert_eq!(addr.key_index.index, 3);
    }

    #[test]
    fn enums_serialize_to_index_strings() {
        assert_eq!(
            serde_json::to_value(TxState::Pending).unwrap(),
            serde_json::json!(TxState::Pending.as_str())
        );
        assert_eq!(
            serde_json::to_value(OrderStatus::PartiallyFilled).unwrap(),
            serde_json::json!(OrderStatus::PartiallyFilled.as_str())
        );
        assert_eq!(
            serde_json::to_value(SwapStatus::Initiated).unwrap(),
            serde_json::json!(SwapStatus::Initiated.as_str())
        );
        assert_eq!(
            serde_json::to_value(ContractType::Fa12).unwrap(),
            serde_json::json!(ContractType::Fa12.as_str())
        );
    }

    #[test]
    fn swap_final_states() {
        let finals: Vec<_> = SwapStatus::ALL.into_iter().filter(|s| s.is_final()).collect();
        assert_eq!(
            finals,
            [SwapStatus::Completed, SwapStatus::Refunded, SwapStatus::Canceled]
        );
    }

    #[test]
    fn unique_ids_compose_fields() {
        assert_eq!(WalletAddress::unique_id("1abc", "BTC"), "1abc:BTC");
        assert_eq!(WalletTransaction::unique_id("ETH", "0xff"), "ETH:0xff");
        assert_eq!(TxOutput::unique_id("LTC", "aa", 2), "LTC:aa:2");
        assert_eq!(TokenBalance::unique_id("tz1", "KT1", 0), "tz1:KT1:0");
        assert_eq!(TokenTransfer::unique_id("oo1", "KT1", 5), "oo1:KT1:5");
    }
}
