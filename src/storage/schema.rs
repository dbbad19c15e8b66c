// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-entity-kind storage declarations.
//!
//! Every collection declares, in one place:
//!
//! - `ad_fields`: fields bound into the AEAD tag as associated data
//! - `index_fields`: fields copied out of the envelope in cleartext so
//!   equality/range filters can run without decrypting
//!
//! `ad_fields` must be a subset of `index_fields`: decryption rebuilds the
//! associated data from the cleartext copies, so a tampered copy fails
//! authentication.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Order, Swap, TokenBalance, TokenContract, TokenTransfer, TxOutput, WalletAddress,
    WalletTransaction,
};

/// Field that carries the logical identifier inside a stored/decoded document.
pub const ID_FIELD: &str = "_id";

/// A decoded document: the record's JSON fields plus [`ID_FIELD`].
pub type Document = Map<String, Value>;

/// Storage declaration of one collection.
#[derive(Debug, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub ad_fields: &'static [&'static str],
    pub index_fields: &'static [&'static str],
}

impl CollectionSchema {
    /// Associated data: AD field values joined with `:`.
    ///
    /// Strings are used raw, booleans and numbers in their JSON text form,
    /// missing or null values as the empty string.
    pub fn associated_data(&self, fields: &Map<String, Value>) -> Vec<u8> {
        self.ad_fields
            .iter()
            .map(|field| match fields.get(*field) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(":")
            .into_bytes()
    }

    /// Cleartext index values extracted from a decoded document.
    pub fn index_values(&self, doc: &Document) -> Map<String, Value> {
        self.index_fields
            .iter()
            .map(|field| {
                (
                    (*field).to_string(),
                    doc.get(*field).cloned().unwrap_or(Value::Null),
                )
            })
            .collect()
    }

    pub fn is_indexed(&self, field: &str) -> bool {
        self.index_fields.contains(&field)
    }
}

pub const ADDRESSES: CollectionSchema = CollectionSchema {
    name: "addresses",
    ad_fields: &["currency", "hasActivity"],
    index_fields: &["currency", "hasActivity"],
};

pub const TRANSACTIONS: CollectionSchema = CollectionSchema {
    name: "transactions",
    ad_fields: &["currency"],
    index_fields: &["currency", "state"],
};

pub const OUTPUTS: CollectionSchema = CollectionSchema {
    name: "outputs",
    ad_fields: &["currency"],
    index_fields: &["currency"],
};

pub const ORDERS: CollectionSchema = CollectionSchema {
    name: "orders",
    ad_fields: &["symbol"],
    index_fields: &["symbol", "status"],
};

pub const SWAPS: CollectionSchema = CollectionSchema {
    name: "swaps",
    ad_fields: &["symbol"],
    index_fields: &["symbol", "status"],
};

pub const TOKEN_BALANCES: CollectionSchema = CollectionSchema {
    name: "token_balances",
    ad_fields: &["currency"],
    index_fields: &["currency", "contract"],
};

pub const TOKEN_TRANSFERS: CollectionSchema = CollectionSchema {
    name: "token_transfers",
    ad_fields: &["contract"],
    index_fields: &["contract", "currency"],
};

pub const TOKEN_CONTRACTS: CollectionSchema = CollectionSchema {
    name: "token_contracts",
    ad_fields: &["contractType"],
    index_fields: &["contractType"],
};

/// Every collection the store knows about.
pub const ALL_COLLECTIONS: &[&CollectionSchema] = &[
    &ADDRESSES,
    &TRANSACTIONS,
    &OUTPUTS,
    &ORDERS,
    &SWAPS,
    &TOKEN_BALANCES,
    &TOKEN_TRANSFERS,
    &TOKEN_CONTRACTS,
];

// =============================================================================
// Entity binding
// =============================================================================

/// A record type stored in one collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const SCHEMA: &'static CollectionSchema;

    /// Stable plaintext logical identifier, unique within the collection.
    fn logical_id(&self) -> String;

    /// Serialize into a decoded document carrying the logical id.
    fn to_document(&self) -> StoreResult<Document> {
        match serde_json::to_value(self)? {
            Value::Object(mut map) => {
                map.insert(ID_FIELD.to_string(), Value::String(self.logical_id()));
                Ok(map)
            }
            _ => Err(StoreError::invalid_record(
                Self::SCHEMA.name,
                "record does not serialize to an object",
            )),
        }
    }

    /// Deserialize from a decoded document.
    fn from_document(mut doc: Document) -> StoreResult<Self> {
        doc.remove(ID_FIELD);
        serde_json::from_value(Value::Object(doc))
            .map_err(|e| StoreError::invalid_record(Self::SCHEMA.name, e.to_string()))
    }
}

impl Entity for WalletAddress {
    const SCHEMA: &'static CollectionSchema = &ADDRESSES;

    fn logical_id(&self) -> String {
        WalletAddress::unique_id(&self.address, &self.currency)
    }
}

impl Entity for WalletTransaction {
    const SCHEMA: &'static CollectionSchema = &TRANSACTIONS;

    fn logical_id(&self) -> String {
        WalletTransaction::unique_id(&self.currency, &self.tx_id)
    }
}

impl Entity for TxOutput {
    const SCHEMA: &'static CollectionSchema = &OUTPUTS;

    fn logical_id(&self) -> String {
        TxOutput::unique_id(&self.currency, &self.tx_id, self.index)
    }
}

impl Entity for Order {
    const SCHEMA: &'static CollectionSchema = &ORDERS;

    fn logical_id(&self) -> String {
        self.client_order_id.clone()
    }
}

impl Entity for Swap {
    const SCHEMA: &'static CollectionSchema = &SWAPS;

    fn logical_id(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for TokenBalance {
    const SCHEMA: &'static CollectionSchema = &TOKEN_BALANCES;

    fn logical_id(&self) -> String {
        TokenBalance::unique_id(&self.address, &self.contract, self.token_id)
    }
}

impl Entity for TokenTransfer {
    const SCHEMA: &'static CollectionSchema = &TOKEN_TRANSFERS;

    fn logical_id(&self) -> String {
        TokenTransfer::unique_id(&self.id, &self.contract, self.token_id)
    }
}

impl Entity for TokenContract {
    const SCHEMA: &'static CollectionSchema = &TOKEN_CONTRACTS;

    fn logical_id(&self) -> String {
        self.address.clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::*;
    use chrono::Utc;

    pub(crate) fn sample_address() -> WalletAddress {
        let mut a = WalletAddress::new("BTC", "1abc", KeyIndex::default());
        a.has_activity = true;
        a
    }

    fn sample_documents() -> Vec<(&'static CollectionSchema, Document)> {
        let tx = WalletTransaction::new_pending("ETH", "0x01", "0xa", "0xb", "1");
        let output = TxOutput {
            currency: "BTC".into(),
            tx_id: "aa".into(),
            index: 0,
            address: "1abc".into(),
            value: 1000,
            spent_tx_point: None,
        };
        let order = Order {
            order_id: 1,
            client_order_id: "c-1".into(),
            symbol: "ETH/BTC".into(),
            side: Side::Buy,
            price: "0.05".into(),
            qty: "1".into(),
            leave_qty: "1".into(),
            status: OrderStatus::Placed,
            last_updated: Utc::now(),
            from_address: None,
            to_address: None,
        };
        let swap = Swap {
            id: 7,
            symbol: "ETH/BTC".into(),
            side: Side::Sell,
            status: SwapStatus::Initiated,
            state_flags: 0,
            time_stamp: Utc::now(),
            price: "0.05".into(),
            qty: "1".into(),
            secret_hash: "ab".into(),
            payment_tx_id: None,
            redeem_tx_id: None,
            refund_tx_id: None,
            to_address: "0xb".into(),
            refund_address: "0xa".into(),
        };
        let balance = TokenBalance {
            currency: "TZBTC".into(),
            address: "tz1".into(),
            contract: "KT1".into(),
            token_id: 0,
            symbol: "tzBTC".into(),
            decimals: 8,
            balance: "1".into(),
            last_successful_update: None,
        };
        let transfer = TokenTransfer {
            id: "oo1".into(),
            currency: "TZBTC".into(),
            contract: "KT1".into(),
            token_id: 0,
            from: "tz1".into(),
            to: "tz2".into(),
            amount: "1".into(),
            state: TxState::Confirmed,
            creation_time: Utc::now(),
        };
        let contract = TokenContract {
            address: "KT1".into(),
            name: "tzBTC".into(),
            contract_type: ContractType::Fa12,
        };

        vec![
            (&ADDRESSES, sample_address().to_document().unwrap()),
            (&TRANSACTIONS, tx.to_document().unwrap()),
            (&OUTPUTS, output.to_document().unwrap()),
            (&ORDERS, order.to_document().unwrap()),
            (&SWAPS, swap.to_document().unwrap()),
            (&TOKEN_BALANCES, balance.to_document().unwrap()),
            (&TOKEN_TRANSFERS, transfer.to_document().unwrap()),
            (&TOKEN_CONTRACTS, contract.to_document().unwrap()),
        ]
    }

    #[test]
    fn ad_fields_are_subset_of_index_fields() {
        for schema in ALL_COLLECTIONS {
            for field in schema.ad_fields {
                assert!(
                    schema.index_fields.contains(field),
                    "{}: AD field {field} is not indexed",
                    schema.name
                );
            }
        }
    }

    #[test]
    fn declared_fields_exist_on_records() {
        let docs = sample_documents();
        assert_eq!(docs.len(), ALL_COLLECTIONS.len());
        for (schema, doc) in docs {
            for field in schema.index_fields {
                assert!(
                    doc.contains_key(*field),
                    "{}: declared field {field} missing from record",
                    schema.name
                );
            }
        }
    }

    #[test]
    fn logical_ids_are_not_indexed() {
        for schema in ALL_COLLECTIONS {
            assert!(!schema.is_indexed(ID_FIELD));
            assert!(!schema.is_indexed("address"));
            assert!(!schema.is_indexed("txId"));
        }
    }

    #[test]
    fn address_associated_data_format() {
        let doc = sample_address().to_document().unwrap();
        assert_eq!(ADDRESSES.associated_data(&doc), b"BTC:true".to_vec());
    }

    #[test]
    fn document_round_trip_strips_id() {
        let addr = sample_address();
        let doc = addr.to_document().unwrap();
        assert_eq!(doc.get(ID_FIELD), Some(&Value::String("1abc:BTC".into())));
        let back = WalletAddress::from_document(doc).unwrap();
        assert_eq!(back, addr);
    }
}
