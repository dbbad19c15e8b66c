// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The migration chain, version 0 through [`super::LATEST_VERSION`].

use serde_json::Value;

use super::{MigrationAction, MigrationActions, MigrationBatch, MigrationContext, MigrationStep, Network};
use crate::error::StoreResult;
use crate::storage::filter::Filter;
use crate::storage::schema::{
    CollectionSchema, Document, ADDRESSES, ID_FIELD, OUTPUTS, TOKEN_BALANCES, TOKEN_TRANSFERS,
    TRANSACTIONS,
};

pub static STEPS: &[MigrationStep] = &[
    MigrationStep {
        from: 0,
        to: 1,
        name: "reload_transactions",
        transform: reload_transactions,
    },
    MigrationStep {
        from: 1,
        to: 2,
        name: "purge_testnet_xtz",
        transform: purge_testnet_xtz,
    },
    MigrationStep {
        from: 2,
        to: 3,
        name: "compound_address_ids",
        transform: compound_address_ids,
    },
    MigrationStep {
        from: 3,
        to: 4,
        name: "strip_repeated_currency_suffix",
        transform: strip_repeated_currency_suffix,
    },
    MigrationStep {
        from: 4,
        to: 5,
        name: "retire_nyx",
        transform: retire_nyx,
    },
    MigrationStep {
        from: 5,
        to: 6,
        name: "retire_fa2",
        transform: retire_fa2,
    },
    MigrationStep {
        from: 6,
        to: 7,
        name: "retire_wtz",
        transform: retire_wtz,
    },
    MigrationStep {
        from: 7,
        to: 8,
        name: "backfill_key_type",
        transform: backfill_key_type,
    },
    MigrationStep {
        from: 8,
        to: 9,
        name: "fix_eth_max_fee_per_gas",
        transform: fix_eth_max_fee_per_gas,
    },
    MigrationStep {
        from: 9,
        to: 10,
        name: "remove_invalid_token_balances",
        transform: remove_invalid_token_balances,
    },
];

/// Collections whose records carry a cleartext `currency`.
const CURRENCY_COLLECTIONS: [&CollectionSchema; 5] =
    [&ADDRESSES, &TRANSACTIONS, &OUTPUTS, &TOKEN_BALANCES, &TOKEN_TRANSFERS];

/// Token balances recorded under contracts that were later found invalid.
const INVALID_TOKEN_CURRENCIES: [&str; 3] = ["USDT_XTZ", "KUSD", "TZBTC_OLD"];

fn str_field<'a>(doc: &'a Document, field: &str) -> Option<&'a str> {
    doc.get(field).and_then(Value::as_str)
}

fn reload_transactions(
    batch: &mut MigrationBatch<'_, '_>,
    _ctx: &MigrationContext,
) -> StoreResult<MigrationActions> {
    batch.drop_collection(&TRANSACTIONS)?;
    batch.drop_collection(&OUTPUTS)?;
    tracing::info!("Transaction history dropped for full reload");
    Ok(MigrationActions::with(MigrationAction::ReloadTransactions))
}

fn purge_testnet_xtz(
    batch: &mut MigrationBatch<'_, '_>,
    ctx: &MigrationContext,
) -> StoreResult<MigrationActions> {
    if ctx.network != Network::TestNet {
        return Ok(MigrationActions::none());
    }
    let filter = Filter::eq("currency", "XTZ");
    let mut removed = 0;
    for schema in [&ADDRESSES, &TRANSACTIONS, &OUTPUTS] {
        removed += batch.delete_where(schema, &filter)?;
    }
    tracing::info!(removed, "Testnet XTZ data purged");
    Ok(MigrationActions::with(MigrationAction::ReloadCurrency("XTZ".to_string())))
}

fn compound_address_ids(
    batch: &mut MigrationBatch<'_, '_>,
    _ctx: &MigrationContext,
) -> StoreResult<MigrationActions> {
    let (moved, dropped) = batch.rekey(&ADDRESSES, |doc| {
        let address = str_field(doc, "address")?;
        let currency = str_field(doc, "currency")?;
        Some(format!("{address}:{currency}"))
    })?;
    tracing::info!(moved, dropped, "Address ids re-keyed to address:currency");
    Ok(MigrationActions::none())
}

/// `addr:BTC:BTC:BTC` -> `addr:BTC`.
fn strip_suffix_repeats(id: &str, currency: &str) -> String {
    let suffix = format!(":{currency}");
    let mut id = id;
    while let Some(stripped) = id.strip_suffix(suffix.as_str()) {
        if !stripped.ends_with(suffix.as_str()) {
            break;
        }
        id = stripped;
    }
    id.to_string()
}

fn strip_repeated_currency_suffix(
    batch: &mut MigrationBatch<'_, '_>,
    _ctx: &MigrationContext,
) -> StoreResult<MigrationActions> {
    let (moved, dropped) = batch.rekey(&ADDRESSES, |doc| {
        let id = str_field(doc, ID_FIELD)?;
        let currency = str_field(doc, "currency")?;
        Some(strip_suffix_repeats(id, currency))
    })?;
    tracing::info!(moved, dropped, "Repeated currency suffixes stripped from address ids");
    Ok(MigrationActions::none())
}

fn retire_currency(batch: &mut MigrationBatch<'_, '_>, currency: &str) -> StoreResult<MigrationActions> {
    let filter = Filter::eq("currency", currency);
    let mut removed = 0;
    for schema in CURRENCY_COLLECTIONS {
        removed += batch.delete_where(schema, &filter)?;
    }
    tracing::info!(currency, removed, "Retired currency removed");
    Ok(MigrationActions::none())
}

fn retire_nyx(batch: &mut MigrationBatch<'_, '_>, _ctx: &MigrationContext) -> StoreResult<MigrationActions> {
    retire_currency(batch, "NYX")
}

fn retire_fa2(batch: &mut MigrationBatch<'_, '_>, _ctx: &MigrationContext) -> StoreResult<MigrationActions> {
    retire_currency(batch, "FA2")
}

fn retire_wtz(batch: &mut MigrationBatch<'_, '_>, _ctx: &MigrationContext) -> StoreResult<MigrationActions> {
    retire_currency(batch, "WTZ")
}

fn backfill_key_type(
    batch: &mut MigrationBatch<'_, '_>,
    _ctx: &MigrationContext,
) -> StoreResult<MigrationActions> {
    let changed = batch.update(&ADDRESSES, |doc| {
        if doc.contains_key("keyType") {
            return false;
        }
        doc.insert("keyType".to_string(), Value::from(0u32));
        true
    })?;
    tracing::info!(changed, "Address key types backfilled");
    Ok(MigrationActions::none())
}

fn fix_eth_max_fee_per_gas(
    batch: &mut MigrationBatch<'_, '_>,
    _ctx: &MigrationContext,
) -> StoreResult<MigrationActions> {
    let changed = batch.update(&TRANSACTIONS, |doc| {
        if str_field(doc, "currency") != Some("ETH") || str_field(doc, "state") != Some("pending") {
            return false;
        }
        match doc.get("gasPrice").cloned() {
            Some(gas_price @ Value::String(_)) => {
                doc.insert("maxFeePerGas".to_string(), gas_price);
                true
            }
            _ => false,
        }
    })?;
    tracing::info!(changed, "Pending ETH fee caps repaired");
    Ok(MigrationActions::none())
}

fn remove_invalid_token_balances(
    batch: &mut MigrationBatch<'_, '_>,
    _ctx: &MigrationContext,
) -> StoreResult<MigrationActions> {
    let removed = batch.delete_where(
        &TOKEN_BALANCES,
        &Filter::any_of("currency", INVALID_TOKEN_CURRENCIES),
    )?;
    tracing::info!(removed, "Invalid token balances removed");
    Ok(MigrationActions::none())
}
