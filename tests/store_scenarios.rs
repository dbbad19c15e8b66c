// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end behaviour of an opened wallet store.

mod common;

use std::sync::Arc;
use std::thread;

use common::{config, data_file, raw_storage, VARIANTS};
use uuid::Uuid;
use wallet_docstore::models::{KeyIndex, Order, OrderStatus, Side, WalletAddress, WalletTransaction};
use wallet_docstore::storage::schema::{ADDRESSES, TRANSACTIONS};
use wallet_docstore::storage::StorageVariant;
use wallet_docstore::{StoreError, WalletStore};

fn password() -> Vec<u8> {
    Uuid::new_v4().to_string().into_bytes()
}

fn active_address() -> WalletAddress {
    let mut address = WalletAddress::new("BTC", "1abc", KeyIndex::default());
    address.has_activity = true;
    address
}

#[test]
fn reopen_returns_stored_address() {
    for variant in VARIANTS {
        let dir = tempfile::tempdir().unwrap();
        let path = data_file(&dir);
        let pw = password();

        let store = WalletStore::open(&path, &pw, &config(variant)).unwrap();
        assert!(store.addresses().upsert(&active_address()).unwrap());
        store.close();

        let store = WalletStore::open(&path, &pw, &config(variant)).unwrap();
        assert_eq!(
            store.addresses().get_address("BTC", "1abc").unwrap(),
            Some(active_address())
        );
    }
}

#[test]
fn wrong_password_fails_at_open() {
    for variant in VARIANTS {
        let dir = tempfile::tempdir().unwrap();
        let path = data_file(&dir);

        let store = WalletStore::open(&path, b"right", &config(variant)).unwrap();
        store.addresses().upsert(&active_address()).unwrap();
        store.close();

        let err = WalletStore::open(&path, b"wrong", &config(variant)).unwrap_err();
        assert!(matches!(err, StoreError::Decryption(_)), "{variant}: {err}");
    }
}

#[test]
fn record_content_never_written_in_cleartext() {
    for variant in VARIANTS {
        let dir = tempfile::tempdir().unwrap();
        let path = data_file(&dir);

        let store = WalletStore::open(&path, &password(), &config(variant)).unwrap();
        let mut address = WalletAddress::new("BTC", "bc1qdistinctivepayload", KeyIndex::default());
        address.balance = "123456789".into();
        store.addresses().upsert(&address).unwrap();
        store.close();

        let raw = std::fs::read(&path).unwrap();
        let haystack = String::from_utf8_lossy(&raw);
        assert!(!haystack.contains("bc1qdistinctivepayload"), "{variant}");
        assert!(!haystack.contains("123456789"), "{variant}");
    }
}

#[test]
fn upsert_twice_stores_once() {
    for variant in VARIANTS {
        let dir = tempfile::tempdir().unwrap();
        let store = WalletStore::open(data_file(&dir), &password(), &config(variant)).unwrap();

        store.addresses().upsert(&active_address()).unwrap();
        store.addresses().upsert(&active_address()).unwrap();

        assert_eq!(store.addresses().list().unwrap(), vec![active_address()]);
        let counts = store.collection_counts().unwrap();
        assert!(counts.contains(&(ADDRESSES.name, 1)));
    }
}

#[test]
fn try_insert_keeps_the_first_record() {
    for variant in VARIANTS {
        let dir = tempfile::tempdir().unwrap();
        let store = WalletStore::open(data_file(&dir), &password(), &config(variant)).unwrap();

        let original = active_address();
        let mut other = active_address();
        other.balance = "5".into();

        assert!(store.addresses().try_insert(&original).unwrap());
        assert!(!store.addresses().try_insert(&other).unwrap());
        assert_eq!(
            store.addresses().get_address("BTC", "1abc").unwrap(),
            Some(original)
        );
    }
}

#[test]
fn tampered_index_fails_the_query() {
    let dir = tempfile::tempdir().unwrap();
    let path = data_file(&dir);
    let pw = password();

    let store = WalletStore::open(&path, &pw, &config(StorageVariant::Envelope)).unwrap();
    store.addresses().upsert(&active_address()).unwrap();
    store
        .addresses()
        .upsert(&WalletAddress::new("BTC", "1def", KeyIndex::default()))
        .unwrap();
    store.close();

    // Flip a cleartext index field without touching the ciphertext.
    raw_storage(&path, StorageVariant::Envelope, &pw)
        .with_connection(|conn, _| {
            let (id, mut stored) = conn.scan(ADDRESSES.name)?.remove(0);
            let flipped = !stored["index"]["hasActivity"].as_bool().unwrap_or(false);
            stored["index"]["hasActivity"] = flipped.into();
            conn.write(|batch| batch.put(ADDRESSES.name, &id, &stored))
        })
        .unwrap();

    let store = WalletStore::open(&path, &pw, &config(StorageVariant::Envelope)).unwrap();
    assert!(matches!(store.addresses().list(), Err(StoreError::Decryption(_))));
}

#[test]
fn dropped_index_field_fails_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = data_file(&dir);
    let pw = password();

    let store = WalletStore::open(&path, &pw, &config(StorageVariant::Envelope)).unwrap();
    let tx = WalletTransaction::new_pending("BTC", "t1", "1abc", "1def", "5");
    assert!(store.transactions().upsert(&tx).unwrap());
    store.close();

    // Remove a cleartext field that is indexed but not bound as associated data.
    raw_storage(&path, StorageVariant::Envelope, &pw)
        .with_connection(|conn, _| {
            let (id, mut stored) = conn.scan(TRANSACTIONS.name)?.remove(0);
            stored["index"].as_object_mut().unwrap().remove("state");
            conn.write(|batch| batch.put(TRANSACTIONS.name, &id, &stored))
        })
        .unwrap();

    let store = WalletStore::open(&path, &pw, &config(StorageVariant::Envelope)).unwrap();
    assert!(matches!(
        store.transactions().get_transaction("BTC", "t1"),
        Err(StoreError::Decryption(_))
    ));
    assert!(matches!(store.transactions().list(), Err(StoreError::Decryption(_))));
    // Filtered reads must not silently skip the record.
    assert!(matches!(store.transactions().unconfirmed(), Err(StoreError::Decryption(_))));
}

#[test]
fn concurrent_writers_serialize_through_the_lock() {
    for variant in VARIANTS {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(WalletStore::open(data_file(&dir), &password(), &config(variant)).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..5 {
                        let address = WalletAddress::new("LTC", format!("L{worker}-{i}"), KeyIndex::default());
                        assert!(store.addresses().upsert(&address).unwrap());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.addresses().addresses_by_currency("LTC").unwrap().len(), 20);
    }
}

#[test]
fn stale_order_update_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let store = WalletStore::open(data_file(&dir), &password(), &config(StorageVariant::Envelope)).unwrap();

    let newer = Order {
        order_id: 7,
        client_order_id: Uuid::new_v4().to_string(),
        symbol: "ETH/BTC".into(),
        side: Side::Buy,
        price: "0.05".into(),
        qty: "2".into(),
        leave_qty: "1".into(),
        status: OrderStatus::PartiallyFilled,
        last_updated: chrono::Utc::now(),
        from_address: None,
        to_address: None,
    };
    let mut older = newer.clone();
    older.status = OrderStatus::Pending;
    older.leave_qty = "2".into();
    older.last_updated = newer.last_updated - chrono::Duration::seconds(30);

    assert!(store.orders().upsert_order(&newer).unwrap());
    assert!(!store.orders().upsert_order(&older).unwrap());
    assert_eq!(
        store.orders().get_order(&newer.client_order_id).unwrap(),
        Some(newer)
    );
}
