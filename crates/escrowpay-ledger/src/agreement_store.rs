//! Agreement record storage.
//!
//! Holds one [`PaymentAgreement`] per derived id while it is pending.
//! Terminal transitions remove the record through [`AgreementStore::delete`],
//! after which the id is free for a new `CreateAgreement`.

use std::collections::HashMap;

use escrowpay_types::{Address, AgreementId, EscrowError, PaymentAgreement, Result};

use crate::index::AgreementIndex;

/// Live agreement records plus their participant index.
#[derive(Debug, Default)]
pub struct AgreementStore {
    records: HashMap<AgreementId, PaymentAgreement>,
    index: AgreementIndex,
}

impl AgreementStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// `AgreementAlreadyExists` if a record with the same id is live.
    pub fn insert(&mut self, record: PaymentAgreement) -> Result<()> {
        if self.records.contains_key(&record.id) {
            return Err(EscrowError::AgreementAlreadyExists(record.id));
        }
        self.index.insert(&record);
        self.records.insert(record.id, record);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &AgreementId) -> Option<&PaymentAgreement> {
        self.records.get(id)
    }

    /// Owned copy of a live record, for mutate-then-[`replace`](Self::replace).
    ///
    /// # Errors
    /// `AgreementNotFound` if no record exists.
    pub fn load(&self, id: &AgreementId) -> Result<PaymentAgreement> {
        self.records
            .get(id)
            .cloned()
            .ok_or(EscrowError::AgreementNotFound(*id))
    }

    #[must_use]
    pub fn contains(&self, id: &AgreementId) -> bool {
        self.records.contains_key(id)
    }

    /// Write back a record loaded with [`load`](Self::load). Only flags may
    /// differ from the stored copy.
    ///
    /// # Errors
    /// - `AgreementNotFound` if the record was deleted in between
    /// - `Internal` if any immutable term changed
    pub fn replace(&mut self, record: PaymentAgreement) -> Result<()> {
        let current = self
            .records
            .get_mut(&record.id)
            .ok_or(EscrowError::AgreementNotFound(record.id))?;
        if !same_terms(current, &record) {
            return Err(EscrowError::Internal(format!(
                "immutable terms changed on {}",
                record.id
            )));
        }
        *current = record;
        Ok(())
    }

    /// Remove a record. Returns it if it was live.
    pub fn delete(&mut self, id: &AgreementId) -> Option<PaymentAgreement> {
        let record = self.records.remove(id)?;
        self.index.remove(&record);
        Some(record)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PaymentAgreement> {
        self.records.values()
    }

    #[must_use]
    pub fn by_payer(&self, address: &Address) -> Vec<&PaymentAgreement> {
        self.resolve(self.index.payer(address))
    }

    #[must_use]
    pub fn by_receiver(&self, address: &Address) -> Vec<&PaymentAgreement> {
        self.resolve(self.index.receiver(address))
    }

    #[must_use]
    pub fn by_referee(&self, address: &Address) -> Vec<&PaymentAgreement> {
        self.resolve(self.index.referee(address))
    }

    #[must_use]
    pub fn involving(&self, address: &Address) -> Vec<&PaymentAgreement> {
        self.resolve(self.index.involving(address))
    }

    fn resolve(&self, ids: Vec<AgreementId>) -> Vec<&PaymentAgreement> {
        ids.iter().filter_map(|id| self.records.get(id)).collect()
    }
}

fn same_terms(a: &PaymentAgreement, b: &PaymentAgreement) -> bool {
    a.name == b.name
        && a.payer == b.payer
        && a.receiver == b.receiver
        && a.referee == b.referee
        && a.amount == b.amount
        && a.expiration_timestamp == b.expiration_timestamp
        && a.created_at == b.created_at
}

#[cfg(test)]
mod tests {
    use escrowpay_types::Party;

    use super::*;

    fn record() -> PaymentAgreement {
        PaymentAgreement::dummy(Address([1; 32]), Address([2; 32]), 1_000)
    }

    #[test]
    fn insert_then_load() {
        let mut store = AgreementStore::new();
        let r = record();
        store.insert(r.clone()).unwrap();
        assert_eq!(store.load(&r.id).unwrap(), r);
        assert!(store.contains(&r.id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut store = AgreementStore::new();
        store.insert(record()).unwrap();
        let err = store.insert(record()).unwrap_err();
        assert!(matches!(err, EscrowError::AgreementAlreadyExists(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn load_missing_is_not_found() {
        let store = AgreementStore::new();
        let err = store.load(&AgreementId([7; 32])).unwrap_err();
        assert!(matches!(err, EscrowError::AgreementNotFound(_)));
    }

    #[test]
    fn replace_writes_flags() {
        let mut store = AgreementStore::new();
        let r = record();
        store.insert(r.clone()).unwrap();
        let mut loaded = store.load(&r.id).unwrap();
        loaded.record_approval(Party::Receiver);
        store.replace(loaded).unwrap();
        assert!(store.get(&r.id).unwrap().receiver_approved);
    }

    #[test]
    fn replace_rejects_term_changes() {
        let mut store = AgreementStore::new();
        let r = record();
        store.insert(r.clone()).unwrap();
        let mut loaded = store.load(&r.id).unwrap();
        loaded.amount = 1;
        let err = store.replace(loaded).unwrap_err();
        assert!(matches!(err, EscrowError::Internal(_)));
        assert_eq!(store.get(&r.id).unwrap().amount, 1_000);
    }

    #[test]
    fn replace_after_delete_is_not_found() {
        let mut store = AgreementStore::new();
        let r = record();
        store.insert(r.clone()).unwrap();
        let loaded = store.load(&r.id).unwrap();
        store.delete(&r.id).unwrap();
        let err = store.replace(loaded).unwrap_err();
        assert!(matches!(err, EscrowError::AgreementNotFound(_)));
    }

    #[test]
    fn delete_frees_id_and_index() {
        let mut store = AgreementStore::new();
        let r = record();
        store.insert(r.clone()).unwrap();
        assert_eq!(store.by_payer(&r.payer).len(), 1);
        assert_eq!(store.delete(&r.id), Some(r.clone()));
        assert!(store.delete(&r.id).is_none());
        assert!(store.is_empty());
        assert!(store.by_payer(&r.payer).is_empty());
        assert!(store.involving(&r.receiver).is_empty());
        store.insert(r).unwrap();
    }
}
