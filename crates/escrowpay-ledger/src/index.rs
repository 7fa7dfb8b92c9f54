//! Secondary indexes over live agreements, keyed by participant.

use std::collections::{BTreeSet, HashMap};

use escrowpay_types::{Address, AgreementId, PaymentAgreement};

/// Per-role lookup from address to the ids of live agreements.
///
/// Sets are ordered so query results are deterministic.
#[derive(Debug, Default)]
pub struct AgreementIndex {
    by_payer: HashMap<Address, BTreeSet<AgreementId>>,
    by_receiver: HashMap<Address, BTreeSet<AgreementId>>,
    by_referee: HashMap<Address, BTreeSet<AgreementId>>,
}

impl AgreementIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: &PaymentAgreement) {
        self.by_payer.entry(record.payer).or_default().insert(record.id);
        self.by_receiver
            .entry(record.receiver)
            .or_default()
            .insert(record.id);
        if let Some(referee) = record.referee {
            self.by_referee.entry(referee).or_default().insert(record.id);
        }
    }

    pub fn remove(&mut self, record: &PaymentAgreement) {
        detach(&mut self.by_payer, &record.payer, &record.id);
        detach(&mut self.by_receiver, &record.receiver, &record.id);
        if let Some(referee) = &record.referee {
            detach(&mut self.by_referee, referee, &record.id);
        }
    }

    #[must_use]
    pub fn payer(&self, address: &Address) -> Vec<AgreementId> {
        collect(&self.by_payer, address)
    }

    #[must_use]
    pub fn receiver(&self, address: &Address) -> Vec<AgreementId> {
        collect(&self.by_receiver, address)
    }

    #[must_use]
    pub fn referee(&self, address: &Address) -> Vec<AgreementId> {
        collect(&self.by_referee, address)
    }

    /// Every agreement `address` participates in under any role.
    #[must_use]
    pub fn involving(&self, address: &Address) -> Vec<AgreementId> {
        let mut all = BTreeSet::new();
        for map in [&self.by_payer, &self.by_receiver, &self.by_referee] {
            if let Some(ids) = map.get(address) {
                all.extend(ids.iter().copied());
            }
        }
        all.into_iter().collect()
    }
}

fn detach(map: &mut HashMap<Address, BTreeSet<AgreementId>>, address: &Address, id: &AgreementId) {
    if let Some(ids) = map.get_mut(address) {
        ids.remove(id);
        if ids.is_empty() {
            map.remove(address);
        }
    }
}

fn collect(map: &HashMap<Address, BTreeSet<AgreementId>>, address: &Address) -> Vec<AgreementId> {
    map.get(address)
        .map(|ids| ids.iter().copied().collect())
        .unwrap_or_default()
}
