//! Per-customer payment history kept in memory

use crate::error::FeatureResult;
use crate::types::payment::PaymentRecord;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Default number of records retained per customer
pub const DEFAULT_MAX_RECORDS: usize = 50;

/// Which record goes when a customer's history is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Oldest appended record is dropped first
    #[default]
    Insertion,
    /// Records are kept in date order and the earliest date is dropped first
    Chronological,
}

/// Store-wide counters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub companies_with_history: usize,
    pub total_records: usize,
    pub average_records_per_company: f64,
}

type Shard = Arc<Mutex<Vec<PaymentRecord>>>;

/// Bounded payment history per customer
///
/// Appends for one customer serialize on that customer's lock; different
/// customers only contend on a short read of the index
#[derive(Debug)]
pub struct CompanyHistoryStore {
    companies: RwLock<HashMap<String, Shard>>,
    max_records: usize,
    policy: EvictionPolicy,
}

impl CompanyHistoryStore {
    pub fn new(max_records: usize, policy: EvictionPolicy) -> Self {
        Self {
            companies: RwLock::new(HashMap::new()),
            max_records: max_records.max(1),
            policy,
        }
    }

    /// Append one record, evicting per policy once over capacity
    pub fn append(&self, key: &str, record: PaymentRecord) -> FeatureResult<()> {
        let record = record.normalized();
        record.validate()?;

        let shard = self.shard(key);
        let mut records = shard.lock();
        self.insert(&mut records, record);
        let evicted = self.evict(&mut records);

        debug!(
            customer_id = %key,
            records = records.len(),
            evicted = evicted,
            "Payment record appended"
        );
        Ok(())
    }

    /// Append several records. Nothing is stored if any record is invalid
    pub fn extend(&self, key: &str, records: Vec<PaymentRecord>) -> FeatureResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let records: Vec<PaymentRecord> = records.into_iter().map(PaymentRecord::normalized).collect();
        for record in &records {
            record.validate()?;
        }

        let shard = self.shard(key);
        let mut stored = shard.lock();
        let added = records.len();
        for record in records {
            self.insert(&mut stored, record);
        }
        let evicted = self.evict(&mut stored);

        debug!(
            customer_id = %key,
            added = added,
            records = stored.len(),
            evicted = evicted,
            "Payment records appended"
        );
        Ok(())
    }

    /// Append ledger records not already held for this customer
    ///
    /// A record matches an existing one on date, amount and days to payment,
    /// so the same ledger can be supplied repeatedly. Returns how many
    /// records were added. Nothing is stored if any record is invalid
    pub fn merge(&self, key: &str, records: Vec<PaymentRecord>) -> FeatureResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let records: Vec<PaymentRecord> =
            records.into_iter().map(PaymentRecord::normalized).collect();
        for record in &records {
            record.validate()?;
        }

        let shard = self.shard(key);
        let mut stored = shard.lock();
        let mut added = 0;
        for record in records {
            if stored.iter().any(|existing| same_payment(existing, &record)) {
                continue;
            }
            self.insert(&mut stored, record);
            added += 1;
        }
        let evicted = self.evict(&mut stored);

        debug!(
            customer_id = %key,
            added = added,
            records = stored.len(),
            evicted = evicted,
            "Ledger records merged"
        );
        Ok(added)
    }

    /// Snapshot of a customer's records. Unknown customers have none
    pub fn get(&self, key: &str) -> Vec<PaymentRecord> {
        let companies = self.companies.read();
        match companies.get(key) {
            Some(shard) => shard.lock().clone(),
            None => Vec::new(),
        }
    }

    pub fn len(&self, key: &str) -> usize {
        let companies = self.companies.read();
        companies.get(key).map_or(0, |shard| shard.lock().len())
    }

    /// Forget one customer, or everyone when `key` is `None`
    ///
    /// Records are cleared under each customer's own lock. A shard some
    /// append still holds stays indexed, so that append remains visible
    pub fn clear(&self, key: Option<&str>) {
        let mut companies = self.companies.write();
        match key {
            Some(key) => {
                let unused = match companies.get(key) {
                    Some(shard) => {
                        shard.lock().clear();
                        Arc::strong_count(shard) == 1
                    }
                    None => false,
                };
                if unused {
                    companies.remove(key);
                }
                debug!(customer_id = %key, "Payment history cleared");
            }
            None => {
                let cleared = companies.len();
                companies.retain(|_, shard| {
                    shard.lock().clear();
                    Arc::strong_count(shard) > 1
                });
                debug!(companies = cleared, "All payment history cleared");
            }
        }
    }

    pub fn stats(&self) -> HistoryStats {
        let companies = self.companies.read();
        let lengths: Vec<usize> = companies.values().map(|shard| shard.lock().len()).collect();
        let companies_with_history = lengths.iter().filter(|&&len| len > 0).count();
        let total_records: usize = lengths.iter().sum();

        HistoryStats {
            companies_with_history,
            total_records,
            average_records_per_company: if companies_with_history == 0 {
                0.0
            } else {
                total_records as f64 / companies_with_history as f64
            },
        }
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    fn shard(&self, key: &str) -> Shard {
        if let Some(shard) = self.companies.read().get(key) {
            return Arc::clone(shard);
        }
        let mut companies = self.companies.write();
        Arc::clone(companies.entry(key.to_string()).or_default())
    }

    fn insert(&self, records: &mut Vec<PaymentRecord>, record: PaymentRecord) {
        match self.policy {
            EvictionPolicy::Insertion => records.push(record),
            EvictionPolicy::Chronological => {
                let at = records.partition_point(|r| r.date <= record.date);
                records.insert(at, record);
            }
        }
    }

    fn evict(&self, records: &mut Vec<PaymentRecord>) -> usize {
        let excess = records.len().saturating_sub(self.max_records);
        if excess > 0 {
            records.drain(..excess);
        }
        excess
    }
}

fn same_payment(a: &PaymentRecord, b: &PaymentRecord) -> bool {
    a.date == b.date && a.amount == b.amount && a.days_to_payment == b.days_to_payment
}

impl Default for CompanyHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORDS, EvictionPolicy::default())
    }
}
