//! In-memory [`Ledger`] implementation.
//!
//! Suitable for tests and single-process tooling. Every append is checked
//! in full before any balance changes, so a rejected allocation or
//! distribution leaves the ledger untouched.

use std::collections::{HashMap, HashSet};

use cred_core::address::NodeAddress;
use cred_core::allocation::{Allocation, AllocationId, Distribution};
use cred_core::error::LedgerError;
use cred_core::grain::Grain;
use cred_core::traits::{Account, Ledger, LedgerIdentity};
use cred_core::types::IdentityId;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    /// Accounts in creation order.
    accounts: Vec<Account>,
    /// Identity → position in `accounts`.
    by_id: HashMap<IdentityId, usize>,
    names: HashSet<String>,
    /// Every applied allocation, in append order.
    allocations: Vec<Allocation>,
    distributions: Vec<Distribution>,
    /// Allocation and distribution ids already recorded.
    seen_ids: HashSet<AllocationId>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an account. The identity id is derived from `name`.
    pub fn create_identity(
        &mut self,
        name: &str,
        address: NodeAddress,
    ) -> Result<IdentityId, LedgerError> {
        if !self.names.insert(name.to_string()) {
            return Err(LedgerError::DuplicateName(name.to_string()));
        }
        let id = IdentityId::from_name(name);
        self.by_id.insert(id, self.accounts.len());
        self.accounts.push(Account {
            identity: LedgerIdentity { id, name: name.to_string(), address },
            paid: Grain::ZERO,
            cred_history: Vec::new(),
            active: true,
        });
        debug!(%id, name, "ledger: created identity");
        Ok(id)
    }

    pub fn set_cred_history(&mut self, id: IdentityId, history: Vec<f64>) -> Result<(), LedgerError> {
        self.account_mut(id)?.cred_history = history;
        Ok(())
    }

    /// Replace the cred histories of several accounts at once. All
    /// histories must cover the same number of intervals.
    pub fn update_cred<'a, I>(&mut self, histories: I) -> Result<(), LedgerError>
    where
        I: IntoIterator<Item = (IdentityId, &'a [f64])>,
    {
        let histories: Vec<(IdentityId, &[f64])> = histories.into_iter().collect();
        let expected = histories.first().map_or(0, |(_, h)| h.len());
        for &(id, history) in &histories {
            if !self.by_id.contains_key(&id) {
                return Err(LedgerError::UnknownIdentity(id));
            }
            if history.len() != expected {
                return Err(LedgerError::CredLengthMismatch { id, expected, got: history.len() });
            }
        }
        for (id, history) in histories {
            self.account_mut(id)?.cred_history = history.to_vec();
        }
        Ok(())
    }

    /// Stop paying an identity. Its history and balance are kept.
    pub fn deactivate(&mut self, id: IdentityId) -> Result<(), LedgerError> {
        self.account_mut(id)?.active = false;
        Ok(())
    }

    pub fn account(&self, id: &IdentityId) -> Option<&Account> {
        self.by_id.get(id).map(|&i| &self.accounts[i])
    }

    /// Recorded distributions, oldest first.
    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    /// Every applied allocation, including those recorded through
    /// distributions, oldest first.
    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    fn account_mut(&mut self, id: IdentityId) -> Result<&mut Account, LedgerError> {
        let index = *self.by_id.get(&id).ok_or(LedgerError::UnknownIdentity(id))?;
        Ok(&mut self.accounts[index])
    }

    /// Check a batch of allocations and compute the resulting balances
    /// without touching the ledger.
    fn stage(&self, allocations: &[&Allocation]) -> Result<HashMap<usize, Grain>, LedgerError> {
        let mut batch_ids = HashSet::new();
        let mut balances: HashMap<usize, Grain> = HashMap::new();
        for allocation in allocations {
            if self.seen_ids.contains(&allocation.id) || !batch_ids.insert(allocation.id) {
                return Err(LedgerError::DuplicateAllocation(allocation.id.to_string()));
            }
            for receipt in &allocation.receipts {
                let index = *self
                    .by_id
                    .get(&receipt.id)
                    .ok_or(LedgerError::UnknownIdentity(receipt.id))?;
                let account = &self.accounts[index];
                if !account.active {
                    return Err(LedgerError::InactiveIdentity(receipt.id));
                }
                let balance = balances.entry(index).or_insert(account.paid);
                *balance = balance
                    .checked_add(receipt.amount)
                    .ok_or(LedgerError::BalanceOverflow(receipt.id))?;
            }
        }
        Ok(balances)
    }

    fn commit(&mut self, balances: HashMap<usize, Grain>, allocations: &[&Allocation]) {
        for (index, paid) in balances {
            self.accounts[index].paid = paid;
        }
        for allocation in allocations {
            self.seen_ids.insert(allocation.id);
            self.allocations.push((*allocation).clone());
        }
    }
}

impl Ledger for MemoryLedger {
    fn accounts(&self) -> Vec<Account> {
        self.accounts.clone()
    }

    fn distribute_grain(&mut self, allocation: &Allocation) -> Result<(), LedgerError> {
        let batch = [allocation];
        let balances = self.stage(&batch)?;
        self.commit(balances, &batch);
        debug!(
            allocation = %allocation.id,
            policy = %allocation.policy.kind(),
            receipts = allocation.receipts.len(),
            "ledger: recorded allocation"
        );
        Ok(())
    }

    fn distribute(&mut self, distribution: &Distribution) -> Result<(), LedgerError> {
        if self.seen_ids.contains(&distribution.id) {
            return Err(LedgerError::DuplicateAllocation(distribution.id.to_string()));
        }
        let batch: Vec<&Allocation> = distribution.allocations.iter().collect();
        if batch.iter().any(|a| a.id == distribution.id) {
            return Err(LedgerError::DuplicateAllocation(distribution.id.to_string()));
        }
        let balances = self.stage(&batch)?;
        self.commit(balances, &batch);
        self.seen_ids.insert(distribution.id);
        self.distributions.push(distribution.clone());
        info!(
            distribution = %distribution.id,
            allocations = batch.len(),
            "ledger: recorded distribution"
        );
        Ok(())
    }
}
