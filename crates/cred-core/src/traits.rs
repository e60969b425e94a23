//! Trait interfaces between the cred pipeline and its collaborators.
//!
//! - [`Ledger`]: identity accounts and the append-only payment record
//!   (cred-grain ships an in-memory implementation)

use serde::{Deserialize, Serialize};

use crate::address::NodeAddress;
use crate::allocation::{Allocation, Distribution};
use crate::error::LedgerError;
use crate::grain::Grain;
use crate::types::{AllocationIdentity, IdentityId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerIdentity {
    pub id: IdentityId,
    pub name: String,
    pub address: NodeAddress,
}

/// A ledger account: an identity plus its payment and cred history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub identity: LedgerIdentity,
    /// Total grain received so far.
    pub paid: Grain,
    /// Cred per interval, oldest first, ending at the most recent interval.
    pub cred_history: Vec<f64>,
    /// Inactive accounts keep their history but receive no grain.
    pub active: bool,
}

/// Caller-owned record of identities and the grain paid to them.
///
/// The allocation engine only reads identities; recording results goes
/// through [`distribute_grain`](Self::distribute_grain) or
/// [`distribute`](Self::distribute), each a single atomic append.
pub trait Ledger: Send + Sync {
    /// All accounts, in ledger order.
    fn accounts(&self) -> Vec<Account>;

    /// Record one allocation. Either every receipt is applied or none is.
    fn distribute_grain(&mut self, allocation: &Allocation) -> Result<(), LedgerError>;

    /// Record every allocation of a distribution as one append.
    fn distribute(&mut self, distribution: &Distribution) -> Result<(), LedgerError>;

    /// Active accounts as allocation identities, in ledger order.
    ///
    /// Histories shorter than the longest one are left-padded with zeros:
    /// an identity created after the first interval earned nothing before it
    /// existed.
    fn identities(&self) -> Vec<AllocationIdentity> {
        let active: Vec<Account> = self.accounts().into_iter().filter(|a| a.active).collect();
        let len = active.iter().map(|a| a.cred_history.len()).max().unwrap_or(0);
        active
            .into_iter()
            .map(|a| {
                let mut cred = vec![0.0; len - a.cred_history.len()];
                cred.extend_from_slice(&a.cred_history);
                AllocationIdentity::new(a.identity.id, a.paid, cred)
            })
            .collect()
    }
}
