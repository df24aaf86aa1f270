//! Owner weighted splitting of item values.
//!
//! An item's value is divided evenly between its owners. Reports sum these
//! shares over the items owned by any of the requested people, counting each
//! item once even when several of its owners were requested.

use crate::{
    database_id::PersonId,
    receipt::{Item, Receipt},
};

impl Item {
    /// The part of the item's value paid by each owner.
    ///
    /// Items without owners have no share.
    pub fn share(&self) -> f64 {
        if self.owners.is_empty() {
            0.0
        } else {
            self.value / self.owners.len() as f64
        }
    }

    /// Whether any of `persons` is an owner of the item.
    pub fn is_owned_by_any(&self, persons: &[PersonId]) -> bool {
        self.owners.iter().any(|owner| persons.contains(owner))
    }
}

/// Iterate over the items of `receipts` that are owned by any of `owners`,
/// paired with the receipt they belong to.
pub fn owned_items<'a>(
    receipts: &'a [Receipt],
    owners: &'a [PersonId],
) -> impl Iterator<Item = (&'a Receipt, &'a Item)> + 'a {
    receipts.iter().flat_map(move |receipt| {
        receipt
            .items
            .iter()
            .filter(move |item| item.is_owned_by_any(owners))
            .map(move |item| (receipt, item))
    })
}

/// Sum the shares of the items of `receipts` owned by any of `owners`.
pub fn sum_owner_shares(receipts: &[Receipt], owners: &[PersonId]) -> f64 {
    owned_items(receipts, owners)
        .map(|(_, item)| item.share())
        .sum()
}
