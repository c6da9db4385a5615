//! EID-to-RLOC mapping entries.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::{address::EidPrefix, locator::Rloc};

/// Where a mapping entry lives relative to the local device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MappingOrigin {
    /// The EID is served locally; the entry is authoritative.
    Database,
    /// The entry was learned from the mapping system and may go stale.
    Cache,
}

/// A binding from one EID prefix to an ordered set of locators.
///
/// Entries are created when a device registers or first learns about an EID and
/// mutated when a mobility event attaches a new locator. There is no hard delete;
/// superseded entries age out through their TTL, which the owning store enforces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// The EID prefix this entry binds.
    pub eid_prefix: EidPrefix,
    /// Locators ranked by preference (see [`Rloc::cmp_preference`]).
    pub locators: Vec<Rloc>,
    /// Whether this entry is served locally or cached.
    pub origin: MappingOrigin,
    /// Time-to-live in minutes.
    pub ttl: u32,
}

impl MappingEntry {
    /// Default record time-to-live: one day, in minutes.
    pub const DEFAULT_TTL: u32 = 1440;

    /// Creates an entry with no locators bound (a negative mapping).
    pub fn new(eid_prefix: EidPrefix, origin: MappingOrigin) -> Self {
        Self {
            eid_prefix,
            locators: Vec::new(),
            origin,
            ttl: Self::DEFAULT_TTL,
        }
    }

    /// True if no locator is currently bound.
    pub fn is_negative(&self) -> bool {
        self.locators.is_empty()
    }

    /// Adds a locator, superseding any previous locator with the same address.
    ///
    /// The locator list is kept in preference order.
    pub fn add_locator(&mut self, locator: Rloc) {
        match self
            .locators
            .iter_mut()
            .find(|existing| existing.address == locator.address)
        {
            Some(existing) => {
                tracing::trace!(address = %locator.address, "superseding existing locator");
                *existing = locator;
            }
            None => self.locators.push(locator),
        }
        self.locators.sort_by(Rloc::cmp_preference);
    }

    /// Marks the locator with the given address reachable or unreachable.
    ///
    /// Returns false if no locator has that address.
    pub fn set_reachable(&mut self, address: IpAddr, reachable: bool) -> bool {
        match self
            .locators
            .iter_mut()
            .find(|locator| locator.address == address)
        {
            Some(locator) => {
                locator.reachable = reachable;
                true
            }
            None => false,
        }
    }

    /// The most preferred locator that is both usable and reachable.
    pub fn best_locator(&self) -> Option<&Rloc> {
        // locators are kept sorted by preference
        self.locators
            .iter()
            .find(|locator| locator.reachable && locator.is_usable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix(text: &str, length: u8) -> EidPrefix {
        EidPrefix::containing(text.parse().unwrap(), length).unwrap()
    }

    fn entry_with(locators: &[(&str, u8, u8)]) -> MappingEntry {
        let mut entry = MappingEntry::new(prefix("10.0.0.0", 24), MappingOrigin::Database);
        for (address, priority, weight) in locators {
            entry.add_locator(Rloc::new(address.parse().unwrap(), *priority, *weight));
        }
        entry
    }

    #[test]
    fn empty_entry_is_negative() {
        let entry = MappingEntry::new(prefix("10.0.0.0", 24), MappingOrigin::Cache);
        assert!(entry.is_negative());
        assert_eq!(entry.best_locator(), None);
    }

    #[test]
    fn best_locator_follows_preference() {
        let entry = entry_with(&[("192.0.2.1", 2, 50), ("192.0.2.2", 1, 50), ("192.0.2.3", 1, 80)]);
        assert_eq!(entry.best_locator().unwrap().address.to_string(), "192.0.2.3");
    }

    #[test]
    fn unreachable_locator_skipped() {
        let mut entry = entry_with(&[("192.0.2.1", 1, 50), ("192.0.2.2", 2, 50)]);
        assert!(entry.set_reachable("192.0.2.1".parse().unwrap(), false));

        assert_eq!(entry.best_locator().unwrap().address.to_string(), "192.0.2.2");
        assert!(!entry.set_reachable("192.0.2.9".parse().unwrap(), false));
    }

    #[test]
    fn add_locator_supersedes_same_address() {
        let mut entry = entry_with(&[("192.0.2.1", 1, 50)]);
        entry.add_locator(Rloc::new("192.0.2.1".parse().unwrap(), 3, 10));

        assert_eq!(entry.locators.len(), 1);
        assert_eq!(entry.locators[0].priority, 3);
    }
}
