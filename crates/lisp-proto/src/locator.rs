//! Routing locators and their preference ordering.

use std::{cmp::Ordering, net::IpAddr};

use serde::{Deserialize, Serialize};

/// A routing locator (RLOC): the routable address of a physical attachment point.
///
/// A mapping entry binds an EID to one or more locators, ranked by priority with
/// weight as the load-share ratio among equal priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rloc {
    /// The routable address of the attachment point.
    pub address: IpAddr,
    /// Unicast priority; lower values are preferred.
    pub priority: u8,
    /// Load-share ratio among locators of equal priority.
    pub weight: u8,
    /// Multicast priority; lower values are preferred.
    pub multicast_priority: u8,
    /// Load-share ratio among multicast locators of equal priority.
    pub multicast_weight: u8,
    /// The locator is local to the sender of the record it appears in.
    pub local: bool,
    /// The locator is the one an RLOC-probe was sent to.
    pub probed: bool,
    /// The locator is reachable from the sender's perspective.
    pub reachable: bool,
}

impl Rloc {
    /// Priority value marking a locator as unusable for unicast forwarding.
    pub const UNUSABLE_PRIORITY: u8 = 255;

    /// Creates a reachable unicast locator with the given preference.
    pub fn new(address: IpAddr, priority: u8, weight: u8) -> Self {
        Self {
            address,
            priority,
            weight,
            multicast_priority: Self::UNUSABLE_PRIORITY,
            multicast_weight: 0,
            local: false,
            probed: false,
            reachable: true,
        }
    }

    /// True if this locator may carry unicast traffic at all.
    pub fn is_usable(&self) -> bool {
        self.priority != Self::UNUSABLE_PRIORITY
    }

    /// Compares two locators by forwarding preference.
    ///
    /// Lower priority wins; among equal priorities the larger weight wins.
    pub fn cmp_preference(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(other.weight.cmp(&self.weight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_utils::parse;

    fn rloc(priority: u8, weight: u8) -> Rloc {
        Rloc::new(parse!("192.0.2.1"), priority, weight)
    }

    #[test]
    fn lower_priority_preferred() {
        assert_eq!(rloc(1, 0).cmp_preference(&rloc(2, 255)), Ordering::Less);
    }

    #[test]
    fn weight_breaks_ties() {
        assert_eq!(rloc(1, 80).cmp_preference(&rloc(1, 20)), Ordering::Less);
        assert_eq!(rloc(1, 50).cmp_preference(&rloc(1, 50)), Ordering::Equal);
    }

    #[test]
    fn unusable_priority() {
        assert!(!rloc(Rloc::UNUSABLE_PRIORITY, 0).is_usable());
        assert!(rloc(254, 0).is_usable());
    }
}
