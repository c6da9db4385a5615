//! Convergence tracking for mobility experiments.
//!
//! After a mobility event, the interesting question is not "has some timer
//! expired" but "has every party that caches the moved EID's mapping seen the
//! update". The [`ConvergenceTracker`] answers that by watching the stream of
//! delivered mapping updates and reporting when all interested observers have
//! converged, letting an experiment end deterministically.

use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display, Formatter},
    time::Duration,
};

use lisp_proto::address::EidPrefix;
use serde::{Deserialize, Serialize};

/// Identity of a node observing mapping updates.
///
/// Any value that disambiguates distinct observer roles works; drivers
/// typically use the simulation-wide node index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ObserverId(pub u32);

impl Display for ObserverId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Tracks which observers have seen the post-mobility mapping for each EID prefix.
///
/// The tracker is a two-state machine. It starts out *collecting*: keys may be
/// registered but observations are ignored, since updates circulating before the
/// mobility instant describe the old mapping. A single call to
/// [`begin_tracking`][Self::begin_tracking] moves it to *tracking*, after which
/// qualifying observations accumulate until every registered key has been seen
/// by the expected number of observers.
///
/// All state lives here, owned exclusively; callers interact only through the
/// methods below. Observations must arrive in non-decreasing simulated time,
/// which the event scheduler guarantees.
#[derive(Debug)]
pub struct ConvergenceTracker {
    expected_observers: usize,
    mobility_instant: Option<Duration>,
    observed: HashMap<EidPrefix, HashSet<ObserverId>>,
    converged_at: Option<Duration>,
}

impl ConvergenceTracker {
    /// Guard band added to the mobility instant before observations qualify.
    ///
    /// Notifications already in flight when the mobility event fires describe
    /// the old mapping; anything delivered within this margin is treated as
    /// such and ignored.
    pub const SETTLING_MARGIN: Duration = Duration::from_millis(10);

    /// Creates a tracker expecting each key to be seen by `expected_observers`
    /// distinct observers.
    pub fn new(expected_observers: usize) -> Self {
        Self {
            expected_observers,
            mobility_instant: None,
            observed: HashMap::new(),
            converged_at: None,
        }
    }

    /// The number of distinct observers each key requires.
    pub fn expected_observers(&self) -> usize {
        self.expected_observers
    }

    /// Registers an EID prefix to track, with an empty observer set.
    ///
    /// Typically called once per interested EID while the topology is built.
    /// Registering the same key again is a no-op.
    pub fn register_key(&mut self, key: EidPrefix) {
        self.observed.entry(key).or_default();
    }

    /// Switches from collecting to tracking, anchored at the mobility instant.
    ///
    /// The transition happens exactly once; the first instant wins and later
    /// calls are ignored.
    pub fn begin_tracking(&mut self, instant: Duration) {
        if self.mobility_instant.is_none() {
            tracing::debug!(?instant, "convergence tracking started");
            self.mobility_instant = Some(instant);
        }
    }

    /// True once [`begin_tracking`][Self::begin_tracking] has been called.
    pub fn is_tracking(&self) -> bool {
        self.mobility_instant.is_some()
    }

    /// Records that `observer` saw an update for `key` at simulated time `at`.
    ///
    /// Returns true if the observation qualified and changed state. It does not
    /// qualify while still collecting, within the settling margin of the
    /// mobility instant, for a key that was never registered (updates for a
    /// withdrawn mapping have no tracked key and are not an error), or when the
    /// `(key, observer)` pair was already seen; retransmissions never inflate
    /// the count.
    pub fn observe_update(&mut self, key: EidPrefix, observer: ObserverId, at: Duration) -> bool {
        let Some(instant) = self.mobility_instant else {
            return false;
        };
        if at < instant + Self::SETTLING_MARGIN {
            return false;
        }

        let Some(observers) = self.observed.get_mut(&key) else {
            tracing::trace!(%key, %observer, "update for untracked key ignored");
            return false;
        };
        if !observers.insert(observer) {
            return false;
        }
        tracing::debug!(
            %key,
            %observer,
            seen = observers.len(),
            expected = self.expected_observers,
            "mapping update observed"
        );

        if self.converged_at.is_none() && self.all_keys_complete() {
            tracing::debug!(at = ?at, "all observers converged on the new mapping");
            self.converged_at = Some(at);
        }
        true
    }

    /// True iff every registered key has been seen by the expected number of
    /// distinct observers.
    ///
    /// Observer sets only grow, so once this returns true it stays true.
    pub fn is_converged(&self) -> bool {
        self.all_keys_complete()
    }

    /// The timestamp of the observation that completed convergence, if any.
    pub fn converged_at(&self) -> Option<Duration> {
        self.converged_at
    }

    /// Total qualifying `(key, observer)` pairs seen so far.
    pub fn observation_count(&self) -> usize {
        self.observed.values().map(HashSet::len).sum()
    }

    /// Total `(key, observer)` pairs required for convergence.
    pub fn required_count(&self) -> usize {
        self.observed.len() * self.expected_observers
    }

    fn all_keys_complete(&self) -> bool {
        !self.observed.is_empty()
            && self
                .observed
                .values()
                .all(|observers| observers.len() >= self.expected_observers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_utils::param_test;

    fn key(text: &str) -> EidPrefix {
        EidPrefix::containing(text.parse().unwrap(), 24).unwrap()
    }

    fn secs(value: u64, millis: u64) -> Duration {
        Duration::from_secs(value) + Duration::from_millis(millis)
    }

    #[test]
    fn converges_after_last_missing_observer() {
        let mut tracker = ConvergenceTracker::new(2);
        tracker.register_key(key("10.0.0.0"));

        // pre-instant observation has no effect
        assert!(!tracker.observe_update(key("10.0.0.0"), ObserverId(7), secs(30, 0)));

        tracker.begin_tracking(secs(35, 0));
        assert!(tracker.observe_update(key("10.0.0.0"), ObserverId(3), secs(35, 20)));
        assert!(!tracker.is_converged());

        assert!(tracker.observe_update(key("10.0.0.0"), ObserverId(5), secs(35, 500)));
        assert!(tracker.is_converged());
        assert_eq!(tracker.converged_at(), Some(secs(35, 500)));
    }

    #[test]
    fn duplicates_do_not_inflate_counts() {
        let mut tracker = ConvergenceTracker::new(2);
        tracker.register_key(key("10.0.0.0"));
        tracker.begin_tracking(Duration::ZERO);

        assert!(tracker.observe_update(key("10.0.0.0"), ObserverId(3), secs(1, 0)));
        assert!(!tracker.observe_update(key("10.0.0.0"), ObserverId(3), secs(2, 0)));

        assert_eq!(tracker.observation_count(), 1);
        assert!(!tracker.is_converged());
    }

    param_test! {
        settling_margin_suppresses_racing_updates: [
            at_the_instant: (0, false),
            within_the_margin: (9, false),
            at_the_margin: (10, true),
            past_the_margin: (500, true),
        ]
    }
    fn settling_margin_suppresses_racing_updates(delivery_millis: u64, qualifies: bool) {
        let mut tracker = ConvergenceTracker::new(1);
        tracker.register_key(key("10.0.0.0"));
        tracker.begin_tracking(secs(35, 0));

        // deliveries inside the margin still describe the old mapping
        assert_eq!(
            tracker.observe_update(key("10.0.0.0"), ObserverId(1), secs(35, delivery_millis)),
            qualifies
        );
        assert_eq!(tracker.is_converged(), qualifies);
    }

    #[test]
    fn unknown_key_ignored() {
        let mut tracker = ConvergenceTracker::new(1);
        tracker.register_key(key("10.0.0.0"));
        tracker.begin_tracking(Duration::ZERO);

        assert!(!tracker.observe_update(key("10.9.9.0"), ObserverId(1), secs(1, 0)));
        assert!(!tracker.is_converged());
    }

    #[test]
    fn all_keys_must_complete() {
        let mut tracker = ConvergenceTracker::new(1);
        tracker.register_key(key("10.0.0.0"));
        tracker.register_key(key("10.0.1.0"));
        tracker.begin_tracking(Duration::ZERO);

        assert!(tracker.observe_update(key("10.0.0.0"), ObserverId(1), secs(1, 0)));
        assert!(!tracker.is_converged());

        assert!(tracker.observe_update(key("10.0.1.0"), ObserverId(2), secs(2, 0)));
        assert!(tracker.is_converged());
        assert_eq!(tracker.required_count(), 2);
        assert_eq!(tracker.observation_count(), 2);
    }

    #[test]
    fn stays_converged() {
        let mut tracker = ConvergenceTracker::new(1);
        tracker.register_key(key("10.0.0.0"));
        tracker.begin_tracking(Duration::ZERO);

        assert!(tracker.observe_update(key("10.0.0.0"), ObserverId(1), secs(1, 0)));
        assert!(tracker.is_converged());

        // a further observer beyond the expected count does not regress the signal
        assert!(tracker.observe_update(key("10.0.0.0"), ObserverId(2), secs(2, 0)));
        assert!(tracker.is_converged());
        assert_eq!(tracker.converged_at(), Some(secs(1, 0)));
    }

    #[test]
    fn first_instant_wins() {
        let mut tracker = ConvergenceTracker::new(1);
        tracker.register_key(key("10.0.0.0"));

        tracker.begin_tracking(secs(35, 0));
        tracker.begin_tracking(secs(50, 0));

        assert!(tracker.observe_update(key("10.0.0.0"), ObserverId(1), secs(36, 0)));
    }

    #[test]
    fn no_keys_means_no_convergence() {
        let tracker = ConvergenceTracker::new(1);
        assert!(!tracker.is_converged());
    }
}
