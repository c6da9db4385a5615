//! The mobility event orchestrator.
//!
//! Drives the "detach old locator, attach new locator, push the updated
//! mapping, solicit re-fetches" sequence for a single simulated mobility event
//! and feeds the resulting notification deliveries into the
//! [`ConvergenceTracker`].
//!
//! The orchestrator is a polled state machine: it performs no I/O and holds no
//! clock. The driving experiment repeatedly calls
//! [`poll_requests`][MobilityOrchestrator::poll_requests] and executes the
//! returned [`Request`]s against its topology and transport, and reports
//! delivered notifications back through
//! [`handle_notify_received`][MobilityOrchestrator::handle_notify_received],
//! after which it must poll again. [`Request::Stop`] is emitted exactly once,
//! on the first poll after convergence.

use std::{collections::VecDeque, time::Duration};

use bytes::{Buf, Bytes};
use lisp_proto::{
    address::{Eid, EidPrefix},
    control::{MapNotify, MessageType},
    locator::Rloc,
    mapping::{MappingEntry, MappingOrigin},
    mapsock::MappingUpdateHeader,
    record::MappingRecord,
    wire_encoding::WireDecode,
};
use serde::{Deserialize, Serialize};

use crate::convergence::{ConvergenceTracker, ObserverId};

/// Which control-plane mechanism propagates the post-mobility mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MobilityHandlerKind {
    /// Re-register with the map-server only; cached mappings age out on their
    /// own TTLs.
    MapRegister,
    /// Additionally solicit a map-request (SMR) from every device whose cached
    /// mapping may be stale.
    SolicitMapRequest,
}

/// Configuration of a mobility experiment variant.
///
/// The recognised variants differ only in these options; a single orchestrator
/// consumes them rather than a subclass per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobilityConfig {
    /// The simulated time at which the device moves.
    pub mobility_at: Duration,
    /// How the updated mapping is propagated.
    pub handler: MobilityHandlerKind,
    /// SMRs are relayed through the map-server on the device's behalf instead
    /// of being sent to each stale cache directly.
    pub proxy_mode: bool,
    /// Observers hold subscriptions and receive the updated mapping directly.
    pub subscribe: bool,
}

/// A request the orchestrator makes of its driver.
///
/// [`poll_requests`][MobilityOrchestrator::poll_requests] returns one request
/// per call; [`Request::Callback`] and [`Request::Idle`] end the stream of
/// work for the current poll round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Call [`poll_requests`][MobilityOrchestrator::poll_requests] again at
    /// the given simulated time.
    Callback(Duration),
    /// Disable the locator and withdraw routes toward it.
    DetachLocator(Rloc),
    /// Enable the locator as the device's default attachment.
    AttachLocator(Rloc),
    /// Install the superseding mapping entry. Previous entries are not
    /// deleted; they age out via their TTLs.
    InstallMapping(MappingEntry),
    /// Transmit the serialized message to the observer.
    SendMapNotify {
        /// The delivery target.
        observer: ObserverId,
        /// The message to serialize and send.
        message: MapNotify,
    },
    /// Ask the observer to re-fetch its cached mapping for the EID.
    SolicitMapRequest {
        /// The stale cache holder (or the map-server, in proxy mode).
        observer: ObserverId,
        /// The prefix whose cached mapping went stale.
        eid: EidPrefix,
    },
    /// Convergence was reached; stop the simulation clock.
    Stop,
    /// Nothing to do until an external event arrives.
    Idle,
}

/// Result of a mobility run, queried at the experiment end time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentOutcome {
    /// Every interested observer saw the new mapping.
    Converged {
        /// The simulated time of the completing observation.
        at: Duration,
    },
    /// The run ended before every observer saw the new mapping.
    Incomplete {
        /// Qualifying `(key, observer)` pairs seen.
        seen: usize,
        /// Pairs required for convergence.
        expected: usize,
    },
}

/// The strictly sequential phases of a mobility event.
///
/// There is no rollback path: a teardown mid-sequence leaves whatever state
/// was applied, and that partial state is an accepted terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Original locator active, waiting for the mobility instant.
    Stable,
    /// The old locator has been handed to the driver for detachment.
    Detaching,
    /// The new locator has been handed to the driver for attachment.
    Attaching,
    /// Emitting registration and notification requests.
    Registering,
    /// Post-move steady state.
    Settled,
}

enum Target {
    Notify(ObserverId),
    Solicit(ObserverId),
}

/// Orchestrates one mobility event for one EID.
pub struct MobilityOrchestrator {
    config: MobilityConfig,
    eid: Eid,
    old_locator: Rloc,
    new_locator: Rloc,
    map_server: ObserverId,
    observers: Vec<ObserverId>,
    tracker: ConvergenceTracker,
    phase: Phase,
    installed: Option<MappingEntry>,
    pending: VecDeque<Target>,
    stop_emitted: bool,
}

impl MobilityOrchestrator {
    /// Creates an orchestrator moving `eid` from `old_locator` to
    /// `new_locator` at the configured mobility time.
    ///
    /// Convergence requires the update to be seen by the map-server and every
    /// observer in `observers`; the EID's tracking key is registered with the
    /// tracker up front.
    pub fn new(
        config: MobilityConfig,
        eid: Eid,
        old_locator: Rloc,
        new_locator: Rloc,
        map_server: ObserverId,
        observers: Vec<ObserverId>,
    ) -> Self {
        let mut tracker = ConvergenceTracker::new(observers.len() + 1);
        tracker.register_key(eid.tracking_key());

        Self {
            config,
            eid,
            old_locator,
            new_locator,
            map_server,
            observers,
            tracker,
            phase: Phase::Stable,
            installed: None,
            pending: VecDeque::new(),
            stop_emitted: false,
        }
    }

    /// The tracker accumulating convergence state.
    pub fn tracker(&self) -> &ConvergenceTracker {
        &self.tracker
    }

    /// Mutable tracker access, e.g. to register further keys before the
    /// mobility instant.
    pub fn tracker_mut(&mut self) -> &mut ConvergenceTracker {
        &mut self.tracker
    }

    /// Polls the orchestrator for the next [`Request`].
    ///
    /// Must be called after creation, after every executed request, and after
    /// every call to
    /// [`handle_notify_received`][Self::handle_notify_received].
    pub fn poll_requests(&mut self, now: Duration) -> Request {
        if !self.stop_emitted && self.tracker.is_converged() {
            self.stop_emitted = true;
            tracing::debug!(at = ?now, "convergence reached, stopping the run");
            return Request::Stop;
        }

        match self.phase {
            Phase::Stable if now < self.config.mobility_at => {
                Request::Callback(self.config.mobility_at)
            }
            Phase::Stable => {
                tracing::debug!(eid = %self.eid, "mobility event fired");
                self.tracker.begin_tracking(self.config.mobility_at);
                self.phase = Phase::Detaching;
                Request::DetachLocator(self.old_locator)
            }
            Phase::Detaching => {
                self.phase = Phase::Attaching;
                Request::AttachLocator(self.new_locator)
            }
            Phase::Attaching => {
                let entry = self.build_entry();
                self.installed = Some(entry.clone());
                self.pending = self.registration_targets();
                self.phase = Phase::Registering;
                Request::InstallMapping(entry)
            }
            Phase::Registering => match self.pending.pop_front() {
                Some(Target::Notify(observer)) => Request::SendMapNotify {
                    observer,
                    message: self.make_notify(),
                },
                Some(Target::Solicit(observer)) => Request::SolicitMapRequest {
                    observer,
                    eid: self.eid.tracking_key(),
                },
                None => {
                    tracing::debug!(eid = %self.eid, "re-registration complete");
                    self.phase = Phase::Settled;
                    Request::Idle
                }
            },
            Phase::Settled => Request::Idle,
        }
    }

    /// Transport boundary: a serialized notification was delivered to
    /// `observer` at simulated time `now`.
    ///
    /// Map-notify frames feed the convergence tracker, one observation per
    /// embedded record. Mapping-update announcements carry no tracked key (the
    /// negative one emitted during detach in particular) and are only logged.
    /// Malformed frames are discarded; decoding problems are local to the one
    /// message and never abort the run.
    pub fn handle_notify_received(&mut self, observer: ObserverId, mut frame: Bytes, now: Duration) {
        if frame.is_empty() {
            tracing::debug!(%observer, "discarding empty notification frame");
            return;
        }

        if MessageType::from_nibble(frame.chunk()[0] >> 4) == Some(MessageType::MapNotify) {
            match MapNotify::decode(&mut frame) {
                Ok(message) => {
                    for record in &message.records {
                        let key = Eid::new(record.eid_prefix.address()).tracking_key();
                        self.tracker.observe_update(key, observer, now);
                    }
                }
                Err(err) => tracing::debug!(%observer, ?err, "discarding malformed map-notify"),
            }
            return;
        }

        match MappingUpdateHeader::decode(&mut frame) {
            Ok(header) if header.is_negative() => {
                tracing::trace!(%observer, "ignoring negative mapping-update announcement")
            }
            Ok(header) => tracing::trace!(
                %observer,
                locator_count = header.locator_count,
                "mapping-update announcement carries no tracked key"
            ),
            Err(err) => tracing::debug!(%observer, ?err, "discarding unrecognised frame"),
        }
    }

    /// The outcome of the run, for the driver to report at its end time.
    ///
    /// An experiment that ends without convergence is a reported outcome, not
    /// an error.
    pub fn outcome(&self) -> ExperimentOutcome {
        match self.tracker.converged_at() {
            Some(at) => ExperimentOutcome::Converged { at },
            None => {
                let outcome = ExperimentOutcome::Incomplete {
                    seen: self.tracker.observation_count(),
                    expected: self.tracker.required_count(),
                };
                tracing::warn!(?outcome, "run ended before convergence");
                outcome
            }
        }
    }

    /// The superseding mapping entry: the old locator kept but unreachable,
    /// the new locator preferred.
    fn build_entry(&self) -> MappingEntry {
        let mut entry = MappingEntry::new(self.eid.host_prefix(), MappingOrigin::Database);
        let mut retired = self.old_locator;
        retired.reachable = false;
        entry.add_locator(retired);
        entry.add_locator(self.new_locator);
        entry
    }

    fn make_notify(&self) -> MapNotify {
        let entry = self
            .installed
            .as_ref()
            .expect("notifications are only emitted after the mapping is installed");
        MapNotify::new(rand::random(), 0, vec![MappingRecord::from_entry(entry)])
    }

    /// Notification fan-out for the configured variant: the map-server always,
    /// then SMRs (relayed through the map-server in proxy mode), then direct
    /// notifies to subscribers.
    fn registration_targets(&self) -> VecDeque<Target> {
        let mut targets = VecDeque::new();
        targets.push_back(Target::Notify(self.map_server));

        match self.config.handler {
            MobilityHandlerKind::MapRegister => {}
            MobilityHandlerKind::SolicitMapRequest => {
                if self.config.proxy_mode {
                    targets.push_back(Target::Solicit(self.map_server));
                } else {
                    targets.extend(self.observers.iter().copied().map(Target::Solicit));
                }
            }
        }
        if self.config.subscribe {
            targets.extend(self.observers.iter().copied().map(Target::Notify));
        }
        targets
    }
}
