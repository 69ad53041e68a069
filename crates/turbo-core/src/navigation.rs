//! Navigation tracking and cancellation.
//!
//! Every navigation gets a fresh [`NavigationId`]. Starting a navigation
//! aborts the load still in flight for the previous one, and a result that
//! settles after its navigation stopped being current is discarded.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{AbortHandle, AbortRegistration, Abortable};
use parking_lot::Mutex;
use thiserror::Error;

use crate::NavigationId;

/// A navigation was replaced by a newer one before its load settled.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("navigation {navigation} was superseded")]
pub struct Superseded {
    /// The stale navigation.
    pub navigation: NavigationId,
}

/// Handle for a navigation started with [`NavigationTracker::begin`].
#[derive(Debug)]
pub struct NavigationTicket {
    id: NavigationId,
    registration: AbortRegistration,
}

impl NavigationTicket {
    /// The navigation id.
    pub fn id(&self) -> NavigationId {
        self.id
    }
}

#[derive(Debug)]
struct InFlight {
    id: NavigationId,
    abort: AbortHandle,
}

/// Tracks the current navigation of one client.
#[derive(Debug, Default)]
pub struct NavigationTracker {
    next_id: AtomicU64,
    current: Mutex<Option<InFlight>>,
}

impl NavigationTracker {
    /// Create a tracker with no navigation in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id without starting a navigation.
    pub fn next_id(&self) -> NavigationId {
        NavigationId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Start a navigation, aborting the one in flight.
    pub fn begin(&self) -> NavigationTicket {
        let id = self.next_id();
        let (abort, registration) = AbortHandle::new_pair();

        let previous = self.current.lock().replace(InFlight { id, abort });
        if let Some(previous) = previous {
            previous.abort.abort();
        }

        NavigationTicket { id, registration }
    }

    /// The current navigation, if any.
    pub fn current(&self) -> Option<NavigationId> {
        self.current.lock().as_ref().map(|n| n.id)
    }

    /// Whether `id` is still the current navigation.
    pub fn is_current(&self, id: NavigationId) -> bool {
        self.current() == Some(id)
    }

    /// Mark `id` as finished. Does nothing if a newer navigation started.
    pub fn finish(&self, id: NavigationId) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|n| n.id == id) {
            *current = None;
        }
    }

    /// Abort whatever navigation is in flight.
    pub fn cancel(&self) {
        if let Some(in_flight) = self.current.lock().take() {
            in_flight.abort.abort();
        }
    }

    /// Drive `future` on behalf of the ticket's navigation.
    ///
    /// Returns [`Superseded`] if the navigation was aborted while pending,
    /// or if it stopped being current by the time the future settled.
    pub async fn run<F: Future>(
        &self,
        ticket: NavigationTicket,
        future: F,
    ) -> Result<F::Output, Superseded> {
        let id = ticket.id;
        let superseded = Superseded { navigation: id };

        let output = Abortable::new(future, ticket.registration)
            .await
            .map_err(|_| superseded)?;

        if self.is_current(id) {
            Ok(output)
        } else {
            Err(superseded)
        }
    }
}
