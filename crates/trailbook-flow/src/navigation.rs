//! Navigation collaborator and return-point memory.

use trailbook_core::Location;
use trailbook_index::Anchor;

/// The navigation collaborator.
///
/// Fire-and-forget: the workflow records a return point before invoking it
/// and never awaits a result.
pub trait Navigator {
    /// Jump to a location and highlight the anchored usage.
    fn go_to(&mut self, location: &Location, anchor: &Anchor);
}

/// Navigator that records every jump. Useful as a test double and for
/// embedding where no real navigation exists.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    /// Every `go_to` call, in order.
    pub visits: Vec<(Location, Anchor)>,
}

impl Navigator for RecordingNavigator {
    fn go_to(&mut self, location: &Location, anchor: &Anchor) {
        self.visits.push((location.clone(), anchor.clone()));
    }
}

/// Token handed out when a return point is remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NavToken(u64);

/// Where the operator was before following a cross-reference link.
#[derive(Debug, Clone)]
pub struct ReturnPoint {
    /// The location the pending deletion request lives in.
    pub location: Location,
}

/// Remembers return points so the operator can go look at a blocking
/// reference and come back to the exact pending request.
#[derive(Debug, Default)]
pub struct NavigationMemory {
    entries: Vec<(NavToken, ReturnPoint)>,
    next: u64,
}

impl NavigationMemory {
    /// Create an empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a return point. The token is consumed on return.
    pub fn remember(&mut self, point: ReturnPoint) -> NavToken {
        let token = NavToken(self.next);
        self.next += 1;
        self.entries.push((token, point));
        token
    }

    /// Consume a token, yielding its return point. Each token works once.
    pub fn consume(&mut self, token: NavToken) -> Option<ReturnPoint> {
        let index = self.entries.iter().position(|(t, _)| *t == token)?;
        Some(self.entries.remove(index).1)
    }

    /// Number of outstanding return points.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no return points are outstanding.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all outstanding return points.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
