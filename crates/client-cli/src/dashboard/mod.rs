//! View models behind each dashboard screen.
//!
//! Every screen loads through a [`Loadable`]: `begin` hands out a [`Ticket`],
//! the caller performs the fetch (inline or on a spawned task) and hands the
//! result back to `finish`. Only the newest ticket may commit.

pub mod admin;
pub mod contact_detail;
pub mod contacts;
pub mod reservations;
pub mod studies;

use shared::{Contact, Lesson, Room, Status};

use crate::api::ApiError;

pub const UNKNOWN_STATUS: &str = "Unknown";
pub const UNKNOWN_CONTACT: &str = "Unknown Contact";
pub const UNKNOWN_ROOM: &str = "Unknown Room";
pub const UNKNOWN_LESSON: &str = "Unknown Lesson";

/// Identifies one fetch cycle of a [`Loadable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone)]
pub struct Loadable<T> {
    value: Option<T>,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self {
            value: None,
            loading: false,
            error: None,
            generation: 0,
        }
    }
}

impl<T> Loadable<T> {
    /// Start a fetch cycle. Any ticket handed out earlier becomes stale.
    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        Ticket(self.generation)
    }

    /// Commit a fetch result. Returns `false` when the ticket is stale and the
    /// result was dropped. Errors keep the previous value.
    pub fn finish(&mut self, ticket: Ticket, result: Result<T, ApiError>, failure: &str) -> bool {
        if ticket.0 != self.generation {
            tracing::debug!(ticket = ticket.0, current = self.generation, "Dropping stale response");
            return false;
        }

        self.loading = false;
        match result {
            Ok(value) => {
                self.value = Some(value);
                self.error = None;
            }
            Err(e) => {
                tracing::error!(error = %e, "{}", failure);
                self.error = Some(failure.to_string());
            }
        }
        true
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        self.value.as_mut()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }

    /// An empty state that continues `previous`'s ticket sequence, so no
    /// ticket handed out by `previous` is current here.
    pub fn succeeding(previous: &Loadable<T>) -> Self {
        Self {
            generation: previous.generation,
            ..Self::default()
        }
    }

    /// Forget the value, e.g. when the key it was loaded for goes away.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.value = None;
        self.loading = false;
        self.error = None;
    }
}

/// Entities that other entities refer to by id.
pub trait Named {
    fn key(&self) -> i64;
    fn label(&self) -> &str;
}

impl Named for Status {
    fn key(&self) -> i64 {
        self.id
    }
    fn label(&self) -> &str {
        &self.name
    }
}

impl Named for Contact {
    fn key(&self) -> i64 {
        self.id
    }
    fn label(&self) -> &str {
        &self.name
    }
}

impl Named for Room {
    fn key(&self) -> i64 {
        self.id
    }
    fn label(&self) -> &str {
        &self.name
    }
}

impl Named for Lesson {
    fn key(&self) -> i64 {
        self.id
    }
    fn label(&self) -> &str {
        &self.title
    }
}

pub fn lookup<T: Named>(items: &[T], id: i64) -> Option<&T> {
    items.iter().find(|item| item.key() == id)
}

/// Label of the item with `id`, or `fallback` when it is not in `items`.
pub fn resolve<'a, T: Named>(items: &'a [T], id: i64, fallback: &'a str) -> &'a str {
    lookup(items, id).map(Named::label).unwrap_or(fallback)
}

pub const NETWORK_FAILURE: &str = "Could not reach the server. Check your connection and try again.";
pub const SERVER_FAILURE: &str = "The server ran into a problem. Please try again later.";
pub const MALFORMED_FAILURE: &str = "The server sent an unexpected response. Please try again later.";
pub const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

/// Message shown for a failed mutation. Rejections get the resource-specific
/// `rejected` text; everything else says what actually went wrong.
pub fn describe_failure(err: &ApiError, rejected: &str) -> String {
    let message = match err {
        ApiError::Rejected { .. } | ApiError::NotFound { .. } => rejected,
        ApiError::Transport { .. } => NETWORK_FAILURE,
        ApiError::Server { .. } => SERVER_FAILURE,
        ApiError::Malformed { .. } => MALFORMED_FAILURE,
        ApiError::Unauthorized => SESSION_EXPIRED,
    };
    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(id: i64, name: &str) -> Status {
        Status {
            id,
            name: name.to_string(),
            description: None,
            display_order: id,
        }
    }

    fn rejected() -> ApiError {
        ApiError::Rejected {
            status: 409,
            message: "duplicate".to_string(),
        }
    }

    #[test]
    fn test_stale_ticket_is_dropped() {
        let mut state: Loadable<Vec<i64>> = Loadable::default();
        let first = state.begin();
        let second = state.begin();

        assert!(state.finish(second, Ok(vec![2]), "failed"));
        assert!(!state.finish(first, Ok(vec![1]), "failed"));
        assert_eq!(state.value(), Some(&vec![2]));
        assert!(!state.is_loading());
    }

    #[test]
    fn test_successor_rejects_predecessor_tickets() {
        let mut first: Loadable<Vec<i64>> = Loadable::default();
        let old = first.begin();

        let mut second = Loadable::succeeding(&first);
        assert!(second.value().is_none());
        let fresh = second.begin();
        assert!(!second.finish(old, Ok(vec![1]), "failed"));
        assert!(second.value().is_none());
        assert!(second.finish(fresh, Ok(vec![2]), "failed"));
        assert_eq!(second.value(), Some(&vec![2]));
    }

    #[test]
    fn test_error_keeps_previous_value() {
        let mut state: Loadable<Vec<i64>> = Loadable::default();
        let ticket = state.begin();
        state.finish(ticket, Ok(vec![1, 2]), "failed");

        let ticket = state.begin();
        assert!(state.is_loading());
        assert!(state.error().is_none());
        state.finish(ticket, Err(rejected()), "Failed to load contacts. Please try again later.");

        assert_eq!(state.value(), Some(&vec![1, 2]));
        assert_eq!(state.error(), Some("Failed to load contacts. Please try again later."));
        assert!(!state.is_loading());
    }

    #[test]
    fn test_reset_invalidates_in_flight_ticket() {
        let mut state: Loadable<i64> = Loadable::default();
        let ticket = state.begin();
        state.reset();
        assert!(!state.is_current(ticket));
        assert!(!state.finish(ticket, Ok(1), "failed"));
        assert!(state.value().is_none());
    }

    #[test]
    fn test_resolve_falls_back() {
        let statuses = vec![status(1, "New Contact"), status(2, "In Studies")];
        assert_eq!(resolve(&statuses, 2, UNKNOWN_STATUS), "In Studies");
        assert_eq!(resolve(&statuses, 99, UNKNOWN_STATUS), "Unknown");
        assert_eq!(resolve::<Room>(&[], 1, UNKNOWN_ROOM), "Unknown Room");
    }

    #[test]
    fn test_failure_messages_distinguish_causes() {
        let conflict = "Failed to save room. Please check all fields and try again.";
        assert_eq!(describe_failure(&rejected(), conflict), conflict);
        assert_eq!(
            describe_failure(&ApiError::NotFound { message: String::new() }, conflict),
            conflict
        );
        let server = ApiError::Server {
            status: 500,
            message: String::new(),
        };
        assert_eq!(describe_failure(&server, conflict), SERVER_FAILURE);
        assert_eq!(describe_failure(&ApiError::Unauthorized, conflict), SESSION_EXPIRED);
    }
}
