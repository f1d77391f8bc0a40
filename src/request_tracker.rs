use std::collections::HashMap;

/// Every network operation the client can have outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    HealthCheck,
    Login,
    Register,
    RestoreSession,
    UpdateProfile,
    GenerateLayout,
    CreateCourse,
    LoadLibrary,
    UpdateCourse,
    UpdateCourseStatus,
    DeleteCourse,
    LoadExplore,
    LoadEnrollments,
    UpdateEnrollment,
    Unenroll,
    LoadCourse,
    LoadEnrollment,
    Enroll,
    CompleteTopic,
    LoadPreview,
}

impl RequestKind {
    pub const COURSE_VIEW: [RequestKind; 4] = [
        Self::LoadCourse,
        Self::LoadEnrollment,
        Self::Enroll,
        Self::CompleteTopic,
    ];
}

/// Identifies one dispatched request; results carrying a stale ticket are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub kind: RequestKind,
    id: u64,
}

/// At most one request per kind is in flight. Cancelling a kind invalidates its ticket so a late
/// response cannot touch a screen that has already been closed.
#[derive(Debug, Default)]
pub struct RequestTracker {
    next_id: u64,
    in_flight: HashMap<RequestKind, u64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the slot for `kind`, or `None` while a request of that kind is outstanding.
    pub fn begin(&mut self, kind: RequestKind) -> Option<RequestTicket> {
        if self.in_flight.contains_key(&kind) {
            return None;
        }
        self.next_id += 1;
        self.in_flight.insert(kind, self.next_id);
        Some(RequestTicket {
            kind,
            id: self.next_id,
        })
    }

    /// Release the slot. Returns `false` when the ticket was cancelled or superseded.
    pub fn finish(&mut self, ticket: RequestTicket) -> bool {
        match self.in_flight.get(&ticket.kind) {
            Some(id) if *id == ticket.id => {
                self.in_flight.remove(&ticket.kind);
                true
            }
            _ => false,
        }
    }

    pub fn is_in_flight(&self, kind: RequestKind) -> bool {
        self.in_flight.contains_key(&kind)
    }

    pub fn cancel(&mut self, kind: RequestKind) {
        self.in_flight.remove(&kind);
    }

    pub fn cancel_many(&mut self, kinds: &[RequestKind]) {
        for kind in kinds {
            self.cancel(*kind);
        }
    }

    pub fn cancel_all(&mut self) {
        self.in_flight.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_of_same_kind_is_refused_until_finished() {
        let mut tracker = RequestTracker::new();
        let ticket = tracker.begin(RequestKind::GenerateLayout).unwrap();
        assert!(tracker.begin(RequestKind::GenerateLayout).is_none());
        assert!(tracker.begin(RequestKind::LoadLibrary).is_some());

        assert!(tracker.finish(ticket));
        assert!(!tracker.is_in_flight(RequestKind::GenerateLayout));
        assert!(tracker.begin(RequestKind::GenerateLayout).is_some());
    }

    #[test]
    fn cancelled_tickets_are_rejected_even_after_a_new_request_starts() {
        let mut tracker = RequestTracker::new();
        let stale = tracker.begin(RequestKind::LoadCourse).unwrap();
        tracker.cancel_many(&RequestKind::COURSE_VIEW);
        assert!(!tracker.finish(stale));

        let fresh = tracker.begin(RequestKind::LoadCourse).unwrap();
        assert!(!tracker.finish(stale));
        assert!(tracker.finish(fresh));
    }

    #[test]
    fn cancel_all_clears_every_slot() {
        let mut tracker = RequestTracker::new();
        let login = tracker.begin(RequestKind::Login).unwrap();
        tracker.begin(RequestKind::LoadExplore).unwrap();
        assert_eq!(tracker.pending_count(), 2);
        tracker.cancel_all();
        assert_eq!(tracker.pending_count(), 0);
        assert!(!tracker.finish(login));
    }
}
