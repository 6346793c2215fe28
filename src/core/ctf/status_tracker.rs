// Remembers the last status seen for each scheduled event.
//
// Discord's update notification carries only the new object, so the router
// asks this tracker for the previous status and hands both to the service.

use super::ctf_models::EventStatus;
use dashmap::DashMap;

#[derive(Default)]
pub struct StatusTracker {
    last_seen: DashMap<u64, EventStatus>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `status` for the event and return what was there before.
    pub fn observe(&self, scheduled_event_id: u64, status: EventStatus) -> Option<EventStatus> {
        self.last_seen.insert(scheduled_event_id, status)
    }

    /// Drop an event we will never hear about again.
    pub fn forget(&self, scheduled_event_id: u64) {
        self.last_seen.remove(&scheduled_event_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_returns_previous() {
        let tracker = StatusTracker::new();
        assert_eq!(tracker.observe(1, EventStatus::Scheduled), None);
        assert_eq!(
            tracker.observe(1, EventStatus::Active),
            Some(EventStatus::Scheduled)
        );
        assert_eq!(
            tracker.observe(1, EventStatus::Completed),
            Some(EventStatus::Active)
        );
        // Other events are independent.
        assert_eq!(tracker.observe(2, EventStatus::Completed), None);
    }

    #[test]
    fn test_forget() {
        let tracker = StatusTracker::new();
        tracker.observe(1, EventStatus::Completed);
        tracker.forget(1);
        assert_eq!(tracker.observe(1, EventStatus::Scheduled), None);
    }
}
