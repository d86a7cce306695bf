//! Planner change notifications.
//!
//! Views subscribe to an [`EventBus`] to refresh after a placement, move,
//! postponement or status change, or after a new day snapshot was loaded.
//! Publishing never blocks; a lagging subscriber loses the oldest events.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::capacity::CapacityWarning;
use crate::models::{AssignmentStatus, ScheduleAssignment};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum PlannerEvent {
    /// An appointment was placed on a lane.
    AssignmentPlaced(ScheduleAssignment),
    /// An assignment changed lane or interval.
    AssignmentMoved(ScheduleAssignment),
    AssignmentPostponed {
        assignment_id: String,
        appointment_id: String,
    },
    AssignmentStatusChanged {
        assignment_id: String,
        status: AssignmentStatus,
    },
    /// A lane was planned beyond its capacity.
    CapacityWarning(CapacityWarning),
    /// A fresh snapshot for `date` replaced the current one.
    DayLoaded { date: NaiveDate },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlannerEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: PlannerEvent) {
        // Send only fails when nobody is subscribed.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlannerEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::day;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(PlannerEvent::DayLoaded { date: day() });

        assert_eq!(first.recv().await.unwrap(), PlannerEvent::DayLoaded { date: day() });
        assert_eq!(second.recv().await.unwrap(), PlannerEvent::DayLoaded { date: day() });
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        bus.publish(PlannerEvent::AssignmentPostponed {
            assignment_id: "S1".into(),
            appointment_id: "X".into(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_json_shape() {
        let event = PlannerEvent::AssignmentStatusChanged {
            assignment_id: "S1".into(),
            status: AssignmentStatus::InProgress,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "AssignmentStatusChanged");
        assert_eq!(json["payload"]["status"], "in_progress");
    }
}
