use serde::Serialize;
use tokio::sync::broadcast;

/// Events pushed to every connected participant. Names and payload casing
/// match the wire events the exam frontend listens for. Delivery is
/// best-effort and at-most-once; every event has an equivalent poll-derived
/// reconciliation path, so a dropped event only delays the client until its
/// next status poll.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub(crate) enum ParticipantEvent {
    ExamCountdownStarted { countdown_start_time: String, countdown_seconds: i64 },
    ExamActuallyStarted,
    GlobalQuestionChange { current_question: u32 },
    ExamStopped,
    ExamAutoStopped,
}

/// Events pushed to the administrator view only.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub(crate) enum AdminEvent {
    StudentProgress { participant_id: String, question_index: u32, answered_count: u32 },
    StudentDisqualified { participant_id: String, reason: String },
}

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub(crate) struct EventHub {
    participant_tx: broadcast::Sender<ParticipantEvent>,
    admin_tx: broadcast::Sender<AdminEvent>,
}

impl EventHub {
    pub(crate) fn new() -> Self {
        let (participant_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (admin_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { participant_tx, admin_tx }
    }

    pub(crate) fn publish(&self, event: ParticipantEvent) {
        // A send error only means nobody is connected right now.
        let _ = self.participant_tx.send(event);
    }

    pub(crate) fn publish_admin(&self, event: AdminEvent) {
        let _ = self.admin_tx.send(event);
    }

    pub(crate) fn subscribe_participants(&self) -> broadcast::Receiver<ParticipantEvent> {
        self.participant_tx.subscribe()
    }

    pub(crate) fn subscribe_admin(&self) -> broadcast::Receiver<AdminEvent> {
        self.admin_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_every_subscriber() {
        let hub = EventHub::new();
        let mut first = hub.subscribe_participants();
        let mut second = hub.subscribe_participants();

        hub.publish(ParticipantEvent::GlobalQuestionChange { current_question: 2 });

        for rx in [&mut first, &mut second] {
            match rx.recv().await.expect("event") {
                ParticipantEvent::GlobalQuestionChange { current_question } => {
                    assert_eq!(current_question, 2)
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn publishing_without_subscribers_is_a_no_op() {
        let hub = EventHub::new();
        hub.publish(ParticipantEvent::ExamStopped);
        hub.publish_admin(AdminEvent::StudentDisqualified {
            participant_id: "alice".to_string(),
            reason: "fullscreen exit".to_string(),
        });
    }

    #[test]
    fn wire_format_matches_frontend_event_names() {
        let event = ParticipantEvent::ExamCountdownStarted {
            countdown_start_time: "2026-03-01T10:00:00Z".to_string(),
            countdown_seconds: 30,
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "exam-countdown-started");
        assert_eq!(json["countdownSeconds"], 30);
        assert_eq!(json["countdownStartTime"], "2026-03-01T10:00:00Z");

        let event = AdminEvent::StudentProgress {
            participant_id: "alice".to_string(),
            question_index: 1,
            answered_count: 2,
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "student-progress");
        assert_eq!(json["participantId"], "alice");
    }
}
