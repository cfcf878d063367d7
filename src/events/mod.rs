use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod loggable;
pub use loggable::{Activity, Loggable, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent<T> {
    pub id: Uuid,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub payload: T,
}

impl<T> DomainEvent<T> {
    pub fn new(name: impl Into<String>, actor_id: Option<Uuid>, subject_id: Option<Uuid>, payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            occurred_at: Utc::now(),
            actor_id,
            subject_id,
            payload,
        }
    }
}

pub type EventBus = broadcast::Sender<Value>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<Value>) {
    broadcast::channel(1024)
}

/// Request context for activity logging (IP, User-Agent, etc.)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let ip = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from)
            });

        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self { ip, user_agent }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPayload {
    #[serde(rename = "new")]
    pub current: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RequestContext>,
    pub description: String,
    pub severity: Severity,
}

/// Publish an activity event for `entity` on the bus. Never fails: a
/// missing listener only drops the event.
pub fn record_activity<T: Loggable>(
    event_bus: &EventBus,
    activity: Activity,
    actor_id: Option<Uuid>,
    entity: &T,
    previous: Option<&T>,
    context: Option<RequestContext>,
) {
    let payload = ActivityPayload {
        current: serde_json::to_value(entity).unwrap_or_default(),
        old: previous.map(|e| serde_json::to_value(e).unwrap_or_default()),
        context,
        description: T::describe(activity),
        severity: entity.severity_for(activity),
    };

    let event = DomainEvent::new(
        T::event_name(activity),
        actor_id,
        Some(entity.subject_id()),
        serde_json::to_value(&payload).unwrap_or_default(),
    );

    if event_bus.send(serde_json::to_value(event).unwrap_or_default()).is_err() {
        tracing::debug!(entity = T::entity_type(), activity = activity.as_str(), "no activity listener attached");
    }
}

pub async fn start_activity_listener(mut rx: broadcast::Receiver<Value>, pool: SqlitePool) {
    tracing::info!("Activity listener started");
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "activity listener lagged behind");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let name = event.get("name").and_then(|v| v.as_str()).unwrap_or("unknown");
        let actor_id = event.get("actor_id").and_then(|v| v.as_str()).map(String::from);
        let subject_id = event.get("subject_id").and_then(|v| v.as_str()).map(String::from);
        let occurred_at = event
            .get("occurred_at")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let payload = event.get("payload");
        let severity = payload
            .and_then(|p| p.get("severity"))
            .and_then(|s| s.as_str())
            .unwrap_or(Severity::Important.as_str());
        let description = payload
            .and_then(|p| p.get("description"))
            .and_then(|s| s.as_str())
            .unwrap_or(name);

        let result = sqlx::query(
            r#"
            INSERT INTO activity_log (id, event_name, description, actor_id, subject_id, occurred_at, properties, severity)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(description)
        .bind(actor_id)
        .bind(subject_id)
        .bind(occurred_at)
        .bind(event.to_string())
        .bind(severity)
        .execute(&pool)
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to save activity log: {}", e);
        }
    }
    tracing::info!("Activity listener stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Bonus {
        id: Uuid,
    }

    impl Loggable for Bonus {
        fn entity_type() -> &'static str {
            "bonus"
        }
        fn entity_label() -> &'static str {
            "Bonus"
        }
        fn subject_id(&self) -> Uuid {
            self.id
        }
        fn monetary() -> bool {
            true
        }
    }

    #[derive(Serialize)]
    struct Note {
        id: Uuid,
    }

    impl Loggable for Note {
        fn entity_type() -> &'static str {
            "note"
        }
        fn entity_label() -> &'static str {
            "Note"
        }
        fn subject_id(&self) -> Uuid {
            self.id
        }
    }

    #[test]
    fn events_carry_name_actor_subject_and_description() {
        let (bus, mut rx) = init_event_bus();
        let bonus = Bonus { id: Uuid::new_v4() };
        let actor = Uuid::new_v4();

        record_activity(&bus, Activity::StatusChanged, Some(actor), &bonus, None, None);

        let event = rx.try_recv().unwrap();
        assert_eq!(event["name"], "bonus.status_changed");
        assert_eq!(event["actor_id"], actor.to_string());
        assert_eq!(event["subject_id"], bonus.id.to_string());
        assert_eq!(event["payload"]["description"], "Bonus status changed");
        assert_eq!(event["payload"]["severity"], "critical");
    }

    #[test]
    fn only_deletes_of_non_monetary_records_are_critical() {
        let note = Note { id: Uuid::new_v4() };
        assert_eq!(note.severity_for(Activity::Updated), Severity::Important);
        assert_eq!(note.severity_for(Activity::Deleted), Severity::Critical);
    }

    #[test]
    fn publishing_without_listener_is_silent() {
        let (bus, rx) = init_event_bus();
        drop(rx);
        record_activity(&bus, Activity::Created, None, &Note { id: Uuid::new_v4() }, None, None);
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(RequestContext::from_headers(&headers).ip.as_deref(), Some("203.0.113.7"));
    }
}
