//! Appointment listing and status aggregation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{Collection, Query, RecordBackend};
use crate::Result;

/// Lifecycle state of an appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Pending,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "pending" => Ok(AppointmentStatus::Pending),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("unrecognised appointment status: {}", other)),
        }
    }
}

/// Which appointments to fetch before aggregating
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentSelection {
    pub user_id: Option<String>,
}

impl AppointmentSelection {
    pub fn for_user(user_id: Option<String>) -> Self {
        Self {
            user_id: user_id.filter(|id| !id.trim().is_empty()),
        }
    }

    /// A user's appointments, or everything newest first.
    pub fn queries(&self) -> Vec<Query> {
        match &self.user_id {
            Some(user_id) => vec![Query::equal("userId", user_id.as_str())],
            None => vec![Query::order_desc("$createdAt")],
        }
    }
}

/// Appointment counts per status bucket plus the records they came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSummary {
    pub total_count: usize,
    pub scheduled_count: usize,
    pub pending_count: usize,
    pub cancelled_count: usize,
    pub documents: Vec<Value>,
}

/// Count appointments per status in a single pass.
///
/// `total_count` is the input length; records whose status is missing or
/// unrecognised land in no bucket.
pub fn summarize(documents: Vec<Value>) -> AppointmentSummary {
    let mut summary = AppointmentSummary {
        total_count: documents.len(),
        scheduled_count: 0,
        pending_count: 0,
        cancelled_count: 0,
        documents: Vec::new(),
    };

    for document in &documents {
        let status = document
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<AppointmentStatus>().ok());

        match status {
            Some(AppointmentStatus::Scheduled) => summary.scheduled_count += 1,
            Some(AppointmentStatus::Pending) => summary.pending_count += 1,
            Some(AppointmentStatus::Cancelled) => summary.cancelled_count += 1,
            None => {}
        }
    }

    summary.documents = documents;
    summary
}

/// Fetch the selected appointments from the document store.
pub async fn list_appointments(
    backend: &dyn RecordBackend,
    selection: &AppointmentSelection,
) -> Result<Vec<Value>> {
    backend
        .list_documents(Collection::Appointments, &selection.queries())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use serde_json::json;

    fn with_status(status: &str) -> Value {
        json!({ "status": status })
    }

    #[test]
    fn test_mixed_statuses() {
        let docs = vec![
            with_status("scheduled"),
            with_status("pending"),
            with_status("cancelled"),
            with_status("scheduled"),
        ];
        let summary = summarize(docs.clone());

        assert_eq!(summary.total_count, 4);
        assert_eq!(summary.scheduled_count, 2);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.cancelled_count, 1);
        assert_eq!(summary.documents, docs);
    }

    #[test]
    fn test_empty_input() {
        let summary = summarize(Vec::new());
        assert_eq!(summary.total_count, 0);
        assert_eq!(summary.scheduled_count, 0);
        assert_eq!(summary.pending_count, 0);
        assert_eq!(summary.cancelled_count, 0);
        assert!(summary.documents.is_empty());
    }

    #[test]
    fn test_unrecognised_status_counts_only_in_total() {
        let docs = vec![
            with_status("scheduled"),
            with_status("completed"),
            with_status("Scheduled"),
            json!({ "reason": "no status at all" }),
            json!({ "status": 3 }),
        ];
        let summary = summarize(docs);

        assert_eq!(summary.total_count, 5);
        assert_eq!(summary.scheduled_count, 1);
        let bucketed = summary.scheduled_count + summary.pending_count + summary.cancelled_count;
        assert!(bucketed < summary.total_count);
    }

    #[test]
    fn test_bucket_sum_equals_total_when_all_recognised() {
        let docs: Vec<Value> = ["pending", "cancelled", "pending", "scheduled", "cancelled"]
            .iter()
            .map(|s| with_status(s))
            .collect();
        let summary = summarize(docs);
        assert_eq!(
            summary.scheduled_count + summary.pending_count + summary.cancelled_count,
            summary.total_count
        );
    }

    #[test]
    fn test_order_independent() {
        let docs = vec![
            with_status("pending"),
            with_status("scheduled"),
            with_status("bogus"),
            with_status("cancelled"),
            with_status("pending"),
        ];
        let forward = summarize(docs.clone());
        let mut reversed_docs = docs;
        reversed_docs.reverse();
        let reversed = summarize(reversed_docs);

        assert_eq!(forward.total_count, reversed.total_count);
        assert_eq!(forward.scheduled_count, reversed.scheduled_count);
        assert_eq!(forward.pending_count, reversed.pending_count);
        assert_eq!(forward.cancelled_count, reversed.cancelled_count);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let value = serde_json::to_value(summarize(vec![with_status("pending")])).unwrap();
        assert_eq!(value["totalCount"], 1);
        assert_eq!(value["pendingCount"], 1);
        assert_eq!(value["scheduledCount"], 0);
        assert_eq!(value["cancelledCount"], 0);
        assert_eq!(value["documents"][0]["status"], "pending");
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Pending,
            AppointmentStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<AppointmentStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_selection_queries() {
        assert_eq!(
            AppointmentSelection::for_user(Some("u-1".to_string())).queries(),
            vec![Query::equal("userId", "u-1")]
        );
        assert_eq!(
            AppointmentSelection::for_user(Some("  ".to_string())).queries(),
            vec![Query::order_desc("$createdAt")]
        );
        assert_eq!(
            AppointmentSelection::for_user(None).queries(),
            vec![Query::order_desc("$createdAt")]
        );
    }

    #[tokio::test]
    async fn test_list_appointments_applies_selection() {
        let backend = MemoryBackend::new();
        backend.insert_document(
            Collection::Appointments,
            json!({"userId": "u-1", "status": "pending", "$createdAt": "2024-01-01T00:00:00.000Z"}),
        );
        backend.insert_document(
            Collection::Appointments,
            json!({"userId": "u-2", "status": "scheduled", "$createdAt": "2024-02-01T00:00:00.000Z"}),
        );

        let mine = list_appointments(&backend, &AppointmentSelection::for_user(Some("u-1".into())))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["userId"], "u-1");

        let all = list_appointments(&backend, &AppointmentSelection::default())
            .await
            .unwrap();
        assert_eq!(all[0]["userId"], "u-2");
        assert_eq!(all[1]["userId"], "u-1");
    }
}
