use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    directory::UserDirectory,
    error::Error,
    status::{Focus, Status, StatusConfig, derive_status},
    store::EventStore,
};

/// One dashboard line per student
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub id: String,
    pub name: String,
    pub status: Status,
    pub focus: Focus,
    /// Type of the latest event, or `None`
    #[serde(rename = "last_event")]
    pub last_event_type: String,
    pub timestamp: String,
}

/// Builds the status report for every student in `directory`, in roster order.
///
/// The store is read once. A store failure fails the whole report.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn build_report<D, S>(
    directory: &D,
    store: &S,
    now: DateTime<Utc>,
    config: &StatusConfig,
) -> Result<Vec<ReportRow>, Error>
where
    D: UserDirectory + ?Sized,
    S: EventStore,
{
    let students = directory.students();
    let student_ids: Vec<String> = students.iter().map(|s| s.id.clone()).collect();

    let latest_events = store.latest_per_user(&student_ids).await?;
    tracing::debug!(
        students = students.len(),
        with_events = latest_events.len(),
        "fetched latest events"
    );

    let report = students
        .into_iter()
        .map(|student| {
            let event = latest_events.get(&student.id);
            let derived = derive_status(event, now, config);
            ReportRow {
                id: student.id.clone(),
                name: student.name.clone(),
                status: derived.status,
                focus: derived.focus,
                last_event_type: event
                    .map(|e| e.event_type.clone())
                    .unwrap_or_else(|| "None".to_string()),
                timestamp: derived.timestamp,
            }
        })
        .collect();

    Ok(report)
}
