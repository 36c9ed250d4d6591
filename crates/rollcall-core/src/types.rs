use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

/// The event name carried by every [AttendanceEvent].
pub const ATTENDANCE_MARKED: &str = "attendance_marked";

/// One row of the statistics endpoint response.
///
/// The server sends more fields per row (month, year, present/absent
/// counts); only the ones the summary needs are kept.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// Opaque student identifier. The same student may appear in
    /// several rows, one per month.
    #[serde(deserialize_with = "opaque_id")]
    pub student: String,
    pub student_name: String,
    pub present_percentage: f64,
}

/// Aggregate computed from one batch of [AttendanceRecord]s.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub timestamp: DateTime<Utc>,
    pub total_students: usize,
    pub average_attendance: f64,
    pub below_threshold: usize,
    pub top_performers: Vec<TopPerformer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPerformer {
    pub name: String,
    pub attendance: f64,
}

/// The 201 body returned by the identification endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarkResponse {
    pub student: MarkedStudent,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedStudent {
    #[serde(rename = "_id", deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    pub registration_number: String,
}

/// Published once per successful detection-and-match cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceEvent {
    pub event: &'static str,
    pub student: EventStudent,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStudent {
    pub id: String,
    pub name: String,
    pub registration_number: String,
}

impl AttendanceEvent {
    pub fn marked(student: MarkedStudent, timestamp: i64) -> Self {
        let MarkedStudent {
            id,
            name,
            registration_number,
        } = student;

        Self {
            event: ATTENDANCE_MARKED,
            student: EventStudent {
                id,
                name,
                registration_number,
            },
            timestamp,
        }
    }
}

/// Status and body text of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Accepts an identifier serialized as either a JSON string or a number.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or number identifier, found {other}"
        ))),
    }
}
