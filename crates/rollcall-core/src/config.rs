use std::time::Duration;

/// Default statistics endpoint polled by the aggregator.
pub const DEFAULT_STATS_ENDPOINT: &str = "http://localhost:5000/api/attendance/stats";
/// Default identification endpoint the forwarder posts faces to.
pub const DEFAULT_MARK_ENDPOINT: &str = "http://localhost:5000/api/attendance/mark";
pub const DEFAULT_STATS_TOPIC: &str = "attendance_statistics";
pub const DEFAULT_EVENTS_TOPIC: &str = "attendance_events";
pub const DEFAULT_CAMERA_TOPIC: &str = "/camera/image_raw";

/// Thresholds applied when a batch is summarized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryPolicy {
    /// Records strictly below this percentage count towards
    /// `belowThreshold`.
    pub low_attendance_threshold: f64,
    /// Maximum number of entries in `topPerformers`.
    pub top_performers: usize,
}

impl Default for SummaryPolicy {
    fn default() -> Self {
        Self {
            low_attendance_threshold: 75.0,
            top_performers: 5,
        }
    }
}

/// Configuration of the [StatsAggregator](crate::StatsAggregator).
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// URL fetched on every tick.
    pub api_endpoint: String,
    /// Period of the polling timer.
    pub publish_rate: Duration,
    /// Channel the summary is published on.
    pub output_topic: String,
    pub policy: SummaryPolicy,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_STATS_ENDPOINT.to_string(),
            publish_rate: Duration::from_secs(60),
            output_topic: DEFAULT_STATS_TOPIC.to_string(),
            policy: SummaryPolicy::default(),
        }
    }
}

/// Configuration of the [FaceForwarder](crate::FaceForwarder).
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Name of the camera channel. The forwarder only logs it; the frame
    /// source wired into the executor decides where frames come from.
    pub camera_topic: String,
    /// URL the cropped face is posted to.
    pub api_endpoint: String,
    /// Minimum time between two processed detections.
    pub min_detection_interval: Duration,
    /// Channel attendance events are published on.
    pub output_topic: String,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            camera_topic: DEFAULT_CAMERA_TOPIC.to_string(),
            api_endpoint: DEFAULT_MARK_ENDPOINT.to_string(),
            min_detection_interval: Duration::from_secs(5),
            output_topic: DEFAULT_EVENTS_TOPIC.to_string(),
        }
    }
}

/// Settings shared by every HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Upper bound on a whole request, connect to last body byte.
    pub request_timeout: Duration,
    /// Sent as the `x-auth-token` header when present.
    pub auth_token: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            auth_token: None,
        }
    }
}
