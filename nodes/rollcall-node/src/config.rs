//! Configuration parsing and validation for the rollcall nodes.

use eyre::{Result, WrapErr, ensure};
use rollcall_core::{
    AggregatorConfig, ForwarderConfig, HttpConfig, SeetaParams, SummaryPolicy,
    dispatch::DEFAULT_QUEUE_DEPTH,
};
use serde::{Deserialize, Deserializer, de};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Root configuration structure. Every section is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Statistics aggregator parameters.
    pub statistics: StatisticsConfig,

    /// Face event forwarder parameters.
    pub face_detection: FaceDetectionConfig,

    /// HTTP client settings shared by both nodes.
    pub http: HttpSettings,

    /// Depth of the event queue.
    pub queue_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            statistics: StatisticsConfig::default(),
            face_detection: FaceDetectionConfig::default(),
            http: HttpSettings::default(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn parse(yaml: &str) -> Result<Self> {
        // An empty document means all defaults
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let stats = &self.statistics;
        ensure_url("statistics.api_endpoint", &stats.api_endpoint)?;
        ensure!(
            !stats.publish_rate.is_zero(),
            "statistics.publish_rate must be greater than zero"
        );
        ensure!(!stats.topic.is_empty(), "statistics.topic cannot be empty");
        ensure!(
            (0.0..=100.0).contains(&stats.low_attendance_threshold),
            "statistics.low_attendance_threshold must be within 0..=100, got {}",
            stats.low_attendance_threshold
        );

        let faces = &self.face_detection;
        ensure_url("face_detection.api_endpoint", &faces.api_endpoint)?;
        ensure!(
            !faces.camera_topic.is_empty(),
            "face_detection.camera_topic cannot be empty"
        );
        ensure!(!faces.topic.is_empty(), "face_detection.topic cannot be empty");
        ensure!(
            faces.detector.min_face_size >= 20,
            "face_detection.detector.min_face_size must be at least 20"
        );
        ensure!(
            faces.detector.pyramid_scale_factor > 0.0 && faces.detector.pyramid_scale_factor < 1.0,
            "face_detection.detector.pyramid_scale_factor must be within (0, 1)"
        );
        ensure!(
            faces.detector.slide_window_step > 0,
            "face_detection.detector.slide_window_step must be greater than zero"
        );
        ensure!(
            !faces.frame_source.poll_interval.is_zero(),
            "face_detection.frame_source.poll_interval must be greater than zero"
        );

        ensure!(
            !self.http.request_timeout.is_zero(),
            "http.request_timeout must be greater than zero"
        );
        ensure!(self.queue_depth > 0, "queue_depth must be greater than zero");

        Ok(())
    }

    pub fn to_aggregator_config(&self) -> AggregatorConfig {
        let stats = &self.statistics;
        AggregatorConfig {
            api_endpoint: stats.api_endpoint.clone(),
            publish_rate: stats.publish_rate,
            output_topic: stats.topic.clone(),
            policy: SummaryPolicy {
                low_attendance_threshold: stats.low_attendance_threshold,
                top_performers: stats.top_performers,
            },
        }
    }

    pub fn to_forwarder_config(&self) -> ForwarderConfig {
        let faces = &self.face_detection;
        ForwarderConfig {
            camera_topic: faces.camera_topic.clone(),
            api_endpoint: faces.api_endpoint.clone(),
            min_detection_interval: faces.min_detection_interval,
            output_topic: faces.topic.clone(),
        }
    }

    pub fn to_http_config(&self) -> HttpConfig {
        HttpConfig {
            request_timeout: self.http.request_timeout,
            auth_token: self.http.auth_token.clone(),
        }
    }

    pub fn to_seeta_params(&self) -> SeetaParams {
        let detector = &self.face_detection.detector;
        SeetaParams {
            min_face_size: detector.min_face_size,
            score_threshold: detector.score_threshold,
            pyramid_scale_factor: detector.pyramid_scale_factor,
            slide_window_step: detector.slide_window_step,
        }
    }
}

fn ensure_url(field: &str, url: &str) -> Result<()> {
    ensure!(
        url.starts_with("http://") || url.starts_with("https://"),
        "{} must be an http(s) URL, got '{}'",
        field,
        url
    );
    Ok(())
}

/// Statistics aggregator parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Statistics endpoint URL.
    pub api_endpoint: String,

    /// Polling period, in seconds or as a humantime string.
    #[serde(deserialize_with = "seconds_or_humantime")]
    pub publish_rate: Duration,

    /// Output topic for summaries.
    pub topic: String,

    /// Percentage below which a record counts as low attendance.
    pub low_attendance_threshold: f64,

    /// Number of top performers to include.
    pub top_performers: usize,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        let AggregatorConfig {
            api_endpoint,
            publish_rate,
            output_topic,
            policy,
        } = AggregatorConfig::default();

        Self {
            api_endpoint,
            publish_rate,
            topic: output_topic,
            low_attendance_threshold: policy.low_attendance_threshold,
            top_performers: policy.top_performers,
        }
    }
}

/// Face event forwarder parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FaceDetectionConfig {
    /// Label for the camera channel. Frames are read from `frame_source`.
    pub camera_topic: String,

    /// Identification endpoint URL.
    pub api_endpoint: String,

    /// Minimum time between two processed detections.
    #[serde(deserialize_with = "seconds_or_humantime")]
    pub min_detection_interval: Duration,

    /// Output topic for attendance events.
    pub topic: String,

    pub detector: DetectorConfig,

    pub frame_source: FrameSourceConfig,
}

impl Default for FaceDetectionConfig {
    fn default() -> Self {
        let ForwarderConfig {
            camera_topic,
            api_endpoint,
            min_detection_interval,
            output_topic,
        } = ForwarderConfig::default();

        Self {
            camera_topic,
            api_endpoint,
            min_detection_interval,
            topic: output_topic,
            detector: DetectorConfig::default(),
            frame_source: FrameSourceConfig::default(),
        }
    }
}

/// SeetaFace detector settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to the SeetaFace frontal model.
    pub model_path: PathBuf,
    pub min_face_size: u32,
    pub score_threshold: f64,
    pub pyramid_scale_factor: f32,
    pub slide_window_step: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let params = SeetaParams::default();
        Self {
            model_path: PathBuf::from("models/seeta_fd_frontal_v1.0.bin"),
            min_face_size: params.min_face_size,
            score_threshold: params.score_threshold,
            pyramid_scale_factor: params.pyramid_scale_factor,
            slide_window_step: params.slide_window_step,
        }
    }
}

/// Directory polled for camera frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrameSourceConfig {
    pub directory: PathBuf,

    #[serde(deserialize_with = "seconds_or_humantime")]
    pub poll_interval: Duration,
}

impl Default for FrameSourceConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("frames"),
            poll_interval: Duration::from_millis(200),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    #[serde(deserialize_with = "seconds_or_humantime")]
    pub request_timeout: Duration,

    /// Value of the `x-auth-token` header.
    pub auth_token: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let HttpConfig {
            request_timeout,
            auth_token,
        } = HttpConfig::default();

        Self {
            request_timeout,
            auth_token,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationSetting {
    Seconds(f64),
    Human(#[serde(with = "humantime_serde")] Duration),
}

/// Accept `60`, `60.0` (seconds) or `1m` (humantime).
fn seconds_or_humantime<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match DurationSetting::deserialize(deserializer)? {
        DurationSetting::Seconds(secs) => {
            Duration::try_from_secs_f64(secs).map_err(|e| de::Error::custom(format!("{secs}: {e}")))
        }
        DurationSetting::Human(duration) => Ok(duration),
    }
}
