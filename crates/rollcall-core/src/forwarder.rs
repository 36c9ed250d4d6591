//! Rate-limited face detection and attendance event forwarding.

use crate::{
    client::FaceIdentifier,
    config::ForwarderConfig,
    detector::FaceDetector,
    dispatch::EventHandler,
    frame::{ImageFrame, crop, encode_jpeg},
    gate::RateGate,
    publisher::Publisher,
    types::{AttendanceEvent, HttpReply, MarkResponse},
};
use chrono::Utc;
use eyre::{Result, WrapErr};
use tokio::time::Instant;
use tracing::{error, info, warn};

/// What a single frame ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Arrived before the minimum interval elapsed. Nothing was done.
    Throttled,
    /// Detection ran and found nothing.
    NoFace,
    Marked(AttendanceEvent),
    /// The identification endpoint answered with a status other than 201.
    Rejected(HttpReply),
    /// Conversion, detection, encoding, transport, parse or publish
    /// failure. Already logged.
    Failed,
}

/// Detects a face in each eligible frame, posts the crop for
/// identification and publishes an [AttendanceEvent] on a match.
///
/// The rate gate advances once a crop has been sent, whatever the API
/// answers. Frames without a face and frames that fail before sending
/// leave it untouched.
pub struct FaceForwarder<D, I, P> {
    config: ForwarderConfig,
    detector: D,
    identifier: I,
    publisher: P,
    gate: RateGate,
}

impl<D, I, P> FaceForwarder<D, I, P>
where
    D: FaceDetector,
    I: FaceIdentifier,
    P: Publisher,
{
    pub fn new(config: ForwarderConfig, detector: D, identifier: I, publisher: P) -> Self {
        info!(
            camera_topic = %config.camera_topic,
            api_endpoint = %config.api_endpoint,
            min_detection_interval = ?config.min_detection_interval,
            topic = %config.output_topic,
            "Creating FaceForwarder"
        );

        let gate = RateGate::new(config.min_detection_interval);
        Self {
            config,
            detector,
            identifier,
            publisher,
            gate,
        }
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    pub async fn handle_frame(&mut self, frame: &ImageFrame) -> FrameOutcome {
        self.handle_frame_at(frame, Instant::now()).await
    }

    /// Process `frame` as if it arrived at `now`.
    pub async fn handle_frame_at(&mut self, frame: &ImageFrame, now: Instant) -> FrameOutcome {
        if !self.gate.is_open(now) {
            return FrameOutcome::Throttled;
        }

        let jpeg = match self.extract_face(frame) {
            Ok(Some(jpeg)) => jpeg,
            Ok(None) => return FrameOutcome::NoFace,
            Err(e) => {
                error!(error = %format_args!("{e:#}"), "Error processing image");
                return FrameOutcome::Failed;
            }
        };

        let outcome = self.submit(jpeg).await;
        self.gate.mark(now);
        outcome
    }

    /// JPEG crop of the first detected face, if any.
    fn extract_face(&mut self, frame: &ImageFrame) -> Result<Option<Vec<u8>>> {
        let rgb = frame
            .to_rgb()
            .wrap_err_with(|| format!("Failed to convert {} frame to RGB", frame.encoding))?;

        let faces = self
            .detector
            .face_locations(&rgb)
            .wrap_err("Face detection failed")?;

        let Some(first) = faces.first() else {
            return Ok(None);
        };
        info!(faces = faces.len(), bbox = ?first, "Detected faces");

        let face = crop(&rgb, first)?;
        encode_jpeg(&face).map(Some)
    }

    async fn submit(&mut self, jpeg: Vec<u8>) -> FrameOutcome {
        let reply = match self.identifier.identify(jpeg).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %format_args!("{e:#}"), "Error sending face to API");
                return FrameOutcome::Failed;
            }
        };

        if reply.status != 201 {
            warn!(status = reply.status, body = %reply.body, "Identification request failed");
            return FrameOutcome::Rejected(reply);
        }

        match self.publish_event(&reply.body) {
            Ok(event) => FrameOutcome::Marked(event),
            Err(e) => {
                error!(error = %format_args!("{e:#}"), "Error publishing attendance event");
                FrameOutcome::Failed
            }
        }
    }

    fn publish_event(&mut self, body: &str) -> Result<AttendanceEvent> {
        let response: MarkResponse =
            serde_json::from_str(body).wrap_err("Malformed identification response")?;
        let MarkResponse {
            student,
            confidence,
            ..
        } = response;

        let event = AttendanceEvent::marked(student, Utc::now().timestamp());
        let payload = serde_json::to_string(&event).wrap_err("Failed to serialize event")?;

        self.publisher
            .publish(&self.config.output_topic, &payload)
            .wrap_err_with(|| format!("Failed to publish to '{}'", self.config.output_topic))?;

        info!(
            student = %event.student.name,
            registration_number = %event.student.registration_number,
            confidence = ?confidence,
            "Attendance marked"
        );
        Ok(event)
    }
}

impl<D, I, P> EventHandler for FaceForwarder<D, I, P>
where
    D: FaceDetector,
    I: FaceIdentifier,
    P: Publisher,
{
    async fn on_image(&mut self, frame: ImageFrame) {
        self.handle_frame(&frame).await;
    }
}
