use image::RgbImage;
use rollcall_core::{
    BoundingBox, FaceDetector, FaceIdentifier, HttpReply, ImageFrame, StatisticsSource,
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// Scripted attendance API. Replies are served in order; an exhausted
/// script answers with a transport error.
#[derive(Clone, Default)]
pub struct ScriptedApi {
    inner: Arc<Mutex<ApiScript>>,
}

#[derive(Default)]
struct ApiScript {
    replies: VecDeque<Result<HttpReply, String>>,
    uploads: Vec<Vec<u8>>,
    calls: usize,
}

impl ScriptedApi {
    pub fn new(replies: impl IntoIterator<Item = Result<HttpReply, String>>) -> Self {
        let api = Self::default();
        api.inner.lock().unwrap().replies = replies.into_iter().collect();
        api
    }

    pub fn replying(replies: impl IntoIterator<Item = HttpReply>) -> Self {
        Self::new(replies.into_iter().map(Ok))
    }

    pub fn calls(&self) -> usize {
        self.inner.lock().unwrap().calls
    }

    /// Bodies posted through [FaceIdentifier::identify].
    #[allow(dead_code)]
    pub fn uploads(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().uploads.clone()
    }

    fn next(&self, upload: Option<Vec<u8>>) -> eyre::Result<HttpReply> {
        let mut script = self.inner.lock().unwrap();
        script.calls += 1;
        script.uploads.extend(upload);

        match script.replies.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(msg)) => Err(eyre::eyre!(msg)),
            None => Err(eyre::eyre!("connection refused")),
        }
    }
}

impl StatisticsSource for ScriptedApi {
    async fn fetch_statistics(&self) -> eyre::Result<HttpReply> {
        self.next(None)
    }
}

impl FaceIdentifier for ScriptedApi {
    async fn identify(&self, jpeg: Vec<u8>) -> eyre::Result<HttpReply> {
        self.next(Some(jpeg))
    }
}

/// Scripted detector. Once the script runs out, the fallback result is
/// returned for every call.
#[allow(dead_code)]
#[derive(Clone)]
pub struct ScriptedDetector {
    inner: Arc<Mutex<DetectorScript>>,
}

#[allow(dead_code)]
struct DetectorScript {
    results: VecDeque<Result<Vec<BoundingBox>, String>>,
    fallback: Vec<BoundingBox>,
    calls: usize,
}

#[allow(dead_code)]
impl ScriptedDetector {
    pub fn always(faces: Vec<BoundingBox>) -> Self {
        Self::scripted([], faces)
    }

    pub fn scripted(
        results: impl IntoIterator<Item = Result<Vec<BoundingBox>, String>>,
        fallback: Vec<BoundingBox>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DetectorScript {
                results: results.into_iter().collect(),
                fallback,
                calls: 0,
            })),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.lock().unwrap().calls
    }
}

impl FaceDetector for ScriptedDetector {
    fn face_locations(&mut self, _image: &RgbImage) -> eyre::Result<Vec<BoundingBox>> {
        let mut script = self.inner.lock().unwrap();
        script.calls += 1;

        match script.results.pop_front() {
            Some(Ok(faces)) => Ok(faces),
            Some(Err(msg)) => Err(eyre::eyre!(msg)),
            None => Ok(script.fallback.clone()),
        }
    }
}

/// A 64x48 bgr8 frame with a horizontal gradient.
#[allow(dead_code)]
pub fn camera_frame() -> ImageFrame {
    let (width, height) = (64u32, 48u32);
    let data = (0..height)
        .flat_map(|_| (0..width).flat_map(|x| [(x * 4) as u8, 128, 255 - (x * 4) as u8]))
        .collect();
    ImageFrame::packed(width, height, rollcall_core::Encoding::Bgr8, data)
}

/// A face box well inside [camera_frame].
#[allow(dead_code)]
pub fn face_box() -> BoundingBox {
    BoundingBox::new(8, 40, 40, 16)
}

#[allow(dead_code)]
pub fn created_alice() -> HttpReply {
    HttpReply::new(
        201,
        r#"{
            "message": "Attendance marked successfully",
            "student": {"_id": "1", "name": "Alice", "registrationNumber": "R1"},
            "attendance": {"_id": "a1", "status": "present"},
            "confidence": 0.91
        }"#,
    )
}

/// Records formatted log output for the current thread while installed.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl LogCapture {
    /// Route this thread's tracing events into the capture until the
    /// guard is dropped.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_target(false)
            .without_time()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Captured lines logged at `level` (e.g. `"WARN"`).
    pub fn lines_at(&self, level: &str) -> Vec<String> {
        let buf = self.buf.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .filter(|line| line.trim_start().starts_with(level))
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
