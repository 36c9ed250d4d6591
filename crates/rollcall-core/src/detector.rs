//! Face-location capability.

use crate::frame::BoundingBox;
use eyre::{Result, WrapErr};
use image::{RgbImage, imageops};
use rustface::ImageData;
use std::path::Path;
use tracing::debug;

/// Locates faces in an RGB image.
///
/// The returned order is the detector's own; callers take the first box
/// without further ranking. `&mut self` allows stateful detectors.
pub trait FaceDetector {
    fn face_locations(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>>;
}

impl<D> FaceDetector for Box<D>
where
    D: FaceDetector + ?Sized,
{
    fn face_locations(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>> {
        (**self).face_locations(image)
    }
}

/// Tuning knobs of the SeetaFace cascade.
#[derive(Debug, Clone)]
pub struct SeetaParams {
    pub min_face_size: u32,
    pub score_threshold: f64,
    pub pyramid_scale_factor: f32,
    pub slide_window_step: u32,
}

impl Default for SeetaParams {
    fn default() -> Self {
        Self {
            min_face_size: 40,
            score_threshold: 2.0,
            pyramid_scale_factor: 0.8,
            slide_window_step: 4,
        }
    }
}

/// [FaceDetector] backed by the `rustface` SeetaFace frontal detector.
pub struct SeetaDetector {
    inner: Box<dyn rustface::Detector>,
}

impl SeetaDetector {
    /// Load the cascade from a SeetaFace model file
    /// (e.g. `seeta_fd_frontal_v1.0.bin`).
    pub fn load(model: impl AsRef<Path>, params: &SeetaParams) -> Result<Self> {
        let model = model.as_ref();
        let path = model
            .to_str()
            .ok_or_else(|| eyre::eyre!("Model path is not valid UTF-8: {}", model.display()))?;

        let mut inner = rustface::create_detector(path)
            .map_err(|e| eyre::eyre!("{}", e))
            .wrap_err_with(|| format!("Failed to load face model: {}", model.display()))?;

        inner.set_min_face_size(params.min_face_size);
        inner.set_score_thresh(params.score_threshold);
        inner.set_pyramid_scale_factor(params.pyramid_scale_factor);
        inner.set_slide_window_step(params.slide_window_step, params.slide_window_step);

        Ok(Self { inner })
    }
}

impl FaceDetector for SeetaDetector {
    fn face_locations(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>> {
        let gray = imageops::grayscale(image);
        let (width, height) = gray.dimensions();
        let mut data = ImageData::new(gray.as_raw(), width, height);

        let boxes: Vec<_> = self
            .inner
            .detect(&mut data)
            .into_iter()
            .map(|face| {
                let rect = face.bbox();
                BoundingBox::from_rect(rect.x(), rect.y(), rect.width(), rect.height())
            })
            .collect();

        debug!(faces = boxes.len(), width, height, "Ran face detection");
        Ok(boxes)
    }
}
