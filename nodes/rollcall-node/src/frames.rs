//! Directory-backed camera frame source.
//!
//! Each poll lists the directory, decodes image files it has not seen
//! before in file-name order, and posts them as `rgb8` frames.

use eyre::{Result, WrapErr};
use indexmap::IndexSet;
use rollcall_core::{Event, EventSender, ImageFrame};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{task::JoinHandle, time};
use tracing::{debug, warn};

const EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub struct DirectorySource {
    dir: PathBuf,
    seen: IndexSet<PathBuf>,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seen: IndexSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Decode every new image file. Files that fail to decode are
    /// skipped until they are removed from the directory.
    pub fn scan(&mut self) -> Result<Vec<ImageFrame>> {
        let entries = fs::read_dir(&self.dir)
            .wrap_err_with(|| format!("Failed to list frame directory: {}", self.dir.display()))?;

        let listed: IndexSet<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image(path))
            .collect();

        // Forget files that are gone so the set tracks the directory
        self.seen.retain(|path| listed.contains(path));

        let mut fresh: Vec<PathBuf> = listed
            .into_iter()
            .filter(|path| !self.seen.contains(path))
            .collect();
        fresh.sort();

        let mut frames = Vec::with_capacity(fresh.len());
        for path in fresh {
            match image::open(&path) {
                Ok(img) => {
                    debug!(path = %path.display(), "Loaded frame");
                    frames.push(ImageFrame::from_rgb(img.to_rgb8()));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable frame"),
            }
            self.seen.insert(path);
        }

        Ok(frames)
    }

    /// Poll the directory every `poll_interval` until the executor stops.
    pub fn spawn(mut self, poll_interval: Duration, sender: EventSender) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = time::interval(poll_interval);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                let frames = match self.scan() {
                    Ok(frames) => frames,
                    Err(e) => {
                        warn!(error = %format_args!("{e:#}"), "Frame directory scan failed");
                        continue;
                    }
                };

                for frame in frames {
                    if !sender.post(Event::Image(frame)) {
                        return;
                    }
                }
            }
        })
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}
