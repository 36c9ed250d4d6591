//! This library bridges a publish/subscribe bus to an HTTP attendance
//! API with two independent components:
//!
//! - [StatsAggregator] polls a statistics endpoint on a timer and
//!   publishes a [StatsSummary].
//! - [FaceForwarder] takes camera frames, locates a face, posts the crop
//!   for identification and publishes an [AttendanceEvent] on a match.
//!
//! Both run under an [Executor], which delivers timer ticks and frames
//! one at a time.
//!
//! # Usage
//!
//! ```rust
//! use rollcall_core::{
//!     AggregatorConfig, ChannelPublisher, Executor, HttpReply, StatisticsSource,
//!     StatsAggregator, TickOutcome,
//! };
//!
//! // Any statistics source will do; this one answers with a fixed body.
//! struct Fixed;
//!
//! impl StatisticsSource for Fixed {
//!     async fn fetch_statistics(&self) -> eyre::Result<HttpReply> {
//!         Ok(HttpReply::new(
//!             200,
//!             r#"[{"student":"s1","studentName":"Alice","presentPercentage":90}]"#,
//!         ))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> eyre::Result<()> {
//! let (publisher, rx) = ChannelPublisher::new();
//! let mut aggregator = StatsAggregator::new(AggregatorConfig::default(), Fixed, publisher);
//!
//! // One tick by hand ...
//! let TickOutcome::Published(summary) = aggregator.tick().await else {
//!     panic!("expected a summary");
//! };
//! assert_eq!(summary.total_students, 1);
//! assert_eq!(rx.recv()?.topic, "attendance_statistics");
//!
//! // ... or on a timer until shutdown.
//! let mut executor = Executor::new(10)?;
//! executor.add_timer(aggregator.config().publish_rate)?;
//! executor.spin(&mut aggregator, async {}).await;
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod client;
mod config;
pub mod detector;
pub mod dispatch;
pub mod forwarder;
pub mod frame;
mod gate;
pub mod publisher;
pub mod stats;
mod types;

pub use aggregator::{StatsAggregator, TickOutcome};
pub use client::{AttendanceClient, FaceIdentifier, StatisticsSource};
pub use config::*;
pub use detector::{FaceDetector, SeetaDetector, SeetaParams};
pub use dispatch::{Event, EventHandler, EventSender, Executor, SpinStats};
pub use forwarder::{FaceForwarder, FrameOutcome};
pub use frame::{BoundingBox, Encoding, ImageFrame};
pub use gate::RateGate;
pub use publisher::{ChannelPublisher, LinePublisher, Published, Publisher};
pub use types::*;
