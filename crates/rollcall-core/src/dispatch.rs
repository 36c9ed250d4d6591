//! Single-consumer event dispatch.
//!
//! Timers and input sources post [Event]s into a bounded queue through an
//! [EventSender]. [Executor::spin] takes one event at a time and awaits
//! the handler until it returns, so callbacks never overlap and never get
//! cancelled halfway. Shutdown is only observed between callbacks.

use crate::frame::ImageFrame;
use eyre::{Result, ensure};
use flume::TrySendError;
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, trace};

/// Default queue depth, same as the history depth of the camera
/// subscription.
pub const DEFAULT_QUEUE_DEPTH: usize = 10;

#[derive(Debug, Clone)]
pub enum Event {
    Tick,
    Image(ImageFrame),
}

/// Callbacks run by [Executor::spin]. Both default to no-ops.
pub trait EventHandler {
    fn on_tick(&mut self) -> impl Future<Output = ()> {
        async {}
    }

    fn on_image(&mut self, frame: ImageFrame) -> impl Future<Output = ()> {
        async move { drop(frame) }
    }
}

/// Producer handle of the event queue.
///
/// When the queue is full the oldest pending event is discarded to make
/// room, like a keep-last history.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: flume::Sender<Event>,
    evict: flume::Receiver<Event>,
    dropped: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

impl EventSender {
    /// Post an event. Returns `false` once the executor has stopped.
    pub fn post(&self, event: Event) -> bool {
        let mut event = event;

        loop {
            if self.closed.load(Ordering::Acquire) {
                return false;
            }

            match self.tx.try_send(event) {
                Ok(()) => return true,
                Err(TrySendError::Disconnected(_)) => return false,
                Err(TrySendError::Full(rejected)) => {
                    if self.evict.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        trace!("Event queue full, dropped the oldest event");
                    }
                    event = rejected;
                }
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Counters reported when [Executor::spin] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpinStats {
    pub ticks: u64,
    pub images: u64,
    /// Events evicted from a full queue.
    pub dropped: u64,
}

/// Owns the event queue and the producer tasks attached to it.
pub struct Executor {
    tx: flume::Sender<Event>,
    rx: flume::Receiver<Event>,
    dropped: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Executor {
    pub fn new(queue_depth: usize) -> Result<Self> {
        ensure!(queue_depth > 0, "queue_depth must be greater than zero");

        let (tx, rx) = flume::bounded(queue_depth);
        Ok(Self {
            tx,
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
            tasks: Vec::new(),
        })
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
            evict: self.rx.clone(),
            dropped: self.dropped.clone(),
            closed: self.closed.clone(),
        }
    }

    /// Post [Event::Tick] every `period`, first one `period` from now.
    ///
    /// Must be called within a tokio runtime.
    pub fn add_timer(&mut self, period: Duration) -> Result<()> {
        ensure!(!period.is_zero(), "Timer period must be greater than zero");

        let sender = self.sender();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if !sender.post(Event::Tick) {
                    break;
                }
            }
        });

        debug!(period = ?period, "Created timer");
        self.tasks.push(handle);
        Ok(())
    }

    /// Hand a producer task to the executor. It is aborted when
    /// [spin](Executor::spin) returns.
    pub fn attach(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    /// Dispatch events to `handler` until `shutdown` resolves or every
    /// sender is gone.
    pub async fn spin<H, F>(self, handler: &mut H, shutdown: F) -> SpinStats
    where
        H: EventHandler,
        F: Future<Output = ()>,
    {
        let Executor {
            tx,
            rx,
            dropped,
            closed,
            tasks,
        } = self;

        // Only external senders keep the queue open.
        drop(tx);

        let mut stats = SpinStats::default();
        tokio::pin!(shutdown);

        loop {
            let event = tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                event = rx.recv_async() => match event {
                    Ok(event) => event,
                    Err(_) => {
                        debug!("All event senders dropped");
                        break;
                    }
                },
            };

            match event {
                Event::Tick => {
                    stats.ticks += 1;
                    handler.on_tick().await;
                }
                Event::Image(frame) => {
                    stats.images += 1;
                    handler.on_image(frame).await;
                }
            }
        }

        closed.store(true, Ordering::Release);
        for task in tasks {
            task.abort();
        }

        stats.dropped = dropped.load(Ordering::Relaxed);
        stats
    }
}
