//! Publish sinks for serialized messages.

use eyre::{Result, WrapErr};
use serde::Serialize;
use std::io::{self, Write};

/// Delivers a string payload on a named channel.
pub trait Publisher {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()>;
}

impl<P> Publisher for Box<P>
where
    P: Publisher + ?Sized,
{
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        (**self).publish(topic, payload)
    }
}

/// A message handed to a [ChannelPublisher].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
}

/// In-process sink feeding a flume channel.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: flume::Sender<Published>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, flume::Receiver<Published>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }
}

impl Publisher for ChannelPublisher {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        self.tx
            .send(Published {
                topic: topic.to_string(),
                payload: payload.to_string(),
            })
            .map_err(|_| eyre::eyre!("Subscriber for topic '{}' is gone", topic))
    }
}

#[derive(Serialize)]
struct Line<'a> {
    topic: &'a str,
    data: &'a str,
}

/// Writes one JSON line `{"topic": .., "data": ..}` per message.
pub struct LinePublisher<W> {
    writer: W,
}

impl LinePublisher<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W> LinePublisher<W>
where
    W: Write,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W> Publisher for LinePublisher<W>
where
    W: Write,
{
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        let line = Line {
            topic,
            data: payload,
        };
        serde_json::to_writer(&mut self.writer, &line)
            .wrap_err_with(|| format!("Failed to write message for topic '{}'", topic))?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
