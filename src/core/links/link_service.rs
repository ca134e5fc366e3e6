use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::link_models::{AuthPolicy, ChatEvent, SpreadsheetRow, StreamSnapshot};
use super::url_detector;

/// Raised when a chat event does not have the shape Twitch promises.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("malformed chat event: {0}")]
    MalformedEvent(String),
}

/// The stream metadata lookup failed or returned no stream. Recoverable:
/// the triggering event is dropped and logged, nothing is written.
#[derive(Debug, Error)]
pub enum StreamInfoError {
    #[error("stream metadata unavailable: {0}")]
    Unavailable(String),
}

/// A single spreadsheet append failed. Recoverable per link.
#[derive(Debug, Error)]
#[error("spreadsheet write failed: {0}")]
pub struct WriteError(pub String);

/// Where the current stream title comes from. Implemented by the Helix
/// client in the infra layer.
#[async_trait]
pub trait StreamInfoSource: Send + Sync {
    async fn current_title(&self) -> Result<String, StreamInfoError>;
}

/// Destination for logged links. Implemented by the Sheets client in the
/// infra layer. One remote call per row, no batching.
#[async_trait]
pub trait LinkSink: Send + Sync {
    async fn append(&self, row: &SpreadsheetRow) -> Result<(), WriteError>;
}

/// The per-message pipeline: authorization filter, URL detection, one title
/// lookup, then one append per detected link. Stateless between events.
pub struct LinkService<S: StreamInfoSource, W: LinkSink> {
    source: S,
    sink: W,
    policy: AuthPolicy,
}

impl<S: StreamInfoSource, W: LinkSink> LinkService<S, W> {
    pub fn new(source: S, sink: W, policy: AuthPolicy) -> Self {
        Self {
            source,
            sink,
            policy,
        }
    }

    /// Handles one chat event end to end. Unauthorized and URL-less
    /// messages are dropped quietly (trace only); metadata and write
    /// failures are logged here and never abort the process.
    pub async fn process(&self, event: &ChatEvent) -> Result<(), LinkError> {
        if !self.policy.permits(event) {
            tracing::trace!(user = %event.display_name, "ignoring message from unauthorized user");
            return Ok(());
        }

        let links = url_detector::find_urls(&event.body);
        if links.is_empty() {
            tracing::trace!(user = %event.display_name, "no links in message");
            return Ok(());
        }

        // Parse the timestamp before fetching the title so a malformed
        // event costs no API call.
        let observed_at = parse_sent_ts(&event.sent_ts_millis)?;

        let title = match self.source.current_title().await {
            Ok(title) => title,
            Err(StreamInfoError::Unavailable(cause)) => {
                tracing::error!(%cause, "failed to get stream title, dropping event");
                return Ok(());
            }
        };

        let snapshot = StreamSnapshot {
            title,
            observed_at,
            links,
        };

        for link in &snapshot.links {
            let row = SpreadsheetRow::from_snapshot(&snapshot, link);
            match self.sink.append(&row).await {
                Ok(()) => tracing::info!(%link, "logged link"),
                Err(err) => tracing::error!(%link, error = %err, "failed to log link"),
            }
        }

        Ok(())
    }
}

/// Converts a `tmi-sent-ts` millisecond string to a UTC instant by dropping
/// the last three characters. Anything shorter than four digits, or not a
/// digit string, is a malformed event rather than a panic.
fn parse_sent_ts(raw: &str) -> Result<DateTime<Utc>, LinkError> {
    if raw.len() < 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LinkError::MalformedEvent(format!(
            "bad send timestamp {raw:?}"
        )));
    }

    let seconds: i64 = raw[..raw.len() - 3]
        .parse()
        .map_err(|_| LinkError::MalformedEvent(format!("send timestamp out of range: {raw:?}")))?;

    DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        LinkError::MalformedEvent(format!("send timestamp out of range: {raw:?}"))
    })
}
