// # netpol-watch-json
//
// Newline-delimited JSON implementation of the netpol WatchSource trait.
//
// ## Purpose
//
// Feeds the controller from any byte stream — a file, a FIFO, stdin —
// without cluster plumbing. One JSON object per line:
//
// ```json
// {"type":"added","pod":{"namespace":"default","name":"web","containers":[]}}
// {"type":"updated","pod":{"namespace":"default","name":"web","containers":[]}}
// {"type":"removed","key":"default/web"}
// {"type":"removed","pod":{"namespace":"default","name":"web","containers":[]}}
// {"type":"sync"}
// ```
//
// The `sync` line marks the end of the initial listing; the controller
// will not start workers before it. Removal lines may carry either a full
// terminal snapshot (`pod`) or an identity-only tombstone (`key`).
//
// ## Error behavior
//
// A line that does not parse is logged at warn level and skipped — a
// malformed notification is not a queueable unit of work and must never
// wedge the stream. EOF ends the stream, which the controller treats as
// "no further work".

use std::pin::Pin;
use std::sync::Mutex;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use netpol_core::{Pod, Removed, WatchEvent, WatchSource};

/// Wire form of a single watch line
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Added { pod: Pod },
    Updated { pod: Pod },
    Removed { pod: Option<Pod>, key: Option<String> },
    Sync,
}

/// Parse one line into a watch event
///
/// Returns `None` for blank and malformed lines (the latter with a log).
fn parse_line(line: &str) -> Option<WatchEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<WireEvent>(trimmed) {
        Ok(WireEvent::Added { pod }) => Some(WatchEvent::Added(pod)),
        Ok(WireEvent::Updated { pod }) => Some(WatchEvent::Updated(pod)),
        Ok(WireEvent::Removed { pod: Some(pod), .. }) => {
            Some(WatchEvent::Removed(Removed::Object(pod)))
        }
        Ok(WireEvent::Removed {
            pod: None,
            key: Some(key),
        }) => Some(WatchEvent::Removed(Removed::Tombstone { key })),
        Ok(WireEvent::Removed { pod: None, key: None }) => {
            warn!("skipping removal line with neither pod nor key");
            None
        }
        Ok(WireEvent::Sync) => Some(WatchEvent::SyncComplete),
        Err(error) => {
            warn!(%error, "skipping unparseable watch line");
            None
        }
    }
}

/// Watch source reading newline-delimited JSON from an async reader
pub struct JsonWatchSource<R> {
    reader: Mutex<Option<R>>,
}

impl<R> JsonWatchSource<R> {
    /// Wrap a reader; the stream starts when `events()` is first called
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
        }
    }
}

impl<R> WatchSource for JsonWatchSource<R>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    /// The event stream; a second call yields an already-ended stream
    fn events(&self) -> Pin<Box<dyn Stream<Item = WatchEvent> + Send + 'static>> {
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(reader) = reader else {
            warn!("events() called more than once on JsonWatchSource");
            return Box::pin(tokio_stream::empty());
        };

        let lines = LinesStream::new(BufReader::new(reader).lines());
        Box::pin(lines.filter_map(|line| match line {
            Ok(line) => parse_line(&line),
            Err(error) => {
                warn!(%error, "watch input read error; skipping line");
                None
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netpol_core::EntityKey;

    #[test]
    fn parses_all_wire_forms() {
        let added = parse_line(
            r#"{"type":"added","pod":{"namespace":"default","name":"web","containers":[]}}"#,
        )
        .unwrap();
        assert!(matches!(added, WatchEvent::Added(ref p) if p.name == "web"));

        let removed = parse_line(r#"{"type":"removed","key":"default/web"}"#).unwrap();
        let WatchEvent::Removed(removed) = removed else {
            panic!("expected a removal");
        };
        assert_eq!(removed.key().unwrap(), EntityKey::new("default", "web"));

        assert_eq!(parse_line(r#"{"type":"sync"}"#), Some(WatchEvent::SyncComplete));
    }

    #[test]
    fn skips_blank_and_malformed_lines() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("not json"), None);
        assert_eq!(parse_line(r#"{"type":"removed"}"#), None);
    }

    #[tokio::test]
    async fn streams_events_until_eof() {
        let input = concat!(
            r#"{"type":"added","pod":{"namespace":"default","name":"a","containers":[]}}"#,
            "\n",
            "garbage line\n",
            r#"{"type":"sync"}"#,
            "\n",
        );
        let source = JsonWatchSource::new(std::io::Cursor::new(input.as_bytes().to_vec()));
        let mut stream = source.events();

        assert!(matches!(stream.next().await, Some(WatchEvent::Added(_))));
        assert_eq!(stream.next().await, Some(WatchEvent::SyncComplete));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn second_subscription_is_empty() {
        let source = JsonWatchSource::new(std::io::Cursor::new(Vec::new()));
        let _first = source.events();
        let mut second = source.events();
        assert_eq!(second.next().await, None);
    }
}
