//! Request loop
//!
//! Reads newline-delimited JSON requests, dispatches them to the [`Cache`] and
//! writes one JSON response line per request.
//!
//! A `put` with `BodySize > 0` is followed by two more lines: a blank
//! separator and a JSON string holding the base64 body.
//!
//! ```text
//! {"ID":1,"Command":"put","ActionID":"...","OutputID":"...","BodySize":5}
//!
//! "aGVsbG8="
//! ```

use crate::b64;
use crate::cache::Cache;
use crate::error::{CacheProgError, CacheProgResult};
use crate::protocol::message::{Command, Request, Response};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

/// Process-lifetime request counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerStats {
    /// Every `get` request received
    pub gets: u64,
    /// `get` requests answered with a miss
    pub get_misses: u64,
}

/// Result of decoding one request line
enum Incoming {
    Request(Request),
    /// Line carried an ID but was not a valid request; `has_body` marks a
    /// put whose continuation lines still sit in the stream
    Rejected {
        id: i64,
        error: CacheProgError,
        has_body: bool,
    },
}

/// Drives the request/response protocol over a reader/writer pair
pub struct RequestHandler<R, W> {
    reader: R,
    writer: W,
    cache: Arc<Cache>,
    stats: HandlerStats,
}

impl<R, W> RequestHandler<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a handler and announce the supported commands to the peer
    pub async fn new(reader: R, writer: W, cache: Arc<Cache>) -> CacheProgResult<Self> {
        let mut handler = Self {
            reader,
            writer,
            cache,
            stats: HandlerStats::default(),
        };
        handler.send(&Response::capabilities()).await?;
        Ok(handler)
    }

    /// Serve requests until the input ends
    ///
    /// Returns an error only for failures that leave the stream unusable:
    /// read/write errors and lines that cannot be tied to a request ID.
    pub async fn run(&mut self) -> CacheProgResult<()> {
        while let Some(line) = self.read_line().await? {
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }

            match decode_request(line)? {
                Incoming::Request(request) => self.process(request).await?,
                Incoming::Rejected {
                    id,
                    error,
                    has_body,
                } => {
                    warn!("Rejected request {}: {}", id, error);
                    if has_body {
                        self.skip_body().await?;
                    }
                    self.send(&Response::error(id, error.to_string())).await?;
                }
            }
        }

        debug!("Input closed");
        Ok(())
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> HandlerStats {
        self.stats
    }

    async fn process(&mut self, request: Request) -> CacheProgResult<()> {
        debug!(
            "Received request: ID={}, Command={}, ActionID={}, OutputID={}, BodySize={}",
            request.id,
            request.command,
            hex::encode(&request.action_id),
            hex::encode(&request.output_id),
            request.body_size
        );

        let outcome = match &request.command {
            Command::Put => self.handle_put(&request).await,
            Command::Get => self.handle_get(&request).await,
            Command::Close => Ok(Response::ack(request.id)),
            Command::Unknown(name) => Ok(Response::error(
                request.id,
                format!("unknown command: {}", name),
            )),
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Request {} failed: {}", request.id, e);
                Response::error(request.id, e.to_string())
            }
        };

        self.send(&response).await
    }

    async fn handle_put(&mut self, request: &Request) -> CacheProgResult<Response> {
        let data = self.read_body(request).await?;
        let size = u64::try_from(request.body_size).unwrap_or(0);

        match self
            .cache
            .put(&request.action_id, &request.output_id, &data, size)
            .await
        {
            Ok(disk_path) => Ok(Response::stored(request.id, &disk_path)),
            Err(e) => Ok(Response::error(request.id, format!("put failed: {}", e))),
        }
    }

    async fn handle_get(&mut self, request: &Request) -> CacheProgResult<Response> {
        self.stats.gets += 1;

        match self.cache.get(&request.action_id).await {
            Ok(Some(entry)) => Ok(Response::hit(request.id, &entry)),
            Ok(None) => {
                self.stats.get_misses += 1;
                Ok(Response::miss(request.id))
            }
            Err(e) => Ok(Response::error(request.id, format!("get failed: {}", e))),
        }
    }

    /// Consume the put continuation lines and return the decoded body
    async fn read_body(&mut self, request: &Request) -> CacheProgResult<Vec<u8>> {
        if request.body_size <= 0 {
            return Ok(Vec::new());
        }

        let separator = self.read_body_line().await?;
        if !separator.trim_ascii().is_empty() {
            warn!(
                "Put request {}: expected blank separator line, discarding {:?}",
                request.id,
                String::from_utf8_lossy(separator.trim_ascii())
            );
        }
        let body_line = self.read_body_line().await?;

        trace!(
            "Put request {}: body line is {} bytes",
            request.id,
            body_line.len()
        );

        let quoted = body_line.trim_ascii();
        let encoded = quoted
            .strip_prefix(b"\"")
            .and_then(|rest| rest.strip_suffix(b"\""))
            .ok_or(CacheProgError::MalformedBody)?;

        let data = b64::decode(encoded)?;
        if i64::try_from(data.len()).ok() != Some(request.body_size) {
            return Err(CacheProgError::BodySizeMismatch {
                declared: request.body_size,
                actual: data.len(),
            });
        }

        Ok(data)
    }

    /// Drop the separator and body lines of a put that was rejected before
    /// its body could be read
    async fn skip_body(&mut self) -> CacheProgResult<()> {
        for _ in 0..2 {
            if self.read_line().await?.is_none() {
                break;
            }
        }
        Ok(())
    }

    async fn read_body_line(&mut self) -> CacheProgResult<Vec<u8>> {
        match self.read_line().await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => Err(CacheProgError::BodyRead("unexpected end of input".to_string())),
            Err(e) => Err(CacheProgError::BodyRead(e.to_string())),
        }
    }

    /// Next raw line including its terminator; `None` at end of input
    async fn read_line(&mut self) -> CacheProgResult<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let read = self
            .reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(|e| CacheProgError::io("reading request", e))?;

        Ok((read > 0).then_some(line))
    }

    async fn send(&mut self, response: &Response) -> CacheProgResult<()> {
        let mut line = serde_json::to_vec(response)?;
        line.push(b'\n');

        self.writer
            .write_all(&line)
            .await
            .map_err(|e| CacheProgError::io("writing response", e))?;
        self.writer
            .flush()
            .await
            .map_err(|e| CacheProgError::io("flushing response", e))
    }
}

/// Decode a non-empty request line
///
/// Lines that are JSON objects with an integer `ID` but otherwise invalid are
/// rejected per request; everything else is fatal.
fn decode_request(line: &[u8]) -> CacheProgResult<Incoming> {
    let err = match serde_json::from_slice::<Request>(line) {
        Ok(request) => return Ok(Incoming::Request(request)),
        Err(err) => err,
    };

    if line.len() >= 2 && line.starts_with(b"\"") && line.ends_with(b"\"") {
        return Err(CacheProgError::protocol(
            "base64 body outside of put context not supported",
        ));
    }

    let value = serde_json::from_slice::<serde_json::Value>(line).ok();
    let id = value
        .as_ref()
        .and_then(|value| value.get("ID").and_then(serde_json::Value::as_i64));

    match id {
        Some(id) => Ok(Incoming::Rejected {
            id,
            error: CacheProgError::InvalidRequest(err.to_string()),
            has_body: value.as_ref().is_some_and(announces_body),
        }),
        None => Err(CacheProgError::protocol(format!(
            "failed to unmarshal request: {}, input: {:?}",
            err,
            String::from_utf8_lossy(line)
        ))),
    }
}

/// Whether a raw request object is a put followed by body lines
fn announces_body(value: &serde_json::Value) -> bool {
    let is_put = value.get("Command").and_then(serde_json::Value::as_str)
        == Some(Command::Put.as_str());
    let body_size = value
        .get("BodySize")
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(0);
    is_put && body_size > 0
}
