//! Token source abstraction and NDJSON decoding.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::error::{GenerationError, GenerationResult};
use super::types::{GenerationRequest, TokenEvent};

/// Lazy, non-restartable sequence of backend events.
///
/// Ends after the first terminal event or the first error. Ending without
/// either means the backend closed the connection early. Dropping the stream
/// releases the underlying connection.
pub type TokenStream = BoxStream<'static, GenerationResult<TokenEvent>>;

/// Something that can open a generation stream.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Open one generation. Fails before yielding anything if the backend is
    /// unreachable or rejects the request.
    async fn open(&self, request: GenerationRequest) -> GenerationResult<TokenStream>;
}

/// Decode newline-delimited JSON events from `reader`.
///
/// Blank lines are skipped. A line that does not decode ends the stream with
/// [`GenerationError::Decode`].
pub fn decode_lines<R>(reader: R) -> TokenStream
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    stream::unfold(Some(reader.lines()), |state| async move {
        let mut lines = state?;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    return match serde_json::from_str::<TokenEvent>(line) {
                        Ok(event) => {
                            let next = (!event.is_terminal()).then_some(lines);
                            Some((Ok(event), next))
                        }
                        Err(source) => Some((
                            Err(GenerationError::Decode {
                                line: line.to_string(),
                                source,
                            }),
                            None,
                        )),
                    };
                }
                Ok(None) => return None,
                Err(err) => return Some((Err(GenerationError::Io(err)), None)),
            }
        }
    })
    .boxed()
}
