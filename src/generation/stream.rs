//! Streaming text generation.

use futures::stream::BoxStream;
use futures::StreamExt;

use crate::error::ThreadlineError;
use crate::provider::{ModelProvider, ProviderRequest};
use crate::types::*;

/// Stream text deltas from a model. Tools are not offered on this path.
pub async fn stream_text(
    provider: &dyn ModelProvider,
    messages: Vec<ModelMessage>,
    settings: GenerationSettings,
) -> Result<BoxStream<'static, Result<TextStreamDelta, ThreadlineError>>, ThreadlineError> {
    let request = ProviderRequest::new(messages, settings);
    provider.stream_text(&request).await
}

/// Drain a stream, calling `on_delta` for each text chunk.
pub async fn collect_stream<F>(
    mut stream: BoxStream<'static, Result<TextStreamDelta, ThreadlineError>>,
    mut on_delta: F,
) -> Result<StreamTextResult, ThreadlineError>
where
    F: FnMut(&str),
{
    let mut result = StreamTextResult::default();

    while let Some(delta) = stream.next().await {
        let delta = delta?;
        if !delta.text.is_empty() {
            on_delta(&delta.text);
            result.text.push_str(&delta.text);
        }
        if let Some(u) = delta.usage {
            result.usage = u;
        }
        if let Some(fr) = delta.finish_reason {
            result.finish_reason = Some(fr);
        }
    }

    Ok(result)
}
