use std::sync::LazyLock;

use futures_util::Stream;
use regex::Regex;
use tracing::debug;

use crate::api::ChatChunk;
use crate::core::error::DaemonError;
use crate::core::ndjson::NdjsonDecoder;
use crate::core::progress::ProgressIndicator;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("think pattern is valid"));

const MARKUP_REPLACEMENTS: [(&str, &str); 12] = [
    ("<b>", "**"),
    ("</b>", "**"),
    ("<strong>", "**"),
    ("</strong>", "**"),
    ("<i>", "_"),
    ("</i>", "_"),
    ("<em>", "_"),
    ("</em>", "_"),
    ("<code>", "`"),
    ("</code>", "`"),
    ("<pre>", "```\n"),
    ("</pre>", "\n```"),
];

/// Drains a chat stream into one answer.
///
/// Non-empty deltas are concatenated in arrival order and tick the indicator
/// once each. The text is cleaned exactly once, after the body closes. On
/// any failure nothing partial is returned.
pub async fn aggregate_response<S, B, E, P>(
    mut decoder: NdjsonDecoder<S, ChatChunk>,
    progress: &mut P,
) -> Result<String, DaemonError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    DaemonError: From<E>,
    P: ProgressIndicator + ?Sized,
{
    let mut text = String::new();

    while let Some(chunk) = decoder.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                progress.abandon();
                return Err(err);
            }
        };

        if let Some(message) = &chunk.error {
            progress.abandon();
            return Err(DaemonError::DaemonReported(message.clone()));
        }

        let delta = chunk.content_delta();
        if !delta.is_empty() {
            text.push_str(delta);
            progress.tick();
        }
    }

    progress.finish();
    debug!(
        lines = decoder.lines_decoded(),
        bytes = text.len(),
        "Chat stream closed"
    );
    Ok(clean_response(&text))
}

/// Post-processing applied to a finished answer: drop `<think>` spans, map
/// inline HTML formatting to markdown, decode entities, and trim.
pub fn clean_response(raw: &str) -> String {
    let mut cleaned = THINK_BLOCK.replace_all(raw, "").into_owned();
    for (tag, markup) in MARKUP_REPLACEMENTS {
        cleaned = cleaned.replace(tag, markup);
    }
    html_escape::decode_html_entities(&cleaned)
        .trim()
        .to_string()
}
