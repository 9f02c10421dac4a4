use crate::ai::{CompletionOptions, Summarizer};
use crate::diff::Chunk;
use futures::stream::{self, StreamExt};
use tracing::warn;

/// Summarize every chunk with at most `concurrency` requests in flight
///
/// Results are returned in chunk order whatever order the requests finish
/// in. A chunk whose request fails yields `None`; it is not retried and the
/// other requests carry on. A `concurrency` of zero is treated as one.
pub async fn dispatch(
    summarizer: &dyn Summarizer,
    system: &str,
    chunks: &[Chunk],
    concurrency: usize,
    options: CompletionOptions,
) -> Vec<Option<String>> {
    stream::iter(chunks.iter().enumerate())
        .map(|(index, chunk)| async move {
            match summarizer.summarize(system, chunk.as_str(), options).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(chunk = index, chars = chunk.len(), error = %e, "Dropping chunk that failed to summarize");
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::pack_chunks;
    use crate::error::DeltascapeError;
    use crate::testing::FakeSummarizer;
    use std::time::Duration;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        // Budget of 1 keeps every text in its own chunk
        pack_chunks(texts.iter().copied(), 1, "\n")
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        // Earlier chunks take longer, so completion order is reversed
        let summarizer = FakeSummarizer::new(|_, user| Ok(format!("<{}>", user)))
            .with_delay(|user| {
                let n: u64 = user.trim_start_matches("chunk-").parse().unwrap_or(0);
                Duration::from_millis(60 - n * 10)
            });
        let input = chunks(&["chunk-0", "chunk-1", "chunk-2", "chunk-3", "chunk-4"]);

        let results = dispatch(&summarizer, "compress", &input, 5, CompletionOptions::compression()).await;

        let expected: Vec<Option<String>> = (0..5).map(|i| Some(format!("<chunk-{}>", i))).collect();
        assert_eq!(results, expected);
        assert_eq!(summarizer.peak_in_flight(), 5);
    }

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        let summarizer = FakeSummarizer::new(|_, user| Ok(user.to_uppercase()))
            .with_delay(|user| Duration::from_millis(5 + (user.len() as u64 % 4) * 7));
        let texts: Vec<String> = (0..12).map(|i| format!("c{}", "x".repeat(i))).collect();
        let input = chunks(&texts.iter().map(String::as_str).collect::<Vec<_>>());

        for limit in [1, 2, 3] {
            summarizer.reset();
            let results = dispatch(&summarizer, "compress", &input, limit, CompletionOptions::compression()).await;

            assert_eq!(results.len(), 12);
            assert_eq!(summarizer.call_count(), 12);
            assert!(summarizer.peak_in_flight() <= limit);
            assert_eq!(summarizer.peak_in_flight(), limit);
        }
    }

    #[tokio::test]
    async fn test_failed_chunk_is_absent_without_aborting_siblings() {
        let summarizer = FakeSummarizer::new(|_, user| {
            if user == "bad" {
                Err(DeltascapeError::summarization("model returned nothing"))
            } else {
                Ok(format!("ok {}", user))
            }
        });
        let input = chunks(&["one", "bad", "three"]);

        let results = dispatch(&summarizer, "compress", &input, 3, CompletionOptions::compression()).await;

        assert_eq!(
            results,
            vec![Some("ok one".to_string()), None, Some("ok three".to_string())]
        );
        assert_eq!(summarizer.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let summarizer = FakeSummarizer::echo();
        let results = dispatch(&summarizer, "compress", &[], 3, CompletionOptions::compression()).await;
        assert!(results.is_empty());
        assert_eq!(summarizer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_runs() {
        let summarizer = FakeSummarizer::echo();
        let input = chunks(&["a", "b"]);
        let results = dispatch(&summarizer, "compress", &input, 0, CompletionOptions::compression()).await;
        assert_eq!(results.len(), 2);
        assert_eq!(summarizer.peak_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_calls_use_given_instruction_and_temperature() {
        let summarizer = FakeSummarizer::echo();
        let input = chunks(&["a"]);
        dispatch(&summarizer, "squeeze it", &input, 3, CompletionOptions::compression()).await;

        let calls = summarizer.calls();
        assert_eq!(calls[0].system, "squeeze it");
        assert_eq!(calls[0].temperature, 0.0);
    }
}
