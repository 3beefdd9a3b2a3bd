use std::{pin::Pin, sync::Arc};

use futures::{Stream, StreamExt};

/// A record plus the 1-based line of the input it came from.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub line: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("line {line}: {reason}")]
    Record { line: u64, reason: String },
    #[error("line {line} rejected: {reason}")]
    Transform { line: u64, reason: String },
    #[error("sink error: {0}")]
    Sink(String),
}

impl PipelineError {
    /// Per-record failures are counted and skipped; everything else stops
    /// the pipeline.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::Record { .. } | Self::Transform { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub written: u64,
    pub rejected: u64,
}

pub type EnvelopeStream<T> = Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(&self) -> EnvelopeStream<T>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn run<S>(&self, input: S) -> Result<LoadStats, PipelineError>
    where
        S: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static;
}

pub struct Pipeline<S, T, K> {
    pub source: S,
    pub transforms: Vec<Arc<dyn Transform<T, T> + Send + Sync>>,
    pub sink: K,
}

impl<T, S, K> Pipeline<S, T, K>
where
    T: Send + 'static,
    S: Source<T> + Send + Sync + 'static,
    K: Sink<T> + Send + Sync + 'static,
{
    pub async fn run(self) -> Result<LoadStats, PipelineError> {
        let mut stream = self.source.stream().await;

        for t in self.transforms {
            stream = Box::pin(stream.then(move |item| {
                let t = t.clone();
                async move {
                    match item {
                        Ok(env) => t.apply(env).await,
                        Err(e) => Err(e),
                    }
                }
            }));
        }

        self.sink.run(stream).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct VecSource(Vec<i64>);

    #[async_trait::async_trait]
    impl Source<i64> for VecSource {
        async fn stream(&self) -> EnvelopeStream<i64> {
            let items: Vec<_> = self
                .0
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    Ok(Envelope {
                        payload: *v,
                        line: i as u64 + 2,
                    })
                })
                .collect();
            Box::pin(futures::stream::iter(items))
        }
    }

    struct RejectOdd;

    #[async_trait::async_trait]
    impl Transform<i64, i64> for RejectOdd {
        async fn apply(&self, input: Envelope<i64>) -> Result<Envelope<i64>, PipelineError> {
            if input.payload % 2 == 0 {
                Ok(input)
            } else {
                Err(PipelineError::Transform {
                    line: input.line,
                    reason: "odd".to_string(),
                })
            }
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<i64>>);

    #[async_trait::async_trait]
    impl Sink<i64> for Collect {
        async fn run<S>(&self, mut input: S) -> Result<LoadStats, PipelineError>
        where
            S: Stream<Item = Result<Envelope<i64>, PipelineError>> + Send + Unpin + 'static,
        {
            let mut stats = LoadStats::default();
            while let Some(item) = input.next().await {
                match item {
                    Ok(env) => {
                        self.0.lock().unwrap().push(env.payload);
                        stats.written += 1;
                    }
                    Err(e) if e.is_record_level() => stats.rejected += 1,
                    Err(e) => return Err(e),
                }
            }
            Ok(stats)
        }
    }

    #[tokio::test]
    async fn transforms_run_between_source_and_sink() {
        let pipeline: Pipeline<_, i64, _> = Pipeline {
            source: VecSource(vec![1, 2, 3, 4]),
            transforms: vec![Arc::new(RejectOdd)],
            sink: Collect::default(),
        };

        let stats = pipeline.run().await.unwrap();
        assert_eq!(stats, LoadStats { written: 2, rejected: 2 });
    }

    #[test]
    fn only_record_errors_are_skippable() {
        assert!(PipelineError::Record {
            line: 3,
            reason: "bad".into()
        }
        .is_record_level());
        assert!(!PipelineError::Sink("down".into()).is_record_level());
        assert!(!PipelineError::Source("missing".into()).is_record_level());
    }
}
