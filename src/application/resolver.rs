//! Priority-ordered fallback across content sources.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use crate::application::repos::{ContentSource, SourceError};
use crate::application::schema::SchemaError;
use crate::domain::entities::ContentRecord;

const SOURCE: &str = "application::resolver";

/// Tries each source once, in order, and returns the first answer.
///
/// Unconfigured and failing sources fall through to the next one. Only a
/// schema violation in static content escapes; exhausting every source
/// yields an empty list.
pub struct ContentResolver<T> {
    sources: Vec<Arc<dyn ContentSource<T>>>,
}

impl<T> Clone for ContentResolver<T> {
    fn clone(&self) -> Self {
        Self {
            sources: self.sources.clone(),
        }
    }
}

impl<T: ContentRecord> ContentResolver<T> {
    pub fn new(sources: Vec<Arc<dyn ContentSource<T>>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    pub async fn resolve(&self) -> Result<Vec<T>, SchemaError> {
        let kind = T::KIND.as_str();

        for (position, source) in self.sources.iter().enumerate() {
            match source.fetch().await {
                Ok(Some(records)) => {
                    if position > 0 {
                        counter!("vitrine_content_fallback_total", "kind" => kind, "source" => source.name())
                            .increment(1);
                    }
                    debug!(
                        target = SOURCE,
                        kind,
                        source = source.name(),
                        count = records.len(),
                        "content resolved"
                    );
                    return Ok(records);
                }
                Ok(None) => {
                    debug!(
                        target = SOURCE,
                        kind,
                        source = source.name(),
                        "source not configured, falling through"
                    );
                }
                Err(SourceError::Schema(err)) => return Err(err),
                Err(err @ SourceError::Unavailable { .. }) => {
                    counter!("vitrine_content_source_failure_total", "kind" => kind, "source" => source.name())
                        .increment(1);
                    warn!(
                        target = SOURCE,
                        kind,
                        source = source.name(),
                        error = %err,
                        "content source failed, falling through"
                    );
                }
            }
        }

        warn!(target = SOURCE, kind, "every content source exhausted");
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::application::schema::SchemaIssue;
    use crate::domain::entities::ProjectRecord;

    enum Behaviour {
        Answer(Vec<ProjectRecord>),
        Absent,
        Fail,
        Corrupt,
    }

    struct FakeSource {
        name: &'static str,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                name,
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ContentSource<ProjectRecord> for FakeSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self) -> Result<Option<Vec<ProjectRecord>>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Answer(records) => Ok(Some(records.clone())),
                Behaviour::Absent => Ok(None),
                Behaviour::Fail => Err(SourceError::unavailable(self.name, "connection refused")),
                Behaviour::Corrupt => Err(SourceError::Schema(SchemaError {
                    schema: "projects",
                    issues: vec![SchemaIssue {
                        path: "0.title".to_string(),
                        reason: "Required".to_string(),
                    }],
                })),
            }
        }
    }

    fn erased(source: &Arc<FakeSource>) -> Arc<dyn ContentSource<ProjectRecord>> {
        source.clone()
    }

    fn project(slug: &str) -> ProjectRecord {
        ProjectRecord {
            slug: slug.to_string(),
            title: slug.to_string(),
            excerpt: String::new(),
            thumbnail: String::new(),
            client: None,
            year: None,
            category: None,
            roles: Vec::new(),
            tools: Vec::new(),
            gallery: Vec::new(),
            video: None,
            problem: None,
            solution: None,
            process: None,
            outcome: None,
        }
    }

    #[test]
    fn source_names_follow_priority_order() {
        let live = FakeSource::new("backend", Behaviour::Absent);
        let fallback = FakeSource::new("static", Behaviour::Absent);
        let resolver = ContentResolver::new(vec![erased(&live), erased(&fallback)]);
        assert_eq!(resolver.source_names(), ["backend", "static"]);
    }

    #[tokio::test]
    async fn first_answer_wins_and_later_sources_are_skipped() {
        let live = FakeSource::new("live", Behaviour::Answer(vec![project("live")]));
        let fallback = FakeSource::new("static", Behaviour::Answer(vec![project("seed")]));
        let resolver = ContentResolver::new(vec![erased(&live), erased(&fallback)]);

        let records = resolver.resolve().await.expect("resolved");
        assert_eq!(records[0].slug, "live");
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn absent_live_source_falls_back_to_static() {
        let live = FakeSource::new("live", Behaviour::Absent);
        let fallback = FakeSource::new("static", Behaviour::Answer(vec![project("seed")]));
        let resolver = ContentResolver::new(vec![erased(&live), erased(&fallback)]);

        let records = resolver.resolve().await.expect("resolved");
        assert_eq!(records, vec![project("seed")]);
        assert_eq!(live.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_live_source_falls_back_to_static() {
        let live = FakeSource::new("live", Behaviour::Fail);
        let fallback = FakeSource::new("static", Behaviour::Answer(vec![project("seed")]));
        let resolver = ContentResolver::new(vec![erased(&live), erased(&fallback)]);

        let records = resolver.resolve().await.expect("resolved");
        assert_eq!(records, vec![project("seed")]);
        assert_eq!(live.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_yields_empty_list() {
        let resolver = ContentResolver::new(vec![
            erased(&FakeSource::new("live", Behaviour::Fail)),
            erased(&FakeSource::new("db", Behaviour::Absent)),
        ]);
        assert!(resolver.resolve().await.expect("resolved").is_empty());
    }

    #[tokio::test]
    async fn schema_violation_propagates() {
        let resolver = ContentResolver::new(vec![
            erased(&FakeSource::new("live", Behaviour::Absent)),
            erased(&FakeSource::new("static", Behaviour::Corrupt)),
        ]);
        let err = resolver.resolve().await.expect_err("schema failure");
        assert!(err.to_string().contains("0.title"));
    }
}
