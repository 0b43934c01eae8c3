//! Read-side content service used by the HTTP handlers, feed and sitemap.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::application::error::AppError;
use crate::application::resolver::ContentResolver;
use crate::cache::VideoPreloadCache;
use crate::domain::entities::{BlogRecord, ContentRecord, ProjectRecord, WorkRecord};
use crate::domain::error::DomainError;
use crate::domain::slug::derive_slug;
use crate::domain::types::ProjectCategory;

const SOURCE: &str = "application::content";

#[derive(Clone)]
pub struct ContentService {
    blogs: ContentResolver<BlogRecord>,
    projects: ContentResolver<ProjectRecord>,
    works: ContentResolver<WorkRecord>,
    videos: Option<Arc<VideoPreloadCache>>,
}

impl ContentService {
    pub fn new(
        blogs: ContentResolver<BlogRecord>,
        projects: ContentResolver<ProjectRecord>,
        works: ContentResolver<WorkRecord>,
    ) -> Self {
        Self {
            blogs,
            projects,
            works,
            videos: None,
        }
    }

    /// Queue the videos of resolved projects and works for preloading while
    /// the video cache has room.
    pub fn with_video_warming(mut self, videos: Arc<VideoPreloadCache>) -> Self {
        self.videos = Some(videos);
        self
    }

    pub async fn get_blogs(&self) -> Result<Vec<BlogRecord>, AppError> {
        Ok(self.blogs.resolve().await?)
    }

    pub async fn get_blog_by_slug(&self, slug: &str) -> Result<BlogRecord, AppError> {
        find_by_slug(self.get_blogs().await?, slug, "blog")
    }

    /// Every distinct tag across all blogs, sorted lexicographically.
    pub async fn get_all_blog_tags(&self) -> Result<Vec<String>, AppError> {
        let tags: BTreeSet<String> = self
            .get_blogs()
            .await?
            .into_iter()
            .flat_map(|blog| blog.tags)
            .collect();
        Ok(tags.into_iter().collect())
    }

    /// Blogs carrying `tag`, matched case-insensitively or by its slug form.
    pub async fn get_blogs_by_tag(&self, tag: &str) -> Result<Vec<BlogRecord>, AppError> {
        let wanted = tag.trim();
        let blogs = self.get_blogs().await?;
        Ok(blogs
            .into_iter()
            .filter(|blog| blog.tags.iter().any(|candidate| tag_matches(candidate, wanted)))
            .collect())
    }

    pub async fn get_projects(
        &self,
        category: Option<ProjectCategory>,
    ) -> Result<Vec<ProjectRecord>, AppError> {
        let mut projects = self.projects.resolve().await?;
        self.warm_videos(&projects);
        if let Some(category) = category {
            projects.retain(|project| project.category == Some(category));
        }
        Ok(projects)
    }

    pub async fn get_project_by_slug(&self, slug: &str) -> Result<ProjectRecord, AppError> {
        find_by_slug(self.get_projects(None).await?, slug, "project")
    }

    pub async fn get_works(&self) -> Result<Vec<WorkRecord>, AppError> {
        let works = self.works.resolve().await?;
        self.warm_videos(&works);
        Ok(works)
    }

    pub async fn get_work_by_slug(&self, slug: &str) -> Result<WorkRecord, AppError> {
        find_by_slug(self.get_works().await?, slug, "work")
    }

    /// Video URLs referenced by any project or work.
    pub async fn video_sources(&self) -> Result<Vec<String>, AppError> {
        let projects = self.get_projects(None).await?;
        let works = self.get_works().await?;
        Ok(projects
            .iter()
            .filter_map(ContentRecord::video)
            .chain(works.iter().filter_map(ContentRecord::video))
            .map(str::to_string)
            .collect())
    }

    fn warm_videos<T: ContentRecord>(&self, records: &[T]) {
        let Some(videos) = self.videos.as_ref() else {
            return;
        };
        let queued = records
            .iter()
            .filter_map(T::video)
            .filter(|src| videos.warm(src).is_some())
            .count();
        if queued > 0 {
            debug!(target = SOURCE, kind = T::KIND.as_str(), queued, "video preloads queued");
        }
    }
}

fn find_by_slug<T: ContentRecord>(
    records: Vec<T>,
    slug: &str,
    entity: &'static str,
) -> Result<T, AppError> {
    records
        .into_iter()
        .find(|record| record.slug() == slug)
        .ok_or_else(|| DomainError::not_found(entity).into())
}

fn tag_matches(candidate: &str, wanted: &str) -> bool {
    candidate.eq_ignore_ascii_case(wanted)
        || derive_slug(candidate).is_ok_and(|slug| slug == wanted)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::application::repos::{ContentSource, SourceError};
    use crate::cache::{LoadedVideo, VideoLoadError, VideoLoader};

    struct Fixed<T>(Vec<T>);

    #[async_trait]
    impl<T: ContentRecord> ContentSource<T> for Fixed<T> {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch(&self) -> Result<Option<Vec<T>>, SourceError> {
            Ok(Some(self.0.clone()))
        }
    }

    fn resolver<T: ContentRecord>(records: Vec<T>) -> ContentResolver<T> {
        let source: Arc<dyn ContentSource<T>> = Arc::new(Fixed(records));
        ContentResolver::new(vec![source])
    }

    fn blog(slug: &str, date: &str, tags: &[&str]) -> BlogRecord {
        BlogRecord {
            slug: slug.to_string(),
            title: slug.replace('-', " "),
            excerpt: format!("About {slug}"),
            cover_image: format!("/images/blog/{slug}.jpg"),
            date: date.to_string(),
            content: None,
            author: None,
            read_time: None,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        }
    }

    fn project(slug: &str, category: Option<ProjectCategory>, video: Option<&str>) -> ProjectRecord {
        ProjectRecord {
            slug: slug.to_string(),
            title: slug.to_string(),
            excerpt: String::new(),
            thumbnail: format!("/images/projects/{slug}.jpg"),
            client: None,
            year: None,
            category,
            roles: Vec::new(),
            tools: Vec::new(),
            gallery: Vec::new(),
            video: video.map(str::to_string),
            problem: None,
            solution: None,
            process: None,
            outcome: None,
        }
    }

    fn service(blogs: Vec<BlogRecord>, projects: Vec<ProjectRecord>) -> ContentService {
        ContentService::new(resolver(blogs), resolver(projects), resolver(Vec::new()))
    }

    #[tokio::test]
    async fn tags_are_deduplicated_and_sorted() {
        let service = service(
            vec![
                blog("a", "2024-01-01", &["Typography", "Branding"]),
                blog("b", "2024-02-01", &["Branding", "Motion"]),
            ],
            Vec::new(),
        );

        let tags = service.get_all_blog_tags().await.expect("tags");
        assert_eq!(tags, ["Branding", "Motion", "Typography"]);
    }

    #[tokio::test]
    async fn tag_filter_accepts_label_or_slug() {
        let service = service(
            vec![
                blog("a", "2024-01-01", &["Design Systems"]),
                blog("b", "2024-02-01", &["Motion"]),
            ],
            Vec::new(),
        );

        let by_label = service.get_blogs_by_tag("design systems").await.expect("blogs");
        let by_slug = service.get_blogs_by_tag("design-systems").await.expect("blogs");
        assert_eq!(by_label.len(), 1);
        assert_eq!(by_slug, by_label);
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let service = service(vec![blog("a", "2024-01-01", &[])], Vec::new());

        assert!(service.get_blog_by_slug("a").await.is_ok());
        let err = service.get_blog_by_slug("missing").await.expect_err("missing");
        assert!(matches!(err, AppError::Domain(DomainError::NotFound { entity: "blog" })));
    }

    #[tokio::test]
    async fn category_filter_keeps_matching_projects() {
        let service = service(
            Vec::new(),
            vec![
                project("site", Some(ProjectCategory::WebDev), None),
                project("logo", Some(ProjectCategory::Branding), None),
                project("misc", None, None),
            ],
        );

        let branding = service
            .get_projects(Some(ProjectCategory::Branding))
            .await
            .expect("projects");
        assert_eq!(branding.len(), 1);
        assert_eq!(branding[0].slug, "logo");
        assert_eq!(service.get_projects(None).await.expect("projects").len(), 3);
    }

    struct InstantLoader;

    #[async_trait]
    impl VideoLoader for InstantLoader {
        async fn load(&self, _src: &str) -> Result<LoadedVideo, VideoLoadError> {
            Ok(LoadedVideo {
                content_type: "video/mp4".to_string(),
                bytes: bytes::Bytes::from_static(b"mp4"),
            })
        }
    }

    #[tokio::test]
    async fn resolving_projects_warms_their_videos() {
        let videos = Arc::new(VideoPreloadCache::new(
            Arc::new(InstantLoader),
            NonZeroUsize::new(4).expect("non-zero"),
        ));
        let service = service(
            Vec::new(),
            vec![
                project("reel", None, Some("https://cdn.example/reel.mp4")),
                project("still", None, None),
            ],
        )
        .with_video_warming(Arc::clone(&videos));

        service.get_projects(None).await.expect("projects");
        assert!(
            videos.is_loading("https://cdn.example/reel.mp4")
                || videos.is_loaded("https://cdn.example/reel.mp4")
        );
    }

    #[derive(Default)]
    struct CountingLoader {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl VideoLoader for CountingLoader {
        async fn load(&self, src: &str) -> Result<LoadedVideo, VideoLoadError> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(LoadedVideo {
                content_type: "video/mp4".to_string(),
                bytes: bytes::Bytes::from(src.to_string()),
            })
        }
    }

    #[tokio::test]
    async fn repeated_listings_do_not_churn_a_full_video_cache() {
        let loader = Arc::new(CountingLoader::default());
        let videos = Arc::new(VideoPreloadCache::new(
            loader.clone(),
            NonZeroUsize::new(1).expect("non-zero"),
        ));
        let service = service(
            Vec::new(),
            vec![
                project("alpha", None, Some("https://cdn.example/alpha.mp4")),
                project("beta", None, Some("https://cdn.example/beta.mp4")),
            ],
        )
        .with_video_warming(Arc::clone(&videos));

        for _ in 0..5 {
            service.get_projects(None).await.expect("projects");
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
        }

        assert_eq!(loader.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(videos.len(), 1);
    }
}
