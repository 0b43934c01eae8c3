//! Sitemap and robots.txt generation.

use std::collections::BTreeSet;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::warn;

use crate::application::content::ContentService;
use crate::application::error::AppError;
use crate::application::syndication::{SiteProfile, xml_escape};
use crate::domain::slug::derive_slug;

const SOURCE: &str = "application::sitemap";

/// Pages that exist regardless of content.
pub const STATIC_ROUTES: &[&str] = &["/", "/about", "/blog", "/contact", "/projects", "/work"];

#[derive(Clone)]
pub struct SitemapService {
    content: ContentService,
    site: SiteProfile,
}

impl SitemapService {
    pub fn new(content: ContentService, site: SiteProfile) -> Self {
        Self { content, site }
    }

    /// Static routes, then one entry per project, blog and distinct blog tag.
    pub async fn sitemap_xml(&self) -> Result<String, AppError> {
        let base = self.site.base_url();
        let projects = self.content.get_projects(None).await?;
        let blogs = self.content.get_blogs().await?;

        let mut entries: Vec<String> = STATIC_ROUTES
            .iter()
            .map(|route| sitemap_entry(&base, route, None))
            .collect();

        entries.extend(
            projects
                .iter()
                .map(|project| sitemap_entry(&base, &format!("/projects/{}", project.slug), None)),
        );

        let mut tag_slugs = BTreeSet::new();
        for blog in &blogs {
            entries.push(sitemap_entry(
                &base,
                &format!("/blog/{}", blog.slug),
                blog.published_at(),
            ));
            for tag in &blog.tags {
                match derive_slug(tag) {
                    Ok(slug) => {
                        tag_slugs.insert(slug);
                    }
                    Err(err) => warn!(target = SOURCE, tag = %tag, error = %err, "skipping tag without slug"),
                }
            }
        }
        entries.extend(
            tag_slugs
                .iter()
                .map(|slug| sitemap_entry(&base, &format!("/blog/tag/{slug}"), None)),
        );

        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        for entry in entries {
            xml.push_str(&entry);
        }
        xml.push_str("</urlset>\n");
        Ok(xml)
    }

    pub fn robots_txt(&self) -> String {
        let sitemap_url = format!("{}sitemap.xml", self.site.base_url());
        format!("User-agent: *\nAllow: /\nSitemap: {sitemap_url}\n")
    }
}

fn sitemap_entry(base: &str, path: &str, lastmod: Option<OffsetDateTime>) -> String {
    let loc = xml_escape(&canonical_url(base, path));
    match lastmod.and_then(|dt| dt.format(&Rfc3339).ok()) {
        Some(lastmod) => format!("  <url><loc>{loc}</loc><lastmod>{lastmod}</lastmod></url>\n"),
        None => format!("  <url><loc>{loc}</loc></url>\n"),
    }
}

fn canonical_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path == "/" {
        base.to_string()
    } else {
        format!("{base}{path}")
    }
}
