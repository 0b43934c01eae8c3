//! RSS 2.0 feed generation for the studio journal.

use std::fmt::Write as _;

use time::format_description::well_known::Rfc2822;

use crate::application::content::ContentService;
use crate::application::error::AppError;

/// Public identity of the site used in feeds, sitemaps and robots.txt.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub public_url: String,
    pub title: String,
    pub description: String,
}

impl SiteProfile {
    /// Base URL with exactly one trailing slash.
    pub fn base_url(&self) -> String {
        normalize_public_site_url(&self.public_url)
    }
}

#[derive(Clone)]
pub struct SyndicationService {
    content: ContentService,
    site: SiteProfile,
}

impl SyndicationService {
    pub fn new(content: ContentService, site: SiteProfile) -> Self {
        Self { content, site }
    }

    /// Generate RSS 2.0 feed XML, one `<item>` per blog, newest first.
    pub async fn rss_feed(&self) -> Result<String, AppError> {
        let blogs = self.content.get_blogs().await?;
        let base = self.site.base_url();

        let mut items = String::new();
        for blog in blogs {
            let link = format!("{base}blog/{}", blog.slug);
            let _ = write!(
                items,
                "    <item>\n      <title>{}</title>\n      <link>{link}</link>\n      <guid>{link}</guid>\n",
                xml_escape(&blog.title),
            );
            if let Some(pub_date) = blog
                .published_at()
                .and_then(|published| published.format(&Rfc2822).ok())
            {
                let _ = writeln!(items, "      <pubDate>{pub_date}</pubDate>");
            }
            let _ = write!(
                items,
                "      <description>{}</description>\n    </item>\n",
                xml_escape(&blog.excerpt),
            );
        }

        Ok(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n  <channel>\n    <title>{}</title>\n    <link>{}</link>\n    <description>{}</description>\n{}  </channel>\n</rss>\n",
            xml_escape(&self.site.title),
            base,
            xml_escape(&self.site.description),
            items
        ))
    }
}

pub(crate) fn normalize_public_site_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    format!("{trimmed}/")
}

pub(crate) fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
