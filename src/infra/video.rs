//! HTTP loader backing the video preload cache.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::{Client, header::CONTENT_TYPE};

use crate::cache::{LoadedVideo, VideoLoadError, VideoLoader};

pub struct HttpVideoLoader {
    client: Client,
    max_bytes: u64,
}

impl HttpVideoLoader {
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("vitrine/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, max_bytes })
    }
}

#[async_trait]
impl VideoLoader for HttpVideoLoader {
    async fn load(&self, src: &str) -> Result<LoadedVideo, VideoLoadError> {
        let mut response = self
            .client
            .get(src)
            .send()
            .await
            .map_err(|err| VideoLoadError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VideoLoadError::Status(status.as_u16()));
        }
        if response
            .content_length()
            .is_some_and(|length| length > self.max_bytes)
        {
            return Err(VideoLoadError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| guess_content_type(src));

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| VideoLoadError::Request(err.to_string()))?
        {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(VideoLoadError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(LoadedVideo {
            content_type,
            bytes: body.freeze(),
        })
    }
}

fn guess_content_type(src: &str) -> String {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_type_from_extension_ignoring_query() {
        assert_eq!(guess_content_type("https://cdn.example/reel.mp4?v=2"), "video/mp4");
        assert_eq!(guess_content_type("https://cdn.example/reel.webm"), "video/webm");
        assert_eq!(guess_content_type("https://cdn.example/blob"), "application/octet-stream");
    }
}
