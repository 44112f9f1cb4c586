//! Content validation seam.
//!
//! Price extraction lives outside the gateway; this is where a caller decides
//! whether fetched content is usable before a tier is declared successful.

use url::Url;

use crate::fetch::FetchError;

/// Decides whether fetched content is usable.
///
/// Rejections surface as [`FetchError::Extraction`], which ends the current
/// tier without retrying it.
pub trait ContentValidator: Send + Sync {
    fn validate(&self, url: &Url, content: &str) -> Result<(), FetchError>;
}

/// Accepts any body that is not blank.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmptyContent;

impl ContentValidator for NonEmptyContent {
    fn validate(&self, url: &Url, content: &str) -> Result<(), FetchError> {
        if content.trim().is_empty() {
            return Err(FetchError::Extraction(format!("empty body from {url}")));
        }
        Ok(())
    }
}

/// Requires a non-blank body containing at least one marker.
///
/// Pages served to blocked scrapers (captcha walls, consent screens) come
/// back as 200 without the markup extraction relies on.
#[derive(Debug, Clone, Default)]
pub struct RequiredMarkers {
    markers: Vec<String>,
}

impl RequiredMarkers {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }
}

impl ContentValidator for RequiredMarkers {
    fn validate(&self, url: &Url, content: &str) -> Result<(), FetchError> {
        NonEmptyContent.validate(url, content)?;
        if self.markers.is_empty() || self.markers.iter().any(|m| content.contains(m.as_str())) {
            return Ok(());
        }
        Err(FetchError::Extraction(format!(
            "none of {} required marker(s) found in content from {url}",
            self.markers.len()
        )))
    }
}
