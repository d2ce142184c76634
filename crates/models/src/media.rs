use time::UtcDateTime;

/// An uploaded media item (image, video, audio, document).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Media {
    /// Remote identifier (primary key)
    pub id: u64,
    pub title: Option<String>,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub mime_type: Option<String>,
    /// Full-size source URL
    pub source_url: Option<String>,
    /// Intrinsic width in pixels
    pub width: Option<u32>,
    /// Intrinsic height in pixels
    pub height: Option<u32>,
    pub published_at: Option<UtcDateTime>,
}
impl Media {
    pub fn new(id: u64) -> Self {
        Self { id, ..Self::default() }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Width divided by height, used to reserve layout space before the
    /// image itself is loaded.
    ///
    /// Returns `None` unless both dimensions are known and non-zero.
    pub fn aspect_ratio(&self) -> Option<f64> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(f64::from(w) / f64::from(h)),
            _ => None,
        }
    }
}
