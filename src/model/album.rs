use super::Image;
use serde::Deserialize;

/// An album as embedded in a track object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PartialAlbum {
    name: String,
    #[serde(default)]
    images: Vec<Image>,
}

impl PartialAlbum {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The album's cover art in various sizes, widest first.
    pub fn images(&self) -> &[Image] {
        &self.images
    }

    /// The first (widest) cover art image, if the album has any.
    pub fn cover(&self) -> Option<&Image> {
        self.images.first()
    }
}
