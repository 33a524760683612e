use serde::Deserialize;

/// An artist as embedded in a track object. Only the name is kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PartialArtist {
    name: String,
}

impl PartialArtist {
    pub fn name(&self) -> &str {
        &self.name
    }
}
