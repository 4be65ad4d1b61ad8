use serde::{Deserialize, Serialize};

use crate::error::RecipeError;

/// Top-level feed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub recipes: Vec<Recipe>,
}

/// One recipe in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "uuid")]
    pub id: String,
    pub cuisine: String,
    pub name: String,
    pub photo_url_large: String,
    pub photo_url_small: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub youtube_url: Option<String>,
}

impl Recipe {
    /// Both photo URLs, large first.
    pub fn photo_urls(&self) -> [&str; 2] {
        [self.photo_url_large.as_str(), self.photo_url_small.as_str()]
    }
}

/// Decode a feed document into its recipes.
///
/// # Errors
///
/// Returns [`RecipeError::Decoding`] if the data is not a valid feed. A feed
/// with an empty `recipes` array is valid.
pub fn parse_recipes(data: &[u8]) -> Result<Vec<Recipe>, RecipeError> {
    serde_json::from_slice::<RecipeResponse>(data)
        .map(|response| response.recipes)
        .map_err(|e| RecipeError::Decoding(e.to_string()))
}
