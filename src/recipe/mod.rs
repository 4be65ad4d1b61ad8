//! Recipe feed collaborator.
//!
//! Fetches the static JSON catalog, decodes it, and asks the image cache for
//! each recipe's photos. Errors from this layer carry a user-facing message
//! via [`RecipeError::user_message`](crate::error::RecipeError::user_message).

mod model;
mod pipeline;

pub use model::{parse_recipes, Recipe, RecipeResponse};
pub use pipeline::{
    RecipeLoad, RecipePipeline, DEFAULT_FEED_URL, EMPTY_FEED_URL, MALFORMED_FEED_URL,
};
