use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DOCKERFILE_TYPE: &str = "dockerfile";
pub const DOCKER_IMAGE_TYPE: &str = "dockerimage";
pub const COMPOSE_TYPE: &str = "compose";

/// Content types accepted for compose recipes.
pub const COMPOSE_CONTENT_TYPES: &[&str] = &["application/x-yaml", "text/yaml", "text/x-yaml"];

/// Raw definition of how to build or run an environment's machines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InternalRecipe {
    #[serde(rename = "type")]
    pub recipe_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub content: String,
}

/// Recipe kinds supported by the environment factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeKind {
    Dockerfile,
    Image,
    Compose,
}

impl RecipeKind {
    pub fn from_type(recipe_type: &str) -> Option<Self> {
        match recipe_type {
            DOCKERFILE_TYPE => Some(Self::Dockerfile),
            DOCKER_IMAGE_TYPE => Some(Self::Image),
            COMPOSE_TYPE => Some(Self::Compose),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dockerfile => DOCKERFILE_TYPE,
            Self::Image => DOCKER_IMAGE_TYPE,
            Self::Compose => COMPOSE_TYPE,
        }
    }
}

impl fmt::Display for RecipeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InternalRecipe {
    pub fn new(recipe_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            recipe_type: recipe_type.into(),
            content_type: None,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Resolve the recipe type tag into a supported kind.
    pub fn kind(&self) -> Result<RecipeKind, ValidationError> {
        RecipeKind::from_type(self.recipe_type.trim()).ok_or_else(|| {
            ValidationError::new(format!(
                "Environment recipe type '{}' is not supported. Supported types: {DOCKERFILE_TYPE}, {DOCKER_IMAGE_TYPE}, {COMPOSE_TYPE}",
                self.recipe_type
            ))
        })
    }
}
