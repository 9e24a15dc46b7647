use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One curriculum track with independently tracked progress.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Category {
    #[default]
    #[serde(rename = "n8n")]
    N8n,
    #[serde(rename = "vibe-coding")]
    VibeCoding,
    #[serde(rename = "prompt-engineering")]
    PromptEngineering,
    #[serde(rename = "ai-developments-tools")]
    AiTools,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::N8n,
        Category::VibeCoding,
        Category::PromptEngineering,
        Category::AiTools,
    ];

    /// Key used by the backend `category` column.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Category::N8n => "n8n",
            Category::VibeCoding => "vibe-coding",
            Category::PromptEngineering => "prompt-engineering",
            Category::AiTools => "ai-developments-tools",
        }
    }

    /// Route that renders the curriculum page.
    #[must_use]
    pub fn route_path(self) -> &'static str {
        match self {
            Category::N8n => "/n8n",
            Category::VibeCoding => "/vibe-coding",
            Category::PromptEngineering => "/prompt-engineering",
            Category::AiTools => "/ai-tools",
        }
    }

    /// Short label used in tabs and table headers.
    #[must_use]
    pub fn short_label(self) -> &'static str {
        match self {
            Category::N8n => "N8N",
            Category::VibeCoding => "Vibe Coding",
            Category::PromptEngineering => "Prompt Eng",
            Category::AiTools => "AI Tools",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {raw}")]
pub struct ParseCategoryError {
    raw: String,
}

impl FromStr for Category {
    type Err = ParseCategoryError;

    /// Accepts the backend slug or the route segment (`ai-tools`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().trim_start_matches('/');
        match key {
            "n8n" => Ok(Category::N8n),
            "vibe-coding" => Ok(Category::VibeCoding),
            "prompt-engineering" => Ok(Category::PromptEngineering),
            "ai-developments-tools" | "ai-tools" => Ok(Category::AiTools),
            _ => Err(ParseCategoryError { raw: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slugs_and_routes() {
        for category in Category::ALL {
            assert_eq!(category.slug().parse::<Category>().unwrap(), category);
            assert_eq!(category.route_path().parse::<Category>().unwrap(), category);
        }
        assert!("rust".parse::<Category>().is_err());
    }

    #[test]
    fn serializes_as_backend_slug() {
        let json = serde_json::to_string(&Category::AiTools).unwrap();
        assert_eq!(json, "\"ai-developments-tools\"");
    }
}
