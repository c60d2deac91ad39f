//! Data Transfer Objects - form bodies and query strings of the web routes.

use serde::{Deserialize, Serialize};

/// `GET /` query: title filter and sort order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: String,
    pub sort: Option<String>,
}

/// `GET /post/:id` query: edit mode and the comment being replied to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailQuery {
    pub edit: Option<String>,
    pub reply: Option<String>,
}

impl DetailQuery {
    pub fn editing(&self) -> bool {
        is_truthy(self.edit.as_deref())
    }
}

/// Body of `POST /create` and `POST /post/:id/edit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Body of the comment and reply routes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub content: String,
}

/// Body of `POST /post/:id/delete`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteForm {
    pub confirm: Option<String>,
}

impl DeleteForm {
    pub fn confirmed(&self) -> bool {
        self.confirm.as_deref() == Some("yes")
    }
}

/// Body of the navbar `POST /settings` form.
///
/// Unchecked checkboxes are absent from the body, so the flags are only
/// read when `theme` shows the full form was submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsForm {
    pub theme: Option<String>,
    pub show_content: Option<String>,
    pub show_image: Option<String>,
    /// Page to return to.
    pub back: Option<String>,
}

impl SettingsForm {
    pub fn show_content(&self) -> bool {
        is_truthy(self.show_content.as_deref())
    }

    pub fn show_image(&self) -> bool {
        is_truthy(self.show_image.as_deref())
    }
}

/// `GET /auth/callback` query from the OAuth provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `GET /api/health` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// `supabase` or `offline`.
    pub backend: String,
    pub signed_in: bool,
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "on" | "yes"))
}
