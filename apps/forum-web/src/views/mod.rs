//! View models and page templates.
//!
//! Templates only see plain strings, numbers and flags; everything that
//! needs a decision (ownership, visibility, labels) is worked out here.

mod pages;

pub use pages::*;

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use askama::Template;
use chrono::{DateTime, Utc};

use forum_core::domain::{Identity, Theme, UiSettings};

use crate::middleware::error::PageResult;

/// Render `page` with `status`.
pub fn render<T: Template>(status: StatusCode, page: &T) -> PageResult {
    let html = page.render()?;
    Ok(HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(html))
}

pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y %H:%M").to_string()
}

pub struct ThemeOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Navbar, theme and settings form shared by every page.
pub struct Layout {
    pub title: String,
    pub theme: &'static str,
    pub themes: Vec<ThemeOption>,
    pub show_content: bool,
    pub show_image: bool,
    pub signed_in: bool,
    pub user_name: String,
    pub avatar_url: String,
    pub has_avatar: bool,
    /// Path the settings form returns to.
    pub back: String,
    pub offline: bool,
}

impl Layout {
    pub fn new(
        title: impl Into<String>,
        settings: UiSettings,
        viewer: Option<&Identity>,
        back: impl Into<String>,
        offline: bool,
    ) -> Self {
        let avatar_url = viewer
            .and_then(|v| v.avatar_url.clone())
            .unwrap_or_default();
        Self {
            title: title.into(),
            theme: settings.theme.as_str(),
            themes: Theme::ALL
                .into_iter()
                .map(|theme| ThemeOption {
                    value: theme.as_str(),
                    label: theme.label(),
                    selected: theme == settings.theme,
                })
                .collect(),
            show_content: settings.show_content,
            show_image: settings.show_image,
            signed_in: viewer.is_some(),
            user_name: viewer.map(|v| v.display_name().to_string()).unwrap_or_default(),
            has_avatar: !avatar_url.is_empty(),
            avatar_url,
            back: back.into(),
            offline,
        }
    }
}

/// Only local paths are followed after a form post.
pub fn safe_back(back: Option<&str>) -> &str {
    match back {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn layout_marks_selected_theme() {
        let settings = UiSettings {
            theme: Theme::Purple,
            ..Default::default()
        };
        let layout = Layout::new("Posts", settings, None, "/", false);
        let selected: Vec<_> = layout
            .themes
            .iter()
            .filter(|t| t.selected)
            .map(|t| t.value)
            .collect();
        assert_eq!(selected, vec!["purple"]);
        assert!(!layout.signed_in);
        assert_eq!(layout.theme, "purple");
    }

    #[test]
    fn back_paths_stay_local() {
        assert_eq!(safe_back(Some("/post/3")), "/post/3");
        assert_eq!(safe_back(Some("//evil.example.com")), "/");
        assert_eq!(safe_back(Some("https://evil.example.com")), "/");
        assert_eq!(safe_back(None), "/");
    }

    #[test]
    fn timestamps_are_readable() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        assert_eq!(timestamp(&at), "Mar 5, 2024 14:07");
    }
}
