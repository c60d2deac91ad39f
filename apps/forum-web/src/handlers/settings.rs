//! UI settings: the navbar form and a small JSON API.

use actix_web::{HttpResponse, web};

use forum_core::domain::{SettingsPatch, Theme, UiSettings};
use forum_shared::ApiResponse;
use forum_shared::dto::SettingsForm;

use super::see_other;
use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::views::safe_back;

/// POST /settings
pub async fn update_from_form(
    state: web::Data<AppState>,
    form: web::Form<SettingsForm>,
) -> HttpResponse {
    let form = form.into_inner();
    let theme = form.theme.as_deref().and_then(|raw| {
        raw.parse::<Theme>()
            .map_err(|e| tracing::debug!(error = %e, "Keeping current theme"))
            .ok()
    });
    // Checkboxes are only meaningful when the whole form was posted.
    let patch = if form.theme.is_some() {
        SettingsPatch {
            theme,
            show_content: Some(form.show_content()),
            show_image: Some(form.show_image()),
        }
    } else {
        SettingsPatch::default()
    };

    state.settings.update(patch);
    see_other(safe_back(form.back.as_deref()))
}

/// GET /api/settings
pub async fn get_settings(
    state: web::Data<AppState>,
) -> AppResult<web::Json<ApiResponse<UiSettings>>> {
    Ok(web::Json(ApiResponse::ok(state.settings.current())))
}

/// PATCH /api/settings
pub async fn patch_settings(
    state: web::Data<AppState>,
    patch: web::Json<SettingsPatch>,
) -> AppResult<web::Json<ApiResponse<UiSettings>>> {
    let updated = state.settings.update(patch.into_inner());
    Ok(web::Json(ApiResponse::ok_with_message(updated, "Settings updated")))
}
