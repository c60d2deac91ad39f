//! HTTP handlers and route configuration.

mod auth;
mod comments;
mod health;
mod likes;
mod posts;
mod settings;

use actix_web::http::{StatusCode, header};
use actix_web::{HttpRequest, HttpResponse, web};

use forum_core::domain::Identity;

use crate::middleware::error::{AppError, PageError, PageResult};
use crate::state::AppState;
use crate::views::{self, Layout, MessagePage};

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::FormConfig::default()
            .error_handler(|err, _req| PageError(AppError::BadRequest(err.to_string())).into()),
    )
    .service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .route("/settings", web::get().to(settings::get_settings))
            .route("/settings", web::patch().to(settings::patch_settings)),
    )
    .service(
        web::scope("/auth")
            .route("/signin", web::get().to(auth::sign_in))
            .route("/callback", web::get().to(auth::callback))
            .route("/signout", web::post().to(auth::sign_out)),
    )
    .route("/", web::get().to(posts::index))
    .route("/create", web::get().to(posts::new_post))
    .route("/create", web::post().to(posts::create))
    .route("/settings", web::post().to(settings::update_from_form))
    .service(
        web::scope("/post/{id}")
            .route("", web::get().to(posts::detail))
            .route("/edit", web::post().to(posts::update))
            .route("/delete", web::get().to(posts::confirm_delete))
            .route("/delete", web::post().to(posts::delete))
            .route("/like", web::post().to(likes::toggle))
            .route("/comments", web::post().to(comments::create))
            .route("/comments/{cid}/reply", web::post().to(comments::reply))
            .route("/comments/{cid}/toggle", web::post().to(comments::toggle)),
    );
}

/// Path and query of the current request, for the settings form to return to.
fn current_path(req: &HttpRequest) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

fn layout(
    state: &AppState,
    viewer: Option<&Identity>,
    title: impl Into<String>,
    back: impl Into<String>,
) -> Layout {
    Layout::new(
        title,
        state.settings.current(),
        viewer,
        back,
        state.backend == "offline",
    )
}

/// A page that shows only `message`.
fn message(
    state: &AppState,
    viewer: Option<&Identity>,
    status: StatusCode,
    message: impl Into<String>,
) -> PageResult {
    let message = message.into();
    views::render(
        status,
        &MessagePage {
            layout: layout(state, viewer, message.clone(), "/"),
            message,
        },
    )
}

fn see_other(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

#[cfg(test)]
pub(crate) mod test_support {
    use actix_web::body::MessageBody;
    use actix_web::dev::ServiceResponse;
    use actix_web::test;

    use forum_core::domain::{Identity, UserId};

    /// Initialise the full route table over a `TestApp`'s state.
    macro_rules! init_app {
        ($app:expr) => {
            actix_web::test::init_service(
                actix_web::App::new()
                    .app_data(actix_web::web::Data::new($app.state.clone()))
                    .configure(crate::handlers::configure_routes),
            )
            .await
        };
    }
    pub(crate) use init_app;

    pub fn identity(name: &str) -> Identity {
        Identity {
            id: UserId(uuid::Uuid::new_v4()),
            email: Some(format!("{name}@example.com")),
            user_name: Some(name.to_string()),
            full_name: None,
            avatar_url: None,
        }
    }

    pub async fn body_text<B: MessageBody>(response: ServiceResponse<B>) -> String {
        let bytes = test::read_body(response).await;
        String::from_utf8(bytes.to_vec()).expect("utf-8 body")
    }

    pub fn location<B>(response: &ServiceResponse<B>) -> String {
        response
            .headers()
            .get(actix_web::http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }
}
