//! Health check endpoint.

use actix_web::{HttpResponse, web};

use forum_shared::dto::HealthResponse;

use crate::state::AppState;

/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.backend.to_string(),
        signed_in: state.session.current().is_some(),
    })
}

#[cfg(test)]
mod tests {
    use actix_web::test;

    use forum_shared::dto::HealthResponse;

    use crate::handlers::test_support::init_app;
    use crate::state::testing::TestApp;

    #[actix_web::test]
    async fn reports_backend_and_session() {
        let app = TestApp::new().await;
        let svc = init_app!(app);

        let body: HealthResponse = test::call_and_read_body_json(
            &svc,
            test::TestRequest::get().uri("/api/health").to_request(),
        )
        .await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.backend, "offline");
        assert!(!body.signed_in);
    }
}
