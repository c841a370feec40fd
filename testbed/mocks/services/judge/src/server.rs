use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::fixtures::JudgeFixture;
use crate::handlers;

pub struct MockServer {
    fixture: Arc<JudgeFixture>,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            fixture: Arc::new(JudgeFixture::create_test_fixture()),
        }
    }

    pub fn get_fixture(&self) -> Arc<JudgeFixture> {
        self.fixture.clone()
    }

    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/users/login", post(handlers::login))
            .route("/users/register", post(handlers::register))
            .route("/users/refresh-token", get(handlers::refresh_token))
            .route("/users/logout", get(handlers::logout))
            .route("/users/reset-password", post(handlers::reset_password))
            .route("/users/reset-avatar", post(handlers::reset_avatar))
            .route("/submissions", get(handlers::list_submissions))
            .route("/submissions/submit", post(handlers::submit))
            .route("/submissions/result/:id", get(handlers::submission_result))
            .route("/submissions/analytics", get(handlers::analytics))
            .route(
                "/submissions/analytics-submission",
                get(handlers::analytics_rows),
            );

        Router::new()
            .route("/health", get(handlers::health_check))
            .nest("/api/v1", api)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.fixture.clone())
    }

    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let addr: SocketAddr = addr.parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Judge mock listening on {addr}");

        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}
