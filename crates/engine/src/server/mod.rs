mod error;
mod routes;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{workflow::GraphEngine, Result};

pub use error::ApiError;
pub use routes::{
    CreateGraphRequest, CreateGraphResponse, RunGraphRequest, RunGraphResponse, RunStateResponse,
};

/// HTTP front end for a [`GraphEngine`]. `S` is the shared-state type that
/// `initial_state` payloads are decoded into.
pub struct Server<S> {
    engine: Arc<GraphEngine<S>>,
}

impl<S> Server<S>
where
    S: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    pub fn new(engine: Arc<GraphEngine<S>>) -> Self {
        Self { engine }
    }

    pub fn build_router(self) -> Router {
        Router::new()
            .route("/health", get(routes::health))
            .route("/metrics", get(routes::export_metrics))
            .route("/graph/create", post(routes::create_graph::<S>))
            .route("/graph/run", post(routes::run_graph::<S>))
            .route("/graph/state/{run_id}", get(routes::get_run_state::<S>))
            .layer(TraceLayer::new_for_http())
            .with_state(self.engine)
    }

    pub async fn start(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, self.build_router()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::code_review;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_responds_ok() {
        let app = Server::new(Arc::new(code_review::build_engine())).build_router();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_run_is_not_found() {
        let app = Server::new(Arc::new(code_review::build_engine())).build_router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/graph/state/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
