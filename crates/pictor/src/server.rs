use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use log::{error, info, warn};
use pictor_core::{Application, Error, Request, Response, Result};

/// Largest request body accepted, in bytes
pub const MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Every path and method goes to the application
pub fn router(application: Arc<Application>) -> Router {
    Router::new().fallback(dispatch).with_state(application)
}

pub async fn serve(application: Application, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Other(format!("Failed to bind {}: {}", addr, e)))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(Arc::new(application)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Other(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
    }
    info!("Shutting down");
}

async fn dispatch(State(application): State<Arc<Application>>, request: axum::extract::Request) -> axum::response::Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_BODY_SIZE).await {
        Ok(body) => body,
        Err(e) => {
            warn!("Rejected request body: {}", e);
            return plain(StatusCode::PAYLOAD_TOO_LARGE);
        }
    };

    let query = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default();

    let request = Request::new(parts.method, parts.uri.path())
        .with_query_pairs(query)
        .with_headers(parts.headers)
        .with_body(body.to_vec());

    match tokio::task::spawn_blocking(move || application.handle(request)).await {
        Ok(response) => into_http(response),
        Err(e) => {
            error!("Request handler panicked: {}", e);
            plain(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn plain(status: StatusCode) -> axum::response::Response {
    let mut response = axum::response::Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn into_http(response: Response) -> axum::response::Response {
    let (status, headers, body) = response.into_parts();
    let mut http = axum::response::Response::new(Body::from(body));
    *http.status_mut() = status;
    *http.headers_mut() = headers;
    http
}
