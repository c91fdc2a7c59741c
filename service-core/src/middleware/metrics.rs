use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};
use std::time::Instant;

/// Route label for requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Route template (`/items/:id`) rather than the raw path, so the series
/// count stays bounded by the number of routes.
pub fn route_label(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned())
}

/// Records `http_requests_total` and `http_request_duration_seconds`.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = route_label(&req);

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    let labels = [("method", method), ("path", route), ("status", status)];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{self, HeaderValue},
        middleware::from_fn,
        routing::get,
    };
    use tower::ServiceExt;

    async fn echo_route(req: Request, next: Next) -> Response {
        let route = route_label(&req);
        let mut res = next.run(req).await;
        res.headers_mut()
            .insert("x-route", HeaderValue::from_str(&route).unwrap());
        res
    }

    fn app() -> Router {
        Router::new()
            .route("/items/:id", get(|| async { "item" }))
            .layer(from_fn(echo_route))
    }

    async fn route_for(uri: &str) -> String {
        let req = http::Request::builder().uri(uri).body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        res.headers()["x-route"].to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn matched_requests_use_the_route_template() {
        assert_eq!(route_for("/items/42").await, "/items/:id");
        assert_eq!(route_for("/items/43").await, "/items/:id");
    }

    #[tokio::test]
    async fn unknown_paths_share_one_label() {
        assert_eq!(route_for("/wp-admin/setup.php").await, UNMATCHED_ROUTE);
        assert_eq!(route_for("/random/8f3a").await, UNMATCHED_ROUTE);
    }
}
