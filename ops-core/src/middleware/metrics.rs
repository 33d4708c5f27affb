use axum::{extract::Request, middleware::Next, response::Response};
use metrics::{counter, histogram};
use std::time::Instant;
use uuid::Uuid;

/// Replace UUID path segments with `:id` so routes with document ids do
/// not explode the label cardinality.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.parse::<Uuid>().is_ok() {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status().as_u16().to_string();

    let labels = [("method", method), ("path", path), ("status", status)];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::normalize_path;

    #[test]
    fn uuid_segments_collapse_to_id() {
        let path = "/invoices/a7f1f0c2-8c3f-4a2e-9a3b-0d4c1b2e3f4a/payments";
        assert_eq!(normalize_path(path), "/invoices/:id/payments");
    }

    #[test]
    fn static_paths_pass_through() {
        assert_eq!(normalize_path("/invoices/stats"), "/invoices/stats");
    }
}
