// SPDX-License-Identifier: Apache-2.0

use crate::http::handlers::{propagated_request_id, with_request_id};
use crate::*;

const METRIC_SUBSYSTEM: &str = "fieldline";
const METRIC_VERSION: &str = env!("CARGO_PKG_VERSION");

fn percentile_ns(values: &[u64], pct: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut v = values.to_vec();
    v.sort_unstable();
    let idx = ((v.len() as f64 - 1.0) * pct).round() as usize;
    v[idx]
}

pub(crate) async fn metrics_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let started = Instant::now();
    let mut body = format!(
        "fieldline_server_ready{{subsystem=\"{}\",version=\"{}\"}} {}\n\
fieldline_server_accepting_requests{{subsystem=\"{}\",version=\"{}\"}} {}\n",
        METRIC_SUBSYSTEM,
        METRIC_VERSION,
        u8::from(state.ready.load(Ordering::Relaxed)),
        METRIC_SUBSYSTEM,
        METRIC_VERSION,
        u8::from(state.accepting_requests.load(Ordering::Relaxed)),
    );
    let req_counts = state.metrics.counts.lock().await.clone();
    for ((route, status), count) in req_counts {
        body.push_str(&format!(
            "fieldline_http_requests_total{{subsystem=\"{}\",version=\"{}\",route=\"{}\",status=\"{}\"}} {}\n",
            METRIC_SUBSYSTEM, METRIC_VERSION, route, status, count
        ));
    }
    let req_lat = state.metrics.latency_ns.lock().await.clone();
    for (route, vals) in req_lat {
        body.push_str(&format!(
            "fieldline_http_request_latency_p95_seconds{{subsystem=\"{}\",version=\"{}\",route=\"{}\"}} {:.6}\n",
            METRIC_SUBSYSTEM,
            METRIC_VERSION,
            route,
            percentile_ns(&vals, 0.95) as f64 / 1_000_000_000.0
        ));
    }
    let resp = (StatusCode::OK, body).into_response();
    state
        .metrics
        .observe_request("/metrics", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}
