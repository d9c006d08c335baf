use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{debug, info, warn};

use crate::{problem::RpcCode, telemetry};

/// Logs each RPC call and records its outcome in the request metrics.
pub async fn log_rpc(request: Request, next: Next) -> Response {
    let procedure = request.uri().path().to_string();
    let started = Instant::now();
    debug!(stage = "rpc", %procedure, "rpc started");

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    let status = response.status();
    let code = match response.extensions().get::<RpcCode>() {
        Some(code) => code.as_str(),
        None if status.is_success() => "ok",
        None => "unknown",
    };

    telemetry::record_rpc(&procedure, code, elapsed);

    if status.is_success() {
        info!(
            stage = "rpc",
            %procedure,
            elapsed_ms = elapsed.as_millis() as u64,
            "rpc succeeded"
        );
    } else {
        warn!(
            stage = "rpc",
            %procedure,
            code,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "rpc failed"
        );
    }

    response
}
