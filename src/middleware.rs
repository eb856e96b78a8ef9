use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderName, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::{ErrorEnvelope, ErrorReport};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id of the current request, available as an extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Outermost layer. Ensures each request has an `x-request-id`, mirrors it on
/// the response, and stamps it into error bodies before logging them. Error
/// statuses produced outside `AppError` (router 404/405, timeout 408) get the
/// same envelope.
pub async fn request_context(mut req: Request, next: Next) -> Response {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    let request_id = req
        .headers()
        .get(&header_name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let header_value = HeaderValue::from_str(&request_id)
        .unwrap_or_else(|_| HeaderValue::from_static("invalid-request-id"));
    let client_ip = client_ip(&req);
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    // visible to the trace span and to handlers
    req.headers_mut().insert(header_name.clone(), header_value.clone());
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let mut res = next.run(req).await;

    let report = res.extensions_mut().remove::<ErrorReport>().or_else(|| {
        let status = res.status();
        (status.is_client_error() || status.is_server_error())
            .then(|| ErrorReport::from_status(status))
    });
    if let Some(report) = report {
        let status = report.info.status;
        let cause = report.cause.as_deref().unwrap_or("-");
        if status >= 500 {
            tracing::error!(%request_id, %client_ip, %method, %path, status, message = %report.info.message, cause, "request failed");
        } else {
            tracing::warn!(%request_id, %client_ip, %method, %path, status, message = %report.info.message, cause, "request rejected");
        }
        res = with_request_id(res, report, &request_id);
    }

    res.headers_mut().insert(header_name, header_value);
    res
}

fn with_request_id(res: Response, report: ErrorReport, request_id: &str) -> Response {
    let (mut parts, _) = res.into_parts();
    let envelope = ErrorEnvelope {
        error: report.info,
        request_id: Some(request_id.to_string()),
    };
    let body = serde_json::to_vec(&envelope).unwrap_or_default();
    parts.headers.remove(CONTENT_LENGTH);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(body))
}

fn client_ip(req: &Request) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
