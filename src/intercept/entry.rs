use std::collections::BTreeMap;
use std::time::Duration;

use axum::http::{request, response, HeaderMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::room::ClientId;

/// Everything recorded about one intercepted call
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(rename = "clientID")]
    pub client_id: Option<ClientId>,
    pub method: String,
    pub request_url: String,
    pub request_body: Option<String>,
    pub request_headers: BTreeMap<String, String>,
    pub query_parameters: Option<String>,
    pub status_code: u16,
    pub response_body: String,
    pub response_headers: BTreeMap<String, String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub response_duration_ms: f64,
}

impl LogEntry {
    /// Request half of the entry; the response half is filled by `complete`
    pub fn from_request(
        parts: &request::Parts,
        body: &[u8],
        client_id: Option<ClientId>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            client_id,
            method: parts.method.to_string(),
            request_url: parts.uri.to_string(),
            request_body: (!body.is_empty()).then(|| String::from_utf8_lossy(body).into_owned()),
            request_headers: flatten_headers(&parts.headers),
            query_parameters: parts.uri.query().map(str::to_string),
            status_code: 0,
            response_body: String::new(),
            response_headers: BTreeMap::new(),
            start_time,
            end_time: start_time,
            response_duration_ms: 0.0,
        }
    }

    pub fn complete(&mut self, parts: &response::Parts, body: &[u8], elapsed: Duration) {
        self.status_code = parts.status.as_u16();
        self.response_body = String::from_utf8_lossy(body).into_owned();
        self.response_headers = flatten_headers(&parts.headers);
        self.end_time = Utc::now();
        self.response_duration_ms = elapsed.as_secs_f64() * 1000.0;
    }

    /// The call ended without a response; `status_code` stays 0
    pub fn abandon(&mut self, elapsed: Duration) {
        self.end_time = Utc::now();
        self.response_duration_ms = elapsed.as_secs_f64() * 1000.0;
    }
}

/// Repeated headers are joined with ", "
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, Response, StatusCode};

    use super::*;

    #[test]
    fn records_both_halves() {
        let (req_parts, _) = Request::post("/send?x=1")
            .header("content-type", "application/json")
            .body(())
            .unwrap()
            .into_parts();
        let mut entry = LogEntry::from_request(
            &req_parts,
            br#"{"clientID":"alice"}"#,
            Some(ClientId::from("alice")),
            Utc::now(),
        );
        assert_eq!(entry.method, "POST");
        assert_eq!(entry.query_parameters.as_deref(), Some("x=1"));
        assert_eq!(entry.request_headers["content-type"], "application/json");

        let (resp_parts, _) = Response::builder()
            .status(StatusCode::TOO_MANY_REQUESTS)
            .body(())
            .unwrap()
            .into_parts();
        entry.complete(&resp_parts, b"Too many requests", Duration::from_millis(3));
        assert_eq!(entry.status_code, 429);
        assert_eq!(entry.response_body, "Too many requests");
        assert!(entry.end_time >= entry.start_time);
        assert!((entry.response_duration_ms - 3.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("accept", "text/plain".parse().unwrap());
        headers.append("accept", "application/json".parse().unwrap());
        let flat = flatten_headers(&headers);
        assert_eq!(flat["accept"], "text/plain, application/json");
    }

    #[test]
    fn empty_body_is_none() {
        let (parts, _) = Request::get("/messages?id=a")
            .body(())
            .unwrap()
            .into_parts();
        let entry = LogEntry::from_request(&parts, b"", None, Utc::now());
        assert!(entry.request_body.is_none());
        assert!(entry.client_id.is_none());
    }
}
