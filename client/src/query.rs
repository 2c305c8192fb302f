//! Shared request core used by both client front ends.
//!
//! Request construction, transport recovery, and response decoding live
//! here; the async and blocking clients are thin scheduling front ends
//! over these functions.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::ClientError;

/// Largest response body preserved inside a decode error.
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Issue a GET, recovering from transport failures through `recover`.
///
/// Every transport-level failure (connection refused, timed-out
/// round-trip, broken stream) invokes `recover`; a returned URL replaces
/// `base` for the remaining attempts — this is how a restarted local
/// server with a new port is picked up. Once the attempt budget is
/// spent the last failure is surfaced as [`ClientError::Transport`].
///
/// HTTP status is not interpreted here: the server reports errors as
/// non-JSON bodies, which the decode step surfaces verbatim.
pub(crate) async fn get_with_recovery<R>(
    http: &reqwest::Client,
    base: &mut Url,
    endpoint: &str,
    params: &[(&'static str, String)],
    attempts: u32,
    mut recover: R,
) -> Result<(StatusCode, String), ClientError>
where
    R: AsyncFnMut() -> Result<Option<Url>, ClientError>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let url = base
            .join(endpoint)
            .map_err(|source| ClientError::InvalidUrl {
                url: format!("{base}{endpoint}"),
                source,
            })?;
        match fetch_text(http, url.clone(), params).await {
            Ok(response) => return Ok(response),
            Err(source) => {
                tracing::debug!(%url, attempt, error = %source, "transport failure");
                if let Some(new_base) = recover().await? {
                    *base = new_base;
                }
                if attempt >= attempts {
                    return Err(ClientError::Transport {
                        url: url.to_string(),
                        source,
                    });
                }
            }
        }
    }
}

async fn fetch_text(
    http: &reqwest::Client,
    url: Url,
    params: &[(&'static str, String)],
) -> Result<(StatusCode, String), reqwest::Error> {
    let response = http.get(url).query(params).send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

/// Decode a JSON body, surfacing malformed responses with their raw text.
///
/// Decode failures are never retried; the body (capped) travels in the
/// error for diagnosis.
pub(crate) fn decode_json<T: DeserializeOwned>(
    status: StatusCode,
    body: String,
) -> Result<T, ClientError> {
    serde_json::from_str(&body).map_err(|source| ClientError::Decode {
        status,
        body: cap_body(body),
        source,
    })
}

fn cap_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY_BYTES {
        let mut end = MAX_ERROR_BODY_BYTES;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...(truncated)");
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dead_base() -> Url {
        // Nothing listens on port 1.
        Url::parse("http://127.0.0.1:1/v2/").unwrap()
    }

    fn server_base(server: &MockServer) -> Url {
        Url::parse(&format!("{}/v2/", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn transport_failure_recovers_once_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/check"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"matches":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let mut base = dead_base();
        let good = server_base(&server);
        let mut recoveries = 0;

        let (status, body) = get_with_recovery(&http, &mut base, "check", &[], 2, async || {
            recoveries += 1;
            Ok(Some(good.clone()))
        })
        .await
        .unwrap();

        assert_eq!(recoveries, 1, "exactly one recovery for one failure");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"matches":[]}"#);
        assert_eq!(base, good, "recovered base is kept for later calls");
    }

    #[tokio::test]
    async fn exhausted_attempts_surface_the_transport_error() {
        let http = reqwest::Client::new();
        let mut base = dead_base();
        let mut recoveries = 0;

        let err = get_with_recovery(&http, &mut base, "check", &[], 2, async || {
            recoveries += 1;
            Ok(None)
        })
        .await
        .unwrap_err();

        // Recovery runs on every failure, including the last one.
        assert_eq!(recoveries, 2);
        match err {
            ClientError::Transport { url, .. } => assert!(url.contains("/v2/check")),
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_recovery_preempts_the_transport_error() {
        let http = reqwest::Client::new();
        let mut base = dead_base();

        let err = get_with_recovery(&http, &mut base, "check", &[], 2, async || {
            Err(ClientError::RemoteConfig)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ClientError::RemoteConfig));
    }

    #[tokio::test]
    async fn params_reach_the_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/check"))
            .and(query_param("language", "en-US"))
            .and(query_param("text", "Teh cat sat."))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"matches":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let mut base = server_base(&server);
        let params = [
            ("language", "en-US".to_string()),
            ("text", "Teh cat sat.".to_string()),
        ];

        get_with_recovery(&http, &mut base, "check", &params, 2, async || Ok(None))
            .await
            .unwrap();
    }

    #[test]
    fn decode_failure_carries_the_raw_body() {
        let err =
            decode_json::<Vec<u32>>(StatusCode::INTERNAL_SERVER_ERROR, "Internal Error".into())
                .unwrap_err();
        match err {
            ClientError::Decode { status, body, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "Internal Error");
            }
            other => panic!("expected Decode, got {other:?}"),
        }
    }

    #[test]
    fn oversized_error_bodies_are_capped() {
        let body = "x".repeat(MAX_ERROR_BODY_BYTES + 100);
        let err = decode_json::<Vec<u32>>(StatusCode::OK, body).unwrap_err();
        match err {
            ClientError::Decode { body, .. } => {
                assert!(body.ends_with("...(truncated)"));
                assert!(body.len() <= MAX_ERROR_BODY_BYTES + "...(truncated)".len());
            }
            other => panic!("expected Decode, got {other:?}"),
        }
    }
}
