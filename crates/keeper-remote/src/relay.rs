use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::error::{RemoteError, Result};
use crate::program::ProgramErrorCode;
use crate::submitter::{InstructionRequest, Receipt, RejectReason, SubmitError, Submitter};

#[derive(Debug, Deserialize)]
struct RelayErrorEnvelope {
    error: RelayErrorBody,
}

#[derive(Debug, Deserialize)]
struct RelayErrorBody {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: String,
}

/// Submits instructions to a signing relay that holds the keeper's key.
///
/// `POST {base}/v1/instructions` with the JSON-encoded [`InstructionRequest`];
/// the relay answers with a [`Receipt`] or an error envelope carrying the
/// program's error code.
#[derive(Clone)]
pub struct RelaySubmitter {
    client: Client,
    base: String,
    token: Option<String>,
}

impl RelaySubmitter {
    pub fn new(base: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base = base.into().trim_end_matches('/').to_string();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(RemoteError::InvalidEndpoint(base));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            token,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/instructions", self.base)
    }
}

#[async_trait]
impl Submitter for RelaySubmitter {
    async fn submit(&self, request: &InstructionRequest) -> std::result::Result<Receipt, SubmitError> {
        let mut builder = self.client.post(self.endpoint()).json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        classify_response(status, &body)
    }
}

/// Map a relay HTTP response onto confirmation, rejection or transport failure
pub fn classify_response(status: StatusCode, body: &str) -> std::result::Result<Receipt, SubmitError> {
    if status.is_success() {
        return serde_json::from_str::<Receipt>(body).map_err(|e| {
            // Without a receipt we cannot tell whether the command landed;
            // the next read settles it.
            SubmitError::Transport(format!("unreadable receipt: {e}"))
        });
    }

    let envelope = serde_json::from_str::<RelayErrorEnvelope>(body).ok();
    let program_code = envelope
        .as_ref()
        .and_then(|env| env.error.code)
        .and_then(ProgramErrorCode::from_code);
    let message = envelope
        .map(|env| env.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    if program_code.is_some() {
        return Err(SubmitError::Rejected(RejectReason::Precondition {
            code: program_code,
            message,
        }));
    }

    match status {
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            Err(SubmitError::Rejected(RejectReason::Precondition {
                code: None,
                message,
            }))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(SubmitError::Rejected(RejectReason::Unauthorized(message)))
        }
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            Err(SubmitError::Transport(format!("HTTP {status}: {message}")))
        }
        s if s.is_server_error() => Err(SubmitError::Transport(format!("HTTP {status}: {message}"))),
        _ => Err(SubmitError::Rejected(RejectReason::Invalid(format!(
            "HTTP {status}: {message}"
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_carries_receipt() {
        let receipt = classify_response(StatusCode::OK, r#"{"signature":"5xY","slot":77}"#).unwrap();
        assert_eq!(
            receipt,
            Receipt {
                signature: "5xY".to_string(),
                slot: Some(77)
            }
        );
    }

    #[test]
    fn test_success_without_receipt_is_transient() {
        let err = classify_response(StatusCode::OK, "ok").unwrap_err();
        assert!(matches!(err, SubmitError::Transport(_)));
    }

    #[test]
    fn test_program_error_code_is_precondition() {
        let body = r#"{"error":{"code":6002,"message":"InvalidState"}}"#;
        let err = classify_response(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert_eq!(
            err,
            SubmitError::Rejected(RejectReason::Precondition {
                code: Some(ProgramErrorCode::InvalidState),
                message: "InvalidState".to_string()
            })
        );
    }

    #[test]
    fn test_conflict_is_precondition() {
        let err = classify_response(StatusCode::CONFLICT, "round already advanced").unwrap_err();
        match err {
            SubmitError::Rejected(reason) => assert!(reason.is_expected_race()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_auth_failure_is_not_a_race() {
        let err = classify_response(StatusCode::FORBIDDEN, "").unwrap_err();
        match err {
            SubmitError::Rejected(reason) => {
                assert!(!reason.is_expected_race());
                assert!(matches!(reason, RejectReason::Unauthorized(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_server_errors_and_throttling_are_transient() {
        for status in [
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::TOO_MANY_REQUESTS,
        ] {
            assert!(matches!(
                classify_response(status, "try later"),
                Err(SubmitError::Transport(_))
            ));
        }
    }

    #[test]
    fn test_endpoint_normalization() {
        let relay = RelaySubmitter::new("http://relay:8080/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(relay.endpoint(), "http://relay:8080/v1/instructions");
        assert!(RelaySubmitter::new("relay:8080", None, Duration::from_secs(1)).is_err());
    }
}
