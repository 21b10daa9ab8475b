//! Response checks shared by the HTTP clients.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ServiceError, ServiceResult};

/// Pass `response` through if it carries `expected`, otherwise turn it into
/// a [`ServiceError::Status`] with the body attached.
pub(crate) async fn expect_status(
    url: &str,
    response: Response,
    expected: StatusCode,
) -> ServiceResult<Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Read a JSON body, reporting shape mismatches as [`ServiceError::Decode`].
pub(crate) async fn read_json<T: DeserializeOwned>(url: &str, response: Response) -> ServiceResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode {
        url: url.to_string(),
        detail: e.to_string(),
    })
}
