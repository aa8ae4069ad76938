use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::credentials::CredentialSource;

pub static X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");
pub const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";

/// Stamp `headers` with the current credential and the AJAX marker.
///
/// Without a valid credential only the marker is added; the request goes out
/// unauthenticated and the server decides what to do with it.
pub fn attach_credential<S: CredentialSource + ?Sized>(source: &S, headers: &mut HeaderMap) {
    headers.insert(
        &X_REQUESTED_WITH,
        HeaderValue::from_static(REQUESTED_WITH_VALUE),
    );

    let Some(token) = source.current_token() else {
        return;
    };

    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Err(_) => warn!("stored credential is not a valid header value, sending without it"),
    }
}

/// Fresh header map for a JSON API call.
pub fn default_headers<S: CredentialSource + ?Sized>(source: &S) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    attach_credential(source, &mut headers);
    headers
}

/// Attach the current credential to a request under construction.
pub trait AuthorizedRequest {
    fn with_credential<S: CredentialSource + ?Sized>(self, source: &S) -> Self;
}

impl AuthorizedRequest for reqwest::RequestBuilder {
    fn with_credential<S: CredentialSource + ?Sized>(self, source: &S) -> Self {
        let mut headers = HeaderMap::new();
        attach_credential(source, &mut headers);
        self.headers(headers)
    }
}
