use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};
use url::Url;

use crate::errors::AppError;
use crate::state::AppState;

pub const USER_HEADER: &str = "x-remote-user";
pub const CAPABILITIES_HEADER: &str = "x-remote-capabilities";
pub const FORWARDED_PROTO_HEADER: &str = "x-forwarded-proto";
pub const NO_CACHE: &str = "no-cache, must-revalidate, max-age=0, no-store, private";

pub trait Identity: Send + Sync {
    fn is_authenticated(&self, headers: &HeaderMap) -> bool;
    fn has_capability(&self, headers: &HeaderMap, capability: &str) -> bool;
}

// Headers are set by the authenticating proxy in front of the service.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyHeaderIdentity;

impl Identity for ProxyHeaderIdentity {
    fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        header_text(headers, USER_HEADER).is_some_and(|user| !user.trim().is_empty())
    }

    fn has_capability(&self, headers: &HeaderMap, capability: &str) -> bool {
        self.is_authenticated(headers)
            && header_text(headers, CAPABILITIES_HEADER)
                .is_some_and(|caps| caps.split(',').any(|cap| cap.trim() == capability))
    }
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

pub fn request_scheme(headers: &HeaderMap) -> String {
    header_text(headers, FORWARDED_PROTO_HEADER)
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "http".to_string())
}

fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn path_and_query(uri: &Uri) -> &str {
    uri.path_and_query().map_or("/", |value| value.as_str())
}

pub fn canonical_redirect(site: &Url, headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let site_host = authority(site)?;
    let current_host = header_text(headers, header::HOST.as_str()).unwrap_or_default();
    if current_host.eq_ignore_ascii_case(&site_host) && request_scheme(headers) == site.scheme() {
        return None;
    }
    Some(format!("{}://{}{}", site.scheme(), site_host, path_and_query(uri)))
}

pub fn login_redirect(login: &Url, headers: &HeaderMap, uri: &Uri) -> String {
    let current = match header_text(headers, header::HOST.as_str()) {
        Some(host) => format!("{}://{}{}", request_scheme(headers), host, path_and_query(uri)),
        None => path_and_query(uri).to_string(),
    };
    let mut target = login.clone();
    target.query_pairs_mut().append_pair("redirect_to", &current);
    target.into()
}

fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(err) => AppError::internal(err).into_response(),
    }
}

fn deny(error: AppError, html: bool) -> Response {
    if html {
        error.into_html_response()
    } else {
        error.into_response()
    }
}

fn with_no_cache(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

pub async fn guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let uri = request.uri();
    let html = !uri.path().starts_with("/api/");

    if let Some(target) = state
        .config
        .site_url
        .as_ref()
        .and_then(|site| canonical_redirect(site, headers, uri))
    {
        debug!(%target, "redirecting to canonical host");
        return with_no_cache(found(&target));
    }

    if !state.identity.is_authenticated(headers) {
        let response = match &state.config.login_url {
            Some(login) => found(&login_redirect(login, headers, uri)),
            None => deny(
                AppError::unauthorized("Authentication required to view this report."),
                html,
            ),
        };
        return with_no_cache(response);
    }

    if !state
        .identity
        .has_capability(headers, &state.config.required_capability)
    {
        warn!(
            capability = %state.config.required_capability,
            path = uri.path(),
            "access denied"
        );
        return with_no_cache(deny(
            AppError::forbidden("Access denied: insufficient permissions to view this report."),
            html,
        ));
    }

    with_no_cache(next.run(request).await)
}
