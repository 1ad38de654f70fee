use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

/// Builds the CORS layer from a comma separated origin list, falling back to
/// the local frontend dev servers when none is configured.
pub fn create_cors_layer(configured: Option<&str>) -> CorsLayer {
    let allow_origin = allowed_origins(configured.unwrap_or(DEFAULT_ALLOWED_ORIGINS));

    let layer = CorsLayer::new()
        .allow_origin(allow_origin.clone())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS));

    // Credentials cannot be combined with a wildcard origin.
    if allow_origin.is_wildcard() {
        layer
    } else {
        layer.allow_credentials(true)
    }
}

fn allowed_origins(origins_str: &str) -> AllowedOrigins {
    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .filter_map(|origin| {
            let trimmed = origin.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(value) => {
                    tracing::debug!("CORS: Allowing origin: {}", trimmed);
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS: No valid origins configured, allowing any origin");
        AllowedOrigins::Any
    } else {
        tracing::info!("CORS: Configured with {} allowed origin(s)", origins.len());
        AllowedOrigins::List(origins)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum AllowedOrigins {
    Any,
    List(Vec<HeaderValue>),
}

impl AllowedOrigins {
    fn is_wildcard(&self) -> bool {
        matches!(self, AllowedOrigins::Any)
    }
}

impl From<AllowedOrigins> for AllowOrigin {
    fn from(origins: AllowedOrigins) -> Self {
        match origins {
            AllowedOrigins::Any => AllowOrigin::any(),
            AllowedOrigins::List(list) => AllowOrigin::list(list),
        }
    }
}
