//! Middleware for logging and cross-origin access. The React client lives on
//! its own origin during development, so CORS stays permissive for GET/POST
//! traffic and the mutating verbs the API uses.

use actix_cors::Cors;
use actix_web::middleware::Logger;

/// Returns the standard request logger:
/// remote-ip "request-line" status-code response-size "referrer" "user-agent"
pub fn standard_middleware() -> Logger {
    Logger::default()
}

/// Configures CORS (Cross-Origin Resource Sharing).
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_header()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .max_age(3600)
}
