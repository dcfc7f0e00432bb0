use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::web::models::AuthenticatedUser;
use crate::web::{AppState, error::AppError};

/// Accepted `Authorization` schemes, followed by a single space and the key.
const TOKEN_SCHEMES: [&str; 2] = ["Token ", "Bearer "];

fn extract_token(header_value: &str) -> Option<&str> {
    TOKEN_SCHEMES
        .iter()
        .find_map(|scheme| header_value.strip_prefix(scheme))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the request token to an account before the handler runs.
pub async fn auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(extract_token)
        .ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?
        .to_string();

    let account = state.auth.authenticate(&token).await.inspect_err(|e| {
        debug!(error = %e, "Rejected request token.");
    })?;

    let authenticated_user = AuthenticatedUser {
        id: account.id,
        email: account.email,
        name: account.name,
    };
    req.extensions_mut().insert(authenticated_user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_schemes() {
        assert_eq!(extract_token("Token abc123"), Some("abc123"));
        assert_eq!(extract_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_token("Basic abc123"), None);
        assert_eq!(extract_token("Token "), None);
        assert_eq!(extract_token("abc123"), None);
    }
}
