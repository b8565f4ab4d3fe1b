/// Session Routes
///
/// Local login, token refresh, cookie-to-body exchange, logout, and the
/// caller's own identity context. Federated logins enter through
/// `federated_login_success`, called by the OAuth collaborator.

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::cookie::{cleared_refresh_cookie, read_refresh_cookie, refresh_cookie};
use crate::auth::{
    verify_password, verify_password_without_account, AuthenticatedIdentity, Role,
    SessionManager, TokenKind, TokenPair, UserDirectory,
};
use crate::configuration::SessionSettings;
use crate::error::{AppError, AuthError, ErrorContext, ValidationError};

/// Local login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh or logout request carrying the refresh token in the body
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(alias = "refresh_token")]
    pub refresh_token: String,
}

/// A token pair as handed to clients
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthResponse {
    fn new(pair: TokenPair, session: &SessionManager) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: session.codec().ttl(TokenKind::Access),
        }
    }
}

/// Refresh token from the body if one was sent, else from the cookie
fn presented_refresh_token(
    body: Option<web::Json<RefreshRequest>>,
    req: &HttpRequest,
    settings: &SessionSettings,
) -> Option<(String, bool)> {
    body.map(|b| b.into_inner().refresh_token)
        .filter(|t| !t.trim().is_empty())
        .map(|t| (t, false))
        .or_else(|| read_refresh_cookie(req, settings).map(|t| (t, true)))
}

/// POST /auth/login
///
/// Unknown identity and wrong password produce the same 401.
///
/// # Errors
/// - 400: empty email or password
/// - 401: invalid credentials
/// - 500/503: directory or store failure
pub async fn login(
    form: web::Json<LoginRequest>,
    session: web::Data<SessionManager>,
    directory: web::Data<dyn UserDirectory>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("local_login");

    let email = form.email.trim();
    if email.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()).into());
    }
    if form.password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()).into());
    }

    let user = match directory.find_by_identity(email).await? {
        Some(user) => user,
        None => {
            verify_password_without_account(&form.password)?;
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    if !verify_password(&form.password, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let context = context.with_identity(&user.identity);
    let pair = session.login(&user.identity, user.role).await?;

    tracing::info!(
        request_id = %context.request_id,
        identity = ?context.identity,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(AuthResponse::new(pair, &session)))
}

/// POST /auth/refresh
///
/// Rotates the presented refresh token. When it came from the cookie the
/// rotated token is written back to the cookie as well.
///
/// # Errors
/// - 401: missing, invalid, expired, rotated, or revoked token
pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    session: web::Data<SessionManager>,
    settings: web::Data<SessionSettings>,
) -> Result<HttpResponse, AppError> {
    let (token, from_cookie) = presented_refresh_token(body, &req, &settings)
        .ok_or(AppError::Auth(AuthError::MissingToken))?;

    let pair = session.refresh(&token).await?;

    let mut response = HttpResponse::Ok();
    if from_cookie {
        response.cookie(refresh_cookie(
            &settings,
            &pair.refresh_token,
            session.codec().ttl(TokenKind::Refresh),
        ));
    }

    Ok(response.json(AuthResponse::new(pair, &session)))
}

/// POST /auth/exchange
///
/// Turns the cookie left by a federated login into a pair the client can
/// read. The cookie token is rotated like any refresh and the cookie cleared.
///
/// # Errors
/// - 401: no cookie, or the cookie token does not refresh
pub async fn exchange(
    req: HttpRequest,
    session: web::Data<SessionManager>,
    settings: web::Data<SessionSettings>,
) -> Result<HttpResponse, AppError> {
    let token = read_refresh_cookie(&req, &settings)
        .ok_or(AppError::Auth(AuthError::MissingToken))?;

    let pair = session.refresh(&token).await?;
    tracing::info!("Cookie refresh token exchanged");

    Ok(HttpResponse::Ok()
        .cookie(cleared_refresh_cookie(&settings))
        .json(AuthResponse::new(pair, &session)))
}

/// POST /auth/logout
///
/// Always 200, whether or not the token was known.
pub async fn logout(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    session: web::Data<SessionManager>,
    settings: web::Data<SessionSettings>,
) -> Result<HttpResponse, AppError> {
    if let Some((token, _)) = presented_refresh_token(body, &req, &settings) {
        session.revoke(&token).await?;
    }

    Ok(HttpResponse::Ok()
        .cookie(cleared_refresh_cookie(&settings))
        .finish())
}

/// GET /auth/me
pub async fn me(identity: AuthenticatedIdentity) -> HttpResponse {
    HttpResponse::Ok().json(identity)
}

/// DELETE /auth/sessions
///
/// Log out everywhere: every refresh token of the caller is revoked.
/// Access tokens already handed out stay valid until they expire.
pub async fn revoke_sessions(
    identity: AuthenticatedIdentity,
    session: web::Data<SessionManager>,
    settings: web::Data<SessionSettings>,
) -> Result<HttpResponse, AppError> {
    session.revoke_all_for_identity(&identity.identity).await?;

    Ok(HttpResponse::NoContent()
        .cookie(cleared_refresh_cookie(&settings))
        .finish())
}

/// Completes a federated login whose identity the OAuth collaborator has
/// already verified: starts a session, puts the refresh token in a
/// short-lived cookie and redirects to the frontend, which then calls
/// `/auth/exchange`.
pub async fn federated_login_success(
    session: &SessionManager,
    settings: &SessionSettings,
    identity: &str,
    role: Role,
) -> Result<HttpResponse, AppError> {
    let pair = session.login(identity, role).await?;

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, settings.federated_redirect_url.as_str()))
        .cookie(refresh_cookie(
            settings,
            &pair.refresh_token,
            settings.federated_cookie_max_age,
        ))
        .finish())
}
