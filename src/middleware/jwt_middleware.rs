/// Auth Boundary Middleware
///
/// Runs once per request before any handler. Public routes pass untouched.
/// On every other route a bearer access token, if presented, is verified by
/// signature and expiry only (no store lookup) and the resulting identity is
/// attached to the request extensions.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{TokenCodec, TokenKind};
use crate::error::{AppError, AuthError};
use crate::middleware::public_routes::PublicRoutes;

const BEARER_PREFIX: &str = "Bearer ";

/// Access-token gate for the whole application
pub struct AuthBoundary {
    codec: TokenCodec,
    routes: Rc<PublicRoutes>,
}

impl AuthBoundary {
    pub fn new(codec: TokenCodec, routes: PublicRoutes) -> Self {
        Self {
            codec,
            routes: Rc::new(routes),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthBoundary
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthBoundaryService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthBoundaryService {
            service: Rc::new(service),
            codec: self.codec.clone(),
            routes: self.routes.clone(),
        }))
    }
}

pub struct AuthBoundaryService<S> {
    service: Rc<S>,
    codec: TokenCodec,
    routes: Rc<PublicRoutes>,
}

/// What the Authorization header amounts to
enum Credential {
    Absent,
    Malformed,
    Bearer(String),
}

fn read_credential(req: &ServiceRequest) -> Credential {
    let value = match req.headers().get(header::AUTHORIZATION) {
        None => return Credential::Absent,
        Some(value) => value,
    };

    value
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map_or(Credential::Malformed, |token| Credential::Bearer(token.to_string()))
}

impl<S, B> Service<ServiceRequest> for AuthBoundaryService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.routes.is_public(req.method(), req.path()) {
            let service = self.service.clone();
            return Box::pin(async move { service.call(req).await });
        }

        match read_credential(&req) {
            Credential::Absent => {
                // No identity attached; handlers that need one reject.
                tracing::debug!(path = %req.path(), "No credential presented");
            }
            Credential::Malformed => {
                tracing::warn!(path = %req.path(), "Authorization header is not a bearer credential");
                return reject(AuthError::MalformedCredential);
            }
            Credential::Bearer(token) => match self.codec.verify(&token, TokenKind::Access) {
                Ok(identity) => {
                    tracing::debug!(
                        identity = %identity.identity,
                        role = %identity.role,
                        "Access token accepted"
                    );
                    req.extensions_mut().insert(identity);
                }
                Err(e) => {
                    tracing::warn!(path = %req.path(), "Access token rejected");
                    return reject(e);
                }
            },
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}

fn reject<R: 'static>(error: AuthError) -> LocalBoxFuture<'static, Result<R, Error>> {
    Box::pin(async move { Err(AppError::Auth(error).into()) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedIdentity, Role};
    use crate::configuration::JwtSettings;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App, HttpResponse};

    fn codec() -> TokenCodec {
        TokenCodec::new(&JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        })
        .unwrap()
    }

    async fn whoami(identity: AuthenticatedIdentity) -> HttpResponse {
        HttpResponse::Ok().json(identity)
    }

    async fn open() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    macro_rules! boundary_app {
        ($codec:expr) => {
            test::init_service(
                App::new()
                    .wrap(AuthBoundary::new($codec, PublicRoutes::default()))
                    .route("/auth/me", web::get().to(whoami))
                    .route("/photo/{id}", web::get().to(open))
                    .route("/exhibition/create", web::post().to(open)),
            )
            .await
        };
    }

    macro_rules! status_of {
        ($app:expr, $req:expr) => {
            match $app.call($req).await {
                Ok(res) => res.status(),
                Err(e) => e.error_response().status(),
            }
        };
    }

    #[actix_web::test]
    async fn test_valid_access_token_populates_identity() {
        let codec = codec();
        let token = codec.issue("a@x.com", Role::Artist, TokenKind::Access).unwrap();
        let app = boundary_app!(codec);

        let req = test::TestRequest::get()
            .uri("/auth/me")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["identity"], "a@x.com");
        assert_eq!(body["role"], "ARTIST");
    }

    #[actix_web::test]
    async fn test_public_route_ignores_credentials() {
        let app = boundary_app!(codec());

        let req = test::TestRequest::get()
            .uri("/photo/3")
            .insert_header((header::AUTHORIZATION, "garbage"))
            .to_request();
        assert_eq!(status_of!(app, req), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_missing_credential_reaches_handler_without_identity() {
        let app = boundary_app!(codec());

        let open_req = test::TestRequest::post().uri("/exhibition/create").to_request();
        assert_eq!(status_of!(app, open_req), StatusCode::OK);

        let me_req = test::TestRequest::get().uri("/auth/me").to_request();
        assert_eq!(status_of!(app, me_req), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_non_bearer_header_rejected() {
        let app = boundary_app!(codec());

        for value in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer    ", "token-without-scheme"] {
            let req = test::TestRequest::post()
                .uri("/exhibition/create")
                .insert_header((header::AUTHORIZATION, value))
                .to_request();
            assert_eq!(status_of!(app, req), StatusCode::UNAUTHORIZED, "header {:?}", value);
        }
    }

    #[actix_web::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let codec = codec();
        let refresh = codec.issue("a@x.com", Role::User, TokenKind::Refresh).unwrap();
        let app = boundary_app!(codec);

        let req = test::TestRequest::get()
            .uri("/auth/me")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", refresh)))
            .to_request();
        assert_eq!(status_of!(app, req), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_invalid_token_rejected() {
        let app = boundary_app!(codec());

        let req = test::TestRequest::post()
            .uri("/exhibition/create")
            .insert_header((header::AUTHORIZATION, "Bearer not.a.jwt"))
            .to_request();
        assert_eq!(status_of!(app, req), StatusCode::UNAUTHORIZED);
    }
}
