use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use serde::Serialize;
use std::future::{ready, Ready};

use crate::auth::claims::Role;
use crate::error::{AppError, AuthError};

/// Who is making this request.
///
/// Placed in the request extensions by the auth boundary after a successful
/// access-token check and taken back out by handlers as an extractor. It
/// lives exactly as long as the request; there is no ambient "current user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    pub identity: String,
    pub role: Role,
}

impl FromRequest for AuthenticatedIdentity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedIdentity>()
                .cloned()
                .ok_or(AppError::Auth(AuthError::MissingToken)),
        )
    }
}
