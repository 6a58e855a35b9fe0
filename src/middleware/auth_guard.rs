/// Access token guard
///
/// Resolves the caller's access token to an account and injects the
/// `AccountIdentity` into request extensions for route handlers. The token
/// is read from the `accessToken` cookie, falling back to an
/// `Authorization: Bearer` header.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::SessionService;
use crate::cookies::ACCESS_TOKEN_COOKIE;
use crate::error::{AppError, RejectReason};

/// Guard for protected scopes
pub struct AuthGuard {
    sessions: web::Data<SessionService>,
}

impl AuthGuard {
    pub fn new(sessions: web::Data<SessionService>) -> Self {
        Self { sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthGuardService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthGuardService {
            service: Rc::new(service),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct AuthGuardService<S> {
    service: Rc<S>,
    sessions: web::Data<SessionService>,
}

fn access_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(ACCESS_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for AuthGuardService<S>
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
        let token = access_token(&req);
        let service = self.service.clone();
        let sessions = self.sessions.clone();

        Box::pin(async move {
            let token = match token {
                Some(token) => token,
                None => {
                    tracing::warn!(path = %req.path(), "Missing access token");
                    return Err(Error::from(AppError::from(RejectReason::MissingToken)));
                }
            };

            let identity = match sessions.verify(&token).await {
                Ok(identity) => identity,
                Err(e) => return Err(Error::from(AppError::from(e))),
            };

            tracing::debug!(user_id = %identity.id, "Request authenticated");
            req.extensions_mut().insert(identity);

            service.call(req).await
        })
    }
}
