//! Gate middleware
//!
//! Actix-web middleware that runs the [`Gatekeeper`] in front of a resource or
//! scope. The regular tier authenticates `X-API-Key` and applies the rate
//! limiter; the super user tier checks `X-Super-User-Key` only.

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, ResponseError,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::gate::{Access, Gatekeeper, API_KEY_HEADER, SUPER_USER_HEADER};
use super::auth::{extract_credential, AuthenticatedKey};
use super::rate_limit::add_rate_limit_headers;

/// Which credential a wrapped route requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    ApiKey,
    SuperUser,
}

/// Middleware factory for the auth gate
pub struct GateMiddleware {
    gate: Arc<Gatekeeper>,
    tier: Tier,
}

impl GateMiddleware {
    pub fn api_key(gate: Arc<Gatekeeper>) -> Self {
        Self {
            gate,
            tier: Tier::ApiKey,
        }
    }

    pub fn super_user(gate: Arc<Gatekeeper>) -> Self {
        Self {
            gate,
            tier: Tier::SuperUser,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for GateMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Transform = GateMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(GateMiddlewareService {
            service: Rc::new(service),
            gate: self.gate.clone(),
            tier: self.tier,
        })
    }
}

/// The actual middleware service
pub struct GateMiddlewareService<S> {
    service: Rc<S>,
    gate: Arc<Gatekeeper>,
    tier: Tier,
}

impl<S, B> Service<ServiceRequest> for GateMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut core::task::Context<'_>) -> core::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let gate = self.gate.clone();
        let tier = self.tier;

        Box::pin(async move {
            match tier {
                Tier::SuperUser => {
                    let presented = extract_credential(&req, SUPER_USER_HEADER);
                    if let Err(e) = gate.check_super_user(presented.as_deref()) {
                        let response = ApiError::from(e).error_response();
                        return Ok(req.into_response(response).map_into_right_body());
                    }

                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Tier::ApiKey => {
                    let presented = extract_credential(&req, API_KEY_HEADER);
                    let access = match gate.check_api_key(presented.as_deref()) {
                        Ok(access) => access,
                        Err(e) => {
                            let response = ApiError::from(e).error_response();
                            return Ok(req.into_response(response).map_into_right_body());
                        }
                    };

                    match access {
                        Access::Open => {
                            let res = service.call(req).await?;
                            Ok(res.map_into_left_body())
                        }
                        Access::Granted {
                            key_id,
                            limit,
                            remaining,
                        } => {
                            req.extensions_mut().insert(AuthenticatedKey { key_id });

                            let mut res = service.call(req).await?.map_into_left_body();
                            add_rate_limit_headers(res.headers_mut(), limit, remaining);
                            Ok(res)
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyStoreSnapshot, RateLimitConfig};
    use crate::api::middleware::ApiKeyExt;
    use actix_web::{test, web, App, HttpRequest, HttpResponse};
    use std::collections::HashSet;

    fn gate(keys: &[&str], super_key: Option<&str>, rpm: u32) -> Arc<Gatekeeper> {
        Arc::new(Gatekeeper::new(KeyStoreSnapshot {
            keys: keys.iter().map(|k| k.to_string()).collect::<HashSet<_>>(),
            super_user_key: super_key.map(str::to_string),
            rate_limit: RateLimitConfig {
                requests_per_minute: rpm,
                requests_per_hour: 1000,
            },
        }))
    }

    async fn whoami(req: HttpRequest) -> HttpResponse {
        let key_id = req.api_key().map(|k| k.key_id).unwrap_or_default();
        HttpResponse::Ok().body(key_id)
    }

    #[actix_rt::test]
    async fn test_api_key_tier() {
        let gate = gate(&["client-key"], Some("root-key"), 2);
        let app = test::init_service(
            App::new().service(
                web::resource("/convert")
                    .wrap(GateMiddleware::api_key(gate.clone()))
                    .route(web::post().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::post().uri("/convert").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        // the super user key is not a regular key
        let req = test::TestRequest::post()
            .uri("/convert")
            .insert_header((API_KEY_HEADER, "root-key"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);

        let req = test::TestRequest::post()
            .uri("/convert")
            .insert_header((API_KEY_HEADER, "client-key"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers().get("X-RateLimit-Limit").unwrap(), "2");
        assert_eq!(resp.headers().get("X-RateLimit-Remaining").unwrap(), "1");
        let body = test::read_body(resp).await;
        assert_eq!(body, crate::keys::fingerprint("client-key").as_bytes());

        let req = test::TestRequest::post()
            .uri("/convert")
            .insert_header((API_KEY_HEADER, "client-key"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::post()
            .uri("/convert")
            .insert_header((API_KEY_HEADER, "client-key"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 429);
        assert!(resp.headers().contains_key("Retry-After"));
    }

    #[actix_rt::test]
    async fn test_super_user_tier() {
        let gate = gate(&["client-key"], Some("root-key"), 1);
        let app = test::init_service(
            App::new().service(
                web::scope("/admin")
                    .wrap(GateMiddleware::super_user(gate.clone()))
                    .route("/keys", web::get().to(|| async { HttpResponse::Ok().finish() })),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/admin/keys").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        // the regular header never grants admin access
        let req = test::TestRequest::get()
            .uri("/admin/keys")
            .insert_header((API_KEY_HEADER, "root-key"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::get()
            .uri("/admin/keys")
            .insert_header((SUPER_USER_HEADER, "client-key"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);

        // never rate limited
        for _ in 0..5 {
            let req = test::TestRequest::get()
                .uri("/admin/keys")
                .insert_header((SUPER_USER_HEADER, "root-key"))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), 200);
        }
    }

    #[actix_rt::test]
    async fn test_open_access_without_keys() {
        let gate = gate(&[], None, 1);
        let app = test::init_service(
            App::new()
                .service(
                    web::resource("/convert")
                        .wrap(GateMiddleware::api_key(gate.clone()))
                        .route(web::post().to(whoami)),
                )
                .service(
                    web::scope("/admin")
                        .wrap(GateMiddleware::super_user(gate.clone()))
                        .route("/keys", web::get().to(|| async { HttpResponse::Ok().finish() })),
                ),
        )
        .await;

        for _ in 0..3 {
            let req = test::TestRequest::post().uri("/convert").to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 200);
            assert!(!resp.headers().contains_key("X-RateLimit-Limit"));
        }

        let req = test::TestRequest::get()
            .uri("/admin/keys")
            .insert_header((SUPER_USER_HEADER, "anything"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "admin_not_configured");
    }
}
