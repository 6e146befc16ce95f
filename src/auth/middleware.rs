use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    web::Data,
};
use serde_json::json;
use tracing::debug;

use crate::auth::auth::AuthUser;
use crate::config::Config;

/// Resolves the session once per request for everything under the API prefix.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let decoded = AuthUser::from_authorization(req.headers().get(AUTHORIZATION), &config.jwt_secret);

    match decoded {
        Ok(auth_user) => {
            req.extensions_mut().insert(auth_user);
            next.call(req).await
        }
        Err(rejection) => {
            debug!(path = req.path(), %rejection, "Unauthenticated request");
            let resp = HttpResponse::Unauthorized().json(json!({"error": rejection.to_string()}));
            Ok(req.into_response(resp.map_into_boxed_body()))
        }
    }
}
