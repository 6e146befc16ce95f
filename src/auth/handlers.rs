use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
        session::SessionStore,
    },
    config::Config,
    db::Store,
    model::{employee::Employee, role::Role, user::User},
    models::{Claims, LoginReqDto, RegisterReq, TokenType},
    utils::username_filter,
};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Verified refresh-token claims from the Authorization header.
fn refresh_claims(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let claims = verify_token(bearer(req)?, &config.jwt_secret).ok()?;
    (claims.token_type == TokenType::Refresh).then_some(claims)
}

/// Issues a token pair and opens a session for it.
async fn issue_tokens(
    user: &AuthUser,
    config: &Config,
    sessions: &SessionStore,
) -> Result<LoginResponse, jsonwebtoken::errors::Error> {
    let access_token =
        generate_access_token(user, &config.jwt_secret, config.access_token_ttl)?;
    let (refresh_token, claims) =
        generate_refresh_token(user, &config.jwt_secret, config.refresh_token_ttl)?;

    debug!(user_id = user.user_id, jti = %claims.jti, "Opening session");
    sessions.open(&claims).await;

    Ok(LoginResponse {
        access_token,
        refresh_token,
    })
}

/// Creates a login for an existing employee record
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created", body = Object, example = json!({
            "message": "User registered successfully"
        })),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No employee with that code and email"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(store, payload), fields(employee_code = %payload.employee_code))]
pub async fn register(payload: web::Json<RegisterReq>, store: web::Data<Store>) -> impl Responder {
    let email = payload.email.trim();
    let code = payload.employee_code.trim();

    if email.is_empty() || code.is_empty() || payload.password.len() < MIN_PASSWORD_LEN {
        return HttpResponse::BadRequest().json(json!({
            "error": "employee_code, email and a password of at least 8 characters are required"
        }));
    }

    let employee = match store.employees.fetch_one(&|e: &Employee| {
        e.employee_code.eq_ignore_ascii_case(code) && e.email.eq_ignore_ascii_case(email)
    }) {
        Ok(Some(e)) => e,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({
                "error": "No employee with that code and email"
            }));
        }
        Err(e) => {
            error!(error = %e, "Employee lookup failed");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let already_linked = store
        .users
        .fetch_one(&|u: &User| u.employee_id == Some(employee.id));
    match already_linked {
        Ok(Some(_)) => {
            return HttpResponse::Conflict().json(json!({
                "error": "Employee already has an account"
            }));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "User lookup failed");
            return HttpResponse::InternalServerError().finish();
        }
    }

    match username_filter::is_username_available(email, &*store.users) {
        Ok(true) => {}
        Ok(false) => {
            return HttpResponse::Conflict().json(json!({
                "error": "Username already taken"
            }));
        }
        Err(e) => {
            error!(error = %e, "Username check failed");
            return HttpResponse::InternalServerError().finish();
        }
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "Password hashing failed");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let user = User {
        id: 0,
        username: email.to_lowercase(),
        password_hash: Some(password_hash),
        role: employee.role,
        employee_id: Some(employee.id),
        is_active: true,
        last_login_at: None,
    };

    match store.users.insert(user) {
        Ok(user) => {
            username_filter::insert(&user.username);
            info!(user_id = user.id, "User registered");
            HttpResponse::Created().json(json!({
                "message": "User registered successfully"
            }))
        }
        Err(e) => {
            error!(error = %e, "Failed to register user");
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to register user"
            }))
        }
    }
}

/// Exchanges credentials for an access/refresh token pair
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(store, config, sessions, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    store: web::Data<Store>,
    config: web::Data<Config>,
    sessions: web::Data<SessionStore>,
) -> impl Responder {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().body("Username or password required");
    }

    let wanted = user.username.trim().to_lowercase();
    let account = match store
        .users
        .fetch_one(&|u: &User| u.is_active && u.username.to_lowercase() == wanted)
    {
        Ok(Some(account)) => {
            debug!(user_id = account.id, "User found");
            account
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Repository error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let Some(hash) = account.password_hash.as_deref() else {
        info!("Invalid credentials: account has no password");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    };

    match verify_password(&user.password, hash) {
        Ok(true) => debug!("Password verified"),
        Ok(false) => {
            info!("Invalid credentials: password mismatch");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, user_id = account.id, "Stored password hash unreadable");
            return HttpResponse::InternalServerError().finish();
        }
    }

    let session = AuthUser {
        user_id: account.id,
        username: account.username.clone(),
        role: account.role,
        employee_id: account.employee_id,
    };

    let tokens = match issue_tokens(&session, &config, &sessions).await {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to issue tokens");
            return HttpResponse::InternalServerError().finish();
        }
    };

    // last_login_at is informational, a failed update does not fail the login
    let mut account = account;
    account.last_login_at = Some(Utc::now());
    if let Err(e) = store.users.update(account) {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");
    HttpResponse::Ok().json(tokens)
}

/// Rotates a refresh token; the presented one stops working
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = LoginResponse),
        (status = 401, description = "Refresh token invalid, expired or revoked")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    config: web::Data<Config>,
    sessions: web::Data<SessionStore>,
) -> impl Responder {
    let Some(claims) = refresh_claims(&req, &config) else {
        return HttpResponse::Unauthorized().finish();
    };

    let Some(role) = Role::from_id(claims.role) else {
        return HttpResponse::Unauthorized().finish();
    };
    let session = AuthUser {
        user_id: claims.user_id,
        username: claims.sub.clone(),
        role,
        employee_id: claims.employee_id,
    };

    let (new_refresh_token, new_claims) =
        match generate_refresh_token(&session, &config.jwt_secret, config.refresh_token_ttl) {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "Failed to issue refresh token");
                return HttpResponse::InternalServerError().finish();
            }
        };

    if !sessions.rotate(&claims.jti, &new_claims).await {
        info!(user_id = claims.user_id, "Refresh with revoked or unknown token");
        return HttpResponse::Unauthorized().finish();
    }

    let access_token =
        match generate_access_token(&session, &config.jwt_secret, config.access_token_ttl) {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "Failed to issue access token");
                return HttpResponse::InternalServerError().finish();
            }
        };

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token: new_refresh_token,
    })
}

/// Closes the session of the presented refresh token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out (also for unknown tokens)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    config: web::Data<Config>,
    sessions: web::Data<SessionStore>,
) -> impl Responder {
    if let Some(claims) = refresh_claims(&req, &config) {
        sessions.close(&claims.jti).await;
        info!(user_id = claims.user_id, "Session closed");
    }

    HttpResponse::NoContent().finish()
}

/// Who the current access token belongs to
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Current session", body = Object, example = json!({
            "user_id": 1,
            "username": "rajesh.kumar@mcd.gov.in",
            "role": "employee",
            "employee_id": 1
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn current_session(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "user_id": auth.user_id,
        "username": auth.username,
        "role": auth.role,
        "employee_id": auth.employee_id,
    }))
}
