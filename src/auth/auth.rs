use actix_web::{
    FromRequest, HttpMessage, HttpRequest,
    dev::Payload,
    error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized},
    http::header::{AUTHORIZATION, HeaderValue},
    web::Data,
};
use futures::future::{Ready, ready};
use thiserror::Error;

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;

/// The session of the caller, injected into handlers per request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

/// Why an Authorization header did not yield a session.
#[derive(Debug, Error, PartialEq)]
pub enum TokenRejection {
    #[error("Missing Authorization header")]
    Missing,
    #[error("Invalid Authorization header encoding")]
    Encoding,
    #[error("Authorization header must start with Bearer")]
    NotBearer,
    #[error("Invalid or expired token: {0}")]
    Invalid(String),
    #[error("Refresh tokens cannot access the API")]
    NotAccessToken,
    #[error("Invalid role {0}")]
    UnknownRole(u8),
}

impl AuthUser {
    /// Decodes a `Bearer` access token into the caller's session.
    pub fn from_authorization(
        header: Option<&HeaderValue>,
        jwt_secret: &str,
    ) -> Result<Self, TokenRejection> {
        let raw = header
            .ok_or(TokenRejection::Missing)?
            .to_str()
            .map_err(|_| TokenRejection::Encoding)?;
        let token = raw
            .strip_prefix("Bearer ")
            .ok_or(TokenRejection::NotBearer)?;

        let claims = verify_token(token, jwt_secret).map_err(TokenRejection::Invalid)?;
        if claims.token_type != TokenType::Access {
            return Err(TokenRejection::NotAccessToken);
        }
        let role = Role::from_id(claims.role).ok_or(TokenRejection::UnknownRole(claims.role))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // already resolved by auth_middleware
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(ErrorInternalServerError("Config missing")));
        };

        ready(
            AuthUser::from_authorization(req.headers().get(AUTHORIZATION), &config.jwt_secret)
                .map_err(|e| ErrorUnauthorized(e.to_string())),
        )
    }
}

impl AuthUser {
    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Hr) {
            Ok(())
        } else {
            Err(ErrorForbidden("HR/Admin only"))
        }
    }

    pub fn require_reviewer(&self) -> actix_web::Result<()> {
        if self.role.is_reviewer() {
            Ok(())
        } else {
            Err(ErrorForbidden("Manager/HR/Admin only"))
        }
    }

    pub fn require_employee_profile(&self) -> actix_web::Result<u64> {
        self.employee_id
            .ok_or_else(|| ErrorForbidden("No employee profile"))
    }

    /// Reviewers may act on anyone; everyone else only on themselves.
    pub fn can_view_employee(&self, employee_id: u64) -> bool {
        self.role.is_reviewer() || self.employee_id == Some(employee_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "someone".to_string(),
            role,
            employee_id,
        }
    }

    #[test]
    fn decodes_access_tokens_only() {
        use crate::auth::jwt::{generate_access_token, generate_refresh_token};

        let me = session(Role::Manager, Some(3));
        let access = generate_access_token(&me, "secret", 60).unwrap();
        let header = HeaderValue::from_str(&format!("Bearer {access}")).unwrap();
        assert_eq!(AuthUser::from_authorization(Some(&header), "secret"), Ok(me.clone()));

        let (refresh, _) = generate_refresh_token(&me, "secret", 60).unwrap();
        let header = HeaderValue::from_str(&format!("Bearer {refresh}")).unwrap();
        assert_eq!(
            AuthUser::from_authorization(Some(&header), "secret"),
            Err(TokenRejection::NotAccessToken)
        );

        let header = HeaderValue::from_str(&access).unwrap();
        assert_eq!(
            AuthUser::from_authorization(Some(&header), "secret"),
            Err(TokenRejection::NotBearer)
        );
        assert_eq!(
            AuthUser::from_authorization(None, "secret"),
            Err(TokenRejection::Missing)
        );
        let header = HeaderValue::from_str(&format!("Bearer {access}")).unwrap();
        assert!(matches!(
            AuthUser::from_authorization(Some(&header), "other"),
            Err(TokenRejection::Invalid(_))
        ));
    }

    #[test]
    fn role_guards() {
        assert!(session(Role::Hr, None).require_hr_or_admin().is_ok());
        assert!(session(Role::Manager, None).require_hr_or_admin().is_err());
        assert!(session(Role::Manager, None).require_reviewer().is_ok());
        assert!(session(Role::Employee, Some(1)).require_reviewer().is_err());
    }

    #[test]
    fn employees_see_only_themselves() {
        let me = session(Role::Employee, Some(4));
        assert!(me.can_view_employee(4));
        assert!(!me.can_view_employee(5));
        assert!(session(Role::Manager, Some(3)).can_view_employee(5));
        assert!(me.require_employee_profile().is_ok());
        assert!(session(Role::Admin, None).require_employee_profile().is_err());
    }
}
