use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Request body for login. Fields are optional so that missing values surface
/// as field-level validation errors rather than a JSON rejection.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Request body for user registration.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Response returned after login or register.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_response_uses_camel_case() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(SessionResponse {
            authenticated: true,
            user_id: id,
        })
        .unwrap();
        assert_eq!(json["authenticated"], true);
        assert_eq!(json["userId"], id.to_string());
    }

    #[test]
    fn public_user_omits_password_hash() {
        let now = time::OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: "test@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: now,
            updated_at: now,
        };
        let raw = serde_json::to_string(&user).unwrap();
        assert!(!raw.contains("argon2id"));

        let public = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert_eq!(public["email"], "test@example.com");
        assert_eq!(public.as_object().unwrap().len(), 2);
    }

    #[test]
    fn login_request_tolerates_missing_fields() {
        let req: LoginRequest = serde_json::from_str(r#"{"email":"a@x.com"}"#).unwrap();
        assert_eq!(req.email.as_deref(), Some("a@x.com"));
        assert!(req.password.is_none());
    }
}
