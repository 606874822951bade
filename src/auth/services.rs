use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        password,
        repo::UserStore,
        repo_types::User,
    },
    errors::{AppError, FieldError},
};

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Checks that both credentials are present. Returns the normalised email and password.
pub fn validate_login(req: LoginRequest) -> Result<(String, String), AppError> {
    match (non_empty(req.email), non_empty(req.password)) {
        (Some(email), Some(password)) => Ok((normalize_email(&email), password)),
        (email, password) => {
            let mut fields = Vec::new();
            if email.is_none() {
                fields.push(FieldError::new("email", "Email is required"));
            }
            if password.is_none() {
                fields.push(FieldError::new("password", "Password is required"));
            }
            Err(AppError::Validation("Email and password are required", fields))
        }
    }
}

pub fn validate_registration(req: RegisterRequest) -> Result<(String, String), AppError> {
    let email = non_empty(req.email).map(|e| normalize_email(&e));
    let password = non_empty(req.password);

    let mut fields = Vec::new();
    match &email {
        None => fields.push(FieldError::new("email", "Email is required")),
        Some(e) if !is_valid_email(e) => fields.push(FieldError::new("email", "Invalid email")),
        Some(_) => {}
    }
    match &password {
        None => fields.push(FieldError::new("password", "Password is required")),
        Some(p) if p.chars().count() < MIN_PASSWORD_LEN => fields.push(FieldError::new(
            "password",
            "Password must be at least 8 characters",
        )),
        Some(_) => {}
    }

    match (email, password) {
        (Some(email), Some(password)) if fields.is_empty() => Ok((email, password)),
        _ => Err(AppError::Validation("Validation failed", fields)),
    }
}

/// Looks the user up, then verifies the password. Unknown email and wrong
/// password both yield `AppError::InvalidCredentials`.
pub async fn authenticate(
    users: &dyn UserStore,
    email: &str,
    plain: String,
) -> Result<User, AppError> {
    let Some(user) = users.find_by_email(email).await? else {
        password::verify(plain, password::dummy_hash().to_owned()).await?;
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !password::verify(plain, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}

pub async fn register_user(
    users: &dyn UserStore,
    email: &str,
    plain: String,
) -> Result<User, AppError> {
    let hash = password::hash(plain).await?;
    let user = users.create(email, &hash).await.map_err(|e| {
        warn!(email = %email, error = %e, "create user failed");
        AppError::from(e)
    })?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::memory::MemoryUserStore;

    fn login(email: Option<&str>, password: Option<&str>) -> LoginRequest {
        LoginRequest {
            email: email.map(String::from),
            password: password.map(String::from),
        }
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("no at sign.com"));
    }

    #[test]
    fn login_validation_reports_each_missing_field() {
        match validate_login(login(None, Some("  "))) {
            Err(AppError::Validation(_, fields)) => {
                assert_eq!(
                    fields,
                    vec![
                        FieldError::new("email", "Email is required"),
                        FieldError::new("password", "Password is required"),
                    ]
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        match validate_login(login(Some("a@x.com"), None)) {
            Err(AppError::Validation(_, fields)) => {
                assert_eq!(fields, vec![FieldError::new("password", "Password is required")]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn login_validation_normalises_email() {
        let (email, password) = validate_login(login(Some("  A@X.com "), Some("secret123"))).unwrap();
        assert_eq!(email, "a@x.com");
        assert_eq!(password, "secret123");
    }

    #[test]
    fn registration_rejects_bad_email_and_short_password() {
        let req = RegisterRequest {
            email: Some("nope".into()),
            password: Some("short".into()),
        };
        match validate_registration(req) {
            Err(AppError::Validation(_, fields)) => {
                let names: Vec<_> = fields.iter().map(|f| f.field).collect();
                assert_eq!(names, vec!["email", "password"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn authenticate_collapses_failure_causes() {
        let store = MemoryUserStore::default();
        register_user(&store, "a@x.com", "secret123".into()).await.unwrap();

        let unknown = authenticate(&store, "b@x.com", "secret123".into()).await;
        let wrong = authenticate(&store, "a@x.com", "wrong".into()).await;
        assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
        assert!(matches!(wrong, Err(AppError::InvalidCredentials)));

        let user = authenticate(&store, "a@x.com", "secret123".into()).await.unwrap();
        assert_eq!(user.email, "a@x.com");
    }

    #[tokio::test]
    async fn register_twice_conflicts() {
        let store = MemoryUserStore::default();
        register_user(&store, "a@x.com", "secret123".into()).await.unwrap();
        let err = register_user(&store, "a@x.com", "another1".into()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
