//! Structural checks on signup input.
//!
//! Every violated rule is reported, not just the first one.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::db::{NewUser, UserType};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?)+$"
    ).unwrap();

    /// E.164: leading plus, up to 15 digits, no leading zero
    static ref E164_REGEX: Regex = Regex::new(r"^\+[1-9][0-9]{1,14}$").unwrap();
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub user_type: Option<String>,
}

/// A signup request that passed validation, password still in plain text.
#[derive(Debug, Clone)]
pub struct ValidSignup {
    pub user: NewUser,
    pub password: String,
}

fn check_length(
    errors: &mut Vec<String>,
    field: &str,
    value: &Option<String>,
    min: usize,
    max: usize,
) -> Option<String> {
    match value {
        None => {
            errors.push(format!("{} is required", field));
            None
        }
        Some(v) => {
            let len = v.chars().count();
            if len < min {
                errors.push(format!("{} must be at least {} characters", field, min));
            } else if len > max {
                errors.push(format!("{} must be at most {} characters", field, max));
            }
            Some(v.clone())
        }
    }
}

pub fn validate_signup(req: &SignupRequest) -> Result<ValidSignup, Vec<String>> {
    let mut errors = Vec::new();

    let first_name = check_length(&mut errors, "first_name", &req.first_name, 2, 100);
    let last_name = check_length(&mut errors, "last_name", &req.last_name, 2, 100);
    let username = check_length(&mut errors, "username", &req.username, 3, 50);
    let password = check_length(&mut errors, "password", &req.password, 8, 100);

    let email = match &req.email {
        None => {
            errors.push("email is required".to_string());
            None
        }
        Some(e) if !EMAIL_REGEX.is_match(e) => {
            errors.push("email must be a valid email address".to_string());
            None
        }
        Some(e) => Some(e.clone()),
    };

    let phone = match req.phone.as_deref() {
        None | Some("") => None,
        Some(p) if !E164_REGEX.is_match(p) => {
            errors.push("phone must be in E.164 format".to_string());
            None
        }
        Some(p) => Some(p.to_string()),
    };

    let user_type = match req.user_type.as_deref() {
        None => {
            errors.push("user_type is required".to_string());
            None
        }
        Some(t) => match t.parse::<UserType>() {
            Ok(t) => Some(t),
            Err(_) => {
                errors.push("user_type must be one of USER, ADMIN".to_string());
                None
            }
        },
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    match (first_name, last_name, username, password, email, user_type) {
        (Some(first_name), Some(last_name), Some(username), Some(password), Some(email), Some(user_type)) => {
            Ok(ValidSignup {
                user: NewUser {
                    first_name,
                    last_name,
                    username,
                    email,
                    phone,
                    user_type,
                },
                password,
            })
        }
        _ => Err(vec!["signup request is incomplete".to_string()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SignupRequest {
        SignupRequest {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            username: Some("ada".into()),
            password: Some("analytical-engine".into()),
            email: Some("ada@example.com".into()),
            phone: Some("+447700900123".into()),
            user_type: Some("ADMIN".into()),
        }
    }

    #[test]
    fn test_valid_signup() {
        let ok = validate_signup(&valid()).unwrap();
        assert_eq!(ok.user.user_type, UserType::Admin);
        assert_eq!(ok.user.phone.as_deref(), Some("+447700900123"));
        assert_eq!(ok.password, "analytical-engine");
    }

    #[test]
    fn test_phone_is_optional() {
        let mut req = valid();
        req.phone = None;
        assert!(validate_signup(&req).unwrap().user.phone.is_none());

        req.phone = Some(String::new());
        assert!(validate_signup(&req).unwrap().user.phone.is_none());
    }

    #[test]
    fn test_all_violations_are_listed() {
        let req = SignupRequest {
            first_name: Some("A".into()),
            last_name: None,
            username: Some("x".repeat(51)),
            password: Some("short".into()),
            email: Some("not-an-email".into()),
            phone: Some("0044 7700".into()),
            user_type: Some("ROOT".into()),
        };

        let errors = validate_signup(&req).unwrap_err();
        assert_eq!(
            errors,
            vec![
                "first_name must be at least 2 characters",
                "last_name is required",
                "username must be at most 50 characters",
                "password must be at least 8 characters",
                "email must be a valid email address",
                "phone must be in E.164 format",
                "user_type must be one of USER, ADMIN",
            ]
        );
    }

    #[test]
    fn test_email_shapes() {
        for good in ["a@b.co", "first.last+tag@sub.example.org"] {
            assert!(EMAIL_REGEX.is_match(good), "{}", good);
        }
        for bad in ["plain", "@example.com", "a@", "a@localhost", "a b@example.com"] {
            assert!(!EMAIL_REGEX.is_match(bad), "{}", bad);
        }
    }

    #[test]
    fn test_user_type_is_case_sensitive() {
        let mut req = valid();
        req.user_type = Some("admin".into());
        assert!(validate_signup(&req).is_err());
    }
}
