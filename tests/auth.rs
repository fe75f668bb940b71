use credgate::auth::{check_owner_or_admin, check_user_type, AuthContext, TokenEngine, TokenIdentity, TokenLifetimes};
use credgate::error::{AuthError, TokenError};
use credgate::{MemoryUserStore, UserType};
use std::sync::Arc;
use std::time::Duration;

fn engine(lifetimes: TokenLifetimes) -> TokenEngine {
    TokenEngine::new(
        Some("integration_secret"),
        lifetimes,
        Arc::new(MemoryUserStore::new()),
        Duration::from_secs(5),
    )
    .expect("Failed to build token engine")
}

fn identity(user_type: UserType) -> TokenIdentity {
    TokenIdentity {
        email: "grace@example.com".to_string(),
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        user_type,
        user_id: "65f0c0ffee".to_string(),
    }
}

#[test]
fn test_validate_returns_minted_claims() {
    for user_type in [UserType::User, UserType::Admin] {
        let engine = engine(TokenLifetimes::default());
        let pair = engine.mint(&identity(user_type)).unwrap();

        let claims = engine.validate(&pair.token).unwrap();
        assert_eq!(claims.identity(), identity(user_type));
    }
}

#[test]
fn test_expired_and_tampered_tokens() {
    let expired = engine(TokenLifetimes {
        access: chrono::Duration::hours(-1),
        refresh: chrono::Duration::hours(-1),
    });
    let pair = expired.mint(&identity(UserType::User)).unwrap();
    assert_eq!(expired.validate(&pair.token), Err(TokenError::Expired));

    let fresh = engine(TokenLifetimes::default());
    let pair = fresh.mint(&identity(UserType::User)).unwrap();
    let mut parts: Vec<String> = pair.token.split('.').map(String::from).collect();
    let signature = parts[2].clone().into_bytes();
    let i = signature.len() / 3;
    let mut flipped = signature.clone();
    flipped[i] = if signature[i] == b'x' { b'y' } else { b'x' };
    parts[2] = String::from_utf8(flipped).unwrap();

    assert_eq!(fresh.validate(&parts.join(".")), Err(TokenError::InvalidSignature));
}

#[test]
fn test_role_predicates() {
    let user = AuthContext {
        email: "grace@example.com".to_string(),
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        uid: "123".to_string(),
        user_type: UserType::User,
    };
    let admin = AuthContext { user_type: UserType::Admin, ..user.clone() };

    assert_eq!(check_user_type(&user, UserType::Admin), Err(AuthError::Unauthorized));
    assert!(check_user_type(&admin, UserType::Admin).is_ok());

    assert!(check_owner_or_admin(&user, "123").is_ok());
    assert_eq!(check_owner_or_admin(&user, "456"), Err(AuthError::Unauthorized));
    assert!(check_owner_or_admin(&admin, "456").is_ok());
}
