// src/auth.rs

use actix_web::{web, HttpResponse, Responder};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{error, info};
use mongodb::bson::doc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::User;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub fn create_jwt(user_id: &str, secret: &str) -> String {
    let expiration = Utc::now() + Duration::hours(24);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).unwrap()
}

/// Decodes a bearer token and returns the caller's user id.
pub fn decode_user_id(token: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims.sub)
}

pub fn is_valid_email(email: &str) -> bool {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .map(|re| re.is_match(email))
        .unwrap_or(false)
}

// POST /auth/signup
pub async fn signup(
    data: web::Data<AppState>,
    signup_info: web::Json<SignupRequest>,
) -> impl Responder {
    if signup_info.full_name.trim().is_empty()
        || signup_info.email.trim().is_empty()
        || signup_info.password.is_empty()
    {
        return HttpResponse::BadRequest()
            .json(json!({ "success": false, "message": "All fields are required" }));
    }
    if !is_valid_email(&signup_info.email) {
        return HttpResponse::BadRequest()
            .json(json!({ "success": false, "message": "Invalid email address" }));
    }

    let users_collection = data.mongodb.db.collection::<User>("users");

    // Account emails are unique.
    match users_collection.find_one(doc! { "email": &signup_info.email }).await {
        Ok(Some(_)) => {
            return HttpResponse::BadRequest()
                .json(json!({ "success": false, "message": "Email already in use" }));
        }
        Ok(None) => {}
        Err(err) => {
            error!("Error checking existing email: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    }

    let hashed_password = match hash(&signup_info.password, DEFAULT_COST) {
        Ok(h) => h,
        Err(err) => {
            error!("Error hashing password: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    let now = Utc::now();
    let new_user = User {
        user_id: Uuid::new_v4().to_string(),
        full_name: signup_info.full_name.clone(),
        email: signup_info.email.clone(),
        bio: None,
        profile_pic: None,
        password: hashed_password,
        created_at: now,
        updated_at: now,
    };

    match users_collection.insert_one(&new_user).await {
        Ok(_) => {
            info!("User created: {}", new_user.user_id);
            HttpResponse::Created().json(json!({
                "success": true,
                "message": "User created successfully",
                "userId": new_user.user_id,
            }))
        }
        Err(err) => {
            error!("Error creating user: {}", err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }))
        }
    }
}

// POST /auth/login
pub async fn login(
    data: web::Data<AppState>,
    login_info: web::Json<LoginRequest>,
) -> impl Responder {
    let users_collection = data.mongodb.db.collection::<User>("users");

    match users_collection.find_one(doc! { "email": &login_info.email }).await {
        Ok(Some(user)) => {
            if verify(&login_info.password, &user.password).unwrap_or(false) {
                let token = create_jwt(&user.user_id, &data.config.jwt_secret);
                HttpResponse::Ok().json(json!({
                    "success": true,
                    "token": token,
                    "userId": user.user_id,
                }))
            } else {
                HttpResponse::Unauthorized()
                    .json(json!({ "success": false, "message": "Invalid credentials" }))
            }
        }
        Ok(None) => HttpResponse::Unauthorized()
            .json(json!({ "success": false, "message": "Invalid credentials" })),
        Err(err) => {
            error!("Error logging in: {}", err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_round_trip() {
        let token = create_jwt("user-123", "test-secret");
        let sub = decode_user_id(&token, "test-secret").unwrap();
        assert_eq!(sub, "user-123");
    }

    #[test]
    fn jwt_rejects_wrong_secret() {
        let token = create_jwt("user-123", "test-secret");
        assert!(decode_user_id(&token, "other-secret").is_err());
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("dev@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.io"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email(""));
    }
}
