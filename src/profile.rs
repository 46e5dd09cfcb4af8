// src/profile.rs

use std::collections::HashMap;

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{error, info};
use mongodb::bson::{doc, Document};
use mongodb::Database;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::models::{now_bson, PublicUser, User};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
}

/// Row shape for the public user listing: no email, no secrets.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserListing {
    user_id: String,
    full_name: String,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    profile_pic: Option<String>,
    created_at: DateTime<Utc>,
}

/// Loads the public projection of the given users, keyed by user id.
/// Handlers use this wherever the API embeds a user reference.
pub async fn load_public_users(
    db: &Database,
    ids: &[String],
) -> Result<HashMap<String, PublicUser>, mongodb::error::Error> {
    let mut users = HashMap::new();
    if ids.is_empty() {
        return Ok(users);
    }

    let users_collection = db.collection::<PublicUser>("users");
    let mut cursor = users_collection
        .find(doc! { "userId": { "$in": ids.to_vec() } })
        .await?;
    while let Some(user) = cursor.next().await {
        let user = user?;
        users.insert(user.user_id.clone(), user);
    }
    Ok(users)
}

/// Everything a caller may see about their own account: the stored user
/// minus the password hash.
fn sanitized_user(user: &User) -> serde_json::Value {
    json!({
        "userId": user.user_id,
        "fullName": user.full_name,
        "email": user.email,
        "bio": user.bio,
        "profilePic": user.profile_pic,
        "createdAt": user.created_at,
        "updatedAt": user.updated_at,
    })
}

/// Builds the `$set` document for a partial profile update. Only fields
/// that are present and non-empty overwrite; everything else is left alone.
fn build_profile_update(payload: &UpdateProfileRequest) -> Document {
    let mut set_doc = doc! {};
    if let Some(full_name) = payload.full_name.as_deref().filter(|v| !v.is_empty()) {
        set_doc.insert("fullName", full_name);
    }
    if let Some(bio) = payload.bio.as_deref().filter(|v| !v.is_empty()) {
        set_doc.insert("bio", bio);
    }
    if let Some(profile_pic) = payload.profile_pic.as_deref().filter(|v| !v.is_empty()) {
        set_doc.insert("profilePic", profile_pic);
    }
    set_doc
}

// GET /users/profile
pub async fn get_profile(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let current_user = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };

    let users_collection = data.mongodb.db.collection::<User>("users");
    match users_collection.find_one(doc! { "userId": &current_user }).await {
        Ok(Some(user)) => HttpResponse::Ok().json(sanitized_user(&user)),
        Ok(None) => HttpResponse::NotFound()
            .json(json!({ "success": false, "message": "User not found" })),
        Err(err) => {
            error!("Error fetching profile: {}", err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }))
        }
    }
}

// PUT /users/update-profile
pub async fn update_profile(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<UpdateProfileRequest>,
) -> impl Responder {
    let current_user = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };

    let mut set_doc = build_profile_update(&payload);
    if set_doc.is_empty() {
        return HttpResponse::BadRequest()
            .json(json!({ "success": false, "message": "No fields to update" }));
    }
    set_doc.insert("updatedAt", now_bson());

    let users_collection = data.mongodb.db.collection::<User>("users");
    let filter = doc! { "userId": &current_user };
    match users_collection.update_one(filter.clone(), doc! { "$set": set_doc }).await {
        Ok(res) if res.matched_count == 0 => {
            return HttpResponse::NotFound()
                .json(json!({ "success": false, "message": "User not found" }));
        }
        Ok(_) => {}
        Err(err) => {
            error!("Error updating profile: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    }

    match users_collection.find_one(filter).await {
        Ok(Some(user)) => HttpResponse::Ok().json(json!({
            "message": "Profile updated successfully",
            "user": sanitized_user(&user),
        })),
        Ok(None) => HttpResponse::NotFound()
            .json(json!({ "success": false, "message": "User not found" })),
        Err(err) => {
            error!("Error reloading profile: {}", err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }))
        }
    }
}

// DELETE /users/profile
pub async fn delete_profile(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let current_user = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };

    let users_collection = data.mongodb.db.collection::<User>("users");
    match users_collection.delete_one(doc! { "userId": &current_user }).await {
        Ok(res) if res.deleted_count == 0 => HttpResponse::NotFound()
            .json(json!({ "success": false, "message": "User not found" })),
        Ok(_) => {
            info!("Account deleted: {}", current_user);
            HttpResponse::Ok().json(json!({ "message": "Account deleted successfully" }))
        }
        Err(err) => {
            error!("Error deleting account: {}", err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }))
        }
    }
}

// GET /users/profile/{id}
// Public subset of a profile: fullName, bio, email, profilePic, createdAt.
pub async fn get_public_profile(
    data: web::Data<AppState>,
    user_id: web::Path<String>,
) -> impl Responder {
    let users_collection = data.mongodb.db.collection::<User>("users");
    match users_collection.find_one(doc! { "userId": &*user_id }).await {
        Ok(Some(user)) => HttpResponse::Ok().json(json!({
            "user": {
                "fullName": user.full_name,
                "bio": user.bio,
                "email": user.email,
                "profilePic": user.profile_pic,
                "createdAt": user.created_at,
            }
        })),
        Ok(None) => HttpResponse::NotFound()
            .json(json!({ "success": false, "message": "User not found" })),
        Err(err) => {
            error!("Error fetching public profile: {}", err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }))
        }
    }
}

// GET /users/all-users
// Unbounded listing, newest first.
pub async fn get_all_users(data: web::Data<AppState>) -> impl Responder {
    let users_collection = data.mongodb.db.collection::<UserListing>("users");
    let mut cursor = match users_collection
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await
    {
        Ok(cursor) => cursor,
        Err(err) => {
            error!("Error fetching users: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    let mut users = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(user) => users.push(user),
            Err(err) => {
                error!("Error iterating users: {}", err);
                return HttpResponse::InternalServerError()
                    .json(json!({ "success": false, "message": "Server error" }));
            }
        }
    }

    HttpResponse::Ok().json(json!({ "success": true, "users": users }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_doc_keeps_only_truthy_fields() {
        let payload = UpdateProfileRequest {
            full_name: Some("Ada Lovelace".to_string()),
            bio: None,
            profile_pic: Some(String::new()),
        };
        let set_doc = build_profile_update(&payload);
        assert_eq!(set_doc.get_str("fullName").unwrap(), "Ada Lovelace");
        assert!(!set_doc.contains_key("bio"));
        assert!(!set_doc.contains_key("profilePic"));
    }

    #[test]
    fn update_doc_empty_when_nothing_provided() {
        let payload = UpdateProfileRequest {
            full_name: None,
            bio: None,
            profile_pic: None,
        };
        assert!(build_profile_update(&payload).is_empty());
    }
}
