// src/invite.rs

use std::fmt::Write as _;

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, Duration, Utc};
use log::{error, info};
use mongodb::bson::doc;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::is_valid_email;
use crate::models::{Invite, Project};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteRequest {
    pub project_id: Option<String>,
    pub email: Option<String>,
    pub invited_by: Option<String>,
    pub description: Option<String>,
}

/// 20 random bytes, hex-encoded. Unguessable; never redeemed anywhere.
pub fn generate_invite_token() -> String {
    let mut bytes = [0u8; 20];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().fold(String::with_capacity(40), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

/// Invites lapse 24 hours after issuance. The expiry is stored but never
/// checked; no redemption endpoint exists.
pub fn invite_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(24)
}

// POST /projects/invites
pub async fn create_invite(
    req: HttpRequest,
    data: web::Data<AppState>,
    invite_info: web::Json<CreateInviteRequest>,
) -> impl Responder {
    if req.extensions().get::<String>().is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }

    let payload = invite_info.into_inner();
    let (project_id, email, invited_by) = match (
        payload.project_id.filter(|v| !v.trim().is_empty()),
        payload.email.filter(|v| !v.trim().is_empty()),
        payload.invited_by.filter(|v| !v.trim().is_empty()),
    ) {
        (Some(p), Some(e), Some(i)) => (p, e, i),
        _ => {
            return HttpResponse::BadRequest()
                .json(json!({ "success": false, "message": "All fields are required" }));
        }
    };

    if !is_valid_email(&email) {
        return HttpResponse::BadRequest()
            .json(json!({ "success": false, "message": "Invalid email address" }));
    }

    let projects_collection = data.mongodb.db.collection::<Project>("projects");
    match projects_collection.find_one(doc! { "projectId": &project_id }).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(json!({ "success": false, "message": "Project not found" }));
        }
        Err(err) => {
            error!("Error fetching project: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    }

    let now = Utc::now();
    let new_invite = Invite {
        invite_id: Uuid::new_v4().to_string(),
        project_id,
        email,
        invited_by,
        description: payload.description,
        token: generate_invite_token(),
        expires_at: invite_expiry(now),
        created_at: now,
    };

    let invites_collection = data.mongodb.db.collection::<Invite>("invites");
    match invites_collection.insert_one(&new_invite).await {
        Ok(_) => {
            info!("Invite created: {} for project {}", new_invite.invite_id, new_invite.project_id);
            HttpResponse::Created().json(json!({
                "success": true,
                "message": "Invite created successfully",
                "invite": new_invite,
            }))
        }
        Err(err) => {
            error!("Error creating invite: {}", err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_forty_hex_chars() {
        let token = generate_invite_token();
        assert_eq!(token.len(), 40);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        assert_ne!(generate_invite_token(), generate_invite_token());
    }

    #[test]
    fn invites_lapse_after_a_day() {
        let now = Utc::now();
        assert_eq!(invite_expiry(now) - now, Duration::hours(24));
    }
}
