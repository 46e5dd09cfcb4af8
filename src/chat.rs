// src/chat.rs

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use log::{error, info};
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::Chat;
use crate::profile::load_public_users;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartChatRequest {
    pub receiver_id: String,
}

/// Participant pairs are stored sorted so equal pairs always serialize to
/// the same document, whichever side initiated the chat.
pub fn normalized_participants(a: &str, b: &str) -> Vec<String> {
    let mut pair = vec![a.to_string(), b.to_string()];
    pair.sort();
    pair
}

// POST /chats/start
// Finds the chat between the caller and the receiver, creating it when
// absent. The lookup is order-independent; the find-then-insert sequence is
// not atomic, so two simultaneous first contacts can still create two
// documents (no unique index guards the pair).
pub async fn start_chat(
    req: HttpRequest,
    data: web::Data<AppState>,
    chat_info: web::Json<StartChatRequest>,
) -> impl Responder {
    let current_user = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };

    let receiver_id = chat_info.receiver_id.trim().to_string();
    if receiver_id.is_empty() {
        return HttpResponse::BadRequest()
            .json(json!({ "success": false, "message": "Receiver ID is required" }));
    }

    let pair = normalized_participants(&current_user, &receiver_id);

    // The receiver backs the convenience pointer in the response, so an
    // unknown id is a 404 up front.
    let public_users = match load_public_users(&data.mongodb.db, &pair).await {
        Ok(users) => users,
        Err(err) => {
            error!("Error loading chat participants: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };
    let receiver_user = match public_users.get(&receiver_id) {
        Some(user) => user.clone(),
        None => {
            return HttpResponse::NotFound()
                .json(json!({ "success": false, "message": "User not found" }));
        }
    };

    let chats_collection = data.mongodb.db.collection::<Chat>("chats");
    let filter = doc! { "participants": { "$all": [&current_user, &receiver_id] } };

    let chat = match chats_collection.find_one(filter).await {
        Ok(Some(chat)) => chat,
        Ok(None) => {
            let now = Utc::now();
            let new_chat = Chat {
                chat_id: Uuid::new_v4().to_string(),
                participants: pair,
                created_at: now,
                updated_at: now,
            };
            if let Err(err) = chats_collection.insert_one(&new_chat).await {
                error!("Error creating chat: {}", err);
                return HttpResponse::InternalServerError()
                    .json(json!({ "success": false, "message": "Server error" }));
            }
            info!("Chat created: {}", new_chat.chat_id);
            new_chat
        }
        Err(err) => {
            error!("Error looking up chat: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    let participants: Vec<serde_json::Value> = chat
        .participants
        .iter()
        .map(|id| match public_users.get(id) {
            Some(user) => json!(user),
            None => serde_json::Value::Null,
        })
        .collect();

    HttpResponse::Ok().json(json!({
        "success": true,
        "chat": {
            "chatId": chat.chat_id,
            "participants": participants,
            "createdAt": chat.created_at,
            "updatedAt": chat.updated_at,
        },
        "receiverUser": receiver_user,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_pair_is_order_independent() {
        assert_eq!(
            normalized_participants("user-b", "user-a"),
            normalized_participants("user-a", "user-b"),
        );
        assert_eq!(
            normalized_participants("user-b", "user-a"),
            vec!["user-a".to_string(), "user-b".to_string()],
        );
    }
}
