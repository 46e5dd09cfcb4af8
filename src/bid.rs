// src/bid.rs

use std::collections::HashMap;

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use futures_util::StreamExt;
use log::{debug, error, info};
use mongodb::bson::{doc, Document};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::{now_bson, Bid, BidStatus, Project, PublicUser};
use crate::profile::load_public_users;
use crate::project::populate_project;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBidRequest {
    pub project_id: Option<String>,
    pub freelancer_id: Option<String>,
    pub amount: Option<f64>,
    pub proposal: Option<String>,
    pub delivery_time: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidQuery {
    pub project_id: Option<String>,
}

/// A bid as the API returns it: the freelancer reference replaced with its
/// public projection (null when the user is gone).
pub fn populate_bid(bid: &Bid, users: &HashMap<String, PublicUser>) -> serde_json::Value {
    let freelancer = users
        .get(&bid.freelancer_id)
        .map(|u| json!(u))
        .unwrap_or(serde_json::Value::Null);

    json!({
        "bidId": bid.bid_id,
        "projectId": bid.project_id,
        "freelancerId": freelancer,
        "amount": bid.amount,
        "proposal": bid.proposal,
        "deliveryTime": bid.delivery_time,
        "status": bid.status,
        "createdAt": bid.created_at,
    })
}

/// Filter matching every bid on the project except the one being accepted.
fn sibling_bids_filter(project_id: &str, bid_id: &str) -> Document {
    doc! { "projectId": project_id, "bidId": { "$ne": bid_id } }
}

// POST /projects/bids
pub async fn create_bid(
    req: HttpRequest,
    data: web::Data<AppState>,
    bid_info: web::Json<CreateBidRequest>,
) -> impl Responder {
    debug!("create_bid payload: {:?}", bid_info);
    if req.extensions().get::<String>().is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }

    let payload = bid_info.into_inner();
    let (project_id, freelancer_id, amount, proposal, delivery_time) = match (
        payload.project_id.filter(|v| !v.trim().is_empty()),
        payload.freelancer_id.filter(|v| !v.trim().is_empty()),
        payload.amount,
        payload.proposal.filter(|v| !v.trim().is_empty()),
        payload.delivery_time,
    ) {
        (Some(p), Some(f), Some(a), Some(prop), Some(d)) => (p, f, a, prop, d),
        _ => {
            return HttpResponse::BadRequest()
                .json(json!({ "success": false, "message": "All fields are required" }));
        }
    };

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

    let bids_collection = data.mongodb.db.collection::<Bid>("bids");

    // One bid per freelancer per project. Checked by query, not an index,
    // so concurrent duplicate submissions can still race past each other.
    match bids_collection
        .find_one(doc! { "projectId": &project_id, "freelancerId": &freelancer_id })
        .await
    {
        Ok(Some(_)) => {
            return HttpResponse::BadRequest()
                .json(json!({ "success": false, "message": "Bid already exists" }));
        }
        Ok(None) => {}
        Err(err) => {
            error!("Error checking for existing bid: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    }

    let new_bid = Bid {
        bid_id: Uuid::new_v4().to_string(),
        project_id,
        freelancer_id,
        amount,
        proposal,
        delivery_time,
        status: BidStatus::Pending,
        created_at: Utc::now(),
    };

    match bids_collection.insert_one(&new_bid).await {
        Ok(_) => {
            info!("Bid created: {} on project {}", new_bid.bid_id, new_bid.project_id);
            HttpResponse::Created().json(json!({
                "success": true,
                "message": "Bid created successfully",
                "bid": new_bid,
            }))
        }
        Err(err) => {
            error!("Error creating bid: {}", err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }))
        }
    }
}

// GET /projects/bids?projectId=
pub async fn get_bids(data: web::Data<AppState>, query: web::Query<BidQuery>) -> impl Responder {
    let project_id = match query.project_id.as_deref().filter(|v| !v.is_empty()) {
        Some(id) => id.to_string(),
        None => {
            return HttpResponse::BadRequest()
                .json(json!({ "success": false, "message": "Project ID is required" }));
        }
    };

    let bids_collection = data.mongodb.db.collection::<Bid>("bids");
    let mut cursor = match bids_collection.find(doc! { "projectId": &project_id }).await {
        Ok(cursor) => cursor,
        Err(err) => {
            error!("Error fetching bids: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    let mut bids = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(bid) => bids.push(bid),
            Err(err) => {
                error!("Error iterating bids: {}", err);
                return HttpResponse::InternalServerError()
                    .json(json!({ "success": false, "message": "Server error" }));
            }
        }
    }

    let freelancer_ids: Vec<String> = bids.iter().map(|b| b.freelancer_id.clone()).collect();
    let users = match load_public_users(&data.mongodb.db, &freelancer_ids).await {
        Ok(users) => users,
        Err(err) => {
            error!("Error loading freelancers: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    let bids: Vec<serde_json::Value> = bids.iter().map(|b| populate_bid(b, &users)).collect();

    HttpResponse::Ok().json(json!({ "success": true, "bids": bids }))
}

// PUT /projects/bids/{bid_id}/accept
// Only the project owner may accept. Three sequential writes with no
// transaction: a failure partway leaves the earlier writes in place.
pub async fn accept_bid(
    req: HttpRequest,
    data: web::Data<AppState>,
    bid_id: web::Path<String>,
) -> impl Responder {
    let bid_id = bid_id.into_inner();
    let current_user = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };

    let bids_collection = data.mongodb.db.collection::<Bid>("bids");
    let mut bid = match bids_collection.find_one(doc! { "bidId": &bid_id }).await {
        Ok(Some(bid)) => bid,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(json!({ "success": false, "message": "Bid not found" }));
        }
        Err(err) => {
            error!("Error fetching bid: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    let projects_collection = data.mongodb.db.collection::<Project>("projects");
    let project = match projects_collection
        .find_one(doc! { "projectId": &bid.project_id })
        .await
    {
        Ok(Some(project)) => project,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(json!({ "success": false, "message": "Project not found" }));
        }
        Err(err) => {
            error!("Error fetching project: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    if project.created_by != current_user {
        return HttpResponse::Forbidden().json(json!({
            "success": false,
            "message": "You are not authorized to perform this action",
        }));
    }

    // 1) Accept the target bid.
    if let Err(err) = bids_collection
        .update_one(doc! { "bidId": &bid_id }, doc! { "$set": { "status": "accepted" } })
        .await
    {
        error!("Error accepting bid {}: {}", bid_id, err);
        return HttpResponse::InternalServerError()
            .json(json!({ "success": false, "message": "Server error" }));
    }

    // 2) Reject every sibling bid on the project.
    if let Err(err) = bids_collection
        .update_many(
            sibling_bids_filter(&bid.project_id, &bid_id),
            doc! { "$set": { "status": "rejected" } },
        )
        .await
    {
        error!("Error rejecting sibling bids for {}: {}", bid.project_id, err);
        return HttpResponse::InternalServerError()
            .json(json!({ "success": false, "message": "Server error" }));
    }

    // 3) Assign the freelancer and move the project to "in progress".
    if let Err(err) = projects_collection
        .update_one(
            doc! { "projectId": &bid.project_id },
            doc! { "$set": {
                "assignedFreelancer": &bid.freelancer_id,
                "status": "in progress",
                "updatedAt": now_bson(),
            } },
        )
        .await
    {
        error!("Error assigning project {}: {}", bid.project_id, err);
        return HttpResponse::InternalServerError()
            .json(json!({ "success": false, "message": "Server error" }));
    }

    bid.status = BidStatus::Accepted;
    info!("Bid {} accepted on project {}", bid.bid_id, bid.project_id);

    let updated_project = match projects_collection
        .find_one(doc! { "projectId": &bid.project_id })
        .await
    {
        Ok(Some(project)) => project,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(json!({ "success": false, "message": "Project not found" }));
        }
        Err(err) => {
            error!("Error reloading project: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    let mut user_ids = vec![updated_project.created_by.clone()];
    if let Some(assigned) = &updated_project.assigned_freelancer {
        user_ids.push(assigned.clone());
    }
    let users = match load_public_users(&data.mongodb.db, &user_ids).await {
        Ok(users) => users,
        Err(err) => {
            error!("Error loading users for accepted bid: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Bid accepted successfully",
        "bid": bid,
        "project": populate_project(&updated_project, &users),
    }))
}

// PUT /projects/bids/{bid_id}/decline
// Owner-only single-field update; sibling bids are untouched.
pub async fn decline_bid(
    req: HttpRequest,
    data: web::Data<AppState>,
    bid_id: web::Path<String>,
) -> impl Responder {
    let bid_id = bid_id.into_inner();
    let current_user = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };

    let bids_collection = data.mongodb.db.collection::<Bid>("bids");
    let mut bid = match bids_collection.find_one(doc! { "bidId": &bid_id }).await {
        Ok(Some(bid)) => bid,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(json!({ "success": false, "message": "Bid not found" }));
        }
        Err(err) => {
            error!("Error fetching bid: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    let projects_collection = data.mongodb.db.collection::<Project>("projects");
    let project = match projects_collection
        .find_one(doc! { "projectId": &bid.project_id })
        .await
    {
        Ok(Some(project)) => project,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(json!({ "success": false, "message": "Project not found" }));
        }
        Err(err) => {
            error!("Error fetching project: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    if project.created_by != current_user {
        return HttpResponse::Forbidden().json(json!({
            "success": false,
            "message": "You are not authorized to perform this action",
        }));
    }

    if let Err(err) = bids_collection
        .update_one(doc! { "bidId": &bid_id }, doc! { "$set": { "status": "rejected" } })
        .await
    {
        error!("Error declining bid {}: {}", bid_id, err);
        return HttpResponse::InternalServerError()
            .json(json!({ "success": false, "message": "Server error" }));
    }

    bid.status = BidStatus::Rejected;
    info!("Bid {} declined on project {}", bid.bid_id, bid.project_id);

    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Bid declined successfully",
        "bid": bid,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_filter_excludes_the_accepted_bid() {
        let filter = sibling_bids_filter("project-1", "bid-1");
        assert_eq!(filter.get_str("projectId").unwrap(), "project-1");
        let ne = filter.get_document("bidId").unwrap();
        assert_eq!(ne.get_str("$ne").unwrap(), "bid-1");
    }

    #[test]
    fn populate_bid_nulls_unknown_freelancers() {
        let bid = Bid {
            bid_id: "b1".into(),
            project_id: "p1".into(),
            freelancer_id: "ghost".into(),
            amount: 100.0,
            proposal: "hire me".into(),
            delivery_time: 3,
            status: BidStatus::Pending,
            created_at: Utc::now(),
        };
        let value = populate_bid(&bid, &HashMap::new());
        assert!(value.get("freelancerId").unwrap().is_null());
        assert_eq!(value.get("status").unwrap(), "pending");
    }
}
