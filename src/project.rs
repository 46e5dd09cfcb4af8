// src/project.rs

use std::collections::HashMap;

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use futures_util::StreamExt;
use log::{debug, error, info};
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::bid::populate_bid;
use crate::models::{Bid, Project, ProjectStatus, ProjectType, PublicUser};
use crate::profile::load_public_users;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub skills: Option<Vec<String>>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    #[serde(rename = "type")]
    pub project_type: Option<ProjectType>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    #[serde(rename = "type")]
    pub project_type: Option<String>,
}

/// A project as the API returns it: creator and assigned freelancer
/// replaced with their public projections (null when the user is gone).
pub fn populate_project(
    project: &Project,
    users: &HashMap<String, PublicUser>,
) -> serde_json::Value {
    let created_by = users
        .get(&project.created_by)
        .map(|u| json!(u))
        .unwrap_or(serde_json::Value::Null);
    let assigned_freelancer = project
        .assigned_freelancer
        .as_ref()
        .and_then(|id| users.get(id))
        .map(|u| json!(u))
        .unwrap_or(serde_json::Value::Null);

    json!({
        "projectId": project.project_id,
        "title": project.title,
        "description": project.description,
        "skills": project.skills,
        "budgetMin": project.budget_min,
        "budgetMax": project.budget_max,
        "type": project.project_type,
        "status": project.status,
        "createdBy": created_by,
        "assignedFreelancer": assigned_freelancer,
        "createdAt": project.created_at,
        "updatedAt": project.updated_at,
    })
}

// POST /projects
pub async fn create_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_info: web::Json<CreateProjectRequest>,
) -> impl Responder {
    debug!("create_project payload: {:?}", project_info);
    let current_user = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };

    let payload = project_info.into_inner();
    let (title, description, skills, budget_min, budget_max, project_type) = match (
        payload.title.filter(|t| !t.trim().is_empty()),
        payload.description.filter(|d| !d.trim().is_empty()),
        payload.skills,
        payload.budget_min,
        payload.budget_max,
        payload.project_type,
    ) {
        (Some(t), Some(d), Some(s), Some(min), Some(max), Some(ty)) => (t, d, s, min, max, ty),
        _ => {
            return HttpResponse::BadRequest()
                .json(json!({ "success": false, "message": "All fields are required" }));
        }
    };

    let now = Utc::now();
    let new_project = Project {
        project_id: Uuid::new_v4().to_string(),
        title,
        description,
        skills,
        budget_min,
        budget_max,
        project_type,
        status: ProjectStatus::Open,
        created_by: current_user,
        assigned_freelancer: None,
        created_at: now,
        updated_at: now,
    };

    let projects_collection = data.mongodb.db.collection::<Project>("projects");
    match projects_collection.insert_one(&new_project).await {
        Ok(_) => {
            info!("Project created: {}", new_project.project_id);
            HttpResponse::Created().json(json!({
                "success": true,
                "message": "Project created successfully",
                "project": new_project,
            }))
        }
        Err(err) => {
            error!("Error creating project: {}", err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }))
        }
    }
}

// GET /projects?type=
// Newest first; creator populated.
pub async fn list_projects(
    data: web::Data<AppState>,
    query: web::Query<ProjectQuery>,
) -> impl Responder {
    let filter = match &query.project_type {
        Some(project_type) => doc! { "type": project_type },
        None => doc! {},
    };

    let projects_collection = data.mongodb.db.collection::<Project>("projects");
    let mut cursor = match projects_collection
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .await
    {
        Ok(cursor) => cursor,
        Err(err) => {
            error!("Error fetching projects: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    let mut projects = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(project) => projects.push(project),
            Err(err) => {
                error!("Error iterating projects: {}", err);
                return HttpResponse::InternalServerError()
                    .json(json!({ "success": false, "message": "Server error" }));
            }
        }
    }

    let mut user_ids: Vec<String> = Vec::new();
    for project in &projects {
        user_ids.push(project.created_by.clone());
        if let Some(assigned) = &project.assigned_freelancer {
            user_ids.push(assigned.clone());
        }
    }
    let users = match load_public_users(&data.mongodb.db, &user_ids).await {
        Ok(users) => users,
        Err(err) => {
            error!("Error loading project creators: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    let projects: Vec<serde_json::Value> =
        projects.iter().map(|p| populate_project(p, &users)).collect();

    HttpResponse::Ok().json(json!({ "success": true, "projects": projects }))
}

// GET /projects/{id}
// Returns the project together with all of its bids; the detail view reads
// both in one round trip.
pub async fn get_project_with_bids(
    data: web::Data<AppState>,
    project_id: web::Path<String>,
) -> impl Responder {
    let projects_collection = data.mongodb.db.collection::<Project>("projects");
    let project = match projects_collection
        .find_one(doc! { "projectId": &*project_id })
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

    let bids_collection = data.mongodb.db.collection::<Bid>("bids");
    let mut cursor = match bids_collection
        .find(doc! { "projectId": &*project_id })
        .sort(doc! { "createdAt": -1 })
        .await
    {
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

    let mut user_ids: Vec<String> = vec![project.created_by.clone()];
    if let Some(assigned) = &project.assigned_freelancer {
        user_ids.push(assigned.clone());
    }
    user_ids.extend(bids.iter().map(|b| b.freelancer_id.clone()));

    let users = match load_public_users(&data.mongodb.db, &user_ids).await {
        Ok(users) => users,
        Err(err) => {
            error!("Error loading users for project view: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": "Server error" }));
        }
    };

    let bids: Vec<serde_json::Value> = bids.iter().map(|b| populate_bid(b, &users)).collect();

    HttpResponse::Ok().json(json!({
        "success": true,
        "project": populate_project(&project, &users),
        "bids": bids,
    }))
}
