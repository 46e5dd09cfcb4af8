use chrono::{DateTime, Utc};
use mongodb::bson::{self, Bson};
use serde::{Deserialize, Serialize};

/// Current time as the BSON value chrono's serde mapping produces, so
/// `$set` updates stay comparable with struct-serialized timestamps.
pub fn now_bson() -> Bson {
    bson::to_bson(&Utc::now()).expect("datetime serializes to BSON")
}

/// Represents a marketplace account. Stored in the `users` collection.
///
/// Field names are camelCase on the wire and in MongoDB. The `password`
/// field holds a bcrypt hash and must never be returned to clients; the
/// profile handlers build sanitized responses instead of serializing this
/// struct directly.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_pic: Option<String>,
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The public projection of a user, used wherever a handler populates a
/// user reference (project creators, bid freelancers, chat participants).
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub profile_pic: Option<String>,
}

/// Project category, matching the store's declared enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Web,
    Mobile,
    Design,
    Writing,
    Data,
    Other,
}

/// Project lifecycle status. `InProgress` serializes as "in progress"
/// (with the space) to stay compatible with the stored documents.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "closed")]
    Closed,
}

/// A posted project. Stored in the `projects` collection.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub skills: Vec<String>,
    pub budget_min: f64,
    pub budget_max: f64,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub status: ProjectStatus,
    pub created_by: String,
    #[serde(default)]
    pub assigned_freelancer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A freelancer's priced, timed proposal against a project. One bid per
/// (projectId, freelancerId) pair; at most one accepted bid per project,
/// enforced by the accept workflow rather than an index.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub bid_id: String,
    pub project_id: String,
    pub freelancer_id: String,
    pub amount: f64,
    pub proposal: String,
    /// Delivery estimate in days.
    pub delivery_time: i32,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

/// An out-of-band solicitation for a specific email to bid on a project.
/// The token is never redeemed anywhere; no endpoint consumes it.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub invite_id: String,
    pub project_id: String,
    pub email: String,
    pub invited_by: String,
    #[serde(default)]
    pub description: Option<String>,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A two-party message thread, keyed by its participant pair. The pair is
/// stored sorted; lookups stay order-independent via `$all`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub chat_id: String,
    pub participants: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_status_wire_values() {
        assert_eq!(
            serde_json::to_string(&ProjectStatus::InProgress).unwrap(),
            "\"in progress\""
        );
        assert_eq!(serde_json::to_string(&ProjectStatus::Open).unwrap(), "\"open\"");
        let parsed: ProjectStatus = serde_json::from_str("\"in progress\"").unwrap();
        assert_eq!(parsed, ProjectStatus::InProgress);
    }

    #[test]
    fn bid_status_wire_values() {
        assert_eq!(serde_json::to_string(&BidStatus::Pending).unwrap(), "\"pending\"");
        assert_eq!(serde_json::to_string(&BidStatus::Accepted).unwrap(), "\"accepted\"");
        assert_eq!(serde_json::to_string(&BidStatus::Rejected).unwrap(), "\"rejected\"");
    }

    #[test]
    fn project_type_parses_lowercase() {
        let t: ProjectType = serde_json::from_str("\"design\"").unwrap();
        assert_eq!(t, ProjectType::Design);
        assert!(serde_json::from_str::<ProjectType>("\"Design\"").is_err());
    }

    #[test]
    fn bid_fields_are_camel_case_on_the_wire() {
        let bid = Bid {
            bid_id: "b1".into(),
            project_id: "p1".into(),
            freelancer_id: "u1".into(),
            amount: 250.0,
            proposal: "I can do this".into(),
            delivery_time: 7,
            status: BidStatus::Pending,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&bid).unwrap();
        assert!(value.get("projectId").is_some());
        assert!(value.get("freelancerId").is_some());
        assert!(value.get("deliveryTime").is_some());
        assert!(value.get("project_id").is_none());
    }
}
