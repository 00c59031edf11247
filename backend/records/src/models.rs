//! # Rows
//!
//! Typed projections of the four hosted tables. Every row is keyed by a UUID v4
//! and serialized as JSON, the same shape the store returns.
//!
//! ## Tables
//! - merchants: tenant accounts, optionally pointing at an owning merchant
//! - lotteries: named prize lists, percentage-scale weights
//! - surveys: ordered questions, optional lottery reference
//! - responses: immutable answer sets keyed by question id
//!
//! ## Notes
//! - Timestamps stay as the strings the store wrote. Parsing is left to the
//!   aggregation code so one malformed row never fails a whole listing.
//! - Question ids must survive survey edits, otherwise old answers lose their question.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Login name that grants the administrator view.
pub const ADMIN_USERNAME: &str = "admin";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    #[default]
    Manager,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Merchant {
    pub id: Uuid,
    pub restaurant_name: String,
    pub username: String,
    /// Stored and compared in plaintext.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
}

impl Merchant {
    pub fn new(
        restaurant_name: String,
        username: String,
        password: String,
        role: Role,
        owner_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            restaurant_name,
            username,
            password: Some(password),
            role,
            owner_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.username == ADMIN_USERNAME
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MerchantPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl MerchantPatch {
    pub fn is_empty(&self) -> bool {
        self.restaurant_name.is_none() && self.username.is_none() && self.password.is_none()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Prize {
    pub id: Uuid,
    pub name: String,
    /// Percentage scale, 0-100.
    pub probability: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Lottery {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub prizes: Vec<Prize>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    #[default]
    Choice,
    Multi,
    Text,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub allow_other: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Survey {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub lottery_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Response {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub customer_id: Uuid,
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
    pub submitted_at: String,
}
