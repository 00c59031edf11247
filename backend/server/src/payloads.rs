//! Request and response bodies that exist only at the HTTP edge.
//! Everything else is serialized straight from [`records::models`] and [`insight`].
use std::collections::BTreeMap;

use records::models::{Prize, QuestionKind, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub restaurant_name: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct PrizeRequest {
    pub name: String,
    pub probability: f64,
}

#[derive(Deserialize)]
pub struct LotteryRequest {
    pub name: String,
    pub merchant_id: Uuid,
    #[serde(default)]
    pub prizes: Vec<PrizeRequest>,
}

#[derive(Deserialize)]
pub struct QuestionRequest {
    /// Present when editing, so answers stay attached to the question.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub allow_other: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Deserialize)]
pub struct SurveyRequest {
    pub name: String,
    pub merchant_id: Uuid,
    #[serde(default)]
    pub lottery_id: Option<Uuid>,
    #[serde(default)]
    pub questions: Vec<QuestionRequest>,
}

#[derive(Deserialize)]
pub struct ResponseRequest {
    pub survey_id: Uuid,
    pub customer_id: Uuid,
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct LotteryResult {
    pub won: bool,
    pub prize: Option<Prize>,
    pub message: String,
}

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub owner_id: Option<String>,
}

#[derive(Deserialize)]
pub struct MerchantQuery {
    pub merchant_id: Uuid,
}

#[derive(Deserialize)]
pub struct SurveyQuery {
    pub survey_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub merchant_id: Uuid,
    pub filter_merchant_id: Option<String>,
}

#[derive(Deserialize)]
pub struct TrendsQuery {
    pub merchant_id: Uuid,
    pub filter_merchant_id: Option<String>,
    #[serde(default = "default_view_mode")]
    pub view_mode: String,
    pub target_date: Option<String>,
}

#[derive(Deserialize)]
pub struct AnalyzeQuery {
    pub survey_id: Uuid,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_view_mode() -> String {
    "month".to_string()
}

fn default_language() -> String {
    "en".to_string()
}
