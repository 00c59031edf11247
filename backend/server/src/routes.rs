use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use insight::{
    dashboard, draw::draw, scope::Caller, summary::summarize, trends::Window,
    utils::{now_formatted, today},
};
use records::models::{Lottery, Merchant, MerchantPatch, Prize, Response, Survey};
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    payloads::{
        AnalyzeQuery, DashboardQuery, LoginRequest, LotteryRequest, LotteryResult,
        MerchantQuery, OwnerQuery, RegisterRequest, ResponseRequest, SurveyQuery, SurveyRequest,
        TrendsQuery,
    },
    state::State as AppState,
    utils::{lottery_from, optional_id, redacted, survey_from},
};

type Shared = State<Arc<AppState>>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(body)| body).map_err(|e| {
        warn!("Rejected payload: {e}");
        AppError::MalformedPayload
    })
}

fn deleted(what: &str) -> Json<Value> {
    Json(json!({ "message": format!("{what} deleted successfully") }))
}

pub async fn root_handler() -> impl IntoResponse {
    Json(json!({ "message": "Survey backend is running" }))
}

// auth

pub async fn register_handler(
    State(state): Shared,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<Merchant>, AppError> {
    let request = body(payload)?;

    let merchant = Merchant::new(
        request.restaurant_name,
        request.username,
        request.password,
        request.role,
        request.owner_id,
    );
    let merchant = state.db.register_merchant(&merchant).await?;

    info!("Registered merchant {} ({:?})", merchant.username, merchant.role);
    Ok(Json(redacted(merchant)))
}

pub async fn login_handler(
    State(state): Shared,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Merchant>, AppError> {
    let request = body(payload)?;

    let merchant = state
        .db
        .find_merchant_by_username(&request.username)
        .await?
        .filter(|merchant| merchant.password.as_deref() == Some(request.password.as_str()))
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(redacted(merchant)))
}

// merchants

pub async fn list_merchants_handler(
    State(state): Shared,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<Merchant>>, AppError> {
    let merchants = match optional_id(query.owner_id.as_deref())? {
        Some(owner_id) => state.db.list_sub_merchants(owner_id).await?,
        None => state.db.list_merchants().await?,
    };

    Ok(Json(merchants.into_iter().map(redacted).collect()))
}

pub async fn update_merchant_handler(
    State(state): Shared,
    Path(id): Path<Uuid>,
    payload: Result<Json<MerchantPatch>, JsonRejection>,
) -> Result<Json<Merchant>, AppError> {
    let patch = body(payload)?;
    if patch.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let merchant = state
        .db
        .update_merchant(id, &patch)
        .await?
        .ok_or(AppError::NotFound("Merchant"))?;

    Ok(Json(redacted(merchant)))
}

pub async fn delete_merchant_handler(
    State(state): Shared,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.db.delete_merchant(id).await?;
    Ok(deleted("Merchant"))
}

// lotteries

pub async fn list_lotteries_handler(
    State(state): Shared,
    Query(query): Query<MerchantQuery>,
) -> Result<Json<Vec<Lottery>>, AppError> {
    let caller = Caller::resolve(&state.db, query.merchant_id).await?;
    Ok(Json(caller.lotteries(&state.db).await?))
}

pub async fn create_lottery_handler(
    State(state): Shared,
    payload: Result<Json<LotteryRequest>, JsonRejection>,
) -> Result<Json<Lottery>, AppError> {
    let lottery = lottery_from(Uuid::new_v4(), body(payload)?)?;
    Ok(Json(state.db.insert_lottery(&lottery).await?))
}

pub async fn update_lottery_handler(
    State(state): Shared,
    Path(id): Path<Uuid>,
    payload: Result<Json<LotteryRequest>, JsonRejection>,
) -> Result<Json<Lottery>, AppError> {
    let lottery = lottery_from(id, body(payload)?)?;

    let lottery = state
        .db
        .update_lottery(&lottery)
        .await?
        .ok_or(AppError::NotFound("Lottery"))?;

    Ok(Json(lottery))
}

pub async fn delete_lottery_handler(
    State(state): Shared,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.db.delete_lottery(id).await?;
    Ok(deleted("Lottery"))
}

// surveys

pub async fn list_surveys_handler(
    State(state): Shared,
    Query(query): Query<MerchantQuery>,
) -> Result<Json<Vec<Survey>>, AppError> {
    let caller = Caller::resolve(&state.db, query.merchant_id).await?;
    Ok(Json(caller.surveys(&state.db).await?))
}

pub async fn get_survey_handler(
    State(state): Shared,
    Path(id): Path<Uuid>,
) -> Result<Json<Survey>, AppError> {
    let survey = state
        .db
        .get_survey(id)
        .await?
        .ok_or(AppError::NotFound("Survey"))?;

    Ok(Json(survey))
}

pub async fn create_survey_handler(
    State(state): Shared,
    payload: Result<Json<SurveyRequest>, JsonRejection>,
) -> Result<Json<Survey>, AppError> {
    let survey = survey_from(Uuid::new_v4(), body(payload)?);
    Ok(Json(state.db.insert_survey(&survey).await?))
}

pub async fn update_survey_handler(
    State(state): Shared,
    Path(id): Path<Uuid>,
    payload: Result<Json<SurveyRequest>, JsonRejection>,
) -> Result<Json<Survey>, AppError> {
    let survey = survey_from(id, body(payload)?);

    let survey = state
        .db
        .update_survey(&survey)
        .await?
        .ok_or(AppError::NotFound("Survey"))?;

    Ok(Json(survey))
}

pub async fn delete_survey_handler(
    State(state): Shared,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.db.delete_survey(id).await?;
    Ok(deleted("Survey"))
}

// responses

enum DrawOutcome {
    NoLottery,
    Won(Prize),
    Lost,
}

impl From<DrawOutcome> for LotteryResult {
    fn from(outcome: DrawOutcome) -> Self {
        match outcome {
            DrawOutcome::Won(prize) => LotteryResult {
                won: true,
                message: format!("Congratulations! You won {}", prize.name),
                prize: Some(prize),
            },
            DrawOutcome::Lost => LotteryResult {
                won: false,
                prize: None,
                message: "Sorry, no prize this time.".to_string(),
            },
            DrawOutcome::NoLottery => LotteryResult {
                won: false,
                prize: None,
                message: "Thank you for your feedback!".to_string(),
            },
        }
    }
}

async fn run_draw(state: &AppState, survey_id: Uuid) -> DrawOutcome {
    let lottery_id = match state.db.get_survey(survey_id).await {
        Ok(Some(Survey {
            lottery_id: Some(lottery_id),
            ..
        })) => lottery_id,
        Ok(_) => return DrawOutcome::NoLottery,
        Err(e) => {
            warn!("Survey lookup for draw failed: {e}");
            return DrawOutcome::Lost;
        }
    };

    let lottery = match state.db.get_lottery(lottery_id).await {
        Ok(Some(lottery)) => lottery,
        Ok(None) => {
            warn!("Survey {survey_id} points at missing lottery {lottery_id}");
            return DrawOutcome::Lost;
        }
        Err(e) => {
            warn!("Lottery lookup for draw failed: {e}");
            return DrawOutcome::Lost;
        }
    };

    match draw(&lottery.prizes, &mut rand::rng()) {
        Some(prize) => DrawOutcome::Won(prize.clone()),
        None => DrawOutcome::Lost,
    }
}

pub async fn submit_response_handler(
    State(state): Shared,
    payload: Result<Json<ResponseRequest>, JsonRejection>,
) -> Result<Json<LotteryResult>, AppError> {
    let request = body(payload)?;

    let response = Response {
        id: Uuid::new_v4(),
        survey_id: request.survey_id,
        customer_id: request.customer_id,
        answers: request.answers,
        submitted_at: now_formatted(),
    };
    state.db.insert_response(&response).await?;

    Ok(Json(run_draw(&state, response.survey_id).await.into()))
}

pub async fn list_responses_handler(
    State(state): Shared,
    Query(query): Query<SurveyQuery>,
) -> Result<Json<Vec<Response>>, AppError> {
    Ok(Json(state.db.list_responses(query.survey_id).await?))
}

// analytics

pub async fn dashboard_stats_handler(
    State(state): Shared,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<dashboard::DashboardStats>, AppError> {
    let filter = optional_id(query.filter_merchant_id.as_deref())?;
    let stats = dashboard::assemble(&state.db, query.merchant_id, filter, today()).await?;

    Ok(Json(stats))
}

pub async fn trends_handler(
    State(state): Shared,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<dashboard::DashboardTrends>, AppError> {
    let filter = optional_id(query.filter_merchant_id.as_deref())?;
    let today = today();
    let window = Window::parse(&query.view_mode, query.target_date.as_deref(), today)?;

    let trends = dashboard::trends(&state.db, query.merchant_id, filter, &window, today).await?;
    Ok(Json(trends))
}

pub async fn analyze_handler(
    State(state): Shared,
    Query(query): Query<AnalyzeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let analysis = summarize(
        &state.db,
        state.generator.as_deref(),
        &state.models,
        query.survey_id,
        &query.language,
    )
    .await?;

    Ok((StatusCode::OK, Json(json!({ "analysis": analysis }))))
}
