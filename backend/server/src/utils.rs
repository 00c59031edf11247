use axum::http::HeaderValue;
use insight::utils::now_formatted;
use records::models::{Lottery, Merchant, Prize, Question, Survey};
use regex::Regex;
use uuid::Uuid;

use crate::{
    error::AppError,
    payloads::{LotteryRequest, PrizeRequest, QuestionRequest, SurveyRequest},
};

pub fn origin_allowed(pattern: &Regex, origin: &HeaderValue) -> bool {
    origin
        .to_str()
        .map(|origin| pattern.is_match(origin))
        .unwrap_or(false)
}

/// Blank query values count as absent.
pub fn optional_id(raw: Option<&str>) -> Result<Option<Uuid>, AppError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Invalid id {raw:?}"))),
    }
}

/// Passwords never leave the server.
pub fn redacted(mut merchant: Merchant) -> Merchant {
    merchant.password = None;
    merchant
}

/// Every save issues fresh prize ids.
pub fn prizes_from(prizes: Vec<PrizeRequest>) -> Result<Vec<Prize>, AppError> {
    prizes
        .into_iter()
        .map(|prize| {
            if !prize.probability.is_finite() || prize.probability < 0.0 {
                return Err(AppError::BadRequest(format!(
                    "Invalid probability for {}",
                    prize.name
                )));
            }

            Ok(Prize {
                id: Uuid::new_v4(),
                name: prize.name,
                probability: prize.probability,
            })
        })
        .collect()
}

pub fn lottery_from(id: Uuid, request: LotteryRequest) -> Result<Lottery, AppError> {
    Ok(Lottery {
        id,
        merchant_id: request.merchant_id,
        name: request.name,
        prizes: prizes_from(request.prizes)?,
    })
}

fn question_from(request: QuestionRequest) -> Question {
    Question {
        id: request.id.unwrap_or_else(Uuid::new_v4),
        text: request.text,
        kind: request.kind,
        allow_other: request.allow_other,
        options: request.options,
    }
}

/// `created_at` is stamped now; updates drop it before writing.
pub fn survey_from(id: Uuid, request: SurveyRequest) -> Survey {
    Survey {
        id,
        merchant_id: request.merchant_id,
        name: request.name,
        lottery_id: request.lottery_id,
        created_at: now_formatted(),
        questions: request.questions.into_iter().map(question_from).collect(),
    }
}
