//! # Dashboard
//!
//! Totals answer "how much do I manage" and always cover the caller's whole scope.
//! The today/yesterday delta answers "how is this one location doing" and follows the filter when given.
use chrono::NaiveDate;
use records::Database;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::InsightError,
    scope::{Caller, Scope},
    trends::{ChartPoint, DayComparison, Window, aggregate, compare_days},
    utils::parse_timestamps,
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_restaurants: u64,
    pub total_surveys: u64,
    pub total_responses: u64,
    /// Administrator only.
    pub total_owners: Option<u64>,
    pub today_data: DayComparison,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GrowthStats {
    pub today_count: u64,
    pub yesterday_count: u64,
    pub daily_growth_pct: f64,
    pub month_count: u64,
    pub last_month_count: u64,
    pub monthly_growth_pct: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DashboardTrends {
    pub stats: GrowthStats,
    pub chart_data: Vec<ChartPoint>,
}

async fn filtered_survey_ids(
    db: &Database,
    caller: &Caller,
    filter: Uuid,
) -> Result<Vec<Uuid>, InsightError> {
    if !caller.can_see(filter) {
        return Err(InsightError::OutOfScope);
    }

    Ok(db.survey_ids_for(&[filter]).await?)
}

pub async fn assemble(
    db: &Database,
    merchant_id: Uuid,
    filter: Option<Uuid>,
    today: NaiveDate,
) -> Result<DashboardStats, InsightError> {
    let caller = Caller::resolve(db, merchant_id).await?;

    let (total_restaurants, total_owners) = match &caller.scope {
        Scope::Admin => (db.count_merchants().await?, Some(db.count_owners().await?)),
        Scope::Owner { subs } => (subs.len() as u64, None),
        Scope::Manager => (1, None),
    };

    let account_survey_ids = caller.survey_ids(db).await?;
    let total_responses = db.count_responses(&account_survey_ids).await?;

    let delta_survey_ids = match filter {
        Some(filter) => filtered_survey_ids(db, &caller, filter).await?,
        None => account_survey_ids.clone(),
    };

    let timestamps = db.response_timestamps(&delta_survey_ids).await?;
    debug!(
        "dashboard for {merchant_id}: {} surveys, {} timestamps in delta scope",
        account_survey_ids.len(),
        timestamps.len()
    );

    Ok(DashboardStats {
        total_restaurants,
        total_surveys: account_survey_ids.len() as u64,
        total_responses,
        total_owners,
        today_data: compare_days(parse_timestamps(&timestamps), today),
    })
}

/// Administrators and owners may narrow to one merchant; a manager's filter is ignored.
pub async fn trends(
    db: &Database,
    merchant_id: Uuid,
    filter: Option<Uuid>,
    window: &Window,
    today: NaiveDate,
) -> Result<DashboardTrends, InsightError> {
    let caller = Caller::resolve(db, merchant_id).await?;

    let survey_ids = match (filter, &caller.scope) {
        (Some(filter), Scope::Admin | Scope::Owner { .. }) => {
            filtered_survey_ids(db, &caller, filter).await?
        }
        _ => caller.survey_ids(db).await?,
    };

    let timestamps = parse_timestamps(&db.response_timestamps(&survey_ids).await?);
    let days = compare_days(timestamps.iter().copied(), today);
    let report = aggregate(timestamps, window);

    Ok(DashboardTrends {
        stats: GrowthStats {
            today_count: days.today_count,
            yesterday_count: days.yesterday_count,
            daily_growth_pct: days.growth_pct,
            month_count: report.current_period_count,
            last_month_count: report.previous_period_count,
            monthly_growth_pct: report.growth_pct,
        },
        chart_data: report.buckets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::fixtures::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_manager_totals() {
        let w = world().await;
        let solo = survey(&w.db, &w.manager).await;
        let other = survey(&w.db, &w.owner).await;

        respond(&w.db, &solo, "2025-03-10T09:00:00").await;
        respond(&w.db, &solo, "2025-03-10T19:00:00").await;
        respond(&w.db, &solo, "2025-03-09T12:00:00").await;
        respond(&w.db, &other, "2025-03-10T12:00:00").await;

        let stats = assemble(&w.db, w.manager.id, None, day(2025, 3, 10))
            .await
            .unwrap();

        assert_eq!(stats.total_restaurants, 1);
        assert_eq!(stats.total_surveys, 1);
        assert_eq!(stats.total_responses, 3);
        assert_eq!(stats.total_owners, None);

        let today = stats.today_data;
        assert_eq!(today.today_count, 2);
        assert_eq!(today.yesterday_count, 1);
        assert_eq!(today.diff, 1);
        assert_eq!(today.growth_pct, 100.0);
    }

    #[tokio::test]
    async fn test_day_comparison_present_without_responses() {
        let w = world().await;

        let stats = assemble(&w.db, w.manager.id, None, day(2025, 3, 10))
            .await
            .unwrap();

        assert_eq!(stats.total_responses, 0);
        assert_eq!(
            stats.today_data,
            DayComparison {
                today_count: 0,
                yesterday_count: 0,
                diff: 0,
                growth_pct: 0.0,
            }
        );
    }

    #[tokio::test]
    async fn test_owner_filter_narrows_only_the_delta() {
        let w = world().await;
        let own = survey(&w.db, &w.owner).await;
        let branch = survey(&w.db, &w.sub).await;

        respond(&w.db, &own, "2025-03-10T09:00:00").await;
        respond(&w.db, &own, "2025-03-10T10:00:00").await;
        respond(&w.db, &branch, "2025-03-10T11:00:00").await;

        let stats = assemble(&w.db, w.owner.id, Some(w.sub.id), day(2025, 3, 10))
            .await
            .unwrap();

        assert_eq!(stats.total_restaurants, 1);
        assert_eq!(stats.total_surveys, 2);
        assert_eq!(stats.total_responses, 3);
        assert_eq!(stats.today_data.today_count, 1);

        let unfiltered = assemble(&w.db, w.owner.id, None, day(2025, 3, 10))
            .await
            .unwrap();
        assert_eq!(unfiltered.today_data.today_count, 3);
    }

    #[tokio::test]
    async fn test_filter_outside_scope_is_rejected() {
        let w = world().await;

        let result = assemble(&w.db, w.owner.id, Some(w.manager.id), day(2025, 3, 10)).await;
        assert!(matches!(result, Err(InsightError::OutOfScope)));

        let result = assemble(&w.db, w.manager.id, Some(w.sub.id), day(2025, 3, 10)).await;
        assert!(matches!(result, Err(InsightError::OutOfScope)));
    }

    #[tokio::test]
    async fn test_admin_sees_everything() {
        let w = world().await;
        for merchant in [&w.owner, &w.sub, &w.manager] {
            let survey = survey(&w.db, merchant).await;
            respond(&w.db, &survey, "2025-03-10T09:00:00").await;
        }

        let stats = assemble(&w.db, w.admin.id, None, day(2025, 3, 10))
            .await
            .unwrap();

        assert_eq!(stats.total_restaurants, 4);
        assert_eq!(stats.total_surveys, 3);
        assert_eq!(stats.total_responses, 3);
        assert_eq!(stats.total_owners, Some(1));
        assert_eq!(stats.today_data.growth_pct, 300.0);
    }

    #[tokio::test]
    async fn test_trends_month_view() {
        let w = world().await;
        let solo = survey(&w.db, &w.manager).await;

        respond(&w.db, &solo, "2025-03-01T09:00:00").await;
        respond(&w.db, &solo, "2025-03-10T09:00:00").await;
        respond(&w.db, &solo, "2025-02-14T09:00:00").await;
        respond(&w.db, &solo, "garbage").await;

        let window = Window::month(2025, 3).unwrap();
        let trends = trends(&w.db, w.manager.id, None, &window, day(2025, 3, 10))
            .await
            .unwrap();

        assert_eq!(trends.stats.month_count, 2);
        assert_eq!(trends.stats.last_month_count, 1);
        assert_eq!(trends.stats.monthly_growth_pct, 100.0);
        assert_eq!(trends.stats.today_count, 1);
        assert_eq!(trends.stats.daily_growth_pct, 100.0);
        assert_eq!(trends.chart_data.len(), 31);
        assert_eq!(trends.chart_data[9].value, 1);
    }

    #[tokio::test]
    async fn test_trends_filter_rules() {
        let w = world().await;
        let own = survey(&w.db, &w.owner).await;
        let branch = survey(&w.db, &w.sub).await;
        let solo = survey(&w.db, &w.manager).await;

        respond(&w.db, &own, "2025-03-02T09:00:00").await;
        respond(&w.db, &branch, "2025-03-03T09:00:00").await;
        respond(&w.db, &solo, "2025-03-04T09:00:00").await;

        let window = Window::month(2025, 3).unwrap();
        let today = day(2025, 3, 20);

        let owner_all = trends(&w.db, w.owner.id, None, &window, today).await.unwrap();
        assert_eq!(owner_all.stats.month_count, 2);

        let owner_branch = trends(&w.db, w.owner.id, Some(w.sub.id), &window, today)
            .await
            .unwrap();
        assert_eq!(owner_branch.stats.month_count, 1);

        let admin_solo = trends(&w.db, w.admin.id, Some(w.manager.id), &window, today)
            .await
            .unwrap();
        assert_eq!(admin_solo.stats.month_count, 1);

        // manager filters are ignored
        let manager = trends(&w.db, w.manager.id, Some(w.owner.id), &window, today)
            .await
            .unwrap();
        assert_eq!(manager.stats.month_count, 1);
    }
}
