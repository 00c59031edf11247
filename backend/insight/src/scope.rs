//! # Scope
//!
//! Which merchants a caller can see.
//!
//! - Administrator: the reserved login name, sees everything.
//! - Owner: itself plus every merchant whose `owner_id` points at it (one level).
//! - Manager: only itself.
use records::{
    Database,
    models::{Lottery, Merchant, Role, Survey},
};
use uuid::Uuid;

use crate::error::InsightError;

#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    Admin,
    Owner { subs: Vec<Merchant> },
    Manager,
}

#[derive(Debug, Clone)]
pub struct Caller {
    pub merchant: Merchant,
    pub scope: Scope,
}

impl Caller {
    pub async fn resolve(db: &Database, merchant_id: Uuid) -> Result<Self, InsightError> {
        let merchant = db
            .get_merchant(merchant_id)
            .await?
            .ok_or(InsightError::NotFound("Merchant"))?;

        let scope = if merchant.is_admin() {
            Scope::Admin
        } else if merchant.role == Role::Owner {
            Scope::Owner {
                subs: db.list_sub_merchants(merchant.id).await?,
            }
        } else {
            Scope::Manager
        };

        Ok(Self { merchant, scope })
    }

    /// `None` means every merchant.
    pub fn merchant_ids(&self) -> Option<Vec<Uuid>> {
        match &self.scope {
            Scope::Admin => None,
            Scope::Owner { subs } => Some(
                std::iter::once(self.merchant.id)
                    .chain(subs.iter().map(|sub| sub.id))
                    .collect(),
            ),
            Scope::Manager => Some(vec![self.merchant.id]),
        }
    }

    pub fn can_see(&self, merchant_id: Uuid) -> bool {
        self.merchant_ids()
            .is_none_or(|ids| ids.contains(&merchant_id))
    }

    pub async fn survey_ids(&self, db: &Database) -> Result<Vec<Uuid>, InsightError> {
        Ok(match self.merchant_ids() {
            None => db.all_survey_ids().await?,
            Some(ids) => db.survey_ids_for(&ids).await?,
        })
    }

    pub async fn surveys(&self, db: &Database) -> Result<Vec<Survey>, InsightError> {
        Ok(match self.merchant_ids() {
            None => db.list_all_surveys().await?,
            Some(ids) => db.list_surveys_for(&ids).await?,
        })
    }

    pub async fn lotteries(&self, db: &Database) -> Result<Vec<Lottery>, InsightError> {
        Ok(match self.merchant_ids() {
            None => db.list_all_lotteries().await?,
            Some(ids) => db.list_lotteries_for(&ids).await?,
        })
    }
}
