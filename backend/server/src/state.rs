use std::sync::Arc;

use insight::{
    gemini::GeminiClient,
    summary::{ModelPreference, TextGenerator},
};
use records::{Database, connect_remote};
use regex::Regex;
use tracing::warn;

use super::config::Config;

pub struct State {
    pub config: Config,
    pub db: Database,
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub models: ModelPreference,
    pub allowed_origins: Regex,
}

impl State {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let db = connect_remote(
            &config.store_url,
            &config.store_key,
            config.retry.clone(),
            config.paging.clone(),
        )
        .expect("Store client misconfigured!");

        let generator = match config.gemini_key.as_deref() {
            Some(key) => Some(Arc::new(
                GeminiClient::new(key).expect("Gemini client misconfigured!"),
            ) as Arc<dyn TextGenerator>),
            None => {
                warn!("GEMINI_API_KEY missing, analysis requests will fail");
                None
            }
        };

        Self::with_parts(config, db, generator)
    }

    pub fn with_parts(
        config: Config,
        db: Database,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Arc<Self> {
        let allowed_origins = Regex::new(&config.cors_pattern).expect("CORS pattern misconfigured!");

        Arc::new(Self {
            config,
            db,
            generator,
            models: ModelPreference::default(),
            allowed_origins,
        })
    }
}
