use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rooms_base_url: String,
    pub rooms_api_token: String,
    pub redis_url: Option<String>,
    pub slot_horizon_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            rooms_base_url: env::var("ROOMS_API_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("ROOMS_API_BASE_URL not set, using default");
                    "https://api.rooms.example.com/v1".to_string()
                }),
            rooms_api_token: env::var("ROOMS_API_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("ROOMS_API_TOKEN not set, using empty value");
                    String::new()
                }),
            redis_url: env::var("REDIS_URL").ok(),
            slot_horizon_days: env::var("SLOT_HORIZON_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(90),
        };

        if !config.is_video_configured() {
            warn!("Video rooms not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_video_configured(&self) -> bool {
        !self.rooms_base_url.is_empty() && !self.rooms_api_token.is_empty()
    }
}
