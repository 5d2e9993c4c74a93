// libs/video-room-cell/src/services/rooms.rs
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    CreateRoomRequest, MeetingRoom, MeetingTokenProperties, MeetingTokenRequest,
    MeetingTokenResponse, RoomResponse, VideoRoomError,
};

/// The contract the booking core consumes. Provisioning failure on a
/// paid/confirmed transition is fatal to that transition; teardown failure is
/// logged only. That policy lives with the callers, not here.
#[async_trait]
pub trait RoomProvider: Send + Sync {
    async fn get_or_create_room(&self, appointment_id: Uuid) -> Result<MeetingRoom, VideoRoomError>;
    async fn delete_room(&self, room_name: &str) -> Result<(), VideoRoomError>;
    async fn create_meeting_token(
        &self,
        room_name: &str,
        user_id: Uuid,
        user_name: &str,
        is_owner: bool,
    ) -> Result<String, VideoRoomError>;
}

/// REST client for the managed rooms API.
#[derive(Debug)]
pub struct HttpRoomProvider {
    client: Client,
    base_url: String,
    api_token: String,
}

impl HttpRoomProvider {
    pub fn new(config: &AppConfig) -> Result<Self, VideoRoomError> {
        if !config.is_video_configured() {
            return Err(VideoRoomError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            base_url: config.rooms_base_url.trim_end_matches('/').to_string(),
            api_token: config.rooms_api_token.clone(),
        })
    }

    fn room_name(appointment_id: Uuid) -> String {
        format!("appt-{}", appointment_id.simple())
    }

    async fn fetch_room(&self, name: &str) -> Result<Option<MeetingRoom>, VideoRoomError> {
        let url = format!("{}/rooms/{}", self.base_url, name);
        debug!("fetching room {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response.text().await?;
        if !status.is_success() {
            error!("room lookup failed: {} - {}", status, body);
            return Err(VideoRoomError::ApiError {
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let room: RoomResponse =
            serde_json::from_str(&body).map_err(|e| VideoRoomError::ApiError {
                message: format!("Failed to parse room response: {}", e),
            })?;
        Ok(Some(MeetingRoom {
            id: room.id,
            name: room.name,
            url: room.url,
        }))
    }

    async fn create_room(&self, name: &str) -> Result<MeetingRoom, VideoRoomError> {
        let url = format!("{}/rooms", self.base_url);
        let request_body = CreateRoomRequest {
            name: name.to_string(),
            privacy: "private".to_string(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("room creation failed: {} - {}", status, body);
            return Err(VideoRoomError::ApiError {
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let room: RoomResponse =
            serde_json::from_str(&body).map_err(|e| VideoRoomError::ApiError {
                message: format!("Failed to parse room response: {}", e),
            })?;

        info!("created meeting room {}", room.name);
        Ok(MeetingRoom {
            id: room.id,
            name: room.name,
            url: room.url,
        })
    }
}

#[async_trait]
impl RoomProvider for HttpRoomProvider {
    async fn get_or_create_room(&self, appointment_id: Uuid) -> Result<MeetingRoom, VideoRoomError> {
        let name = Self::room_name(appointment_id);
        if let Some(room) = self.fetch_room(&name).await? {
            debug!("room {} already provisioned", name);
            return Ok(room);
        }
        self.create_room(&name).await
    }

    async fn delete_room(&self, room_name: &str) -> Result<(), VideoRoomError> {
        let url = format!("{}/rooms/{}", self.base_url, room_name);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let status = response.status();
        // A room that is already gone counts as torn down.
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !status.is_success() {
            let body = response.text().await?;
            error!("room deletion failed: {} - {}", status, body);
            return Err(VideoRoomError::ApiError {
                message: format!("HTTP {}: {}", status, body),
            });
        }

        info!("deleted meeting room {}", room_name);
        Ok(())
    }

    async fn create_meeting_token(
        &self,
        room_name: &str,
        user_id: Uuid,
        user_name: &str,
        is_owner: bool,
    ) -> Result<String, VideoRoomError> {
        let url = format!("{}/meeting-tokens", self.base_url);
        let request_body = MeetingTokenRequest {
            properties: MeetingTokenProperties {
                room_name: room_name.to_string(),
                user_id: user_id.to_string(),
                user_name: user_name.to_string(),
                is_owner,
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("meeting token request failed: {} - {}", status, body);
            return Err(VideoRoomError::ApiError {
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let token: MeetingTokenResponse =
            serde_json::from_str(&body).map_err(|e| VideoRoomError::ApiError {
                message: format!("Failed to parse token response: {}", e),
            })?;
        Ok(token.token)
    }
}
