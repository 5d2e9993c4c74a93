// libs/video-room-cell/src/models.rs
use serde::{Deserialize, Serialize};

/// A provisioned meeting room as handed back to the booking core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeetingRoom {
    pub id: String,
    pub name: String,
    pub url: String,
}

// ==============================================================================
// WIRE MODELS (room provider REST API)
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub privacy: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomResponse {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingTokenRequest {
    pub properties: MeetingTokenProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingTokenProperties {
    pub room_name: String,
    pub user_id: String,
    pub user_name: String,
    pub is_owner: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingTokenResponse {
    pub token: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum VideoRoomError {
    #[error("Video room provider not configured")]
    NotConfigured,

    #[error("Room provider API error: {message}")]
    ApiError { message: String },

    #[error("Room provider request failed: {0}")]
    Http(#[from] reqwest::Error),
}
