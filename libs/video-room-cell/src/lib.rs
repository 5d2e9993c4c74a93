pub mod models;
pub mod services;

pub use models::{MeetingRoom, VideoRoomError};
pub use services::rooms::{HttpRoomProvider, RoomProvider};
