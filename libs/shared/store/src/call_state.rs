// libs/shared/store/src/call_state.rs
//
// Live video-call state keyed by appointment. Kept behind a key-value
// interface so a multi-instance deployment can point it at Redis while a
// single process (and the test suite) uses the in-memory backing.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

const CALL_STATE_TTL_SECONDS: i64 = 6 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallState {
    pub appointment_id: Uuid,
    pub room_name: String,
    pub doctor_joined_at: Option<DateTime<Utc>>,
    pub patient_joined_at: Option<DateTime<Utc>>,
}

impl CallState {
    pub fn new(appointment_id: Uuid, room_name: impl Into<String>) -> Self {
        Self {
            appointment_id,
            room_name: room_name.into(),
            doctor_joined_at: None,
            patient_joined_at: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum CallStateError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait CallStateStore: Send + Sync {
    async fn get(&self, appointment_id: Uuid) -> Result<Option<CallState>, CallStateError>;
    async fn put(&self, state: CallState) -> Result<(), CallStateError>;
    async fn clear(&self, appointment_id: Uuid) -> Result<(), CallStateError>;
}

// ==============================================================================
// IN-MEMORY BACKING
// ==============================================================================

#[derive(Default)]
pub struct InMemoryCallStateStore {
    entries: DashMap<Uuid, CallState>,
}

impl InMemoryCallStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallStateStore for InMemoryCallStateStore {
    async fn get(&self, appointment_id: Uuid) -> Result<Option<CallState>, CallStateError> {
        Ok(self.entries.get(&appointment_id).map(|e| e.clone()))
    }

    async fn put(&self, state: CallState) -> Result<(), CallStateError> {
        self.entries.insert(state.appointment_id, state);
        Ok(())
    }

    async fn clear(&self, appointment_id: Uuid) -> Result<(), CallStateError> {
        self.entries.remove(&appointment_id);
        Ok(())
    }
}

// ==============================================================================
// REDIS BACKING
// ==============================================================================

pub struct RedisCallStateStore {
    pool: Pool,
}

impl RedisCallStateStore {
    pub async fn new(redis_url: &str) -> Result<Self, CallStateError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CallStateError::Pool(format!("Failed to create Redis pool: {}", e)))?;

        // Test connection up front so misconfiguration fails at startup.
        let mut conn = pool
            .get()
            .await
            .map_err(|e| CallStateError::Pool(format!("Failed to connect to Redis: {}", e)))?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis call-state store initialized");

        Ok(Self { pool })
    }

    fn key(appointment_id: Uuid) -> String {
        format!("call_state:{}", appointment_id)
    }
}

#[async_trait]
impl CallStateStore for RedisCallStateStore {
    async fn get(&self, appointment_id: Uuid) -> Result<Option<CallState>, CallStateError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CallStateError::Pool(e.to_string()))?;
        let raw: Option<String> = conn.get(Self::key(appointment_id)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, state: CallState) -> Result<(), CallStateError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CallStateError::Pool(e.to_string()))?;
        let key = Self::key(state.appointment_id);
        let raw = serde_json::to_string(&state)?;
        let _: () = redis::cmd("SET")
            .arg(&key)
            .arg(raw)
            .arg("EX")
            .arg(CALL_STATE_TTL_SECONDS)
            .query_async(&mut conn)
            .await?;
        debug!("call state stored for appointment {}", state.appointment_id);
        Ok(())
    }

    async fn clear(&self, appointment_id: Uuid) -> Result<(), CallStateError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CallStateError::Pool(e.to_string()))?;
        let _: () = conn.del(Self::key(appointment_id)).await?;
        Ok(())
    }
}
