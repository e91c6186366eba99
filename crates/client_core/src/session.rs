use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::domain::{CompletionCode, DriverId, RideId, RiderId, Role};
use storage::Storage;
use tokio::sync::Mutex;
use tracing::warn;

pub const KEY_ACCESS_TOKEN: &str = "accessToken";
pub const KEY_USERNAME: &str = "username";
pub const KEY_ROLE: &str = "role";
pub const KEY_RIDE_CODE: &str = "ride_code";
pub const KEY_IN_PROGRESS: &str = "inProgress";
pub const KEY_RIDE_ID_VIEW: &str = "ride_id_view";
pub const KEY_RIDE_DRIVER_NAME: &str = "ride_driverName";

const POINTER_KEYS: [&str; 4] = [
    KEY_RIDE_CODE,
    KEY_IN_PROGRESS,
    KEY_RIDE_ID_VIEW,
    KEY_RIDE_DRIVER_NAME,
];

/// Who is signed in. Passed to the coordinator explicitly; the username is
/// also the rider id for queue polls and the driver id for ride lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub username: String,
    pub access_token: Option<String>,
    pub role: Role,
}

impl SessionContext {
    pub fn rider(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            access_token: None,
            role: Role::Rider,
        }
    }

    pub fn driver(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            access_token: None,
            role: Role::Driver,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn rider_id(&self) -> RiderId {
        RiderId(self.username.clone())
    }

    pub fn driver_id(&self) -> DriverId {
        DriverId(self.username.clone())
    }
}

/// What a rider needs to get back to an assigned ride after a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumePointers {
    pub ride_id: Option<RideId>,
    pub driver_name: Option<DriverId>,
    pub ride_code: Option<CompletionCode>,
    pub in_progress: bool,
}

impl ResumePointers {
    pub fn is_empty(&self) -> bool {
        self.ride_id.is_none()
    }
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn load_session(&self) -> Result<Option<SessionContext>>;
    async fn save_session(&self, session: &SessionContext) -> Result<()>;
    async fn clear_session(&self) -> Result<()>;
    async fn load_pointers(&self) -> Result<ResumePointers>;
    async fn save_pointers(&self, pointers: &ResumePointers) -> Result<()>;
    async fn clear_pointers(&self) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryResumeStore {
    session: Mutex<Option<SessionContext>>,
    pointers: Mutex<ResumePointers>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn load_session(&self) -> Result<Option<SessionContext>> {
        Ok(self.session.lock().await.clone())
    }

    async fn save_session(&self, session: &SessionContext) -> Result<()> {
        *self.session.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear_session(&self) -> Result<()> {
        self.session.lock().await.take();
        Ok(())
    }

    async fn load_pointers(&self) -> Result<ResumePointers> {
        Ok(self.pointers.lock().await.clone())
    }

    async fn save_pointers(&self, pointers: &ResumePointers) -> Result<()> {
        *self.pointers.lock().await = pointers.clone();
        Ok(())
    }

    async fn clear_pointers(&self) -> Result<()> {
        *self.pointers.lock().await = ResumePointers::default();
        Ok(())
    }
}

#[async_trait]
impl ResumeStore for Storage {
    async fn load_session(&self) -> Result<Option<SessionContext>> {
        let Some(username) = self.get(KEY_USERNAME).await? else {
            return Ok(None);
        };
        let role = match self.get(KEY_ROLE).await? {
            Some(raw) => Role::parse(&raw).unwrap_or_else(|| {
                warn!(role = raw.as_str(), "session: unknown stored role; assuming rider");
                Role::Rider
            }),
            None => Role::Rider,
        };
        Ok(Some(SessionContext {
            username,
            access_token: self.get(KEY_ACCESS_TOKEN).await?,
            role,
        }))
    }

    async fn save_session(&self, session: &SessionContext) -> Result<()> {
        self.put(KEY_USERNAME, &session.username).await?;
        self.put(KEY_ROLE, session.role.as_str()).await?;
        match &session.access_token {
            Some(token) => self.put(KEY_ACCESS_TOKEN, token).await?,
            None => {
                self.remove(KEY_ACCESS_TOKEN).await?;
            }
        }
        Ok(())
    }

    async fn clear_session(&self) -> Result<()> {
        self.remove_many(&[KEY_USERNAME, KEY_ROLE, KEY_ACCESS_TOKEN])
            .await
    }

    async fn load_pointers(&self) -> Result<ResumePointers> {
        let ride_id = match self.get(KEY_RIDE_ID_VIEW).await? {
            Some(raw) => Some(RideId(raw.trim().parse().with_context(|| {
                format!("stored {KEY_RIDE_ID_VIEW} is not a ride id: {raw:?}")
            })?)),
            None => None,
        };
        let ride_code = match self.get(KEY_RIDE_CODE).await? {
            Some(raw) => Some(
                serde_json::from_str::<CompletionCode>(&raw)
                    .with_context(|| format!("stored {KEY_RIDE_CODE} is not a completion code"))?,
            ),
            None => None,
        };
        let in_progress = match self.get(KEY_IN_PROGRESS).await? {
            Some(raw) => serde_json::from_str::<bool>(&raw).unwrap_or(false),
            None => false,
        };
        Ok(ResumePointers {
            ride_id,
            driver_name: self.get(KEY_RIDE_DRIVER_NAME).await?.map(DriverId),
            ride_code,
            in_progress,
        })
    }

    async fn save_pointers(&self, pointers: &ResumePointers) -> Result<()> {
        self.clear_pointers().await?;
        if let Some(ride_id) = pointers.ride_id {
            self.put(KEY_RIDE_ID_VIEW, &ride_id.to_string()).await?;
        }
        if let Some(driver) = &pointers.driver_name {
            self.put(KEY_RIDE_DRIVER_NAME, driver.as_str()).await?;
        }
        if let Some(code) = &pointers.ride_code {
            self.put(KEY_RIDE_CODE, &serde_json::to_string(code)?)
                .await?;
        }
        self.put(KEY_IN_PROGRESS, &serde_json::to_string(&pointers.in_progress)?)
            .await?;
        Ok(())
    }

    async fn clear_pointers(&self) -> Result<()> {
        self.remove_many(&POINTER_KEYS).await
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
