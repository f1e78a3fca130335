use crate::app::session_guard::SessionGuard;
use crate::domain::settings::{SettingsUpdate, UserSettings};
use crate::error::ApiResult;
use crate::infra::http::ApiClient;
use std::sync::Arc;

pub struct SettingsService {
    client: Arc<ApiClient>,
    session: SessionGuard,
}

impl SettingsService {
    pub fn new(client: Arc<ApiClient>, session: SessionGuard) -> Self {
        Self { client, session }
    }

    pub async fn load(&self) -> ApiResult<UserSettings> {
        let client = &self.client;
        self.session
            .require_auth(move || client.get_json("/settings"))
            .await
    }

    /// Sends one domain's partial update; the server answers with the merged settings.
    pub async fn update(&self, update: &SettingsUpdate) -> ApiResult<UserSettings> {
        let client = &self.client;
        self.session
            .require_auth(move || client.patch_json("/settings", update))
            .await
    }
}
