//! External engine sub-client: registration updates and work acquisition.

use tokio_util::sync::CancellationToken;

use crate::client::LichessClient;
use crate::domain::external_engine::{EngineRegistration, EngineWork, ExternalEngine, WorkRequest};
use crate::error::SdkError;
use crate::http::{Host, Request};

pub struct ExternalEngines<'a> {
    pub(crate) client: &'a LichessClient,
}

impl<'a> ExternalEngines<'a> {
    /// Replace an engine registration. Repeating the call is harmless, so it
    /// is retried like a read.
    pub async fn update(
        &self,
        engine_id: &str,
        registration: &EngineRegistration,
    ) -> Result<ExternalEngine, SdkError> {
        let path = format!("/api/external-engine/{}", urlencoding::encode(engine_id));
        let request = Request::put(path).json(registration)?.idempotent();
        Ok(self.client.http.send_json(request).await?)
    }

    /// Wait for pending analysis work. `None` means no work was available.
    pub async fn acquire_work(
        &self,
        provider_secret: &str,
    ) -> Result<Option<EngineWork>, SdkError> {
        self.acquire_work_with(provider_secret, &CancellationToken::new())
            .await
    }

    /// [`ExternalEngines::acquire_work`] tied to a cancellation token.
    pub async fn acquire_work_with(
        &self,
        provider_secret: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<EngineWork>, SdkError> {
        let url = self
            .client
            .http
            .url_for(Host::Engine, "/api/external-engine/work")?;
        let request = Request::post(url)
            .json(&WorkRequest { provider_secret })?
            .cancel_on(cancel);
        Ok(self.client.http.send_optional(request).await?)
    }
}
