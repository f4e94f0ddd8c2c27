//! Account sub-client: profile, kid mode, token revocation.

use crate::client::LichessClient;
use crate::domain::account::{Ack, UserProfile};
use crate::error::SdkError;
use crate::http::Request;

pub struct Account<'a> {
    pub(crate) client: &'a LichessClient,
}

impl<'a> Account<'a> {
    /// Profile of the token owner. Requires a token.
    pub async fn me(&self) -> Result<UserProfile, SdkError> {
        Ok(self.client.http.get_json("/api/account").await?)
    }

    /// Turn kid mode on or off. Requires the `preference:write` scope.
    pub async fn set_kid_mode(&self, enabled: bool) -> Result<Ack, SdkError> {
        let request = Request::post("/api/account/kid").query("v", enabled);
        Ok(self.client.http.send_json(request).await?)
    }

    /// Revoke the token this client was built with.
    pub async fn revoke_token(&self) -> Result<(), SdkError> {
        Ok(self.client.http.delete("/api/token").await?)
    }
}
