//! Games sub-client: PGN export and streams of games by users.

use tokio_util::sync::CancellationToken;

use crate::client::LichessClient;
use crate::domain::games::GameSummary;
use crate::error::SdkError;
use crate::http::{mime, ItemStream, Request};

pub struct Games<'a> {
    pub(crate) client: &'a LichessClient,
}

impl<'a> Games<'a> {
    /// Export one game as PGN.
    pub async fn export_pgn(&self, game_id: &str) -> Result<String, SdkError> {
        let path = format!("/game/export/{}", urlencoding::encode(game_id));
        Ok(self.client.http.get_text(path, mime::PGN).await?)
    }

    /// Stream games played between any of `user_ids`, as they start and finish.
    pub async fn stream_by_users(
        &self,
        user_ids: &[&str],
    ) -> Result<ItemStream<GameSummary>, SdkError> {
        self.stream_by_users_with(user_ids, &CancellationToken::new())
            .await
    }

    /// [`Games::stream_by_users`] tied to a cancellation token.
    pub async fn stream_by_users_with(
        &self,
        user_ids: &[&str],
        cancel: &CancellationToken,
    ) -> Result<ItemStream<GameSummary>, SdkError> {
        let request = Request::post("/api/stream/games-by-users")
            .text(user_ids.join(","))
            .cancel_on(cancel);
        Ok(self.client.http.open_stream(request).await?)
    }
}
