//! Board sub-client: incoming events and chat.

use tokio_util::sync::CancellationToken;

use crate::client::LichessClient;
use crate::domain::account::Ack;
use crate::domain::board::{ChatRoom, IncomingEvent};
use crate::error::SdkError;
use crate::http::{ItemStream, Request};

pub struct Board<'a> {
    pub(crate) client: &'a LichessClient,
}

impl<'a> Board<'a> {
    /// Stream incoming events (game starts, challenges) for the token owner.
    ///
    /// The feed stays open until the server closes it or the stream is
    /// dropped; blank keep-alive lines are skipped.
    pub async fn stream_events(&self) -> Result<ItemStream<IncomingEvent>, SdkError> {
        self.stream_events_with(&CancellationToken::new()).await
    }

    /// [`Board::stream_events`] tied to a cancellation token.
    pub async fn stream_events_with(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ItemStream<IncomingEvent>, SdkError> {
        let request = Request::get("/api/stream/event").cancel_on(cancel);
        Ok(self.client.http.open_stream(request).await?)
    }

    /// Post a message to a game chat.
    pub async fn write_chat(
        &self,
        game_id: &str,
        room: ChatRoom,
        text: &str,
    ) -> Result<Ack, SdkError> {
        let path = format!("/api/board/game/{}/chat", urlencoding::encode(game_id));
        Ok(self
            .client
            .http
            .post_form(path, [("room", room.as_str()), ("text", text)])
            .await?)
    }
}
