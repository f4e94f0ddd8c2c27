//! Tablebase sub-client.

use crate::client::LichessClient;
use crate::domain::tablebase::TablebaseEntry;
use crate::error::SdkError;
use crate::http::{Host, Request};

pub struct Tablebase<'a> {
    pub(crate) client: &'a LichessClient,
}

impl<'a> Tablebase<'a> {
    /// Look up a standard-chess position by FEN.
    pub async fn standard(&self, fen: &str) -> Result<TablebaseEntry, SdkError> {
        let url = self.client.http.url_for(Host::Tablebase, "/standard")?;
        let request = Request::get(url).query("fen", fen);
        Ok(self.client.http.send_json(request).await?)
    }
}
