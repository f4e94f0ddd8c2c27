//! Integration tests for the high-level sub-clients against a local mock server.
//!
//! Run with:
//! ```bash
//! cargo test --test client_integration
//! ```

use std::time::Duration;

use futures_util::StreamExt;
use lichess_sdk::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> LichessClient {
    LichessClient::builder()
        .base_url(&server.uri())
        .engine_url(&server.uri())
        .tablebase_url(&server.uri())
        .token("lip_test")
        .retry(
            RetryConfig::new(3)
                .with_base_delay(Duration::from_millis(5))
                .with_max_delay(Duration::from_millis(20)),
        )
        .build()
        .unwrap()
}

fn ndjson(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "application/x-ndjson")
}

#[tokio::test]
async fn test_account_me() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/account"))
        .and(header("authorization", "Bearer lip_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "georges",
            "username": "Georges",
            "createdAt": 1290415680000u64,
            "patron": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let me = client(&server).account().me().await.unwrap();
    assert_eq!(me.id, "georges");
    assert!(me.patron);
    assert_eq!(
        me.created_at.map(|t| t.timestamp_millis()),
        Some(1_290_415_680_000)
    );
}

#[tokio::test]
async fn test_account_unauthorized_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/account"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "No such token"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).account().me().await.unwrap_err();
    assert!(matches!(err, SdkError::Http(HttpError::Unauthorized)));
}

#[tokio::test]
async fn test_account_kid_mode_and_revoke() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/account/kid"))
        .and(query_param("v", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server);
    assert!(c.account().set_kid_mode(true).await.unwrap().ok);
    c.account().revoke_token().await.unwrap();
}

#[tokio::test]
async fn test_games_export_pgn() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/game/export/q7ZvsdUF"))
        .and(header("accept", "application/x-chess-pgn"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[Site \"https://lichess.org/q7ZvsdUF\"]\n\n1. d4 *\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pgn = client(&server).games().export_pgn("q7ZvsdUF").await.unwrap();
    assert!(pgn.starts_with("[Site"));
}

#[tokio::test]
async fn test_games_stream_by_users() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/stream/games-by-users"))
        .and(body_string("thibault,maia1"))
        .respond_with(ndjson(concat!(
            "{\"id\":\"aaaa1111\",\"rated\":true,\"statusName\":\"started\",",
            "\"players\":{\"white\":{\"userId\":\"thibault\",\"rating\":1500},",
            "\"black\":{\"userId\":\"maia1\"}}}\n",
            "\n",
            "{\"id\":\"aaaa1111\",\"rated\":true,\"statusName\":\"mate\"}\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let games: Vec<GameSummary> = client(&server)
        .games()
        .stream_by_users(&["thibault", "maia1"])
        .await
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(games.len(), 2);
    let players = games[0].players.as_ref().unwrap();
    assert_eq!(players.white.user_id.as_deref(), Some("thibault"));
    assert_eq!(players.white.rating, Some(1500));
    assert_eq!(games[1].status_name.as_deref(), Some("mate"));
}

#[tokio::test]
async fn test_board_event_stream_with_keepalives() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stream/event"))
        .and(header("accept", "application/x-ndjson"))
        .respond_with(ndjson(concat!(
            "\n",
            "{\"type\":\"challenge\",\"challenge\":{\"id\":\"c1\"}}\n",
            "\n\n",
            "{\"type\":\"gameStart\",\"game\":{\"gameId\":\"g1\",\"isMyTurn\":true}}\n",
            "{\"type\":\"somethingNew\"}\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let events: Vec<IncomingEvent> = client(&server)
        .board()
        .stream_events()
        .await
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], IncomingEvent::Challenge { challenge } if challenge.id == "c1"));
    match &events[1] {
        IncomingEvent::GameStart { game } => {
            assert_eq!(game.game_id, "g1");
            assert_eq!(game.is_my_turn, Some(true));
        }
        other => panic!("expected gameStart, got {other:?}"),
    }
    assert_eq!(events[2], IncomingEvent::Unknown);
}

#[tokio::test]
async fn test_board_event_stream_cancellation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stream/event"))
        .respond_with(ndjson(concat!(
            "{\"type\":\"challenge\",\"challenge\":{\"id\":\"c1\"}}\n",
            "{\"type\":\"challenge\",\"challenge\":{\"id\":\"c2\"}}\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let mut events = client(&server)
        .board()
        .stream_events_with(&token)
        .await
        .unwrap();
    assert!(events.next().await.unwrap().is_ok());

    token.cancel();
    assert!(events.next().await.unwrap().unwrap_err().is_cancelled());
    assert!(events.next().await.is_none());
}

#[tokio::test]
async fn test_board_write_chat_sends_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/board/game/g1/chat"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("room=spectator&text=good+game"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let ack = client(&server)
        .board()
        .write_chat("g1", ChatRoom::Spectator, "good game")
        .await
        .unwrap();
    assert!(ack.ok);
}

#[tokio::test]
async fn test_tablebase_standard_uses_tablebase_host() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/standard"))
        .and(query_param("fen", "4k3/6KP/8/8/8/8/7p/8 w - - 0 1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "category": "win",
            "dtz": 1,
            "moves": [{"uci": "h7h8q", "san": "h8=Q+", "category": "loss", "dtz": -2}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let c = LichessClient::builder()
        .base_url("http://127.0.0.1:1")
        .tablebase_url(&server.uri())
        .build()
        .unwrap();
    let entry = c
        .tablebase()
        .standard("4k3/6KP/8/8/8/8/7p/8 w - - 0 1")
        .await
        .unwrap();
    assert_eq!(entry.category, "win");
    assert_eq!(entry.moves[0].uci, "h7h8q");
}

fn engine_json() -> serde_json::Value {
    json!({
        "id": "eei_aTKImBJOnv6j",
        "name": "Stockfish 16",
        "userId": "thibault",
        "maxThreads": 8,
        "maxHash": 2048,
        "variants": ["chess"],
        "providerData": null
    })
}

#[tokio::test]
async fn test_external_engine_update_sends_camel_case_json() {
    let server = MockServer::start().await;
    let registration = EngineRegistration {
        name: "Stockfish 16".into(),
        max_threads: 8,
        max_hash: 2048,
        variants: vec!["chess".into()],
        provider_secret: "Dee3uwieZei9ahpaici9bee2yahFoo8f".into(),
        provider_data: None,
    };
    Mock::given(method("PUT"))
        .and(path("/api/external-engine/eei_aTKImBJOnv6j"))
        .and(body_json(json!({
            "name": "Stockfish 16",
            "maxThreads": 8,
            "maxHash": 2048,
            "variants": ["chess"],
            "providerSecret": "Dee3uwieZei9ahpaici9bee2yahFoo8f"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(engine_json()))
        .expect(1)
        .mount(&server)
        .await;

    let engine = client(&server)
        .external_engines()
        .update("eei_aTKImBJOnv6j", &registration)
        .await
        .unwrap();
    assert_eq!(engine.max_hash, 2048);
    assert_eq!(engine.user_id.as_deref(), Some("thibault"));
}

#[tokio::test]
async fn test_external_engine_acquire_work() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/external-engine/work"))
        .and(body_json(json!({"providerSecret": "idle"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/external-engine/work"))
        .and(body_json(json!({"providerSecret": "busy"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "aingoohiJee2sius",
            "work": {
                "sessionId": "abcd",
                "threads": 4,
                "hash": 128,
                "multiPv": 1,
                "variant": "chess",
                "initialFen": "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
                "moves": ["e2e4"]
            },
            "engine": engine_json()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server);
    assert!(c.external_engines().acquire_work("idle").await.unwrap().is_none());

    let work = c.external_engines().acquire_work("busy").await.unwrap().unwrap();
    assert_eq!(work.work.multi_pv, 1);
    assert_eq!(work.work.moves, vec!["e2e4".to_string()]);
    assert_eq!(work.engine.name, "Stockfish 16");
}
