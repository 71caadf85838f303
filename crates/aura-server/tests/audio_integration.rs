#[allow(dead_code)]
mod common;

use serde_json::json;

use common::TestServer;

const GUILD: u64 = 4242;

fn guild_path(action: &str) -> String {
    format!("/api/v1/guilds/{GUILD}/{action}")
}

async fn play(server: &TestServer, query: &str) -> (u16, serde_json::Value) {
    server
        .post(&guild_path("play"), json!({ "query": query, "channel": 10 }))
        .await
}

#[tokio::test]
async fn play_starts_streaming_in_the_requesters_channel() {
    let server = TestServer::new().await;
    let (status, body) = play(&server, "lofi beats").await;
    assert_eq!(status, 200);
    assert_eq!(body["titles"], json!(["lofi beats"]));
    assert_eq!(body["enqueued"]["accepted"], 1);

    let queue = server
        .wait_for_queue(GUILD, |q| q["state"] == "playing")
        .await;
    assert_eq!(queue["now_playing"]["title"], "lofi beats");
    assert_eq!(queue["channel"], 10);
    assert_eq!(queue["volume"], 0.5);

    let (_, health) = server.get("/health").await;
    assert_eq!(health["audio"]["guilds"], 1);
}

#[tokio::test]
async fn unplayable_playlist_entry_is_skipped() {
    let server = TestServer::new().await;
    let (status, body) = play(&server, "https://music.test/playlist?list=mix").await;
    assert_eq!(status, 200);
    assert_eq!(body["titles"], json!(["Intro", "Dead Air", "Outro"]));

    server
        .wait_for_queue(GUILD, |q| q["now_playing"]["title"] == "Intro")
        .await;
    let (status, body) = server.post_empty(&guild_path("skip")).await;
    assert_eq!(status, 200);
    assert_eq!(body["skipped"]["title"], "Intro");

    let queue = server
        .wait_for_queue(GUILD, |q| q["now_playing"]["title"] == "Outro")
        .await;
    assert_eq!(queue["state"], "playing");
    assert_eq!(queue["queue"]["total"], 0);
}

#[tokio::test]
async fn resolution_failures_are_reported() {
    let server = TestServer::new().await;
    let (status, body) = play(&server, "nothing").await;
    assert_eq!(status, 404);
    assert!(body["error"].is_string());

    let (status, _) = play(&server, "broken").await;
    assert_eq!(status, 502);

    let (status, _) = play(&server, "   ").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn controls_without_playback_are_conflicts() {
    let server = TestServer::new().await;
    let (status, body) = server.post_empty(&guild_path("skip")).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "nothing to skip");

    let (status, _) = server.post_empty(&guild_path("pause")).await;
    assert_eq!(status, 409);
    let (status, _) = server.post_empty(&guild_path("shuffle")).await;
    assert_eq!(status, 409);
    let (status, _) = server.post_empty(&guild_path("resume")).await;
    assert_eq!(status, 409);
    let (status, _) = server.get(&guild_path("queue")).await;
    assert_eq!(status, 200);

    let (_, health) = server.get("/health").await;
    assert_eq!(health["audio"]["guilds"], 0);
}

#[tokio::test]
async fn pause_and_resume() {
    let server = TestServer::new().await;
    play(&server, "song").await;
    server
        .wait_for_queue(GUILD, |q| q["state"] == "playing")
        .await;

    let (status, _) = server.post_empty(&guild_path("pause")).await;
    assert_eq!(status, 200);
    let (status, _) = server.post_empty(&guild_path("pause")).await;
    assert_eq!(status, 409);
    let (_, queue) = server.get(&guild_path("queue")).await;
    assert_eq!(queue["state"], "paused");

    let (status, body) = server.post_empty(&guild_path("resume")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "playing");
}

#[tokio::test]
async fn volume_is_validated_and_persisted() {
    let server = TestServer::new().await;
    let (status, _) = server.put(&guild_path("volume"), json!({ "percent": 150 })).await;
    assert_eq!(status, 400);

    let (status, body) = server.put(&guild_path("volume"), json!({ "percent": 30 })).await;
    assert_eq!(status, 200);
    assert_eq!(body["volume"], 0.3);

    let (_, settings) = server.get(&guild_path("settings")).await;
    assert_eq!(settings["volume"], 0.3);
}

#[tokio::test]
async fn queue_listing_shows_ten_and_a_count() {
    let server = TestServer::new().await;
    for n in 0..12 {
        let (status, _) = play(&server, &format!("track {n}")).await;
        assert_eq!(status, 200);
    }
    let queue = server
        .wait_for_queue(GUILD, |q| q["state"] == "playing")
        .await;
    assert_eq!(queue["now_playing"]["title"], "track 0");
    assert_eq!(queue["queue"]["titles"].as_array().unwrap().len(), 10);
    assert_eq!(queue["queue"]["titles"][0], "track 1");
    assert_eq!(queue["queue"]["total"], 11);
    assert_eq!(queue["more"], 1);

    let (status, body) = server.post_empty(&guild_path("shuffle")).await;
    assert_eq!(status, 200);
    assert_eq!(body["shuffled"], 11);
}

#[tokio::test]
async fn stop_clears_and_leaves() {
    let server = TestServer::new().await;
    play(&server, "one").await;
    play(&server, "two").await;
    server
        .wait_for_queue(GUILD, |q| q["state"] == "playing")
        .await;

    let (status, _) = server.post_empty(&guild_path("stop")).await;
    assert_eq!(status, 200);
    let (_, queue) = server.get(&guild_path("queue")).await;
    assert_eq!(queue["state"], "idle");
    assert_eq!(queue["queue"]["total"], 0);
    assert!(queue["channel"].is_null());
    assert!(queue["now_playing"].is_null());
    let (_, health) = server.get("/health").await;
    assert_eq!(health["audio"]["guilds"], 0);

    // A new play starts a fresh activation.
    play(&server, "three").await;
    let queue = server
        .wait_for_queue(GUILD, |q| q["state"] == "playing")
        .await;
    assert_eq!(queue["now_playing"]["title"], "three");
}

#[tokio::test]
async fn leave_without_playback_is_harmless() {
    let server = TestServer::new().await;
    let (status, body) = server.post_empty(&guild_path("leave")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "stopped");
}

#[tokio::test]
async fn guild_settings_round_trip() {
    let server = TestServer::new().await;
    let (status, body) = server.get(&guild_path("settings")).await;
    assert_eq!(status, 200);
    assert!(body["mode"].is_null());

    let (status, _) = server
        .put(
            &guild_path("settings"),
            json!({ "moderator_role_id": 77, "mode": "sarcastic", "volume": 4.0 }),
        )
        .await;
    assert_eq!(status, 200);

    let (_, body) = server.get(&guild_path("settings")).await;
    assert_eq!(body["moderator_role_id"], 77);
    assert_eq!(body["mode"], "sarcastic");
    assert_eq!(body["volume"], 1.0);
}

#[tokio::test]
async fn settings_volume_reaches_live_playback() {
    let server = TestServer::new().await;
    play(&server, "song").await;
    server
        .wait_for_queue(GUILD, |q| q["state"] == "playing")
        .await;

    let (status, body) = server
        .put(&guild_path("settings"), json!({ "mode": "calm", "volume": 0.25 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["volume"], 0.25);

    let (_, queue) = server.get(&guild_path("queue")).await;
    assert_eq!(queue["volume"], 0.25);
    assert_eq!(queue["state"], "playing");
}
