mod common;

use common::*;
use serde_json::json;

#[tokio::test]
async fn fresh_user_has_zeroed_series() {
    let app = test_app();
    let auth = register_user(&app, "a@example.com", "Ada", "Lovelace").await;

    let (status, body) = call(&app, "GET", "/user/stats", Some(token(&auth)), None).await;
    assert_eq!(status, OK);
    let stats = &body["userStats"];
    assert_eq!(stats["involvementRate"], 0.0);
    assert_eq!(stats["channelsJoined"][0]["numChannelsJoined"], 0);
    assert_eq!(stats["dmsJoined"][0]["numDmsJoined"], 0);
    assert_eq!(stats["messagesSent"][0]["numMessagesSent"], 0);
    assert!(stats["channelsJoined"][0]["timeStamp"].is_i64());
}

#[tokio::test]
async fn involvement_tracks_activity_and_stays_in_bounds() {
    let app = test_app();
    let auth = register_user(&app, "a@example.com", "Ada", "Lovelace").await;
    let channel = create_channel(&app, token(&auth), "general", true).await;
    send_message(&app, token(&auth), &channel["channelId"], "hello").await;

    let (_, body) = call(&app, "GET", "/user/stats", Some(token(&auth)), None).await;
    let stats = &body["userStats"];
    // sole user in 1 channel with 1 message: fully involved
    assert_eq!(stats["involvementRate"], 1.0);

    // series got a sample per mutating operation, newest last
    let joined = stats["channelsJoined"].as_array().unwrap();
    assert_eq!(joined.last().unwrap()["numChannelsJoined"], 1);
    let sent = stats["messagesSent"].as_array().unwrap();
    assert_eq!(sent.last().unwrap()["numMessagesSent"], 1);

    let rate = stats["involvementRate"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&rate));
}

#[tokio::test]
async fn involvement_can_hit_the_clamp_after_removals() {
    let app = test_app();
    let auth = register_user(&app, "a@example.com", "Ada", "Lovelace").await;
    let channel = create_channel(&app, token(&auth), "general", true).await;
    let sent = send_message(&app, token(&auth), &channel["channelId"], "fleeting").await;

    // removal shrinks the denominator; the next recompute must clamp
    let path = format!("/message/remove?messageId={}", sent["messageId"].as_str().unwrap());
    call(&app, "DELETE", &path, Some(token(&auth)), None).await;
    let dm_peer = register_user(&app, "b@example.com", "Bea", "Peer").await;
    create_dm(&app, token(&auth), json!([dm_peer["authUserId"]])).await;

    let (_, body) = call(&app, "GET", "/user/stats", Some(token(&auth)), None).await;
    let rate = body["userStats"]["involvementRate"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&rate));
}

#[tokio::test]
async fn utilization_counts_distinct_active_users() {
    let app = test_app();
    let active = register_user(&app, "a@example.com", "Ada", "Active").await;
    let _idle = register_user(&app, "i@example.com", "Ivy", "Idle").await;
    create_channel(&app, token(&active), "general", true).await;

    let (status, body) = call(&app, "GET", "/users/stats", Some(token(&active)), None).await;
    assert_eq!(status, OK);
    let stats = &body["workspaceStats"];
    // 1 of 2 registered users is in a channel or DM
    assert_eq!(stats["utilizationRate"], 0.5);

    let exist = stats["channelsExist"].as_array().unwrap();
    assert_eq!(exist[0]["numChannelsExist"], 0);
    assert_eq!(exist.last().unwrap()["numChannelsExist"], 1);
}

#[tokio::test]
async fn workspace_series_track_message_lifecycle() {
    let app = test_app();
    let auth = register_user(&app, "a@example.com", "Ada", "Lovelace").await;
    let channel = create_channel(&app, token(&auth), "general", true).await;
    let sent = send_message(&app, token(&auth), &channel["channelId"], "counted").await;

    let (_, body) = call(&app, "GET", "/users/stats", Some(token(&auth)), None).await;
    let exist = body["workspaceStats"]["messagesExist"].as_array().unwrap();
    assert_eq!(exist.last().unwrap()["numMessagesExist"], 1);

    let path = format!("/message/remove?messageId={}", sent["messageId"].as_str().unwrap());
    call(&app, "DELETE", &path, Some(token(&auth)), None).await;

    let (_, body) = call(&app, "GET", "/users/stats", Some(token(&auth)), None).await;
    let exist = body["workspaceStats"]["messagesExist"].as_array().unwrap();
    assert_eq!(exist.last().unwrap()["numMessagesExist"], 0);
}

#[tokio::test]
async fn clear_reseeds_the_workspace() {
    let app = test_app();
    let auth = register_user(&app, "a@example.com", "Ada", "Lovelace").await;
    create_channel(&app, token(&auth), "general", true).await;

    let (status, _) = call(&app, "DELETE", "/clear", None, None).await;
    assert_eq!(status, OK);

    // old tokens are gone with the users
    let (status, _) = call(&app, "GET", "/users/stats", Some(token(&auth)), None).await;
    assert_eq!(status, FORBIDDEN);

    let fresh = register_user(&app, "a@example.com", "Ada", "Lovelace").await;
    let (_, body) = call(&app, "GET", "/users/stats", Some(token(&fresh)), None).await;
    let stats = &body["workspaceStats"];
    assert_eq!(stats["channelsExist"].as_array().unwrap().len(), 1);
    assert_eq!(stats["channelsExist"][0]["numChannelsExist"], 0);
}
