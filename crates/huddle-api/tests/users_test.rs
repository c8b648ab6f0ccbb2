mod common;

use common::*;
use serde_json::json;

#[tokio::test]
async fn profile_lookup() {
    let app = test_app();
    let auth = register_user(&app, "ada@example.com", "Ada", "Lovelace").await;

    let path = format!("/user/profile?uId={}", auth["authUserId"].as_str().unwrap());
    let (status, body) = call(&app, "GET", &path, Some(token(&auth)), None).await;
    assert_eq!(status, OK);
    let user = &body["user"];
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["nameFirst"], "Ada");
    assert_eq!(user["nameLast"], "Lovelace");
    assert_eq!(user["handleStr"], "adalovelace");
    assert!(user["profileImgUrl"].as_str().unwrap().ends_with("default.jpg"));

    let (status, _) = call(
        &app,
        "GET",
        "/user/profile?uId=00000000-0000-4000-8000-000000000000",
        Some(token(&auth)),
        None,
    )
    .await;
    assert_eq!(status, INPUT_ERROR);
}

#[tokio::test]
async fn users_all_lists_everyone() {
    let app = test_app();
    let auth = register_user(&app, "a@example.com", "Ada", "Lovelace").await;
    register_user(&app, "b@example.com", "Bea", "Second").await;

    let (status, body) = call(&app, "GET", "/users/all", Some(token(&auth)), None).await;
    assert_eq!(status, OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn set_name_and_email() {
    let app = test_app();
    let auth = register_user(&app, "a@example.com", "Ada", "Lovelace").await;
    register_user(&app, "taken@example.com", "Tara", "Taken").await;

    let (status, _) = call(
        &app,
        "PUT",
        "/user/profile/setname",
        Some(token(&auth)),
        Some(json!({ "nameFirst": "Augusta", "nameLast": "King" })),
    )
    .await;
    assert_eq!(status, OK);

    let (status, _) = call(
        &app,
        "PUT",
        "/user/profile/setname",
        Some(token(&auth)),
        Some(json!({ "nameFirst": "", "nameLast": "King" })),
    )
    .await;
    assert_eq!(status, INPUT_ERROR);

    // someone else's email
    let (status, _) = call(
        &app,
        "PUT",
        "/user/profile/setemail",
        Some(token(&auth)),
        Some(json!({ "email": "taken@example.com" })),
    )
    .await;
    assert_eq!(status, INPUT_ERROR);

    let (status, _) = call(
        &app,
        "PUT",
        "/user/profile/setemail",
        Some(token(&auth)),
        Some(json!({ "email": "augusta@example.com" })),
    )
    .await;
    assert_eq!(status, OK);

    let path = format!("/user/profile?uId={}", auth["authUserId"].as_str().unwrap());
    let (_, body) = call(&app, "GET", &path, Some(token(&auth)), None).await;
    assert_eq!(body["user"]["nameFirst"], "Augusta");
    assert_eq!(body["user"]["email"], "augusta@example.com");
}

#[tokio::test]
async fn set_handle_enforces_format_and_uniqueness() {
    let app = test_app();
    let auth = register_user(&app, "a@example.com", "Ada", "Lovelace").await;
    register_user(&app, "b@example.com", "Bea", "Second").await;

    for bad in ["ab", "spaced out", "abcdefghijklmnopqrstu", "beasecond"] {
        let (status, _) = call(
            &app,
            "PUT",
            "/user/profile/sethandle",
            Some(token(&auth)),
            Some(json!({ "handleStr": bad })),
        )
        .await;
        assert_eq!(status, INPUT_ERROR, "handle {bad:?} should be rejected");
    }

    let (status, _) = call(
        &app,
        "PUT",
        "/user/profile/sethandle",
        Some(token(&auth)),
        Some(json!({ "handleStr": "countess" })),
    )
    .await;
    assert_eq!(status, OK);
}

#[tokio::test]
async fn upload_photo_validates_geometry() {
    let app = test_app();
    let auth = register_user(&app, "a@example.com", "Ada", "Lovelace").await;

    let bad_requests = [
        json!({ "imgUrl": "http://x.test/p.png", "xStart": 0, "yStart": 0, "xEnd": 100, "yEnd": 100 }),
        json!({ "imgUrl": "http://x.test/p.jpg", "xStart": 100, "yStart": 0, "xEnd": 100, "yEnd": 100 }),
        json!({ "imgUrl": "http://x.test/p.jpg", "xStart": -1, "yStart": 0, "xEnd": 100, "yEnd": 100 }),
        json!({ "imgUrl": "http://x.test/p.jpg", "xStart": 0, "yStart": 0, "xEnd": 1001, "yEnd": 100 }),
    ];
    for body in bad_requests {
        let (status, _) = call(&app, "POST", "/user/profile/uploadphoto", Some(token(&auth)), Some(body)).await;
        assert_eq!(status, INPUT_ERROR);
    }

    let (status, _) = call(
        &app,
        "POST",
        "/user/profile/uploadphoto",
        Some(token(&auth)),
        Some(json!({ "imgUrl": "http://x.test/p.jpg", "xStart": 0, "yStart": 0, "xEnd": 100, "yEnd": 100 })),
    )
    .await;
    assert_eq!(status, OK);

    let path = format!("/user/profile?uId={}", auth["authUserId"].as_str().unwrap());
    let (_, body) = call(&app, "GET", &path, Some(token(&auth)), None).await;
    assert_eq!(body["user"]["profileImgUrl"], "http://x.test/p.jpg");
}
