// End-to-end flows through accounts, follows, posts, likes, DMs and media.
// Every test here needs a real database; each skips itself when /health
// reports degraded.

mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

macro_rules! require_db {
    ($server:expr) => {
        if !common::db_available($server).await {
            eprintln!("skipping: database unavailable");
            return Ok(());
        }
    };
}

#[tokio::test]
async fn register_login_whoami_roundtrip() -> Result<()> {
    let server = common::ensure_server().await?;
    require_db!(server);
    let client = reqwest::Client::new();

    let username = common::unique("wren");
    let user = common::register(&client, &server.base_url, &username).await?;
    assert_eq!(user["username"], username.as_str());
    assert!(
        user.get("password_hash").is_none(),
        "hash must never serialize: {}",
        user
    );

    let token = common::login(&client, &server.base_url, &username).await?;
    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["username"], username.as_str());

    // The username is now taken
    let res = client
        .post(format!("{}/auth/register", server.base_url))
        .json(&json!({ "username": username, "password": common::PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn profiles_hide_email_and_count_activity() -> Result<()> {
    let server = common::ensure_server().await?;
    require_db!(server);
    let client = reqwest::Client::new();

    let username = common::unique("sparrow");
    let res = client
        .post(format!("{}/auth/register", server.base_url))
        .json(&json!({
            "username": username,
            "password": common::PASSWORD,
            "email": format!("{}@example.com", username)
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let viewer = common::unique("viewer");
    let (viewer_token, _) =
        common::register_and_login(&client, &server.base_url, &viewer).await?;

    let res = client
        .get(format!("{}/api/users/{}", server.base_url, username))
        .bearer_auth(&viewer_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    let profile = &body["data"];
    assert_eq!(profile["username"], username.as_str());
    assert!(profile.get("email").is_none(), "email leaked: {}", profile);
    assert_eq!(profile["counts"]["posts"], 0);
    assert_eq!(profile["counts"]["followers"], 0);
    assert_eq!(profile["counts"]["following"], 0);

    // Unknown usernames are a plain 404
    let res = client
        .get(format!("{}/api/users/no-such-user-anywhere", server.base_url))
        .bearer_auth(&viewer_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn following_a_public_account_takes_effect_immediately() -> Result<()> {
    let server = common::ensure_server().await?;
    require_db!(server);
    let client = reqwest::Client::new();

    let author = common::unique("author");
    let reader = common::unique("reader");
    let (author_token, _) =
        common::register_and_login(&client, &server.base_url, &author).await?;
    let (reader_token, _) =
        common::register_and_login(&client, &server.base_url, &reader).await?;

    // Post before following; the timeline query is by edge, not by when
    // the follow happened
    let res = client
        .post(format!("{}/api/posts", server.base_url))
        .bearer_auth(&author_token)
        .json(&json!({ "body": "first flight" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let post_id = res.json::<Value>().await?["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = client
        .post(format!("{}/api/users/{}/follow", server.base_url, author))
        .bearer_auth(&reader_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let edge = res.json::<Value>().await?;
    assert_eq!(edge["data"]["state"], "accepted");
    assert!(edge["data"]["accepted_at"].is_string());

    let res = client
        .get(format!("{}/api/posts", server.base_url))
        .bearer_auth(&reader_token)
        .send()
        .await?;
    let timeline = res.json::<Value>().await?;
    let ids: Vec<&str> = timeline["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert!(ids.contains(&post_id.as_str()), "timeline misses the post");

    // Following yourself is refused
    let res = client
        .post(format!("{}/api/users/{}/follow", server.base_url, reader))
        .bearer_auth(&reader_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Unfollow, then unfollow again
    let res = client
        .delete(format!("{}/api/users/{}/follow", server.base_url, author))
        .bearer_auth(&reader_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let res = client
        .delete(format!("{}/api/users/{}/follow", server.base_url, author))
        .bearer_auth(&reader_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn private_accounts_require_an_accepted_request() -> Result<()> {
    let server = common::ensure_server().await?;
    require_db!(server);
    let client = reqwest::Client::new();

    let owner = common::unique("hermit");
    let wanted = common::unique("wanted");
    let rejected = common::unique("unwanted");
    let (owner_token, _) = common::register_and_login(&client, &server.base_url, &owner).await?;
    let (wanted_token, _) =
        common::register_and_login(&client, &server.base_url, &wanted).await?;
    let (rejected_token, _) =
        common::register_and_login(&client, &server.base_url, &rejected).await?;

    let res = client
        .put(format!("{}/api/users/me", server.base_url))
        .bearer_auth(&owner_token)
        .json(&json!({ "is_private": true }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["is_private"], true);

    // Both requests land as pending
    for token in [&wanted_token, &rejected_token] {
        let res = client
            .post(format!("{}/api/users/{}/follow", server.base_url, owner))
            .bearer_auth(token)
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.json::<Value>().await?["data"]["state"], "pending");
    }

    // Pending followers cannot see content
    let res = client
        .get(format!("{}/api/users/{}/posts", server.base_url, owner))
        .bearer_auth(&wanted_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(format!("{}/api/follows/requests", server.base_url))
        .bearer_auth(&owner_token)
        .send()
        .await?;
    let requests = res.json::<Value>().await?;
    let find_request = |name: &str| -> Option<String> {
        requests["data"].as_array().unwrap().iter().find_map(|r| {
            (r["user"]["username"] == name).then(|| r["id"].as_str().unwrap().to_string())
        })
    };
    let wanted_req = find_request(&wanted).expect("request from wanted follower");
    let rejected_req = find_request(&rejected).expect("request from unwanted follower");

    let res = client
        .post(format!(
            "{}/api/follows/requests/{}/accept",
            server.base_url, wanted_req
        ))
        .bearer_auth(&owner_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["state"], "accepted");

    let res = client
        .delete(format!(
            "{}/api/follows/requests/{}",
            server.base_url, rejected_req
        ))
        .bearer_auth(&owner_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Accepting twice is a 404: the request is gone once resolved
    let res = client
        .post(format!(
            "{}/api/follows/requests/{}/accept",
            server.base_url, wanted_req
        ))
        .bearer_auth(&owner_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Only the accepted follower can read now
    let res = client
        .get(format!("{}/api/users/{}/posts", server.base_url, owner))
        .bearer_auth(&wanted_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let res = client
        .get(format!("{}/api/users/{}/posts", server.base_url, owner))
        .bearer_auth(&rejected_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn posts_carry_mentions_tags_and_replies() -> Result<()> {
    let server = common::ensure_server().await?;
    require_db!(server);
    let client = reqwest::Client::new();

    let author = common::unique("poster");
    let friend = common::unique("friend");
    let (author_token, _) =
        common::register_and_login(&client, &server.base_url, &author).await?;
    let (friend_token, _) =
        common::register_and_login(&client, &server.base_url, &friend).await?;

    // Tag names allow underscores but not hyphens
    let tag = common::unique("tag").replace('-', "_");
    let body = format!("hello @{} welcome to #{} #{}", friend, tag, tag.to_uppercase());

    let res = client
        .post(format!("{}/api/posts", server.base_url))
        .bearer_auth(&author_token)
        .json(&json!({ "body": body }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let post = res.json::<Value>().await?["data"].clone();
    let post_id = post["id"].as_str().unwrap().to_string();
    assert_eq!(post["author"]["username"], author.as_str());
    assert_eq!(post["like_count"], 0);
    // Upper and lower case collapse into one lowercased tag
    assert_eq!(post["tags"], json!([tag.to_lowercase()]));

    // The mention shows up for the mentioned user
    let res = client
        .get(format!("{}/api/mentions", server.base_url))
        .bearer_auth(&friend_token)
        .send()
        .await?;
    let mentions = res.json::<Value>().await?;
    assert!(
        mentions["data"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["id"] == post_id.as_str()),
        "mention feed misses the post: {}",
        mentions
    );

    // And the post is findable by tag
    let res = client
        .get(format!("{}/api/tags/{}/posts", server.base_url, tag))
        .bearer_auth(&friend_token)
        .send()
        .await?;
    let tagged = res.json::<Value>().await?;
    assert!(tagged["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["id"] == post_id.as_str()));

    let res = client
        .get(format!("{}/api/tags/trending", server.base_url))
        .bearer_auth(&friend_token)
        .send()
        .await?;
    let trending = res.json::<Value>().await?;
    assert!(
        trending["data"]
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t["tag"] == tag.to_lowercase() && t["post_count"].as_i64() >= Some(1)),
        "trending misses the tag: {}",
        trending
    );

    // Replies must target a visible post and bump reply_count
    let res = client
        .post(format!("{}/api/posts", server.base_url))
        .bearer_auth(&friend_token)
        .json(&json!({ "body": "a reply", "reply_to": post_id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .get(format!("{}/api/posts/{}", server.base_url, post_id))
        .bearer_auth(&friend_token)
        .send()
        .await?;
    assert_eq!(res.json::<Value>().await?["data"]["reply_count"], 1);

    let res = client
        .post(format!("{}/api/posts", server.base_url))
        .bearer_auth(&friend_token)
        .json(&json!({
            "body": "reply to nothing",
            "reply_to": "00000000-0000-0000-0000-000000000000"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn likes_are_idempotent_and_listable() -> Result<()> {
    let server = common::ensure_server().await?;
    require_db!(server);
    let client = reqwest::Client::new();

    let author = common::unique("liked");
    let fan = common::unique("fan");
    let (author_token, _) =
        common::register_and_login(&client, &server.base_url, &author).await?;
    let (fan_token, _) = common::register_and_login(&client, &server.base_url, &fan).await?;

    let res = client
        .post(format!("{}/api/posts", server.base_url))
        .bearer_auth(&author_token)
        .json(&json!({ "body": "like me" }))
        .send()
        .await?;
    let post_id = res.json::<Value>().await?["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Double-like is one like
    for _ in 0..2 {
        let res = client
            .post(format!("{}/api/posts/{}/like", server.base_url, post_id))
            .bearer_auth(&fan_token)
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.json::<Value>().await?["data"]["liked"], true);
    }

    let res = client
        .get(format!("{}/api/posts/{}", server.base_url, post_id))
        .bearer_auth(&fan_token)
        .send()
        .await?;
    assert_eq!(res.json::<Value>().await?["data"]["like_count"], 1);

    let res = client
        .get(format!("{}/api/posts/{}/likes", server.base_url, post_id))
        .bearer_auth(&author_token)
        .send()
        .await?;
    let likers = res.json::<Value>().await?;
    assert!(likers["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|u| u["username"] == fan.as_str()));

    let res = client
        .delete(format!("{}/api/posts/{}/like", server.base_url, post_id))
        .bearer_auth(&fan_token)
        .send()
        .await?;
    assert_eq!(res.json::<Value>().await?["data"]["liked"], false);

    let res = client
        .get(format!("{}/api/posts/{}", server.base_url, post_id))
        .bearer_auth(&fan_token)
        .send()
        .await?;
    assert_eq!(res.json::<Value>().await?["data"]["like_count"], 0);

    Ok(())
}

#[tokio::test]
async fn direct_messages_flow_through_threads_and_read_state() -> Result<()> {
    let server = common::ensure_server().await?;
    require_db!(server);
    let client = reqwest::Client::new();

    let sender = common::unique("sender");
    let receiver = common::unique("receiver");
    let (sender_token, _) =
        common::register_and_login(&client, &server.base_url, &sender).await?;
    let (receiver_token, _) =
        common::register_and_login(&client, &server.base_url, &receiver).await?;

    let res = client
        .post(format!("{}/api/messages/{}", server.base_url, receiver))
        .bearer_auth(&sender_token)
        .json(&json!({ "body": "psst, over here" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    // Messaging yourself is refused
    let res = client
        .post(format!("{}/api/messages/{}", server.base_url, sender))
        .bearer_auth(&sender_token)
        .json(&json!({ "body": "me, myself and I" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(format!("{}/api/messages", server.base_url))
        .bearer_auth(&receiver_token)
        .send()
        .await?;
    let conversations = res.json::<Value>().await?;
    let convo = conversations["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["peer"]["username"] == sender.as_str())
        .expect("conversation with sender")
        .clone();
    assert_eq!(convo["unread_count"], 1);
    assert_eq!(convo["last_message"]["body"], "psst, over here");

    let res = client
        .get(format!("{}/api/messages/{}", server.base_url, sender))
        .bearer_auth(&receiver_token)
        .send()
        .await?;
    let thread = res.json::<Value>().await?;
    assert_eq!(thread["data"][0]["body"], "psst, over here");
    assert_eq!(thread["data"][0]["read"], false);

    let res = client
        .put(format!("{}/api/messages/{}/read", server.base_url, sender))
        .bearer_auth(&receiver_token)
        .send()
        .await?;
    assert_eq!(res.json::<Value>().await?["data"]["updated"], 1);

    let res = client
        .get(format!("{}/api/messages/{}", server.base_url, sender))
        .bearer_auth(&receiver_token)
        .send()
        .await?;
    assert_eq!(res.json::<Value>().await?["data"][0]["read"], true);

    Ok(())
}

#[tokio::test]
async fn search_finds_users_and_pagination_is_clamped() -> Result<()> {
    let server = common::ensure_server().await?;
    require_db!(server);
    let client = reqwest::Client::new();

    let needle = common::unique("needle");
    let (token, _) = common::register_and_login(&client, &server.base_url, &needle).await?;

    let res = client
        .get(format!("{}/api/users", server.base_url))
        .query(&[("q", needle.as_str())])
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|u| u["username"] == needle.as_str()));

    // Missing q
    let res = client
        .get(format!("{}/api/users", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Unparsable paging params
    let res = client
        .get(format!("{}/api/posts", server.base_url))
        .query(&[("page", "abc")])
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Oversized limits clamp instead of erroring
    let res = client
        .get(format!("{}/api/posts", server.base_url))
        .query(&[("limit", "100000"), ("page", "0")])
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let meta = res.json::<Value>().await?["meta"].clone();
    assert!(meta["limit"].as_i64().unwrap() <= 100, "meta: {}", meta);
    assert_eq!(meta["page"], 1);

    Ok(())
}

#[tokio::test]
async fn media_registers_and_attaches_to_posts() -> Result<()> {
    let server = common::ensure_server().await?;
    require_db!(server);
    let client = reqwest::Client::new();

    let owner = common::unique("shutter");
    let other = common::unique("passerby");
    let (owner_token, _) = common::register_and_login(&client, &server.base_url, &owner).await?;
    let (other_token, _) = common::register_and_login(&client, &server.base_url, &other).await?;

    let res = client
        .post(format!("{}/api/media", server.base_url))
        .bearer_auth(&owner_token)
        .json(&json!({
            "url": "https://cdn.example.com/shot.png",
            "media_type": "image/png",
            "alt_text": "a pigeon"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let media_id = res.json::<Value>().await?["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Non-media types and non-http URLs are rejected
    let res = client
        .post(format!("{}/api/media", server.base_url))
        .bearer_auth(&owner_token)
        .json(&json!({ "url": "https://cdn.example.com/x", "media_type": "text/html" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let res = client
        .post(format!("{}/api/media", server.base_url))
        .bearer_auth(&owner_token)
        .json(&json!({ "url": "ftp://cdn.example.com/x", "media_type": "image/png" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Unattached media is only visible to its owner
    let res = client
        .get(format!("{}/api/media/{}", server.base_url, media_id))
        .bearer_auth(&owner_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let res = client
        .get(format!("{}/api/media/{}", server.base_url, media_id))
        .bearer_auth(&other_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(format!("{}/api/posts", server.base_url))
        .bearer_auth(&owner_token)
        .json(&json!({ "body": "with a picture", "media_ids": [media_id] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let post = res.json::<Value>().await?["data"].clone();
    assert_eq!(post["media"][0]["id"], media_id.as_str());

    // Once on a visible post, anyone who can see the post can see it
    let res = client
        .get(format!("{}/api/media/{}", server.base_url, media_id))
        .bearer_auth(&other_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn deactivated_accounts_vanish_from_the_network() -> Result<()> {
    let server = common::ensure_server().await?;
    require_db!(server);
    let client = reqwest::Client::new();

    let leaver = common::unique("leaver");
    let stayer = common::unique("stayer");
    let (leaver_token, _) =
        common::register_and_login(&client, &server.base_url, &leaver).await?;
    let (stayer_token, _) =
        common::register_and_login(&client, &server.base_url, &stayer).await?;

    let res = client
        .post(format!("{}/api/posts", server.base_url))
        .bearer_auth(&leaver_token)
        .json(&json!({ "body": "goodbye world" }))
        .send()
        .await?;
    let post_id = res.json::<Value>().await?["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = client
        .delete(format!("{}/api/users/me", server.base_url))
        .bearer_auth(&leaver_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // The old token dies with the account
    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .bearer_auth(&leaver_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // So does the login
    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({ "username": leaver, "password": common::PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Profile and posts are gone for everyone else
    let res = client
        .get(format!("{}/api/users/{}", server.base_url, leaver))
        .bearer_auth(&stayer_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = client
        .get(format!("{}/api/posts/{}", server.base_url, post_id))
        .bearer_auth(&stayer_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}
