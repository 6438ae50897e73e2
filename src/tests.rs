#[cfg(test)]
mod integration_tests {
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use model::entities::{advert, advert_image, comment, rating, user};
    use rust_decimal::Decimal;
    use sea_orm::{EntityTrait, PaginatorTrait};

    use crate::handlers::adverts::{CreateAdvertRequest, DetailActionRequest, UpdateAdvertRequest};
    use crate::router::create_router;
    use crate::schemas::ApiResponse;
    use crate::test_utils::test_utils::{
        register_and_login, seed_sub_rubric, setup_test_app, setup_test_app_state,
    };

    async fn create_advert_via_api(
        server: &TestServer,
        token: &str,
        rubric_id: i32,
        title: &str,
        content: &str,
    ) -> i32 {
        let request = CreateAdvertRequest {
            rubric_id,
            title: title.to_string(),
            content: content.to_string(),
            price: Decimal::new(10000, 2),
            contacts: "call +1-555-0100".to_string(),
        };

        let response = server
            .post("/api/v1/profile/adverts")
            .authorization_bearer(token)
            .json(&request)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        body.data["id"].as_i64().unwrap() as i32
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_register_activate_login_flow() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        // Register
        let response = server
            .post("/api/v1/auth/register")
            .json(&serde_json::json!({
                "username": "newcomer",
                "email": "newcomer@example.com",
                "password": "a-long-password",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert!(body.success);
        assert_eq!(body.data["user"]["username"], "newcomer");
        assert_eq!(body.data["user"]["is_activated"], false);
        let token = body.data["activation_token"].as_str().unwrap().to_string();

        // Login before activation is rejected
        let response = server
            .post("/api/v1/auth/login")
            .json(&serde_json::json!({
                "username": "newcomer",
                "password": "a-long-password",
            }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        // Activate
        let response = server.get(&format!("/api/v1/auth/activate/{token}")).await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.message, "Account activated successfully");
        assert_eq!(body.data["is_activated"], true);

        // Re-using the consumed token is informational, not an error
        let response = server.get(&format!("/api/v1/auth/activate/{token}")).await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.message, "Account was already activated");

        // Login now works
        let response = server
            .post("/api/v1/auth/login")
            .json(&serde_json::json!({
                "username": "newcomer",
                "password": "a-long-password",
            }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert!(body.data["token"].as_str().unwrap().len() > 16);
    }

    #[tokio::test]
    async fn test_activation_token_tampering_is_rejected() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/auth/register")
            .json(&serde_json::json!({
                "username": "tamperee",
                "email": "tamperee@example.com",
                "password": "a-long-password",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        let token = body.data["activation_token"].as_str().unwrap();

        // Flip a character of the encoded payload
        let tampered = format!("x{}", &token[1..]);
        let response = server
            .get(&format!("/api/v1/auth/activate/{tampered}"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: serde_json::Value = response.json();
        assert_eq!(error["code"], "INVALID_TOKEN");

        // Something that is not even token-shaped
        let response = server
            .get("/api/v1/auth/activate/not-a-token-at-all")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let request = serde_json::json!({
            "username": "doppelganger",
            "email": "first@example.com",
            "password": "a-long-password",
        });

        let response = server.post("/api/v1/auth/register").json(&request).await;
        response.assert_status(StatusCode::CREATED);

        let response = server.post("/api/v1/auth/register").json(&request).await;
        response.assert_status(StatusCode::CONFLICT);
        let error: serde_json::Value = response.json();
        assert_eq!(error["code"], "USERNAME_TAKEN");
    }

    #[tokio::test]
    async fn test_register_validation() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        // Password too short
        let response = server
            .post("/api/v1/auth/register")
            .json(&serde_json::json!({
                "username": "shorty",
                "email": "shorty@example.com",
                "password": "short",
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: serde_json::Value = response.json();
        assert_eq!(error["code"], "VALIDATION_ERROR");

        // Broken email
        let response = server
            .post("/api/v1/auth/register")
            .json(&serde_json::json!({
                "username": "mailless",
                "email": "not-an-email",
                "password": "a-long-password",
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register_and_login(&server, "cautious").await;

        let response = server
            .post("/api/v1/auth/login")
            .json(&serde_json::json!({
                "username": "cautious",
                "password": "not the password",
            }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let error: serde_json::Value = response.json();
        assert_eq!(error["code"], "AUTH_FAILED");

        // Unknown usernames get the same generic rejection
        let response = server
            .post("/api/v1/auth/login")
            .json(&serde_json::json!({
                "username": "nobody",
                "password": "whatever12345",
            }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let error: serde_json::Value = response.json();
        assert_eq!(error["code"], "AUTH_FAILED");
    }

    #[tokio::test]
    async fn test_profile_read_and_update() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state)).unwrap();

        let token = register_and_login(&server, "settler").await;

        let response = server.get("/api/v1/profile").await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let response = server
            .get("/api/v1/profile")
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["username"], "settler");
        assert_eq!(body.data["send_messages"], true);

        let response = server
            .put("/api/v1/profile")
            .authorization_bearer(&token)
            .json(&serde_json::json!({
                "email": "settler@new.example.com",
                "send_messages": false,
            }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["email"], "settler@new.example.com");
        assert_eq!(body.data["send_messages"], false);
    }

    #[tokio::test]
    async fn test_list_rubrics_tree() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        seed_sub_rubric(&state.db, "Electronics", "Phones").await;
        seed_sub_rubric(&state.db, "Household", "Lamps").await;

        let response = server.get("/api/v1/rubrics").await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<serde_json::Value>> = response.json();
        assert_eq!(body.data.len(), 2);

        let electronics = body
            .data
            .iter()
            .find(|r| r["name"] == "Electronics")
            .unwrap();
        let children = electronics["children"].as_array().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0]["name"], "Phones");
    }

    #[tokio::test]
    async fn test_rubric_adverts_unknown_rubric() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let sub_id = seed_sub_rubric(&state.db, "Household", "Lamps").await;

        // Unknown id
        let response = server.get("/api/v1/rubrics/9999/adverts").await;
        response.assert_status(StatusCode::NOT_FOUND);

        // A super-rubric id is not a listing target either
        let super_id = sub_id - 1;
        let response = server
            .get(&format!("/api/v1/rubrics/{super_id}/adverts"))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_and_pagination() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let phones = seed_sub_rubric(&state.db, "Electronics", "Phones").await;
        let token = register_and_login(&server, "lampseller").await;

        // Five matches for "lamp" in the lamps rubric, one non-match, and one
        // match in another rubric
        create_advert_via_api(&server, &token, lamps, "Desk LAMP", "metal, black").await;
        create_advert_via_api(&server, &token, lamps, "Floor lamp", "tall").await;
        create_advert_via_api(&server, &token, lamps, "Table lamp", "small").await;
        create_advert_via_api(&server, &token, lamps, "Reading light", "vintage lamp shade").await;
        let newest =
            create_advert_via_api(&server, &token, lamps, "Lampshade", "fabric, beige").await;
        create_advert_via_api(&server, &token, lamps, "Teapot", "ceramic").await;
        create_advert_via_api(&server, &token, phones, "Lamp-shaped phone", "novelty").await;

        // Page 1: newest first, page size 2
        let response = server
            .get(&format!("/api/v1/rubrics/{lamps}/adverts?keyword=lamp"))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["total_items"], 5);
        assert_eq!(body.data["total_pages"], 3);
        assert_eq!(body.data["page"], 1);
        let items = body.data["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"].as_i64().unwrap() as i32, newest);

        // Page 2 has two, page 3 has one
        let response = server
            .get(&format!(
                "/api/v1/rubrics/{lamps}/adverts?keyword=lamp&page=2"
            ))
            .await;
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["items"].as_array().unwrap().len(), 2);

        let response = server
            .get(&format!(
                "/api/v1/rubrics/{lamps}/adverts?keyword=lamp&page=3"
            ))
            .await;
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["items"].as_array().unwrap().len(), 1);

        // Out-of-range pages clamp to the last page
        let response = server
            .get(&format!(
                "/api/v1/rubrics/{lamps}/adverts?keyword=lamp&page=99"
            ))
            .await;
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["page"], 3);
        assert_eq!(body.data["items"].as_array().unwrap().len(), 1);

        // Without a keyword the whole rubric shows up
        let response = server
            .get(&format!("/api/v1/rubrics/{lamps}/adverts"))
            .await;
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["total_items"], 6);
    }

    #[tokio::test]
    async fn test_inactive_adverts_are_hidden_from_listings() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let token = register_and_login(&server, "seller").await;

        let visible = create_advert_via_api(&server, &token, lamps, "Visible", "shown").await;
        let hidden = create_advert_via_api(&server, &token, lamps, "Hidden", "gone").await;

        let response = server
            .put(&format!("/api/v1/profile/adverts/{hidden}"))
            .authorization_bearer(&token)
            .json(&UpdateAdvertRequest {
                rubric_id: None,
                title: None,
                content: None,
                price: None,
                contacts: None,
                is_active: Some(false),
            })
            .await;
        response.assert_status(StatusCode::OK);

        let response = server
            .get(&format!("/api/v1/rubrics/{lamps}/adverts"))
            .await;
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["total_items"], 1);
        assert_eq!(
            body.data["items"][0]["id"].as_i64().unwrap() as i32,
            visible
        );

        // The index listing skips it too
        let response = server.get("/api/v1/adverts").await;
        let body: ApiResponse<Vec<serde_json::Value>> = response.json();
        assert_eq!(body.data.len(), 1);

        // The owner still sees both
        let response = server
            .get("/api/v1/profile/adverts")
            .authorization_bearer(&token)
            .await;
        let body: ApiResponse<Vec<serde_json::Value>> = response.json();
        assert_eq!(body.data.len(), 2);
    }

    #[tokio::test]
    async fn test_create_advert_validation() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let token = register_and_login(&server, "strict").await;

        let valid = |title: &str| CreateAdvertRequest {
            rubric_id: lamps,
            title: title.to_string(),
            content: "fine".to_string(),
            price: Decimal::new(100, 0),
            contacts: "ok".to_string(),
        };

        // Empty title
        let response = server
            .post("/api/v1/profile/adverts")
            .authorization_bearer(&token)
            .json(&valid(""))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // Title longer than 40 characters
        let response = server
            .post("/api/v1/profile/adverts")
            .authorization_bearer(&token)
            .json(&valid(&"x".repeat(41)))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // Negative price
        let mut request = valid("Fine title");
        request.price = Decimal::new(-1, 0);
        let response = server
            .post("/api/v1/profile/adverts")
            .authorization_bearer(&token)
            .json(&request)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: serde_json::Value = response.json();
        assert_eq!(error["code"], "VALIDATION_ERROR");

        // A super-rubric is not a valid filing target
        let mut request = valid("Fine title");
        request.rubric_id = lamps - 1;
        let response = server
            .post("/api/v1/profile/adverts")
            .authorization_bearer(&token)
            .json(&request)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: serde_json::Value = response.json();
        assert_eq!(error["code"], "INVALID_RUBRIC");

        // Price of zero is allowed ("free to a good home")
        let mut request = valid("Free stuff");
        request.price = Decimal::ZERO;
        let response = server
            .post("/api/v1/profile/adverts")
            .authorization_bearer(&token)
            .json(&request)
            .await;
        response.assert_status(StatusCode::CREATED);

        // Anonymous creation is rejected
        let response = server
            .post("/api/v1/profile/adverts")
            .json(&valid("No session"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_guest_comment_stores_literal_author() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let token = register_and_login(&server, "seller").await;
        let advert_id =
            create_advert_via_api(&server, &token, lamps, "Desk lamp", "metal").await;

        let response = server
            .post(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .json(&DetailActionRequest::CommentSubmit {
                author: Some("Random Passerby".to_string()),
                content: "Is it still available?".to_string(),
            })
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.message, "Comment added");
        let comments = body.data["comments"].as_array().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0]["author"], "Random Passerby");
    }

    #[tokio::test]
    async fn test_authenticated_comment_author_is_forced_to_username() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let seller_token = register_and_login(&server, "seller").await;
        let buyer_token = register_and_login(&server, "buyer").await;
        let advert_id =
            create_advert_via_api(&server, &seller_token, lamps, "Desk lamp", "metal").await;

        let response = server
            .post(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .authorization_bearer(&buyer_token)
            .json(&DetailActionRequest::CommentSubmit {
                author: Some("Spoofed Name".to_string()),
                content: "Tempting.".to_string(),
            })
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        let comments = body.data["comments"].as_array().unwrap();
        assert_eq!(comments[0]["author"], "buyer");

        // And in the store itself
        let stored = comment::Entity::find().all(&state.db).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].author, "buyer");
    }

    #[tokio::test]
    async fn test_comment_validation() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let token = register_and_login(&server, "seller").await;
        let advert_id =
            create_advert_via_api(&server, &token, lamps, "Desk lamp", "metal").await;

        // Empty content
        let response = server
            .post(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .json(&DetailActionRequest::CommentSubmit {
                author: Some("Guest".to_string()),
                content: "   ".to_string(),
            })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // Guest without an author name
        let response = server
            .post(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .json(&DetailActionRequest::CommentSubmit {
                author: None,
                content: "hello".to_string(),
            })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // Guest with an overly long author name
        let response = server
            .post(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .json(&DetailActionRequest::CommentSubmit {
                author: Some("x".repeat(31)),
                content: "hello".to_string(),
            })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // Unknown advert
        let response = server
            .post(&format!("/api/v1/rubrics/{lamps}/adverts/9999"))
            .json(&DetailActionRequest::CommentSubmit {
                author: Some("Guest".to_string()),
                content: "hello".to_string(),
            })
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_comments_are_listed_oldest_first() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let token = register_and_login(&server, "seller").await;
        let advert_id =
            create_advert_via_api(&server, &token, lamps, "Desk lamp", "metal").await;

        for text in ["first", "second", "third"] {
            let response = server
                .post(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
                .json(&DetailActionRequest::CommentSubmit {
                    author: Some("Guest".to_string()),
                    content: text.to_string(),
                })
                .await;
            response.assert_status(StatusCode::CREATED);
        }

        let response = server
            .get(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        let contents: Vec<&str> = body.data["comments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_rating_requires_authentication() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let token = register_and_login(&server, "seller").await;
        let advert_id =
            create_advert_via_api(&server, &token, lamps, "Desk lamp", "metal").await;

        let response = server
            .post(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .json(&DetailActionRequest::RatingSubmit { score: 5 })
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let error: serde_json::Value = response.json();
        assert_eq!(error["code"], "AUTH_FAILED");
    }

    #[tokio::test]
    async fn test_rating_upsert_via_api() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let seller_token = register_and_login(&server, "seller").await;
        let voter_token = register_and_login(&server, "voter").await;
        let advert_id =
            create_advert_via_api(&server, &seller_token, lamps, "Desk lamp", "metal").await;

        // First vote creates
        let response = server
            .post(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .authorization_bearer(&voter_token)
            .json(&DetailActionRequest::RatingSubmit { score: 3 })
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.message, "Your rating has been saved");
        assert_eq!(body.data["my_rating"], 3);
        assert_eq!(body.data["average_rating"], 3.0);

        // Re-vote updates in place
        let response = server
            .post(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .authorization_bearer(&voter_token)
            .json(&DetailActionRequest::RatingSubmit { score: 5 })
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.message, "Your rating has been updated");
        assert_eq!(body.data["my_rating"], 5);
        assert_eq!(body.data["rating_count"], 1);

        // Exactly one row, holding the last score
        let rows = rating::Entity::find().all(&state.db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, 5);
    }

    #[tokio::test]
    async fn test_rating_score_bounds() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let token = register_and_login(&server, "voter").await;
        let advert_id =
            create_advert_via_api(&server, &token, lamps, "Desk lamp", "metal").await;

        for score in [0, 6, -1] {
            let response = server
                .post(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
                .authorization_bearer(&token)
                .json(&DetailActionRequest::RatingSubmit { score })
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
        }

        assert_eq!(rating::Entity::find().count(&state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_average_rating_in_detail() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let seller_token = register_and_login(&server, "seller").await;
        let voter1 = register_and_login(&server, "voter1").await;
        let voter2 = register_and_login(&server, "voter2").await;
        let advert_id =
            create_advert_via_api(&server, &seller_token, lamps, "Desk lamp", "metal").await;

        // No votes yet
        let response = server
            .get(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .await;
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["average_rating"], 0.0);
        assert_eq!(body.data["my_rating"], serde_json::Value::Null);

        for (token, score) in [(&voter1, 3), (&voter2, 5)] {
            let response = server
                .post(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
                .authorization_bearer(token)
                .json(&DetailActionRequest::RatingSubmit { score })
                .await;
            response.assert_status(StatusCode::CREATED);
        }

        let response = server
            .get(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .authorization_bearer(&voter1)
            .await;
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["average_rating"], 4.0);
        assert_eq!(body.data["rating_count"], 2);
        assert_eq!(body.data["my_rating"], 3);
    }

    #[tokio::test]
    async fn test_advert_update_and_ownership() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let owner_token = register_and_login(&server, "owner").await;
        let intruder_token = register_and_login(&server, "intruder").await;
        let advert_id =
            create_advert_via_api(&server, &owner_token, lamps, "Desk lamp", "metal").await;

        let update = UpdateAdvertRequest {
            rubric_id: None,
            title: Some("Brass desk lamp".to_string()),
            content: None,
            price: Some(Decimal::new(12550, 2)),
            contacts: None,
            is_active: None,
        };

        // Someone else's advert reads as missing
        let response = server
            .put(&format!("/api/v1/profile/adverts/{advert_id}"))
            .authorization_bearer(&intruder_token)
            .json(&update)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let response = server
            .delete(&format!("/api/v1/profile/adverts/{advert_id}"))
            .authorization_bearer(&intruder_token)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let response = server
            .get(&format!("/api/v1/profile/adverts/{advert_id}"))
            .authorization_bearer(&intruder_token)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        // The owner can update
        let response = server
            .put(&format!("/api/v1/profile/adverts/{advert_id}"))
            .authorization_bearer(&owner_token)
            .json(&update)
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["title"], "Brass desk lamp");
        assert_eq!(body.data["price"], "125.50");
    }

    #[tokio::test]
    async fn test_delete_advert_removes_dependents() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let owner_token = register_and_login(&server, "owner").await;
        let voter_token = register_and_login(&server, "voter").await;
        let advert_id =
            create_advert_via_api(&server, &owner_token, lamps, "Desk lamp", "metal").await;

        // Attach images, a comment and a rating
        for n in 0..2 {
            let form = MultipartForm::new().add_part(
                "image",
                Part::bytes(format!("image bytes {n}").into_bytes())
                    .file_name("extra.jpg")
                    .mime_type("image/jpeg"),
            );
            let response = server
                .post(&format!("/api/v1/profile/adverts/{advert_id}/images"))
                .authorization_bearer(&owner_token)
                .multipart(form)
                .await;
            response.assert_status(StatusCode::CREATED);
        }
        server
            .post(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .json(&DetailActionRequest::CommentSubmit {
                author: Some("Guest".to_string()),
                content: "nice".to_string(),
            })
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .authorization_bearer(&voter_token)
            .json(&DetailActionRequest::RatingSubmit { score: 4 })
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .delete(&format!("/api/v1/profile/adverts/{advert_id}"))
            .authorization_bearer(&owner_token)
            .await;
        response.assert_status(StatusCode::OK);

        assert_eq!(advert::Entity::find().count(&state.db).await.unwrap(), 0);
        assert_eq!(
            advert_image::Entity::find().count(&state.db).await.unwrap(),
            0
        );
        assert_eq!(comment::Entity::find().count(&state.db).await.unwrap(), 0);
        assert_eq!(rating::Entity::find().count(&state.db).await.unwrap(), 0);

        let response = server
            .get(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_profile_cascades_everything() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let seller_token = register_and_login(&server, "leaving").await;
        let other_token = register_and_login(&server, "staying").await;

        let first =
            create_advert_via_api(&server, &seller_token, lamps, "Desk lamp", "metal").await;
        create_advert_via_api(&server, &seller_token, lamps, "Floor lamp", "tall").await;
        let keeper =
            create_advert_via_api(&server, &other_token, lamps, "Their lamp", "kept").await;

        // Other people interact with the leaving seller's advert
        server
            .post(&format!("/api/v1/rubrics/{lamps}/adverts/{first}"))
            .json(&DetailActionRequest::CommentSubmit {
                author: Some("Guest".to_string()),
                content: "hello".to_string(),
            })
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post(&format!("/api/v1/rubrics/{lamps}/adverts/{first}"))
            .authorization_bearer(&other_token)
            .json(&DetailActionRequest::RatingSubmit { score: 4 })
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .delete("/api/v1/profile")
            .authorization_bearer(&seller_token)
            .await;
        response.assert_status(StatusCode::OK);

        // No residue of the deleted user's adverts
        let remaining = advert::Entity::find().all(&state.db).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keeper);
        assert_eq!(comment::Entity::find().count(&state.db).await.unwrap(), 0);
        assert_eq!(rating::Entity::find().count(&state.db).await.unwrap(), 0);
        assert_eq!(user::Entity::find().count(&state.db).await.unwrap(), 1);

        // The deleted user's session token no longer works
        let response = server
            .get("/api/v1/profile")
            .authorization_bearer(&seller_token)
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_primary_image_upload_and_replace() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let token = register_and_login(&server, "photographer").await;
        let advert_id =
            create_advert_via_api(&server, &token, lamps, "Desk lamp", "metal").await;

        // Upload
        let form = MultipartForm::new().add_part(
            "image",
            Part::bytes(b"first image".to_vec())
                .file_name("photo one.jpg")
                .mime_type("image/jpeg"),
        );
        let response = server
            .put(&format!("/api/v1/profile/adverts/{advert_id}/image"))
            .authorization_bearer(&token)
            .multipart(form)
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        let first_path = body.data["image"].as_str().unwrap().to_string();
        assert!(first_path.ends_with("_photo_one.jpg"));
        assert!(state.media.root().join(&first_path).exists());

        // Replace; the old file goes away
        let form = MultipartForm::new().add_part(
            "image",
            Part::bytes(b"second image".to_vec())
                .file_name("photo2.jpg")
                .mime_type("image/jpeg"),
        );
        let response = server
            .put(&format!("/api/v1/profile/adverts/{advert_id}/image"))
            .authorization_bearer(&token)
            .multipart(form)
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        let second_path = body.data["image"].as_str().unwrap().to_string();
        assert_ne!(second_path, first_path);
        assert!(state.media.root().join(&second_path).exists());
        assert!(!state.media.root().join(&first_path).exists());

        // Missing file part
        let form = MultipartForm::new().add_text("note", "no file here");
        let response = server
            .put(&format!("/api/v1/profile/adverts/{advert_id}/image"))
            .authorization_bearer(&token)
            .multipart(form)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: serde_json::Value = response.json();
        assert_eq!(error["code"], "MISSING_FILE");
    }

    #[tokio::test]
    async fn test_additional_images_lifecycle() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let token = register_and_login(&server, "photographer").await;
        let advert_id =
            create_advert_via_api(&server, &token, lamps, "Desk lamp", "metal").await;

        let form = MultipartForm::new().add_part(
            "image",
            Part::bytes(b"extra image".to_vec())
                .file_name("side-view.png")
                .mime_type("image/png"),
        );
        let response = server
            .post(&format!("/api/v1/profile/adverts/{advert_id}/images"))
            .authorization_bearer(&token)
            .multipart(form)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        let image_id = body.data["id"].as_i64().unwrap() as i32;
        let image_path = body.data["image"].as_str().unwrap().to_string();
        assert!(state.media.root().join(&image_path).exists());

        // Shows up in the detail view
        let response = server
            .get(&format!("/api/v1/rubrics/{lamps}/adverts/{advert_id}"))
            .await;
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["images"].as_array().unwrap().len(), 1);

        // Delete removes the row and the file
        let response = server
            .delete(&format!(
                "/api/v1/profile/adverts/{advert_id}/images/{image_id}"
            ))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);
        assert!(!state.media.root().join(&image_path).exists());
        assert_eq!(
            advert_image::Entity::find().count(&state.db).await.unwrap(),
            0
        );

        // Deleting it again is a 404
        let response = server
            .delete(&format!(
                "/api/v1/profile/adverts/{advert_id}/images/{image_id}"
            ))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_advert_detail_404() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;

        let response = server
            .get(&format!("/api/v1/rubrics/{lamps}/adverts/424242"))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let error: serde_json::Value = response.json();
        assert_eq!(error["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_index_lists_newest_first_up_to_ten() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let lamps = seed_sub_rubric(&state.db, "Household", "Lamps").await;
        let token = register_and_login(&server, "prolific").await;

        let mut last_id = 0;
        for n in 0..12 {
            last_id = create_advert_via_api(
                &server,
                &token,
                lamps,
                &format!("Advert {n}"),
                "contents",
            )
            .await;
        }

        let response = server.get("/api/v1/adverts").await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<serde_json::Value>> = response.json();
        assert_eq!(body.data.len(), 10);
        assert_eq!(body.data[0]["id"].as_i64().unwrap() as i32, last_id);
    }

    #[tokio::test]
    async fn test_swagger_ui_is_mounted() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api-docs/openapi.json").await;
        response.assert_status(StatusCode::OK);
        let doc: serde_json::Value = response.json();
        assert!(doc["paths"]["/api/v1/rubrics/{rubric_id}/adverts"].is_object());
    }
}
