mod common;

use axum::http::{Method, StatusCode};
use common::{moon, planet, send, started};
use schema_server::ServerSettings;
use serde_json::json;

#[tokio::test]
async fn batch_is_all_or_nothing() {
    let (server, source) = started(ServerSettings::default(), vec![planet("earth", "Earth", "terrestrial")]).await;
    let before = source.inner.snapshot();

    let (status, _, body) = send(
        &server.router(),
        Method::PATCH,
        "/operations",
        Some(json!({"operations": [
            {"op": "add", "ref": {"type": "planets"}, "data": {"type": "planets", "id": "mars", "attributes": {"name": "Mars"}}},
            {"op": "update", "ref": {"type": "planets", "id": "earth"}, "data": {"type": "planets", "attributes": {"name": "Terra"}}},
            {"op": "update", "ref": {"type": "planets", "id": "vulcan"}, "data": {"type": "planets", "attributes": {"name": "Vulcan"}}},
            {"op": "add", "ref": {"type": "moons"}, "data": {"type": "moons", "id": "phobos", "attributes": {"name": "Phobos"}}},
            {"op": "remove", "ref": {"type": "planets", "id": "earth"}}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["errors"][0]["title"].as_str().unwrap().contains("vulcan"));
    assert_eq!(source.inner.snapshot(), before);
}

#[tokio::test]
async fn batch_results_follow_request_order() {
    let (server, _) = started(ServerSettings::default(), vec![planet("earth", "Earth", "terrestrial")]).await;
    let router = server.router();

    let (status, _, body) = send(
        &router,
        Method::PATCH,
        "/operations",
        Some(json!({"operations": [
            {"op": "add", "ref": {"type": "planets"}, "data": {"type": "planets", "attributes": {"name": "Mars"}}},
            {"op": "update", "ref": {"type": "planets", "id": "earth"}, "data": {"type": "planets", "attributes": {"mass": 6}}},
            {"op": "remove", "ref": {"type": "planets", "id": "earth"}}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["operations"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    let mars_id = results[0]["data"]["id"].as_str().unwrap();
    assert!(!mars_id.is_empty());
    assert_eq!(results[0]["data"]["attributes"]["name"], "Mars");
    assert_eq!(results[1]["data"]["attributes"]["mass"], 6);
    assert_eq!(results[2]["data"], json!({"type": "planets", "id": "earth"}));

    let (status, _, _) = send(&router, Method::GET, &format!("/planets/{}", mars_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&router, Method::GET, "/planets/earth", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn later_records_can_be_referenced_earlier() {
    let (server, _) = started(ServerSettings::default(), vec![]).await;
    let router = server.router();

    let (status, _, _) = send(
        &router,
        Method::PATCH,
        "/operations",
        Some(json!({"operations": [
            {"op": "add", "ref": {"type": "moons"}, "data": {
                "type": "moons", "id": "deimos", "attributes": {"name": "Deimos"},
                "relationships": {"planet": {"data": {"type": "planets", "id": "mars"}}}
            }},
            {"op": "add", "ref": {"type": "planets"}, "data": {"type": "planets", "id": "mars", "attributes": {"name": "Mars"}}}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, mars) = send(&router, Method::GET, "/planets/mars", None).await;
    assert_eq!(mars["data"]["relationships"]["moons"]["data"], json!([{"type": "moons", "id": "deimos"}]));
}

#[tokio::test]
async fn relationship_operations() {
    let (server, _) = started(
        ServerSettings::default(),
        vec![planet("mars", "Mars", "terrestrial"), moon("phobos", "Phobos", "mars")],
    )
    .await;
    let router = server.router();

    let (status, _, body) = send(
        &router,
        Method::PATCH,
        "/operations",
        Some(json!({"operations": [
            {"op": "add", "ref": {"type": "moons"}, "data": {"type": "moons", "id": "deimos", "attributes": {"name": "Deimos"}}},
            {"op": "add", "ref": {"type": "planets", "id": "mars", "relationship": "moons"}, "data": {"type": "moons", "id": "deimos"}},
            {"op": "remove", "ref": {"type": "planets", "id": "mars", "relationship": "moons"}, "data": [{"type": "moons", "id": "phobos"}]}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["operations"][2]["data"]["relationships"]["moons"]["data"],
        json!([{"type": "moons", "id": "deimos"}])
    );

    // hasOne relationships are replaced with update, never added to
    let (status, _, _) = send(
        &router,
        Method::PATCH,
        "/operations",
        Some(json!({"operations": [
            {"op": "add", "ref": {"type": "moons", "id": "phobos", "relationship": "planet"}, "data": {"type": "planets", "id": "mars"}}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_batches_are_rejected_before_submission() {
    let (server, source) = started(ServerSettings::default(), vec![]).await;
    let router = server.router();

    for body in [
        json!({"operations": [{"op": "upsert", "ref": {"type": "planets"}}]}),
        json!({"operations": [{"op": "add", "ref": {"type": "asteroids"}, "data": {"type": "asteroids"}}]}),
        json!({"operations": [{"op": "remove", "ref": {"type": "planets"}}]}),
        json!({"ops": []}),
    ] {
        let (status, _, _) = send(&router, Method::PATCH, "/operations", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    }
    assert_eq!(source.updates.load(std::sync::atomic::Ordering::SeqCst), 0);
}
