mod common;

use axum::http::{Method, StatusCode};
use common::{moon, planet, send, send_with, started};
use schema_server::ServerSettings;
use serde_json::{json, Value};

async fn query(router: &axum::Router, query: &str) -> Value {
    let (status, _, body) = send(router, Method::POST, "/graphql", Some(json!({ "query": query }))).await;
    assert_eq!(status, StatusCode::OK);
    body
}

fn solar_system(planets: usize, moons_each: usize) -> Vec<schema_server::Record> {
    let mut records = Vec::new();
    for p in 0..planets {
        let planet_id = format!("p{}", p);
        records.push(planet(&planet_id, &format!("Planet {}", p), "gas"));
        for m in 0..moons_each {
            records.push(moon(&format!("m{}-{}", p, m), &format!("Moon {}-{}", p, m), &planet_id));
        }
    }
    records
}

#[tokio::test]
async fn nested_relationships_are_batched() {
    let (server, source) = started(ServerSettings::default(), solar_system(6, 3)).await;
    source.reset();

    let body = query(&server.router(), "{ planets { name moons { name planet { name } } } }").await;
    assert!(body.get("errors").is_none(), "{}", body);
    let planets = body["data"]["planets"].as_array().unwrap();
    assert_eq!(planets.len(), 6);
    for p in planets {
        let moons = p["moons"].as_array().unwrap();
        assert_eq!(moons.len(), 3);
        for m in moons {
            assert_eq!(m["planet"]["name"], p["name"]);
        }
    }
    // one query for the planets, one batch per relationship level
    assert!(source.query_calls() <= 3, "{} source calls", source.query_calls());
}

#[tokio::test]
async fn loader_cache_is_per_request() {
    let (server, source) = started(ServerSettings::default(), solar_system(2, 1)).await;
    let router = server.router();
    query(&router, "{ planets { moons { name } } }").await;
    let first = source.query_calls();
    query(&router, "{ planets { moons { name } } }").await;
    assert_eq!(source.query_calls(), first * 2);
}

#[tokio::test]
async fn where_and_order_by() {
    let (server, _) = started(
        ServerSettings::default(),
        vec![
            planet("p1", "Jupiter", "gas"),
            planet("p2", "Saturn", "gas"),
            planet("p3", "Earth", "terrestrial"),
            planet("p4", "Neptune", "ice"),
        ],
    )
    .await;
    let router = server.router();

    let body = query(&router, r#"{ planets(where: {classification: "gas"}, orderBy: name_DESC) { name } }"#).await;
    assert_eq!(body["data"]["planets"], json!([{"name": "Saturn"}, {"name": "Jupiter"}]));

    let body = query(
        &router,
        r#"{ planets(where: {classification_not_in: ["gas"]}, orderBy: [classification_ASC]) { id } }"#,
    )
    .await;
    assert_eq!(body["data"]["planets"], json!([{"id": "p4"}, {"id": "p3"}]));

    let body = query(&router, r#"{ planets(where: {name_not: "Earth", classification_in: ["ice", "terrestrial"]}) { name } }"#).await;
    assert_eq!(body["data"]["planets"], json!([{"name": "Neptune"}]));
}

#[tokio::test]
async fn singular_lookup() {
    let (server, _) = started(ServerSettings::default(), vec![planet("earth", "Earth", "terrestrial"), moon("luna", "Luna", "earth")]).await;
    let router = server.router();

    let body = query(&router, r#"{ moon(id: "luna") { name planet { id name } } }"#).await;
    assert_eq!(body["data"]["moon"], json!({"name": "Luna", "planet": {"id": "earth", "name": "Earth"}}));

    let body = query(&router, r#"{ planet(id: "vulcan") { name } }"#).await;
    assert!(body.get("errors").is_none());
    assert_eq!(body["data"]["planet"], Value::Null);
}

#[tokio::test]
async fn invalid_queries_report_graphql_errors() {
    let (server, _) = started(ServerSettings::default(), vec![]).await;
    let router = server.router();

    let body = query(&router, "{ planets { color } }").await;
    assert!(body["errors"].as_array().is_some_and(|e| !e.is_empty()));

    let body = query(&router, r#"{ planets(orderBy: color_ASC) { name } }"#).await;
    assert!(body["errors"].as_array().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn headers_reach_the_source() {
    let (server, source) = started(ServerSettings::default(), vec![planet("earth", "Earth", "terrestrial")]).await;
    let (status, _, _) = send_with(
        &server.router(),
        Method::POST,
        "/graphql",
        Some(json!({"query": "{ planets { name } }"})),
        &[("authorization", "Bearer gql")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let options = source.last_options.lock().unwrap().clone().unwrap();
    assert_eq!(options.headers["authorization"], "Bearer gql");
}

#[tokio::test]
async fn disabled_endpoint_is_not_mounted() {
    let settings = ServerSettings {
        graphql: false,
        ..ServerSettings::default()
    };
    let (server, _) = started(settings, vec![]).await;
    let (status, _, _) = send(&server.router(), Method::POST, "/graphql", Some(json!({"query": "{ planets { name } }"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_requests_and_batches() {
    let (server, source) = started(ServerSettings::default(), solar_system(2, 1)).await;
    let router = server.router();

    let (status, _, body) = send(&router, Method::GET, "/graphql?query=%7B%20planets%20%7B%20name%20%7D%20%7D", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["planets"], json!([{"name": "Planet 0"}, {"name": "Planet 1"}]));

    source.reset();
    let (status, _, body) = send(
        &router,
        Method::POST,
        "/graphql",
        Some(json!([
            {"query": "{ planets { moons { name } } }"},
            {"query": r#"{ planet(id: "p1") { name } }"#}
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let responses = body.as_array().unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["data"]["planets"][1]["moons"], json!([{"name": "Moon 1-0"}]));
    assert_eq!(responses[1]["data"]["planet"], json!({"name": "Planet 1"}));
    // planets + one moons batch, then the singular lookup
    assert_eq!(source.query_calls(), 3);
}
