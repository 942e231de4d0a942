use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::property::property_router;
use crate::workflows::testing::read_json_body;

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("encode")))
        .expect("request")
}

#[tokio::test]
async fn add_apartment_then_list_vacancies() {
    let harness = harness();
    let router = property_router(Arc::clone(&harness.directory));
    let building_id = harness.building.id.to_string();

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/buildings/{building_id}/apartments"),
            json!({ "unit_number": "B201", "floor": 2, "monthly_rent": 1100 }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/buildings/{building_id}/vacancies"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let units: Vec<&str> = body["apartments"]
        .as_array()
        .expect("apartments")
        .iter()
        .filter_map(|apartment| apartment["unit_number"].as_str())
        .collect();
    assert_eq!(units, vec!["A101", "B201"]);
}

#[tokio::test]
async fn vendor_import_accepts_raw_csv() {
    let harness = harness();
    let router = property_router(Arc::clone(&harness.directory));

    let response = router
        .clone()
        .oneshot(
            Request::post("/api/v1/vendor-imports")
                .header(header::CONTENT_TYPE, "text/csv")
                .body(Body::from(
                    "name,category\nRapid Rooter,plumbing\nGlass Co,glazing\n",
                ))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["imported"].as_array().expect("imported").len(), 1);
    assert_eq!(body["rejected"][0]["line"], 3);

    let response = router
        .oneshot(
            Request::get("/api/v1/vendors?category=plumbing")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let body = read_json_body(response).await;
    assert_eq!(body["vendors"][0]["name"], "Rapid Rooter");
}

#[tokio::test]
async fn invalid_building_is_unprocessable() {
    let harness = harness();
    let router = property_router(Arc::clone(&harness.directory));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/buildings",
            json!({ "name": "", "address": "1 Elm", "city": "Ames", "total_units": 4 }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn end_tenancy_over_http() {
    let harness = harness();
    let tenant = occupy(&harness, "usr-dana");
    let router = property_router(Arc::clone(&harness.directory));

    let response = router
        .oneshot(
            Request::post(format!("/api/v1/tenants/{}/end", tenant.id))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["is_active"], false);
}
