mod common;

use common::{connected_client, node, overpass_body, OVERPASS_PATH};
use osmgeo_lib::tools::{geocode_address, GeocodeRequest};
use osmgeo_lib::{BoundingBox, Coordinate, Error, RecordingReporter, TagFilter, TileStyle};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn geocode_sends_user_agent_and_adds_coordinates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Brandenburg Gate"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "5"))
        .and(header("user-agent", "OSM-MCP-Server/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "52.5163", "lon": "13.3777", "display_name": "Brandenburger Tor"},
            {"lat": "52.5200", "lon": "13.4050", "display_name": "Berlin"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = connected_client(&server).await;
    let reporter = RecordingReporter::new();
    let places = geocode_address(
        &client,
        GeocodeRequest {
            address: "Brandenburg Gate".into(),
        },
        &reporter,
    )
    .await
    .expect("geocode");

    assert_eq!(places.len(), 2);
    assert_eq!(places[0].display_name(), Some("Brandenburger Tor"));
    assert_eq!(
        places[0].0["coordinates"],
        json!({"latitude": 52.5163, "longitude": 13.3777})
    );
    assert_eq!(places[0].0["lat"], "52.5163");
}

#[tokio::test]
async fn reverse_geocode_error_body_is_no_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "Unable to geocode"})))
        .mount(&server)
        .await;

    let client = connected_client(&server).await;
    let err = client
        .reverse_geocode(Coordinate::new(0.0, -30.0).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoResult { .. }), "got {:?}", err);
}

#[tokio::test]
async fn non_success_status_is_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(OVERPASS_PATH))
        .respond_with(ResponseTemplate::new(504).set_body_string("Gateway Timeout"))
        .mount(&server)
        .await;

    let client = connected_client(&server).await;
    let bbox = BoundingBox::new(52.0, 13.0, 53.0, 14.0).unwrap();
    let err = client
        .search_features(&bbox, &[TagFilter::any("amenity")])
        .await
        .unwrap_err();

    match err {
        Error::Upstream {
            service,
            status,
            message,
        } => {
            assert_eq!(service, "overpass");
            assert_eq!(status, Some(504));
            assert!(message.contains("Gateway Timeout"));
        }
        other => panic!("expected upstream failure, got {:?}", other),
    }
}

#[tokio::test]
async fn tag_query_is_posted_as_program_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(OVERPASS_PATH))
        .and(body_string_contains("[out:json][timeout:25];"))
        .and(body_string_contains("node[\"amenity\"=\"cafe\"](52,13,53,14);"))
        .and(body_string_contains("out center;"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overpass_body(vec![node(
            1,
            52.5,
            13.5,
            json!({"amenity": "cafe"}),
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let client = connected_client(&server).await;
    let bbox = BoundingBox::new(52.0, 13.0, 53.0, 14.0).unwrap();
    let values = vec!["cafe".to_string()];
    let features = client
        .search_features_by_tag(&bbox, "amenity", Some(&values))
        .await
        .expect("search");
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].tags["amenity"], "cafe");
}

#[tokio::test]
async fn tiles_pass_bytes_through() {
    let server = MockServer::start().await;
    let png = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a];
    Mock::given(method("GET"))
        .and(path("/12/2200/1343.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png.clone(), "image/png"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/outdoors/3/4/5.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
        .mount(&server)
        .await;

    let client = connected_client(&server).await;
    let tile = client
        .fetch_tile(TileStyle::Standard, 12, 2200, 1343)
        .await
        .expect("standard tile");
    assert_eq!(tile.bytes, png);
    assert_eq!(tile.mime_type, "image/png");

    let outdoor = client
        .fetch_tile(TileStyle::from_name("outdoor"), 3, 4, 5)
        .await
        .expect("outdoor tile");
    assert_eq!(outdoor.bytes, vec![1, 2, 3]);
    assert_eq!(outdoor.mime_type, "image/png");
}
