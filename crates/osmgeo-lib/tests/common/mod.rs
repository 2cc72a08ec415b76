#![allow(dead_code)]

use osmgeo_lib::{OsmClient, OsmConfig};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the tag-query endpoint is mounted on by `OsmConfig::with_base_url`.
pub const OVERPASS_PATH: &str = "/api/interpreter";

/// Connected client whose every upstream points at `server`.
pub async fn connected_client(server: &MockServer) -> OsmClient {
    let client = OsmClient::new(OsmConfig::default().with_base_url(&server.uri()));
    client.connect().await.expect("connect client");
    client
}

pub fn node(id: i64, lat: f64, lon: f64, tags: Value) -> Value {
    json!({"type": "node", "id": id, "lat": lat, "lon": lon, "tags": tags})
}

pub fn way(id: i64, lat: f64, lon: f64, tags: Value) -> Value {
    json!({"type": "way", "id": id, "center": {"lat": lat, "lon": lon}, "tags": tags})
}

pub fn overpass_body(elements: Vec<Value>) -> Value {
    json!({"version": 0.6, "elements": elements})
}

pub fn route_body(distance: f64, duration: f64) -> Value {
    json!({
        "code": "Ok",
        "routes": [{
            "distance": distance,
            "duration": duration,
            "geometry": {"type": "LineString", "coordinates": [[13.40, 52.52], [13.41, 52.53]]},
            "legs": [{
                "steps": [
                    {
                        "distance": distance,
                        "duration": duration,
                        "name": "Unter den Linden",
                        "maneuver": {"type": "depart", "modifier": "left"}
                    },
                    {
                        "distance": 0.0,
                        "duration": 0.0,
                        "name": "",
                        "maneuver": {"type": "arrive", "instruction": "You have arrived"}
                    }
                ]
            }]
        }],
        "waypoints": [{"name": "start"}, {"name": "end"}]
    })
}

pub fn reverse_body(display_name: &str) -> Value {
    json!({"place_id": 1, "lat": "52.52", "lon": "13.40", "display_name": display_name})
}

/// Reverse geocoding answers `display_name` for any coordinate.
pub async fn mount_reverse(server: &MockServer, display_name: &str) {
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reverse_body(display_name)))
        .mount(server)
        .await;
}

/// Every tag query returns `elements`.
pub async fn mount_overpass(server: &MockServer, elements: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path(OVERPASS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(overpass_body(elements)))
        .mount(server)
        .await;
}
