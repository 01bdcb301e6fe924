//! End-to-end ingestion and query tests over a real listener.

use serde_json::{Value, json};
use std::time::Duration;
use tracker_hub::relay::RelayConfig;
use tracker_hub::store::DeviceStore;
use tracker_hub::{AppState, Db};

async fn make_server() -> std::net::SocketAddr {
    // No command tests here; the relay points at a blackhole.
    let relay = RelayConfig {
        addr: "127.0.0.1:9".to_owned(),
        connect_timeout: Duration::from_millis(200),
        response_timeout: Duration::from_millis(200),
        max_response_bytes: 1024,
    };
    let state = AppState::new(DeviceStore::new(Db::open_in_memory().unwrap()), relay);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, tracker_hub::build_router(state))
            .await
            .unwrap();
    });
    addr
}

fn report(device_id: &str, lat: f64, lon: f64, cell_prefix: &str) -> Value {
    let neighbor_cells: Vec<Value> = (0..6)
        .map(|i| {
            json!({
                "cell_id": format!("{cell_prefix}{i}"),
                "mcc": "724", "mnc": "10", "lac": "55F0",
                "rx_lvl": format!("{}", 20 + i), "tm_adv": "0"
            })
        })
        .collect();
    json!({
        "device_id": device_id,
        "sw_version": "1.0.2",
        "model": "ST410",
        "cell_id": "1A2B", "mcc": "724", "mnc": "10",
        "rx_lvl": "23", "lac": "55F0", "tm_adv": "2",
        "backup_voltage": 3.91,
        "online_status": true,
        "message_number": 17,
        "mode": "1",
        "col_net_rf_ch": "45",
        "gps_date": "2026-03-14",
        "gps_time": "09:26:53",
        "latitude": lat, "longitude": lon,
        "speed": 12.5, "course": 181.0,
        "satt": 9, "gps_fix": true,
        "temperature": 31.5,
        "neighbor_cells": neighbor_cells
    })
}

#[tokio::test]
async fn accepted_report_shows_up_in_latest_data() {
    let addr = make_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/receive_data"))
        .json(&report("DEV1", -23.5505, -46.6333, "N"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"status": "success"}));

    let resp = reqwest::get(format!("http://{addr}/latest_data"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let rows: Value = resp.json().await.unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["device_id"], "DEV1");
    assert_eq!(rows[0]["latitude"], -23.5505);
    assert_eq!(rows[0]["gps_date"], "2026-03-14");
    assert_eq!(rows[0]["gps_time"], "09:26:53");
    assert_eq!(rows[0]["gps_fix"], true);
    assert_eq!(rows[0]["mode"], "1");
}

#[tokio::test]
async fn reingesting_a_device_updates_in_place_without_duplicating() {
    let addr = make_server().await;
    let client = reqwest::Client::new();

    for (lat, lon, prefix) in [(-23.5505, -46.6333, "N"), (-22.9068, -43.1729, "M")] {
        let resp = client
            .post(format!("http://{addr}/receive_data"))
            .json(&report("DEV1", lat, lon, prefix))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let rows: Value = reqwest::get(format!("http://{addr}/latest_data"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["latitude"], -22.9068);
    assert_eq!(rows[0]["longitude"], -43.1729);
}

#[tokio::test]
async fn wrong_neighbor_count_is_rejected_without_state_change() {
    let addr = make_server().await;
    let client = reqwest::Client::new();

    let mut bad = report("DEV1", -23.5505, -46.6333, "N");
    bad["neighbor_cells"].as_array_mut().unwrap().pop();

    let resp = client
        .post(format!("http://{addr}/receive_data"))
        .json(&bad)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "exactly 6 neighbor cells are required");

    // Nothing was stored.
    let resp = reqwest::get(format!("http://{addr}/latest_data"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn structurally_incomplete_report_is_rejected() {
    let addr = make_server().await;
    let client = reqwest::Client::new();

    let mut bad = report("DEV1", -23.5505, -46.6333, "N");
    bad.as_object_mut().unwrap().remove("backup_voltage");

    let resp = client
        .post(format!("http://{addr}/receive_data"))
        .json(&bad)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn latest_data_on_empty_store_is_404() {
    let addr = make_server().await;
    let resp = reqwest::get(format!("http://{addr}/latest_data"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "no device data available");
}

#[tokio::test]
async fn snapshot_lists_devices_in_id_order() {
    let addr = make_server().await;
    let client = reqwest::Client::new();

    for id in ["DEV3", "DEV1", "DEV2"] {
        client
            .post(format!("http://{addr}/receive_data"))
            .json(&report(id, 0.0, 0.0, "N"))
            .send()
            .await
            .unwrap();
    }

    let rows: Value = reqwest::get(format!("http://{addr}/latest_data"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["device_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["DEV1", "DEV2", "DEV3"]);
}

#[tokio::test]
async fn concurrent_reports_for_one_device_converge_to_one_of_them() {
    let addr = make_server().await;
    let client = reqwest::Client::new();

    let a = report("DEV1", 10.0, 10.0, "A");
    let b = report("DEV1", 20.0, 20.0, "B");

    let mut tasks = Vec::new();
    for _ in 0..10 {
        for payload in [a.clone(), b.clone()] {
            let client = client.clone();
            tasks.push(tokio::spawn(async move {
                client
                    .post(format!("http://{addr}/receive_data"))
                    .json(&payload)
                    .send()
                    .await
                    .unwrap()
                    .status()
            }));
        }
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), 200);
    }

    let rows: Value = reqwest::get(format!("http://{addr}/latest_data"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    let lat = rows[0]["latitude"].as_f64().unwrap();
    let lon = rows[0]["longitude"].as_f64().unwrap();
    assert!(
        (lat == 10.0 && lon == 10.0) || (lat == 20.0 && lon == 20.0),
        "snapshot mixes two reports: lat={lat} lon={lon}"
    );
}

#[tokio::test]
async fn sse_subscriber_receives_new_data_events() {
    let addr = make_server().await;
    let client = reqwest::Client::new();

    let mut events = client
        .get(format!("http://{addr}/events"))
        .send()
        .await
        .unwrap();

    // First frame is the connected hello.
    let hello = tokio::time::timeout(Duration::from_secs(5), events.chunk())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(String::from_utf8_lossy(&hello).contains("event: connected"));

    client
        .post(format!("http://{addr}/receive_data"))
        .json(&report("DEV1", -23.5505, -46.6333, "N"))
        .send()
        .await
        .unwrap();

    let mut seen = String::new();
    while !seen.contains("event: new_data") {
        let chunk = tokio::time::timeout(Duration::from_secs(5), events.chunk())
            .await
            .expect("timed out waiting for new_data")
            .unwrap()
            .expect("stream ended before new_data");
        seen.push_str(&String::from_utf8_lossy(&chunk));
    }
    assert!(seen.contains("\"device_id\":\"DEV1\""));
}
