use heatline::engine::{Frame, ShadowStackEngine, StackRecorder};
use heatline::profiler::Profiler;
use heatline::server::{ControlServer, ControlState, ServerHandle};
use pretty_assertions::assert_eq;
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;

fn spawn_server() -> (ServerHandle, StackRecorder) {
    let recorder = StackRecorder::new();
    let mut profiler = Profiler::new(ShadowStackEngine::new(recorder.clone()));
    profiler.set_sampling_interval(500).unwrap();

    let server = ControlServer::bind("127.0.0.1:0", ControlState::new(profiler, "heatline")).unwrap();
    (server.spawn().unwrap(), recorder)
}

fn url(handle: &ServerHandle, path: &str) -> String {
    format!("http://{}{}", handle.local_addr(), path)
}

fn get(client: &Client, url: &str) -> (u16, Value) {
    let response = client.get(url).send().unwrap();
    (response.status().as_u16(), response.json().unwrap())
}

fn post(client: &Client, url: &str) -> (u16, Value) {
    let response = client.post(url).send().unwrap();
    (response.status().as_u16(), response.json().unwrap())
}

#[test]
fn test_control_session_over_http() {
    let (handle, recorder) = spawn_server();
    let client = Client::new();

    assert_eq!(get(&client, &url(&handle, "/info")), (200, json!({ "running": false })));

    let _busy = recorder.enter(Frame::new("busy", "server.js", 4, 2));
    recorder.set_line(5);

    assert_eq!(post(&client, &url(&handle, "/start")), (200, json!({ "ok": true })));
    assert_eq!(
        post(&client, &url(&handle, "/start")),
        (400, json!({ "error": "already running" }))
    );
    assert_eq!(get(&client, &url(&handle, "/info")), (200, json!({ "running": true })));

    std::thread::sleep(Duration::from_millis(30));

    let (status, tree) = post(&client, &url(&handle, "/stop"));
    assert_eq!(status, 200);
    assert_eq!(tree["name"], "(root)");
    assert_eq!(tree["children"][0]["name"], "busy");
    assert_eq!(tree["children"][0]["resourceName"], "server.js");
    assert!(tree["children"][0]["hits"].as_u64().unwrap() >= 1);
    assert_eq!(tree["children"][0]["hitLines"][0]["line"], 5);

    assert_eq!(get(&client, &url(&handle, "/info")), (200, json!({ "running": false })));
    handle.shutdown().unwrap();
}

#[test]
fn test_control_errors_over_http() {
    let (handle, _recorder) = spawn_server();
    let client = Client::new();

    assert_eq!(
        post(&client, &url(&handle, "/stop")),
        (400, json!({ "error": "not running" }))
    );
    assert_eq!(
        get(&client, &url(&handle, "/stop")),
        (400, json!({ "error": "wrong method" }))
    );

    let response = client.delete(url(&handle, "/info")).send().unwrap();
    assert_eq!(response.status().as_u16(), 400);

    assert_eq!(
        post(&client, &url(&handle, "/nowhere")),
        (404, json!({ "error": "wrong path" }))
    );
}

#[test]
fn test_responses_are_json() {
    let (handle, _recorder) = spawn_server();
    let response = Client::new().get(url(&handle, "/info")).send().unwrap();

    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("application/json"));
}
