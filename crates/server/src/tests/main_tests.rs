use super::*;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, time::timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tower::ServiceExt;

const LOCAL_TOKEN: &str = "local-secret";

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

fn test_state() -> AppState {
    let (hub, _task) = spawn_hub(HubConfig {
        local_token: LOCAL_TOKEN.to_string(),
        lock_timeout: Duration::from_secs(1800),
    });
    AppState::new(hub, LOCAL_TOKEN)
}

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = build_router(test_state());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("ws://{addr}/sock")
}

async fn connect(url: &str) -> Client {
    let (mut client, _) = connect_async(url).await.expect("connect");
    let initial = next_json(&mut client).await;
    assert_eq!(initial["ctx"], "ventchange");
    client
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("frame in time")
            .expect("socket open")
            .expect("frame");
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(&text).expect("json frame");
        }
    }
}

async fn send_json(client: &mut Client, value: Value) {
    client
        .send(WsMessage::Text(value.to_string()))
        .await
        .expect("send frame");
}

fn ventchange(damper1: &str, damper2: &str, damper3: &str, fan: &str) -> Value {
    json!({
        "ctx": "ventchange",
        "data": { "Damper1": damper1, "Damper2": damper2, "Damper3": damper3, "Fan": fan }
    })
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = build_router(test_state());
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn sock_without_upgrade_is_rejected() {
    let app = build_router(test_state());
    let request = Request::get("/sock").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn new_client_receives_current_state() {
    let url = spawn_server().await;
    let (mut client, _) = connect_async(url.as_str()).await.expect("connect");

    let initial = next_json(&mut client).await;

    assert_eq!(
        initial,
        json!({
            "ctx": "ventchange",
            "data": {
                "Damper1": "closed",
                "Damper2": "closed",
                "Damper3": "closed",
                "Fan": "off",
                "OLGALock": false,
                "LaserLock": false
            }
        })
    );
}

#[tokio::test]
async fn accepted_change_reaches_every_client() {
    let url = spawn_server().await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;

    send_json(&mut alice, ventchange("open", "halfopen", "closed", "on")).await;

    for client in [&mut alice, &mut bob] {
        let update = next_json(client).await;
        assert_eq!(update["ctx"], "ventchange");
        assert_eq!(update["data"]["Damper1"], "open");
        assert_eq!(update["data"]["Damper2"], "halfopen");
        assert_eq!(update["data"]["Fan"], "on");
    }
}

#[tokio::test]
async fn rejection_is_sent_only_to_requester() {
    let url = spawn_server().await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;

    send_json(&mut alice, ventchange("closed", "closed", "closed", "on")).await;

    let state = next_json(&mut alice).await;
    assert_eq!(state["ctx"], "ventchange");
    assert_eq!(state["data"]["Fan"], "off");
    let error = next_json(&mut alice).await;
    assert_eq!(
        error,
        json!({
            "ctx": "error",
            "data": { "type": "prohibited", "msg": "Won't start Fan with dampers closed!" }
        })
    );

    send_json(&mut bob, ventchange("halfopen", "closed", "closed", "off")).await;
    let update = next_json(&mut bob).await;
    assert_eq!(update["ctx"], "ventchange");
    assert_eq!(update["data"]["Damper1"], "halfopen");
}

#[tokio::test]
async fn lock_needs_local_token_in_payload() {
    let url = spawn_server().await;
    let mut client = connect(&url).await;

    send_json(
        &mut client,
        json!({ "ctx": "locklaser", "data": { "LaserLock": true, "authtoken": "" } }),
    )
    .await;
    next_json(&mut client).await;
    let error = next_json(&mut client).await;
    assert_eq!(error["data"]["msg"], "Lock can only be changed with LaserCard");

    send_json(
        &mut client,
        json!({ "ctx": "lockolga", "data": { "OLGALock": true, "authtoken": LOCAL_TOKEN } }),
    )
    .await;
    let update = next_json(&mut client).await;
    assert_eq!(update["ctx"], "ventchange");
    assert_eq!(update["data"]["OLGALock"], true);
    assert_eq!(update["data"]["LaserLock"], false);
}

#[tokio::test]
async fn olga_lock_binds_remote_sockets_but_not_the_local_one() {
    let url = spawn_server().await;
    let mut local = connect(&format!("{url}?authtoken={LOCAL_TOKEN}")).await;
    let mut remote = connect(&url).await;

    send_json(&mut local, ventchange("closed", "open", "closed", "on")).await;
    next_json(&mut local).await;
    next_json(&mut remote).await;
    send_json(
        &mut local,
        json!({ "ctx": "lockolga", "data": { "OLGALock": true, "authtoken": LOCAL_TOKEN } }),
    )
    .await;
    next_json(&mut local).await;
    next_json(&mut remote).await;

    send_json(&mut remote, ventchange("closed", "open", "closed", "off")).await;
    next_json(&mut remote).await;
    let error = next_json(&mut remote).await;
    assert_eq!(
        error["data"],
        json!({ "type": "notauth", "msg": "Can't stop fan while OLGA locked it" })
    );

    send_json(&mut local, ventchange("closed", "open", "closed", "off")).await;
    let update = next_json(&mut local).await;
    assert_eq!(update["ctx"], "ventchange");
    assert_eq!(update["data"]["Fan"], "off");
    assert_eq!(update["data"]["OLGALock"], true);
}

#[tokio::test]
async fn malformed_frames_are_ignored() {
    let url = spawn_server().await;
    let mut client = connect(&url).await;

    client
        .send(WsMessage::Text("definitely not json".to_string()))
        .await
        .expect("send");
    send_json(&mut client, json!({ "ctx": "lightpreset", "data": {} })).await;
    send_json(&mut client, json!({ "ctx": "lockolga", "data": "nope" })).await;
    send_json(&mut client, ventchange("halfopen", "closed", "closed", "off")).await;

    let update = next_json(&mut client).await;
    assert_eq!(update["ctx"], "ventchange");
    assert_eq!(update["data"]["Damper1"], "halfopen");
}

#[tokio::test]
async fn oversized_frame_closes_the_socket() {
    let url = spawn_server().await;
    let mut client = connect(&url).await;

    let padding = "x".repeat(MAX_MESSAGE_SIZE * 2);
    let _ = client
        .send(WsMessage::Text(
            json!({ "ctx": "ventchange", "data": { "pad": padding } }).to_string(),
        ))
        .await;

    let closed = timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await {
                None | Some(Err(_)) | Some(Ok(WsMessage::Close(_))) => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "server kept the oversized connection open");
}

#[test]
fn decode_request_skips_server_only_contexts() {
    assert!(decode_request(r#"{"ctx":"error","data":{"msg":"x"}}"#).is_none());
    assert!(matches!(
        decode_request(r#"{"ctx":"ventchange","data":{"Fan":"on"}}"#),
        Some(ClientRequest::VentChange(_))
    ));
}
