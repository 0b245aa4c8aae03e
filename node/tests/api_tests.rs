use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::tempdir;
use tickledger_kernel::encoding;
use tickledger_kernel::keys::{Keypair, Signer};
use tickledger_node::config::NodeConfig;
use tickledger_node::context::{NodeContext, SharedContext};
use tickledger_node::generator::PohGenerator;
use tickledger_node::server::build_router;
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;

fn open_ctx(dir: &Path) -> SharedContext {
    let cfg = NodeConfig {
        db_path: dir.join("db.jsonl"),
        checkpoint_stride: 50,
        bootstrap_peers: vec![],
        ..Default::default()
    };
    NodeContext::open(cfg, Keypair::generate()).unwrap()
}

async fn call(ctx: &SharedContext, req: Request<Body>) -> (StatusCode, Value) {
    let resp = build_router(ctx.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(dir.path());
    let (status, body) = call(&ctx, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "OK"}));
}

#[tokio::test]
async fn test_push_then_pending() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(dir.path());
    let sender = Keypair::generate();
    let data = b"direct submission";
    let sig = sender.sign(data);

    let (status, body) = call(
        &ctx,
        post_json(
            "/push",
            json!({
                "data": encoding::encode(data),
                "sender": encoding::encode(&sender.public_key()),
                "signature": encoding::encode(&sig),
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["position"], 0);
    assert_eq!(body["entry"]["data"], encoding::encode(data));

    let (status, body) = call(&ctx, get("/pending")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unclaimed"], 1);
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_push_rejects_bad_signature_and_empty_data() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(dir.path());
    let sender = Keypair::generate();

    let (status, body) = call(
        &ctx,
        post_json(
            "/push",
            json!({
                "data": encoding::encode(b"one"),
                "sender": encoding::encode(&sender.public_key()),
                "signature": encoding::encode(&sender.sign(b"two")),
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("signature"));

    let (status, _) = call(&ctx, post_json("/push", json!({"data": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(ctx.pending.is_empty());
}

#[tokio::test]
async fn test_chain_and_self_verify() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(dir.path());
    let mut gen = PohGenerator::initialize(ctx.clone()).unwrap();
    ctx.pending.push(tickledger_kernel::pending::PendingEntry::new(b"x".to_vec(), vec![], vec![], vec![]));
    gen.run(1000, &CancellationToken::new());

    let (status, body) = call(&ctx, get("/chain")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["public_key"], encoding::encode(&ctx.public_key()));
    // origin + one data entry + 20 checkpoints
    assert_eq!(body["entries"].as_array().unwrap().len(), 22);

    let (_, recent) = call(&ctx, get("/chain/recent")).await;
    assert_eq!(recent["count"], 22);
    assert_eq!(recent["entries"].as_array().unwrap().len(), 11);
    assert_eq!(recent["entries"][0]["seq"], 0);

    let (status, report) = call(&ctx, get("/verify")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["valid"], true);
    assert_eq!(report["segments"], 21);
    assert_eq!(report["failures"], json!([]));
}

#[tokio::test]
async fn test_status_registers_caller_and_reports_empty_store() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(dir.path());

    let (status, body) = call(&ctx, get("/p2p/status?rpc_host=10.1.2.3&rpc_port=4000")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["hash"].is_null());
    assert!(body["seqid"].is_null());

    // The caller is a candidate only; it is not handed out until it answers us.
    assert!(body["peers"].as_array().unwrap().is_empty());
    let caller = ctx.peers.get("10.1.2.3:4000").unwrap();
    assert!(caller.last_seen.is_none());
    assert!(!caller.is_confirmed());

    ctx.peers.observe("10.1.2.3", 4000);
    let (_, body) = call(&ctx, get("/p2p/status")).await;
    let peers = body["peers"].as_array().unwrap();
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0]["host"], "10.1.2.3");
    assert_eq!(peers[0]["port"], 4000);
}

#[tokio::test]
async fn test_status_callers_do_not_grow_registry_past_capacity() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(dir.path());
    let cap = ctx.config.max_peers;

    for i in 0..cap + 10 {
        let uri = format!("/p2p/status?rpc_host=10.9.{}.{}&rpc_port=4000", i / 250, i % 250);
        let (status, _) = call(&ctx, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(ctx.peers.len(), cap);
}

#[tokio::test]
async fn test_store_verify_on_empty_store() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(dir.path());
    let (status, body) = call(&ctx, get("/store/verify")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["checked"], 0);
}

#[tokio::test]
async fn test_sync_with_bad_hash_is_rejected() {
    let dir = tempdir().unwrap();
    let ctx = open_ctx(dir.path());
    let resp = build_router(ctx).oneshot(get("/p2p/sync?from=notbase64")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
