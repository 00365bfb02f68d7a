//! Route table.
//!
//! `/status` is open; everything under `/v1` sits behind the host-token
//! gate.

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, containers, images, manager, networks, node, volumes};
use crate::middleware::require_host_token;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/v1/authentication-status", get(handlers::authentication_status))
        .route("/v1/managers/claims", post(manager::claim))
        .route("/v1/nodes/specs", get(node::specs))
        // containers
        .route("/v1/containers", get(containers::list).post(containers::create))
        .route(
            "/v1/containers/{id}",
            get(containers::inspect).delete(containers::remove),
        )
        .route("/v1/containers/{id}/start", post(containers::start))
        .route("/v1/containers/{id}/stop", post(containers::stop))
        .route("/v1/containers/{id}/restart", post(containers::restart))
        .route("/v1/containers/{id}/pause", post(containers::pause))
        .route("/v1/containers/{id}/unpause", post(containers::unpause))
        .route("/v1/containers/{id}/logs", get(containers::logs))
        .route("/v1/containers/{id}/exec", post(containers::exec))
        // networks
        .route("/v1/networks", get(networks::list).post(networks::create))
        .route("/v1/networks/prune", post(networks::prune))
        .route(
            "/v1/networks/{id}",
            get(networks::inspect).delete(networks::remove),
        )
        .route("/v1/networks/{id}/connect", post(networks::connect))
        .route("/v1/networks/{id}/disconnect", post(networks::disconnect))
        // volumes
        .route("/v1/volumes", get(volumes::list).post(volumes::create))
        .route("/v1/volumes/prune", post(volumes::prune))
        .route(
            "/v1/volumes/{name}",
            get(volumes::inspect).delete(volumes::remove),
        )
        // images
        .route("/v1/images", get(images::list).post(images::create))
        .route("/v1/images/pull", post(images::pull))
        .route("/v1/images/prune", post(images::prune))
        .route("/v1/images/{id}", get(images::inspect).delete(images::remove))
        .route("/v1/images/{id}/tag", post(images::tag))
        .route("/v1/images/{id}/history", get(images::history))
        .route_layer(from_fn_with_state(state.clone(), require_host_token));

    Router::new()
        .route("/status", get(handlers::status))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use bollard::models::{ContainerSummary, Volume, VolumeListResponse};
    use cconnector_core::machine::{CpuInfo, Usage};
    use cconnector_core::{
        CredentialRecord, CredentialStore, MachineDescriptor, MachineSpecs, MachineSpecsError,
    };
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::engine::{EngineError, ExecOutcome, MockContainerEngine};

    const HOST_TOKEN: &str = "h0st-t0ken";

    struct FixedSpecs;

    impl MachineSpecs for FixedSpecs {
        fn snapshot(&self) -> Result<MachineDescriptor, MachineSpecsError> {
            Ok(MachineDescriptor {
                ram: Usage::from_bytes(0, 0, 0),
                cpu: CpuInfo {
                    cores: 4,
                    model: "Test CPU".to_string(),
                    percentages: vec!["1.00%".to_string()],
                },
                host_name: "node-1".to_string(),
                ..MachineDescriptor::default()
            })
        }
    }

    struct BrokenSpecs;

    impl MachineSpecs for BrokenSpecs {
        fn snapshot(&self) -> Result<MachineDescriptor, MachineSpecsError> {
            Err(MachineSpecsError::NoDisk)
        }
    }

    struct Fixture {
        _dir: TempDir,
        store: Arc<CredentialStore>,
    }

    impl Fixture {
        fn new(host: &str, manager: &str) -> Self {
            let dir = TempDir::new().expect("tempdir");
            let store = CredentialStore::new(dir.path().join("config.yaml"));
            store.initialize().expect("initialize");
            store
                .replace(&CredentialRecord {
                    host_token: host.to_string(),
                    manager_token: manager.to_string(),
                })
                .expect("seed");
            Self {
                _dir: dir,
                store: Arc::new(store),
            }
        }

        fn app(&self, engine: MockContainerEngine) -> Router {
            self.app_with(engine, Arc::new(FixedSpecs))
        }

        fn app_with(&self, engine: MockContainerEngine, machine: Arc<dyn MachineSpecs>) -> Router {
            router(AppState::new(
                Arc::clone(&self.store),
                Arc::new(engine),
                machine,
            ))
        }
    }

    fn authed(method: &str, uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {HOST_TOKEN}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .expect("request")
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    async fn read_text(response: axum::response::Response) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    // ── gate ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn status_is_open() {
        let fixture = Fixture::new("", "");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(Request::get("/status").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_text(response).await, "OK");
    }

    #[tokio::test]
    async fn authentication_status_accepts_matching_token() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(authed("GET", "/v1/authentication-status", Body::empty()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(
                Request::get("/v1/authentication-status")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(read_json(response).await["message"], "Unauthorized");
    }

    #[tokio::test]
    async fn wrong_token_is_unauthorized() {
        let fixture = Fixture::new("other", "");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(authed("GET", "/v1/authentication-status", Body::empty()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_host_token_rejects_everyone() {
        let fixture = Fixture::new("", "");
        let request = Request::get("/v1/authentication-status")
            .header(header::AUTHORIZATION, "Bearer ")
            .body(Body::empty())
            .expect("request");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(request)
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rotated_token_takes_effect_without_restart() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let app = fixture.app(MockContainerEngine::new());

        fixture
            .store
            .replace(&CredentialRecord {
                host_token: "rotated".to_string(),
                manager_token: String::new(),
            })
            .expect("rotate");

        let response = app
            .oneshot(authed("GET", "/v1/authentication-status", Body::empty()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unreadable_record_is_internal_error() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        std::fs::remove_file(fixture.store.path()).expect("remove record");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(authed("GET", "/v1/authentication-status", Body::empty()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await["message"], "Internal server error");
    }

    // ── claim ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn claim_unclaimed_host_returns_machine_specs() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(authed(
                "POST",
                "/v1/managers/claims",
                Body::from(r#"{"manager_token":"mgr-1"}"#),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["message"], "OK");
        assert_eq!(body["machine_specs"]["cpu"]["cores"], 4);
        assert_eq!(body["machine_specs"]["host_name"], "node-1");

        let record = fixture.store.read().expect("read");
        assert_eq!(record.manager_token, "mgr-1");
        assert_eq!(record.host_token, HOST_TOKEN);
    }

    #[tokio::test]
    async fn claim_claimed_host_is_unprocessable() {
        let fixture = Fixture::new(HOST_TOKEN, "mgr-1");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(authed(
                "POST",
                "/v1/managers/claims",
                Body::from(r#"{"manager_token":"mgr-2"}"#),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            read_json(response).await["message"],
            "Entity cannot be processed because of: `manager token already claimed`"
        );
        assert_eq!(fixture.store.read().expect("read").manager_token, "mgr-1");
    }

    #[tokio::test]
    async fn claim_with_malformed_body_is_bad_request() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(authed("POST", "/v1/managers/claims", Body::from("{oops")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await["message"],
            "Request has invalid format: `body contains invalid json format`"
        );
        assert_eq!(fixture.store.read().expect("read").manager_token, "");
    }

    #[tokio::test]
    async fn claim_with_empty_manager_token_is_bad_request() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(authed(
                "POST",
                "/v1/managers/claims",
                Body::from(r#"{"manager_token":""}"#),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn claim_requires_host_token() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let request = Request::post("/v1/managers/claims")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"manager_token":"mgr-1"}"#))
            .expect("request");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(request)
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(fixture.store.read().expect("read").manager_token, "");
    }

    #[tokio::test]
    async fn claim_without_content_type_is_decoded() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let request = Request::post("/v1/managers/claims")
            .header(header::AUTHORIZATION, format!("Bearer {HOST_TOKEN}"))
            .body(Body::from(r#"{"manager_token":"mgr-1"}"#))
            .expect("request");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(request)
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fixture.store.read().expect("read").manager_token, "mgr-1");
    }

    #[tokio::test]
    async fn claim_sent_as_form_content_type_is_decoded() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let request = Request::post("/v1/managers/claims")
            .header(header::AUTHORIZATION, format!("Bearer {HOST_TOKEN}"))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(r#"{"manager_token":"mgr-1"}"#))
            .expect("request");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(request)
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fixture.store.read().expect("read").manager_token, "mgr-1");
    }

    #[tokio::test]
    async fn claim_stays_committed_when_specs_fail() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let response = fixture
            .app_with(MockContainerEngine::new(), Arc::new(BrokenSpecs))
            .oneshot(authed(
                "POST",
                "/v1/managers/claims",
                Body::from(r#"{"manager_token":"mgr-1"}"#),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fixture.store.read().expect("read").manager_token, "mgr-1");
    }

    #[tokio::test]
    async fn node_specs_returns_descriptor() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(authed("GET", "/v1/nodes/specs", Body::empty()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["machine_specs"]["cpu"]["model"], "Test CPU");
        assert_eq!(body["machine_specs"]["storage"]["inode"]["used"], "0");
    }

    // ── engine routes ───────────────────────────────────────────────

    #[tokio::test]
    async fn list_containers_passes_all_flag() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let mut engine = MockContainerEngine::new();
        engine
            .expect_list_containers()
            .withf(|all| *all)
            .returning(|_| {
                Ok(vec![ContainerSummary {
                    id: Some("c1".to_string()),
                    ..ContainerSummary::default()
                }])
            });

        let response = fixture
            .app(engine)
            .oneshot(authed("GET", "/v1/containers?all=true", Body::empty()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await[0]["Id"], "c1");
    }

    #[tokio::test]
    async fn non_literal_true_flag_is_off() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let mut engine = MockContainerEngine::new();
        engine
            .expect_list_containers()
            .withf(|all| !*all)
            .returning(|_| Ok(Vec::new()));

        let response = fixture
            .app(engine)
            .oneshot(authed("GET", "/v1/containers?all=1", Body::empty()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn engine_routes_require_host_token() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let mut engine = MockContainerEngine::new();
        engine.expect_list_containers().never();
        let response = fixture
            .app(engine)
            .oneshot(Request::get("/v1/containers").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_container_is_unprocessable() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let mut engine = MockContainerEngine::new();
        engine
            .expect_stop_container()
            .withf(|id, timeout| id == "ghost" && timeout.as_secs() == 10)
            .returning(|_, _| Err(EngineError::NotFound("No such container: ghost".to_string())));

        let response = fixture
            .app(engine)
            .oneshot(authed("POST", "/v1/containers/ghost/stop", Body::empty()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            read_json(response).await["message"],
            "Entity cannot be processed because of: `No such container: ghost`"
        );
    }

    #[tokio::test]
    async fn remove_container_forwards_query_flags() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let mut engine = MockContainerEngine::new();
        engine
            .expect_remove_container()
            .withf(|id, opts| id == "c1" && opts.force && opts.remove_volumes && !opts.remove_links)
            .returning(|_, _| Ok(()));

        let response = fixture
            .app(engine)
            .oneshot(authed(
                "DELETE",
                "/v1/containers/c1?force=true&remove_volumes=true",
                Body::empty(),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["id"], "c1");
        assert_eq!(body["message"], "Container removed successfully");
    }

    #[tokio::test]
    async fn create_container_without_image_is_bad_request() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let mut engine = MockContainerEngine::new();
        engine.expect_create_container().never();
        let response = fixture
            .app(engine)
            .oneshot(authed(
                "POST",
                "/v1/containers",
                Body::from(r#"{"name":"web","image_source":""}"#),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn exec_with_empty_cmd_is_bad_request() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let response = fixture
            .app(MockContainerEngine::new())
            .oneshot(authed(
                "POST",
                "/v1/containers/c1/exec",
                Body::from(r#"{"cmd":[]}"#),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn detached_exec_returns_exec_id() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let mut engine = MockContainerEngine::new();
        engine
            .expect_exec()
            .withf(|id, request| id == "c1" && request.detach)
            .returning(|_, _| {
                Ok(ExecOutcome::Detached {
                    exec_id: "e1".to_string(),
                })
            });

        let response = fixture
            .app(engine)
            .oneshot(authed(
                "POST",
                "/v1/containers/c1/exec",
                Body::from(r#"{"cmd":["true"],"detach":true}"#),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["message"], "Command executed in detached mode");
        assert_eq!(body["exec_id"], "e1");
    }

    #[tokio::test]
    async fn logs_stream_engine_output() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let mut engine = MockContainerEngine::new();
        engine
            .expect_container_logs()
            .withf(|id, query| id == "c1" && query.tail.as_deref() == Some("5"))
            .returning(|_, _| {
                let chunks = vec![
                    Ok(bytes::Bytes::from_static(b"line one\n")),
                    Ok(bytes::Bytes::from_static(b"line two\n")),
                ];
                Ok(Box::pin(futures::stream::iter(chunks)))
            });

        let response = fixture
            .app(engine)
            .oneshot(authed("GET", "/v1/containers/c1/logs?tail=5", Body::empty()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_text(response).await, "line one\nline two\n");
    }

    #[tokio::test]
    async fn network_list_ignores_malformed_filters() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let mut engine = MockContainerEngine::new();
        engine
            .expect_list_networks()
            .withf(|filters| filters.is_empty())
            .returning(|_| Ok(Vec::new()));

        let response = fixture
            .app(engine)
            .oneshot(authed("GET", "/v1/networks?filters=%7Bbroken", Body::empty()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn volume_list_wraps_data() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let mut engine = MockContainerEngine::new();
        engine.expect_list_volumes().returning(|| {
            Ok(VolumeListResponse {
                volumes: Some(vec![Volume {
                    name: "data".to_string(),
                    ..Volume::default()
                }]),
                warnings: None,
            })
        });

        let response = fixture
            .app(engine)
            .oneshot(authed("GET", "/v1/volumes", Body::empty()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["data"][0]["Name"], "data");
    }

    #[tokio::test]
    async fn image_pull_requires_reference() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let mut engine = MockContainerEngine::new();
        engine.expect_pull_image().never();
        let response = fixture
            .app(engine)
            .oneshot(authed(
                "POST",
                "/v1/images/pull",
                Body::from(r#"{"reference":""}"#),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn image_create_joins_source_and_tag() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let mut engine = MockContainerEngine::new();
        engine
            .expect_pull_image()
            .withf(|request| request.reference == "nginx:1.27")
            .returning(|_| {
                Ok(Box::pin(futures::stream::iter(vec![Ok(
                    bytes::Bytes::from_static(b"{\"status\":\"Downloaded\"}\n"),
                )])))
            });

        let response = fixture
            .app(engine)
            .oneshot(authed(
                "POST",
                "/v1/images",
                Body::from(r#"{"source":"nginx","tag":"1.27"}"#),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/x-ndjson"
        );
        assert!(read_text(response).await.contains("Downloaded"));
    }

    #[tokio::test]
    async fn engine_failure_is_internal_error() {
        let fixture = Fixture::new(HOST_TOKEN, "");
        let mut engine = MockContainerEngine::new();
        engine.expect_image_history().returning(|_| {
            Err(EngineError::Engine(
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 500,
                    message: "daemon exploded".to_string(),
                },
            ))
        });

        let response = fixture
            .app(engine)
            .oneshot(authed("GET", "/v1/images/abc/history", Body::empty()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["message"], "Internal server error");
    }
}
