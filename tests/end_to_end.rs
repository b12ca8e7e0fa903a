// Full gateway router in front of a real local axum backend
#[cfg(test)]
mod test {
    use std::{net::SocketAddr, sync::Arc};

    use axum::{
        Json, Router,
        body::Body,
        extract::{ConnectInfo, Request},
        http::{HeaderMap, StatusCode, Uri},
        routing::any,
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tollgate::{
        adapters::{HyperHttpClient, MemoryCounterStore},
        app,
        config::{GatewayConfig, RateLimitSettings, RouteEntry, StoreBackend},
        ports::HttpClient,
    };
    use tower::ServiceExt; // for oneshot

    async fn echo(uri: Uri, headers: HeaderMap, body: String) -> Json<Value> {
        let header = |name: &str| {
            headers
                .get_all(name)
                .iter()
                .map(|v| v.to_str().unwrap_or_default().to_string())
                .collect::<Vec<_>>()
        };
        Json(json!({
            "path": uri.path(),
            "query": uri.query(),
            "host": header("host"),
            "x_forwarded_for": header("x-forwarded-for"),
            "x_forwarded_proto": header("x-forwarded-proto"),
            "x_forwarded_host": header("x-forwarded-host"),
            "proxy_authorization": header("proxy-authorization"),
            "keep_alive": header("keep-alive"),
            "authorization": header("authorization"),
            "body": body,
        }))
    }

    async fn spawn_backend() -> SocketAddr {
        let app = Router::new()
            .route(
                "/unavailable",
                any(|| async {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({ "detail": "maintenance" })),
                    )
                }),
            )
            .fallback(echo);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    fn gateway_config(backend: SocketAddr, limit: u64) -> GatewayConfig {
        GatewayConfig::builder()
            .listen_addr("127.0.0.1:0")
            .route(RouteEntry::new(
                "user-service",
                "/api/users/**",
                format!("http://{backend}"),
                2,
            ))
            .route(RouteEntry::new(
                "dead-service",
                "/api/dead/**",
                format!("http://127.0.0.1:{}", closed_port()),
                2,
            ))
            .rate_limit(RateLimitSettings {
                default_limit: limit,
                store: StoreBackend::Memory,
                ..RateLimitSettings::default()
            })
            .build()
            .unwrap()
    }

    fn gateway(config: &GatewayConfig) -> Router {
        let client: Arc<dyn HttpClient> =
            Arc::new(HyperHttpClient::new(&config.upstream).unwrap());
        app::build_router(config, Arc::new(MemoryCounterStore::new()), client)
    }

    fn request(method: &str, uri: &str) -> http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("host", "gateway.example.com")
    }

    fn with_peer(mut req: Request, peer: &str) -> Request {
        let addr: SocketAddr = peer.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    async fn send(app: &Router, req: Request) -> (StatusCode, HeaderMap, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    #[tokio::test]
    async fn test_request_is_forwarded_with_rewritten_path_and_headers() {
        let backend = spawn_backend().await;
        let app = gateway(&gateway_config(backend, 100));

        let req = request("POST", "/api/users/42?active=1")
            .header("proxy-authorization", "Basic Zm9vOmJhcg==")
            .header("keep-alive", "timeout=5")
            .header("authorization", "Bearer token")
            .body(Body::from("hello"))
            .unwrap();
        let (status, headers, body) = send(&app, with_peer(req, "10.1.2.3:55000")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["path"], "/42");
        assert_eq!(body["query"], "active=1");
        assert_eq!(body["host"], json!([backend.to_string()]));
        assert_eq!(body["x_forwarded_for"], json!(["10.1.2.3"]));
        assert_eq!(body["x_forwarded_proto"], json!(["http"]));
        assert_eq!(body["x_forwarded_host"], json!(["gateway.example.com"]));
        assert_eq!(body["proxy_authorization"], json!([]));
        assert_eq!(body["keep_alive"], json!([]));
        assert_eq!(body["authorization"], json!(["Bearer token"]));
        assert_eq!(body["body"], "hello");

        assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "100");
        assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "99");
        assert_eq!(headers.get("x-request-id").unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_existing_forwarded_for_is_extended() {
        let backend = spawn_backend().await;
        let app = gateway(&gateway_config(backend, 100));

        let req = request("GET", "/api/users/1")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        let (_, _, body) = send(&app, with_peer(req, "10.1.2.3:55000")).await;

        assert_eq!(body["x_forwarded_for"], json!(["203.0.113.7", "10.1.2.3"]));
    }

    #[tokio::test]
    async fn test_quota_exhaustion_returns_429() {
        let backend = spawn_backend().await;
        let app = gateway(&gateway_config(backend, 2));

        for expected in ["1", "0"] {
            let req = request("GET", "/api/users/1").body(Body::empty()).unwrap();
            let (status, headers, _) = send(&app, with_peer(req, "10.9.9.9:1000")).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), expected);
        }

        let req = request("GET", "/api/users/1").body(Body::empty()).unwrap();
        let (status, headers, body) = send(&app, with_peer(req, "10.9.9.9:1000")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "0");
        assert_eq!(body["error"], "Rate limit exceeded");
        assert_eq!(body["limit"], 2);
        assert_eq!(body["window"], "1 minute");

        // A different caller is unaffected.
        let req = request("GET", "/api/users/1").body(Body::empty()).unwrap();
        let (status, _, _) = send(&app, with_peer(req, "10.9.9.10:1000")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_backend_503_is_relayed_verbatim() {
        let backend = spawn_backend().await;
        let app = gateway(&gateway_config(backend, 100));

        let req = request("GET", "/api/users/unavailable")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app, with_peer(req, "10.1.1.1:1")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({ "detail": "maintenance" }));
    }

    #[tokio::test]
    async fn test_unreachable_backend_returns_generic_503() {
        let backend = spawn_backend().await;
        let app = gateway(&gateway_config(backend, 100));

        let req = request("GET", "/api/dead/1").body(Body::empty()).unwrap();
        let (status, headers, body) = send(&app, with_peer(req, "10.1.1.1:1")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Service Unavailable");
        assert_eq!(body["message"], "Backend service is currently unavailable");
        assert_eq!(body["details"], "connection failed");
        assert!(headers.contains_key("x-ratelimit-limit"));
    }

    #[tokio::test]
    async fn test_unknown_route_returns_404() {
        let backend = spawn_backend().await;
        let app = gateway(&gateway_config(backend, 100));

        let req = request("DELETE", "/nothing/here").body(Body::empty()).unwrap();
        let (status, _, body) = send(&app, req).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "No route found for: /nothing/here" }));
    }

    #[tokio::test]
    async fn test_health_is_not_rate_limited() {
        let backend = spawn_backend().await;
        let app = gateway(&gateway_config(backend, 1));

        for _ in 0..3 {
            let req = request("GET", "/health").body(Body::empty()).unwrap();
            let (status, headers, body) = send(&app, req).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "UP");
            assert_eq!(body["application"], "tollgate");
            assert!(!headers.contains_key("x-ratelimit-limit"));
        }
    }

    #[tokio::test]
    async fn test_admin_status_and_reset() {
        let backend = spawn_backend().await;
        let app = gateway(&gateway_config(backend, 1));

        let req = request("GET", "/api/users/1").body(Body::empty()).unwrap();
        let (status, _, _) = send(&app, with_peer(req, "10.7.7.7:1")).await;
        assert_eq!(status, StatusCode::OK);
        let req = request("GET", "/api/users/1").body(Body::empty()).unwrap();
        let (status, _, _) = send(&app, with_peer(req, "10.7.7.7:1")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        let req = request("GET", "/admin/rate-limit/status?identifier=ip:10.7.7.7")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["identifier"], "ip:10.7.7.7");
        assert_eq!(body["current_usage"], 2);
        assert_eq!(body["limit"], 1);
        assert_eq!(body["remaining"], 0);

        let req = request("POST", "/admin/rate-limit/reset?identifier=ip:10.7.7.7")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "message": "Rate limit reset successfully",
                "identifier": "ip:10.7.7.7",
            })
        );

        let req = request("GET", "/api/users/1").body(Body::empty()).unwrap();
        let (status, _, _) = send(&app, with_peer(req, "10.7.7.7:1")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_requires_identifier() {
        let backend = spawn_backend().await;
        let app = gateway(&gateway_config(backend, 100));

        let req = request("POST", "/admin/rate-limit/reset")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing required parameter: identifier");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected_before_forwarding() {
        let backend = spawn_backend().await;
        let mut config = gateway_config(backend, 100);
        config.max_body_bytes = 16;
        let app = gateway(&config);

        let req = request("POST", "/api/users/1")
            .body(Body::from("this body is longer than sixteen bytes"))
            .unwrap();
        let (status, _, body) = send(&app, with_peer(req, "10.1.1.1:1")).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "Payload Too Large");
    }

    #[tokio::test]
    async fn test_admin_can_be_disabled() {
        let backend = spawn_backend().await;
        let mut config = gateway_config(backend, 100);
        config.admin_enabled = false;
        let app = gateway(&config);

        let req = request("GET", "/admin/rate-limit/status?identifier=ip:1.2.3.4")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(&app, req).await;
        // Falls through to the proxy, where no route matches.
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
