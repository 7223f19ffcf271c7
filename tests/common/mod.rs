//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, Uri},
    Json, Router,
};
use edge_gateway::auth::token::{issue_token, now_secs};
use edge_gateway::auth::{Claims, Secret};
use edge_gateway::config::GatewayConfig;
use edge_gateway::http::HttpServer;
use edge_gateway::lifecycle::Shutdown;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

/// The shipped route table, with backend URLs swapped for local mocks.
pub const SHIPPED_CONFIG: &str = include_str!("../../gateway.toml");

/// What a mock backend saw, echoed back as JSON.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(String::from);

    Json(json!({
        "method": method.as_str(),
        "path": uri.path_and_query().map(|p| p.as_str()).unwrap_or("/"),
        "user_id": header("x-user-id"),
        "user_name": header("x-user-name"),
        "authorization": header("authorization"),
        "request_id": header("x-request-id"),
        "host": header("host"),
        "body": String::from_utf8_lossy(&body),
    }))
}

/// Start an echo backend on an ephemeral port.
pub async fn start_echo_backend() -> SocketAddr {
    start_backend(Router::new().fallback(echo)).await
}

/// Start an echo backend that waits `delay` before answering.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    let app = Router::new().fallback(move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| async move {
        tokio::time::sleep(delay).await;
        echo(method, uri, headers, body).await
    });
    start_backend(app).await
}

async fn start_backend(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Backend that sends headers and part of the body, then stalls.
pub async fn start_stalling_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 10\r\n\r\nab")
                    .await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });
    addr
}

/// Send a GET with the request target written verbatim and return the
/// status code. HTTP clients normalise `..` away, so this goes over raw TCP.
pub async fn raw_get_status(addr: SocketAddr, target: &str) -> u16 {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        target, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let text = String::from_utf8_lossy(&response);
    text.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("response has a status line")
}

/// An address with nothing listening on it.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Local stand-ins for the three services.
pub struct Backends {
    pub user: SocketAddr,
    pub campaign: SocketAddr,
    pub notification: SocketAddr,
}

impl Backends {
    pub async fn echo() -> Self {
        Self {
            user: start_echo_backend().await,
            campaign: start_echo_backend().await,
            notification: start_echo_backend().await,
        }
    }

    /// The shipped `gateway.toml` pointed at these backends.
    pub fn shipped_config(&self) -> String {
        SHIPPED_CONFIG
            .replace("http://user-service:5001", &format!("http://{}", self.user))
            .replace("http://campaign-service:8001", &format!("http://{}", self.campaign))
            .replace("http://notification-service:8002", &format!("http://{}", self.notification))
    }
}

/// A gateway running on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    handle: tokio::task::JoinHandle<Result<(), std::io::Error>>,
}

impl TestGateway {
    pub async fn start(config_toml: &str) -> Self {
        let config = GatewayConfig::from_toml_str(config_toml).expect("test config is valid");
        let secret = Secret::new(SECRET).unwrap();
        let server = HttpServer::new(&config, &secret).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

        Self {
            addr,
            shutdown,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) -> Result<(), std::io::Error> {
        self.shutdown.trigger();
        self.handle.await.expect("server task panicked")
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Sign a token with the test secret. `ttl` of `None` omits `exp`.
pub fn token(id: &str, name: Option<&str>, ttl: Option<i64>) -> String {
    let claims = Claims {
        id: Some(id.to_string()),
        name: name.map(String::from),
        exp: ttl.map(|t| (now_secs() as i64 + t) as u64),
    };
    issue_token(&Secret::new(SECRET).unwrap(), &claims).unwrap()
}

/// Sign a token with a different key.
pub fn forged_token(id: &str) -> String {
    let claims = Claims {
        id: Some(id.to_string()),
        name: None,
        exp: None,
    };
    let other = Secret::new("some-other-service-signing-key-abcdefgh").unwrap();
    issue_token(&other, &claims).unwrap()
}
