#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_roost-api"));
        cmd.env("ROOST_API_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server sees DATABASE_URL from .env
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                // Ready even without a database; DB-gated tests check
                // db_available separately
                if resp.status() == StatusCode::OK
                    || resp.status() == StatusCode::SERVICE_UNAVAILABLE
                {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// True when /health reports a working database. Tests that need real
/// tables call this and skip themselves when it is false.
pub async fn db_available(server: &TestServer) -> bool {
    let client = reqwest::Client::new();
    match client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
    {
        Ok(resp) => resp.status() == StatusCode::OK,
        Err(_) => false,
    }
}

/// Unique username per call so tests never collide across runs or with
/// each other. Stays within the 3..=50 char username rules.
pub fn unique(prefix: &str) -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!(
        "{}-{}-{}",
        prefix,
        nanos % 1_000_000_000,
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

pub async fn register(client: &reqwest::Client, base_url: &str, username: &str) -> Result<Value> {
    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&json!({ "username": username, "password": PASSWORD }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "register '{}' failed: {}",
        username,
        res.status()
    );
    let body = res.json::<Value>().await?;
    Ok(body["data"].clone())
}

pub async fn login(client: &reqwest::Client, base_url: &str, username: &str) -> Result<String> {
    let res = client
        .post(format!("{}/auth/login", base_url))
        .json(&json!({ "username": username, "password": PASSWORD }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::OK,
        "login '{}' failed: {}",
        username,
        res.status()
    );
    let body = res.json::<Value>().await?;
    body["data"]["token"]
        .as_str()
        .map(str::to_string)
        .context("login response had no token")
}

/// Register a fresh account and return (bearer token, user json).
pub async fn register_and_login(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
) -> Result<(String, Value)> {
    let user = register(client, base_url, username).await?;
    let token = login(client, base_url, username).await?;
    Ok((token, user))
}

/// Create an admin through the ops CLI, the only path that grants the role.
pub fn create_admin(username: &str) -> Result<()> {
    let status = Command::new(env!("CARGO_BIN_EXE_roost"))
        .args(["create-admin", username, PASSWORD])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .status()
        .context("failed to run roost create-admin")?;
    anyhow::ensure!(status.success(), "create-admin '{}' failed", username);
    Ok(())
}
