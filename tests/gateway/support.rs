use countries_agent::auth::UserStore;
use countries_agent::config::Config;
use countries_agent::db;
use countries_agent::gateway::run_gateway_with_listener;
use reqwest::StatusCode;
use std::time::Duration;
use tempfile::TempDir;

const CAPITALS: &str = r#"{"france": "Paris", "japan": "Tokyo", "kenya": "Nairobi"}"#;
const FLAGS: &str = r#"{"france": "🇫🇷", "japan": "🇯🇵"}"#;

pub struct GatewayTestServer {
    port: u16,
    _workspace: TempDir,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl GatewayTestServer {
    pub async fn start(seed_users: &[&str]) -> Self {
        let workspace = TempDir::new().expect("temp workspace should be created");
        std::fs::write(workspace.path().join("countries.json"), CAPITALS)
            .expect("capitals fixture should be written");
        std::fs::write(workspace.path().join("flags.json"), FLAGS)
            .expect("flags fixture should be written");

        let database_url = format!("sqlite:{}", workspace.path().join("app.db").display());
        let pool = db::connect(&database_url)
            .await
            .expect("test database should open");
        let users = UserStore::new(pool)
            .await
            .expect("user store should initialize");
        for user in seed_users {
            users
                .ensure_user(user)
                .await
                .expect("seed user should insert");
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral gateway listener should bind");
        let port = listener
            .local_addr()
            .expect("ephemeral gateway listener should expose local address")
            .port();

        let mut config = Config::default();
        config.database_url = database_url;
        config.data_dir = workspace.path().to_path_buf();

        let handle = tokio::spawn(async move { run_gateway_with_listener(listener, config).await });

        wait_until_gateway_ready(port).await;

        Self {
            port,
            _workspace: workspace,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }
}

impl Drop for GatewayTestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn wait_until_gateway_ready(port: u16) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("reqwest client should be built");

    for _ in 0..80 {
        let health = client
            .get(format!("http://127.0.0.1:{port}/health"))
            .send()
            .await;
        if matches!(health, Ok(resp) if resp.status() == StatusCode::OK) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("gateway did not become ready on port {port}");
}
