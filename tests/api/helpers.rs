use once_cell::sync::Lazy;
use reqwest::Response;
use std::path::PathBuf;
use tempfile::TempDir;

use anticipator_waitlist::{
    config::{get_configuration, CorruptStorePolicy, Settings},
    domain::waitlist_entry::WaitlistEntry,
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};

// The global subscriber can only be set once, whatever the number of tests.
// Logs are discarded unless TEST_LOG is set, e.g. `TEST_LOG=true cargo test`
static TRACING: Lazy<()> = Lazy::new(|| {
    let name = String::from("test");
    let env_filter = String::from("debug");

    if std::env::var("TEST_LOG").is_ok() {
        init_subscriber(get_subscriber(name, env_filter, std::io::stdout));
    } else {
        init_subscriber(get_subscriber(name, env_filter, std::io::sink));
    }
});

pub struct TestApp {
    pub config: Settings,
    pub address: String,
    pub store_path: PathBuf,
    // Removed from disk when the test app is dropped
    pub root_dir: TempDir,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        TestApp::spawn_app_with_policy(CorruptStorePolicy::Reset).await
    }

    pub async fn spawn_app_with_policy(policy: CorruptStorePolicy) -> TestApp {
        Lazy::force(&TRACING);

        let mut config = get_configuration().expect("Missing configuration file.");
        let root_dir = TempDir::new().expect("Failed to create a temporary directory.");

        // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
        // take into account: when port is 0, the OS will search for the first available port
        config.set_app_port(0);
        // Every test gets its own store, and its data directory doesn't exist yet
        config.set_data_dir(root_dir.path().join("data"));
        config.set_corrupt_store_policy(policy);

        let application = Application::build(config.clone())
            .await
            .expect("Failed to build application.");

        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            store_path: config.storage.get_file_path(),
            config,
            root_dir,
        }
    }

    pub async fn post_waitlist(&self, body: &serde_json::Value) -> Response {
        reqwest::Client::new()
            .post(&format!("{}/api/waitlist", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_waitlist_raw(&self, body: &'static str) -> Response {
        reqwest::Client::new()
            .post(&format!("{}/api/waitlist", self.address))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn join_waitlist(&self, email: &str) -> Response {
        self.post_waitlist(&serde_json::json!({ "email": email })).await
    }

    /// Entries currently on disk, or an empty list if the store was never written.
    pub fn stored_entries(&self) -> Vec<WaitlistEntry> {
        match std::fs::read_to_string(&self.store_path) {
            Ok(contents) => serde_json::from_str(&contents).expect("Store is not valid JSON."),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => panic!("Failed to read the store: {:?}", err),
        }
    }

    pub fn write_store(&self, contents: &str) {
        std::fs::create_dir_all(&self.config.storage.data_dir)
            .expect("Failed to create the data directory.");
        std::fs::write(&self.store_path, contents).expect("Failed to write the store.");
    }
}
