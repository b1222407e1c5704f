use std::sync::Arc;

use axum::Router;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mongo::Mongo;

use quickpoll::app::{router, AppState};
use quickpoll::db::repository::{MongoPollRepository, PollRepository};

/// Holds a running MongoDB container and provides the Axum router for integration tests.
///
/// The container is kept alive for as long as this struct lives. When dropped,
/// it is stopped and cleaned up automatically.
pub struct TestEnv {
    _mongo: ContainerAsync<Mongo>,
    pub router: Router,
    pub repo: Arc<dyn PollRepository>,
}

impl TestEnv {
    /// Start MongoDB and build a router wired to the real repository.
    pub async fn start() -> Self {
        let mongo_container = Mongo::default()
            .start()
            .await
            .expect("Failed to start MongoDB container");

        let mongo_port = mongo_container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get MongoDB port");
        let mongo_uri = format!("mongodb://127.0.0.1:{}", mongo_port);
        let mongo_client = mongodb::Client::with_uri_str(&mongo_uri)
            .await
            .expect("Failed to connect to MongoDB");
        let mongo_db = mongo_client.database("quickpoll_test");

        let mongo_repo = MongoPollRepository::new(&mongo_db);
        mongo_repo
            .ensure_indexes()
            .await
            .expect("Failed to create indexes");
        let repo: Arc<dyn PollRepository> = Arc::new(mongo_repo);

        let router = router(AppState::new(repo.clone()));

        Self {
            _mongo: mongo_container,
            router,
            repo,
        }
    }

    /// Build an `axum_test::TestServer` that accepts any status code.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// Helper: create a poll via the API and return the response body.
    pub async fn create_poll(
        &self,
        server: &axum_test::TestServer,
        question: &str,
        options: &[&str],
    ) -> serde_json::Value {
        let response = server
            .post("/polls")
            .json(&serde_json::json!({
                "question": question,
                "options": options,
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }
}
