use operations_service::config::{Config, DatabaseConfig, ServerConfig};
use operations_service::Application;
use secrecy::Secret;
use serde_json::{json, Value};
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: mongodb::Database,
    pub db_name: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let db_name = format!("operations_test_{}", Uuid::new_v4().simple());

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            database: DatabaseConfig {
                url: Secret::new(
                    std::env::var("TEST_MONGODB_URI")
                        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
                ),
                db_name: db_name.clone(),
            },
            service_name: "operations-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);
        let db = app.db().clone();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();

        // Wait for the server to come up.
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            db,
            db_name,
            client,
        }
    }

    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute POST request")
    }

    pub async fn patch(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .patch(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute PATCH request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute GET request")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute DELETE request")
    }

    /// Create a project and return its id.
    pub async fn create_project(&self) -> String {
        let response = self
            .post(
                "/projects",
                &json!({
                    "title": "Website redesign",
                    "client_id": Uuid::new_v4(),
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.expect("invalid project body");
        body["data"]["id"].as_str().expect("project id").to_string()
    }

    /// Create a quotation for a fresh project and return the response data.
    pub async fn create_quotation(&self, valid_until: chrono::DateTime<chrono::Utc>) -> Value {
        let project_id = self.create_project().await;
        let response = self
            .post(
                "/quotations",
                &json!({
                    "project_id": project_id,
                    "items": [
                        { "description": "A", "quantity": 2.0, "unit_price": 100.0 }
                    ],
                    "tax": 10.0,
                    "discount": 5.0,
                    "valid_until": valid_until,
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.expect("invalid quotation body");
        body["data"].clone()
    }

    /// Create a quotation and walk it to `accepted`.
    pub async fn create_accepted_quotation(&self) -> Value {
        let quotation = self
            .create_quotation(chrono::Utc::now() + chrono::Duration::days(14))
            .await;
        let id = quotation["id"].as_str().expect("quotation id");

        let response = self
            .patch(&format!("/quotations/{}/send", id), &json!({}))
            .await;
        assert_eq!(response.status(), 200);

        let response = self
            .patch(&format!("/quotations/{}/accept", id), &json!({}))
            .await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.expect("invalid accept body");
        body["data"].clone()
    }

    /// Create a standalone invoice and return the response data.
    pub async fn create_invoice(&self, total_items: &Value) -> Value {
        let response = self
            .post(
                "/invoices",
                &json!({
                    "client_id": Uuid::new_v4(),
                    "items": total_items,
                    "tax": 10.0,
                    "discount": 5.0,
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.expect("invalid invoice body");
        body["data"].clone()
    }

    /// Cleanup test database after test completes.
    pub async fn cleanup(&self) {
        self.db
            .drop(None)
            .await
            .expect("Failed to drop test database");
    }
}
