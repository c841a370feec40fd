//! Mock judge API server for exercising the CodeLab terminal client.
//!
//! Serves the same envelope-wrapped JSON surface as the real lab backend:
//! cookie-based token refresh, bearer-authenticated submission endpoints, and
//! verdicts that progress with wall-clock age (In Queue, Processing, then a
//! terminal verdict scripted by magic markers in the source). Everything is
//! in-memory and deterministic so client tests never depend on a real judge.

pub mod fixtures;
pub mod handlers;
pub mod server;

pub use fixtures::JudgeFixture;
pub use fixtures::VerdictPlan;
pub use server::MockServer;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_verdict_plan_markers() {
        assert_eq!(VerdictPlan::infer("int main() {}"), VerdictPlan::Accepted);
        assert_eq!(
            VerdictPlan::infer("// #mock:compile-error\nint main() {}"),
            VerdictPlan::CompileError
        );
        assert_eq!(
            VerdictPlan::infer("// #mock:hang"),
            VerdictPlan::NeverTerminal
        );
    }

    #[test]
    fn test_fresh_submission_starts_in_queue() {
        let fixture = JudgeFixture::create_test_fixture();
        let user = fixture.authenticate("ada@example.com", "hunter22").unwrap();
        let submission = fixture.add_submission(&user, "int main() {}", "", "", "54");

        let verdict = submission.verdict();
        assert_eq!(verdict.status, "In Queue");
        assert_eq!(verdict.status_id, "1");
    }

    async fn spawn_server(addr: &str) -> std::sync::Arc<JudgeFixture> {
        let server = MockServer::new();
        let fixture = server.get_fixture();
        let addr = addr.to_string();
        tokio::spawn(async move { server.serve(&addr).await });
        tokio::time::sleep(Duration::from_millis(200)).await;
        fixture
    }

    #[tokio::test]
    async fn test_refresh_cookie_survives_an_expired_access_token() {
        let fixture = spawn_server("127.0.0.1:8091").await;
        let base = "http://127.0.0.1:8091/api/v1";

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .unwrap();

        let login: serde_json::Value = client
            .post(format!("{base}/users/login"))
            .json(&serde_json::json!({"email": "ada@example.com", "password": "hunter22"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let token = login["data"]["accessToken"].as_str().unwrap().to_string();

        fixture.expire_access_tokens("u_1");

        let stale = client
            .get(format!("{base}/submissions"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(stale.status(), 401);

        // The refresh cookie from login is still in the jar.
        let refreshed: serde_json::Value = client
            .get(format!("{base}/users/refresh-token"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let fresh = refreshed["data"]["accessToken"].as_str().unwrap();

        let retried = client
            .get(format!("{base}/submissions"))
            .bearer_auth(fresh)
            .send()
            .await
            .unwrap();
        assert_eq!(retried.status(), 200);
    }

    #[tokio::test]
    async fn test_submit_then_result_round_trip() {
        let _fixture = spawn_server("127.0.0.1:8092").await;
        let base = "http://127.0.0.1:8092/api/v1";
        let client = reqwest::Client::new();

        let login: serde_json::Value = client
            .post(format!("{base}/users/login"))
            .json(&serde_json::json!({"email": "ada@example.com", "password": "hunter22"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let token = login["data"]["accessToken"].as_str().unwrap().to_string();

        let submitted: serde_json::Value = client
            .post(format!("{base}/submissions/submit"))
            .bearer_auth(&token)
            .json(&serde_json::json!({
                "sourceCode": "int main() { return 0; }",
                "stdin": "",
                "expectedOutput": "8",
                "languageId": "54",
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = submitted["data"]["id"].as_str().unwrap();

        let result: serde_json::Value = client
            .get(format!("{base}/submissions/result/{id}"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(result["data"]["status"], "In Queue");

        let missing = client
            .get(format!("{base}/submissions/result/sub_none"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 404);
    }

    #[tokio::test]
    async fn test_analytics_is_admin_only() {
        let _fixture = spawn_server("127.0.0.1:8093").await;
        let base = "http://127.0.0.1:8093/api/v1";
        let client = reqwest::Client::new();

        let login: serde_json::Value = client
            .post(format!("{base}/users/login"))
            .json(&serde_json::json!({"email": "ada@example.com", "password": "hunter22"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let student = login["data"]["accessToken"].as_str().unwrap().to_string();

        let denied = client
            .get(format!("{base}/submissions/analytics"))
            .bearer_auth(&student)
            .send()
            .await
            .unwrap();
        assert_eq!(denied.status(), 403);

        let admin_login: serde_json::Value = client
            .post(format!("{base}/users/login"))
            .json(&serde_json::json!({"email": "admin@codelab.local", "password": "toor"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let admin = admin_login["data"]["accessToken"].as_str().unwrap();

        let allowed = client
            .get(format!("{base}/submissions/analytics"))
            .bearer_auth(admin)
            .send()
            .await
            .unwrap();
        assert_eq!(allowed.status(), 200);
    }
}
