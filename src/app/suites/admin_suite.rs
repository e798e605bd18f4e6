use async_trait::async_trait;
use serde_json::{json, Value};

use super::{evaluate, require_error_field};
use crate::adapters::http::{ApiClient, ApiResponse};
use crate::config::toml_config::ProbeConfig;
use crate::core::runner::ProbeContext;
use crate::domain::model::{CheckResult, UserRecord};
use crate::domain::ports::ProbeSuite;
use crate::utils::error::Result;

const SUITE: &str = "admin";
const USERS_ENDPOINT: &str = "api/admin/users";
const ADD_USER_ENDPOINT: &str = "api/admin/add-user";
const DELETE_USER_ENDPOINT: &str = "api/admin/delete-user";

pub const CREATED_UID_KEY: &str = "created_uid";

const INVALID_ROLE: &str = "superuser";

/// 從新增使用者的回應取出 uid（頂層 `uid` 或 `user.uid`）
pub fn extract_uid(body: &Value) -> Option<String> {
    let non_empty = |v: &Value| v.as_str().filter(|uid| !uid.is_empty()).map(str::to_string);
    body.get("uid")
        .and_then(non_empty)
        .or_else(|| body.get("user").and_then(|u| u.get("uid")).and_then(non_empty))
}

pub struct AdminSuite {
    role: String,
    password: String,
    email_domain: String,
}

impl AdminSuite {
    pub fn new(role: &str, password: &str, email_domain: &str) -> Self {
        Self {
            role: role.to_string(),
            password: password.to_string(),
            email_domain: email_domain.to_string(),
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(
            &config.fixtures.admin_role,
            &config.fixtures.admin_password,
            &config.fixtures.email_domain,
        )
    }

    fn unique_email(&self) -> String {
        format!(
            "probe.{}@{}",
            chrono::Utc::now().format("%Y%m%d%H%M%S%3f"),
            self.email_domain
        )
    }

    async fn list_users(&self, client: &ApiClient) -> CheckResult {
        let check = CheckResult::new(SUITE, "List users", USERS_ENDPOINT);
        let outcome = client.get(USERS_ENDPOINT).await;
        evaluate(check, outcome, &[200], |check, response| {
            let Some(users) = response.body.get("users").and_then(Value::as_array) else {
                return check.fail(format!("Missing 'users' array: {}", response.snippet(200)));
            };

            let mut roles: Vec<String> = users
                .iter()
                .filter_map(|u| serde_json::from_value::<UserRecord>(u.clone()).ok())
                .filter_map(|u| u.role)
                .collect();
            roles.sort();
            roles.dedup();

            check
                .note("user_count", json!(users.len()))
                .note("roles", json!(roles))
                .pass(format!("{} user(s), roles: {}", users.len(), roles.join(", ")))
        })
    }

    async fn add_missing_fields(&self, client: &ApiClient) -> CheckResult {
        let check = CheckResult::new(SUITE, "Add user with missing fields", ADD_USER_ENDPOINT);
        let outcome = client
            .post_json(ADD_USER_ENDPOINT, &json!({ "email": self.unique_email() }))
            .await;
        evaluate(check, outcome, &[400], require_error_field)
    }

    async fn add_invalid_role(&self, client: &ApiClient) -> CheckResult {
        let check = CheckResult::new(SUITE, "Add user with invalid role", ADD_USER_ENDPOINT)
            .note("role", json!(INVALID_ROLE));
        let body = json!({
            "email": self.unique_email(),
            "password": self.password,
            "role": INVALID_ROLE,
        });
        let outcome = client.post_json(ADD_USER_ENDPOINT, &body).await;
        evaluate(check, outcome, &[400], require_error_field)
    }

    async fn add_valid_user(&self, client: &ApiClient, context: &mut ProbeContext) -> CheckResult {
        let email = self.unique_email();
        let check = CheckResult::new(SUITE, "Add user", ADD_USER_ENDPOINT)
            .note("email", json!(email))
            .note("role", json!(self.role));
        let body = json!({
            "email": email,
            "password": self.password,
            "role": self.role,
        });
        let outcome = client.post_json(ADD_USER_ENDPOINT, &body).await;

        let mut created = None;
        let result = evaluate(check, outcome, &[200], |check, response: &ApiResponse| {
            if response.bool_field("success") != Some(true) {
                return check.fail(format!("'success' is not true: {}", response.snippet(200)));
            }
            created = extract_uid(&response.body);
            match &created {
                Some(uid) => check.note("uid", json!(uid)).pass(format!("Created {}", uid)),
                None => check.pass("Created, but no uid returned"),
            }
        });

        if let Some(uid) = created {
            context.add_shared_data(CREATED_UID_KEY, json!(uid));
        }
        result
    }

    async fn delete_missing_uid(&self, client: &ApiClient) -> CheckResult {
        let check = CheckResult::new(SUITE, "Delete user without uid", DELETE_USER_ENDPOINT);
        let outcome = client.delete_json(DELETE_USER_ENDPOINT, &json!({})).await;
        evaluate(check, outcome, &[400], require_error_field)
    }

    async fn delete_created(&self, client: &ApiClient, context: &ProbeContext) -> CheckResult {
        let check = CheckResult::new(SUITE, "Delete created user", DELETE_USER_ENDPOINT);
        let Some(uid) = context.get_shared_str(CREATED_UID_KEY) else {
            return check.skip("No user was created in this run");
        };

        let outcome = client
            .delete_json(DELETE_USER_ENDPOINT, &json!({ "uid": uid }))
            .await;
        let check = check.note("uid", json!(uid));
        evaluate(check, outcome, &[200], |check, response| {
            if response.bool_field("success") == Some(false) {
                check.fail(format!("'success' is false: {}", response.snippet(200)))
            } else {
                check.pass("Deleted")
            }
        })
    }
}

#[async_trait]
impl ProbeSuite for AdminSuite {
    fn name(&self) -> &str {
        SUITE
    }

    async fn run(&self, client: &ApiClient, context: &mut ProbeContext) -> Result<Vec<CheckResult>> {
        let mut checks = vec![
            self.list_users(client).await,
            self.add_missing_fields(client).await,
            self.add_invalid_role(client).await,
            self.add_valid_user(client, context).await,
            self.delete_missing_uid(client).await,
        ];
        checks.push(self.delete_created(client, context).await);
        Ok(checks)
    }
}
