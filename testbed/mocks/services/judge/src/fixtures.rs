use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use uuid::Uuid;

/// How long a fresh submission reports "In Queue" before moving on.
pub const IN_QUEUE_WINDOW: Duration = Duration::from_millis(1500);
/// How long it reports "Processing" after that.
pub const PROCESSING_WINDOW: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct MockUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub password: String,
}

/// What the judge will eventually say about a submission. Chosen up front
/// from magic markers in the source so tests can script every outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictPlan {
    Accepted,
    CompileError,
    WrongAnswer,
    /// Never leaves "Processing"; exercises the client's polling budget.
    NeverTerminal,
}

impl VerdictPlan {
    pub fn infer(source_code: &str) -> VerdictPlan {
        if source_code.contains("#mock:compile-error") {
            return VerdictPlan::CompileError;
        }
        if source_code.contains("#mock:wrong-answer") {
            return VerdictPlan::WrongAnswer;
        }
        if source_code.contains("#mock:hang") {
            return VerdictPlan::NeverTerminal;
        }
        VerdictPlan::Accepted
    }
}

/// A submission's visible judge state, derived from wall-clock age.
#[derive(Debug, Clone)]
pub struct VerdictView {
    pub status: &'static str,
    pub status_id: &'static str,
    pub stdout: Option<String>,
    pub compile_output: Option<String>,
    pub time: Option<&'static str>,
    pub memory: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct StoredSubmission {
    pub id: String,
    pub owner_id: String,
    pub username: String,
    pub source_code: String,
    pub stdin: String,
    pub expected_output: String,
    pub language_id: String,
    pub plan: VerdictPlan,
    pub created: Instant,
}

impl StoredSubmission {
    /// The verdict progresses with age: In Queue, then Processing, then the
    /// planned terminal verdict.
    pub fn verdict(&self) -> VerdictView {
        let age = self.created.elapsed();
        if age < IN_QUEUE_WINDOW {
            return VerdictView {
                status: "In Queue",
                status_id: "1",
                stdout: None,
                compile_output: None,
                time: None,
                memory: None,
            };
        }
        if age < IN_QUEUE_WINDOW + PROCESSING_WINDOW || self.plan == VerdictPlan::NeverTerminal {
            return VerdictView {
                status: "Processing",
                status_id: "2",
                stdout: None,
                compile_output: None,
                time: None,
                memory: None,
            };
        }

        match self.plan {
            VerdictPlan::Accepted | VerdictPlan::NeverTerminal => VerdictView {
                status: "Accepted",
                status_id: "3",
                stdout: Some(if self.expected_output.is_empty() {
                    "Hello, World!\n8".to_string()
                } else {
                    self.expected_output.clone()
                }),
                compile_output: None,
                time: Some("0.01"),
                memory: Some(3456),
            },
            VerdictPlan::WrongAnswer => VerdictView {
                status: "Wrong Answer",
                status_id: "4",
                stdout: Some("41".to_string()),
                compile_output: None,
                time: Some("0.02"),
                memory: Some(3520),
            },
            VerdictPlan::CompileError => VerdictView {
                status: "Compilation Error",
                status_id: "6",
                stdout: None,
                compile_output: Some("main.cpp:3:5: error: expected ';'".to_string()),
                time: None,
                memory: None,
            },
        }
    }
}

pub fn language_label(language_id: &str) -> &str {
    match language_id {
        "50" => "C",
        "54" => "C++",
        "62" => "Java",
        "63" => "JavaScript",
        "71" => "Python",
        other => other,
    }
}

/// In-memory state for one mock judge instance.
pub struct JudgeFixture {
    users: Mutex<Vec<MockUser>>,
    access_tokens: Mutex<HashMap<String, String>>,
    refresh_cookies: Mutex<HashMap<String, String>>,
    submissions: Mutex<Vec<StoredSubmission>>,
    counter: AtomicU64,
}

impl JudgeFixture {
    pub fn create_test_fixture() -> JudgeFixture {
        JudgeFixture {
            users: Mutex::new(vec![
                MockUser {
                    id: "u_1".to_string(),
                    username: "ada".to_string(),
                    email: "ada@example.com".to_string(),
                    role: "student".to_string(),
                    password: "hunter22".to_string(),
                },
                MockUser {
                    id: "u_2".to_string(),
                    username: "root".to_string(),
                    email: "admin@codelab.local".to_string(),
                    role: "admin".to_string(),
                    password: "toor".to_string(),
                },
            ]),
            access_tokens: Mutex::new(HashMap::new()),
            refresh_cookies: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    pub fn authenticate(&self, email: &str, password: &str) -> Option<MockUser> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.email == email && user.password == password)
            .cloned()
    }

    pub fn register(&self, username: &str, email: &str, password: &str) -> Result<MockUser, &'static str> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|user| user.email == email) {
            return Err("Email already registered");
        }
        if users.iter().any(|user| user.username == username) {
            return Err("Username already taken");
        }

        let user = MockUser {
            id: format!("u_{}", users.len() + 1),
            username: username.to_string(),
            email: email.to_string(),
            role: "student".to_string(),
            password: password.to_string(),
        };
        users.push(user.clone());
        Ok(user)
    }

    /// Mints a fresh access token and refresh cookie pair for a user.
    pub fn mint_tokens(&self, user_id: &str) -> (String, String) {
        let access = Uuid::new_v4().to_string();
        let cookie = Uuid::new_v4().to_string();
        self.access_tokens
            .lock()
            .unwrap()
            .insert(access.clone(), user_id.to_string());
        self.refresh_cookies
            .lock()
            .unwrap()
            .insert(cookie.clone(), user_id.to_string());
        (access, cookie)
    }

    pub fn refresh(&self, cookie: &str) -> Option<(String, MockUser)> {
        let user_id = self.refresh_cookies.lock().unwrap().get(cookie).cloned()?;
        let user = self.user_by_id(&user_id)?;

        let access = Uuid::new_v4().to_string();
        self.access_tokens
            .lock()
            .unwrap()
            .insert(access.clone(), user_id);
        Some((access, user))
    }

    pub fn user_for_token(&self, token: &str) -> Option<MockUser> {
        let user_id = self.access_tokens.lock().unwrap().get(token).cloned()?;
        self.user_by_id(&user_id)
    }

    fn user_by_id(&self, user_id: &str) -> Option<MockUser> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == user_id)
            .cloned()
    }

    pub fn revoke(&self, token: &str, cookie: Option<&str>) {
        self.access_tokens.lock().unwrap().remove(token);
        if let Some(cookie) = cookie {
            self.refresh_cookies.lock().unwrap().remove(cookie);
        }
    }

    /// Invalidates every access token for a user without touching refresh
    /// cookies, which is how tests force the refresh-and-retry path.
    pub fn expire_access_tokens(&self, user_id: &str) {
        self.access_tokens
            .lock()
            .unwrap()
            .retain(|_, owner| owner != user_id);
    }

    pub fn reset_password(&self, user_id: &str, old: &str, new: &str) -> bool {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|user| user.id == user_id) {
            if user.password == old {
                user.password = new.to_string();
                return true;
            }
        }
        false
    }

    pub fn add_submission(
        &self,
        owner: &MockUser,
        source_code: &str,
        stdin: &str,
        expected_output: &str,
        language_id: &str,
    ) -> StoredSubmission {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let submission = StoredSubmission {
            id: format!("sub_{n}"),
            owner_id: owner.id.clone(),
            username: owner.username.clone(),
            source_code: source_code.to_string(),
            stdin: stdin.to_string(),
            expected_output: expected_output.to_string(),
            language_id: language_id.to_string(),
            plan: VerdictPlan::infer(source_code),
            created: Instant::now(),
        };
        self.submissions.lock().unwrap().push(submission.clone());
        submission
    }

    pub fn submission(&self, id: &str) -> Option<StoredSubmission> {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .find(|submission| submission.id == id)
            .cloned()
    }

    pub fn submissions_for(&self, owner_id: &str) -> Vec<StoredSubmission> {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|submission| submission.owner_id == owner_id)
            .cloned()
            .collect()
    }

    pub fn all_submissions(&self) -> Vec<StoredSubmission> {
        self.submissions.lock().unwrap().clone()
    }
}
