use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::language::Language;

/// Judge verdict for a submission, in the order the judge reports them.
///
/// The wire carries the human-readable description (`"Wrong Answer"`). Strings
/// this client has never seen decode to [`SubmissionStatus::Unknown`], which is
/// treated as terminal and rendered with a default presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubmissionStatus {
    InQueue,
    Processing,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    CompilationError,
    RuntimeErrorSigsegv,
    RuntimeErrorSigxfsz,
    RuntimeErrorSigfpe,
    RuntimeErrorSigabrt,
    RuntimeErrorNzec,
    RuntimeErrorOther,
    InternalError,
    ExecFormatError,
    Unknown(String),
}

impl SubmissionStatus {
    const TABLE: [(SubmissionStatus, u32, &'static str); 14] = [
        (SubmissionStatus::InQueue, 1, "In Queue"),
        (SubmissionStatus::Processing, 2, "Processing"),
        (SubmissionStatus::Accepted, 3, "Accepted"),
        (SubmissionStatus::WrongAnswer, 4, "Wrong Answer"),
        (SubmissionStatus::TimeLimitExceeded, 5, "Time Limit Exceeded"),
        (SubmissionStatus::CompilationError, 6, "Compilation Error"),
        (
            SubmissionStatus::RuntimeErrorSigsegv,
            7,
            "Runtime Error (SIGSEGV)",
        ),
        (
            SubmissionStatus::RuntimeErrorSigxfsz,
            8,
            "Runtime Error (SIGXFSZ)",
        ),
        (
            SubmissionStatus::RuntimeErrorSigfpe,
            9,
            "Runtime Error (SIGFPE)",
        ),
        (
            SubmissionStatus::RuntimeErrorSigabrt,
            10,
            "Runtime Error (SIGABRT)",
        ),
        (
            SubmissionStatus::RuntimeErrorNzec,
            11,
            "Runtime Error (NZEC)",
        ),
        (SubmissionStatus::RuntimeErrorOther, 12, "Runtime Error"),
        (SubmissionStatus::InternalError, 13, "Internal Error"),
        (SubmissionStatus::ExecFormatError, 14, "Exec Format Error"),
    ];

    /// The judge's numeric identifier for this verdict, when known.
    pub fn id(&self) -> Option<u32> {
        SubmissionStatus::TABLE
            .iter()
            .find(|(status, _, _)| status == self)
            .map(|(_, id, _)| *id)
    }

    /// The wire description for this verdict.
    pub fn description(&self) -> &str {
        match self {
            SubmissionStatus::Unknown(raw) => raw,
            known => {
                SubmissionStatus::TABLE
                    .iter()
                    .find(|(status, _, _)| status == known)
                    .map(|(_, _, description)| *description)
                    // Every non-Unknown variant has a table row.
                    .unwrap_or("Unknown")
            }
        }
    }

    /// In Queue and Processing are the only statuses that keep a poll loop
    /// alive; everything else, unrecognized strings included, ends it.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            SubmissionStatus::InQueue | SubmissionStatus::Processing
        )
    }
}

impl From<String> for SubmissionStatus {
    fn from(raw: String) -> SubmissionStatus {
        SubmissionStatus::TABLE
            .iter()
            .find(|(_, _, description)| *description == raw)
            .map(|(status, _, _)| status.clone())
            .unwrap_or(SubmissionStatus::Unknown(raw))
    }
}

impl From<SubmissionStatus> for String {
    fn from(status: SubmissionStatus) -> String {
        status.description().to_string()
    }
}

/// Body of `POST /submissions/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub source_code: String,
    pub stdin: String,
    pub expected_output: String,
    pub language_id: String,
}

impl SubmitRequest {
    /// Build a request from raw editor fields, trimming the auxiliary inputs
    /// and mapping the language to the judge's numeric identifier.
    pub fn from_editor(
        source_code: &str,
        stdin: &str,
        expected_output: &str,
        language: Language,
    ) -> SubmitRequest {
        SubmitRequest {
            source_code: source_code.to_string(),
            stdin: stdin.trim().to_string(),
            expected_output: expected_output.trim().to_string(),
            language_id: language.judge_id().to_string(),
        }
    }
}

/// A submission record as the server returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    #[serde(default)]
    pub source_code: String,
    #[serde(default)]
    pub stdin: String,
    #[serde(default)]
    pub expected_output: Option<String>,
    pub language_id: String,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Resolved result payload from `GET /submissions/result/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub id: String,
    pub status: SubmissionStatus,
    /// The judge reports this as a string; parse via [`SubmissionResult::numeric_status_id`].
    pub status_id: String,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    /// Wall-clock seconds, judge-formatted.
    #[serde(default)]
    pub time: Option<String>,
    /// Peak memory in kilobytes.
    #[serde(default)]
    pub memory: Option<u64>,
}

impl SubmissionResult {
    pub fn numeric_status_id(&self) -> Option<u32> {
        self.status_id.trim().parse().ok()
    }

    /// A parsed status id of 6 or above selects the error transcript.
    pub fn is_error_verdict(&self) -> bool {
        self.numeric_status_id().map(|id| id >= 6).unwrap_or(false)
    }
}

/// One page of the caller's submission history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPage {
    pub submissions: Vec<Submission>,
    pub page: u32,
    pub count: u32,
    pub total: u64,
}

/// Aggregate counts keyed by language label or verdict description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountBucket {
    pub key: String,
    pub count: u64,
}

/// Payload of `GET /submissions/analytics`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total: u64,
    pub by_language: Vec<CountBucket>,
    pub by_status: Vec<CountBucket>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Query string for `GET /submissions/analytics-submission`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub page: u32,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
}

/// One raw analytics row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRow {
    pub username: String,
    pub language_id: String,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Paginated raw rows for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRowPage {
    pub rows: Vec<AnalyticsRow>,
    pub page: u32,
    pub count: u32,
    pub total: u64,
}
