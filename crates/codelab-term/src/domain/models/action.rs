use codelab_api_types::AnalyticsQuery;
use codelab_api_types::LoginRequest;
use codelab_api_types::ResetPasswordRequest;
use codelab_client::RunRequest;

#[derive(Debug, Clone)]
pub enum Action {
    CancelRun,
    LoadAnalytics(AnalyticsQuery),
    LoadRecords { page: u32, count: u32 },
    Login(LoginRequest),
    Logout,
    Register {
        username: String,
        email: String,
        password: String,
        avatar_path: Option<String>,
    },
    ResetAvatar { avatar_path: String },
    ResetPassword(ResetPasswordRequest),
    SetPersist(bool),
    SubmitRun(RunRequest),
}
