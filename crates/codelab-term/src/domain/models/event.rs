use codelab_api_types::AnalyticsRowPage;
use codelab_api_types::AnalyticsSummary;
use codelab_api_types::SubmissionPage;
use codelab_client::RunOutcome;
use codelab_client::RunState;
use tui_textarea::Input;

use super::Route;
use super::Toast;

#[derive(Debug)]
pub enum Event {
    AnalyticsLoaded(AnalyticsSummary),
    AnalyticsRowsLoaded(AnalyticsRowPage),
    /// An authenticated call failed even after the token refresh; the user is
    /// sent to login and returned to `Route` on success.
    AuthRequired(Route),
    KeyboardCharInput(Input),
    KeyboardCTRLC,
    KeyboardCTRLE,
    KeyboardCTRLL,
    KeyboardCTRLO,
    KeyboardCTRLP,
    KeyboardCTRLR,
    KeyboardEnter,
    KeyboardEsc,
    KeyboardPaste(String),
    KeyboardTab,
    LoginSucceeded,
    RecordsLoaded(SubmissionPage),
    RegisterSucceeded,
    RunFinished(RunOutcome),
    RunStateChanged(RunState),
    SessionCleared,
    ToastQueued(Toast),
    UITick,
    UIScrollDown,
    UIScrollUp,
}
