use codelab_api_types::AuthPayload;
use codelab_api_types::SubmissionResult;
use codelab_api_types::SubmissionStatus;
use codelab_api_types::User;
use tokio::sync::mpsc;

use super::*;

fn payload(role: Role) -> AuthPayload {
    AuthPayload {
        user: User {
            id: "u_1".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            role,
            avatar: None,
            created_at: None,
        },
        access_token: "tok".to_string(),
    }
}

async fn state_in(
    session: Session,
    state_dir: std::path::PathBuf,
) -> (AppState<'static>, mpsc::UnboundedReceiver<Action>) {
    let (action_tx, action_rx) = mpsc::unbounded_channel();
    let state = AppState::new(AppStateProps {
        action_tx,
        session,
        records_page_size: 12,
        state_dir,
    })
    .await;

    (state, action_rx)
}

async fn state_with(session: Session) -> (AppState<'static>, mpsc::UnboundedReceiver<Action>) {
    state_in(session, tempfile::tempdir().unwrap().into_path()).await
}

#[tokio::test]
async fn test_role_gate_masks_dashboard_for_students() {
    let session = Session::in_memory();
    session.apply_login(payload(Role::Student)).await;
    let (mut state, _action_rx) = state_with(session).await;

    state.navigate(Route::Dashboard).unwrap();
    assert_eq!(state.route, Route::NotFound);
}

#[tokio::test]
async fn test_admin_dashboard_navigation_triggers_analytics_load() {
    let session = Session::in_memory();
    session.apply_login(payload(Role::Admin)).await;
    let (mut state, mut action_rx) = state_with(session).await;

    state.navigate(Route::Dashboard).unwrap();
    assert_eq!(state.route, Route::Dashboard);
    assert!(matches!(
        action_rx.try_recv().unwrap(),
        Action::LoadAnalytics(_)
    ));
}

#[tokio::test]
async fn test_auth_gate_remembers_origin_and_returns_after_login() {
    let session = Session::in_memory();
    let (mut state, mut action_rx) = state_with(session.clone()).await;

    state.navigate(Route::Records).unwrap();
    assert_eq!(state.route, Route::Login);
    assert_eq!(state.return_to, Some(Route::Records));

    session.apply_login(payload(Role::Student)).await;
    state.handle_event(Event::LoginSucceeded).await.unwrap();

    assert_eq!(state.route, Route::Records);
    assert_eq!(state.return_to, None);
    assert!(matches!(
        action_rx.try_recv().unwrap(),
        Action::LoadRecords { page: 1, count: 12 }
    ));
}

#[tokio::test]
async fn test_ctrl_c_cancels_an_active_run_instead_of_exiting() {
    let (mut state, mut action_rx) = state_with(Session::in_memory()).await;

    state
        .handle_event(Event::RunStateChanged(RunState::Polling))
        .await
        .unwrap();
    let quit = state.handle_event(Event::KeyboardCTRLC).await.unwrap();

    assert!(!quit);
    assert!(matches!(action_rx.try_recv().unwrap(), Action::CancelRun));
}

#[tokio::test]
async fn test_ctrl_c_twice_exits_when_idle() {
    let (mut state, _action_rx) = state_with(Session::in_memory()).await;

    assert!(!state.handle_event(Event::KeyboardCTRLC).await.unwrap());
    assert!(state.exit_warning);
    assert!(state.handle_event(Event::KeyboardCTRLC).await.unwrap());
}

#[tokio::test]
async fn test_resolved_run_replaces_transcript_but_cancelled_does_not() {
    let (mut state, _action_rx) = state_with(Session::in_memory()).await;

    let result = SubmissionResult {
        id: "sub_1".to_string(),
        status: SubmissionStatus::Accepted,
        status_id: "3".to_string(),
        stdout: Some("8".to_string()),
        compile_output: None,
        time: Some("0.01".to_string()),
        memory: Some(3456),
    };
    state
        .handle_event(Event::RunFinished(RunOutcome::Resolved(result)))
        .await
        .unwrap();
    let transcript = state.transcript.clone();
    assert!(transcript.contains("[Accepted]"));

    state
        .handle_event(Event::RunFinished(RunOutcome::Cancelled))
        .await
        .unwrap();
    assert_eq!(state.transcript, transcript);
}

#[tokio::test]
async fn test_language_cycle_only_replaces_an_untouched_buffer() {
    let (mut state, _action_rx) = state_with(Session::in_memory()).await;
    state.route = Route::Editor;

    assert_eq!(state.language, Language::Cpp);
    state.handle_event(Event::KeyboardCTRLL).await.unwrap();
    assert_eq!(state.language, Language::Java);
    assert_eq!(state.code.lines().join("\n"), Language::Java.template());

    state.code.insert_str("// edited");
    state.handle_event(Event::KeyboardCTRLL).await.unwrap();
    assert_eq!(state.language, Language::JavaScript);
    assert!(state.code.lines().join("\n").contains("// edited"));
}

#[tokio::test]
async fn test_edited_buffer_survives_a_restart_as_a_draft() {
    let dir = tempfile::tempdir().unwrap().into_path();

    let (mut state, _action_rx) = state_in(Session::in_memory(), dir.clone()).await;
    state.route = Route::Editor;
    state.handle_event(Event::KeyboardCTRLL).await.unwrap();
    state.code.insert_str("// resumed");
    state.save_draft().await;

    let (restored, _action_rx) = state_in(Session::in_memory(), dir.clone()).await;
    assert_eq!(restored.language, Language::Java);
    assert!(restored.code.lines().join("\n").contains("// resumed"));

    // Resetting the buffer back to the starter template clears the draft.
    let (mut cleared, _action_rx) = state_in(Session::in_memory(), dir.clone()).await;
    cleared.code = TextArea::from(cleared.language.template().lines());
    cleared.save_draft().await;

    let (after, _action_rx) = state_in(Session::in_memory(), dir).await;
    assert_eq!(after.language, Language::Cpp);
    assert_eq!(after.code.lines().join("\n"), Language::Cpp.template());
}

#[tokio::test]
async fn test_import_replaces_the_buffer_and_rejects_oversized_files() {
    let dir = tempfile::tempdir().unwrap().into_path();
    let source = dir.join("solution.cpp");
    tokio::fs::write(&source, "int main() { return 1; }")
        .await
        .unwrap();

    let (mut state, _action_rx) = state_with(Session::in_memory()).await;
    state.route = Route::Editor;

    state.handle_event(Event::KeyboardCTRLO).await.unwrap();
    state
        .import_prompt
        .as_mut()
        .unwrap()
        .insert_str(source.to_str().unwrap());
    state.handle_event(Event::KeyboardEnter).await.unwrap();

    assert!(state.import_prompt.is_none());
    assert_eq!(state.code.lines().join("\n"), "int main() { return 1; }");

    let oversized = dir.join("oversized.cpp");
    tokio::fs::write(&oversized, vec![b'x'; 1024 * 1024 + 1])
        .await
        .unwrap();
    state.handle_event(Event::KeyboardCTRLO).await.unwrap();
    state
        .import_prompt
        .as_mut()
        .unwrap()
        .insert_str(oversized.to_str().unwrap());
    state.handle_event(Event::KeyboardEnter).await.unwrap();

    // The buffer keeps the previous import; only a toast reports the guard.
    assert_eq!(state.code.lines().join("\n"), "int main() { return 1; }");
    assert_eq!(
        state.toasts.last().unwrap().toast.text,
        "The maximum file size is 1MB."
    );
}

#[tokio::test]
async fn test_export_writes_the_buffer_next_to_the_working_directory() {
    // Export targets the working directory, so point it at a scratch one.
    let dir = tempfile::tempdir().unwrap().into_path();
    std::env::set_current_dir(&dir).unwrap();

    let (mut state, _action_rx) = state_with(Session::in_memory()).await;
    state.route = Route::Editor;
    state.handle_event(Event::KeyboardCTRLE).await.unwrap();

    let exported = tokio::fs::read_to_string(dir.join("code.cpp")).await.unwrap();
    assert_eq!(exported, Language::Cpp.template());
}

#[tokio::test]
async fn test_esc_closes_the_import_prompt_without_leaving_the_editor() {
    let (mut state, _action_rx) = state_with(Session::in_memory()).await;
    state.route = Route::Editor;

    state.handle_event(Event::KeyboardCTRLO).await.unwrap();
    assert!(state.import_prompt.is_some());

    state.handle_event(Event::KeyboardEsc).await.unwrap();
    assert!(state.import_prompt.is_none());
    assert_eq!(state.route, Route::Editor);
}

#[tokio::test]
async fn test_auth_required_event_routes_to_login_and_records_origin() {
    let (mut state, _action_rx) = state_with(Session::in_memory()).await;
    state.route = Route::Records;

    state
        .handle_event(Event::AuthRequired(Route::Records))
        .await
        .unwrap();

    assert_eq!(state.route, Route::Login);
    assert_eq!(state.return_to, Some(Route::Records));
}

#[tokio::test]
async fn test_records_next_page_stops_at_the_last_page() {
    let (mut state, mut action_rx) = state_with(Session::in_memory()).await;
    state.route = Route::Records;
    state
        .handle_event(Event::RecordsLoaded(SubmissionPage {
            submissions: vec![],
            page: 1,
            count: 12,
            total: 12,
        }))
        .await
        .unwrap();

    let next = Input {
        key: Key::Char('n'),
        ctrl: false,
        alt: false,
        shift: false,
    };
    state
        .handle_event(Event::KeyboardCharInput(next))
        .await
        .unwrap();

    assert!(action_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_profile_avatar_path_alone_sends_a_reset_avatar_action() {
    let (mut state, mut action_rx) = state_with(Session::in_memory()).await;
    state.route = Route::Profile;
    state.profile_form.fields[2].input.insert_str("/tmp/avatar.png");

    state.handle_event(Event::KeyboardEnter).await.unwrap();

    assert!(matches!(
        action_rx.try_recv().unwrap(),
        Action::ResetAvatar { .. }
    ));
}

#[tokio::test]
async fn test_login_with_empty_fields_toasts_instead_of_submitting() {
    let (mut state, mut action_rx) = state_with(Session::in_memory()).await;
    state.route = Route::Login;

    state.handle_event(Event::KeyboardEnter).await.unwrap();

    assert!(action_rx.try_recv().is_err());
    assert_eq!(state.toasts.len(), 1);
}
