use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use codelab_api_types::AnalyticsQuery;
use codelab_client::ApiError;
use codelab_client::AvatarUpload;
use codelab_client::LabClient;
use codelab_client::RegisterForm;
use codelab_client::RunOutcome;
use codelab_client::SubmissionRunner;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::models::Action;
use crate::domain::models::Event;
use crate::domain::models::Route;
use crate::domain::models::Toast;

fn api_failure(
    err: ApiError,
    from: Route,
    event_tx: &mpsc::UnboundedSender<Event>,
) -> Result<()> {
    if err.is_auth_failure() {
        event_tx.send(Event::AuthRequired(from))?;
    }
    if let Some(toast) = Toast::from_api_error(&err) {
        event_tx.send(Event::ToastQueued(toast))?;
    }

    Ok(())
}

async fn read_avatar(path: &str) -> std::io::Result<AvatarUpload> {
    let bytes = tokio::fs::read(path).await?;
    let filename = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "avatar".to_string());

    Ok(AvatarUpload { filename, bytes })
}

async fn load_analytics(
    client: &LabClient,
    query: AnalyticsQuery,
    event_tx: &mpsc::UnboundedSender<Event>,
) -> Result<()> {
    match client.analytics().await {
        Ok(summary) => event_tx.send(Event::AnalyticsLoaded(summary))?,
        Err(err) => {
            // A failed summary means the rows would fail the same way.
            return api_failure(err, Route::Dashboard, event_tx);
        }
    }

    match client.analytics_rows(&query).await {
        Ok(rows) => event_tx.send(Event::AnalyticsRowsLoaded(rows))?,
        Err(err) => api_failure(err, Route::Dashboard, event_tx)?,
    }

    Ok(())
}

/// Backend worker: receives actions from the UI, talks to the lab API, and
/// reports back through events. Submission runs execute on their own task so
/// the worker stays responsive to a cancel while a run is polling.
pub struct ActionsService {}

impl ActionsService {
    pub async fn start(
        client: Arc<LabClient>,
        event_tx: mpsc::UnboundedSender<Event>,
        rx: &mut mpsc::UnboundedReceiver<Action>,
    ) -> Result<()> {
        let runner = Arc::new(SubmissionRunner::new(client.clone()));

        // Forward run phase changes to the UI as they happen.
        let mut state_rx = runner.subscribe();
        let state_event_tx = event_tx.clone();
        tokio::spawn(async move {
            while state_rx.changed().await.is_ok() {
                let state = *state_rx.borrow();
                if state_event_tx.send(Event::RunStateChanged(state)).is_err() {
                    break;
                }
            }
        });

        let mut run_cancel: Option<CancellationToken> = None;
        #[allow(unused_assignments)]
        let mut worker: JoinHandle<Result<()>> = tokio::spawn(async { Ok(()) });

        loop {
            if let Some(action) = rx.recv().await {
                match action {
                    Action::SubmitRun(request) => {
                        let still_running = run_cancel
                            .as_ref()
                            .map(|cancel| !cancel.is_cancelled())
                            .unwrap_or(false);
                        if still_running && !worker.is_finished() {
                            event_tx.send(Event::ToastQueued(Toast::info(
                                "A run is already in progress.",
                            )))?;
                            continue;
                        }
                        // A cancelled run winds down in microseconds.
                        let _ = (&mut worker).await;

                        let cancel = CancellationToken::new();
                        run_cancel = Some(cancel.clone());

                        let runner_worker = runner.clone();
                        let worker_event_tx = event_tx.clone();
                        worker = tokio::spawn(async move {
                            let outcome = runner_worker.run(request, cancel).await;

                            if let RunOutcome::Failed(err) = &outcome {
                                if err.is_auth_failure() {
                                    worker_event_tx.send(Event::AuthRequired(Route::Editor))?;
                                }
                                if let Some(toast) = Toast::from_api_error(err) {
                                    worker_event_tx.send(Event::ToastQueued(toast))?;
                                }
                            }
                            worker_event_tx.send(Event::RunFinished(outcome))?;

                            Ok(())
                        });
                    }
                    Action::CancelRun => {
                        if let Some(cancel) = &run_cancel {
                            cancel.cancel();
                        }
                    }
                    Action::Login(request) => match client.login(&request).await {
                        Ok(_) => {
                            event_tx.send(Event::LoginSucceeded)?;
                            event_tx.send(Event::ToastQueued(Toast::success("Signed in.")))?;
                        }
                        Err(err) => {
                            if let Some(toast) = Toast::from_api_error(&err) {
                                event_tx.send(Event::ToastQueued(toast))?;
                            }
                        }
                    },
                    Action::Logout => {
                        client.logout().await;
                        event_tx.send(Event::SessionCleared)?;
                        event_tx.send(Event::ToastQueued(Toast::info("Signed out.")))?;
                    }
                    Action::Register {
                        username,
                        email,
                        password,
                        avatar_path,
                    } => {
                        let avatar = match avatar_path {
                            Some(path) => match read_avatar(&path).await {
                                Ok(upload) => Some(upload),
                                Err(err) => {
                                    event_tx.send(Event::ToastQueued(Toast::error(&format!(
                                        "Could not read avatar {path}: {err}"
                                    ))))?;
                                    continue;
                                }
                            },
                            None => None,
                        };

                        let form = RegisterForm {
                            username,
                            email,
                            password,
                            avatar,
                        };
                        match client.register(&form).await {
                            Ok(_) => {
                                event_tx.send(Event::RegisterSucceeded)?;
                                event_tx.send(Event::ToastQueued(Toast::success(
                                    "Registered! You can sign in now.",
                                )))?;
                            }
                            Err(err) => {
                                if let Some(toast) = Toast::from_api_error(&err) {
                                    event_tx.send(Event::ToastQueued(toast))?;
                                }
                            }
                        }
                    }
                    Action::SetPersist(persist) => {
                        client.session().set_persist(persist).await;
                    }
                    Action::LoadRecords { page, count } => {
                        match client.submissions(page, count).await {
                            Ok(records) => event_tx.send(Event::RecordsLoaded(records))?,
                            Err(err) => api_failure(err, Route::Records, &event_tx)?,
                        }
                    }
                    Action::LoadAnalytics(query) => {
                        load_analytics(&client, query, &event_tx).await?;
                    }
                    Action::ResetAvatar { avatar_path } => {
                        match read_avatar(&avatar_path).await {
                            Ok(avatar) => match client.reset_avatar(&avatar).await {
                                Ok(_) => {
                                    event_tx.send(Event::ToastQueued(Toast::success(
                                        "Avatar updated.",
                                    )))?;
                                }
                                Err(err) => api_failure(err, Route::Profile, &event_tx)?,
                            },
                            Err(err) => {
                                event_tx.send(Event::ToastQueued(Toast::error(&format!(
                                    "Could not read avatar {avatar_path}: {err}"
                                ))))?;
                            }
                        }
                    }
                    Action::ResetPassword(request) => {
                        match client.reset_password(&request).await {
                            Ok(()) => {
                                event_tx
                                    .send(Event::ToastQueued(Toast::success("Password updated.")))?;
                            }
                            Err(err) => api_failure(err, Route::Profile, &event_tx)?,
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codelab_api_types::Language;
    use codelab_api_types::LoginRequest;
    use codelab_client::HttpClient;
    use codelab_client::RunRequest;
    use codelab_client::Session;

    fn spawn_service(
        base_url: &str,
    ) -> (
        mpsc::UnboundedSender<Action>,
        mpsc::UnboundedReceiver<Event>,
    ) {
        let client = Arc::new(LabClient::new(
            HttpClient::new(base_url).unwrap(),
            Session::in_memory(),
        ));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (action_tx, mut action_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            ActionsService::start(client, event_tx, &mut action_rx)
                .await
                .unwrap();
        });

        (action_tx, event_rx)
    }

    #[tokio::test]
    async fn test_login_action_reports_success_through_events() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/users/login")
            .with_status(200)
            .with_body(
                r#"{"statusCode": 200, "data": {"user": {"id": "u_1", "username": "ada", "email": "ada@example.com", "role": "student"}, "accessToken": "tok"}, "message": "ok", "success": true}"#,
            )
            .create_async()
            .await;

        let (action_tx, mut event_rx) = spawn_service(&server.url());
        action_tx
            .send(Action::Login(LoginRequest {
                email: "ada@example.com".to_string(),
                password: "hunter22".to_string(),
            }))
            .unwrap();

        assert!(matches!(
            event_rx.recv().await.unwrap(),
            Event::LoginSucceeded
        ));
    }

    #[tokio::test]
    async fn test_auth_failure_after_refresh_requests_login_with_origin() {
        let mut server = mockito::Server::new_async().await;
        let _records = server
            .mock("GET", "/submissions")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body(
                r#"{"statusCode": 401, "data": null, "message": "jwt expired", "success": false}"#,
            )
            .create_async()
            .await;
        let _refresh = server
            .mock("GET", "/users/refresh-token")
            .with_status(403)
            .with_body(
                r#"{"statusCode": 403, "data": null, "message": "No refresh session", "success": false}"#,
            )
            .create_async()
            .await;

        let (action_tx, mut event_rx) = spawn_service(&server.url());
        action_tx
            .send(Action::LoadRecords { page: 1, count: 12 })
            .unwrap();

        assert!(matches!(
            event_rx.recv().await.unwrap(),
            Event::AuthRequired(Route::Records)
        ));
        assert!(matches!(
            event_rx.recv().await.unwrap(),
            Event::ToastQueued(_)
        ));
    }

    #[tokio::test]
    async fn test_empty_source_run_fails_without_touching_the_network() {
        let server = mockito::Server::new_async().await;
        let (action_tx, mut event_rx) = spawn_service(&server.url());

        action_tx
            .send(Action::SubmitRun(RunRequest {
                source_code: "   ".to_string(),
                stdin: String::new(),
                expected_output: String::new(),
                language: Language::Cpp,
            }))
            .unwrap();

        loop {
            match event_rx.recv().await.unwrap() {
                Event::RunFinished(RunOutcome::Failed(err)) => {
                    assert_eq!(err.status_code(), Some(400));
                    break;
                }
                Event::RunStateChanged(_) | Event::ToastQueued(_) => continue,
                other => panic!("unexpected event {other:?}"),
            }
        }
    }
}
