//! Submission lifecycle runner
//!
//! Drives one code submission from creation to a terminal verdict: submit,
//! then poll the result endpoint on a fixed interval under a wall-clock
//! budget, with cooperative cancellation. The whole run is a single async
//! task; the interval and the deadline live inside its `tokio::select!`, so
//! every exit path drops both and no timer can outlive a run or fire twice.

use std::sync::Arc;
use std::time::Duration;

use codelab_api_types::Language;
use codelab_api_types::SubmitRequest;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::JudgeApi;
use crate::error::ApiError;

pub const POLL_INTERVAL: Duration = Duration::from_millis(1500);
pub const POLL_BUDGET: Duration = Duration::from_secs(20);

/// Observable phase of the active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Submitting,
    Polling,
    Resolved,
    TimedOut,
    Cancelled,
    Failed,
}

/// How a run ended. Exactly one of these is produced per run.
#[derive(Debug)]
pub enum RunOutcome {
    Resolved(codelab_api_types::SubmissionResult),
    TimedOut,
    Cancelled,
    Failed(ApiError),
}

/// Raw editor fields for one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub source_code: String,
    pub stdin: String,
    pub expected_output: String,
    pub language: Language,
}

pub struct SubmissionRunner {
    api: Arc<dyn JudgeApi>,
    interval: Duration,
    budget: Duration,
    state_tx: watch::Sender<RunState>,
}

impl SubmissionRunner {
    pub fn new(api: Arc<dyn JudgeApi>) -> SubmissionRunner {
        let (state_tx, _) = watch::channel(RunState::Idle);
        SubmissionRunner {
            api,
            interval: POLL_INTERVAL,
            budget: POLL_BUDGET,
            state_tx,
        }
    }

    /// Override the polling cadence; tests shrink both.
    pub fn with_timing(mut self, interval: Duration, budget: Duration) -> SubmissionRunner {
        self.interval = interval;
        self.budget = budget;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: RunState) {
        // send_replace updates the channel even with no receiver attached.
        self.state_tx.send_replace(state);
    }

    /// Drive one submission to its outcome.
    ///
    /// Cancellation is checked before every suspension point and also aborts
    /// an in-flight request, so no late response is ever applied after the
    /// caller cancels. The deadline races the in-flight fetch as well as the
    /// idle wait, so the budget bounds the whole run; a poll error that has
    /// already completed still beats an impending timeout.
    pub async fn run(&self, request: RunRequest, cancel: CancellationToken) -> RunOutcome {
        let run_id = Uuid::new_v4();
        self.set_state(RunState::Submitting);

        if request.source_code.trim().is_empty() {
            self.set_state(RunState::Failed);
            return RunOutcome::Failed(ApiError::Status {
                status: Some(400),
                message: "Source code is empty!".to_string(),
            });
        }

        let submit = SubmitRequest::from_editor(
            &request.source_code,
            &request.stdin,
            &request.expected_output,
            request.language,
        );

        let submission = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.set_state(RunState::Cancelled);
                return RunOutcome::Cancelled;
            }
            submitted = self.api.submit(submit) => match submitted {
                Ok(submission) => submission,
                Err(err) => {
                    log::debug!("run {run_id}: submit failed: {err}");
                    self.set_state(RunState::Failed);
                    return RunOutcome::Failed(err);
                }
            },
        };

        log::debug!("run {run_id}: submitted as {}", submission.id);
        self.set_state(RunState::Polling);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let deadline = tokio::time::sleep(self.budget);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::debug!("run {run_id}: cancelled");
                    self.set_state(RunState::Cancelled);
                    return RunOutcome::Cancelled;
                }
                _ = ticker.tick() => {
                    // The budget keeps running while a fetch is in flight; a
                    // slow response cannot stretch the run past the deadline.
                    let fetched = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            log::debug!("run {run_id}: cancelled mid-poll");
                            self.set_state(RunState::Cancelled);
                            return RunOutcome::Cancelled;
                        }
                        fetched = self.api.fetch_result(&submission.id) => fetched,
                        _ = &mut deadline => {
                            log::debug!("run {run_id}: polling budget elapsed mid-poll");
                            self.set_state(RunState::TimedOut);
                            return RunOutcome::TimedOut;
                        }
                    };

                    match fetched {
                        Ok(result) if result.status.is_terminal() => {
                            log::debug!("run {run_id}: resolved as {}", result.status.description());
                            self.set_state(RunState::Resolved);
                            return RunOutcome::Resolved(result);
                        }
                        Ok(_) => {}
                        Err(err) => {
                            log::debug!("run {run_id}: poll failed: {err}");
                            self.set_state(RunState::Failed);
                            return RunOutcome::Failed(err);
                        }
                    }
                }
                _ = &mut deadline => {
                    log::debug!("run {run_id}: polling budget elapsed");
                    self.set_state(RunState::TimedOut);
                    return RunOutcome::TimedOut;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codelab_api_types::Submission;
    use codelab_api_types::SubmissionResult;
    use codelab_api_types::SubmissionStatus;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    struct MockJudge {
        submit_error: Option<ApiError>,
        responses: Mutex<VecDeque<Result<SubmissionResult, ApiError>>>,
        fetch_delay: Option<Duration>,
        submits: AtomicUsize,
        fetches: AtomicUsize,
    }

    impl MockJudge {
        fn with_responses(
            responses: Vec<Result<SubmissionResult, ApiError>>,
        ) -> Arc<MockJudge> {
            Arc::new(MockJudge {
                submit_error: None,
                responses: Mutex::new(responses.into()),
                fetch_delay: None,
                submits: AtomicUsize::new(0),
                fetches: AtomicUsize::new(0),
            })
        }

        fn failing_submit(err: ApiError) -> Arc<MockJudge> {
            Arc::new(MockJudge {
                submit_error: Some(err),
                responses: Mutex::new(VecDeque::new()),
                fetch_delay: None,
                submits: AtomicUsize::new(0),
                fetches: AtomicUsize::new(0),
            })
        }

        fn slow_fetch(
            delay: Duration,
            responses: Vec<Result<SubmissionResult, ApiError>>,
        ) -> Arc<MockJudge> {
            Arc::new(MockJudge {
                submit_error: None,
                responses: Mutex::new(responses.into()),
                fetch_delay: Some(delay),
                submits: AtomicUsize::new(0),
                fetches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl JudgeApi for MockJudge {
        async fn submit(&self, request: SubmitRequest) -> Result<Submission, ApiError> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.submit_error {
                return Err(err.clone());
            }
            Ok(Submission {
                id: "sub_1".to_string(),
                source_code: request.source_code,
                stdin: request.stdin,
                expected_output: Some(request.expected_output),
                language_id: request.language_id,
                status: SubmissionStatus::InQueue,
                created_at: None,
            })
        }

        async fn fetch_result(&self, _id: &str) -> Result<SubmissionResult, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.fetch_delay {
                tokio::time::sleep(delay).await;
            }
            // An exhausted script keeps reporting Processing.
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(processing()))
        }
    }

    fn processing() -> SubmissionResult {
        SubmissionResult {
            id: "sub_1".to_string(),
            status: SubmissionStatus::Processing,
            status_id: "2".to_string(),
            stdout: None,
            compile_output: None,
            time: None,
            memory: None,
        }
    }

    fn accepted() -> SubmissionResult {
        SubmissionResult {
            id: "sub_1".to_string(),
            status: SubmissionStatus::Accepted,
            status_id: "3".to_string(),
            stdout: Some("8".to_string()),
            compile_output: None,
            time: Some("0.01".to_string()),
            memory: Some(3456),
        }
    }

    fn request() -> RunRequest {
        RunRequest {
            source_code: "int main() { return 0; }".to_string(),
            stdin: String::new(),
            expected_output: String::new(),
            language: Language::Cpp,
        }
    }

    fn runner(api: Arc<MockJudge>) -> SubmissionRunner {
        SubmissionRunner::new(api)
            .with_timing(Duration::from_millis(10), Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_two_processing_then_accepted_takes_exactly_three_polls() {
        let api = MockJudge::with_responses(vec![
            Ok(processing()),
            Ok(processing()),
            Ok(accepted()),
        ]);
        let outcome = runner(api.clone()).run(request(), CancellationToken::new()).await;

        match outcome {
            RunOutcome::Resolved(result) => {
                assert_eq!(result.status, SubmissionStatus::Accepted);
                assert_eq!(result.stdout.as_deref(), Some("8"));
            }
            other => panic!("expected Resolved, got {other:?}"),
        }
        assert_eq!(api.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_terminal_response_within_budget_times_out() {
        let api = MockJudge::with_responses(vec![]);
        let outcome = SubmissionRunner::new(api.clone())
            .with_timing(Duration::from_millis(5), Duration::from_millis(40))
            .run(request(), CancellationToken::new())
            .await;

        assert!(matches!(outcome, RunOutcome::TimedOut));
        assert!(api.fetches.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_budget_interrupts_a_fetch_still_in_flight() {
        // The only scripted response is terminal, but it arrives after the
        // budget; the run must time out instead of waiting it out.
        let api = MockJudge::slow_fetch(Duration::from_millis(400), vec![Ok(accepted())]);
        let started = std::time::Instant::now();

        let outcome = SubmissionRunner::new(api.clone())
            .with_timing(Duration::from_millis(5), Duration::from_millis(50))
            .run(request(), CancellationToken::new())
            .await;

        assert!(matches!(outcome, RunOutcome::TimedOut));
        assert!(started.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_cancel_stops_polling_and_no_late_mutation_follows() {
        let api = MockJudge::with_responses(vec![]);
        let runner = Arc::new(runner(api.clone()));
        let cancel = CancellationToken::new();

        let task = {
            let runner = runner.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { runner.run(request(), cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(25)).await;
        cancel.cancel();
        // Idempotent: a second cancel is a no-op.
        cancel.cancel();

        let outcome = task.await.unwrap();
        assert!(matches!(outcome, RunOutcome::Cancelled));

        let fetches_at_cancel = api.fetches.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(api.fetches.load(Ordering::SeqCst), fetches_at_cancel);
        assert_eq!(*runner.subscribe().borrow(), RunState::Cancelled);
    }

    #[tokio::test]
    async fn test_phase_changes_without_a_subscriber_are_retained() {
        let api = MockJudge::with_responses(vec![Ok(accepted())]);
        let runner = runner(api);

        let outcome = runner.run(request(), CancellationToken::new()).await;

        assert!(matches!(outcome, RunOutcome::Resolved(_)));
        // A subscriber attaching only now still sees the final phase.
        assert_eq!(*runner.subscribe().borrow(), RunState::Resolved);
    }

    #[tokio::test]
    async fn test_cancel_before_submit_skips_the_network_entirely() {
        let api = MockJudge::with_responses(vec![]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = runner(api.clone()).run(request(), cancel).await;

        assert!(matches!(outcome, RunOutcome::Cancelled));
        assert_eq!(api.submits.load(Ordering::SeqCst), 0);
        assert_eq!(api.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_source_fails_as_400_without_submitting() {
        let api = MockJudge::with_responses(vec![]);
        let mut empty = request();
        empty.source_code = "   \n".to_string();

        let outcome = runner(api.clone()).run(empty, CancellationToken::new()).await;

        match outcome {
            RunOutcome::Failed(err) => {
                assert_eq!(err.status_code(), Some(400));
                assert_eq!(err.toast().unwrap(), "Source code is empty!");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(api.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_poll_error_ends_the_run_and_beats_the_deadline() {
        let api = MockJudge::with_responses(vec![
            Ok(processing()),
            Err(ApiError::Status {
                status: Some(404),
                message: "No such submission".to_string(),
            }),
        ]);
        let outcome = runner(api.clone()).run(request(), CancellationToken::new()).await;

        match outcome {
            RunOutcome::Failed(err) => assert_eq!(err.status_code(), Some(404)),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(api.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_submit_auth_failure_is_surfaced_not_retried_here() {
        let api = MockJudge::failing_submit(ApiError::Status {
            status: Some(401),
            message: "jwt expired".to_string(),
        });
        let outcome = runner(api.clone()).run(request(), CancellationToken::new()).await;

        match outcome {
            RunOutcome::Failed(err) => assert!(err.is_auth_failure()),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(api.submits.load(Ordering::SeqCst), 1);
        assert_eq!(api.fetches.load(Ordering::SeqCst), 0);
    }
}
