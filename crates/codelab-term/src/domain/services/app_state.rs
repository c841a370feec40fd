use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;

use anyhow::Result;
use codelab_api_types::AnalyticsQuery;
use codelab_api_types::AnalyticsRowPage;
use codelab_api_types::AnalyticsSummary;
use codelab_api_types::Language;
use codelab_api_types::LoginRequest;
use codelab_api_types::ResetPasswordRequest;
use codelab_api_types::Role;
use codelab_api_types::SubmissionPage;
use codelab_client::transcript;
use codelab_client::RunOutcome;
use codelab_client::RunRequest;
use codelab_client::RunState;
use codelab_client::Session;
use ratatui::style::Style;
use tokio::sync::mpsc;
use tui_textarea::Input;
use tui_textarea::Key;
use tui_textarea::TextArea;

use crate::domain::models::Action;
use crate::domain::models::Event;
use crate::domain::models::Gate;
use crate::domain::models::Route;
use crate::domain::models::Toast;

#[cfg(test)]
#[path = "app_state_test.rs"]
mod tests;

const TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_IMPORT_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorPane {
    Code,
    Stdin,
    Expected,
}

pub struct FormField<'a> {
    pub label: &'static str,
    pub input: TextArea<'a>,
}

/// A vertical stack of single-line inputs with one focused field.
pub struct Form<'a> {
    pub fields: Vec<FormField<'a>>,
    pub focus: usize,
}

impl<'a> Form<'a> {
    fn new(fields: &[(&'static str, bool)]) -> Form<'a> {
        let fields = fields
            .iter()
            .copied()
            .map(|(label, masked)| {
                let mut input = TextArea::default();
                input.set_cursor_line_style(Style::default());
                if masked {
                    input.set_mask_char('•');
                }
                return FormField { label, input };
            })
            .collect();

        return Form { fields, focus: 0 };
    }

    pub fn value(&self, index: usize) -> String {
        return self.fields[index]
            .input
            .lines()
            .first()
            .cloned()
            .unwrap_or_default();
    }

    pub fn focused_mut(&mut self) -> &mut TextArea<'a> {
        return &mut self.fields[self.focus].input;
    }

    fn next(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    fn clear(&mut self) {
        for field in &mut self.fields {
            field.input.select_all();
            field.input.cut();
        }
        self.focus = 0;
    }
}

pub struct ActiveToast {
    pub toast: Toast,
    expires_at: Instant,
}

pub struct AppStateProps {
    pub action_tx: mpsc::UnboundedSender<Action>,
    pub session: Session,
    pub records_page_size: u32,
    pub state_dir: PathBuf,
}

fn draft_path(dir: &Path, language: Language) -> PathBuf {
    return dir.join(format!("draft.{}", language.key()));
}

async fn load_draft(dir: &Path) -> Option<(Language, String)> {
    for language in Language::ALL {
        if let Ok(code) = tokio::fs::read_to_string(draft_path(dir, language)).await {
            return Some((language, code));
        }
    }
    return None;
}

pub struct AppState<'a> {
    action_tx: mpsc::UnboundedSender<Action>,
    session: Session,
    state_dir: PathBuf,
    pub route: Route,
    pub return_to: Option<Route>,
    pub authenticated: bool,
    pub username: Option<String>,
    pub role: Option<Role>,
    pub persist: bool,
    pub language: Language,
    pub code: TextArea<'a>,
    pub stdin_input: TextArea<'a>,
    pub expected_output: TextArea<'a>,
    pub editor_focus: EditorPane,
    pub import_prompt: Option<TextArea<'a>>,
    pub transcript: String,
    pub transcript_scroll: u16,
    pub run_state: RunState,
    pub records: Option<SubmissionPage>,
    pub records_page: u32,
    pub records_page_size: u32,
    pub analytics: Option<AnalyticsSummary>,
    pub analytics_rows: Option<AnalyticsRowPage>,
    pub login_form: Form<'a>,
    pub register_form: Form<'a>,
    pub profile_form: Form<'a>,
    pub toasts: Vec<ActiveToast>,
    pub exit_warning: bool,
}

impl<'a> AppState<'a> {
    pub async fn new(props: AppStateProps) -> AppState<'a> {
        let language = Language::Cpp;

        let mut app_state = AppState {
            action_tx: props.action_tx,
            session: props.session,
            state_dir: props.state_dir,
            route: Route::Home,
            return_to: None,
            authenticated: false,
            username: None,
            role: None,
            persist: false,
            language,
            code: TextArea::from(language.template().lines()),
            stdin_input: TextArea::default(),
            expected_output: TextArea::default(),
            editor_focus: EditorPane::Code,
            import_prompt: None,
            transcript: String::new(),
            transcript_scroll: 0,
            run_state: RunState::Idle,
            records: None,
            records_page: 1,
            records_page_size: props.records_page_size,
            analytics: None,
            analytics_rows: None,
            login_form: Form::new(&[("Email", false), ("Password", true)]),
            register_form: Form::new(&[
                ("Username", false),
                ("Email", false),
                ("Password", true),
                ("Avatar path (optional)", false),
            ]),
            profile_form: Form::new(&[
                ("Current password", true),
                ("New password", true),
                ("New avatar path (optional)", false),
            ]),
            toasts: vec![],
            exit_warning: false,
        };

        if let Some((language, code)) = load_draft(&app_state.state_dir).await {
            app_state.language = language;
            app_state.code = TextArea::from(code.lines());
        }

        app_state.refresh_identity().await;
        return app_state;
    }

    /// Persist an edited, unsubmitted code buffer so it survives a restart.
    /// An empty or untouched buffer clears any stored draft instead.
    pub async fn save_draft(&self) {
        for language in Language::ALL {
            let _ = tokio::fs::remove_file(draft_path(&self.state_dir, language)).await;
        }

        let code = self.code.lines().join("\n");
        if code.trim().is_empty() || code == self.language.template() {
            return;
        }

        if let Err(err) = tokio::fs::create_dir_all(&self.state_dir).await {
            log::debug!("could not create the state directory for a draft: {err}");
            return;
        }
        if let Err(err) =
            tokio::fs::write(draft_path(&self.state_dir, self.language), code).await
        {
            log::debug!("could not save the editor draft: {err}");
        }
    }

    async fn refresh_identity(&mut self) {
        self.authenticated = self.session.is_authenticated().await;
        self.username = self.session.user().await.map(|user| user.username);
        self.role = self.session.role().await;
        self.persist = self.session.persist().await;
    }

    fn send(&self, action: Action) -> Result<()> {
        self.action_tx.send(action)?;
        return Ok(());
    }

    pub fn run_active(&self) -> bool {
        return matches!(self.run_state, RunState::Submitting | RunState::Polling);
    }

    fn add_toast(&mut self, toast: Toast) {
        self.toasts.push(ActiveToast {
            toast,
            expires_at: Instant::now() + TOAST_TTL,
        });
    }

    fn prune_toasts(&mut self) {
        let now = Instant::now();
        self.toasts.retain(|active| active.expires_at > now);
    }

    /// Apply the route guard and switch views. Entering a data-backed view
    /// kicks off its load; the view renders a placeholder until the matching
    /// event lands.
    pub fn navigate(&mut self, route: Route) -> Result<()> {
        match route.resolve(self.authenticated, self.role) {
            Gate::Allow => {
                self.route = route;
                match route {
                    Route::Records => {
                        self.send(Action::LoadRecords {
                            page: self.records_page,
                            count: self.records_page_size,
                        })?;
                    }
                    Route::Dashboard => {
                        self.send(Action::LoadAnalytics(AnalyticsQuery {
                            page: 1,
                            count: self.records_page_size,
                            ..AnalyticsQuery::default()
                        }))?;
                    }
                    _ => {}
                }
            }
            Gate::Login { from } => {
                self.return_to = Some(from);
                self.route = Route::Login;
            }
            Gate::NotFound => {
                self.route = Route::NotFound;
            }
        }

        return Ok(());
    }

    fn focused_editor_mut(&mut self) -> &mut TextArea<'a> {
        match self.editor_focus {
            EditorPane::Code => return &mut self.code,
            EditorPane::Stdin => return &mut self.stdin_input,
            EditorPane::Expected => return &mut self.expected_output,
        }
    }

    fn submit_run(&mut self) -> Result<()> {
        if self.run_active() {
            self.add_toast(Toast::info("A run is already in progress."));
            return Ok(());
        }

        return self.send(Action::SubmitRun(RunRequest {
            source_code: self.code.lines().join("\n"),
            stdin: self.stdin_input.lines().join("\n"),
            expected_output: self.expected_output.lines().join("\n"),
            language: self.language,
        }));
    }

    /// Write the code buffer to `code.<language key>` in the working
    /// directory, the terminal counterpart of the browser's file download.
    async fn export_code(&mut self) {
        let path = format!("code.{}", self.language.key());
        match tokio::fs::write(&path, self.code.lines().join("\n")).await {
            Ok(()) => self.add_toast(Toast::success(&format!("Exported to {path}."))),
            Err(err) => {
                self.add_toast(Toast::error(&format!("Could not export {path}: {err}")));
            }
        }
    }

    /// Replace the code buffer with a file's contents, guarding against
    /// oversized files before reading them.
    async fn import_code(&mut self, path: String) {
        let path = path.trim().to_string();
        if path.is_empty() {
            return;
        }

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.len() > MAX_IMPORT_SIZE => {
                self.add_toast(Toast::error("The maximum file size is 1MB."));
                return;
            }
            Err(err) => {
                self.add_toast(Toast::error(&format!("Could not read {path}: {err}")));
                return;
            }
            Ok(_) => {}
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                self.code = TextArea::from(text.lines());
                self.add_toast(Toast::success(&format!("Imported {path}.")));
            }
            Err(err) => {
                self.add_toast(Toast::error(&format!("Could not read {path}: {err}")));
            }
        }
    }

    /// Switch to the next language. An untouched buffer follows along with
    /// the new language's starter template; edited code is left alone.
    fn cycle_language(&mut self) {
        let index = Language::ALL
            .iter()
            .position(|lang| *lang == self.language)
            .unwrap_or(0);
        let next = Language::ALL[(index + 1) % Language::ALL.len()];

        let current = self.code.lines().join("\n");
        if current.trim().is_empty() || current == self.language.template() {
            self.code = TextArea::from(next.template().lines());
        }
        self.language = next;
    }

    fn apply_outcome(&mut self, outcome: RunOutcome) {
        match outcome {
            RunOutcome::Resolved(result) => {
                self.transcript = transcript::render(&result);
                self.transcript_scroll = 0;
            }
            RunOutcome::TimedOut => {
                self.transcript = transcript::timed_out();
                self.transcript_scroll = 0;
            }
            // Neither cancellation nor a failed call touches the last
            // transcript; failures surface as toasts instead.
            RunOutcome::Cancelled | RunOutcome::Failed(_) => {}
        }
    }

    fn handle_enter(&mut self) -> Result<bool> {
        match self.route {
            Route::Editor => {
                self.focused_editor_mut().insert_newline();
            }
            Route::Login => {
                let email = self.login_form.value(0).trim().to_string();
                let password = self.login_form.value(1);
                if email.is_empty() || password.is_empty() {
                    self.add_toast(Toast::error("Email and password are required."));
                    return Ok(false);
                }
                self.send(Action::Login(LoginRequest { email, password }))?;
            }
            Route::Register => {
                let username = self.register_form.value(0).trim().to_string();
                let email = self.register_form.value(1).trim().to_string();
                let password = self.register_form.value(2);
                if username.is_empty() || email.is_empty() || password.is_empty() {
                    self.add_toast(Toast::error(
                        "Username, email, and password are required.",
                    ));
                    return Ok(false);
                }
                let avatar = self.register_form.value(3).trim().to_string();
                self.send(Action::Register {
                    username,
                    email,
                    password,
                    avatar_path: if avatar.is_empty() { None } else { Some(avatar) },
                })?;
            }
            Route::Profile => {
                let old_password = self.profile_form.value(0);
                let new_password = self.profile_form.value(1);
                let avatar = self.profile_form.value(2).trim().to_string();

                let change_password = !old_password.is_empty() || !new_password.is_empty();
                if change_password && (old_password.is_empty() || new_password.is_empty()) {
                    self.add_toast(Toast::error("Both password fields are required."));
                    return Ok(false);
                }
                if !change_password && avatar.is_empty() {
                    self.add_toast(Toast::error("Nothing to update."));
                    return Ok(false);
                }

                if change_password {
                    self.send(Action::ResetPassword(ResetPasswordRequest {
                        old_password,
                        new_password,
                    }))?;
                }
                if !avatar.is_empty() {
                    self.send(Action::ResetAvatar {
                        avatar_path: avatar,
                    })?;
                }
                self.profile_form.clear();
            }
            _ => {}
        }

        return Ok(false);
    }

    fn handle_char_input(&mut self, input: Input) -> Result<bool> {
        match self.route {
            Route::Home => match input {
                Input {
                    key: Key::Char('q'),
                    ..
                } => return Ok(true),
                Input {
                    key: Key::Char('1'),
                    ..
                } => self.navigate(Route::Editor)?,
                Input {
                    key: Key::Char('2'),
                    ..
                } => self.navigate(Route::Records)?,
                Input {
                    key: Key::Char('3'),
                    ..
                } => self.navigate(Route::Dashboard)?,
                Input {
                    key: Key::Char('4'),
                    ..
                } => self.navigate(Route::Profile)?,
                Input {
                    key: Key::Char('5'),
                    ..
                } => {
                    if self.authenticated {
                        self.send(Action::Logout)?;
                    } else {
                        self.navigate(Route::Login)?;
                    }
                }
                Input {
                    key: Key::Char('6'),
                    ..
                } => self.navigate(Route::Register)?,
                _ => {}
            },
            Route::Editor => {
                if let Some(prompt) = &mut self.import_prompt {
                    prompt.input(input);
                } else {
                    self.focused_editor_mut().input(input);
                }
            }
            Route::Records => match input {
                Input {
                    key: Key::Char('n'),
                    ..
                } => {
                    if let Some(records) = &self.records {
                        let seen = u64::from(records.page) * u64::from(records.count);
                        if seen < records.total {
                            self.send(Action::LoadRecords {
                                page: records.page + 1,
                                count: self.records_page_size,
                            })?;
                        }
                    }
                }
                Input {
                    key: Key::Char('p'),
                    ..
                } => {
                    if self.records_page > 1 {
                        self.send(Action::LoadRecords {
                            page: self.records_page - 1,
                            count: self.records_page_size,
                        })?;
                    }
                }
                _ => {}
            },
            Route::Login => {
                self.login_form.focused_mut().input(input);
            }
            Route::Register => {
                self.register_form.focused_mut().input(input);
            }
            Route::Profile => {
                self.profile_form.focused_mut().input(input);
            }
            Route::Dashboard | Route::NotFound => {}
        }

        return Ok(false);
    }

    /// Returns true when the loop should exit.
    pub async fn handle_event(&mut self, event: Event) -> Result<bool> {
        if !matches!(event, Event::KeyboardCTRLC | Event::UITick) {
            self.exit_warning = false;
        }

        match event {
            Event::UITick => self.prune_toasts(),
            Event::UIScrollUp => {
                self.transcript_scroll = self.transcript_scroll.saturating_sub(1);
            }
            Event::UIScrollDown => {
                self.transcript_scroll = self.transcript_scroll.saturating_add(1);
            }
            Event::ToastQueued(toast) => self.add_toast(toast),
            Event::AuthRequired(from) => {
                self.refresh_identity().await;
                self.return_to = Some(from);
                self.route = Route::Login;
            }
            Event::SessionCleared => {
                self.refresh_identity().await;
                self.route = Route::Home;
            }
            Event::LoginSucceeded => {
                self.refresh_identity().await;
                self.login_form.clear();
                let target = self.return_to.take().unwrap_or(Route::Home);
                self.navigate(target)?;
            }
            Event::RegisterSucceeded => {
                self.register_form.clear();
                self.route = Route::Login;
            }
            Event::RunStateChanged(state) => self.run_state = state,
            Event::RunFinished(outcome) => self.apply_outcome(outcome),
            Event::RecordsLoaded(page) => {
                self.records_page = page.page;
                self.records = Some(page);
            }
            Event::AnalyticsLoaded(summary) => self.analytics = Some(summary),
            Event::AnalyticsRowsLoaded(rows) => self.analytics_rows = Some(rows),
            Event::KeyboardCTRLC => {
                if self.run_active() {
                    self.send(Action::CancelRun)?;
                } else if self.exit_warning {
                    return Ok(true);
                } else {
                    self.exit_warning = true;
                    self.add_toast(Toast::info("Press CTRL+C again to quit."));
                }
            }
            Event::KeyboardEsc => {
                if self.route == Route::Editor && self.import_prompt.is_some() {
                    self.import_prompt = None;
                } else if self.run_active() {
                    self.send(Action::CancelRun)?;
                } else if self.route != Route::Home {
                    self.navigate(Route::Home)?;
                }
            }
            Event::KeyboardCTRLR => match self.route {
                Route::Editor => self.submit_run()?,
                Route::Records => self.send(Action::LoadRecords {
                    page: self.records_page,
                    count: self.records_page_size,
                })?,
                Route::Dashboard => self.send(Action::LoadAnalytics(AnalyticsQuery {
                    page: 1,
                    count: self.records_page_size,
                    ..AnalyticsQuery::default()
                }))?,
                _ => {}
            },
            Event::KeyboardCTRLE => {
                if self.route == Route::Editor {
                    self.export_code().await;
                }
            }
            Event::KeyboardCTRLL => {
                if self.route == Route::Editor {
                    self.cycle_language();
                }
            }
            Event::KeyboardCTRLO => {
                if self.route == Route::Editor && self.import_prompt.is_none() {
                    let mut prompt = TextArea::default();
                    prompt.set_cursor_line_style(Style::default());
                    self.import_prompt = Some(prompt);
                }
            }
            Event::KeyboardCTRLP => {
                if self.route == Route::Login {
                    self.persist = !self.persist;
                    self.send(Action::SetPersist(self.persist))?;
                }
            }
            Event::KeyboardTab => match self.route {
                Route::Editor => {
                    self.editor_focus = match self.editor_focus {
                        EditorPane::Code => EditorPane::Stdin,
                        EditorPane::Stdin => EditorPane::Expected,
                        EditorPane::Expected => EditorPane::Code,
                    };
                }
                Route::Login => self.login_form.next(),
                Route::Register => self.register_form.next(),
                Route::Profile => self.profile_form.next(),
                _ => {}
            },
            Event::KeyboardEnter => {
                if self.route == Route::Editor {
                    if let Some(prompt) = self.import_prompt.take() {
                        let path = prompt.lines().first().cloned().unwrap_or_default();
                        self.import_code(path).await;
                        return Ok(false);
                    }
                }
                return self.handle_enter();
            }
            Event::KeyboardPaste(text) => match self.route {
                Route::Editor => {
                    if let Some(prompt) = &mut self.import_prompt {
                        prompt.insert_str(&text);
                    } else {
                        self.focused_editor_mut().insert_str(&text);
                    }
                }
                Route::Login => {
                    self.login_form.focused_mut().insert_str(&text);
                }
                Route::Register => {
                    self.register_form.focused_mut().insert_str(&text);
                }
                Route::Profile => {
                    self.profile_form.focused_mut().insert_str(&text);
                }
                _ => {}
            },
            Event::KeyboardCharInput(input) => return self.handle_char_input(input),
        }

        return Ok(false);
    }
}
