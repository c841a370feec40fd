use std::io;

use anyhow::Result;
use codelab_api_types::Language;
use codelab_client::RunState;
use crossterm::event::DisableBracketedPaste;
use crossterm::event::DisableMouseCapture;
use crossterm::event::EnableBracketedPaste;
use crossterm::event::EnableMouseCapture;
use crossterm::execute;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Alignment;
use ratatui::layout::Constraint;
use ratatui::layout::Direction;
use ratatui::layout::Layout;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::widgets::BarChart;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Cell;
use ratatui::widgets::Clear;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Row;
use ratatui::widgets::Table;
use ratatui::widgets::Wrap;
use ratatui::Frame;
use ratatui::Terminal;

use crate::domain::models::Route;
use crate::domain::models::ToastKind;
use crate::domain::services::app_state::EditorPane;
use crate::domain::services::app_state::Form;
use crate::domain::services::AppState;
use crate::domain::services::AppStateProps;
use crate::domain::services::EventsService;

/// Tears the terminal back to cooked mode from a panic handler, where no
/// terminal handle is reachable and failures cannot be reported anyway.
pub fn destruct_terminal_for_panic() {
    let _ = disable_raw_mode();
    let _ = execute!(
        io::stdout(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    );
    let _ = execute!(io::stdout(), crossterm::cursor::Show);
}

pub async fn start_loop(props: AppStateProps, events: &mut EventsService) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app_state = AppState::new(props).await;

    loop {
        terminal.draw(|frame| render(frame, &mut app_state))?;
        let event = events.next().await?;
        if app_state.handle_event(event).await? {
            break;
        }
    }

    app_state.save_draft().await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    return Ok(());
}

fn render(frame: &mut Frame<'_>, state: &mut AppState<'_>) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, chunks[0], state);

    match state.route {
        Route::Home => render_home(frame, chunks[1], state),
        Route::Editor => render_editor(frame, chunks[1], state),
        Route::Records => render_records(frame, chunks[1], state),
        Route::Dashboard => render_dashboard(frame, chunks[1], state),
        Route::Profile => render_form(
            frame,
            chunks[1],
            "Change password",
            &mut state.profile_form,
            &[],
        ),
        Route::Login => {
            let persist = if state.persist { "[x]" } else { "[ ]" };
            let extra = format!("{persist} Remember this device (CTRL+P)");
            render_form(frame, chunks[1], "Sign in", &mut state.login_form, &[extra]);
        }
        Route::Register => render_form(
            frame,
            chunks[1],
            "Create an account",
            &mut state.register_form,
            &[],
        ),
        Route::NotFound => render_not_found(frame, chunks[1]),
    }

    render_footer(frame, chunks[2], state);
    render_toasts(frame, area, state);
}

fn render_header(frame: &mut Frame<'_>, area: Rect, state: &AppState<'_>) {
    let identity = match &state.username {
        Some(username) => username.clone(),
        None => "signed out".to_string(),
    };
    let header = Paragraph::new(format!(" {}  |  {}", state.route.title(), identity))
        .style(Style::default().add_modifier(Modifier::REVERSED));

    frame.render_widget(header, area);
}

fn render_footer(frame: &mut Frame<'_>, area: Rect, state: &AppState<'_>) {
    let hints = match state.route {
        Route::Home => "1-6 select  q quit",
        Route::Editor => {
            "CTRL+R run  CTRL+L language  CTRL+E export  CTRL+O import  TAB pane  ESC home"
        }
        Route::Records => "n/p page  CTRL+R reload  ESC home",
        Route::Dashboard => "CTRL+R reload  ESC home",
        Route::Login => "ENTER sign in  TAB field  CTRL+P remember  ESC home",
        Route::Register | Route::Profile => "ENTER submit  TAB field  ESC home",
        Route::NotFound => "ESC home",
    };

    frame.render_widget(
        Paragraph::new(format!(" {hints}")).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn render_home(frame: &mut Frame<'_>, area: Rect, state: &AppState<'_>) {
    let session_entry = if state.authenticated {
        "  5. Sign out"
    } else {
        "  5. Sign in"
    };

    let lines = vec![
        "".to_string(),
        "  CodeLab - write, run, and judge code from your terminal.".to_string(),
        "".to_string(),
        "  1. Editor".to_string(),
        "  2. My submissions".to_string(),
        "  3. Analytics (admin)".to_string(),
        "  4. Profile".to_string(),
        session_entry.to_string(),
        "  6. Register".to_string(),
    ];

    frame.render_widget(Paragraph::new(lines.join("\n")), area);
}

fn render_not_found(frame: &mut Frame<'_>, area: Rect) {
    let body = Paragraph::new("\n\n404\n\nThere is nothing here.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(body, area);
}

fn file_extension(language: Language) -> &'static str {
    match language {
        Language::C => "c",
        Language::Cpp => "cpp",
        Language::Java => "java",
        Language::JavaScript => "js",
        Language::Python => "py",
    }
}

fn run_state_label(state: RunState) -> &'static str {
    match state {
        RunState::Idle => "Idle",
        RunState::Submitting => "Submitting...",
        RunState::Polling => "Polling...",
        RunState::Resolved => "Resolved",
        RunState::TimedOut => "Timed out",
        RunState::Cancelled => "Cancelled",
        RunState::Failed => "Failed",
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let mut block = Block::default().borders(Borders::ALL).title(title);
    if focused {
        block = block.border_style(Style::default().fg(Color::Yellow));
    }

    return block;
}

fn render_editor(frame: &mut Frame<'_>, area: Rect, state: &mut AppState<'_>) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Min(5),
        ])
        .split(columns[1]);

    let code_title = format!(
        "main.{} [{}]",
        file_extension(state.language),
        state.language.label()
    );
    let focus = state.editor_focus;
    state
        .code
        .set_block(pane_block(code_title, focus == EditorPane::Code));
    state
        .stdin_input
        .set_block(pane_block("stdin".to_string(), focus == EditorPane::Stdin));
    state.expected_output.set_block(pane_block(
        "Expected output".to_string(),
        focus == EditorPane::Expected,
    ));

    frame.render_widget(&state.code, columns[0]);
    frame.render_widget(&state.stdin_input, side[0]);
    frame.render_widget(&state.expected_output, side[1]);

    let output_title = format!("Output [{}]", run_state_label(state.run_state));
    let output = Paragraph::new(state.transcript.clone())
        .block(pane_block(output_title, false))
        .wrap(Wrap { trim: false })
        .scroll((state.transcript_scroll, 0));
    frame.render_widget(output, side[2]);

    if let Some(prompt) = &mut state.import_prompt {
        let target = centered_rect(area, 60, 3);
        prompt.set_block(pane_block("Import file (ENTER load, ESC cancel)".to_string(), true));
        frame.render_widget(Clear, target);
        frame.render_widget(&*prompt, target);
    }
}

fn render_records(frame: &mut Frame<'_>, area: Rect, state: &AppState<'_>) {
    let Some(records) = &state.records else {
        frame.render_widget(
            Paragraph::new("Loading submissions...")
                .block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };

    let rows = records.submissions.iter().map(|submission| {
        let when = submission
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let language = Language::from_judge_id(&submission.language_id)
            .map(|lang| lang.label().to_string())
            .unwrap_or_else(|_| submission.language_id.clone());
        let status = submission.status.description().to_string();
        let color = match submission.status.id() {
            Some(3) => Color::Green,
            Some(1) | Some(2) => Color::Yellow,
            _ => Color::Red,
        };

        return Row::new(vec![
            Cell::from(when),
            Cell::from(language),
            Cell::from(status).style(Style::default().fg(color)),
            Cell::from(submission.id.clone()),
        ]);
    });

    let pages = records.total.div_ceil(u64::from(records.count.max(1)));
    let title = format!(
        "My submissions - page {}/{} ({} total)",
        records.page,
        pages.max(1),
        records.total
    );
    let table = Table::new(
        rows,
        [
            Constraint::Length(17),
            Constraint::Length(12),
            Constraint::Length(24),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec!["When", "Language", "Verdict", "Id"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title(title));

    frame.render_widget(table, area);
}

fn render_dashboard(frame: &mut Frame<'_>, area: Rect, state: &AppState<'_>) {
    let Some(summary) = &state.analytics else {
        frame.render_widget(
            Paragraph::new("Loading analytics...")
                .block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(5)])
        .split(area);
    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    let by_language: Vec<(&str, u64)> = summary
        .by_language
        .iter()
        .map(|bucket| (bucket.key.as_str(), bucket.count))
        .collect();
    let by_status: Vec<(&str, u64)> = summary
        .by_status
        .iter()
        .map(|bucket| (bucket.key.as_str(), bucket.count))
        .collect();

    frame.render_widget(
        BarChart::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("By language - {} submissions", summary.total)),
            )
            .data(&by_language)
            .bar_width(10)
            .bar_gap(1),
        charts[0],
    );
    frame.render_widget(
        BarChart::default()
            .block(Block::default().borders(Borders::ALL).title("By verdict"))
            .data(&by_status)
            .bar_width(10)
            .bar_gap(1),
        charts[1],
    );

    let Some(rows_page) = &state.analytics_rows else {
        frame.render_widget(
            Paragraph::new("Loading rows...").block(Block::default().borders(Borders::ALL)),
            chunks[1],
        );
        return;
    };

    let rows = rows_page.rows.iter().map(|row| {
        let when = row
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let language = Language::from_judge_id(&row.language_id)
            .map(|lang| lang.label().to_string())
            .unwrap_or_else(|_| row.language_id.clone());

        return Row::new(vec![
            Cell::from(row.username.clone()),
            Cell::from(language),
            Cell::from(row.status.description().to_string()),
            Cell::from(row.time.clone().unwrap_or_else(|| "-".to_string())),
            Cell::from(
                row.memory
                    .map(|kb| format!("{kb}kb"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::from(when),
        ]);
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(12),
            Constraint::Length(24),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Min(16),
        ],
    )
    .header(
        Row::new(vec!["User", "Language", "Verdict", "Time", "Memory", "When"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Raw submissions - page {}", rows_page.page)),
    );

    frame.render_widget(table, chunks[1]);
}

fn render_form(
    frame: &mut Frame<'_>,
    area: Rect,
    title: &str,
    form: &mut Form<'_>,
    extra_lines: &[String],
) {
    let field_count = form.fields.len() as u16;
    let height = field_count * 3 + extra_lines.len() as u16 + 2;
    let target = centered_rect(area, 50, height);

    frame.render_widget(Clear, target);
    let outer = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string());
    let inner = outer.inner(target);
    frame.render_widget(outer, target);

    let mut constraints: Vec<Constraint> = form
        .fields
        .iter()
        .map(|_| Constraint::Length(3))
        .collect();
    constraints.push(Constraint::Min(0));
    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    let focus = form.focus;
    for (index, field) in form.fields.iter_mut().enumerate() {
        field
            .input
            .set_block(pane_block(field.label.to_string(), index == focus));
        frame.render_widget(&field.input, slots[index]);
    }

    if !extra_lines.is_empty() {
        frame.render_widget(
            Paragraph::new(extra_lines.join("\n")),
            slots[form.fields.len()],
        );
    }
}

fn render_toasts(frame: &mut Frame<'_>, area: Rect, state: &AppState<'_>) {
    let width = 44.min(area.width);
    for (index, active) in state.toasts.iter().enumerate() {
        let index = index as u16;
        if (index + 1) * 3 + 1 > area.height {
            break;
        }
        let target = Rect {
            x: area.width.saturating_sub(width + 1),
            y: area.height.saturating_sub((index + 1) * 3 + 1),
            width,
            height: 3,
        };

        let color = match active.toast.kind {
            ToastKind::Info => Color::Blue,
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
        };
        frame.render_widget(Clear, target);
        frame.render_widget(
            Paragraph::new(active.toast.text.clone())
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(color)),
                ),
            target,
        );
    }
}

fn centered_rect(area: Rect, width_percent: u16, height: u16) -> Rect {
    let width = area.width * width_percent / 100;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;

    return Rect {
        x,
        y,
        width,
        height: height.min(area.height),
    };
}
