use crate::{
    app::{AppCommand, AppEvent, AppState, InputField, MessageKind, SceneView},
    media::MediaRef,
};
use anyhow::{anyhow, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const FORM_HELP: &str = "Enter generate | Tab next field | Esc quit";
const VIEWER_HELP: &str = "Left/Right navigate | p play | d download | n new story | q quit";

pub fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    event_rx: &mut UnboundedReceiver<AppEvent>,
    command_tx: UnboundedSender<AppCommand>,
) -> Result<()> {
    while !app.should_quit {
        while let Ok(event) = event_rx.try_recv() {
            app.handle_event(event);
        }

        terminal.draw(|frame| render(frame, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(command) = handle_key(app, key) {
                    command_tx.send(command).map_err(|_| anyhow!("story controller stopped"))?;
                }
            }
        }
    }
    Ok(())
}

pub fn handle_key(app: &mut AppState, key: KeyEvent) -> Option<AppCommand> {
    if key.code == KeyCode::Esc
        || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
    {
        app.should_quit = true;
        return None;
    }

    if app.in_viewer() {
        return match key.code {
            KeyCode::Left | KeyCode::Char('h') => Some(AppCommand::PrevScene),
            KeyCode::Right | KeyCode::Char('l') => Some(AppCommand::NextScene),
            KeyCode::Char('p') | KeyCode::Char(' ') => Some(AppCommand::Play),
            KeyCode::Char('d') => Some(AppCommand::Download),
            KeyCode::Char('n') => Some(AppCommand::Reset),
            KeyCode::Char('q') => {
                app.should_quit = true;
                None
            }
            _ => None,
        };
    }

    match key.code {
        KeyCode::Enter => Some(app.generate_command()),
        KeyCode::Tab => {
            app.focus = app.focus.next();
            None
        }
        KeyCode::Backspace => {
            app.focused_input_mut().pop();
            None
        }
        KeyCode::Char(c) => {
            app.focused_input_mut().push(c);
            None
        }
        _ => None,
    }
}

fn render(frame: &mut Frame, app: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3), Constraint::Length(1)])
        .split(frame.size());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(rows[0]);

    match &app.viewer {
        Some(view) => render_viewer(frame, columns[0], view),
        None => render_form(frame, columns[0], app),
    }
    render_status(frame, columns[1], app);
    render_message(frame, rows[1], app);

    let help = if app.in_viewer() { VIEWER_HELP } else { FORM_HELP };
    frame.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM)),
        rows[2],
    );
}

fn render_form(frame: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    let fields = [
        (InputField::Prompt, app.prompt.as_str()),
        (InputField::Scenes, app.scenes_input.as_str()),
        (InputField::TtsMode, app.tts_mode.as_str()),
    ];
    for ((field, value), chunk) in fields.into_iter().zip(chunks.iter()) {
        let focused = app.focus == field;
        let border = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block =
            Block::default().title(field.label()).borders(Borders::ALL).border_style(border);
        let paragraph = Paragraph::new(value.to_string()).block(block).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, *chunk);
    }

    if let Some(status) = &app.loading {
        let loading = Paragraph::new(status.as_str())
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC));
        frame.render_widget(loading, chunks[3]);
    }
}

fn render_viewer(frame: &mut Frame, area: Rect, view: &SceneView) {
    let block = Block::default()
        .title(view.counter())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mut lines = vec![image_line(view.scene.image_ref.as_deref()), Line::from("")];
    lines.extend(view.scene.text.lines().map(|line| Line::from(line.to_string())));
    lines.push(Line::from(""));
    let audio = if view.scene.audio_ref.is_some() {
        "Audio: narration available"
    } else {
        "Audio: on-device speech"
    };
    lines.push(Line::from(Span::styled(audio, Style::default().fg(Color::Gray))));
    lines.push(Line::from(Span::styled(view.info_line(), Style::default().fg(Color::DarkGray))));

    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

fn image_line(image_ref: Option<&str>) -> Line<'static> {
    let style = Style::default().fg(Color::Magenta);
    let Some(reference) = image_ref else {
        let placeholder = style.add_modifier(Modifier::DIM);
        return Line::from(Span::styled("[ no image for this scene ]", placeholder));
    };
    let label = match MediaRef::parse(reference) {
        Ok(MediaRef::Inline(data)) => {
            let kilobytes = data.bytes.len() as f64 / 1024.0;
            format!("[ image: {} ({kilobytes:.1} KB) ]", data.mime)
        }
        Ok(MediaRef::Remote(url)) => format!("[ image: {url} ]"),
        Err(_) => "[ image unavailable ]".to_string(),
    };
    Line::from(Span::styled(label, style))
}

fn render_status(frame: &mut Frame, area: Rect, app: &AppState) {
    let block = Block::default().title("Status").borders(Borders::ALL);
    let text = if app.status_lines.is_empty() {
        "No stories yet.".to_string()
    } else {
        app.status_lines
            .iter()
            .map(|line| format!("{} {}", line.at.format("%H:%M:%S"), line.text))
            .collect::<Vec<_>>()
            .join("\n")
    };
    frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), area);
}

fn render_message(frame: &mut Frame, area: Rect, app: &AppState) {
    let Some(message) = &app.message else {
        frame.render_widget(Block::default().borders(Borders::ALL), area);
        return;
    };
    let (title, color) = match message.kind {
        MessageKind::Error => ("Error", Color::Red),
        MessageKind::Success => ("OK", Color::Green),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    frame.render_widget(
        Paragraph::new(message.text.as_str()).style(Style::default().fg(color)).block(block),
        area,
    );
}
