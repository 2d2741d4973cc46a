use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{block::Title, Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};
use tui_dispatch::{EventKind, EventOutcome, RenderContext};

use crate::action::Action;
use crate::battle::{BattleState, Combatant, Outcome, CAPTURE_LIMIT};
use crate::state::{AppState, Side};

const BG_BASE: Color = Color::Rgb(24, 36, 26);
const BG_PANEL: Color = Color::Rgb(34, 58, 38);
const BG_PANEL_ALT: Color = Color::Rgb(28, 48, 32);
const TEXT_MAIN: Color = Color::Rgb(228, 236, 214);
const TEXT_DIM: Color = Color::Rgb(172, 186, 160);
const ACCENT_GREEN: Color = Color::Rgb(104, 204, 120);
const ACCENT_GOLD: Color = Color::Rgb(222, 196, 120);
const ACCENT_RED: Color = Color::Rgb(220, 96, 96);
const BORDER_ACCENT: Color = Color::Rgb(74, 98, 82);

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

pub fn render(frame: &mut Frame, area: Rect, state: &AppState, _ctx: RenderContext) {
    draw(frame, area, state);
}

/// Render without a runtime context (used by tests).
pub fn draw(frame: &mut Frame, area: Rect, state: &AppState) {
    frame.render_widget(Block::default().style(Style::default().bg(BG_BASE)), area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(6), // combatants
            Constraint::Length(4), // commands
            Constraint::Min(3),    // event log
        ])
        .split(area);

    render_header(frame, layout[0], state);
    match state.battle.as_ref() {
        Some(battle) => render_combatants(frame, layout[1], state, battle),
        None => render_placeholder(frame, layout[1], state),
    }
    render_commands(frame, layout[2], state);
    render_log(frame, layout[3], state);
}

pub fn handle_event(event: &EventKind, state: &AppState) -> EventOutcome<Action> {
    match event {
        EventKind::Resize(width, height) => {
            EventOutcome::action(Action::UiTerminalResize(*width, *height)).with_render()
        }
        EventKind::Key(key) => EventOutcome::from(key_action(*key, state)),
        _ => EventOutcome::ignored(),
    }
}

/// Map a key press to the action it triggers in the current state.
pub fn key_action(key: KeyEvent, state: &AppState) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(Action::Quit),
        KeyCode::Up | KeyCode::Char('k') => return Some(Action::LogScroll(1)),
        KeyCode::Down | KeyCode::Char('j') => return Some(Action::LogScroll(-1)),
        _ => {}
    }

    let Some(battle) = state.battle.as_ref() else {
        return match key.code {
            KeyCode::Enter | KeyCode::Char('n') | KeyCode::Char('r') if state.can_start_battle() => {
                Some(Action::BattleNew)
            }
            _ => None,
        };
    };

    if !battle.is_over() {
        return match key.code {
            KeyCode::Enter | KeyCode::Char('a') | KeyCode::Char('z') if battle.can_act() => {
                Some(Action::BattleAttack)
            }
            KeyCode::Char('h') if battle.can_heal() => Some(Action::BattleHeal),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('c') if battle.can_capture() && !state.capture_in_flight => {
            Some(Action::BattleCapture)
        }
        KeyCode::Enter | KeyCode::Char('n') if state.can_start_battle() => Some(Action::BattleNew),
        _ => None,
    }
}

fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let line = Line::from(vec![
        Span::styled(
            " POKEMON BATTLE ",
            Style::default()
                .fg(ACCENT_GOLD)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  Captured: {} / {}", state.capture_tally, CAPTURE_LIMIT),
            Style::default().fg(TEXT_DIM),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_combatants(frame: &mut Frame, area: Rect, state: &AppState, battle: &BattleState) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let player_extra = format!("Heals: {}", battle.heals_remaining);
    render_combatant_panel(
        frame,
        layout[0],
        &battle.player,
        Some(player_extra),
        panel_accent(battle.outcome, Side::Player, state.is_flashing(Side::Player)),
    );
    render_combatant_panel(
        frame,
        layout[1],
        &battle.enemy,
        None,
        panel_accent(battle.outcome, Side::Enemy, state.is_flashing(Side::Enemy)),
    );
}

fn panel_accent(outcome: Outcome, side: Side, flashing: bool) -> Color {
    if flashing {
        return ACCENT_RED;
    }
    match (outcome, side) {
        (Outcome::PlayerWon, Side::Player) | (Outcome::EnemyWon, Side::Enemy) => ACCENT_GREEN,
        _ => BORDER_ACCENT,
    }
}

fn render_combatant_panel(
    frame: &mut Frame,
    area: Rect,
    combatant: &Combatant,
    extra: Option<String>,
    border: Color,
) {
    let title = format!(" {} ", combatant.display_name().to_ascii_uppercase());
    let block = panel_block(title.as_str(), BG_PANEL).border_style(Style::default().fg(border));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![
        hp_line(combatant.hit_points, combatant.max_hit_points),
        Line::from(Span::styled(
            format!(
                "Type {}  Atk {}",
                combatant.elemental_type.label(),
                combatant.attack_power
            ),
            Style::default().fg(TEXT_DIM),
        )),
    ];
    if let Some(extra) = extra {
        lines.push(Line::from(Span::styled(extra, Style::default().fg(TEXT_DIM))));
    }
    let paragraph = Paragraph::new(Text::from(lines)).style(Style::default().fg(TEXT_MAIN));
    frame.render_widget(paragraph, inner);
}

fn render_placeholder(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block("BATTLE", BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let content = if state.loading {
        let spinner = SPINNER[(state.tick % SPINNER.len() as u64) as usize];
        format!("{spinner} Loading battle...")
    } else {
        "No battle loaded.".to_string()
    };
    let paragraph = Paragraph::new(content)
        .style(Style::default().fg(TEXT_DIM))
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}

fn render_commands(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block("COMMAND", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    match state.battle.as_ref() {
        None if state.loading => lines.push(Line::from("Fetching two random Pokemon...")),
        None => lines.push(hint_line(&[("N", "New battle"), ("Q", "Quit")])),
        Some(battle) if !battle.is_over() => {
            let status = if battle.counter_pending {
                format!("{} is about to strike back...", battle.enemy.display_name())
            } else {
                format!("What will {} do?", battle.player.display_name())
            };
            lines.push(Line::from(status));
            let heal_label = format!("Heal ({})", battle.heals_remaining);
            let mut hints = vec![("A", "Attack")];
            if battle.heals_remaining > 0 {
                hints.push(("H", heal_label.as_str()));
            }
            hints.push(("Q", "Quit"));
            lines.push(hint_line(&hints));
        }
        Some(battle) => {
            let winner = match battle.outcome {
                Outcome::PlayerWon => "You won the battle!",
                _ => "The enemy won the battle.",
            };
            lines.push(Line::from(Span::styled(
                winner,
                Style::default().add_modifier(Modifier::BOLD),
            )));
            let mut hints = Vec::new();
            if battle.can_capture() && !state.capture_in_flight {
                hints.push(("C", "Capture"));
            }
            hints.push(("N", "New battle"));
            hints.push(("Q", "Quit"));
            lines.push(hint_line(&hints));
        }
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .style(Style::default().fg(TEXT_MAIN))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn render_log(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block("LOG", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let entries = state.log_lines();
    let visible = inner.height as usize;
    let end = entries.len().saturating_sub(state.log_scroll as usize);
    let start = end.saturating_sub(visible);
    let lines: Vec<Line> = entries[start..end]
        .iter()
        .map(|entry| Line::from(format!("- {entry}")))
        .collect();

    let paragraph = Paragraph::new(Text::from(lines)).style(Style::default().fg(TEXT_MAIN));
    frame.render_widget(paragraph, inner);
}

fn hint_line(hints: &[(&str, &str)]) -> Line<'static> {
    let mut spans = Vec::new();
    for (idx, (key, label)) in hints.iter().enumerate() {
        spans.push(Span::styled(
            key.to_string(),
            Style::default()
                .fg(ACCENT_GREEN)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!(": {label}"),
            Style::default().fg(TEXT_DIM),
        ));
        if idx + 1 < hints.len() {
            spans.push(Span::raw("  "));
        }
    }
    Line::from(spans)
}

fn hp_line(current: u16, max: u16) -> Line<'static> {
    let width: usize = 12;
    let ratio = if max == 0 {
        0.0
    } else {
        current as f32 / max as f32
    };
    let filled = ((ratio * width as f32).round() as usize).min(width);
    let empty = width.saturating_sub(filled);
    let color = if ratio > 0.5 {
        ACCENT_GREEN
    } else if ratio > 0.2 {
        ACCENT_GOLD
    } else {
        ACCENT_RED
    };
    Line::from(vec![
        Span::raw("HP "),
        Span::styled(
            "█".repeat(filled),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled("░".repeat(empty), Style::default().fg(TEXT_DIM)),
        Span::raw(format!(" {}/{}", current, max)),
    ])
}

fn panel_block<'a, T>(title: T, bg: Color) -> Block<'a>
where
    T: Into<Title<'a>>,
{
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .style(Style::default().bg(bg).fg(TEXT_MAIN))
        .border_style(Style::default().fg(BORDER_ACCENT))
}
