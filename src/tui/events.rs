use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use super::state::DashboardState;

/// What the run loop has to do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    /// Load this 1-based page.
    LoadPage(usize),
}

/// Handle a keyboard event, mutating dashboard state.
pub fn handle_key_event(key_event: KeyEvent, state: &mut DashboardState) -> Action {
    if key_event.kind != KeyEventKind::Press {
        return Action::None;
    }

    if state.show_help {
        if matches!(
            key_event.code,
            KeyCode::Esc | KeyCode::Char('h') | KeyCode::F(1) | KeyCode::Char('q')
        ) {
            state.show_help = false;
        }
        return Action::None;
    }

    match key_event.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('h') | KeyCode::F(1) => {
            state.show_help = true;
            Action::None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.select_next();
            Action::None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.select_prev();
            Action::None
        }
        KeyCode::Char('g') => {
            state.selected = 0;
            Action::None
        }
        KeyCode::Char('G') => {
            state.selected = state.rows.len().saturating_sub(1);
            Action::None
        }
        KeyCode::Tab | KeyCode::BackTab => {
            state.tab = state.tab.toggle();
            Action::None
        }
        KeyCode::Right | KeyCode::PageDown | KeyCode::Char('n') => {
            if state.page < state.page_count {
                Action::LoadPage(state.page + 1)
            } else {
                state.set_status("Already on the last page");
                Action::None
            }
        }
        KeyCode::Left | KeyCode::PageUp | KeyCode::Char('p') => {
            if state.page > 1 {
                Action::LoadPage(state.page - 1)
            } else {
                state.set_status("Already on the first page");
                Action::None
            }
        }
        KeyCode::Home if state.page != 1 => Action::LoadPage(1),
        KeyCode::End if state.page != state.page_count => Action::LoadPage(state.page_count),
        KeyCode::Char('r') => Action::LoadPage(state.page),
        _ => Action::None,
    }
}
