use std::net::SocketAddr;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEventKind, KeyModifiers};

use crate::bindings::KeyBindings;
use crate::runtime::StrafeEvent;
use crate::session::InputSession;
use crate::shot::ShotResult;
use crate::sink::LatestShot;

/// What the event loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Redraw,
    Quit,
}

/// Event-loop state: routes terminal events into the input session and
/// exposes what the overlay draws.
pub struct App {
    session: Arc<InputSession>,
    latest: LatestShot,
    pub bindings: KeyBindings,
    pub hud_addr: Option<SocketAddr>,
    /// False when the terminal cannot report key releases.
    pub releases_reported: bool,
}

impl App {
    /// `latest` must also be registered as a sink on `session`.
    pub fn new(session: Arc<InputSession>, latest: LatestShot, bindings: KeyBindings) -> Self {
        Self {
            session,
            latest,
            bindings,
            hud_addr: None,
            releases_reported: true,
        }
    }

    pub fn session(&self) -> &InputSession {
        &self.session
    }

    pub fn latest_shot(&self) -> Option<ShotResult> {
        self.latest.get()
    }

    pub fn handle_event(&mut self, event: StrafeEvent) -> Control {
        match event {
            StrafeEvent::Key { key, at_ms } => {
                if let Some(movement) = self.bindings.key_for(key.code) {
                    // auto-repeat keeps the original press time
                    match key.kind {
                        KeyEventKind::Press => self.session.on_press(movement, at_ms),
                        KeyEventKind::Release => self.session.on_release(movement, at_ms),
                        KeyEventKind::Repeat => return Control::Continue,
                    }
                    return Control::Redraw;
                }
                if key.kind != KeyEventKind::Press {
                    return Control::Continue;
                }
                match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => Control::Quit,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        Control::Quit
                    }
                    _ => Control::Continue,
                }
            }
            StrafeEvent::Click { at_ms } => {
                self.session.on_click(at_ms);
                Control::Redraw
            }
            StrafeEvent::Resize => Control::Redraw,
            StrafeEvent::Tick => Control::Continue,
        }
    }
}
