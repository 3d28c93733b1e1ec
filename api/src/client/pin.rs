//! The PIN gate in front of publish, edit and delete.
//!
//! This is a speed bump, not authentication: the code ships with the client.
//! Once the right code has been entered the gate stays open until the page
//! (the [`PinGate`] value) goes away.

use thiserror::Error;
use tracing::debug;

use crate::models::PostId;

pub const PIN_LENGTH: usize = 7;
pub const DEFAULT_PIN_CODE: &str = "1018520";

/// An action held back until the PIN is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardedAction {
    /// `scroll_to_top` is set when the editor was collapsed into its compact bar.
    Publish { scroll_to_top: bool },
    Edit { post_id: PostId },
    Delete { post_id: PostId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinState {
    Idle,
    AwaitingInput {
        buffer: String,
        pending: GuardedAction,
    },
    Verified,
}

/// What the caller should do after [`PinGate::request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Already verified; run the action now.
    Proceed(GuardedAction),
    /// Overlay is open and the action is queued.
    Prompt,
}

/// Result of feeding input to the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinInput {
    /// Fewer than seven digits so far.
    Partial { filled: usize },
    /// Right code. The gate is now open and this was the queued action.
    Unlocked(GuardedAction),
    /// Seven wrong digits; the buffer was cleared.
    Rejected,
    /// Nothing is waiting for a PIN.
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("PIN must be exactly {PIN_LENGTH} digits")]
pub struct InvalidPinCode;

#[derive(Debug, Clone)]
pub struct PinGate {
    code: String,
    state: PinState,
}

impl Default for PinGate {
    fn default() -> Self {
        Self {
            code: DEFAULT_PIN_CODE.to_string(),
            state: PinState::Idle,
        }
    }
}

impl PinGate {
    pub fn new(code: &str) -> Result<Self, InvalidPinCode> {
        if code.len() != PIN_LENGTH || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidPinCode);
        }
        Ok(Self {
            code: code.to_string(),
            state: PinState::Idle,
        })
    }

    pub fn state(&self) -> &PinState {
        &self.state
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.state, PinState::Verified)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PinState::AwaitingInput { .. })
    }

    /// The action currently waiting on the overlay, if any.
    pub fn pending(&self) -> Option<&GuardedAction> {
        match &self.state {
            PinState::AwaitingInput { pending, .. } => Some(pending),
            _ => None,
        }
    }

    /// Asks to run `action`. A newer request replaces whatever was queued and
    /// starts the entry over.
    pub fn request(&mut self, action: GuardedAction) -> Decision {
        if self.is_verified() {
            return Decision::Proceed(action);
        }

        debug!("PIN required for {:?}", action);
        self.state = PinState::AwaitingInput {
            buffer: String::new(),
            pending: action,
        };
        Decision::Prompt
    }

    /// Sets the entry to `raw`, keeping digits only and at most seven of
    /// them, the way the hidden input field is normalized on every keystroke.
    pub fn input(&mut self, raw: &str) -> PinInput {
        let PinState::AwaitingInput { buffer, .. } = &mut self.state else {
            return PinInput::Ignored;
        };

        *buffer = raw
            .chars()
            .filter(char::is_ascii_digit)
            .take(PIN_LENGTH)
            .collect();

        if buffer.len() < PIN_LENGTH {
            return PinInput::Partial {
                filled: buffer.len(),
            };
        }

        if *buffer != self.code {
            buffer.clear();
            debug!("PIN rejected");
            return PinInput::Rejected;
        }

        debug!("PIN accepted");
        match std::mem::replace(&mut self.state, PinState::Verified) {
            PinState::AwaitingInput { pending, .. } => PinInput::Unlocked(pending),
            _ => PinInput::Ignored,
        }
    }

    pub fn push_digit(&mut self, digit: char) -> PinInput {
        let mut next = match &self.state {
            PinState::AwaitingInput { buffer, .. } => buffer.clone(),
            _ => return PinInput::Ignored,
        };
        next.push(digit);
        self.input(&next)
    }

    pub fn backspace(&mut self) -> PinInput {
        match &mut self.state {
            PinState::AwaitingInput { buffer, .. } => {
                buffer.pop();
                PinInput::Partial {
                    filled: buffer.len(),
                }
            }
            _ => PinInput::Ignored,
        }
    }

    /// Cancel button, backdrop click or Escape. The queued action is handed
    /// back for logging only; it must not be run.
    pub fn cancel(&mut self) -> Option<GuardedAction> {
        match std::mem::replace(&mut self.state, PinState::Idle) {
            PinState::AwaitingInput { pending, .. } => {
                debug!("PIN entry cancelled, dropping {:?}", pending);
                Some(pending)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Digits entered so far.
    pub fn filled(&self) -> usize {
        match &self.state {
            PinState::AwaitingInput { buffer, .. } => buffer.len(),
            _ => 0,
        }
    }

    /// Box that gets the cursor highlight: the first empty one, none when full.
    pub fn active_box(&self) -> Option<usize> {
        let filled = self.filled();
        (self.is_open() && filled < PIN_LENGTH).then_some(filled)
    }
}
