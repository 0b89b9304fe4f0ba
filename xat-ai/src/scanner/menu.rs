//! Annotation menu seam
//!
//! The menu surface is external. The scanner drives it through
//! `AnnotationMenu`; every call carries the ticket of the session it belongs
//! to, and a menu must drop results whose ticket is no longer current (the
//! menu was closed or reopened for another identity meanwhile).

use crate::dom::NodeId;
use crate::identity::IdentityHandle;
use crate::models::{Judgment, Suggestion};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One opening of the menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSession {
    pub ticket: Uuid,
    pub identity: IdentityHandle,
    /// Tag button the menu was opened from
    pub anchor: NodeId,
}

impl MenuSession {
    pub fn new(identity: IdentityHandle, anchor: NodeId) -> Self {
        Self {
            ticket: Uuid::new_v4(),
            identity,
            anchor,
        }
    }
}

#[async_trait]
pub trait AnnotationMenu: Send + Sync {
    /// Show the menu preloaded with the stored judgment (if any)
    async fn open(&self, session: MenuSession, judgment: Option<Judgment>);

    /// A suggestion computation started for this session
    async fn suggestion_pending(&self, ticket: Uuid);

    /// The computation finished; None means no analysis had a result
    async fn suggestion_ready(&self, ticket: Uuid, suggestion: Option<Suggestion>);

    async fn show_error(&self, ticket: Uuid, message: String);
}

/// What a headless menu currently displays
#[derive(Debug, Clone, PartialEq)]
pub struct MenuState {
    pub session: MenuSession,
    pub judgment: Option<Judgment>,
    pub suggestion_pending: bool,
    /// Outer None: nothing arrived yet; inner None: arrived empty
    pub suggestion: Option<Option<Suggestion>>,
    pub error: Option<String>,
}

/// Menu without a UI: keeps the current state and logs transitions
///
/// Used by the CLI and by tests.
#[derive(Debug, Default)]
pub struct HeadlessMenu {
    state: Mutex<Option<MenuState>>,
    changed: Notify,
}

impl HeadlessMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<MenuState> {
        self.state.lock().await.clone()
    }

    pub async fn close(&self) {
        if let Some(state) = self.state.lock().await.take() {
            debug!("Menu for @{} closed", state.session.identity);
        }
        self.changed.notify_waiters();
    }

    /// Wait until the session's suggestion arrives; None on timeout or when
    /// the session is no longer current
    pub async fn wait_for_suggestion(&self, ticket: Uuid, timeout: Duration) -> Option<Option<Suggestion>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.changed.notified();
            {
                let state = self.state.lock().await;
                match state.as_ref() {
                    Some(s) if s.session.ticket == ticket => {
                        if let Some(suggestion) = &s.suggestion {
                            return Some(suggestion.clone());
                        }
                    }
                    _ => return None,
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    async fn with_current<F>(&self, ticket: Uuid, what: &str, update: F)
    where
        F: FnOnce(&mut MenuState),
    {
        let mut state = self.state.lock().await;
        match state.as_mut() {
            Some(s) if s.session.ticket == ticket => update(s),
            _ => debug!("Discarding stale {} for menu session {}", what, ticket),
        }
        drop(state);
        self.changed.notify_waiters();
    }
}

#[async_trait]
impl AnnotationMenu for HeadlessMenu {
    async fn open(&self, session: MenuSession, judgment: Option<Judgment>) {
        info!(
            "Menu opened for @{} (current: {})",
            session.identity,
            judgment
                .as_ref()
                .map(|j| j.sentiment.as_str())
                .unwrap_or("untagged")
        );
        *self.state.lock().await = Some(MenuState {
            session,
            judgment,
            suggestion_pending: false,
            suggestion: None,
            error: None,
        });
        self.changed.notify_waiters();
    }

    async fn suggestion_pending(&self, ticket: Uuid) {
        self.with_current(ticket, "pending notice", |s| s.suggestion_pending = true)
            .await;
    }

    async fn suggestion_ready(&self, ticket: Uuid, suggestion: Option<Suggestion>) {
        match &suggestion {
            Some(s) => info!(
                "Suggestion ready: {} ({:.0}% confident)",
                s.sentiment,
                s.confidence * 100.0
            ),
            None => info!("No suggestion available"),
        }
        self.with_current(ticket, "suggestion", move |s| {
            s.suggestion_pending = false;
            s.suggestion = Some(suggestion);
        })
        .await;
    }

    async fn show_error(&self, ticket: Uuid, message: String) {
        warn!("Menu error: {}", message);
        self.with_current(ticket, "error", move |s| s.error = Some(message))
            .await;
    }
}
