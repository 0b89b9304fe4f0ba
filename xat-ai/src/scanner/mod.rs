//! Annotation scanner
//!
//! Finds identity regions in the document, attaches a sentiment badge for
//! every identity with a stored judgment and a tag button for every identity,
//! and reacts to clicks on those buttons and on the host's engagement
//! controls.
//!
//! Scans may overlap. Each region is claimed with a marker attribute before
//! the store lookup, and the badge/button insertion re-checks the region
//! right before writing, so a region never ends up with two badges or two
//! buttons. Claim and insertion are separate lock sections; the store lookup
//! in between runs without holding the document. A region whose lookup fails
//! is released again, so the next scan retries it.

pub mod badge;
pub mod menu;
pub mod observer;

pub use menu::{AnnotationMenu, HeadlessMenu, MenuSession, MenuState};

use crate::dom::{MutationRecord, NodeId, Query, SharedDocument};
use crate::identity::{extract_identity, identity_regions, IdentityHandle, CONTENT_ITEM_TAG, IDENTITY_REGION_TEST_ID};
use crate::models::judgment::kinds;
use crate::models::{Judgment, TagRequest};
use crate::recorder::InteractionRecorder;
use crate::store::JudgmentStore;
use crate::suggestion::SuggestionService;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use xat_common::events::{EventBus, XatEvent};
use xat_common::{AiConfig, Result};

/// Outcome of one scan pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub generation: u64,
    /// Regions whose identity could be extracted
    pub nodes_seen: usize,
    /// Regions claimed and rendered by this pass
    pub nodes_annotated: usize,
    pub badges_rendered: usize,
    pub buttons_rendered: usize,
}

/// What a click resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    MenuOpened(MenuSession),
    InteractionRecorded { identity: IdentityHandle, kind: &'static str },
    Ignored,
}

pub struct AnnotationScanner {
    document: SharedDocument,
    store: Arc<dyn JudgmentStore>,
    recorder: Arc<InteractionRecorder>,
    suggestions: Arc<SuggestionService>,
    menu: Arc<dyn AnnotationMenu>,
    config: RwLock<AiConfig>,
    event_bus: EventBus,
    generation: AtomicU64,
    debounce: Duration,
}

impl AnnotationScanner {
    pub fn new(
        document: SharedDocument,
        store: Arc<dyn JudgmentStore>,
        recorder: Arc<InteractionRecorder>,
        suggestions: Arc<SuggestionService>,
        menu: Arc<dyn AnnotationMenu>,
        config: AiConfig,
        event_bus: EventBus,
    ) -> Self {
        Self {
            document,
            store,
            recorder,
            suggestions,
            menu,
            config: RwLock::new(config),
            event_bus,
            generation: AtomicU64::new(0),
            debounce: observer::DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    /// Apply new settings here and in every component the scanner drives
    pub async fn reconfigure(&self, config: AiConfig) {
        self.recorder.reconfigure(config.clone()).await;
        self.suggestions.reconfigure(config.clone()).await;
        *self.config.write().await = config;
    }

    /// One pass over the document
    pub async fn scan(&self) -> ScanReport {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut report = ScanReport {
            generation,
            ..ScanReport::default()
        };

        // Pass 1: find unclaimed regions
        let candidates: Vec<(NodeId, IdentityHandle)> = {
            let doc = self.document.lock().await;
            identity_regions(&doc)
                .into_iter()
                .filter_map(|region| extract_identity(&doc, region).map(|identity| (region, identity)))
                .inspect(|_| report.nodes_seen += 1)
                .filter(|(region, _)| !badge::is_processed(&doc, *region))
                .collect()
        };

        // Pass 2: claim them
        let mut claimed: Vec<(NodeId, IdentityHandle)> = Vec::with_capacity(candidates.len());
        if !candidates.is_empty() {
            let mut doc = self.document.lock().await;
            for (region, identity) in candidates {
                if doc.is_attached(region) && !badge::is_processed(&doc, region) {
                    badge::mark_processed(&mut doc, region);
                    claimed.push((region, identity));
                }
            }
        }
        report.nodes_annotated = claimed.len();

        // Store lookups, one per identity for this pass only; None marks a failure
        let mut judgments: HashMap<IdentityHandle, Option<Option<Judgment>>> = HashMap::new();
        for (_, identity) in &claimed {
            if judgments.contains_key(identity) {
                continue;
            }
            let judgment = match self.store.get_judgment(identity).await {
                Ok(judgment) => Some(judgment),
                Err(e) => {
                    error!("Judgment lookup for @{} failed, will retry: {}", identity, e);
                    None
                }
            };
            judgments.insert(identity.clone(), judgment);
        }

        // Pass 3: render, re-checking each region right before writing
        if !claimed.is_empty() {
            let mut doc = self.document.lock().await;
            for (region, identity) in &claimed {
                if !doc.is_attached(*region) {
                    continue;
                }
                let Some(Some(lookup)) = judgments.get(identity) else {
                    badge::unmark_processed(&mut doc, *region);
                    report.nodes_annotated -= 1;
                    continue;
                };
                if let Some(judgment) = lookup {
                    if !badge::has_badge(&doc, *region) {
                        badge::insert_badge(&mut doc, *region, judgment);
                        report.badges_rendered += 1;
                    }
                }
                if !badge::has_tag_button(&doc, *region) {
                    badge::insert_tag_button(&mut doc, *region, identity);
                    report.buttons_rendered += 1;
                }
            }
        }

        if report.nodes_annotated > 0 {
            info!(
                "Scan {}: {} regions seen, {} annotated, {} badges",
                generation, report.nodes_seen, report.nodes_annotated, report.badges_rendered
            );
        } else {
            debug!("Scan {}: nothing new ({} regions seen)", generation, report.nodes_seen);
        }

        self.event_bus.emit_lossy(XatEvent::ScanCompleted {
            generation,
            nodes_seen: report.nodes_seen,
            nodes_annotated: report.nodes_annotated,
            badges_rendered: report.badges_rendered,
            timestamp: Utc::now(),
        });

        report
    }

    /// Scan loop: one scan now, then one per batch of host mutations
    ///
    /// Each batch's scan runs on its own task, so a slow store lookup never
    /// delays noticing the next batch. Ends when the document is dropped.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<MutationRecord>) {
        self.scan().await;

        while let Some(records) = observer::next_batch(&mut rx, self.debounce).await {
            debug!("Mutation batch of {} records", records);
            let scanner = Arc::clone(&self);
            tokio::spawn(async move {
                scanner.scan().await;
            });
        }
        debug!("Mutation stream ended, scan loop stopping");
    }

    /// Register as an observer of the document and start the scan loop
    pub async fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let rx = self.document.lock().await.observe();
        tokio::spawn(Arc::clone(self).run(rx))
    }

    /// Dispatch a click on `node`
    pub async fn handle_click(&self, node: NodeId) -> Result<ClickOutcome> {
        enum Target {
            TagButton(IdentityHandle, NodeId),
            Control(IdentityHandle, &'static str),
            Nothing,
        }

        let target = {
            let doc = self.document.lock().await;
            let button_query = Query::tag("button").class(badge::TAG_BUTTON_CLASS);
            if let Some(button) = doc.closest(node, &button_query) {
                match doc
                    .attr(button, "data-identity")
                    .and_then(|h| IdentityHandle::parse(h).ok())
                {
                    Some(identity) => Target::TagButton(identity, button),
                    None => Target::Nothing,
                }
            } else {
                let control = doc
                    .closest(node, &Query::any().has_attr("data-testid"))
                    .and_then(|c| doc.attr(c, "data-testid"))
                    .and_then(kinds::for_control);
                let identity = doc
                    .closest(node, &Query::tag(CONTENT_ITEM_TAG))
                    .and_then(|item| doc.find_first(item, &Query::test_id(IDENTITY_REGION_TEST_ID)))
                    .and_then(|region| extract_identity(&doc, region));
                match (identity, control) {
                    (Some(identity), Some(kind)) => Target::Control(identity, kind),
                    _ => Target::Nothing,
                }
            }
        };

        match target {
            Target::TagButton(identity, button) => {
                Ok(ClickOutcome::MenuOpened(self.open_menu(identity, button).await?))
            }
            Target::Control(identity, kind) => {
                self.recorder.record(&identity, kind).await;
                Ok(ClickOutcome::InteractionRecorded { identity, kind })
            }
            Target::Nothing => Ok(ClickOutcome::Ignored),
        }
    }

    /// Open the menu for `identity`, preloaded with its stored judgment
    ///
    /// With auto-suggest active a suggestion is requested right away.
    pub async fn open_menu(&self, identity: IdentityHandle, anchor: NodeId) -> Result<MenuSession> {
        let judgment = self.store.get_judgment(&identity).await?;
        let session = MenuSession::new(identity, anchor);
        self.menu.open(session.clone(), judgment).await;

        if self.config.read().await.auto_suggest_active() {
            self.request_suggestion(&session).await;
        }
        Ok(session)
    }

    /// Compute a suggestion for the session on a separate task
    pub async fn request_suggestion(&self, session: &MenuSession) -> JoinHandle<()> {
        self.menu.suggestion_pending(session.ticket).await;

        let suggestions = Arc::clone(&self.suggestions);
        let menu = Arc::clone(&self.menu);
        let identity = session.identity.clone();
        let ticket = session.ticket;
        tokio::spawn(async move {
            let suggestion = suggestions.suggest(&identity).await;
            menu.suggestion_ready(ticket, suggestion).await;
        })
    }

    /// Persist the menu's submission and refresh every badge for the identity
    pub async fn save_judgment(&self, identity: &IdentityHandle, request: TagRequest) -> Result<Judgment> {
        let previous = self.store.get_judgment(identity).await?;
        let judgment = request.into_judgment(identity.clone(), previous.as_ref());
        self.store.put_judgment(&judgment).await?;
        info!("Tagged @{} as {}", identity, judgment.sentiment);

        self.recorder.record(identity, kinds::TAGGED).await;
        self.refresh_identity(identity).await?;

        self.event_bus.emit_lossy(XatEvent::JudgmentSaved {
            identity: identity.to_string(),
            sentiment: judgment.sentiment.to_string(),
            suggested_by_ai: judgment.suggested_by_ai,
            timestamp: judgment.last_updated,
        });
        Ok(judgment)
    }

    /// Remove the judgment and its badges; returns whether one existed
    pub async fn delete_judgment(&self, identity: &IdentityHandle) -> Result<bool> {
        let existed = self.store.delete_judgment(identity).await?;
        self.refresh_identity(identity).await?;
        if existed {
            info!("Removed tag for @{}", identity);
            self.event_bus.emit_lossy(XatEvent::JudgmentDeleted {
                identity: identity.to_string(),
                timestamp: Utc::now(),
            });
        }
        Ok(existed)
    }

    /// Re-derive the badge of every claimed region naming `identity`
    ///
    /// Returns the number of regions updated.
    pub async fn refresh_identity(&self, identity: &IdentityHandle) -> Result<usize> {
        let judgment = self.store.get_judgment(identity).await?;
        let mut doc = self.document.lock().await;

        let regions: Vec<NodeId> = identity_regions(&doc)
            .into_iter()
            .filter(|&region| badge::is_processed(&doc, region))
            .filter(|&region| extract_identity(&doc, region).as_ref() == Some(identity))
            .collect();

        for &region in &regions {
            badge::remove_badges(&mut doc, region);
            if let Some(judgment) = &judgment {
                badge::insert_badge(&mut doc, region, judgment);
            }
        }
        debug!("Refreshed {} regions for @{}", regions.len(), identity);
        Ok(regions.len())
    }
}
