//! Hot updates.
//!
//! When a source changes, the session recomputes just that resource and walks
//! its dependents to find the resources that can absorb the update in place.
//! A resource accepting itself or the changed dependency is a boundary; a
//! declining resource, or reaching an entry without finding a boundary, turns
//! the update into a full reload.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use kiln_graph::{HotState, Reference, ReferenceTrace, ResourceNode, ResourceUrl};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::changes::has_changed;
use crate::error::EngineError;
use crate::fetch::{Visited, fetch_walk};
use crate::session::BuildSession;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    Modified,
    Created,
    Removed,
}

/// A change notification from a watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub url: ResourceUrl,
    pub kind: ChangeKind,
}

impl FileChange {
    pub fn new(url: ResourceUrl, kind: ChangeKind) -> Self {
        Self { url, kind }
    }

    pub fn modified(url: ResourceUrl) -> Self {
        Self::new(url, ChangeKind::Modified)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateKind {
    /// `url` re-executes itself.
    AcceptedSelf,
    /// `accepted_by` absorbs the new version of `url`.
    AcceptedDependency,
    /// The client must reload everything.
    FullReload,
}

/// One notification for a connected client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotUpdateEvent {
    pub url: ResourceUrl,
    pub update_kind: UpdateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<ResourceUrl>,
}

impl HotUpdateEvent {
    fn new(url: ResourceUrl, update_kind: UpdateKind, accepted_by: Option<ResourceUrl>) -> Self {
        Self {
            url,
            update_kind,
            accepted_by,
        }
    }
}

/// Why an update escalated to a full reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadReason {
    /// A resource on the way up declined hot updates.
    Declined { url: ResourceUrl },
    /// The walk reached a resource with no dependents and found no boundary.
    NoAcceptingBoundary,
    /// The changed resource's kind or exposed names differ from before.
    IncompatibleShape,
    /// The changed resource was removed.
    Removed,
    HotUpdateDisabled,
}

impl fmt::Display for ReloadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declined { url } => write!(f, "{url} declines hot updates"),
            Self::NoAcceptingBoundary => f.write_str("no module accepts the update"),
            Self::IncompatibleShape => f.write_str("kind or exports changed"),
            Self::Removed => f.write_str("resource removed"),
            Self::HotUpdateDisabled => f.write_str("hot updates are disabled"),
        }
    }
}

/// Result of [`BuildSession::handle_change`].
#[derive(Debug, Clone)]
pub enum HotUpdate {
    /// Nothing observable changed.
    None,
    /// In-place updates, dependencies first.
    Partial(Vec<HotUpdateEvent>),
    FullReload {
        changed: ResourceUrl,
        /// Resource the reload escalated at.
        root: ResourceUrl,
        reason: ReloadReason,
    },
    /// The recompute failed. Clients reload once the error is fixed.
    Failed {
        url: ResourceUrl,
        root: ResourceUrl,
        error: EngineError,
    },
}

impl HotUpdate {
    /// Events to publish to clients.
    pub fn events(&self) -> Vec<HotUpdateEvent> {
        match self {
            Self::None => Vec::new(),
            Self::Partial(events) => events.clone(),
            Self::FullReload { root, .. } | Self::Failed { root, .. } => {
                vec![HotUpdateEvent::new(root.clone(), UpdateKind::FullReload, None)]
            }
        }
    }

    pub fn is_full_reload(&self) -> bool {
        matches!(self, Self::FullReload { .. } | Self::Failed { .. })
    }
}

impl BuildSession {
    /// Recompute a changed resource and decide how clients should pick it up.
    ///
    /// The resulting events are also sent to every [`BuildSession::subscribe`] receiver.
    pub async fn handle_change(&self, change: FileChange) -> HotUpdate {
        let update = self.compute_update(change).await;
        let events = update.events();
        if !events.is_empty() {
            info!(events = events.len(), full_reload = update.is_full_reload(), "hot update");
        }
        for event in events {
            // No subscribers is fine.
            let _ = self.inner.updates.send(event);
        }
        update
    }

    async fn compute_update(&self, change: FileChange) -> HotUpdate {
        let graph = &self.inner.graph;
        let url = change.url;
        let Some(previous) = graph.node(&url) else {
            debug!(url = %url, "change to unknown resource ignored");
            return HotUpdate::None;
        };

        if let Some(pending) = self.inner.pending(&url) {
            let _ = pending.await;
        }

        if change.kind == ChangeKind::Removed {
            graph.mark_stale(&url);
            return HotUpdate::FullReload {
                root: self.reload_root(&url),
                changed: url,
                reason: ReloadReason::Removed,
            };
        }

        graph.mark_stale(&url);
        let chain = graph.reference_chain(&url);
        let reference = chain
            .last()
            .cloned()
            .unwrap_or_else(|| Reference::entry(url.as_str()));
        let trace = chain
            .iter()
            .fold(ReferenceTrace::new(), |trace, reference| trace.with(reference));

        let updated = match fetch_walk(
            Arc::clone(&self.inner),
            reference,
            Some(url.clone()),
            trace,
            Visited::default(),
        )
        .await
        {
            Ok(node) => node,
            Err(error) => {
                warn!(url = %url, error = %error, "recompute failed");
                return HotUpdate::Failed {
                    root: self.reload_root(&url),
                    url,
                    error,
                };
            }
        };

        let unchanged = updated
            .original_content
            .as_ref()
            .is_some_and(|loaded| !has_changed(previous.source_hash.as_ref(), loaded.as_bytes()));
        if unchanged {
            debug!(url = %url, "content unchanged");
            return HotUpdate::None;
        }

        if !self.inner.options.hot_update {
            return HotUpdate::FullReload {
                root: self.reload_root(&url),
                changed: url,
                reason: ReloadReason::HotUpdateDisabled,
            };
        }

        if previous.source_hash.is_some() && !same_shape(&previous, &updated) {
            return HotUpdate::FullReload {
                root: self.reload_root(&url),
                changed: url,
                reason: ReloadReason::IncompatibleShape,
            };
        }

        match self.propagate(&url) {
            Ok(events) => HotUpdate::Partial(events),
            Err((root, reason)) => HotUpdate::FullReload {
                changed: url,
                root,
                reason,
            },
        }
    }

    /// Walk dependents of `changed` until every branch reaches a boundary.
    fn propagate(
        &self,
        changed: &ResourceUrl,
    ) -> Result<Vec<HotUpdateEvent>, (ResourceUrl, ReloadReason)> {
        let graph = &self.inner.graph;
        let mut events = Vec::new();
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([changed.clone()]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(node) = graph.node(&current) else {
                continue;
            };
            match node.hot_state {
                HotState::AcceptsSelf => {
                    events.push(HotUpdateEvent::new(current, UpdateKind::AcceptedSelf, None));
                    continue;
                }
                HotState::Declines => {
                    return Err((current.clone(), ReloadReason::Declined { url: current }));
                }
                HotState::Unspecified | HotState::AcceptsDependencies(_) => {}
            }

            let dependents: Vec<ResourceUrl> = graph
                .dependents(&current)
                .into_iter()
                .filter(|dependent| dependent != &current)
                .collect();
            if dependents.is_empty() {
                return Err((current, ReloadReason::NoAcceptingBoundary));
            }
            for dependent in dependents {
                let accepts = graph
                    .node(&dependent)
                    .is_some_and(|node| node.hot_state.accepts_dependency(&current));
                if accepts {
                    events.push(HotUpdateEvent::new(
                        current.clone(),
                        UpdateKind::AcceptedDependency,
                        Some(dependent),
                    ));
                } else {
                    queue.push_back(dependent);
                }
            }
        }

        let mut unique = FxHashSet::default();
        events.retain(|event| unique.insert((event.url.clone(), event.accepted_by.clone())));

        let order = graph.topological_order(&graph.entry_points());
        let positions = order.positions();
        let position = |url: &ResourceUrl| positions.get(url).copied().unwrap_or(usize::MAX);
        events.sort_by_key(|event| {
            (
                position(&event.url),
                event.accepted_by.as_ref().map_or(0, position),
            )
        });
        Ok(events)
    }

    /// The entry a full reload caused by `url` escalates to.
    fn reload_root(&self, url: &ResourceUrl) -> ResourceUrl {
        let graph = &self.inner.graph;
        if graph.is_entry(url) {
            return url.clone();
        }
        graph
            .ancestors(url)
            .into_iter()
            .find(|ancestor| graph.is_entry(ancestor))
            .unwrap_or_else(|| url.clone())
    }
}

fn same_shape(previous: &ResourceNode, updated: &ResourceNode) -> bool {
    previous.kind == updated.kind && previous.exposed == updated.exposed
}
