use crate::defaults::default_links;
use crate::error::{LinkError, LinkResult};
use crate::types::*;
use chrono::Utc;
use common::topics::TOPIC_LINKS;
use common::{EventBus, EventEnvelope, HasSeverity, ValidationErrors};
use parking_lot::RwLock;
use std::sync::Arc;
use storage::{StorageArea, StoreOptions, VersionedStore};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};
use url::Url;
use uuid::Uuid;

pub const LINKS_KEY: &str = "quick-links";
pub const MAX_LINK_NAME_CHARS: usize = 50;

/// Checks a name/url pair. Whitespace around either is ignored.
pub fn validate_link(name: &str, url: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = name.trim();
    if name.is_empty() {
        errors.push("link name must not be empty");
    } else if name.chars().count() > MAX_LINK_NAME_CHARS {
        errors.push(format!(
            "link name must be at most {} characters",
            MAX_LINK_NAME_CHARS
        ));
    }

    let url = url.trim();
    if url.is_empty() {
        errors.push("url must not be empty");
    } else if Url::parse(url).is_err() {
        errors.push("invalid url");
    }

    errors.into_result()
}

/// `link_<unix-ms>_<9 lowercase alnum>`
pub fn generate_link_id() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("link_{}_{}", Utc::now().timestamp_millis(), suffix)
}

fn trimmed_icon(icon: Option<&str>) -> Option<String> {
    icon.map(str::trim)
        .filter(|i| !i.is_empty())
        .map(str::to_string)
}

pub struct LinkService {
    store: VersionedStore<LinksDocument>,
    links: RwLock<Vec<QuickLink>>,
    error: Arc<RwLock<Option<String>>>,
    events: EventBus<LinkEvent>,
}

impl LinkService {
    pub fn new(area: Arc<StorageArea>) -> Self {
        Self::with_options(area, "1.0", EventBus::default())
    }

    pub fn with_options(
        area: Arc<StorageArea>,
        schema_version: &str,
        events: EventBus<LinkEvent>,
    ) -> Self {
        let error = Arc::new(RwLock::new(None));
        let sink = error.clone();
        let options = StoreOptions::default()
            .with_version(schema_version)
            .with_error_handler(move |e| *sink.write() = Some(e.to_string()));

        let service = Self {
            store: VersionedStore::new(area, LINKS_KEY, LinksDocument::default(), options),
            links: RwLock::new(Vec::new()),
            error,
            events,
        };
        service.initialize();
        service
    }

    /// Load stored links. Missing, unreadable or empty data is replaced by
    /// the default set, which is then written back.
    #[instrument(skip(self))]
    pub fn initialize(&self) {
        *self.error.write() = None;

        let stored = self.store.load();
        if !stored.links.is_empty() {
            info!("Loaded {} links", stored.links.len());
            *self.links.write() = stored.links;
            return;
        }

        let defaults = default_links();
        debug!("No stored links, seeding {} defaults", defaults.len());
        // On failure the defaults stay in memory and the store records the error
        let _ = self.store.save(LinksDocument {
            links: defaults.clone(),
        });
        *self.links.write() = defaults;
    }

    pub fn links(&self) -> Vec<QuickLink> {
        self.links.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<QuickLink> {
        self.links.read().iter().find(|l| l.id == id).cloned()
    }

    pub fn error(&self) -> Option<String> {
        self.error.read().clone()
    }

    /// Compares against stored (trimmed) urls.
    pub fn is_duplicate_url(&self, url: &str, exclude_id: Option<&str>) -> bool {
        let url = url.trim();
        self.links
            .read()
            .iter()
            .any(|l| l.url == url && Some(l.id.as_str()) != exclude_id)
    }

    #[instrument(skip(self))]
    pub async fn add_link(&self, draft: LinkDraft) -> LinkResult<QuickLink> {
        validate_link(&draft.name, &draft.url).map_err(|e| self.reject(e.into()))?;
        if self.is_duplicate_url(&draft.url, None) {
            return Err(self.reject(LinkError::DuplicateUrl));
        }

        let link = QuickLink {
            id: generate_link_id(),
            name: draft.name.trim().to_string(),
            url: draft.url.trim().to_string(),
            icon: trimmed_icon(draft.icon.as_deref()),
        };

        let added = link.clone();
        self.mutate(move |links| {
            links.push(link);
            true
        })?;

        self.events
            .publish(TOPIC_LINKS, LinkEvent::Added { link: added.clone() })
            .await;
        Ok(added)
    }

    #[instrument(skip(self))]
    pub async fn remove_link(&self, id: &str) -> LinkResult<bool> {
        let removed = self.mutate(|links| {
            let before = links.len();
            links.retain(|l| l.id != id);
            links.len() != before
        })?;

        if removed {
            self.events
                .publish(
                    TOPIC_LINKS,
                    LinkEvent::Removed {
                        link_id: id.to_string(),
                    },
                )
                .await;
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    pub async fn update_link(&self, id: &str, update: LinkUpdate) -> LinkResult<QuickLink> {
        let current = self
            .get(id)
            .ok_or_else(|| self.reject(LinkError::NotFound(id.to_string())))?;

        let name = update.name.unwrap_or(current.name);
        let url = update.url.unwrap_or_else(|| current.url.clone());
        validate_link(&name, &url).map_err(|e| self.reject(e.into()))?;

        if url.trim() != current.url && self.is_duplicate_url(&url, Some(id)) {
            return Err(self.reject(LinkError::DuplicateUrl));
        }

        let updated = QuickLink {
            id: current.id,
            name: name.trim().to_string(),
            url: url.trim().to_string(),
            icon: trimmed_icon(update.icon.as_deref().or(current.icon.as_deref())),
        };

        let replacement = updated.clone();
        self.mutate(move |links| match links.iter_mut().find(|l| l.id == replacement.id) {
            Some(slot) => {
                *slot = replacement;
                true
            }
            None => false,
        })?;

        self.events
            .publish(TOPIC_LINKS, LinkEvent::Updated { link: updated.clone() })
            .await;
        Ok(updated)
    }

    /// Replace the whole list with the default set.
    pub async fn reset_to_defaults(&self) -> LinkResult<Vec<QuickLink>> {
        let defaults = default_links();
        let replacement = defaults.clone();
        self.mutate(move |links| {
            *links = replacement;
            true
        })?;

        self.events
            .publish(
                TOPIC_LINKS,
                LinkEvent::Reset {
                    count: defaults.len(),
                },
            )
            .await;
        Ok(defaults)
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<EventEnvelope<LinkEvent>> {
        self.events.subscribe(TOPIC_LINKS).await
    }

    /// Storage failures are already logged by the store.
    fn reject(&self, err: LinkError) -> LinkError {
        err.log();
        err
    }

    fn mutate<F>(&self, change: F) -> LinkResult<bool>
    where
        F: FnOnce(&mut Vec<QuickLink>) -> bool,
    {
        let mut links = self.links.write();
        let mut next = links.clone();
        if !change(&mut next) {
            return Ok(false);
        }

        self.store.save(LinksDocument {
            links: next.clone(),
        })?;
        *links = next;
        *self.error.write() = None;
        Ok(true)
    }
}
