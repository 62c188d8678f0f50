//! Quick links dashboard: a validated, de-duplicated list of bookmarks
//! persisted under the `quick-links` key.

pub mod defaults;
pub mod error;
pub mod service;
pub mod types;

pub use defaults::default_links;
pub use error::{LinkError, LinkResult};
pub use service::{generate_link_id, validate_link, LinkService, LINKS_KEY, MAX_LINK_NAME_CHARS};
pub use types::{LinkDraft, LinkEvent, LinkUpdate, LinksDocument, QuickLink};
