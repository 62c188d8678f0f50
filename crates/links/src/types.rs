use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickLink {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Новая ссылка, id выдаёт сервис
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDraft {
    pub name: String,
    pub url: String,
    pub icon: Option<String>,
}

impl LinkDraft {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
}

/// Stored shape: `{"links": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinksDocument {
    pub links: Vec<QuickLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkEvent {
    Added { link: QuickLink },
    Updated { link: QuickLink },
    Removed { link_id: String },
    Reset { count: usize },
}
