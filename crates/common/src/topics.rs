use crate::event_bus::Topic;

// Canonical topics shared by the deskpad services
pub const TOPIC_TASKS: Topic = Topic("tasks");
pub const TOPIC_LINKS: Topic = Topic("links");
pub const TOPIC_PWA: Topic = Topic("pwa");
