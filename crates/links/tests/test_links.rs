use links::*;
use serde_json::json;
use std::sync::Arc;
use storage::StorageArea;
use tempfile::TempDir;
use uuid::Uuid;

fn service() -> LinkService {
    LinkService::new(Arc::new(StorageArea::session()))
}

#[tokio::test]
async fn test_first_run_seeds_defaults() {
    let area = Arc::new(StorageArea::session());
    let service = LinkService::new(area.clone());

    let ids: Vec<_> = service.links().into_iter().map(|l| l.id).collect();
    assert_eq!(ids, ["github", "stackoverflow", "mdn", "vue", "tailwind", "vite"]);

    let raw: serde_json::Value =
        serde_json::from_str(&area.get_item(LINKS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(raw["data"]["links"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_empty_or_invalid_store_falls_back_to_defaults() {
    let area = Arc::new(StorageArea::session());
    let raw = json!({"_version": "1.0", "data": {"links": "nope"}, "timestamp": 0});
    area.set_item(LINKS_KEY, &raw.to_string(), Uuid::new_v4())
        .unwrap();

    let service = LinkService::new(area);
    assert_eq!(service.links(), default_links());
}

#[tokio::test]
async fn test_add_trims_and_appends() {
    let service = service();
    let link = service
        .add_link(LinkDraft::new("  Docs.rs ", " https://docs.rs ").with_icon(" book "))
        .await
        .unwrap();

    assert!(link.id.starts_with("link_"));
    assert_eq!(link.name, "Docs.rs");
    assert_eq!(link.url, "https://docs.rs");
    assert_eq!(link.icon.as_deref(), Some("book"));
    assert_eq!(service.links().last(), Some(&link));
}

#[tokio::test]
async fn test_add_rejects_invalid_and_duplicates() {
    let service = service();

    let err = service
        .add_link(LinkDraft::new("", "ftp//broken"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "link name must not be empty, invalid url");

    let err = service
        .add_link(LinkDraft::new("Mirror", "https://github.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, LinkError::DuplicateUrl));
    assert_eq!(service.links().len(), 6);
}

#[tokio::test]
async fn test_update_link() {
    let service = service();

    let err = service
        .update_link("missing", LinkUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LinkError::NotFound(_)));

    let updated = service
        .update_link(
            "vue",
            LinkUpdate {
                name: Some(" Vue 3 ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Vue 3");
    assert_eq!(updated.url, "https://vuejs.org");
    assert_eq!(updated.icon.as_deref(), Some("vue"));

    // same url as before is not a duplicate of itself
    service
        .update_link(
            "vue",
            LinkUpdate {
                url: Some("https://vuejs.org".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = service
        .update_link(
            "vue",
            LinkUpdate {
                url: Some("https://vitejs.dev".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LinkError::DuplicateUrl));
}

#[tokio::test]
async fn test_remove_and_reset() {
    let service = service();
    let mut rx = service.subscribe().await;

    assert!(service.remove_link("mdn").await.unwrap());
    assert!(!service.remove_link("mdn").await.unwrap());
    assert_eq!(service.links().len(), 5);
    assert!(!service.is_duplicate_url("https://developer.mozilla.org", None));
    assert!(service.is_duplicate_url("https://vitejs.dev", None));
    assert!(!service.is_duplicate_url("https://vitejs.dev", Some("vite")));

    let restored = service.reset_to_defaults().await.unwrap();
    assert_eq!(restored.len(), 6);
    assert_eq!(service.links(), default_links());

    assert_eq!(
        rx.recv().await.unwrap().payload,
        LinkEvent::Removed {
            link_id: "mdn".into()
        }
    );
    assert_eq!(rx.recv().await.unwrap().payload, LinkEvent::Reset { count: 6 });
}

#[tokio::test]
async fn test_links_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deskpad.db");

    {
        let area = Arc::new(StorageArea::open_local(&path, 1).unwrap());
        let service = LinkService::new(area);
        service.remove_link("github").await.unwrap();
    }

    let area = Arc::new(StorageArea::open_local(&path, 1).unwrap());
    let service = LinkService::new(area);
    assert_eq!(service.links().len(), 5);
    assert!(service.get("github").is_none());
}
