use common::topics::{TOPIC_LINKS, TOPIC_TASKS};
use common::EventBus;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_subscriber_gets_every_event_in_order() {
    let bus: EventBus<u32> = EventBus::new(64, Duration::from_millis(250));

    let mut receivers = Vec::new();
    for _ in 0..10 {
        receivers.push(bus.subscribe(TOPIC_TASKS).await);
    }

    for n in 0..20 {
        assert_eq!(bus.publish(TOPIC_TASKS, n).await, 10);
    }

    let handles: Vec<_> = receivers
        .into_iter()
        .map(|mut rx| {
            tokio::spawn(async move {
                let mut seen = Vec::new();
                while seen.len() < 20 {
                    seen.push(rx.recv().await.unwrap().payload);
                }
                seen
            })
        })
        .collect();

    for handle in handles {
        let seen = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn late_subscriber_sees_only_new_events() {
    let bus: EventBus<&'static str> = EventBus::default();
    bus.publish(TOPIC_LINKS, "before").await;

    let mut rx = bus.subscribe(TOPIC_LINKS).await;
    bus.publish(TOPIC_LINKS, "after").await;

    assert_eq!(rx.recv().await.unwrap().payload, "after");
}

#[tokio::test]
async fn slow_subscriber_lags_instead_of_blocking_publishers() {
    let bus: EventBus<u32> = EventBus::new(2, Duration::from_millis(100));
    let mut rx = bus.subscribe(TOPIC_TASKS).await;

    for n in 0..5 {
        bus.publish(TOPIC_TASKS, n).await;
    }

    assert!(matches!(rx.recv().await, Err(RecvError::Lagged(3))));
    assert_eq!(rx.recv().await.unwrap().payload, 3);
    assert_eq!(rx.recv().await.unwrap().payload, 4);
}
