use common::{init_structured_logging, LoggingConfig, OperationTimer};
use tracing::Level;

// Глобальный subscriber ставится один раз на процесс, поэтому один тест
#[test]
fn test_json_logging_initialises_once() {
    let config = LoggingConfig::default().with_level_str("debug").with_json(true);
    assert_eq!(config.level, Level::DEBUG);
    assert!(config.json_output);

    init_structured_logging(config.clone()).unwrap();
    tracing::info!(key = "tasks", "record saved");

    let mut timer = OperationTimer::new("save_tasks");
    timer.add_field("count", 3);
    timer.finish();

    assert!(init_structured_logging(config).is_err());
}
