use super::helpers::{addr, delivery_processors, intake, recording, step, SIMPLE};
use crate::{processes::pickup::PickupMessage, start_runtime};
use vmail_common::re::serde_json;
use vmail_pipeline::RoutingEngine;
use vmail_test::{
    config::with_processors,
    mailet::{registry, Calls},
    repository::CountingRepository,
};

fn spool_dir(config: &mut vmail_config::Config, name: &str) -> std::path::PathBuf {
    let dirpath = std::path::PathBuf::from("./tmp/runtime").join(name);
    let _ = std::fs::remove_dir_all(&dirpath);
    std::fs::create_dir_all(dirpath.join("pickup")).unwrap();
    config.server.queues.dirpath = dirpath.clone();
    config.server.queues.pickup_interval = std::time::Duration::from_millis(10);
    dirpath.join("pickup")
}

fn drop_mail(pickup: &std::path::Path) {
    let message = PickupMessage {
        sender: Some(addr("john@doe.com")),
        recipients: vec![addr("a@testserver.com")],
        message: String::from_utf8(SIMPLE.to_vec()).unwrap(),
    };
    std::fs::write(pickup.join("1.json"), serde_json::to_vec(&message).unwrap()).unwrap();
}

fn files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

/// resolves when `condition` holds, or after 5 seconds.
async fn until(condition: impl Fn() -> bool + Send + 'static) {
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async move {
        while !condition() {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    })
    .await;
}

#[test]
fn processing_runtime() {
    let mut config = with_processors("root", None, delivery_processors());
    let pickup = spool_dir(&mut config, "delivery");
    let calls = Calls::default();
    let repository = std::sync::Arc::new(CountingRepository::default());
    let (queue, intake) = intake(&config, repository.clone());

    drop_mail(&pickup);

    let engine = std::sync::Arc::new(RoutingEngine::new(&config, &registry(&calls)).unwrap());
    let delivered = repository.clone();
    start_runtime(
        std::sync::Arc::new(config),
        engine,
        queue,
        std::sync::Arc::new(intake),
        // delivered, and the content of the original mail released.
        until(move || {
            let keys = delivered.keys();
            keys.len() == 1 && keys[0].starts_with("mailboxes/")
        }),
    )
    .unwrap();

    assert_eq!(calls.tags(), vec!["root"]);
    let keys = repository.keys();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("mailboxes/a@testserver.com/"));
    assert!(files(&pickup).is_empty());
}

#[test]
fn unfinished_mails_are_written_back() {
    let mut config = with_processors(
        "root",
        None,
        vec![vmail_config::ConfigProcessor::new(
            "root",
            vec![recording("All", "root"), step("All", "Pending")],
        )],
    );
    let pickup = spool_dir(&mut config, "written_back");
    let calls = Calls::default();
    let repository = std::sync::Arc::new(CountingRepository::default());
    let (queue, intake) = intake(&config, repository.clone());

    drop_mail(&pickup);

    let engine = std::sync::Arc::new(RoutingEngine::new(&config, &registry(&calls)).unwrap());
    let started = calls.clone();
    start_runtime(
        std::sync::Arc::new(config),
        engine,
        queue,
        std::sync::Arc::new(intake),
        until(move || !started.all().is_empty()),
    )
    .unwrap();

    assert_eq!(calls.tags(), vec!["root"]);
    assert!(repository.keys().is_empty());

    let written = files(&pickup);
    assert_eq!(written.len(), 1);
    assert_eq!(
        written[0].file_name().unwrap().to_string_lossy(),
        format!("{}.json", calls.all()[0].mail)
    );
    let message =
        serde_json::from_slice::<PickupMessage>(&std::fs::read(&written[0]).unwrap()).unwrap();
    assert_eq!(message.sender, Some(addr("john@doe.com")));
    assert_eq!(message.recipients, vec![addr("a@testserver.com")]);
    assert_eq!(message.message.as_bytes(), SIMPLE);
}
