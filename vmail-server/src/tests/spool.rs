use super::helpers::{addr, addrs, delivery_processors, intake, SIMPLE};
use crate::processes::spool;
use vmail_common::{MailQueue, Repository};
use vmail_pipeline::{Disposition, RoutingEngine};
use vmail_test::{
    config::with_processors,
    mailet::{registry, Calls},
    repository::{CountingRepository, FlakyRepository},
};

fn engine(config: &vmail_config::Config, calls: &Calls) -> std::sync::Arc<RoutingEngine> {
    std::sync::Arc::new(RoutingEngine::new(config, &registry(calls)).unwrap())
}

async fn wait_for(condition: impl Fn() -> bool) {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn drain_delivers() {
    let config = with_processors("root", None, delivery_processors());
    let calls = Calls::default();
    let repository = std::sync::Arc::new(CountingRepository::default());
    let (queue, intake) = intake(&config, repository.clone());

    let id = intake
        .send_mail(
            Some(addr("john@doe.com")),
            addrs(&["a@testserver.com", "b@remote.net"]),
            SIMPLE.to_vec(),
        )
        .await
        .unwrap();

    let processed = spool::drain(&config, engine(&config, &calls), queue.clone())
        .await
        .unwrap();

    pretty_assertions::assert_eq!(processed, vec![(id.clone(), Disposition::Discarded)]);
    assert_eq!(calls.tags(), vec!["root"]);
    assert_eq!(calls.all()[0].matched, vec!["a@testserver.com", "b@remote.net"]);
    pretty_assertions::assert_eq!(
        repository.keys(),
        vec![format!("mailboxes/a@testserver.com/{id}"), format!("outgoing/{id}")]
    );
    assert_eq!(repository.reads(), 1);
    assert_eq!(queue.size(), 0);
}

#[tokio::test]
async fn drain_queues_derived_mails() {
    let config = with_processors(
        "root",
        None,
        vec![
            vmail_config::ConfigProcessor::new(
                "root",
                vec![super::helpers::step("HostIsLocal", "ToProcessor")
                    .with_param("processor", "local")],
            ),
            vmail_config::ConfigProcessor::new(
                "local",
                vec![super::helpers::recording("All", "local"), super::helpers::step("All", "Null")],
            ),
        ],
    );
    let calls = Calls::default();
    let repository = std::sync::Arc::new(CountingRepository::default());
    let (queue, intake) = intake(&config, repository.clone());

    let id = intake
        .send_mail(
            None,
            addrs(&["a@testserver.com", "b@remote.net"]),
            SIMPLE.to_vec(),
        )
        .await
        .unwrap();

    let processed = spool::drain(&config, engine(&config, &calls), queue.clone())
        .await
        .unwrap();

    // the original mail keeps b@remote.net and falls through root,
    // the derived one is queued and processed by "local".
    assert_eq!(processed.len(), 2);
    assert_eq!(processed[0], (id, Disposition::Discarded));
    assert_eq!(processed[1].1, Disposition::Discarded);
    assert_ne!(processed[1].0, processed[0].0);

    let calls = calls.all();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].processor, "local");
    assert_eq!(calls[0].matched, vec!["a@testserver.com"]);
    assert!(repository.keys().is_empty());
}

#[tokio::test]
async fn drain_defers_locked_content() {
    let config = with_processors("root", None, delivery_processors());
    let calls = Calls::default();
    let repository = std::sync::Arc::new(FlakyRepository::default());
    let (queue, intake) = intake(&config, repository.clone());
    let engine = engine(&config, &calls);

    let id = intake
        .send_mail(None, addrs(&["a@testserver.com"]), SIMPLE.to_vec())
        .await
        .unwrap();
    repository.fail_locked(1);

    let processed = spool::drain(&config, engine.clone(), queue.clone())
        .await
        .unwrap();
    assert_eq!(processed.len(), 1);
    assert!(matches!(processed[0].1, Disposition::Deferred(_)));
    assert_eq!(queue.size(), 1);
    assert_eq!(repository.inner().keys(), vec![id.clone()]);

    let processed = spool::drain(&config, engine, queue.clone())
        .await
        .unwrap();
    assert_eq!(processed, vec![(id.clone(), Disposition::Discarded)]);
    assert_eq!(
        repository.inner().keys(),
        vec![format!("mailboxes/a@testserver.com/{id}")]
    );
    assert_eq!(calls.tags(), vec!["root", "root"]);
}

#[tokio::test]
async fn workers_stop_on_closed_queue() {
    let config = with_processors("root", None, delivery_processors());
    let calls = Calls::default();
    let repository = std::sync::Arc::new(CountingRepository::default());
    let (queue, intake) = intake(&config, repository.clone());

    for rcpt in ["a@testserver.com", "b@testserver.com", "c@remote.net"] {
        intake
            .send_mail(None, addrs(&[rcpt]), SIMPLE.to_vec())
            .await
            .unwrap();
    }
    queue.close();

    let (_shutdown, shutdown_receiver) = tokio::sync::watch::channel(false);
    spool::start(
        std::sync::Arc::new(config.clone()),
        engine(&config, &calls),
        queue.clone(),
        shutdown_receiver,
    )
    .await
    .unwrap();

    assert_eq!(calls.all().len(), 3);
    assert_eq!(queue.size(), 0);
    assert_eq!(
        repository
            .keys()
            .iter()
            .filter(|key| key.starts_with("mailboxes/"))
            .count(),
        2
    );
}

#[tokio::test]
async fn workers_stop_on_shutdown() {
    let config = with_processors("root", None, delivery_processors());
    let calls = Calls::default();
    let repository = std::sync::Arc::new(CountingRepository::default());
    let (queue, intake) = intake(&config, repository.clone());

    let (shutdown, shutdown_receiver) = tokio::sync::watch::channel(false);
    let workers = tokio::spawn(spool::start(
        std::sync::Arc::new(config.clone()),
        engine(&config, &calls),
        queue.clone(),
        shutdown_receiver,
    ));

    intake
        .send_mail(None, addrs(&["a@testserver.com"]), SIMPLE.to_vec())
        .await
        .unwrap();
    wait_for(|| !repository.keys().iter().any(|key| !key.starts_with("mailboxes/"))).await;

    shutdown.send(true).unwrap();
    workers.await.unwrap().unwrap();

    assert_eq!(calls.tags(), vec!["root"]);
}

#[tokio::test]
async fn shutdown_keeps_queued_mails() {
    let config = with_processors("root", None, delivery_processors());
    let calls = Calls::default();
    let repository = std::sync::Arc::new(CountingRepository::default());
    let (queue, intake) = intake(&config, repository.clone());

    for _ in 0..2 {
        intake
            .send_mail(None, addrs(&["a@testserver.com"]), SIMPLE.to_vec())
            .await
            .unwrap();
    }

    let (shutdown, shutdown_receiver) = tokio::sync::watch::channel(false);
    shutdown.send(true).unwrap();
    spool::start(
        std::sync::Arc::new(config.clone()),
        engine(&config, &calls),
        queue.clone(),
        shutdown_receiver,
    )
    .await
    .unwrap();

    assert!(calls.all().is_empty());
    assert_eq!(queue.size(), 2);
    assert_eq!(repository.keys().len(), 2);
    assert_eq!(repository.reads(), 0);

    let mail = queue.dequeue().await.unwrap();
    assert!(repository.open(mail.content.key()).await.is_ok());
}

#[tokio::test]
async fn shutdown_releases_mails_of_abandoned_pass() {
    let config = with_processors(
        "root",
        None,
        vec![vmail_config::ConfigProcessor::new(
            "root",
            vec![
                super::helpers::step("HostIsLocal", "ToProcessor").with_param("processor", "root"),
                super::helpers::step("All", "Pending"),
            ],
        )],
    );
    let calls = Calls::default();
    let repository = std::sync::Arc::new(CountingRepository::default());
    let (queue, intake) = intake(&config, repository.clone());

    let (shutdown, shutdown_receiver) = tokio::sync::watch::channel(false);
    let workers = tokio::spawn(spool::start(
        std::sync::Arc::new(config.clone()),
        engine(&config, &calls),
        queue.clone(),
        shutdown_receiver,
    ));

    let id = intake
        .send_mail(
            None,
            addrs(&["a@testserver.com", "b@remote.net"]),
            SIMPLE.to_vec(),
        )
        .await
        .unwrap();
    // the split mail for a@testserver.com has been created, b@remote.net is stuck.
    wait_for(|| repository.keys().len() == 2).await;

    shutdown.send(true).unwrap();
    workers.await.unwrap().unwrap();

    assert_eq!(queue.size(), 1);
    assert_eq!(repository.keys(), vec![id.clone()]);

    let mail = queue.dequeue().await.unwrap();
    assert_eq!(mail.id(), id);
    assert_eq!(
        mail.recipients.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["a@testserver.com", "b@remote.net"]
    );
}

fn quarantine_processors() -> Vec<vmail_config::ConfigProcessor> {
    let mut processors = delivery_processors();
    processors.push(vmail_config::ConfigProcessor::new(
        "errors",
        vec![
            super::helpers::recording("All", "errors"),
            super::helpers::step("All", "ToRepository").with_param("repository", "quarantine"),
        ],
    ));
    processors
}

#[tokio::test]
async fn transient_reads_are_retried() {
    let config = with_processors("root", Some("errors"), quarantine_processors());
    assert_eq!(config.server.queues.content.retry_max, 2);
    let calls = Calls::default();
    let repository = std::sync::Arc::new(FlakyRepository::default());
    let (queue, intake) = intake(&config, repository.clone());

    let id = intake
        .send_mail(None, addrs(&["a@testserver.com"]), SIMPLE.to_vec())
        .await
        .unwrap();
    repository.fail_transient(2);

    let processed = spool::drain(&config, engine(&config, &calls), queue.clone())
        .await
        .unwrap();

    assert_eq!(processed, vec![(id.clone(), Disposition::Discarded)]);
    assert_eq!(calls.tags(), vec!["root"]);
    assert_eq!(
        repository.inner().keys(),
        vec![format!("mailboxes/a@testserver.com/{id}")]
    );
    assert_eq!(repository.inner().reads(), 1);
}

#[tokio::test]
async fn exhausted_transient_reads_go_to_error_processor() {
    let config = with_processors("root", Some("errors"), quarantine_processors());
    let calls = Calls::default();
    let repository = std::sync::Arc::new(FlakyRepository::default());
    let (queue, intake) = intake(&config, repository.clone());

    let id = intake
        .send_mail(None, addrs(&["a@testserver.com"]), SIMPLE.to_vec())
        .await
        .unwrap();
    repository.fail_transient(config.server.queues.content.retry_max + 1);

    let processed = spool::drain(&config, engine(&config, &calls), queue.clone())
        .await
        .unwrap();

    assert_eq!(processed, vec![(id.clone(), Disposition::Discarded)]);
    assert_eq!(calls.tags(), vec!["root", "errors"]);
    assert_eq!(repository.inner().keys(), vec![format!("quarantine/{id}")]);
}
