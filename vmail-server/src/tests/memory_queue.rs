use super::helpers::addrs;
use crate::MemoryQueue;
use vmail_common::{Content, Mail, MailQueue, QueueError, RetryPolicy};
use vmail_test::repository::CountingRepository;

fn mail(id: &str) -> Mail {
    Mail::new(
        id.to_string(),
        None,
        addrs(&["a@testserver.com"]).into(),
        Content::new(
            id,
            std::sync::Arc::new(CountingRepository::default()),
            RetryPolicy::default(),
        ),
    )
}

#[tokio::test]
async fn first_in_first_out() {
    let queue = MemoryQueue::new("working", 4);
    assert_eq!(queue.name(), "working");

    for id in ["1", "2", "3"] {
        queue.enqueue(mail(id)).await.unwrap();
    }
    assert_eq!(queue.size(), 3);

    for id in ["1", "2", "3"] {
        assert_eq!(queue.dequeue().await.unwrap().id(), id);
    }
    assert_eq!(queue.size(), 0);
}

#[tokio::test]
async fn full_queue_refuses_mails() {
    let queue = MemoryQueue::new("working", 1);

    queue.enqueue(mail("1")).await.unwrap();
    assert!(matches!(
        queue.enqueue(mail("2")).await,
        Err(QueueError::Transient(_))
    ));
    assert_eq!(queue.size(), 1);

    assert_eq!(queue.dequeue().await.unwrap().id(), "1");
    queue.enqueue(mail("2")).await.unwrap();
    assert_eq!(queue.size(), 1);
}

#[tokio::test]
async fn closed_queue_is_drained() {
    let queue = MemoryQueue::new("working", 0);

    queue.enqueue(mail("1")).await.unwrap();
    queue.close();

    assert_eq!(queue.enqueue(mail("2")).await, Err(QueueError::Closed));
    assert_eq!(queue.size(), 1);
    assert_eq!(queue.dequeue().await.unwrap().id(), "1");
    assert_eq!(queue.dequeue().await.unwrap_err(), QueueError::Closed);
    assert_eq!(queue.size(), 0);
}
