/*
 * vMail mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 *  This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
 **/
use crate::log_channels;
use vmail_common::{
    re::{anyhow, log},
    Mail, MailQueue, QueueError, RetryPolicy,
};
use vmail_config::Config;
use vmail_pipeline::{Disposition, RoutingEngine};

/// resolves when the shutdown is requested, or when its sender is gone.
pub(crate) async fn stopping(shutdown: &mut tokio::sync::watch::Receiver<bool>) {
    loop {
        let requested = *shutdown.borrow();
        if requested || shutdown.changed().await.is_err() {
            return;
        }
    }
}

struct Worker {
    id: usize,
    engine: std::sync::Arc<RoutingEngine>,
    queue: std::sync::Arc<dyn MailQueue>,
    retry: RetryPolicy,
    contention_delay: std::time::Duration,
}

impl Worker {
    fn new(
        id: usize,
        config: &Config,
        engine: std::sync::Arc<RoutingEngine>,
        queue: std::sync::Arc<dyn MailQueue>,
    ) -> Self {
        Self {
            id,
            engine,
            queue,
            retry: RetryPolicy {
                retry_max: config.server.queues.content.retry_max,
                delay: config.server.queues.content.retry_delay,
            },
            contention_delay: config.server.queues.contention_delay,
        }
    }

    /// put a mail in the queue, retrying the transient failures.
    async fn enqueue(&self, mail: Mail) {
        let mut attempt = 0;
        loop {
            match self.queue.enqueue(mail.clone()).await {
                Ok(()) => return,
                Err(QueueError::Transient(error)) if attempt < self.retry.retry_max => {
                    attempt += 1;
                    log::warn!(
                        target: log_channels::SPOOL,
                        "[worker {}] '{}' cannot be queued: {error}, retrying ({attempt}/{})",
                        self.id,
                        mail.id(),
                        self.retry.retry_max
                    );
                    tokio::time::sleep(self.retry.delay * u32::try_from(attempt).unwrap_or(u32::MAX))
                        .await;
                }
                Err(error) => {
                    log::error!(
                        target: log_channels::SPOOL,
                        "[worker {}] '{}' cannot be queued: {error}, its content is kept at '{}'",
                        self.id,
                        mail.id(),
                        mail.content.key()
                    );
                    return;
                }
            }
        }
    }

    /// release the content of the mails created by an abandoned pass.
    async fn release(&self, derived: Vec<Mail>) {
        for mail in derived {
            if let Err(error) = mail.content.release().await {
                log::warn!(
                    target: log_channels::SPOOL,
                    "[worker {}] '{}' failed to release the content: {error}",
                    self.id,
                    mail.id()
                );
            }
        }
    }

    async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        log::debug!(target: log_channels::SPOOL, "[worker {}] started", self.id);

        loop {
            let dequeued = tokio::select! {
                biased;
                () = stopping(&mut shutdown) => break,
                dequeued = self.queue.dequeue() => dequeued,
            };

            let mut mail = match dequeued {
                Ok(mail) => mail,
                Err(QueueError::Closed) => {
                    log::info!(
                        target: log_channels::SPOOL,
                        "[worker {}] queue '{}' closed",
                        self.id,
                        self.queue.name()
                    );
                    break;
                }
                Err(QueueError::Transient(error)) => {
                    log::warn!(
                        target: log_channels::SPOOL,
                        "[worker {}] cannot dequeue: {error}",
                        self.id
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    continue;
                }
            };
            let snapshot = mail.clone();
            let mut derived = vec![];

            let disposition = tokio::select! {
                biased;
                () = stopping(&mut shutdown) => None,
                disposition = self.engine.process_into(&mut mail, &mut derived) => Some(disposition),
            };

            let disposition = match disposition {
                Some(disposition) => disposition,
                None => {
                    log::info!(
                        target: log_channels::SPOOL,
                        "[worker {}] '{}' abandoned on shutdown, queued again",
                        self.id,
                        snapshot.id()
                    );
                    self.release(derived).await;
                    self.enqueue(snapshot).await;
                    break;
                }
            };

            for derived in derived {
                self.enqueue(derived).await;
            }

            if let Disposition::Deferred(reason) = disposition {
                log::debug!(
                    target: log_channels::SPOOL,
                    "[worker {}] '{}' deferred ({reason}), queued again in {:?}",
                    self.id,
                    snapshot.id(),
                    self.contention_delay
                );
                tokio::select! {
                    biased;
                    () = stopping(&mut shutdown) => {},
                    () = tokio::time::sleep(self.contention_delay) => {},
                }
                self.enqueue(snapshot).await;
            }
        }

        log::debug!(target: log_channels::SPOOL, "[worker {}] stopped", self.id);
    }
}

/// Run `server.system.thread_pool.processing` workers taking the mails of
/// `queue` through the pipeline, until `shutdown` is set to true.
///
/// A mail being processed when the shutdown is requested is abandoned and
/// put back in the queue as it was dequeued, the mails it created so far
/// are released.
///
/// # Errors
///
/// * a worker panicked
pub async fn start(
    config: std::sync::Arc<Config>,
    engine: std::sync::Arc<RoutingEngine>,
    queue: std::sync::Arc<dyn MailQueue>,
    shutdown: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let worker_count = config.server.system.thread_pool.processing;

    let workers = (0..worker_count)
        .map(|id| {
            let worker = Worker::new(id, &config, engine.clone(), queue.clone());
            tokio::spawn(worker.run(shutdown.clone()))
        })
        .collect::<Vec<_>>();

    log::info!(
        target: log_channels::SPOOL,
        "{worker_count} workers processing queue '{}'",
        queue.name()
    );

    for worker in workers {
        worker.await?;
    }

    log::info!(
        target: log_channels::SPOOL,
        "processing stopped, {} mail(s) left in queue '{}'",
        queue.size(),
        queue.name()
    );

    Ok(())
}

/// Process the mails of `queue` one after the other until it is empty.
///
/// The deferred mails are put back in the queue at the end.
/// Returns the id and disposition of each processed mail.
///
/// # Errors
///
/// * the queue is closed or unavailable
pub async fn drain(
    config: &Config,
    engine: std::sync::Arc<RoutingEngine>,
    queue: std::sync::Arc<dyn MailQueue>,
) -> anyhow::Result<Vec<(String, Disposition)>> {
    let worker = Worker::new(0, config, engine, queue);
    let mut processed = vec![];
    let mut deferred = vec![];

    while worker.queue.size() != 0 {
        let mut mail = worker.queue.dequeue().await?;
        let snapshot = mail.clone();

        let report = worker.engine.process(&mut mail).await;
        for derived in report.derived {
            worker.enqueue(derived).await;
        }
        if matches!(report.disposition, Disposition::Deferred(_)) {
            deferred.push(snapshot);
        }
        processed.push((mail.id().to_string(), report.disposition));
    }

    for mail in deferred {
        worker.enqueue(mail).await;
    }

    Ok(processed)
}
