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
use crate::{
    log_channels,
    processes::{pickup, spool},
    Intake,
};
use vmail_common::{
    re::{
        anyhow::{self, Context},
        log,
    },
    MailQueue,
};
use vmail_config::Config;
use vmail_pipeline::RoutingEngine;

fn init_runtime<F>(
    sender: tokio::sync::mpsc::Sender<anyhow::Result<()>>,
    name: impl Into<String>,
    worker_thread_count: usize,
    future: F,
) -> anyhow::Result<std::thread::JoinHandle<anyhow::Result<()>>>
where
    F: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let name = name.into();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_thread_count)
        .enable_all()
        .thread_name(name.clone())
        .build()?;

    std::thread::Builder::new()
        .name(format!("{name}-main"))
        .spawn(move || {
            let output = runtime
                .block_on({
                    log::info!(
                        target: log_channels::RUNTIME,
                        "Runtime '{name}' started successfully"
                    );
                    future
                })
                .context(format!("An error terminated the '{name}' runtime"));

            sender.blocking_send(output)?;
            Ok(())
        })
        .map_err(anyhow::Error::new)
}

/// Start the processing runtime and block until it stops.
///
/// The mails dropped in the pickup directory are handed over to `intake`,
/// which queues them in `queue` for the workers. When `shutdown` resolves,
/// the workers stop, the mails being processed are put back in `queue`, and
/// the mails left in `queue` are written back to the pickup directory.
///
/// # Errors
///
/// * the runtime could not be created
/// * the pickup directory cannot be created or read
/// * a worker panicked
pub fn start_runtime<S>(
    config: std::sync::Arc<Config>,
    engine: std::sync::Arc<RoutingEngine>,
    queue: std::sync::Arc<dyn MailQueue>,
    intake: std::sync::Arc<Intake>,
    shutdown: S,
) -> anyhow::Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let (main_runtime_sender, mut main_runtime_receiver) =
        tokio::sync::mpsc::channel::<anyhow::Result<()>>(1);

    let _tasks_processing = init_runtime(
        main_runtime_sender,
        "vmail-processing",
        config.server.system.thread_pool.processing,
        async move {
            let pickup_dir = pickup::pickup_dir(&config.server.queues.dirpath);
            tokio::fs::create_dir_all(&pickup_dir)
                .await
                .with_context(|| format!("cannot create the pickup directory {pickup_dir:?}"))?;

            let (shutdown_sender, shutdown_receiver) = tokio::sync::watch::channel(false);
            let pickup = tokio::spawn(pickup::start(
                pickup_dir.clone(),
                config.server.queues.pickup_interval,
                intake,
                shutdown_receiver.clone(),
            ));
            let workers = tokio::spawn(spool::start(
                config,
                engine,
                queue.clone(),
                shutdown_receiver,
            ));

            shutdown.await;
            log::info!(target: log_channels::RUNTIME, "Shutdown requested");
            if shutdown_sender.send(true).is_err() {
                log::debug!(target: log_channels::RUNTIME, "Workers already stopped");
            }

            pickup.await??;
            workers.await??;

            let stored = pickup::store_back(&pickup_dir, queue.as_ref()).await?;
            log::info!(
                target: log_channels::RUNTIME,
                "{stored} mail(s) written back to {pickup_dir:?}"
            );
            Ok(())
        },
    )?;

    main_runtime_receiver
        .blocking_recv()
        .ok_or_else(|| anyhow::anyhow!("Channel closed, but should not"))?
}
