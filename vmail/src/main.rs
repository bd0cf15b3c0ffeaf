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
use vmail::{Args, Commands};
use vmail_common::{
    re::{
        anyhow::{self, Context},
        log, serde_json,
    },
    Address, MailQueue,
};
use vmail_config::{get_log4rs_config, re::log4rs, Config};
use vmail_pipeline::RoutingEngine;
use vmail_server::{
    processes::{pickup, spool},
    re::tokio,
    start_runtime, FileRepository, Intake, MemoryQueue,
};

fn working_queue(config: &Config) -> std::sync::Arc<dyn MailQueue> {
    std::sync::Arc::new(MemoryQueue::new(
        "working",
        config.server.queues.working.channel_size,
    ))
}

fn inject(
    config: &Config,
    engine: RoutingEngine,
    from: Option<String>,
    to: Vec<String>,
    file: &str,
) -> anyhow::Result<()> {
    let sender = from
        .map(|from| Address::try_from(from.as_str()))
        .transpose()?;
    let recipients = to
        .iter()
        .map(|rcpt| Address::try_from(rcpt.as_str()))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let content = std::fs::read(file).with_context(|| format!("Cannot read file '{}'", file))?;

    let repository = FileRepository::new(&config.server.queues.dirpath)?;
    let queue = working_queue(config);
    let intake = Intake::new(config, queue.clone(), std::sync::Arc::new(repository));

    let processed = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async move {
            intake.send_mail(sender, recipients, content).await?;
            spool::drain(config, std::sync::Arc::new(engine), queue).await
        })?;

    for (id, disposition) in processed {
        println!("{id}: {disposition:?}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = <Args as clap::StructOpt>::parse();

    let config = match args.config {
        Some(config) => std::fs::read_to_string(&config)
            .with_context(|| format!("Cannot read file '{}'", config))
            .and_then(|data| Config::from_toml(&data).with_context(|| "File contains format error"))
            .with_context(|| "Cannot parse the configuration")?,
        None => Config::default(),
    };

    let command = match args.command {
        Some(Commands::ConfigShow) => {
            let stringified = serde_json::to_string_pretty(&config)?;
            println!("Loaded configuration: {}", stringified);
            return Ok(());
        }
        Some(Commands::ConfigDiff) => {
            let loaded_config = serde_json::to_string_pretty(&config)?;
            let default_config = serde_json::to_string_pretty(&Config::default())?;
            for diff in diff::lines(&default_config, &loaded_config) {
                match diff {
                    diff::Result::Left(left) => println!("-\x1b[0;31m{left}\x1b[0m"),
                    diff::Result::Both(same, _) => println!(" {same}"),
                    diff::Result::Right(right) => println!("+\x1b[0;32m{right}\x1b[0m"),
                }
            }
            return Ok(());
        }
        otherwise => otherwise,
    };

    get_log4rs_config(&config, args.no_daemon)
        .context("Logs configuration contain error")
        .map(log4rs::init_config)
        .context("Cannot initialize logs")??;

    let engine = RoutingEngine::with_standard_registry(&config)
        .context("The pipeline configuration contains errors")?;

    if let Some(Commands::Inject { from, to, file }) = command {
        return inject(&config, engine, from, to, &file);
    }

    let repository = FileRepository::new(&config.server.queues.dirpath)?;
    let queue = working_queue(&config);
    let intake = Intake::new(&config, queue.clone(), std::sync::Arc::new(repository));

    log::info!(
        "vMail processing mails of '{}' dropped in {:?}, pipeline rooted at '{}'",
        config.server.domain,
        pickup::pickup_dir(&config.server.queues.dirpath),
        engine.root()
    );

    start_runtime(
        std::sync::Arc::new(config),
        std::sync::Arc::new(engine),
        queue,
        std::sync::Arc::new(intake),
        async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                log::error!("Cannot listen for the shutdown signal: {error}");
            }
        },
    )
}
