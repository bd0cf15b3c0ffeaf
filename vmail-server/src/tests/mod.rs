mod memory_queue;
mod runtime;
mod spool;

pub mod helpers {
    use vmail_common::{Address, MailQueue, Repository};
    use vmail_config::{ConfigProcessor, ConfigStep, MatcherConfig};

    use crate::{Intake, MemoryQueue};

    pub const SIMPLE: &[u8] =
        b"From: john@doe.com\r\nTo: a@testserver.com\r\nSubject: hello\r\n\r\nhello world\r\n";

    pub fn addr(address: &str) -> Address {
        Address::try_from(address).unwrap()
    }

    pub fn addrs(addresses: &[&str]) -> Vec<Address> {
        addresses.iter().copied().map(addr).collect()
    }

    pub fn step(matcher: &str, mailet: &str) -> ConfigStep {
        ConfigStep::new(matcher.parse::<MatcherConfig>().unwrap(), mailet)
    }

    pub fn recording(matcher: &str, tag: &str) -> ConfigStep {
        step(matcher, "Recording").with_param("tag", tag)
    }

    /// root records and delivers local recipients, the others are stored in "outgoing".
    pub fn delivery_processors() -> Vec<ConfigProcessor> {
        vec![ConfigProcessor::new(
            "root",
            vec![
                recording("All", "root"),
                step("HostIsLocal", "LocalDelivery"),
                step("All", "ToRepository").with_param("repository", "outgoing"),
            ],
        )]
    }

    pub fn intake(
        config: &vmail_config::Config,
        repository: std::sync::Arc<dyn Repository>,
    ) -> (std::sync::Arc<MemoryQueue>, Intake) {
        let queue = std::sync::Arc::new(MemoryQueue::new(
            "working",
            config.server.queues.working.channel_size,
        ));
        let intake = Intake::new(config, queue.clone() as std::sync::Arc<dyn MailQueue>, repository);
        (queue, intake)
    }
}
