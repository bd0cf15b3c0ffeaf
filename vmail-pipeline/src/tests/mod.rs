mod matchers;

pub mod helpers {
    use crate::{Mailet, MailetContext, Outcome, Parameters, Registry};
    use vmail_common::{
        re::{anyhow, async_trait},
        Address, Content, Mail, Recipients, RepositoryError, RetryPolicy,
    };
    use vmail_config::{Config, ConfigProcessor, ConfigStep, FallThrough, MatcherConfig};

    pub const SIMPLE: &[u8] =
        b"From: john@doe.com\r\nTo: a@example.com\r\nSubject: hello\r\n\r\nhello world\r\n";

    pub use vmail_test::repository::CountingRepository;

    pub fn addr(address: &str) -> Address {
        Address::try_from(address).unwrap()
    }

    pub async fn mail(
        repository: &std::sync::Arc<CountingRepository>,
        sender: Option<&str>,
        rcpt: &[&str],
        raw: &[u8],
    ) -> Mail {
        let id = Mail::generate_id();
        let content = Content::create(
            id.clone(),
            repository.clone(),
            RetryPolicy::default(),
            raw.to_vec(),
        )
        .await
        .unwrap();

        let mut mail = Mail::new(
            id,
            sender.map(addr),
            rcpt.iter().copied().map(addr).collect::<Recipients>(),
            content,
        );
        // a new pass starts with nothing in memory.
        mail.content.reset();
        mail
    }

    pub fn config(
        error: Option<&str>,
        processors: Vec<ConfigProcessor>,
        max_hops: usize,
        fall_through: FallThrough,
    ) -> Config {
        Config::builder()
            .with_version_str(">=1.0.0")
            .unwrap()
            .with_server_name_and_local_domains("example.com", &["example.org"])
            .with_default_system()
            .with_default_logs_settings()
            .with_default_queues()
            .with_default_intake()
            .with_default_app_logs()
            .with_processors("root", error, processors)
            .with_routing(max_hops, fall_through)
            .validate()
            .unwrap()
    }

    pub fn step(matcher: &str, mailet: &str) -> ConfigStep {
        ConfigStep::new(matcher.parse::<MatcherConfig>().unwrap(), mailet)
    }

    pub fn record(matcher: &str, tag: &str) -> ConfigStep {
        step(matcher, "Record").with_param("tag", tag)
    }

    /// a call of the [`Record`] mailet.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Call {
        pub tag: String,
        pub processor: String,
        pub matched: Vec<String>,
    }

    pub type Calls = std::sync::Arc<std::sync::Mutex<Vec<Call>>>;

    /// record its calls, then return the outcome given in parameter:
    /// `continue` (default), `terminate`, `fault`, `error` or `locked`.
    pub struct Record {
        tag: String,
        outcome: String,
        calls: Calls,
    }

    #[async_trait::async_trait]
    impl Mailet for Record {
        fn name(&self) -> &str {
            "Record"
        }

        async fn service(
            &self,
            mail: &mut Mail,
            matched: &[Address],
            ctx: &mut MailetContext<'_>,
        ) -> anyhow::Result<Outcome> {
            self.calls.lock().unwrap().push(Call {
                tag: self.tag.clone(),
                processor: ctx.processor().to_string(),
                matched: matched.iter().map(ToString::to_string).collect(),
            });

            match self.outcome.as_str() {
                "terminate" => Ok(Outcome::Terminate),
                "fault" => Ok(Outcome::Fault(format!("'{}' rejected", self.tag))),
                "error" => anyhow::bail!("'{}' failed", self.tag),
                "locked" => Err(RepositoryError::Locked(mail.id().to_string()).into()),
                _ => Ok(Outcome::Continue),
            }
        }
    }

    /// the standard registry, with the [`Record`] mailet.
    pub fn registry(calls: &Calls) -> Registry {
        let calls = calls.clone();
        let mut registry = Registry::standard();
        registry.register_mailet("Record", move |params: &Parameters<'_>| {
            Ok(Box::new(Record {
                tag: params.require_str("tag")?.to_string(),
                outcome: params.get_str("outcome")?.unwrap_or("continue").to_string(),
                calls: calls.clone(),
            }))
        });
        registry
    }

    pub fn tags(calls: &Calls) -> Vec<String> {
        calls
            .lock()
            .unwrap()
            .iter()
            .map(|call| call.tag.clone())
            .collect()
    }
}
