use super::helpers::{mail, CountingRepository, SIMPLE};
use crate::{matcher::*, MailetContext, ServerIdentity};
use vmail_common::{re::serde_json, Mail};

fn server() -> ServerIdentity {
    ServerIdentity::new("example.com", &["Example.ORG".to_string()])
}

async fn matched(matcher: &dyn Matcher, mail: &Mail) -> Vec<String> {
    let server = server();
    let mut derived = vec![];
    let ctx = MailetContext::new(&server, "root", &mut derived);
    matcher
        .matches(mail, mail.recipients.as_slice(), &ctx)
        .await
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect()
}

async fn simple(rcpt: &[&str]) -> Mail {
    let repository = std::sync::Arc::new(CountingRepository::default());
    mail(&repository, Some("john@doe.com"), rcpt, SIMPLE).await
}

const RCPT: [&str; 3] = ["a@example.com", "b@EXAMPLE.org", "c@remote.net"];

#[tokio::test]
async fn recipient_matchers() {
    let mail = simple(&RCPT).await;

    assert_eq!(matched(&All::new(None).unwrap(), &mail).await, RCPT);
    assert_eq!(
        matched(&HostIsLocal::new(None).unwrap(), &mail).await,
        ["a@example.com", "b@EXAMPLE.org"]
    );
    assert_eq!(
        matched(&HostIs::new(Some("remote.net, example.org")).unwrap(), &mail).await,
        ["b@EXAMPLE.org", "c@remote.net"]
    );
    assert_eq!(
        matched(&RecipientIs::new(Some("b@example.ORG")).unwrap(), &mail).await,
        ["b@EXAMPLE.org"]
    );
    assert_eq!(
        matched(&RecipientIsRegex::new(Some("^[ac]@")).unwrap(), &mail).await,
        ["a@example.com", "c@remote.net"]
    );
}

#[tokio::test]
async fn envelope_matchers() {
    let mut mail = simple(&RCPT).await;

    assert_eq!(
        matched(&SenderIs::new(Some("john@doe.com")).unwrap(), &mail).await,
        RCPT
    );
    assert!(matched(&SenderIsNull::new(None).unwrap(), &mail)
        .await
        .is_empty());
    assert!(matched(&HasSingleRecipient::new(None).unwrap(), &mail)
        .await
        .is_empty());
    assert!(matched(&HasAttribute::new(Some("spam")).unwrap(), &mail)
        .await
        .is_empty());

    mail.sender = None;
    mail.recipients.retain(|rcpt| rcpt.local_part() == "a");
    mail.attributes
        .insert("spam".to_string(), serde_json::json!(5));

    assert_eq!(
        matched(&SenderIs::new(Some("<>")).unwrap(), &mail).await,
        ["a@example.com"]
    );
    assert_eq!(
        matched(&SenderIsNull::new(None).unwrap(), &mail).await,
        ["a@example.com"]
    );
    assert_eq!(
        matched(&HasSingleRecipient::new(None).unwrap(), &mail).await,
        ["a@example.com"]
    );
    assert_eq!(
        matched(&HasAttribute::new(Some("spam")).unwrap(), &mail).await,
        ["a@example.com"]
    );
}

#[tokio::test]
async fn content_matchers() {
    let mail = simple(&["a@example.com"]).await;

    assert_eq!(matched(&SubjectIs::new(Some("hello")).unwrap(), &mail).await.len(), 1);
    assert!(matched(&SubjectIs::new(Some("Hello")).unwrap(), &mail)
        .await
        .is_empty());
    assert_eq!(matched(&HasHeader::new(Some("to")).unwrap(), &mail).await.len(), 1);
    assert_eq!(
        matched(&HasHeader::new(Some("To=a@example.com")).unwrap(), &mail)
            .await
            .len(),
        1
    );
    assert!(matched(&HasHeader::new(Some("To=b@example.com")).unwrap(), &mail)
        .await
        .is_empty());
    assert!(matched(&HasHeader::new(Some("X-Spam")).unwrap(), &mail)
        .await
        .is_empty());
    assert_eq!(
        matched(&SizeGreaterThan::new(Some("10")).unwrap(), &mail)
            .await
            .len(),
        1
    );
    assert!(matched(&SizeGreaterThan::new(Some("1k")).unwrap(), &mail)
        .await
        .is_empty());
    assert!(matched(&HasAttachment::new(None).unwrap(), &mail)
        .await
        .is_empty());

    let repository = std::sync::Arc::new(CountingRepository::default());
    let with_attachment = mail_with(
        &repository,
        b"Content-Type: multipart/mixed; boundary=\"b\"\r\n\r\n--b\r\n\r\ntext\r\n--b--\r\n",
    )
    .await;
    assert_eq!(
        matched(&HasAttachment::new(None).unwrap(), &with_attachment)
            .await
            .len(),
        1
    );
}

async fn mail_with(repository: &std::sync::Arc<CountingRepository>, raw: &[u8]) -> Mail {
    mail(repository, None, &["a@example.com"], raw).await
}

#[tokio::test]
async fn empty_candidates() {
    let repository = std::sync::Arc::new(CountingRepository::default());
    let mail = mail_with(&repository, SIMPLE).await;
    let server = server();
    let mut derived = vec![];
    let ctx = MailetContext::new(&server, "root", &mut derived);

    let matchers: Vec<Box<dyn Matcher>> = vec![
        Box::new(All::new(None).unwrap()),
        Box::new(SubjectIs::new(Some("hello")).unwrap()),
        Box::new(SizeGreaterThan::new(Some("0")).unwrap()),
        Box::new(Not::new(vec![Box::new(HostIsLocal::new(None).unwrap())]).unwrap()),
    ];
    for matcher in &matchers {
        assert!(matcher.matches(&mail, &[], &ctx).await.unwrap().is_empty());
    }
    // the content is not read for nothing.
    assert_eq!(repository.reads(), 0);
}

fn rcpt_is(address: &str) -> Box<dyn Matcher> {
    Box::new(RecipientIs::new(Some(address)).unwrap())
}

#[tokio::test]
async fn composites() {
    let mail = simple(&RCPT).await;

    let and = And::new(vec![
        Box::new(HostIsLocal::new(None).unwrap()),
        rcpt_is("b@example.org, c@remote.net"),
    ])
    .unwrap();
    assert_eq!(matched(&and, &mail).await, ["b@EXAMPLE.org"]);

    let or = Or::new(vec![rcpt_is("c@remote.net"), rcpt_is("a@example.com")]).unwrap();
    // in the order of the recipients, not of the children.
    assert_eq!(matched(&or, &mail).await, ["a@example.com", "c@remote.net"]);

    let not = Not::new(vec![Box::new(HostIsLocal::new(None).unwrap())]).unwrap();
    assert_eq!(matched(&not, &mail).await, ["c@remote.net"]);

    let not_many = Not::new(vec![rcpt_is("a@example.com"), rcpt_is("c@remote.net")]).unwrap();
    assert_eq!(matched(&not_many, &mail).await, ["b@EXAMPLE.org"]);

    let inner = And::new(vec![rcpt_is("a@example.com")]).unwrap();
    let nested = And::new(vec![
        Box::new(All::new(None).unwrap()),
        Box::new(Not::new(vec![Box::new(inner)]).unwrap()),
    ])
    .unwrap();
    assert_eq!(
        matched(&nested, &mail).await,
        ["b@EXAMPLE.org", "c@remote.net"]
    );

    assert!(And::new(vec![]).is_err());
    assert!(Or::new(vec![]).is_err());
    assert!(Not::new(vec![]).is_err());
}

#[tokio::test]
async fn matcher_never_modifies_mail() {
    let mail = simple(&RCPT).await;
    let before = mail.recipients.clone();

    let _ = matched(&HostIsLocal::new(None).unwrap(), &mail).await;
    let _ = matched(&Not::new(vec![rcpt_is("a@example.com")]).unwrap(), &mail).await;

    assert_eq!(mail.recipients, before);
}
