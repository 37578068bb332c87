use courier_foundation::{
    Content, Email, FileResolver, FoundationError, Lookup, Message, MessagingBuilder, PlaceholderParser, Placeholders,
    ResourceResolutionBuilder, SendError, Sms, TemplateContent, TemplateEnginesBuilder,
};
use courier_kernel::conditions::from_fn;
use courier_kernel::{
    ConfigPropertySource, ConfigurationValue, Environment, MapPropertySource, RequiredComponent, RequiredProperty,
    Requirements,
};
use courier_testing::{RecordingSender, assert_sent, init_tracing};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

const SETTINGS: &str = r#"
mail:
  smtp:
    host: smtp.example.org
sms:
  smpp:
    host: "${sms.gateway:smpp.example.org}"
    port: 2775
"#;

struct Fixture {
    _dir: TempDir,
    environment: Environment,
    templates: ResourceResolutionBuilder,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join("courier.yaml");
    fs::write(&settings, SETTINGS).unwrap();
    fs::create_dir(dir.path().join("mail")).unwrap();
    fs::write(dir.path().join("mail/welcome.txt"), "Hello {{name}}, welcome aboard").unwrap();

    let environment = Environment::default()
        .with_component("smtp-transport")
        .with_component("cloudhopper")
        .with_properties(ConfigPropertySource::load(settings.to_str().unwrap()).unwrap());
    let templates = ResourceResolutionBuilder::new()
        .with_string()
        .with_file(FileResolver::with_base(dir.path()))
        .with_default_lookup(Lookup::File);

    Fixture {
        _dir: dir,
        environment,
        templates,
    }
}

fn smtp() -> RecordingSender {
    RecordingSender::new("smtp").with_requirements(
        Requirements::new()
            .component("smtp-transport")
            .property("mail.smtp.host"),
    )
}

fn sendgrid() -> RecordingSender {
    RecordingSender::new("sendgrid").with_requirements(Requirements::new().property("sendgrid.api-key"))
}

fn cloudhopper() -> RecordingSender {
    RecordingSender::new("cloudhopper").with_requirements(
        Requirements::new()
            .component_spec(RequiredComponent::new("cloudhopper").with_excludes(["ovh-client"]))
            .property_spec(RequiredProperty::new("sms.smpp.port").matching("[0-9]+")),
    )
}

#[test]
fn configured_senders_are_selected_from_the_environment() {
    init_tracing();
    let fixture = fixture();
    let (smtp, sendgrid, cloudhopper) = (smtp(), sendgrid(), cloudhopper());

    let service = MessagingBuilder::new()
        .with_environment(fixture.environment)
        .with_email_sender(sendgrid.clone())
        .with_email_sender(smtp.clone())
        .with_sms_sender(cloudhopper.clone())
        .with_template_engines(
            TemplateEnginesBuilder::new().register(PlaceholderParser::new("braces", Placeholders::Braces)),
        )
        .with_resources(fixture.templates)
        .build()
        .unwrap();

    let welcome = Email::new(
        "Welcome",
        Content::template(TemplateContent::new("mail/welcome.txt").with_variable("name", "Ada")),
    )
    .to("ada@example.org");
    service.send(welcome.into()).unwrap();
    service.send(Sms::new("Your code is 4242").to("+33600000000").into()).unwrap();

    assert_sent!(sendgrid, 0);
    assert_sent!(smtp, 1);
    assert_sent!(cloudhopper, 1);
    assert_eq!(
        smtp.history()[0].content(),
        &Content::text("Hello Ada, welcome aboard")
    );
}

#[test]
fn property_values_resolve_through_the_shared_probe() {
    let fixture = fixture();
    let service = MessagingBuilder::new()
        .with_environment(fixture.environment)
        .with_sms_sender(cloudhopper())
        .build()
        .unwrap();

    let probe = service.probe();
    assert_eq!(probe.config_value("sms.smpp.host").as_deref(), Some("smpp.example.org"));

    let port = ConfigurationValue::<u16>::new()
        .properties(["sms.port", "sms.smpp.port"])
        .default_value(25)
        .resolve(probe)
        .unwrap();
    assert_eq!(port, Some(2775));

    let timeout = ConfigurationValue::<u32>::new()
        .properties(["sms.smpp.timeout"])
        .default_value(30)
        .resolve(probe)
        .unwrap();
    assert_eq!(timeout, Some(30));
}

#[test]
fn runtime_hook_is_checked_on_every_send() {
    let enabled = Arc::new(AtomicBool::new(true));
    let flag = enabled.clone();
    let primary = RecordingSender::new("primary")
        .with_enabled(from_fn("enabled", move |_: &Message| flag.load(Ordering::SeqCst)));
    let backup = RecordingSender::new("backup");

    let service = MessagingBuilder::new()
        .with_environment(Environment::default().with_properties(MapPropertySource::new("app")))
        .with_sms_sender(primary.clone())
        .with_sms_sender(backup.clone())
        .build()
        .unwrap();

    service.send(Sms::new("one").into()).unwrap();
    enabled.store(false, Ordering::SeqCst);
    service.send(Sms::new("two").into()).unwrap();

    assert_sent!(primary, 1);
    assert_sent!(backup, 1);
}

#[test]
fn missing_capabilities_surface_as_a_no_sender_report() {
    let service = MessagingBuilder::new()
        .with_email_sender(sendgrid())
        .build()
        .unwrap();

    let report = service.send(Email::new("Hi", "Hello").into()).unwrap_err();
    let FoundationError::Send(SendError::NoSender(no_match)) = report.current_context() else {
        panic!("unexpected error: {report:?}");
    };
    assert_eq!(no_match.target, "email-senders");
    assert!(no_match.evaluated[0].guard.contains("sendgrid.api-key"));
}

#[test]
fn missing_template_aborts_the_send() {
    let fixture = fixture();
    let smtp = smtp();
    let service = MessagingBuilder::new()
        .with_environment(fixture.environment)
        .with_email_sender(smtp.clone())
        .with_template_engines(
            TemplateEnginesBuilder::new().register(PlaceholderParser::new("braces", Placeholders::Braces)),
        )
        .with_resources(fixture.templates)
        .build()
        .unwrap();

    let email = Email::new("Reset", Content::template(TemplateContent::new("mail/reset.txt")));
    let report = service.send(email.into()).unwrap_err();
    assert!(matches!(report.current_context(), FoundationError::Resource(_)));
    assert!(format!("{report:?}").contains("translating email content"));
    assert_sent!(smtp, 0);
}
