use courier_kernel::conditions::*;
use courier_kernel::{
    Candidate, CapabilityProbe, MatchRequirement, RequiredComponent, RequiredProperty, Registry, Requirements,
};
use courier_testing::{StubEnvironment, counting, init_tracing};
use std::sync::Arc;
use std::thread;

fn compiled(requirements: &Requirements) -> courier_kernel::Condition<()> {
    requirements.compile().unwrap()
}

#[test]
fn required_component_with_exclusion() {
    init_tracing();
    let guard = compiled(&Requirements::new().component_spec(RequiredComponent::new("A").with_excludes(["B"])));

    let only_a = StubEnvironment::new().with_type("A");
    assert!(guard.accept(&(), &only_a.probe()));

    let both = StubEnvironment::new().with_type("A").with_type("B");
    assert!(!guard.accept(&(), &both.probe()));

    let neither = StubEnvironment::new();
    assert!(!guard.accept(&(), &neither.probe()));
}

#[test]
fn property_alternative_satisfies_presence() {
    let spec = RequiredProperty::new("x.y").with_alternatives(["x.z"]);
    let guard = compiled(&Requirements::new().property_spec(spec.clone()));

    let env = StubEnvironment::new().with_config("x.z", "fallback");
    let probe = env.probe();
    assert!(guard.accept(&(), &probe));

    let resolved = spec.resolve(&probe).unwrap();
    assert_eq!(resolved.key, "x.z");
    assert_eq!(resolved.value, "fallback");
}

#[test]
fn primary_property_wins_over_alternatives() {
    let spec = RequiredProperty::new("x.y").with_alternatives(["x.z"]);
    let env = StubEnvironment::new().with_config("x.y", "primary").with_config("x.z", "alt");

    let resolved = spec.resolve(&env.probe()).unwrap();
    assert_eq!(resolved.key, "x.y");
}

#[test]
fn multiple_requirement_blocks_are_anded() {
    let blocks = [
        Requirements::new().component("smtp"),
        Requirements::new().property("mail.host"),
    ];
    let guard: courier_kernel::Condition<()> = courier_kernel::compile_all(&blocks).unwrap();

    let env = StubEnvironment::new().with_type("smtp");
    assert!(!guard.accept(&(), &env.probe()));

    env.set_config("mail.host", Some("localhost"));
    assert!(guard.accept(&(), &env.probe()));
}

#[test]
fn and_short_circuits_on_first_false() {
    let probe = CapabilityProbe::empty();
    let (second, calls) = counting::<()>("second", true);

    assert!(!and([always_false(), second]).accept(&(), &probe));
    assert_eq!(calls.count(), 0);
}

#[test]
fn probe_memoizes_each_name() {
    let env = StubEnvironment::new().with_type("smtp");
    let probe = env.probe();

    assert!(probe.type_present("smtp"));
    assert!(probe.type_present("smtp"));
    assert!(!probe.type_present("twilio"));
    assert!(!probe.type_present("twilio"));
    assert_eq!(env.type_probes(), 2);

    assert!(!probe.config_present("mail.host"));
    assert!(!probe.config_present("mail.host"));
    assert_eq!(env.config_probes(), 1);
}

#[test]
fn cached_facts_outlive_environment_changes_until_reset() {
    let env = StubEnvironment::new();
    let probe = env.probe();
    assert!(!probe.type_present("smtp"));

    env.set_type("smtp", true);
    assert!(!probe.type_present("smtp"));

    probe.reset();
    assert!(probe.type_present("smtp"));
    assert_eq!(env.type_probes(), 2);
}

#[test]
fn concurrent_first_probes_agree() {
    let env = StubEnvironment::new().with_type("smtp");
    let probe = Arc::new(env.probe());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let probe = probe.clone();
            thread::spawn(move || probe.type_present("smtp"))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    // Racing threads may each probe once; never more than one per thread.
    assert!((1..=8).contains(&env.type_probes()));
    assert_eq!(probe.facts().len(), 1);
}

#[test]
fn first_match_follows_capabilities() {
    init_tracing();
    let mut registry: Registry<(), &str> = Registry::new("senders");
    registry.register(Candidate::guarded("cloudhopper", type_present("cloudhopper"), "smpp"));
    registry.register(Candidate::guarded("ovh", config_present("ovh.app.key"), "http"));
    registry.register(Candidate::unguarded("console", "log"));

    let env = StubEnvironment::new().with_config("ovh.app.key", "k");
    let winner = registry.select_first_match(&(), &env.probe()).unwrap();
    assert_eq!(winner.key(), "ovh");

    env.set_type("cloudhopper", true);
    let fresh = env.probe();
    assert_eq!(registry.select_first_match(&(), &fresh).unwrap().key(), "cloudhopper");

    let all = registry
        .select_all_matches(&(), &fresh, MatchRequirement::AtLeastOne)
        .unwrap();
    let keys: Vec<_> = all.iter().map(|c| c.key()).collect();
    assert_eq!(keys, vec!["cloudhopper", "ovh", "console"]);
}

#[test]
fn no_match_error_lists_every_evaluated_guard() {
    let mut registry: Registry<(), &str> = Registry::new("senders");
    registry.register(Candidate::guarded("a", type_present("A"), "a"));
    registry.register(Candidate::guarded("b", not(type_present("B")) & type_present("C"), "b"));

    let err = registry
        .select_first_match(&(), &StubEnvironment::new().probe())
        .unwrap_err();
    assert_eq!(err.target, "senders");
    assert_eq!(err.evaluated.len(), 2);
    assert_eq!(err.evaluated[0].key, "a");
    assert_eq!(err.evaluated[1].key, "b");

    let optional = registry
        .select_all_matches(&(), &StubEnvironment::new().probe(), MatchRequirement::Optional)
        .unwrap();
    assert!(optional.is_empty());
}

#[test]
fn value_constraints_check_the_resolved_value() {
    let spec = RequiredProperty::new("sms.port")
        .with_alternatives(["smpp.port"])
        .matching("[0-9]+");
    let guard = compiled(&Requirements::new().property_spec(spec));

    let numeric = StubEnvironment::new().with_config("smpp.port", "2775");
    assert!(guard.accept(&(), &numeric.probe()));

    let named = StubEnvironment::new().with_config("smpp.port", "smpp");
    assert!(!guard.accept(&(), &named.probe()));
}
