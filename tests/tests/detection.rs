use courier_foundation::{
    TemplateEnginesBuilder, TemplateError, TemplateRequest, Variant, content_marker_detector, extension_detector,
};
use courier_kernel::{CapabilityProbe, DetectingDispatcher, Requirements};
use courier_testing::{StaticParser, StubEnvironment, counting, init_tracing};
use std::sync::Arc;

#[test]
fn single_candidate_never_runs_its_detector() {
    init_tracing();
    let (detector, calls) = counting::<String>("never", false);
    let mut dispatcher = DetectingDispatcher::new("engines");
    dispatcher.register("only", detector, "engine");

    let detected = dispatcher
        .dispatch_by_detection(&"welcome.html".to_string(), &CapabilityProbe::empty())
        .unwrap();
    assert_eq!(detected.key, "only");
    assert!(detected.bypassed);
    assert_eq!(calls.count(), 0);
}

#[test]
fn detection_stops_at_first_positive_detector() {
    let (first, first_calls) = counting::<String>("first", false);
    let (second, second_calls) = counting::<String>("second", true);
    let (third, third_calls) = counting::<String>("third", true);

    let mut dispatcher = DetectingDispatcher::new("engines");
    dispatcher
        .register("a", first, 'a')
        .register("b", second, 'b')
        .register("c", third, 'c');

    let detected = dispatcher
        .dispatch_by_detection(&"x".to_string(), &CapabilityProbe::empty())
        .unwrap();
    assert_eq!(*detected.implementation, 'b');
    assert!(!detected.bypassed);
    assert_eq!((first_calls.count(), second_calls.count(), third_calls.count()), (1, 1, 0));
}

#[test]
fn undetected_invocation_names_every_detector() {
    let (first, _) = counting::<String>("first", false);
    let (second, _) = counting::<String>("second", false);
    let mut dispatcher = DetectingDispatcher::new("engines");
    dispatcher.register("a", first, ()).register("b", second, ());

    let err = dispatcher
        .dispatch_by_detection(&"plain.txt".to_string(), &CapabilityProbe::empty())
        .unwrap_err();
    assert_eq!(err.target, "engines");
    assert!(err.subject.contains("plain.txt"));
    let keys: Vec<_> = err.evaluated.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["a", "b"]);
}

#[test]
fn template_engines_pick_a_parser_per_template() {
    init_tracing();
    let freemarker = StaticParser::new("freemarker", "from freemarker");
    let mustache = StaticParser::new("mustache", "from mustache");

    let engine = TemplateEnginesBuilder::new()
        .register_detected(freemarker.clone(), extension_detector([".ftl", ".ftlh"]))
        .register_detected(mustache.clone(), content_marker_detector("{{"))
        .with_variant_extension("freemarker", Variant::Html, ".html.ftl")
        .build(Arc::new(CapabilityProbe::empty()))
        .unwrap();

    let ftl = TemplateRequest::new("classpath:mail/welcome.ftl", "<#if x>");
    let hbs = TemplateRequest::new("classpath:mail/welcome.hbs", "Hi {{name}}");

    assert_eq!(engine.parse(&ftl).unwrap(), "from freemarker");
    assert_eq!(engine.parse(&hbs).unwrap(), "from mustache");
    assert_eq!(freemarker.parsed_paths(), vec!["classpath:mail/welcome.ftl"]);
    assert_eq!(mustache.parsed_paths(), vec!["classpath:mail/welcome.hbs"]);

    assert_eq!(engine.variant_extension(&ftl, &Variant::Html).unwrap(), ".html.ftl");
    assert!(matches!(
        engine.variant_extension(&hbs, &Variant::Html),
        Err(TemplateError::Adapter(_))
    ));
}

#[test]
fn no_engine_is_a_build_error() {
    let err = TemplateEnginesBuilder::new()
        .build(Arc::new(CapabilityProbe::empty()))
        .unwrap_err();
    assert!(matches!(err, TemplateError::NoParserAvailable));
}

#[test]
fn engines_without_their_component_sit_out_detection() {
    let freemarker = StaticParser::new("freemarker", "from freemarker")
        .with_requirements(Requirements::new().component("freemarker"));
    let thymeleaf = StaticParser::new("thymeleaf", "from thymeleaf")
        .with_requirements(Requirements::new().component("thymeleaf"));
    let env = StubEnvironment::new().with_type("thymeleaf");

    let engine = TemplateEnginesBuilder::new()
        .register(freemarker.clone())
        .register(thymeleaf.clone())
        .build(Arc::new(env.probe()))
        .unwrap();

    let request = TemplateRequest::new("classpath:mail/welcome.ftl", "<#if x>");
    assert_eq!(engine.engine_names(), vec!["thymeleaf"]);
    assert_eq!(engine.parse(&request).unwrap(), "from thymeleaf");
    assert!(freemarker.parsed_paths().is_empty());
    assert_eq!(env.type_probes(), 2);
}
