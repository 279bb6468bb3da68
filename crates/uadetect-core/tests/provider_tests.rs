//! Lookup pipeline tests for Provider

use uadetect_core::dataset::DatasetBuilder;
use uadetect_core::handler::{Algorithm, HandlerDef};
use uadetect_core::pattern::PatternNode;
use uadetect_core::{MatchMethod, Provider, ProviderConfig, RequestHeaders, Resolution};

fn allow(pattern: &str) -> PatternNode {
    PatternNode::new(pattern).unwrap()
}

/// generic ─ d1 "Mozilla/5.0 X", one handler for Mozilla agents
fn mozilla_provider(config: ProviderConfig) -> Provider {
    let mut builder = DatasetBuilder::new();
    builder.handler(HandlerDef::new("mozilla", 100, Algorithm::EditDistance).allow(allow("^Mozilla")));
    builder.device("generic", None, None).unwrap();
    builder.device("d1", Some("Mozilla/5.0 X"), Some("generic")).unwrap();
    builder.build(config)
}

/// generic ─ nokia_generic ─ { nokia_6230 (uaprof), nokia_6230i }
fn nokia_provider() -> Provider {
    let mut builder = DatasetBuilder::new();
    builder.handler(
        HandlerDef::new("nokia", 200, Algorithm::EditDistance)
            .check_uaprofs(true)
            .allow(allow("Nokia"))
            .deny(allow("Opera")),
    );
    builder.device("generic", None, None).unwrap();
    builder.device("nokia_generic", None, Some("generic")).unwrap();
    builder
        .device("d2", Some("Nokia6230/2.0 (04.44) Profile/MIDP-2.0"), Some("nokia_generic"))
        .unwrap();
    builder
        .device("nokia_6230i", Some("Nokia6230i/2.0 (03.25) Profile/MIDP-2.0"), Some("nokia_generic"))
        .unwrap();
    builder
        .capability("generic", "brand_name", &[""])
        .unwrap()
        .capability("nokia_generic", "brand_name", &["Nokia"])
        .unwrap()
        .capability("d2", "uaProfile", &["\"http://example.com/prof.xml\""])
        .unwrap()
        .capability("d2", "model_name", &["6230"])
        .unwrap();
    builder.build(ProviderConfig::default())
}

/// generic ─ phone ─ { phone_a "Phone/1.0 A", phone_b "Phone/1.0 B" }
fn sibling_provider(resolution: Resolution) -> Provider {
    let mut builder = DatasetBuilder::new();
    builder.handler(HandlerDef::new("phones", 50, Algorithm::EditDistance).allow(allow("^Phone/")));
    builder.device("generic", None, None).unwrap();
    builder.device("phone", None, Some("generic")).unwrap();
    builder.device("phone_a", Some("Phone/1.0 A"), Some("phone")).unwrap();
    builder.device("phone_b", Some("Phone/1.0 B"), Some("phone")).unwrap();
    builder.build(ProviderConfig::default().with_resolution(resolution))
}

#[test]
fn test_exact_user_agent() {
    let provider = mozilla_provider(ProviderConfig::default());

    let detection = provider.detect("Mozilla/5.0 X", &RequestHeaders::new());
    assert_eq!(detection.method, MatchMethod::Exact);
    assert_eq!(detection.difference, Some(0));

    let device = provider.device_info("Mozilla/5.0 X").unwrap();
    assert_eq!(device.id(), "d1");
}

#[test]
fn test_exact_match_beats_higher_confidence_handler() {
    let mut builder = DatasetBuilder::new();
    builder
        .handler(HandlerDef::new("low", 10, Algorithm::EditDistance).allow(allow("^Foo")))
        .handler(HandlerDef::new("high", 90, Algorithm::EditDistance).allow(allow("^Foo")));
    let exact = builder.device("exact", Some("Foo/1.0 exact"), None).unwrap();
    let near = builder.device("near", Some("Foo/1.0 exacu"), None).unwrap();
    builder.assign(exact, "low").unwrap().assign(near, "high").unwrap();
    let provider = builder.build(ProviderConfig::default());

    let detection = provider.detect("Foo/1.0 exact", &RequestHeaders::new());
    assert_eq!(detection.method, MatchMethod::Exact);
    assert_eq!(detection.difference, Some(0));
    assert_eq!(detection.device, Some(exact));
    assert_eq!(detection.handler, Some(0));
}

#[test]
fn test_unknown_agent_gets_default_device() {
    let provider = mozilla_provider(ProviderConfig::default());

    let detection = provider.detect("totally-unknown-string", &RequestHeaders::new());
    assert_eq!(detection.method, MatchMethod::Default);
    assert_eq!(provider.device_info("totally-unknown-string").unwrap().id(), "generic");
}

#[test]
fn test_no_default_means_no_device() {
    let provider = mozilla_provider(ProviderConfig::default().with_default_devices(["missing"]));

    let detection = provider.detect("totally-unknown-string", &RequestHeaders::new());
    assert_eq!(detection.method, MatchMethod::None);
    assert!(detection.device.is_none());
    assert!(provider.device_info("totally-unknown-string").is_none());
}

#[test]
fn test_default_devices_tried_in_order() {
    let provider = mozilla_provider(ProviderConfig::default().with_default_devices(["missing", "d1", "generic"]));
    assert_eq!(provider.device_info("totally-unknown-string").unwrap().id(), "d1");
}

#[test]
fn test_uaprof_header_beats_fuzzy() {
    let provider = nokia_provider();
    let headers = RequestHeaders::from_pairs([("X-Wap-Profile", "\"http://example.com/prof.xml\"")]).unwrap();

    let detection = provider.detect("SomethingElse/1.0", &headers);
    assert_eq!(detection.method, MatchMethod::UaProf);
    assert_eq!(provider.device(detection.device.unwrap()).unwrap().id(), "d2");

    // a handled agent still prefers the profile over its closest user agent
    let detection = provider.detect("Nokia6230i/2.0 (03.26) Profile/MIDP-2.0", &headers);
    assert_eq!(detection.method, MatchMethod::UaProf);
    assert_eq!(provider.device(detection.device.unwrap()).unwrap().id(), "d2");
}

#[test]
fn test_unregistered_profile_host_is_ignored() {
    let provider = nokia_provider();
    let headers = RequestHeaders::from_pairs([("x-wap-profile", "http://elsewhere.org/prof.xml")]).unwrap();

    let detection = provider.detect("SomethingElse/1.0", &headers);
    assert_eq!(detection.method, MatchMethod::Default);
}

#[test]
fn test_fuzzy_match_picks_closest() {
    let provider = nokia_provider();

    let detection = provider.detect("Nokia6230i/2.0 (03.60) Profile/MIDP-2.0", &RequestHeaders::new());
    assert_eq!(detection.method, MatchMethod::Fuzzy);
    assert_eq!(detection.difference, Some(2));
    assert_eq!(detection.handler, Some(0));
    assert_eq!(provider.device(detection.device.unwrap()).unwrap().id(), "nokia_6230i");
}

#[test]
fn test_deny_pattern_excludes_handler() {
    let provider = nokia_provider();
    let detection = provider.detect("Opera/9.80 Nokia6230i/2.0 (03.60)", &RequestHeaders::new());
    assert_eq!(detection.method, MatchMethod::Default);
}

#[test]
fn test_capabilities_inherit_through_fallback() {
    let provider = nokia_provider();
    let device = provider.device_info("Nokia6230/2.0 (04.44) Profile/MIDP-2.0").unwrap();

    assert_eq!(device.capability("model_name"), Some("6230"));
    assert_eq!(device.capability("brand_name"), Some("Nokia"));
    assert_eq!(device.capability("unknown"), None);

    let all = provider.graph().resolved_capabilities(device.index());
    assert_eq!(all.get("brand_name"), Some(&vec!["Nokia"]));
    assert_eq!(all.get("model_name"), Some(&vec!["6230"]));
}

#[test]
fn test_lookup_is_idempotent() {
    let provider = nokia_provider();
    let headers = RequestHeaders::new();
    let first = provider.detect("Nokia6230/2.0 (05.00) Profile/MIDP-2.0", &headers);
    let second = provider.detect("Nokia6230/2.0 (05.00) Profile/MIDP-2.0", &headers);
    assert_eq!(first, second);
}

#[test]
fn test_higher_confidence_wins_equal_difference() {
    let mut builder = DatasetBuilder::new();
    builder
        .handler(HandlerDef::new("low", 10, Algorithm::EditDistance).allow(allow("^Foo")))
        .handler(HandlerDef::new("high", 90, Algorithm::EditDistance).allow(allow("^Foo")));
    let a = builder.device("a", Some("Foo/1.0 aaaa"), None).unwrap();
    let b = builder.device("b", Some("Foo/1.0 bbbb"), None).unwrap();
    builder.assign(a, "low").unwrap().assign(b, "high").unwrap();
    let provider = builder.build(ProviderConfig::default());

    let names: Vec<_> = provider.handlers_by_confidence().map(|h| h.name()).collect();
    assert_eq!(names, vec!["high", "low"]);

    let detection = provider.detect("Foo/1.0 cccc", &RequestHeaders::new());
    assert_eq!(detection.device, Some(b));
    assert_eq!(detection.handler, Some(1));
    assert_eq!(detection.difference, Some(4));
}

#[test]
fn test_equal_confidence_keeps_declaration_order() {
    let mut builder = DatasetBuilder::new();
    builder
        .handler(HandlerDef::new("first", 10, Algorithm::EditDistance).allow(allow("^Foo")))
        .handler(HandlerDef::new("second", 10, Algorithm::EditDistance).allow(allow("^Foo")));
    let provider = builder.build(ProviderConfig::default());

    let names: Vec<_> = provider.handlers_by_confidence().map(|h| h.name()).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn test_shared_parent_resolution() {
    let provider = sibling_provider(Resolution::SharedParent);
    let headers = RequestHeaders::new();

    let results = provider.matches("Phone/1.0 C", &headers);
    assert_eq!(results.len(), 2);
    let parent = provider.shared_parent(&results).unwrap();
    assert_eq!(provider.device(parent).unwrap().id(), "phone");

    let detection = provider.detect("Phone/1.0 C", &headers);
    assert_eq!(detection.method, MatchMethod::Fuzzy);
    assert_eq!(provider.device(detection.device.unwrap()).unwrap().id(), "phone");
}

#[test]
fn test_closest_match_resolution_on_tie() {
    let provider = sibling_provider(Resolution::ClosestMatch);

    let results = provider.matches("Phone/1.0 C", &RequestHeaders::new());
    let winner = provider.closest_match(&results, "Phone/1.0 C").unwrap();
    assert_eq!(provider.device(winner).unwrap().id(), "phone_a");
}

#[test]
fn test_handler_default_before_configured_default() {
    let mut builder = DatasetBuilder::new();
    builder.handler(HandlerDef::new("empty", 10, Algorithm::EditDistance).allow(allow("^Empty")));
    builder.device("generic", None, None).unwrap();
    builder.device("empty_fallback", None, Some("generic")).unwrap();
    let provider = builder.build(ProviderConfig::default().with_handler_default("empty", "empty_fallback"));

    assert_eq!(provider.device_info("Empty/1.0").unwrap().id(), "empty_fallback");
    assert_eq!(provider.device_info("Other/1.0").unwrap().id(), "generic");
}

#[test]
fn test_long_agents_are_truncated_before_fuzzy_matching() {
    let provider = mozilla_provider(ProviderConfig::default().with_max_user_agent_length(Some(13)));
    let long = format!("Mozilla/5.0 X{}", "y".repeat(2000));

    let detection = provider.detect(&long, &RequestHeaders::new());
    assert_eq!(detection.method, MatchMethod::Fuzzy);
    assert_eq!(detection.difference, Some(0));
    assert_eq!(provider.device(detection.device.unwrap()).unwrap().id(), "d1");
}

#[test]
fn test_provider_is_shared_across_threads() {
    let provider = std::sync::Arc::new(nokia_provider());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let provider = provider.clone();
            std::thread::spawn(move || {
                provider
                    .device_info("Nokia6230i/2.0 (03.60) Profile/MIDP-2.0")
                    .map(|d| d.id().to_string())
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().as_deref(), Some("nokia_6230i"));
    }
}

#[test]
fn test_stored_agents_are_truncated_like_the_query() {
    let long = format!("Mozilla/5.0 {}", "a".repeat(600));
    let short = format!("Mozilla/5.0 {}", "a".repeat(500));
    let mut builder = DatasetBuilder::new();
    builder.handler(HandlerDef::new("mozilla", 100, Algorithm::EditDistance).allow(allow("^Mozilla")));
    builder.device("short", Some(short.as_str()), None).unwrap();
    builder.device("long", Some(long.as_str()), None).unwrap();
    let provider = builder.build(ProviderConfig::default());

    let query = format!("{}b", &long[..long.len() - 1]);
    let detection = provider.detect(&query, &RequestHeaders::new());
    assert_eq!(detection.method, MatchMethod::Fuzzy);
    assert_eq!(detection.difference, Some(0));
    assert_eq!(provider.device(detection.device.unwrap()).unwrap().id(), "long");
}
