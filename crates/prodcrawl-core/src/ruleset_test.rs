use std::path::Path;

use super::*;

fn rule_for(ruleset: &Ruleset, field: Field) -> Option<&ExtractionRule> {
    ruleset.rules.iter().find(|r| r.field == field)
}

fn minimal_ruleset() -> Ruleset {
    Ruleset {
        rules: vec![ExtractionRule::new(Field::Title, vec![Source::text("h1")])],
        ..Ruleset::default()
    }
}

#[test]
fn builtin_registry_has_amazon_and_toysrus() {
    let registry = builtin_registry();
    let targets: Vec<&str> = registry.targets().collect();
    assert_eq!(targets, vec!["amazon", "toysrus"]);
}

#[test]
fn builtin_rulesets_pass_validation() {
    let registry = builtin_registry();
    for target in registry.targets() {
        let ruleset = registry.get(target).expect("registered target");
        assert!(
            validate_ruleset(target, ruleset).is_ok(),
            "built-in ruleset '{target}' failed validation"
        );
    }
}

#[test]
fn amazon_prefers_hidden_price_input_over_visible_text() {
    let registry = builtin_registry();
    let price = registry
        .get("amazon")
        .and_then(|r| rule_for(r, Field::Price))
        .expect("amazon price rule");
    assert_eq!(
        price.sources.first(),
        Some(&Source::attribute("input#priceValue", "value"))
    );
    assert!(matches!(price.sources.get(1), Some(Source::Text { .. })));
}

#[test]
fn amazon_age_keywords_cover_spanish_and_english() {
    let registry = builtin_registry();
    let rule = registry
        .get("amazon")
        .and_then(|r| rule_for(r, Field::RecommendedAge))
        .expect("amazon age rule");
    let Some(Source::Keywords { keywords }) = rule.sources.first() else {
        panic!("expected keyword source");
    };
    assert!(keywords.iter().any(|k| k == "Manufacturer recommended age"));
    assert!(keywords
        .iter()
        .any(|k| k == "Edad recomendada por el fabricante"));
}

#[test]
fn unknown_target_is_none() {
    assert!(builtin_registry().get("megamart").is_none());
}

#[test]
fn field_display_matches_record_field_names() {
    assert_eq!(Field::MfrNumber.to_string(), "mfr_number");
    assert_eq!(Field::RecommendedAge.to_string(), "recommended_age");
    assert_eq!(Field::Id.to_string(), "id");
}

#[test]
fn parse_rulesets_adds_new_target_and_keeps_builtins() {
    let yaml = r#"
rulesets:
  acme:
    rules:
      - field: title
        sources:
          - strategy: text
            selector: "h1.title"
    images:
      gallery:
        - selector: "img.product"
"#;
    let registry = parse_rulesets(yaml).expect("valid yaml");
    let acme = registry.get("acme").expect("acme target");
    assert_eq!(rule_for(acme, Field::Title).unwrap().sources, vec![Source::text("h1.title")]);
    assert_eq!(acme.images.gallery[0].attribute, "src");
    assert!(registry.get("amazon").is_some());
    assert!(registry.get("toysrus").is_some());
}

#[test]
fn parse_rulesets_replaces_builtin_wholesale() {
    let yaml = r##"
rulesets:
  amazon:
    rules:
      - field: title
        sources:
          - strategy: text
            selector: "#title"
"##;
    let registry = parse_rulesets(yaml).expect("valid yaml");
    let amazon = registry.get("amazon").unwrap();
    assert_eq!(amazon.rules.len(), 1);
    assert!(amazon.url_id_marker.is_none());
}

#[test]
fn parse_rulesets_rejects_unknown_strategy() {
    let yaml = r#"
rulesets:
  acme:
    rules:
      - field: title
        sources:
          - strategy: xpath
            selector: "//h1"
"#;
    let err = parse_rulesets(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::RulesetsFileParse(_)));
}

#[test]
fn validate_rejects_empty_ruleset() {
    let err = validate_ruleset("acme", &Ruleset::default()).unwrap_err();
    assert!(err.to_string().contains("no rules and no image sources"));
}

#[test]
fn validate_rejects_blank_target() {
    let err = validate_ruleset("  ", &minimal_ruleset()).unwrap_err();
    assert!(err.to_string().contains("non-empty"));
}

#[test]
fn validate_rejects_duplicate_field() {
    let mut ruleset = minimal_ruleset();
    ruleset
        .rules
        .push(ExtractionRule::new(Field::Title, vec![Source::text("h2")]));
    let err = validate_ruleset("acme", &ruleset).unwrap_err();
    assert!(err.to_string().contains("more than one rule"));
}

#[test]
fn validate_rejects_rule_without_sources() {
    let mut ruleset = minimal_ruleset();
    ruleset.rules.push(ExtractionRule::new(Field::Price, vec![]));
    let err = validate_ruleset("acme", &ruleset).unwrap_err();
    assert!(err.to_string().contains("has no sources"));
}

#[test]
fn validate_rejects_keywords_without_details_table() {
    let mut ruleset = minimal_ruleset();
    ruleset.rules.push(ExtractionRule::new(
        Field::Brand,
        vec![Source::keywords(&["Brand"])],
    ));
    let err = validate_ruleset("acme", &ruleset).unwrap_err();
    assert!(err.to_string().contains("no details table"));
}

#[test]
fn validate_rejects_empty_keyword_list() {
    let mut ruleset = minimal_ruleset();
    ruleset.details = Some(DetailsTable {
        rows: "tr".to_string(),
        label: Some("th".to_string()),
        value: Some("td".to_string()),
    });
    ruleset
        .rules
        .push(ExtractionRule::new(Field::Brand, vec![Source::keywords(&[])]));
    let err = validate_ruleset("acme", &ruleset).unwrap_err();
    assert!(err.to_string().contains("empty keyword list"));
}

#[test]
fn validate_rejects_blank_selector() {
    let ruleset = Ruleset {
        rules: vec![ExtractionRule::new(Field::Title, vec![Source::text(" ")])],
        ..Ruleset::default()
    };
    let err = validate_ruleset("acme", &ruleset).unwrap_err();
    assert!(err.to_string().contains("empty text selector"));
}

#[test]
fn load_rulesets_missing_file_is_io_error() {
    let err = load_rulesets(Path::new("/definitely/not/here/rulesets.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::RulesetsFileIo { .. }));
}

#[test]
fn load_rulesets_from_real_file_matches_builtins() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("rulesets.yaml");
    assert!(
        path.exists(),
        "rulesets.yaml missing at {path:?}; required for this test"
    );
    let registry = load_rulesets(&path).expect("load rulesets.yaml");
    assert_eq!(registry, builtin_registry());
}
