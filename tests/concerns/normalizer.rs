use serde_json::{Value, json};

use continuum_amp::{
    amp::ReportingErrorKind,
    concern::{
        BestPracticeCatalog, BestPracticeEnrichment, Normalizer, NormalizerOptions, Standard,
        normalizer::raw_findings_from_value,
    },
};

fn catalog() -> BestPracticeCatalog {
    let mut catalog = BestPracticeCatalog::empty();
    catalog.insert(
        336,
        BestPracticeEnrichment {
            description: "Provide alternative text for images".to_string(),
            severity: 9,
            noticeability: 8,
            tractability: 3,
            details_url: "https://amp.test/bp/336".to_string(),
            standards: vec![Standard::new(610, "WCAG 2.0 Level A")],
        },
    );
    catalog
}

fn findings() -> Value {
    json!([
        {
            "path": "html > body > img",
            "engineTestId": "350",
            "attributeDetail": "Image lacks alt text",
            "bestPracticeId": "336",
            "element": "<img src=\"a.png\">",
            "testResult": 1,
            "fixType": {"domSpec": false, "helperText": "Add an alt attribute"}
        },
        {
            "path": "html > body > a",
            "engineTestId": 20,
            "attributeDetail": "Empty link",
            "bestPracticeId": 72,
            "element": "<a href=\"/\"></a>",
            "testResult": 1,
            "fixType": {"domSpec": null}
        },
        {
            "path": "html > body > p",
            "bestPracticeId": 336,
            "element": "<p>",
            "testResult": 3
        }
    ])
}

fn assert_enrichment_is_atomic(value: &Value) {
    let fields = [
        "bestPracticeDescription",
        "severity",
        "noticeability",
        "tractability",
        "bestPracticeDetailsUrl",
        "bestPracticeStandards",
    ];
    let present = fields.iter().filter(|field| !value[*field].is_null()).count();
    assert!(
        present == 0 || present == fields.len(),
        "enrichment must be all or nothing: {value}"
    );
}

#[test]
fn needs_review_findings_are_dropped_by_default() {
    let catalog = catalog();
    let normalizer = Normalizer::new(&catalog, NormalizerOptions::default());

    let concerns = normalizer
        .normalize_json(&findings().to_string())
        .expect("findings should parse");

    assert_eq!(concerns.len(), 2);
    assert!(concerns.iter().all(|concern| !concern.needs_review()));
}

#[test]
fn needs_review_findings_can_be_included() {
    let catalog = catalog();
    let normalizer = Normalizer::new(
        &catalog,
        NormalizerOptions {
            include_potential_concerns: true,
        },
    );

    let concerns = normalizer
        .normalize_json(&findings().to_string())
        .expect("findings should parse");

    assert_eq!(concerns.len(), 3);
    assert!(concerns[2].needs_review());
}

#[test]
fn known_best_practices_are_enriched_and_ids_parsed_leniently() {
    let catalog = catalog();
    let normalizer = Normalizer::new(&catalog, NormalizerOptions::default());
    let raw = raw_findings_from_value(findings()).expect("findings should deserialize");

    let concerns = normalizer.normalize(raw);
    let image = &concerns[0];

    assert_eq!(image.best_practice_id(), Some(336));
    assert_eq!(image.engine_test_id(), Some(350));
    assert_eq!(image.path(), "html > body > img");
    assert_eq!(image.attribute(), "Image lacks alt text");
    assert_eq!(
        image.best_practice_description(),
        Some("Provide alternative text for images")
    );
    assert_eq!(image.severity(), Some(9));
    assert_eq!(image.noticeability(), Some(8));
    assert_eq!(image.tractability(), Some(3));
    assert_eq!(image.best_practice_details_url(), Some("https://amp.test/bp/336"));
    assert_eq!(
        image.best_practice_standards().map(<[Standard]>::len),
        Some(1)
    );
    let fix_type = image.fix_type().expect("fix type should be present");
    assert_eq!(fix_type.dom_spec, Some(false));
    assert_eq!(fix_type.helper_text.as_deref(), Some("Add an alt attribute"));

    let link = &concerns[1];
    assert!(link.enrichment().is_none());
    assert_eq!(link.severity(), None);
    assert!(link.fix_type().is_none(), "null domSpec without helper text has no fix type");
}

#[test]
fn enrichment_is_all_or_nothing() {
    let catalog = catalog();
    let normalizer = Normalizer::new(
        &catalog,
        NormalizerOptions {
            include_potential_concerns: true,
        },
    );

    let concerns = normalizer
        .normalize_json(&findings().to_string())
        .expect("findings should parse");

    for concern in &concerns {
        let value = serde_json::to_value(concern).expect("concern should serialize");
        assert_enrichment_is_atomic(&value);
    }
}

#[test]
fn null_and_blank_input_yield_no_concerns() {
    let catalog = BestPracticeCatalog::empty();
    let normalizer = Normalizer::new(&catalog, NormalizerOptions::default());

    assert!(normalizer.normalize_json("").expect("blank is fine").is_empty());
    assert!(normalizer.normalize_json("null").expect("null is fine").is_empty());
    assert!(normalizer.normalize_json("[]").expect("empty is fine").is_empty());
    assert!(raw_findings_from_value(Value::Null).expect("null is fine").is_empty());
}

#[test]
fn malformed_input_is_an_illegal_argument() {
    let catalog = BestPracticeCatalog::empty();
    let normalizer = Normalizer::new(&catalog, NormalizerOptions::default());

    let err = normalizer
        .normalize_json("{\"not\": \"an array\"}")
        .expect_err("objects are not findings");
    assert_eq!(err.kind, ReportingErrorKind::IllegalArgument);
}

#[test]
fn missing_text_fields_default_to_empty() {
    let catalog = BestPracticeCatalog::empty();
    let normalizer = Normalizer::new(&catalog, NormalizerOptions::default());

    let concerns = normalizer
        .normalize_json(r#"[{"testResult": 1}]"#)
        .expect("sparse finding should parse");

    assert_eq!(concerns[0].path(), "");
    assert_eq!(concerns[0].element(), "");
    assert_eq!(concerns[0].best_practice_id(), None);
    assert_eq!(concerns[0].engine_test_id(), None);
}
