use serde_json::{Value, json};

use continuum_amp::amp::{
    SubmissionOutcome,
    types::{MODULE_UPLOAD_PATH, Module},
    upload::{MAX_INSTANCE_FIELD_CHARS, UploadRequest, build_records},
};

use crate::fake_amp::{FakeAmp, concerns, sample_concerns, service_on_asset};

fn finding(best_practice_id: Value, index: usize) -> Value {
    json!({
        "path": format!("html > body > div:nth-child({index})"),
        "bestPracticeId": best_practice_id,
        "element": format!("<div id=\"n{index}\"></div>"),
        "attributeDetail": "detail",
        "testResult": 1,
        "engineTestId": 400 + index
    })
}

#[test]
fn concerns_are_grouped_by_best_practice() {
    let findings: Vec<Value> = (0..10)
        .map(|index| {
            let best_practice_id = match index % 3 {
                0 => json!(336),
                1 => json!("72"),
                _ => json!(1_001),
            };
            finding(best_practice_id, index)
        })
        .collect();
    let concerns = concerns(Value::Array(findings));

    let records = build_records(&concerns);

    assert_eq!(records.len(), 3);
    assert_eq!(records["336"].instances.len(), 4);
    assert_eq!(records["72"].instances.len(), 3);
    assert_eq!(records["1001"].instances.len(), 3);
    assert_eq!(
        records
            .values()
            .map(|record| record.instances.len())
            .sum::<usize>(),
        10
    );
    assert_eq!(records["72"].violation.violation_id, Some(72));
}

#[test]
fn unknown_best_practice_groups_under_null() {
    let concerns = concerns(json!([finding(json!(null), 1), finding(json!("n/a"), 2)]));

    let records = build_records(&concerns);
    let value = serde_json::to_value(&records).expect("records should serialize");

    assert_eq!(records.len(), 1);
    assert_eq!(value["null"]["violation"], json!({"violationID": null}));
    assert_eq!(value["null"]["instances"].as_array().map(Vec::len), Some(2));
}

#[test]
fn long_markup_is_truncated_to_the_field_limit() {
    let element = format!("<p>{}</p>", "x".repeat(4_993));
    assert_eq!(element.len(), 5_000);
    let concerns = concerns(json!([{
        "path": "html > body > p",
        "bestPracticeId": 336,
        "element": element,
        "attributeDetail": "a".repeat(3_001),
        "testResult": 1
    }]));

    let records = build_records(&concerns);
    let instance = &records["336"].instances[0];

    assert_eq!(instance.element.chars().count(), MAX_INSTANCE_FIELD_CHARS);
    assert_eq!(instance.attribute.chars().count(), MAX_INSTANCE_FIELD_CHARS);
    assert_eq!(instance.xpath, "html > body > p");
}

#[test]
fn fix_data_is_only_sent_with_a_fix_type() {
    let concerns = concerns(json!([
        {
            "path": "a",
            "bestPracticeId": 1,
            "element": "<a>",
            "testResult": 1,
            "engineTestId": 9,
            "fingerprint": {"css": "abc"},
            "fixType": {"domSpec": true, "helperText": "add text", "fixType": 2, "fix": {"alt": ""}}
        },
        {
            "path": "b",
            "bestPracticeId": 1,
            "element": "<b>",
            "testResult": 1,
            "fingerprint": {"css": "def"}
        }
    ]));

    let records = build_records(&concerns);
    let instances = serde_json::to_value(&records["1"].instances).expect("instances serialize");

    assert_eq!(instances[0]["fixType"], json!(2));
    assert_eq!(instances[0]["fix"], json!({"alt": ""}));
    assert_eq!(instances[0]["fingerprint"], json!({"css": "abc"}));
    assert_eq!(instances[0]["engineTestId"], json!(9));
    assert_eq!(instances[0]["testResult"], json!(1));
    assert!(instances[1].get("fixType").is_none());
    assert!(instances[1].get("fix").is_none());
    assert!(instances[1].get("fingerprint").is_none());
}

#[test]
fn upload_request_carries_string_ids_and_module_details() {
    let module = Module::new(
        Some(7),
        Some("Home".to_string()),
        Some("https://example.com/".to_string()),
    );
    let request = UploadRequest::new(5, 7, true, &module, &sample_concerns());
    let value = serde_json::to_value(&request).expect("request should serialize");

    assert_eq!(value["reportID"], json!("5"));
    assert_eq!(value["moduleID"], json!("7"));
    assert_eq!(value["overwrite"], json!("true"));
    assert_eq!(value["moduleName"], json!("Home"));
    assert_eq!(value["moduleLocation"], json!("https://example.com/"));

    let bare = UploadRequest::new(5, 7, false, &Module::new(Some(7), None, None), &[]);
    let value = serde_json::to_value(&bare).expect("request should serialize");
    assert!(value.get("moduleName").is_none());
    assert!(value.get("moduleLocation").is_none());
    assert_eq!(value["records"], json!({}));
}

#[tokio::test]
async fn upload_without_module_ack_is_not_accepted() {
    let fake = FakeAmp::new();
    let report_id = fake.add_report("Nightly Run");
    let module_id = fake.add_module(report_id, "Home");
    fake.state().upload_response = Some(json!({"moduleId": null}));
    let mut service = service_on_asset(&fake).await;
    service
        .set_active_report_by_id(report_id)
        .await
        .expect("report should validate");
    service
        .set_active_module_by_id(module_id)
        .await
        .expect("module should validate");

    let outcome = service
        .submit(&sample_concerns())
        .await
        .expect("an unacknowledged upload is not an error");

    assert_eq!(
        outcome,
        SubmissionOutcome::NotAccepted {
            report_id,
            module_id
        }
    );
    assert!(!outcome.submitted());
    assert_eq!(fake.count(MODULE_UPLOAD_PATH), 1);
}

#[tokio::test]
async fn empty_concern_list_still_uploads() {
    let fake = FakeAmp::new();
    let report_id = fake.add_report("Nightly Run");
    let mut service = service_on_asset(&fake).await;
    service
        .set_active_report_by_id(report_id)
        .await
        .expect("report should validate");
    service
        .set_active_module_by_name("Home", "https://example.com/")
        .await
        .expect("module should be accepted");

    let outcome = service.submit(&[]).await.expect("submission should succeed");

    assert!(outcome.submitted());
    let upload = fake
        .requests()
        .into_iter()
        .find(|request| request.path == MODULE_UPLOAD_PATH)
        .and_then(|request| request.body)
        .expect("upload body should be recorded");
    assert_eq!(upload["records"], json!({}));
    assert_eq!(upload["moduleName"], json!("Home"));
}
