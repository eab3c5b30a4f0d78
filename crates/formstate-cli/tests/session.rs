//! Integration tests for scripted session replay.

use formstate_cli::definition::FormDefinition;
use formstate_cli::script::{Script, StepReport, replay};
use formstate_cli::summary::{collect_fields, fields_table, render_errors};

const SIGNUP: &str = r#"{
    "config": { "debounce_ms": 300 },
    "initial": { "user": { "email": "", "password": "", "confirm": "" } },
    "fields": [
        { "name": "user.email", "label": "Correo", "kind": "email",
          "rules": [{ "rule": "required" }, { "rule": "email" }] },
        { "name": "user.password", "label": "Contraseña", "kind": "password",
          "rules": [{ "rule": "required" }, { "rule": "min_length", "min": 8 }] },
        { "name": "user.confirm",
          "rules": [{ "rule": "matches_field", "field": "user.password" }] }
    ]
}"#;

fn reports(steps: &[StepReport]) -> Vec<(&str, &str)> {
    steps
        .iter()
        .map(|report| (report.step.as_str(), report.detail.as_str()))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_signup_session_ends_with_server_error() {
    let definition = FormDefinition::from_json_str(SIGNUP).unwrap();
    let engine = definition.build_engine().unwrap();
    let script = Script::from_json_str(
        r#"[
            { "step": "change", "field": "user.email", "value": " ana@example.com " },
            { "step": "change", "field": "user.password", "value": "secreto123" },
            { "step": "change", "field": "user.confirm", "value": "secreto12" },
            { "step": "wait", "ms": 350 },
            { "step": "change", "field": "user.confirm", "value": "secreto123" },
            { "step": "blur", "field": "user.confirm" },
            { "step": "submit", "reject": {
                "response": { "data": { "errors": { "user.email": ["Ya registrado"] } } }
            } }
        ]"#,
    )
    .unwrap();

    let steps = replay(&engine, &definition, &script).await.unwrap();
    assert_eq!(
        reports(&steps),
        [
            ("change user.email", ""),
            ("change user.password", ""),
            ("change user.confirm", ""),
            ("wait 350ms", "1 error"),
            ("change user.confirm", ""),
            ("blur user.confirm", ""),
            ("submit (rejected)", "rejected by server, 1 error"),
        ]
    );

    insta::assert_json_snapshot!(engine.status(), @r#"
    {
      "values": {
        "user": {
          "confirm": "secreto123",
          "email": "ana@example.com",
          "password": "secreto123"
        }
      },
      "errors": {
        "user.email": "Ya registrado"
      },
      "touched": [
        "user",
        "user.confirm",
        "user.email",
        "user.password"
      ],
      "isSubmitting": false,
      "submitCount": 1,
      "isValidating": false,
      "isValid": false,
      "isDirty": true,
      "changedValues": {
        "user.confirm": "secreto123",
        "user.email": "ana@example.com",
        "user.password": "secreto123"
      },
      "fieldCount": 1
    }
    "#);
}

#[tokio::test(start_paused = true)]
async fn test_empty_submit_is_blocked_on_first_field() {
    let definition = FormDefinition::from_json_str(SIGNUP).unwrap();
    let engine = definition.build_engine().unwrap();
    let script = Script::from_json_str(r#"[{ "step": "submit" }]"#).unwrap();

    let steps = replay(&engine, &definition, &script).await.unwrap();
    assert_eq!(reports(&steps), [("submit", "blocked, focus user.email")]);
    assert_eq!(engine.submit_count(), 1);
    insta::assert_snapshot!(render_errors(&engine.errors()).trim_end(), @r"
    - user.email: Este campo es requerido
    - user.password: Este campo es requerido
    ");
}

#[tokio::test(start_paused = true)]
async fn test_pending_debounce_settles_before_replay_returns() {
    let definition = FormDefinition::from_json_str(SIGNUP).unwrap();
    let engine = definition.build_engine().unwrap();
    let script = Script::from_json_str(
        r#"[{ "step": "change", "field": "user.email", "value": "ana@" }]"#,
    )
    .unwrap();

    replay(&engine, &definition, &script).await.unwrap();
    assert!(!engine.is_validating());
    assert_eq!(
        engine.error("user.email").as_deref(),
        Some("Ingrese un correo electrónico válido")
    );
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_rejection_is_reported_as_failure() {
    let definition = FormDefinition::from_json_str(r#"{ "initial": { "name": "Ana" } }"#).unwrap();
    let engine = definition.build_engine().unwrap();
    let script = Script::from_json_str(
        r#"[{ "step": "submit", "reject": { "message": "Internal Server Error" } }]"#,
    )
    .unwrap();

    let steps = replay(&engine, &definition, &script).await.unwrap();
    assert_eq!(
        reports(&steps),
        [("submit (rejected)", "failed: submission rejected without field errors")]
    );
    assert!(!engine.is_submitting());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_field_name_stops_the_replay() {
    let definition = FormDefinition::from_json_str(SIGNUP).unwrap();
    let engine = definition.build_engine().unwrap();
    let script = Script::from_json_str(
        r#"[
            { "step": "blur", "field": "user.email" },
            { "step": "change", "field": "user..email", "value": "x" }
        ]"#,
    )
    .unwrap();

    let error = replay(&engine, &definition, &script).await.unwrap_err();
    assert_eq!(error.to_string(), "step 2 (change user..email)");
    assert!(engine.is_touched("user.email"));
}

#[tokio::test(start_paused = true)]
async fn test_reset_with_new_values_clears_dirty_state() {
    let definition = FormDefinition::from_json_str(SIGNUP).unwrap();
    let engine = definition.build_engine().unwrap();
    let script = Script::from_json_str(
        r#"[
            { "step": "set", "field": "user.email", "value": "ana@example.com" },
            { "step": "validate" },
            { "step": "reset", "values": { "user": { "email": "ana@example.com" } } }
        ]"#,
    )
    .unwrap();

    let steps = replay(&engine, &definition, &script).await.unwrap();
    assert_eq!(steps[1].detail, "1 error");
    assert!(!engine.has_changes());
    assert!(engine.errors().is_empty());
    assert_eq!(engine.initial_values(), engine.values());
}

#[tokio::test(start_paused = true)]
async fn test_fields_table_lists_undefined_error_fields() {
    let definition = FormDefinition::from_json_str(SIGNUP).unwrap();
    let engine = definition.build_engine().unwrap();
    let script = Script::from_json_str(
        r#"[
            { "step": "set", "field": "user.email", "value": "ana@example.com" },
            { "step": "set", "field": "user.password", "value": "secreto123" },
            { "step": "set", "field": "user.confirm", "value": "secreto123" },
            { "step": "submit", "reject": { "errors": { "captcha": "Intente de nuevo" } } }
        ]"#,
    )
    .unwrap();

    replay(&engine, &definition, &script).await.unwrap();
    let fields = collect_fields(&engine, &definition);
    let names: Vec<&str> = fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(names, ["user.email", "user.password", "user.confirm", "captcha"]);
    assert_eq!(fields[0].label, "Correo");
    assert_eq!(fields[2].label, "user.confirm");

    let mut table = fields_table(&fields);
    table.force_no_tty();
    let rendered = table.to_string();
    assert!(rendered.contains("ana@example.com"));
    assert!(rendered.contains("Intente de nuevo"));
}
