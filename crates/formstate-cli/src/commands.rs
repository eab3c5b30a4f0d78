use anyhow::{Context, Result};
use comfy_table::Table;
use tokio::runtime::Builder;
use tracing::{info, info_span};

use formstate_cli::definition::FormDefinition;
use formstate_cli::script::{Script, replay};
use formstate_cli::summary::{apply_table_style, collect_fields, print_session, render_errors};

use crate::cli::{CheckArgs, RunArgs};

/// Replay a session. Returns whether the form ended up valid.
pub fn run_session(args: &RunArgs) -> Result<bool> {
    let definition = FormDefinition::load(&args.definition)?;
    let script = Script::load(&args.script)?;
    let span = info_span!("session", definition = %args.definition.display());
    let _guard = span.enter();

    let runtime = Builder::new_current_thread()
        .enable_time()
        .build()
        .context("start async runtime")?;
    let engine = definition.build_engine()?;
    let steps = runtime.block_on(replay(&engine, &definition, &script))?;
    let status = engine.status();
    info!(
        steps = steps.len(),
        valid = status.is_valid,
        submits = status.submit_count,
        "session finished"
    );

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&status).context("serialize form status")?
        );
    } else {
        let fields = collect_fields(&engine, &definition);
        print_session(&steps, &fields, &status);
    }
    engine.teardown();
    Ok(status.is_valid)
}

/// Validate a definition. Returns whether the initial values pass every rule.
pub fn run_check(args: &CheckArgs) -> Result<bool> {
    let definition = FormDefinition::load(&args.definition)?;
    let runtime = Builder::new_current_thread()
        .enable_time()
        .build()
        .context("start async runtime")?;
    let engine = definition.build_engine()?;
    let report = runtime.block_on(engine.validate_form());

    let mut table = Table::new();
    table.set_header(vec!["Field", "Kind", "Rules", "Initial"]);
    apply_table_style(&mut table);
    for field in &definition.fields {
        let verdict = report.errors.get(&field.name).map_or("ok", String::as_str);
        table.add_row(vec![
            field.name.clone(),
            serde_json::to_string(&field.kind)?.trim_matches('"').to_owned(),
            field.rules.len().to_string(),
            verdict.to_owned(),
        ]);
    }
    println!("{table}");
    println!(
        "{} field(s), {} rule(s), initial values {}",
        definition.fields.len(),
        definition.rule_count(),
        if report.is_valid { "valid" } else { "invalid" }
    );
    if !report.is_valid {
        eprint!("{}", render_errors(&report.errors));
    }
    Ok(report.is_valid)
}
