use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use formstate_engine::{ErrorMap, FieldState, FormEngine, FormStatus};
use formstate_value::Value;

use crate::definition::FormDefinition;
use crate::script::StepReport;

pub fn print_session(steps: &[StepReport], fields: &[FieldState], status: &FormStatus) {
    if !steps.is_empty() {
        println!("{}", steps_table(steps));
    }
    println!("{}", fields_table(fields));
    println!("{}", status_table(status));
    if !status.errors.is_empty() {
        eprintln!("Errors:");
        eprint!("{}", render_errors(&status.errors));
    }
}

/// Field states in definition order, followed by fields that carry an error
/// without being defined (server errors, for instance).
pub fn collect_fields(engine: &FormEngine, definition: &FormDefinition) -> Vec<FieldState> {
    let mut names: Vec<String> = definition
        .fields
        .iter()
        .map(|field| field.name.clone())
        .collect();
    for name in engine.errors().keys() {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    names
        .iter()
        .filter_map(|name| engine.field_state(name).ok())
        .collect()
}

/// Plain `field: message` lines, one per error.
pub fn render_errors(errors: &ErrorMap) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("- {field}: {message}\n"))
        .collect()
}

pub fn steps_table(steps: &[StepReport]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("#"), header_cell("Step"), header_cell("Result")]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (index, report) in steps.iter().enumerate() {
        table.add_row(vec![
            dim_cell(index + 1),
            Cell::new(&report.step),
            result_cell(&report.detail),
        ]);
    }
    table
}

pub fn fields_table(fields: &[FieldState]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Label"),
        header_cell("Value"),
        header_cell("Touched"),
        header_cell("Error"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Center);
    for field in fields {
        let error = match &field.error {
            Some(message) if field.error_flag => Cell::new(message)
                .fg(Color::Red)
                .add_attribute(Attribute::Bold),
            Some(message) => Cell::new(message).fg(Color::Yellow),
            None => dim_cell("-"),
        };
        table.add_row(vec![
            Cell::new(&field.name),
            Cell::new(&field.label),
            Cell::new(display_value(&field.value)),
            flag_cell(field.touched),
            error,
        ]);
    }
    table
}

pub fn status_table(status: &FormStatus) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Status"), header_cell("Value")]);
    apply_table_style(&mut table);
    let validity = if status.is_valid {
        Cell::new("valid").fg(Color::Green)
    } else {
        Cell::new("invalid")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    };
    table.add_row(vec![Cell::new("Validity"), validity]);
    table.add_row(vec![Cell::new("Dirty"), flag_cell(status.is_dirty)]);
    table.add_row(vec![
        Cell::new("Changed"),
        Cell::new(changed_summary(status)),
    ]);
    table.add_row(vec![Cell::new("Errors"), Cell::new(status.errors.len())]);
    table.add_row(vec![Cell::new("Touched"), Cell::new(status.touched.len())]);
    table.add_row(vec![Cell::new("Submits"), Cell::new(status.submit_count)]);
    table.add_row(vec![
        Cell::new("Validating"),
        flag_cell(status.is_validating),
    ]);
    table
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn changed_summary(status: &FormStatus) -> String {
    if status.changed_values.is_empty() {
        return "-".to_owned();
    }
    status
        .changed_values
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Compact JSON for a cell. Bare strings are shown without quotes.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other
            .to_json()
            .map_or_else(|error| error.to_string(), |json| json.to_string()),
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn result_cell(detail: &str) -> Cell {
    if detail.is_empty() {
        dim_cell("-")
    } else if detail.starts_with("submitted") || detail == "valid" {
        Cell::new(detail).fg(Color::Green)
    } else {
        Cell::new(detail).fg(Color::Yellow)
    }
}

fn flag_cell(flag: bool) -> Cell {
    if flag {
        Cell::new("yes")
    } else {
        dim_cell("no")
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
