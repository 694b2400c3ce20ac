//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::config::FieldState;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Human label for a field state.
pub fn state_label(state: FieldState) -> String {
    match state {
        FieldState::Encrypted => style("ENCRYPTED").green().to_string(),
        FieldState::Plaintext => style("PLAIN TEXT").yellow().to_string(),
        FieldState::NotString => style("NOT A STRING").yellow().to_string(),
        FieldState::Missing => style("NOT FOUND").dim().to_string(),
    }
}

/// Print a table of configured fields and their encryption state.
pub fn print_field_table(states: &[(String, FieldState)]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Status"]);

    for (field, state) in states {
        table.add_row(vec![field.clone(), state_label(*state)]);
    }

    println!("{table}");
}
