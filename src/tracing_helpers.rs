//! Span constructors used when the `tracing` feature is enabled.

use tracing::{info_span, Span};

/// Longest statement prefix recorded on a span
const STATEMENT_PREVIEW_LEN: usize = 120;

fn preview(sql: &str) -> &str {
    let trimmed = sql.trim();
    match trimmed.char_indices().nth(STATEMENT_PREVIEW_LEN) {
        Some((idx, _)) => &trimmed[..idx],
        None => trimmed,
    }
}

pub fn execute_statement_span(sql: &str) -> Span {
    info_span!("lifeguard.execute", db.statement = preview(sql))
}

pub fn acquire_connection_span() -> Span {
    info_span!("lifeguard.connect")
}

pub fn forward_migration_span(script: &str) -> Span {
    info_span!("lifeguard.migrate", migration.script = script)
}

pub fn undo_step_span(step: u32, count: u32) -> Span {
    info_span!("lifeguard.undo", undo.step = step, undo.count = count)
}
