//! Command handlers. Each loads the tables, applies the filter flags to a
//! fresh session and prints a report.

pub mod config;
pub mod dashboard;
pub mod insights;
pub mod live;
pub mod narrative;

use colored::Colorize;
use serde::Serialize;

use crate::{
    args::{DataArgs, FilterArgs, OutputFormat},
    config::AppConfig,
    errors::{filter_error, AppError},
    loader::{self, Dataset},
    session::{SharedSession, Session},
    types::Dimension,
};

/// Load `--incidents` and, when given, `--relations` into a new session.
pub fn load_session(config: &AppConfig, data: &DataArgs) -> Result<Session, AppError> {
    let incidents = loader::load_incidents(&data.incidents)?;
    let relations = match &data.relations {
        Some(path) => loader::load_relations(path)?,
        None => Vec::new(),
    };
    tracing::info!(
        incidents = incidents.len(),
        relations = relations.len(),
        "数据加载完成"
    );
    Ok(Session::new(
        config.dashboard.clone(),
        Dataset::new(incidents, relations),
    ))
}

fn ensure_filterable(session: &Session, dimension: Dimension) -> Result<(), AppError> {
    if session.filters().dimensions().any(|d| d == dimension) {
        Ok(())
    } else {
        Err(filter_error(format!(
            "'{dimension}' is not one of the configured filter dimensions"
        )))
    }
}

/// Apply the filter flags in a fixed order: reset, all, none, top10, select, toggle.
pub fn apply_filters(session: &mut Session, filters: &FilterArgs) -> Result<(), AppError> {
    if filters.reset {
        session.reset_filters();
    }
    for &dimension in &filters.all {
        ensure_filterable(session, dimension)?;
        session.select_all(dimension, true);
    }
    for &dimension in &filters.none {
        ensure_filterable(session, dimension)?;
        session.select_all(dimension, false);
    }
    for &dimension in &filters.top10 {
        ensure_filterable(session, dimension)?;
        session.select_top_k(dimension, true);
    }
    for select in &filters.select {
        ensure_filterable(session, select.dimension)?;
        let values: Vec<&str> = select.values.iter().map(String::as_str).collect();
        let unknown = session.select_only(select.dimension, &values);
        if !unknown.is_empty() {
            return Err(filter_error(format!(
                "unknown {} value(s): {}",
                select.dimension,
                unknown.join(", ")
            )));
        }
    }
    for toggle in &filters.toggle {
        ensure_filterable(session, toggle.dimension)?;
        for value in &toggle.values {
            if !session.toggle(toggle.dimension, value) {
                return Err(filter_error(format!(
                    "unknown {} value: {value}",
                    toggle.dimension
                )));
            }
        }
    }
    Ok(())
}

/// Load data and apply filter flags, returning a shared handle.
pub fn prepare_session(
    config: &AppConfig,
    data: &DataArgs,
    filters: &FilterArgs,
) -> Result<SharedSession, AppError> {
    let mut session = load_session(config, data)?;
    apply_filters(&mut session, filters)?;
    Ok(crate::session::shared(session))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Generic(format!("failed to serialize output: {e}")))?;
    println!("{json}");
    Ok(())
}

/// User-facing warning: not an error, the command simply has nothing to do.
pub fn warn_user(format: OutputFormat, message: &str) -> Result<(), AppError> {
    tracing::warn!("{message}");
    match format {
        OutputFormat::Text => {
            eprintln!("{}", message.yellow());
            Ok(())
        }
        OutputFormat::Json => print_json(&serde_json::json!({ "warning": message })),
    }
}

/// Cancel the session's in-flight stream on Ctrl-C.
pub fn cancel_on_ctrl_c(session: SharedSession) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("收到 Ctrl-C，取消流式请求");
            session.write().cancel_stream();
        }
    })
}
