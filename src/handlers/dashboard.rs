use crate::{
    args::{DataArgs, FilterArgs, OutputFormat},
    color::ColorPolicy,
    config::AppConfig,
    engine::FlowOutcome,
    errors::AppError,
    logging::OperationTimer,
    report::{
        filter_views, flow_report, graph_report, render_filters_text, render_flow_text,
        render_graph_text, NO_DATA_NOTICE,
    },
};

use super::{load_session, prepare_session, print_json, warn_user};

pub struct FlowOptions {
    pub threshold: Option<f64>,
    pub policy: Option<ColorPolicy>,
    pub show_links: bool,
}

pub fn handle_flow(
    config: &AppConfig,
    format: OutputFormat,
    data: &DataArgs,
    filters: &FilterArgs,
    options: FlowOptions,
) -> Result<(), AppError> {
    let session = prepare_session(config, data, filters)?;
    {
        let mut writer = session.write();
        if let Some(threshold) = options.threshold {
            writer.set_threshold(threshold);
        }
        if let Some(policy) = options.policy {
            writer.set_color_policy(policy);
        }
        if options.show_links {
            writer.set_show_links(true);
        }
    }

    let session = session.read();
    let timer = OperationTimer::new("aggregate_flow").with_rows(session.filtered().len());
    let outcome = session.flow();
    timer.finish();

    let report = match &outcome {
        FlowOutcome::Graph(graph) => Some(flow_report(
            graph,
            &session.flow_scales(graph),
            &session.team_names(),
            session.threshold(),
            session.color_policy(),
            session.show_links(),
        )),
        FlowOutcome::NoData => None,
    };

    match format {
        OutputFormat::Text => {
            print!("{}", render_flow_text(&outcome, report.as_ref()));
            Ok(())
        }
        OutputFormat::Json => match &report {
            Some(report) => print_json(report),
            None => warn_user(format, NO_DATA_NOTICE),
        },
    }
}

pub fn handle_graph(
    config: &AppConfig,
    format: OutputFormat,
    data: &DataArgs,
    threshold: Option<f64>,
) -> Result<(), AppError> {
    if data.relations.is_none() {
        tracing::warn!("未提供 --relations，服务关系图将为空");
    }
    let mut session = load_session(config, data)?;
    if let Some(threshold) = threshold {
        session.set_threshold(threshold);
    }

    let timer = OperationTimer::new("service_graph").with_rows(session.dataset().incidents.len());
    let graph = session.service_graph();
    timer.finish();

    let report = graph
        .as_ref()
        .map(|graph| graph_report(graph, session.threshold()));
    match format {
        OutputFormat::Text => {
            print!("{}", render_graph_text(report.as_ref()));
            Ok(())
        }
        OutputFormat::Json => match &report {
            Some(report) => print_json(report),
            None => warn_user(format, NO_DATA_NOTICE),
        },
    }
}

pub fn handle_filters(
    config: &AppConfig,
    format: OutputFormat,
    data: &DataArgs,
    filters: &FilterArgs,
    search: Option<&str>,
) -> Result<(), AppError> {
    let session = prepare_session(config, data, filters)?;
    let session = session.read();
    let views = filter_views(session.filters(), search);
    match format {
        OutputFormat::Text => {
            print!("{}", render_filters_text(&views));
            Ok(())
        }
        OutputFormat::Json => print_json(&views),
    }
}
