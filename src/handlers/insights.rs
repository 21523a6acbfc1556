use std::time::Duration;

use colored::Colorize;

use crate::{
    args::{DataArgs, OutputFormat},
    config::AppConfig,
    errors::{AIError, AppError},
    insights::{collect_insights, service_names, InsightQuestion, ServiceInsights, NOT_AVAILABLE},
    narrative::ChatClient,
    types::IncidentRecord,
};

use super::{cancel_on_ctrl_c, load_session, print_json, warn_user};

pub async fn handle_insights(
    config: &AppConfig,
    format: OutputFormat,
    data: &DataArgs,
    service: Option<&str>,
) -> Result<(), AppError> {
    let session = load_session(config, data)?;

    let Some(service) = service.map(str::trim).filter(|s| !s.is_empty()) else {
        let names = service_names(&session.dataset().incidents);
        return match format {
            OutputFormat::Text => {
                println!("Available services:");
                for name in names {
                    println!("  {name}");
                }
                Ok(())
            }
            OutputFormat::Json => print_json(&names),
        };
    };

    let rows: Vec<IncidentRecord> = session
        .dataset()
        .incidents
        .iter()
        .filter(|r| r.service == service)
        .cloned()
        .collect();
    if rows.is_empty() {
        return warn_user(format, &format!("No incidents found for service '{service}'."));
    }
    let rows: Vec<&IncidentRecord> = rows.iter().collect();

    let client = ChatClient::new(&config.ai)?;
    let session = crate::session::shared(session);
    let cancel = session.write().begin_stream();
    let watcher = cancel_on_ctrl_c(session.clone());

    let delay = Duration::from_millis(config.dashboard.insight_delay_ms);
    let result = collect_insights(
        &client,
        &config.prompts.insight_system,
        service,
        &rows,
        delay,
        &cancel,
        |question| {
            if format == OutputFormat::Text {
                eprintln!("{}", progress_label(question).dimmed());
            }
        },
    )
    .await;
    watcher.abort();

    let insights = match result {
        Ok(insights) => insights,
        Err(AIError::Cancelled) => {
            eprintln!("(cancelled)");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Text => {
            print!("{}", render_insights_text(&insights));
            Ok(())
        }
        OutputFormat::Json => print_json(&insights),
    }
}

fn progress_label(question: InsightQuestion) -> &'static str {
    match question {
        InsightQuestion::Upstream => "Identifying upstream services...",
        InsightQuestion::Downstream => "Identifying downstream services...",
        InsightQuestion::MainProblem => "Identifying the main problem...",
        InsightQuestion::RecurringPatterns => "Looking for recurring patterns...",
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

pub fn render_insights_text(insights: &ServiceInsights) -> String {
    let mut out = format!(
        "# {} ({} incidents)\n\n",
        insights.service.bold(),
        insights.incidents
    );
    out.push_str(&format!("Upstream: {}\n", list_or_none(&insights.upstream)));
    out.push_str(&format!("Downstream: {}\n", list_or_none(&insights.downstream)));
    out.push_str(&format!("Main problem: {}\n", insights.main_problem));
    out.push_str("Recurring patterns:\n");
    match &insights.recurring_patterns {
        Some(patterns) => {
            out.push_str(&format!("  Time: {}\n", patterns.time));
            out.push_str(&format!("  Country: {}\n", patterns.country));
            out.push_str(&format!("  Feeds: {}\n", patterns.feeds));
        }
        None => out.push_str(&format!("  {NOT_AVAILABLE}\n")),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::{RecurringPatterns, NO_PROBLEM};

    #[test]
    fn test_render_insights_text() {
        colored::control::set_override(false);
        let insights = ServiceInsights {
            service: "CTR".to_string(),
            incidents: 3,
            upstream: vec!["Feed A".to_string()],
            downstream: Vec::new(),
            main_problem: NO_PROBLEM.to_string(),
            recurring_patterns: Some(RecurringPatterns {
                time: "Mornings".to_string(),
                country: "UK".to_string(),
                feeds: NOT_AVAILABLE.to_string(),
            }),
        };
        let text = render_insights_text(&insights);
        assert!(text.starts_with("# CTR (3 incidents)"));
        assert!(text.contains("Upstream: Feed A\n"));
        assert!(text.contains("Downstream: None\n"));
        assert!(text.contains("  Time: Mornings\n"));
    }

    #[test]
    fn test_missing_patterns_render_not_available() {
        colored::control::set_override(false);
        let insights = ServiceInsights {
            service: "X".to_string(),
            incidents: 1,
            upstream: Vec::new(),
            downstream: Vec::new(),
            main_problem: NO_PROBLEM.to_string(),
            recurring_patterns: None,
        };
        assert!(render_insights_text(&insights).ends_with("  Not available\n"));
    }
}
