//! Prompt construction for the summary and question requests.
//!
//! The user turn is a plain-text digest of the filtered incidents: top
//! offenders per dimension, a per-service breakdown and the neighbourhood
//! of every selected service in the relation graph.

use std::fmt::Write;

use crate::engine::{compute_stats, compute_stats_by, top_by_count, KeyStats};
use crate::relations::{neighbours, related_services};
use crate::types::ai::ChatMessage;
use crate::types::{Dimension, IncidentRecord, RelationEdge};

pub const DEFAULT_SUMMARY_SYSTEM_PROMPT: &str = "As an expert analyst in financial application's incident management, provide a structured and concise summary for the selected services, focusing on:

1. **Overall Summary:**
   - Identify overall problematic services, along with teams, regions, and shifts (only top 2 or 3).
   - Highlight services, teams, regions, and shifts which are significantly beyond the threshold duration (only top 2 or 3).

2. **Analysis:**
   - Narrate a story flow linking services, teams, regions, and shifts in 4 key points under the subheading 'Analysis'.

3. **Recommendations:**
   - Highlight connections with other services that might have impacted the problematic services.
   - Provide specific recommendations based on the current data provided.

Include both incident data and network data in your analysis.

Present the information concisely using bullet points under each section. Ensure that the summary is directly based on the data provided and is actionable.";

pub const DEFAULT_QUESTION_SYSTEM_PROMPT: &str = "As an expert analyst in financial application's incident management,
answer the user's question based on the data provided.
Provide examples from both the incident data and network data to support your answer.
Present the information concisely and ensure that the answer is directly based on the data provided and is actionable.";

const TOP_OVERALL: usize = 5;
const TOP_PER_SERVICE: usize = 2;
const TOP_ISSUES: usize = 5;

/// Integer with thousands separators, e.g. `1,235`.
pub fn num0(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Two fixed decimals with thousands separators, e.g. `1,234.50`.
pub fn num2(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let int_value: f64 = int_part.parse().unwrap_or(0.0);
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{}.{frac}", num0(int_value))
}

/// Everything the prompt builders read, borrowed from the session.
#[derive(Debug, Clone, Copy)]
pub struct PromptData<'a> {
    pub rows: &'a [&'a IncidentRecord],
    pub relations: &'a [RelationEdge],
    pub selected_services: &'a [&'a str],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceBreakdown {
    pub service: String,
    pub shifts: Vec<KeyStats>,
    pub times_of_day: Vec<KeyStats>,
    pub regions: Vec<KeyStats>,
    pub teams: Vec<KeyStats>,
    /// Most frequent cleaned descriptions, by summed Count.
    pub frequent_issues: Vec<KeyStats>,
    /// Opposite endpoint of every relation touching the service.
    pub related_services: Vec<String>,
}

impl ServiceBreakdown {
    pub fn build(
        service: &str,
        rows: &[&IncidentRecord],
        relations: &[RelationEdge],
    ) -> Option<Self> {
        let service_rows: Vec<&IncidentRecord> = rows
            .iter()
            .copied()
            .filter(|r| r.service == service)
            .collect();
        if service_rows.is_empty() {
            return None;
        }
        let stats = |dimension| compute_stats(service_rows.iter().copied(), dimension);

        Some(Self {
            service: service.to_string(),
            shifts: stats(Dimension::Shift),
            times_of_day: stats(Dimension::TimeOfDay),
            regions: stats(Dimension::Region),
            teams: stats(Dimension::Team),
            frequent_issues: top_by_count(
                compute_stats_by(service_rows.iter().copied(), |r| r.description.as_str()),
                TOP_ISSUES,
            ),
            related_services: related_services(relations, service)
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
    }
}

fn stat_line(stat: &KeyStats) -> String {
    format!(
        "{}: {} incidents (Avg {} hrs)",
        stat.key,
        num0(stat.count),
        num2(stat.avg_hours)
    )
}

/// `- Title:` followed by the top five keys by Count. Empty input yields "".
pub fn format_top_stats(title: &str, stats: Vec<KeyStats>) -> String {
    let top = top_by_count(stats, TOP_OVERALL);
    if top.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = top.iter().map(|s| format!("  {}", stat_line(s))).collect();
    format!("- {title}:\n{}\n\n", lines.join("\n"))
}

pub fn format_service_stats(breakdown: &ServiceBreakdown) -> String {
    let mut out = String::new();
    let top = |stats: &[KeyStats]| top_by_count(stats.to_vec(), TOP_PER_SERVICE);
    let block = |out: &mut String, indent: &str, stats: &[KeyStats]| {
        let lines: Vec<String> = stats
            .iter()
            .map(|s| format!("{indent}{}", stat_line(s)))
            .collect();
        let _ = writeln!(out, "{}", lines.join("\n"));
    };

    let shifts = top(&breakdown.shifts);
    let times = top(&breakdown.times_of_day);
    if !shifts.is_empty() || !times.is_empty() {
        out.push_str("- Problematic times:\n");
        if !shifts.is_empty() {
            out.push_str("  Shifts:\n");
            block(&mut out, "    ", &shifts);
        }
        if !times.is_empty() {
            out.push_str("  Time of Day:\n");
            block(&mut out, "    ", &times);
        }
    }

    let regions = top(&breakdown.regions);
    if !regions.is_empty() {
        out.push_str("- Problematic regions:\n");
        block(&mut out, "  ", &regions);
    }

    let teams = top(&breakdown.teams);
    if !teams.is_empty() {
        out.push_str("- Problematic teams:\n");
        block(&mut out, "  ", &teams);
    }

    if !breakdown.frequent_issues.is_empty() {
        out.push_str("- Frequent issues:\n");
        let lines: Vec<String> = breakdown
            .frequent_issues
            .iter()
            .map(|d| format!("  {}: {} occurrences", d.key, num0(d.count)))
            .collect();
        let _ = writeln!(out, "{}", lines.join("\n"));
    }

    let related = if breakdown.related_services.is_empty() {
        "None".to_string()
    } else {
        breakdown.related_services.join(", ")
    };
    let _ = writeln!(out, "- Impacting connections:\n  {related}");
    out
}

/// One `- S connections: …` line per selected service.
pub fn network_summary(relations: &[RelationEdge], selected_services: &[&str]) -> String {
    let mut out = String::new();
    for service in selected_services {
        let connections = neighbours(relations, service);
        let listed = if connections.is_empty() {
            "None".to_string()
        } else {
            connections.join(", ")
        };
        let _ = writeln!(out, "- {service} connections: {listed}");
    }
    out
}

fn service_blocks(data: &PromptData<'_>) -> String {
    let mut out = String::new();
    for service in data.selected_services {
        if let Some(breakdown) = ServiceBreakdown::build(service, data.rows, data.relations) {
            let _ = write!(out, "\nService: {service}\n{}", format_service_stats(&breakdown));
        }
    }
    out
}

/// User turn for the "summarize" request.
pub fn summary_message(data: &PromptData<'_>) -> String {
    let rows = data.rows.iter().copied();
    let mut message = format!(
        "Selected Services:\n{}\n\nOverall Summary:\n",
        data.selected_services.join(", ")
    );
    message.push_str(&format_top_stats(
        "Problematic services",
        compute_stats(rows.clone(), Dimension::Service),
    ));
    message.push_str(&format_top_stats(
        "Problematic teams",
        compute_stats(rows.clone(), Dimension::Team),
    ));
    message.push_str(&format_top_stats(
        "Problematic regions",
        compute_stats(rows.clone(), Dimension::Region),
    ));
    message.push_str(&format_top_stats(
        "Problematic shifts",
        compute_stats(rows, Dimension::Shift),
    ));
    let _ = write!(
        message,
        "\nNetwork Data Summary:\n{}\n",
        network_summary(data.relations, data.selected_services)
    );
    message.push_str(&service_blocks(data));
    message
}

/// User turn for a free-text question.
pub fn question_message(question: &str, data: &PromptData<'_>) -> String {
    let mut message = format!("User Question:\n{question}\n\nData Summary:\n");
    for stat in compute_stats(data.rows.iter().copied(), Dimension::Service) {
        let _ = writeln!(
            message,
            "- Service {}: {} incidents, Avg Duration: {} hours",
            stat.key,
            num0(stat.count),
            num2(stat.avg_hours)
        );
    }
    message.push_str(&service_blocks(data));
    let _ = write!(
        message,
        "\nNetwork Data Summary:\n{}\n",
        network_summary(data.relations, data.selected_services)
    );
    message
}

pub fn summary_messages(system_prompt: &str, data: &PromptData<'_>) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(summary_message(data)),
    ]
}

pub fn question_messages(
    system_prompt: &str,
    question: &str,
    data: &PromptData<'_>,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(question_message(question, data)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(service: &str, team: &str, shift: &str, count: f64, hours: f64) -> IncidentRecord {
        IncidentRecord {
            service: service.to_string(),
            team: team.to_string(),
            shift: shift.to_string(),
            region: "UK".to_string(),
            time_of_day: "Morning".to_string(),
            description: "Feed late".to_string(),
            count,
            hours,
            ..Default::default()
        }
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(num0(1234.6), "1,235");
        assert_eq!(num0(12.0), "12");
        assert_eq!(num0(1_000_000.0), "1,000,000");
        assert_eq!(num0(f64::NAN), "0");
        assert_eq!(num2(4.0), "4.00");
        assert_eq!(num2(1234.5), "1,234.50");
        assert_eq!(num2(-2.456), "-2.46");
    }

    #[test]
    fn test_format_top_stats_lines() {
        let stats = vec![
            KeyStats {
                key: "A".into(),
                count: 2.0,
                avg_hours: 1.5,
            },
            KeyStats {
                key: "B".into(),
                count: 7.0,
                avg_hours: 3.0,
            },
        ];
        let text = format_top_stats("Problematic services", stats);
        assert_eq!(
            text,
            "- Problematic services:\n  B: 7 incidents (Avg 3.00 hrs)\n  A: 2 incidents (Avg 1.50 hrs)\n\n"
        );
        assert_eq!(format_top_stats("Empty", Vec::new()), "");
    }

    #[test]
    fn test_service_breakdown_block() {
        let data = [
            row("X", "T1", "Day", 3.0, 2.0),
            row("X", "T2", "Night", 1.0, 6.0),
            row("Y", "T1", "Day", 1.0, 1.0),
        ];
        let rows: Vec<&IncidentRecord> = data.iter().collect();
        let relations = vec![RelationEdge::new("X", "Z"), RelationEdge::new("W", "X")];
        let breakdown = ServiceBreakdown::build("X", &rows, &relations).unwrap();
        assert_eq!(breakdown.related_services, vec!["Z", "W"]);
        assert_eq!(breakdown.frequent_issues[0].count, 4.0);

        let text = format_service_stats(&breakdown);
        assert!(text.starts_with(
            "- Problematic times:\n  Shifts:\n    Day: 3 incidents (Avg 2.00 hrs)\n"
        ));
        assert!(text.contains("- Frequent issues:\n  Feed late: 4 occurrences\n"));
        assert!(text.ends_with("- Impacting connections:\n  Z, W\n"));

        assert!(ServiceBreakdown::build("missing", &rows, &relations).is_none());
    }

    #[test]
    fn test_network_summary_none() {
        let relations = vec![RelationEdge::new("A", "B")];
        let text = network_summary(&relations, &["A", "C"]);
        assert_eq!(text, "- A connections: B\n- C connections: None\n");
    }

    #[test]
    fn test_summary_message_layout() {
        let data = [row("X", "T1", "Day", 2.0, 4.0)];
        let rows: Vec<&IncidentRecord> = data.iter().collect();
        let selected = ["X"];
        let prompt = PromptData {
            rows: &rows,
            relations: &[],
            selected_services: &selected,
        };
        let message = summary_message(&prompt);
        assert!(message.starts_with(
            "Selected Services:\nX\n\nOverall Summary:\n- Problematic services:\n  X: 2 incidents (Avg 4.00 hrs)\n"
        ));
        assert!(message.contains("\nNetwork Data Summary:\n- X connections: None\n"));
        assert!(message.contains("\nService: X\n- Problematic times:"));

        let messages = summary_messages("sys", &prompt);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, message);
    }

    #[test]
    fn test_question_message_layout() {
        let data = [row("X", "T1", "Day", 2.0, 4.0), row("Y", "T1", "Day", 1.0, 1.0)];
        let rows: Vec<&IncidentRecord> = data.iter().collect();
        let selected = ["X"];
        let prompt = PromptData {
            rows: &rows,
            relations: &[],
            selected_services: &selected,
        };
        let message = question_message("Why X?", &prompt);
        assert!(message.starts_with(
            "User Question:\nWhy X?\n\nData Summary:\n- Service X: 2 incidents, Avg Duration: 4.00 hours\n- Service Y: 1 incidents, Avg Duration: 1.00 hours\n"
        ));
        let service_at = message.find("\nService: X\n").unwrap();
        let network_at = message.find("\nNetwork Data Summary:\n").unwrap();
        assert!(service_at < network_at);
    }
}
