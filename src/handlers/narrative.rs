use serde::Serialize;

use crate::{
    args::{DataArgs, FilterArgs, OutputFormat},
    config::AppConfig,
    errors::AppError,
    narrative::{clean_ai_output, question_messages, summary_messages, ChatClient, StreamOutcome},
    session::SharedSession,
    types::ai::ChatMessage,
};

use super::{cancel_on_ctrl_c, live::LiveView, prepare_session, print_json, warn_user};

pub const NO_SERVICES_WARNING: &str = "No services selected for summarization.";
pub const EMPTY_QUESTION_WARNING: &str = "Please enter a question to ask.";

#[derive(Debug, Serialize)]
struct NarrativeOutput<'a> {
    services: Vec<String>,
    text: String,
    cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    question: Option<&'a str>,
}

pub async fn handle_summarize(
    config: &AppConfig,
    format: OutputFormat,
    data: &DataArgs,
    filters: &FilterArgs,
) -> Result<(), AppError> {
    let session = prepare_session(config, data, filters)?;
    let (services, messages) = {
        let guard = session.read();
        let services: Vec<String> = guard
            .selected_services()
            .into_iter()
            .map(str::to_string)
            .collect();
        if services.is_empty() {
            return warn_user(format, NO_SERVICES_WARNING);
        }
        let messages =
            guard.with_prompt_data(|data| summary_messages(&config.prompts.summary_system, data));
        (services, messages)
    };

    tracing::info!(services = services.len(), "开始生成摘要");
    let outcome = stream_answer(config, &session, messages, format).await?;
    report(format, services, None, &outcome)
}

pub async fn handle_ask(
    config: &AppConfig,
    format: OutputFormat,
    question: &str,
    data: &DataArgs,
    filters: &FilterArgs,
) -> Result<(), AppError> {
    let question = question.trim();
    if question.is_empty() {
        return warn_user(format, EMPTY_QUESTION_WARNING);
    }

    let session = prepare_session(config, data, filters)?;
    let (services, messages) = {
        let guard = session.read();
        let services = guard
            .selected_services()
            .into_iter()
            .map(str::to_string)
            .collect();
        let messages = guard.with_prompt_data(|data| {
            question_messages(&config.prompts.question_system, question, data)
        });
        (services, messages)
    };

    tracing::info!(question, "开始回答问题");
    let outcome = stream_answer(config, &session, messages, format).await?;
    report(format, services, Some(question), &outcome)
}

/// Stream one completion, redrawing on every snapshot until done or Ctrl-C.
async fn stream_answer(
    config: &AppConfig,
    session: &SharedSession,
    messages: Vec<ChatMessage>,
    format: OutputFormat,
) -> Result<StreamOutcome, AppError> {
    let client = ChatClient::new(&config.ai)?;
    let cancel = session.write().begin_stream();
    let watcher = cancel_on_ctrl_c(session.clone());

    let mut view = LiveView::new(format == OutputFormat::Text);
    let result = client
        .complete(messages, &cancel, |snapshot| view.render(snapshot))
        .await;
    watcher.abort();

    let outcome = result?;
    if format == OutputFormat::Text {
        view.finish(&outcome);
    }
    Ok(outcome)
}

fn report(
    format: OutputFormat,
    services: Vec<String>,
    question: Option<&str>,
    outcome: &StreamOutcome,
) -> Result<(), AppError> {
    if outcome.is_cancelled() {
        tracing::info!("流式请求已取消");
    }
    match format {
        OutputFormat::Text => Ok(()),
        OutputFormat::Json => print_json(&NarrativeOutput {
            services,
            text: clean_ai_output(outcome.text()),
            cancelled: outcome.is_cancelled(),
            question,
        }),
    }
}
