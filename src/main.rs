use anyhow::Context;

use incident_flow::{
    args::{Args, Command},
    config::AppConfig,
    handlers::{
        config::handle_config,
        dashboard::{handle_filters, handle_flow, handle_graph, FlowOptions},
        insights::handle_insights,
        narrative::{handle_ask, handle_summarize},
    },
    logging::{init_logging, LoggingConfig},
};

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let config = match &args.config {
        Some(path) => AppConfig::load_from(path.clone()),
        None => AppConfig::load(),
    };
    config.context("加载配置失败")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Err(e) = init_logging(LoggingConfig::from_verbosity(args.verbose)) {
        eprintln!("日志初始化失败: {e}");
    }

    let format = args.format;
    match &args.command {
        Command::Config { action } => {
            handle_config(args.config.as_ref(), format, action)?;
        }
        Command::Flow {
            data,
            filters,
            threshold,
            policy,
            show_links,
        } => {
            let config = load_config(&args)?;
            let options = FlowOptions {
                threshold: *threshold,
                policy: *policy,
                show_links: *show_links,
            };
            handle_flow(&config, format, data, filters, options)?;
        }
        Command::Graph { data, threshold } => {
            let config = load_config(&args)?;
            handle_graph(&config, format, data, *threshold)?;
        }
        Command::Filters {
            data,
            filters,
            search,
        } => {
            let config = load_config(&args)?;
            handle_filters(&config, format, data, filters, search.as_deref())?;
        }
        Command::Summarize { data, filters } => {
            let config = load_config(&args)?;
            handle_summarize(&config, format, data, filters)
                .await
                .context("生成摘要失败")?;
        }
        Command::Ask {
            question,
            data,
            filters,
        } => {
            let config = load_config(&args)?;
            handle_ask(&config, format, question, data, filters)
                .await
                .context("回答问题失败")?;
        }
        Command::Insights { data, service } => {
            let config = load_config(&args)?;
            handle_insights(&config, format, data, service.as_deref())
                .await
                .context("生成服务洞察失败")?;
        }
    }

    Ok(())
}
