use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

use crate::color::ColorPolicy;
use crate::types::Dimension;

/// incident-flow - 事件流向聚合与 AI 摘要
#[derive(Parser, Debug)]
#[command(name = "incident-flow")]
#[command(
    version,
    about = "Incident flow aggregation, severity coloring, service graph and streamed AI summaries"
)]
pub struct Args {
    /// 子命令
    #[command(subcommand)]
    pub command: Command,

    /// 配置文件路径（默认 ~/.config/incident-flow/config.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 日志详细程度（可重复：-v, -vv, -vvv）
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// 输出格式
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// 输入数据文件
#[derive(clap::Args, Debug, Clone)]
pub struct DataArgs {
    /// 事件 CSV 文件
    #[arg(long)]
    pub incidents: PathBuf,
    /// 服务关系 CSV 文件（Source, Target）
    #[arg(long)]
    pub relations: Option<PathBuf>,
}

/// `DIM=V1,V2` 形式的筛选参数
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionValues {
    pub dimension: Dimension,
    pub values: Vec<String>,
}

/// 筛选参数，按 reset → all → none → top10 → select → toggle 的顺序应用
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// 仅选中这些值，例如 `--select Service=CTR,Payments`
    #[arg(long, value_name = "DIM=V1,V2", value_parser = parse_dimension_values)]
    pub select: Vec<DimensionValues>,
    /// 切换单个值，例如 `--toggle Region=UK`
    #[arg(long, value_name = "DIM=V", value_parser = parse_dimension_value)]
    pub toggle: Vec<DimensionValues>,
    /// 选中某维度的全部值
    #[arg(long, value_name = "DIM")]
    pub all: Vec<Dimension>,
    /// 清空某维度的选择
    #[arg(long, value_name = "DIM")]
    pub none: Vec<Dimension>,
    /// 选中预设的 Top 10 名单
    #[arg(long, value_name = "DIM")]
    pub top10: Vec<Dimension>,
    /// 恢复默认选择
    #[arg(long)]
    pub reset: bool,
}

#[derive(Parser, Debug)]
pub enum Command {
    /// 按流向维度聚合筛选后的事件
    Flow {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        filters: FilterArgs,
        /// 严重度阈值（小时，0-10）
        #[arg(long)]
        threshold: Option<f64>,
        /// 着色策略 (fixed|percentile)
        #[arg(long)]
        policy: Option<ColorPolicy>,
        /// 显示并着色连线
        #[arg(long)]
        show_links: bool,
    },
    /// 服务关系图（基于完整数据集）
    Graph {
        #[command(flatten)]
        data: DataArgs,
        /// 严重度阈值（小时，0-10）
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// 显示当前筛选状态
    Filters {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        filters: FilterArgs,
        /// 只列出包含该文本的选项（不区分大小写）
        #[arg(long)]
        search: Option<String>,
    },
    /// 流式生成所选服务的 AI 摘要
    Summarize {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// 针对筛选后的数据提问
    Ask {
        /// 问题
        question: String,
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// 单个服务的上下游、主要问题与重复模式
    Insights {
        #[command(flatten)]
        data: DataArgs,
        /// 服务名称；省略时列出可选服务
        #[arg(long)]
        service: Option<String>,
    },
    /// 配置管理
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// 配置管理操作
#[derive(Parser, Debug)]
pub enum ConfigAction {
    /// 写入配置模板
    Init {
        /// 覆盖已存在的配置文件
        #[arg(long)]
        force: bool,
    },
    /// 显示当前生效的配置
    Show,
}

impl Args {
    /// 解析命令行参数
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }
}

fn split_assignment(raw: &str) -> Result<(Dimension, &str), String> {
    let (dimension, values) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected DIM=VALUES, got '{raw}'"))?;
    Ok((dimension.parse()?, values))
}

/// `Service=A,B` → Service, ["A", "B"]. An empty right side selects nothing.
pub fn parse_dimension_values(raw: &str) -> Result<DimensionValues, String> {
    let (dimension, values) = split_assignment(raw)?;
    let values = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    Ok(DimensionValues { dimension, values })
}

/// `Region=UK` → Region, ["UK"]. Commas are part of the value.
pub fn parse_dimension_value(raw: &str) -> Result<DimensionValues, String> {
    let (dimension, value) = split_assignment(raw)?;
    Ok(DimensionValues {
        dimension,
        values: vec![value.trim().to_string()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimension_values() {
        let parsed = parse_dimension_values("Team Acro=AT, BT").unwrap();
        assert_eq!(parsed.dimension, Dimension::TeamAcro);
        assert_eq!(parsed.values, vec!["AT", "BT"]);

        let empty = parse_dimension_values("service=").unwrap();
        assert!(empty.values.is_empty());

        assert!(parse_dimension_values("Service").is_err());
        assert!(parse_dimension_values("Planet=Mars").is_err());
    }

    #[test]
    fn test_parse_single_value_keeps_commas() {
        let parsed = parse_dimension_value("Service=A, B").unwrap();
        assert_eq!(parsed.values, vec!["A, B"]);
    }

    #[test]
    fn test_flow_command_parsing() {
        let args = Args::try_parse_from([
            "incident-flow",
            "-vv",
            "--format",
            "json",
            "flow",
            "--incidents",
            "i.csv",
            "--select",
            "Service=CTR",
            "--none",
            "Team",
            "--policy",
            "percentile",
            "--threshold",
            "4.5",
            "--show-links",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.format, OutputFormat::Json);
        match args.command {
            Command::Flow {
                data,
                filters,
                threshold,
                policy,
                show_links,
            } => {
                assert_eq!(data.incidents, PathBuf::from("i.csv"));
                assert!(data.relations.is_none());
                assert_eq!(filters.select[0].dimension, Dimension::Service);
                assert_eq!(filters.none, vec![Dimension::Team]);
                assert_eq!(threshold, Some(4.5));
                assert_eq!(policy, Some(ColorPolicy::Percentile));
                assert!(show_links);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_ask_and_config_parsing() {
        let args = Args::try_parse_from([
            "incident-flow",
            "ask",
            "why so slow?",
            "--incidents",
            "i.csv",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Ask { ref question, .. } if question == "why so slow?"
        ));

        let args = Args::try_parse_from(["incident-flow", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }
}
