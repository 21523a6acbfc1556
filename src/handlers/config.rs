use std::path::PathBuf;

use crate::{
    args::{ConfigAction, OutputFormat},
    config::{AppConfig, ConfigLoader},
    errors::AppError,
};

use super::print_json;

fn loader_for(path: Option<&PathBuf>) -> ConfigLoader {
    match path {
        Some(path) => ConfigLoader::with_config_file(path.clone()),
        None => ConfigLoader::new(),
    }
}

pub fn handle_config(
    config_path: Option<&PathBuf>,
    format: OutputFormat,
    action: &ConfigAction,
) -> Result<(), AppError> {
    let loader = loader_for(config_path);
    match action {
        ConfigAction::Init { force } => {
            let (path, written) = loader.initialize_config(*force)?;
            if written {
                println!("配置模板已写入: {}", path.display());
            } else {
                println!("配置文件已存在: {} (使用 --force 覆盖)", path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config: AppConfig = loader.load_config()?;
            match format {
                OutputFormat::Text => {
                    println!("# {}", loader.config_path().display());
                    print!("{}", config.to_toml()?);
                    Ok(())
                }
                OutputFormat::Json => print_json(&config.masked()),
            }
        }
    }
}
