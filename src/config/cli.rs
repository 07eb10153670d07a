use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the sagoma binary.
#[derive(Debug, Parser)]
#[command(name = "sagoma", version, about = "Compiled template cache and render service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SAGOMA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve compile, render, and flush requests over HTTP.
    Serve(Box<ServeArgs>),
    /// Render one template to stdout and exit.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct TemplateOverrides {
    /// Override the directory templates are read from.
    #[arg(long = "templates-root", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub templates_root: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub templates: TemplateOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the number of compile workers.
    #[arg(long = "compiler-workers", value_name = "COUNT")]
    pub compiler_workers: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: TemplateOverrides,

    /// Template id, relative to the template root.
    #[arg(value_name = "TEMPLATE_ID")]
    pub template_id: String,

    /// Render data as an inline JSON object.
    #[arg(long, value_name = "JSON", conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Read render data from a JSON file.
    #[arg(long = "data-file", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub data_file: Option<PathBuf>,
}
