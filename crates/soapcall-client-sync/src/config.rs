use clap::Parser;
use serde::Deserialize;
use soapcall_core::{
    operation::AttachmentDefinition, RequestConfig, SoapVersion, SubmitContext,
};
use std::{path::PathBuf, sync::OnceLock};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, prelude::*, registry::Registry, EnvFilter};

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Sets up a panic hook to ensure logs are flushed before the program exits.
fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        tracing::error!("A panic occurred: {}", panic_info);
    }));
}

/// SOAP request runner (Synchronous)
#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// JSON file describing the interface, the operation and the request
    #[arg(help = "Path to the request file")]
    pub request_file: PathBuf,

    #[arg(short, long, help = "Override the request endpoint")]
    pub endpoint: Option<String>,

    /// Property values for `${name}` references, repeatable
    #[arg(short = 'p', long = "property", value_parser = parse_property, help = "Property as key=value")]
    pub properties: Vec<(String, String)>,

    #[arg(long = "async", help = "Submit asynchronously and wait on the handle")]
    pub asynchronous: bool,

    #[arg(long, default_value = "soapcall_client.log", help = "Log file")]
    pub log_file: PathBuf,

    /// Verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase logging verbosity")]
    pub verbose: u8,
}

impl Args {
    pub fn submit_context(&self) -> SubmitContext {
        let mut context = SubmitContext::new();
        for (name, value) in &self.properties {
            context.set_property(name, value);
        }
        context
    }
}

fn parse_property(value: &str) -> Result<(String, String), String> {
    let (name, value) = value
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got [{value}]"))?;
    if name.trim().is_empty() {
        return Err("property name cannot be empty".to_owned());
    }
    Ok((name.trim().to_owned(), value.to_owned()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFile {
    pub interface: InterfaceFile,
    pub operation: OperationFile,
    #[serde(default)]
    pub request: RequestConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceFile {
    pub name: String,
    #[serde(default)]
    pub soap_version: SoapVersion,
    #[serde(default)]
    pub endpoints: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationFile {
    pub name: String,
    pub action: Option<String>,
    #[serde(default)]
    pub request_attachments: Vec<AttachmentFile>,
    #[serde(default)]
    pub response_attachments: Vec<AttachmentFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentFile {
    pub name: String,
    #[serde(default)]
    pub content_types: Vec<String>,
}

impl From<&AttachmentFile> for AttachmentDefinition {
    fn from(file: &AttachmentFile) -> Self {
        AttachmentDefinition::new(file.name.clone(), file.content_types.iter().cloned())
    }
}

/// Initialize logging with file output and proper structured logging
pub fn init_logging(verbose_level: u8, log_file: &std::path::Path) -> anyhow::Result<()> {
    setup_panic_hook();

    // Bridge logs from the `log` crate to `tracing`
    LogTracer::init().ok();

    let file = std::fs::File::create(log_file)?;
    let (nb_writer, guard) = tracing_appender::non_blocking(file);

    // The guard has to live until the end of the program.
    if LOG_GUARD.set(guard).is_err() {
        tracing::warn!("LOG_GUARD was already set. This may indicate a problem in initialization.");
    }

    let filter_str = match verbose_level {
        0 => "info,ureq=error",
        1 => "debug,ureq=warn",
        2 => "trace,ureq=info",
        _ => "trace",
    };

    let env_filter = EnvFilter::new(filter_str);

    let subscriber = Registry::default().with(env_filter).with(
        fmt::layer()
            .with_writer(nb_writer)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false)
            .compact(),
    );

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!("Logging system initialized.");

    Ok(())
}
