mod config;
mod http_client;

use anyhow::Context;
use clap::Parser;
use soapcall_core::{
    Interface, Operation, Request, SubmissionController, SubmissionStatus, SubmitMode,
    TransportRegistry, WsdlOperation,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use config::{init_logging, Args, RequestFile};
use http_client::UreqTransport;

#[instrument(name = "main", level = "info")]
fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging. If it fails, we can't log, so just print and exit.
    if let Err(e) = init_logging(args.verbose, &args.log_file) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run_app(&args) {
        error!("Application failed to run: {:?}", e);
        return Err(e);
    }

    Ok(())
}

/// Builds the request described by the request file.
fn load_request(args: &Args) -> anyhow::Result<Arc<Request>> {
    let text = std::fs::read_to_string(&args.request_file)
        .with_context(|| format!("failed to read {}", args.request_file.display()))?;
    let file: RequestFile = serde_json::from_str(&text).context("invalid request file")?;

    let interface = Interface::new(
        file.interface.name,
        file.interface.soap_version,
        file.interface.endpoints,
    );

    let operation = WsdlOperation::builder()
        .name(file.operation.name.clone())
        .interface(interface)
        .action(file.operation.action.clone().unwrap_or_default())
        .request_attachments(file.operation.request_attachments.iter().map(Into::into).collect())
        .response_attachments(file.operation.response_attachments.iter().map(Into::into).collect())
        .build();
    let operation: Arc<dyn Operation> = Arc::new(operation);

    let request = Request::new(operation, file.request);
    if let Some(endpoint) = &args.endpoint {
        request.set_endpoint(endpoint.clone());
    }

    Ok(request)
}

fn run_app(args: &Args) -> anyhow::Result<()> {
    info!("Starting SOAP request runner (Synchronous)");

    let request = load_request(args)?;
    info!(
        request = %request.name(),
        endpoint = ?request.endpoint(),
        attachment_parts = request.defined_attachment_parts().len(),
        "request loaded"
    );

    let transport = Arc::new(UreqTransport::new().context("failed to initialize TLS")?);
    let registry = TransportRegistry::new()
        .with("http", transport.clone())
        .with("https", transport);
    let controller = SubmissionController::new(registry);

    let mode = if args.asynchronous {
        SubmitMode::Async
    } else {
        SubmitMode::Sync
    };

    let submission = request
        .submit(&controller, &args.submit_context(), mode)
        .context("failed to submit request")?
        .context("nothing was sent: the request has no endpoint")?;

    let status = submission.wait();
    request.release();

    match status {
        SubmissionStatus::Finished => {
            let response = submission
                .response()
                .context("finished submission without response")?;
            info!(
                status_code = response.status_code,
                time_taken_ms = response.time_taken.as_millis(),
                "exchange finished"
            );
            if !response.is_success() {
                warn!(status_code = response.status_code, "service answered with an error status");
            }
            for part in request.response_parts() {
                info!(part = part.name(), "response part");
            }
            println!("HTTP {}", response.status_code);
            println!("{}", response.content);
            Ok(())
        }
        SubmissionStatus::Error => {
            let error = submission
                .error()
                .map_or_else(|| "unknown error".to_owned(), |e| e.to_string());
            anyhow::bail!("exchange failed: {error}")
        }
        SubmissionStatus::Canceled | SubmissionStatus::Running => {
            warn!(?status, "submission did not complete");
            Ok(())
        }
    }
}
