use soapcall_core::{
    transport::Method, PreparedRequest, Response, Submission, SubmitContext, SubmitMode,
    Transport, TransportError,
};
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, error, info, info_span, instrument};

/// HTTP(S) transport backed by a shared `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Builds the agent with the platform TLS stack for `https` endpoints.
    pub fn new() -> Result<Self, native_tls::Error> {
        let tls = native_tls::TlsConnector::new()?;
        let agent = ureq::AgentBuilder::new()
            .tls_connector(Arc::new(tls))
            .timeout_connect(Duration::from_secs(30))
            .timeout_read(Duration::from_secs(60))
            .build();
        Ok(Self { agent })
    }
}

impl Transport for UreqTransport {
    #[instrument(name = "http_client.exchange", level = "info", skip_all, fields(url = %request.http.url, mode = ?mode), err)]
    fn exchange(
        &self,
        request: PreparedRequest,
        _context: &SubmitContext,
        mode: SubmitMode,
    ) -> Result<Submission, TransportError> {
        let submission = Submission::new(request.request_name.clone());

        match mode {
            SubmitMode::Sync => {
                submission.complete(send(&self.agent, &request));
            }
            SubmitMode::Async => {
                let agent = self.agent.clone();
                let worker = submission.clone();
                thread::Builder::new()
                    .name(format!("exchange-{}", submission.id()))
                    .spawn(move || {
                        if worker.is_canceled() {
                            debug!("submission canceled before sending");
                            return;
                        }
                        worker.complete(send(&agent, &request));
                    })
                    .map_err(|e| {
                        TransportError::Other(format!("failed to start exchange thread: {e}"))
                    })?;
            }
        }

        Ok(submission)
    }
}

fn collect_headers(response: &ureq::Response) -> Vec<(String, String)> {
    response
        .headers_names()
        .iter()
        .filter_map(|name| {
            response
                .header(name)
                .map(|value| (name.clone(), value.to_string()))
        })
        .collect()
}

/// Sends one request. SOAP faults come back with a 500 status, so error
/// statuses still produce a response.
fn send(agent: &ureq::Agent, request: &PreparedRequest) -> Result<Response, TransportError> {
    let http = &request.http;
    let span = info_span!("http.request", method = http.method.as_str(), url = %http.url);
    let _enter = span.enter();

    info!("sending request");

    let mut ureq_request = match http.method {
        Method::Post => agent.post(http.url.as_str()),
        Method::Get => agent.get(http.url.as_str()),
    };

    for (name, value) in &http.headers {
        ureq_request = ureq_request.set(name, value);
    }

    debug!(
        headers_count = http.headers.len(),
        body_length = http.body.len(),
        attachments = request.attachments.len(),
        "request configured"
    );

    let started = Instant::now();
    let response = match ureq_request.send_string(&http.body) {
        Ok(response) => response,
        Err(ureq::Error::Status(status, response)) => {
            debug!(status, "received error status");
            response
        }
        Err(e) => {
            error!(error = %e, "request failed");
            return Err(TransportError::Connection(e.to_string()));
        }
    };

    let status_code = response.status();
    let headers = collect_headers(&response);
    let content_type = response.header("Content-Type").map(ToOwned::to_owned);
    let content = response.into_string().map_err(|e| {
        error!(error = %e, "failed to read response body");
        TransportError::InvalidResponse(e.to_string())
    })?;

    info!(status_code, response_body_length = content.len(), "response received");

    Ok(Response {
        status_code,
        headers,
        content,
        content_type,
        request_content: http.body.clone(),
        time_taken: started.elapsed(),
    })
}
