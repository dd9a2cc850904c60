//! Submission of a request and the handle tracking the exchange.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use tracing::{info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    SubmitError,
    config::{DEFAULT_ENCODING, RequestConfig, WssPasswordType, settings},
    diagnostics::{DiagnosticSink, TracingDiagnostics},
    expansion::{DefaultPropertyExpander, PropertyExpander, SubmitContext},
    interface::SoapVersion,
    request::Request,
    response::Response,
    transport::{
        AttachmentPolicy, HttpBuilder, PreparedRequest, TransportError, TransportRegistry,
        WssSettings,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitMode {
    /// Block the caller until the exchange completed.
    Sync,
    /// Return right away; completion is delivered through the handle.
    Async,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionStatus {
    Running,
    Finished,
    Error,
    Canceled,
}

/// Observes submissions of one request.
pub trait SubmitListener: Send + Sync {
    /// Returning `false` cancels the submission before anything is sent.
    fn before_submit(&self, _request: &Request, _context: &SubmitContext) -> bool {
        true
    }

    fn after_submit(&self, _submission: &Submission) {}
}

type CompletionHook = Box<dyn FnOnce(&Submission) + Send>;

struct Outcome {
    status: SubmissionStatus,
    response: Option<Arc<Response>>,
    error: Option<TransportError>,
}

#[derive(Default)]
struct State {
    outcome: Option<Outcome>,
    hooks: Vec<CompletionHook>,
    /// Set once the completion hooks have run.
    settled: bool,
}

struct Shared {
    id: Uuid,
    request_name: String,
    state: Mutex<State>,
    settled: Condvar,
    canceled: AtomicBool,
}

/// Handle on an in-flight or completed exchange. Clones share the same state.
///
/// The first outcome wins: a transport completing a handle that was already
/// canceled has no effect.
#[derive(Clone)]
pub struct Submission {
    shared: Arc<Shared>,
}

impl Submission {
    pub fn new(request_name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                request_name: request_name.into(),
                state: Mutex::new(State::default()),
                settled: Condvar::new(),
                canceled: AtomicBool::new(false),
            }),
        }
    }

    /// A handle for an exchange that already ran.
    pub fn completed(
        request_name: impl Into<String>,
        result: Result<Response, TransportError>,
    ) -> Self {
        let submission = Self::new(request_name);
        submission.complete(result);
        submission
    }

    pub(crate) fn vetoed(request_name: impl Into<String>) -> Self {
        let submission = Self::new(request_name);
        submission.cancel();
        submission
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn request_name(&self) -> &str {
        &self.shared.request_name
    }

    /// Records the result of the exchange. Returns `false` when the handle
    /// already had an outcome.
    pub fn complete(&self, result: Result<Response, TransportError>) -> bool {
        let outcome = match result {
            Ok(response) => Outcome {
                status: SubmissionStatus::Finished,
                response: Some(Arc::new(response)),
                error: None,
            },
            Err(error) => Outcome {
                status: SubmissionStatus::Error,
                response: None,
                error: Some(error),
            },
        };
        self.finish(outcome)
    }

    /// Never blocks on the exchange itself; transports observe the flag
    /// through [`Submission::is_canceled`].
    pub fn cancel(&self) -> bool {
        self.shared.canceled.store(true, Ordering::Release);
        self.finish(Outcome {
            status: SubmissionStatus::Canceled,
            response: None,
            error: None,
        })
    }

    pub fn is_canceled(&self) -> bool {
        self.shared.canceled.load(Ordering::Acquire)
    }

    pub fn status(&self) -> SubmissionStatus {
        self.shared
            .state
            .lock()
            .outcome
            .as_ref()
            .map_or(SubmissionStatus::Running, |outcome| outcome.status)
    }

    pub fn response(&self) -> Option<Arc<Response>> {
        self.shared
            .state
            .lock()
            .outcome
            .as_ref()
            .and_then(|outcome| outcome.response.clone())
    }

    pub fn error(&self) -> Option<TransportError> {
        self.shared
            .state
            .lock()
            .outcome
            .as_ref()
            .and_then(|outcome| outcome.error.clone())
    }

    /// Blocks until the exchange is over and its completion hooks have run.
    pub fn wait(&self) -> SubmissionStatus {
        let mut state = self.shared.state.lock();
        while !state.settled {
            self.shared.settled.wait(&mut state);
        }
        Self::settled_status(&state)
    }

    /// Like [`Submission::wait`], `None` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<SubmissionStatus> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !state.settled {
            if self
                .shared
                .settled
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.settled.then(|| Self::settled_status(&state));
            }
        }
        Some(Self::settled_status(&state))
    }

    /// Runs `hook` once the exchange is over, right away if it already is.
    pub fn on_complete(&self, hook: impl FnOnce(&Self) + Send + 'static) {
        {
            let mut state = self.shared.state.lock();
            if state.outcome.is_none() {
                state.hooks.push(Box::new(hook));
                return;
            }
        }
        hook(self);
    }

    fn settled_status(state: &State) -> SubmissionStatus {
        state
            .outcome
            .as_ref()
            .map_or(SubmissionStatus::Running, |outcome| outcome.status)
    }

    fn finish(&self, outcome: Outcome) -> bool {
        let hooks = {
            let mut state = self.shared.state.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome);
            std::mem::take(&mut state.hooks)
        };

        for hook in hooks {
            hook(self);
        }

        self.shared.state.lock().settled = true;
        self.shared.settled.notify_all();
        true
    }
}

impl fmt::Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submission")
            .field("id", &self.shared.id)
            .field("request_name", &self.shared.request_name)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Turns a request into a transport call.
#[derive(Debug, Clone)]
pub struct SubmissionController {
    registry: TransportRegistry,
    expander: Arc<dyn PropertyExpander>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl SubmissionController {
    pub fn new(registry: TransportRegistry) -> Self {
        Self {
            registry,
            expander: Arc::new(DefaultPropertyExpander::new()),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    #[must_use]
    pub fn with_expander(mut self, expander: Arc<dyn PropertyExpander>) -> Self {
        self.expander = expander;
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn registry(&self) -> &TransportRegistry {
        &self.registry
    }

    /// Sends `request`.
    ///
    /// `Ok(None)` means nothing was sent because the endpoint expanded to
    /// nothing; the problem is reported to the diagnostic sink instead.
    /// Exchange failures are reported through the returned [`Submission`].
    #[instrument(skip_all, fields(request = %request.name(), mode = ?mode))]
    pub fn submit(
        &self,
        request: &Arc<Request>,
        context: &SubmitContext,
        mode: SubmitMode,
    ) -> Result<Option<Submission>, SubmitError> {
        let config = request.config();

        let endpoint = self
            .expander
            .expand(context, config.endpoint.as_deref().unwrap_or_default())?;
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            self.diagnostics
                .show_error(&format!("Missing endpoint for request [{}]", config.name));
            return Ok(None);
        }

        let url = Url::parse(endpoint).map_err(|error| TransportError::InvalidEndpoint {
            endpoint: endpoint.to_owned(),
            reason: error.to_string(),
        })?;
        let transport = self.registry.resolve(&url, context)?;
        let prepared = self.prepare(request, &config, url, context)?;

        let listeners = request.submit_listeners();
        if !listeners
            .iter()
            .all(|listener| listener.before_submit(request, context))
        {
            info!("submission canceled by listener");
            return Ok(Some(Submission::vetoed(config.name)));
        }

        info!(endpoint = %prepared.http.url, "submitting request");
        let submission = transport.exchange(prepared, context, mode)?;

        let target = Arc::downgrade(request);
        submission.on_complete(move |submission| {
            match submission.status() {
                SubmissionStatus::Finished => {
                    if let Some(request) = target.upgrade() {
                        request.set_response(submission.response());
                    }
                }
                SubmissionStatus::Error => {
                    warn!(
                        request = submission.request_name(),
                        error = ?submission.error(),
                        "exchange failed"
                    );
                }
                SubmissionStatus::Running | SubmissionStatus::Canceled => {}
            }

            for listener in &listeners {
                listener.after_submit(submission);
            }
        });

        if mode == SubmitMode::Sync {
            submission.wait();
        }

        Ok(Some(submission))
    }

    fn prepare(
        &self,
        request: &Request,
        config: &RequestConfig,
        url: Url,
        context: &SubmitContext,
    ) -> Result<PreparedRequest, SubmitError> {
        let operation = request.operation();
        let soap_version = operation.interface().soap_version();
        let encoding = config
            .encoding
            .clone()
            .filter(|encoding| !encoding.is_empty())
            .unwrap_or_else(|| DEFAULT_ENCODING.to_owned());
        let skip_soap_action = config.settings.get_bool(settings::SKIP_SOAP_ACTION);

        let mut builder = HttpBuilder::new(url);

        if soap_version == SoapVersion::Soap11 && !skip_soap_action {
            builder.set_header(
                "SOAPAction",
                format!("\"{}\"", operation.action().unwrap_or_default()),
            );
        }

        if let Some(credentials) = config.credentials.as_ref().filter(|c| !c.is_empty()) {
            builder.with_basic(
                credentials.username.as_deref().unwrap_or_default(),
                credentials.password.as_deref().unwrap_or_default(),
            );
        }

        for (name, value) in config.headers.iter() {
            builder.set_header(name, self.expander.expand(context, value)?);
        }

        let body = self.expander.expand(context, &config.request_content)?;
        let action = operation.action().filter(|_| !skip_soap_action);
        let http = builder.post(body, &soap_version.content_type(&encoding, action));

        let policy = AttachmentPolicy {
            mtom: config.settings.get_bool(settings::ENABLE_MTOM),
            force_mtom: config.settings.get_bool(settings::FORCE_MTOM),
            encode_attachments: config.settings.get_bool(settings::ENCODE_ATTACHMENTS),
            inline_response_attachments: config
                .settings
                .get_bool(settings::INLINE_RESPONSE_ATTACHMENTS),
            expand_mtom_response_attachments: config
                .settings
                .get_bool(settings::EXPAND_MTOM_RESPONSE_ATTACHMENTS),
            inline_files: config.settings.get_bool(settings::ENABLE_INLINE_FILES),
        };

        let wss = WssSettings {
            password_type: config
                .wss_password_type
                .as_deref()
                .and_then(|value| value.parse::<WssPasswordType>().ok())
                .filter(|kind| *kind != WssPasswordType::None),
            incoming: config.incoming_wss.clone(),
            outgoing: config.outgoing_wss.clone(),
            time_to_live: config
                .settings
                .get_string(settings::WSS_TIME_TO_LIVE)
                .map(ToOwned::to_owned),
        };

        Ok(PreparedRequest {
            request_name: config.name.clone(),
            http,
            encoding,
            soap_version,
            attachments: config.attachments.clone(),
            policy,
            wss,
            wsa: config
                .use_ws_addressing
                .then(|| config.wsa_config.clone().unwrap_or_default()),
        })
    }
}
