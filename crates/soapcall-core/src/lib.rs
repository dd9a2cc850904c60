pub mod attachments;
pub mod config;
pub mod diagnostics;
pub mod expansion;
pub mod interface;
pub mod notify;
pub mod operation;
pub mod request;
pub mod response;
pub mod submit;
pub mod transport;

pub use attachments::{AttachmentEncoding, AttachmentPart, AttachmentResolver, XmlAttachmentResolver};
pub use config::{Credentials, RequestConfig, WssPasswordType};
pub use diagnostics::{DiagnosticSink, TracingDiagnostics};
pub use expansion::{DefaultPropertyExpander, PropertyExpander, SubmitContext};
pub use interface::{Interface, SoapVersion};
pub use operation::{MessagePart, Operation, WsdlOperation};
pub use request::{Request, RequestOptions};
pub use response::Response;
pub use submit::{Submission, SubmissionController, SubmissionStatus, SubmitListener, SubmitMode};
pub use transport::{PreparedRequest, Transport, TransportError, TransportRegistry};

/// Failure of the primary user action: sending a request.
///
/// Derived data (attachment parts, message parts) never produces this error;
/// those accessors recover locally and log instead.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Failed to submit request: {0}")]
    Expansion(#[from] expansion::ExpansionError),

    #[error("Failed to submit request: {0}")]
    Transport(#[from] transport::TransportError),
}
