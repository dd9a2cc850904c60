pub mod namespace;
pub mod parser;

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("Invalid XML: {0}")]
    ParserError(#[from] roxmltree::Error),

    #[error("Document is empty")]
    EmptyDocument,
}
