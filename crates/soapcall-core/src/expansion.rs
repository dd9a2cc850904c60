//! `${...}` property references and their substitution at submit time.

use std::{collections::HashMap, fmt, sync::LazyLock};

use regex::{Captures, Regex};
use tracing::debug;

/// Upper bound on nested expansion (a property whose value references
/// another property, and so on).
const MAX_DEPTH: usize = 16;

static PROPERTY_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^{}]*)\}").expect("property reference pattern is valid"));

#[derive(Debug, thiserror::Error)]
pub enum ExpansionError {
    #[error("Unresolved property reference ${{{0}}}")]
    Unresolved(String),

    #[error("Property expansion exceeded the nesting limit while expanding [{0}]")]
    TooDeep(String),
}

/// Property values visible to one submission.
///
/// Plain names live in the default scope; `#Scope#name` references read the
/// named scope instead.
#[derive(Debug, Clone, Default)]
pub struct SubmitContext {
    properties: HashMap<String, String>,
    scopes: HashMap<String, HashMap<String, String>>,
}

impl SubmitContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(name, value);
        self
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn set_scoped_property(
        &mut self,
        scope: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.scopes
            .entry(scope.into())
            .or_default()
            .insert(name.into(), value.into());
    }

    pub fn scoped_property(&self, scope: &str, name: &str) -> Option<&str> {
        self.scopes
            .get(scope)
            .and_then(|properties| properties.get(name))
            .map(String::as_str)
    }
}

pub trait PropertyExpander: Send + Sync + fmt::Debug {
    fn expand(&self, context: &SubmitContext, template: &str) -> Result<String, ExpansionError>;
}

/// Expander for `${name}`, `${#Scope#name}` and `${#Env#VAR}` references.
///
/// Unknown references expand to an empty string unless the expander is
/// strict, in which case they are an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPropertyExpander {
    strict: bool,
}

impl DefaultPropertyExpander {
    pub const fn new() -> Self {
        Self { strict: false }
    }

    pub const fn strict() -> Self {
        Self { strict: true }
    }

    fn lookup(context: &SubmitContext, reference: &str) -> Option<String> {
        let reference = reference.trim();
        match reference.strip_prefix('#').and_then(|rest| rest.split_once('#')) {
            Some(("Env", name)) => std::env::var(name).ok(),
            Some((scope, name)) => context.scoped_property(scope, name).map(ToOwned::to_owned),
            None => context.property(reference).map(ToOwned::to_owned),
        }
    }

    fn expand_at(
        &self,
        context: &SubmitContext,
        template: &str,
        depth: usize,
    ) -> Result<String, ExpansionError> {
        if depth > MAX_DEPTH {
            return Err(ExpansionError::TooDeep(template.to_owned()));
        }

        if !template.contains("${") {
            return Ok(template.to_owned());
        }

        let mut failure = None;
        let expanded = PROPERTY_REFERENCE.replace_all(template, |caps: &Captures<'_>| {
            if failure.is_some() {
                return String::new();
            }

            let reference = &caps[1];
            match Self::lookup(context, reference) {
                Some(value) => match self.expand_at(context, &value, depth + 1) {
                    Ok(value) => value,
                    Err(error) => {
                        failure = Some(error);
                        String::new()
                    }
                },
                None if self.strict => {
                    failure = Some(ExpansionError::Unresolved(reference.to_owned()));
                    String::new()
                }
                None => {
                    debug!(reference, "unresolved property reference expands to empty");
                    String::new()
                }
            }
        });

        match failure {
            Some(error) => Err(error),
            None => Ok(expanded.into_owned()),
        }
    }
}

impl PropertyExpander for DefaultPropertyExpander {
    fn expand(&self, context: &SubmitContext, template: &str) -> Result<String, ExpansionError> {
        self.expand_at(context, template, 0)
    }
}

/// A `${...}` reference found in one of a request's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyExpansion {
    /// Field holding the reference (`endpoint`, `request`, or a header name).
    pub container: String,
    pub expression: String,
}

pub fn extract_expansions(container: &str, text: &str) -> Vec<PropertyExpansion> {
    PROPERTY_REFERENCE
        .captures_iter(text)
        .map(|caps| PropertyExpansion {
            container: container.to_owned(),
            expression: caps[1].to_owned(),
        })
        .collect()
}
