//! Classification of load routine results.
//!
//! A load routine may return a plain value, `{props}`, `{status, message}`
//! or `{redirect}`. [`normalize`] maps each of these onto exactly one
//! [`LoadOutcome`], checking the shapes in this order:
//!
//! 1. `redirect` present: [`LoadOutcome::Redirect`]. The field is either the
//!    target path or `{status, to}`; `status` defaults to 302 and must be 3xx.
//! 2. numeric `status >= 400`: [`LoadOutcome::ErrorPage`] with `message` or `""`.
//! 3. `props` present: [`LoadOutcome::Props`] with the `props` value.
//! 4. anything else, primitives included: the value itself becomes the props.
//! 5. nothing returned: empty props.

use turbo_payload::{Object, Value};

use crate::LoadReturn;

/// Default redirect status.
pub const DEFAULT_REDIRECT_STATUS: u16 = 302;

/// Props handed to a page's view.
#[derive(Debug, Clone, PartialEq)]
pub struct Props {
    /// Normally an object, but primitives returned by a routine pass through.
    pub values: Value,
}

impl Props {
    /// Wrap prop values.
    pub fn new(values: Value) -> Self {
        Self { values }
    }

    /// Empty props.
    pub fn empty() -> Self {
        Self::new(Value::Object(Object::new()))
    }

    /// A single prop.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key)
    }

    /// Whether there are no props.
    pub fn is_empty(&self) -> bool {
        match &self.values {
            Value::Object(fields) => fields.is_empty(),
            Value::Undefined => true,
            _ => false,
        }
    }

    /// The prop values.
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// Consume into the prop values.
    pub fn into_value(self) -> Value {
        self.values
    }
}

impl Default for Props {
    fn default() -> Self {
        Self::empty()
    }
}

/// The canonical outcome of one navigation's load step.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Render the page with these props.
    Props(Props),
    /// Render the nearest error boundary.
    ErrorPage { status: u16, message: String },
    /// Navigate elsewhere.
    Redirect { status: u16, to: String },
}

impl LoadOutcome {
    /// Short name used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadOutcome::Props(_) => "props",
            LoadOutcome::ErrorPage { .. } => "error",
            LoadOutcome::Redirect { .. } => "redirect",
        }
    }

    /// Status code of error and redirect outcomes.
    pub fn status(&self) -> Option<u16> {
        match self {
            LoadOutcome::Props(_) => None,
            LoadOutcome::ErrorPage { status, .. } | LoadOutcome::Redirect { status, .. } => {
                Some(*status)
            }
        }
    }

    /// Create an error page outcome.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        LoadOutcome::ErrorPage {
            status,
            message: message.into(),
        }
    }

    /// Borrow the props, if this is a props outcome.
    pub fn props(&self) -> Option<&Props> {
        match self {
            LoadOutcome::Props(props) => Some(props),
            _ => None,
        }
    }
}

/// Classify a load routine's return value.
pub fn normalize(ret: LoadReturn) -> LoadOutcome {
    let value = match ret.into_value() {
        None | Some(Value::Undefined) => return LoadOutcome::Props(Props::empty()),
        Some(value) => value,
    };

    if !value.is_object() {
        return LoadOutcome::Props(Props::new(value));
    }

    if let Some(redirect) = field(&value, "redirect") {
        return normalize_redirect(&redirect);
    }

    if let Some(status) = field(&value, "status").and_then(|s| s.as_f64()) {
        if status >= 400.0 {
            let message = value
                .get("message")
                .and_then(|m| m.as_str().map(str::to_owned))
                .unwrap_or_default();
            return LoadOutcome::ErrorPage {
                status: error_status(status),
                message,
            };
        }
    }

    // An explicit `props` key with nothing in it still selects the props shape.
    if let Some(props) = value.get("props") {
        return match props {
            Value::Undefined | Value::Null => LoadOutcome::Props(Props::empty()),
            props => LoadOutcome::Props(Props::new(props)),
        };
    }

    LoadOutcome::Props(Props::new(value))
}

/// A key's value, treating `undefined` and `null` as absent.
fn field(value: &Value, key: &str) -> Option<Value> {
    value
        .get(key)
        .filter(|v| !matches!(v, Value::Undefined | Value::Null))
}

fn normalize_redirect(redirect: &Value) -> LoadOutcome {
    if let Some(to) = redirect.as_str() {
        return LoadOutcome::Redirect {
            status: DEFAULT_REDIRECT_STATUS,
            to: to.to_string(),
        };
    }

    let status = match redirect.get("status") {
        None | Some(Value::Undefined) | Some(Value::Null) => DEFAULT_REDIRECT_STATUS,
        Some(status) => match status.as_f64() {
            Some(n) if n.fract() == 0.0 && (300.0..400.0).contains(&n) => n as u16,
            _ => return invalid_redirect(format!("status must be a 3xx code, got {:?}", status)),
        },
    };

    match redirect.get("to") {
        Some(Value::String(to)) if !to.is_empty() => LoadOutcome::Redirect { status, to },
        _ => invalid_redirect("missing redirect target `to`".to_string()),
    }
}

fn invalid_redirect(reason: String) -> LoadOutcome {
    LoadOutcome::ErrorPage {
        status: 500,
        message: format!("invalid redirect: {}", reason),
    }
}

// Non-integral or out-of-range statuses still render an error page.
fn error_status(status: f64) -> u16 {
    if status.fract() == 0.0 && status <= 999.0 {
        status as u16
    } else {
        500
    }
}
