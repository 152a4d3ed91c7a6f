//! Values stored in the session cookie.

use serde::{Deserialize, Serialize};

/// The signed-in user as reported by the identity provider.
///
/// Never stored in the session; resolved from the stored access token on
/// each request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Identity provider's user id.
    pub id: String,
    /// Email address, when the provider has one on file.
    #[serde(default)]
    pub email: Option<String>,
}

/// Severity of a toast message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
}

/// One-shot notification shown on the page after a redirect.
///
/// Serialized as `{"message": "...", "type": "success"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ToastKind,
}

impl Toast {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Success,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Error,
        }
    }

    /// CSS modifier used by the templates.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            ToastKind::Success => "toast-success",
            ToastKind::Error => "toast-error",
        }
    }
}

/// Session keys.
pub mod keys {
    /// Remote session tokens from the identity provider.
    pub const AUTH: &str = "auth";

    /// Flash slot holding a [`super::Toast`].
    pub const TOAST_MESSAGE: &str = "toastMessage";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_wire_shape() {
        let json = serde_json::to_value(Toast::success("saved")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"message": "saved", "type": "success"})
        );
    }

    #[test]
    fn test_toast_css_class() {
        assert_eq!(Toast::error("nope").css_class(), "toast-error");
    }
}
