//! services/api/src/appearance.rs
//!
//! Typed appearance and localization settings for the sign-in form.
//!
//! Every recognised option is a named field with a default. A JSON file passed via
//! `AUTH_UI_CONFIG` may override any subset of them; unknown keys are rejected and
//! every value is validated before the server starts.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use utoipa::ToSchema;

use crate::config::ConfigError;

//=========================================================================================
// Theme
//=========================================================================================

/// Colours of the sign-in form widgets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeColors {
    /// Primary button background.
    pub brand: String,
    /// Primary button background on hover.
    pub brand_accent: String,
    pub brand_button_text: String,
    pub default_button_background: String,
    pub default_button_background_hover: String,
    pub input_background: String,
    pub input_border: String,
    pub input_border_hover: String,
    pub input_border_focus: String,
    pub input_text: String,
    pub input_placeholder: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            brand: "#eab308".into(),
            brand_accent: "#ca8a04".into(),
            brand_button_text: "white".into(),
            default_button_background: "#1e40af".into(),
            default_button_background_hover: "#1e3a8a".into(),
            input_background: "rgba(255, 255, 255, 0.1)".into(),
            input_border: "rgba(255, 255, 255, 0.2)".into(),
            input_border_hover: "#eab308".into(),
            input_border_focus: "#eab308".into(),
            input_text: "white".into(),
            input_placeholder: "rgba(255, 255, 255, 0.5)".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct BorderWidths {
    pub button_border_width: String,
    pub input_border_width: String,
}

impl Default for BorderWidths {
    fn default() -> Self {
        Self {
            button_border_width: "1px".into(),
            input_border_width: "1px".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Radii {
    pub border_radius_button: String,
    pub button_border_radius: String,
    pub input_border_radius: String,
}

impl Default for Radii {
    fn default() -> Self {
        Self {
            border_radius_button: "0.5rem".into(),
            button_border_radius: "0.5rem".into(),
            input_border_radius: "0.5rem".into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Theme {
    pub colors: ThemeColors,
    pub border_widths: BorderWidths,
    pub radii: Radii,
}

//=========================================================================================
// Localization
//=========================================================================================

/// Labels for the sign-in and sign-up variants of the form. Overrides must be given in full.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AuthFormLabels {
    pub email_label: String,
    pub password_label: String,
    pub button_label: String,
    pub loading_button_label: String,
    /// Must contain the `{{provider}}` placeholder.
    pub social_provider_text: String,
    pub link_text: String,
}

impl AuthFormLabels {
    fn sign_in() -> Self {
        Self {
            email_label: "Email".into(),
            password_label: "Password".into(),
            button_label: "Sign in".into(),
            loading_button_label: "Signing in...".into(),
            social_provider_text: "Sign in with {{provider}}".into(),
            link_text: "Already have an account? Sign in".into(),
        }
    }

    fn sign_up() -> Self {
        Self {
            email_label: "Email".into(),
            password_label: "Password".into(),
            button_label: "Create account".into(),
            loading_button_label: "Creating account...".into(),
            social_provider_text: "Sign up with {{provider}}".into(),
            link_text: "Don't have an account? Sign up".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ForgottenPasswordLabels {
    pub link_text: String,
    pub button_label: String,
    pub loading_button_label: String,
}

impl Default for ForgottenPasswordLabels {
    fn default() -> Self {
        Self {
            link_text: "Forgot your password?".into(),
            button_label: "Send instructions".into(),
            loading_button_label: "Sending...".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Localization {
    pub sign_in: AuthFormLabels,
    pub sign_up: AuthFormLabels,
    pub forgotten_password: ForgottenPasswordLabels,
}

impl Default for Localization {
    fn default() -> Self {
        Self {
            sign_in: AuthFormLabels::sign_in(),
            sign_up: AuthFormLabels::sign_up(),
            forgotten_password: ForgottenPasswordLabels::default(),
        }
    }
}

//=========================================================================================
// AuthUiConfig
//=========================================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct AuthUiConfig {
    pub theme: Theme,
    pub localization: Localization,
}

const VAR: &str = "AUTH_UI_CONFIG";

fn color_regex() -> &'static Regex {
    static COLOR_RE: OnceLock<Regex> = OnceLock::new();
    COLOR_RE.get_or_init(|| {
        Regex::new(
            r"^(#[0-9a-fA-F]{3}|#[0-9a-fA-F]{6}|white|black|transparent|rgba?\(\s*\d{1,3}\s*,\s*\d{1,3}\s*,\s*\d{1,3}\s*(,\s*(0|1|0?\.\d+)\s*)?\))$",
        )
        .expect("valid colour regex")
    })
}

fn length_regex() -> &'static Regex {
    static LENGTH_RE: OnceLock<Regex> = OnceLock::new();
    LENGTH_RE.get_or_init(|| Regex::new(r"^\d+(\.\d+)?(px|rem|em)$").expect("valid length regex"))
}

impl AuthUiConfig {
    /// Parses and validates a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidValue(VAR.to_string(), format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: AuthUiConfig = serde_json::from_str(raw)
            .map_err(|e| ConfigError::InvalidValue(VAR.to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.theme.colors;
        for (key, value) in [
            ("brand", &c.brand),
            ("brand_accent", &c.brand_accent),
            ("brand_button_text", &c.brand_button_text),
            ("default_button_background", &c.default_button_background),
            ("default_button_background_hover", &c.default_button_background_hover),
            ("input_background", &c.input_background),
            ("input_border", &c.input_border),
            ("input_border_hover", &c.input_border_hover),
            ("input_border_focus", &c.input_border_focus),
            ("input_text", &c.input_text),
            ("input_placeholder", &c.input_placeholder),
        ] {
            check(color_regex(), "colour", key, value)?;
        }

        let w = &self.theme.border_widths;
        let r = &self.theme.radii;
        for (key, value) in [
            ("button_border_width", &w.button_border_width),
            ("input_border_width", &w.input_border_width),
            ("border_radius_button", &r.border_radius_button),
            ("button_border_radius", &r.button_border_radius),
            ("input_border_radius", &r.input_border_radius),
        ] {
            check(length_regex(), "length", key, value)?;
        }

        let l = &self.localization;
        for (form, labels) in [("sign_in", &l.sign_in), ("sign_up", &l.sign_up)] {
            for (key, value) in [
                ("email_label", &labels.email_label),
                ("password_label", &labels.password_label),
                ("button_label", &labels.button_label),
                ("loading_button_label", &labels.loading_button_label),
                ("social_provider_text", &labels.social_provider_text),
                ("link_text", &labels.link_text),
            ] {
                non_empty(&format!("{}.{}", form, key), value)?;
            }
            if !labels.social_provider_text.contains("{{provider}}") {
                return Err(invalid(format!(
                    "{}.social_provider_text must contain {{{{provider}}}}",
                    form
                )));
            }
        }
        let f = &l.forgotten_password;
        non_empty("forgotten_password.link_text", &f.link_text)?;
        non_empty("forgotten_password.button_label", &f.button_label)?;
        non_empty("forgotten_password.loading_button_label", &f.loading_button_label)?;
        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::InvalidValue(VAR.to_string(), message)
}

fn check(re: &Regex, kind: &str, key: &str, value: &str) -> Result<(), ConfigError> {
    if re.is_match(value.trim()) {
        Ok(())
    } else {
        Err(invalid(format!("'{}' is not a valid {} for {}", value, kind, key)))
    }
}

fn non_empty(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(invalid(format!("{} must not be empty", key)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AuthUiConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_file_overrides_only_what_it_names() {
        let config = AuthUiConfig::from_json(
            r##"{ "theme": { "colors": { "brand": "#ff0000" } },
                  "localization": { "forgotten_password": { "link_text": "Esqueceu sua senha?" } } }"##,
        )
        .unwrap();
        assert_eq!(config.theme.colors.brand, "#ff0000");
        assert_eq!(config.theme.colors.brand_accent, "#ca8a04");
        assert_eq!(config.localization.forgotten_password.link_text, "Esqueceu sua senha?");
        assert_eq!(config.localization.sign_in.button_label, "Sign in");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AuthUiConfig::from_json(r#"{ "theme": { "shadows": {} } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "AUTH_UI_CONFIG"));
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(AuthUiConfig::from_json(r#"{ "theme": { "colors": { "brand": "yellowish" } } }"#).is_err());
        assert!(AuthUiConfig::from_json(r#"{ "theme": { "radii": { "input_border_radius": "big" } } }"#).is_err());

        let mut config = AuthUiConfig::default();
        config.localization.sign_up.social_provider_text = "Sign up".into();
        assert!(config.validate().is_err());

        let mut config = AuthUiConfig::default();
        config.localization.sign_in.button_label = "  ".into();
        assert!(config.validate().is_err());
    }
}
