//! Login form contract extracted from the gateway's HTML

use crate::config::{parse_selector, LoginFormConfig};
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use scraper::{ElementRef, Html};
use url::Url;

/// The submission contract of a login page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Where the form posts to
    pub action: Url,
    /// Hidden inputs in document order, echoed back verbatim
    pub hidden_fields: Vec<(String, String)>,
    /// Name of the identifier input
    pub username_field: String,
    /// Name of the secret input
    pub password_field: String,
    /// Named submit button, if any. The gateway rejects posts without it.
    pub submit_field: Option<(String, String)>,
}

impl LoginForm {
    /// Parse the login form out of a page served from `page_url`
    pub fn parse(html: &str, page_url: &Url, overrides: &LoginFormConfig) -> Result<Self> {
        Self::from_document(&Html::parse_document(html), page_url, overrides)
    }

    /// Parse the login form out of an already parsed document
    pub fn from_document(
        document: &Html,
        page_url: &Url,
        overrides: &LoginFormConfig,
    ) -> Result<Self> {
        let form_selector = parse_selector("form")?;
        let input_selector = parse_selector("input")?;

        let forms: Vec<ElementRef<'_>> = document.select(&form_selector).collect();
        if forms.is_empty() {
            return Err(Error::missing_field("form"));
        }

        let is_secret_input = |input: &ElementRef<'_>| {
            let element = input.value();
            match &overrides.password_field {
                Some(name) => element.attr("name") == Some(name.as_str()),
                None => element
                    .attr("type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("password")),
            }
        };
        let form = forms
            .into_iter()
            .find(|form| form.select(&input_selector).any(|input| is_secret_input(&input)))
            .ok_or_else(|| {
                Error::missing_field(
                    overrides
                        .password_field
                        .clone()
                        .unwrap_or_else(|| "password".to_string()),
                )
            })?;

        let action = match form.value().attr("action").map(str::trim) {
            Some(action) if !action.is_empty() => page_url.join(action)?,
            _ => page_url.clone(),
        };

        let mut names = Vec::new();
        let mut hidden_fields = Vec::new();
        let mut detected_username = None;
        let mut detected_password = None;
        let mut submit_field = None;

        for input in form.select(&input_selector) {
            let element = input.value();
            let Some(name) = element.attr("name") else {
                continue;
            };
            let value = element.attr("value").unwrap_or("");
            names.push(name);

            match element.attr("type").unwrap_or("text").to_ascii_lowercase().as_str() {
                "hidden" => hidden_fields.push((name.to_string(), value.to_string())),
                "password" => {
                    detected_password.get_or_insert(name);
                }
                "text" | "email" => {
                    detected_username.get_or_insert(name);
                }
                "submit" => {
                    submit_field.get_or_insert((name.to_string(), value.to_string()));
                }
                _ => {}
            }
        }

        let password_field = pick_field(
            &names,
            overrides.password_field.as_deref(),
            detected_password,
            "password",
        )?;
        let username_field = pick_field(
            &names,
            overrides.username_field.as_deref(),
            detected_username,
            "username",
        )?;
        hidden_fields.retain(|(name, _)| *name != username_field && *name != password_field);

        Ok(Self {
            action,
            hidden_fields,
            username_field,
            password_field,
            submit_field,
        })
    }

    /// Form body: hidden fields, then the credentials, then the submit
    /// button
    pub fn payload(&self, credentials: &CredentialStore) -> Vec<(String, String)> {
        let mut payload = self.hidden_fields.clone();
        payload.push((self.username_field.clone(), credentials.identifier().to_string()));
        payload.push((self.password_field.clone(), credentials.secret().to_string()));
        if let Some(submit) = &self.submit_field {
            payload.push(submit.clone());
        }
        payload
    }
}

/// Resolve a field name: an override must exist in the form, otherwise
/// the detected name is used
fn pick_field(
    names: &[&str],
    configured: Option<&str>,
    detected: Option<&str>,
    kind: &str,
) -> Result<String> {
    match configured {
        Some(name) if names.contains(&name) => Ok(name.to_string()),
        Some(name) => Err(Error::missing_field(name)),
        None => detected
            .map(str::to_string)
            .ok_or_else(|| Error::missing_field(kind)),
    }
}
