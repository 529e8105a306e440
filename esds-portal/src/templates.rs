//! HTML and email templates (handlebars, compiled in)

use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

pub const LOGIN: &str = "login";
pub const DASHBOARD: &str = "dashboard";
pub const MEMBERSHIP_EMAIL_HTML: &str = "membership_email";
pub const MEMBERSHIP_EMAIL_TEXT: &str = "membership_email_text";

const SOURCES: [(&str, &str); 4] = [
    (LOGIN, include_str!("../assets/templates/login.hbs")),
    (DASHBOARD, include_str!("../assets/templates/dashboard.hbs")),
    (
        MEMBERSHIP_EMAIL_HTML,
        include_str!("../assets/templates/membership_email.hbs"),
    ),
    (
        MEMBERSHIP_EMAIL_TEXT,
        include_str!("../assets/templates/membership_email.txt.hbs"),
    ),
];

/// Template registry
#[derive(Debug)]
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        for (name, source) in SOURCES {
            registry.register_template_string(name, source)?;
        }
        Ok(Self { registry })
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, RenderError> {
        self.registry.render(name, data)
    }
}
