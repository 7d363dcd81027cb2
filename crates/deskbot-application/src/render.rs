//! Plain-text rendering of [`BotReply`] through minijinja templates.

use crate::formatter::BotReply;
use deskbot_core::error::{DeskbotError, Result};
use minijinja::Environment;

const REPLY_TEMPLATE: &str = "\
{{ reply.headline }}
{%- for line in reply.details %}
  {{ line }}
{%- endfor %}
{%- if reply.notice %}
Note: {{ reply.notice }}
{%- endif %}
{%- if reply.actions %}
You can say: {{ reply.actions | join(\", \") }}
{%- endif %}";

/// Renders replies for terminal output.
pub struct ReplyRenderer {
    env: Environment<'static>,
}

impl ReplyRenderer {
    pub fn new() -> Result<Self> {
        Self::with_template(REPLY_TEMPLATE)
    }

    /// Uses `template` instead of the built-in one. The reply is available
    /// as `reply`.
    pub fn with_template(template: &'static str) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("reply", template)
            .map_err(|e| DeskbotError::config(format!("invalid reply template: {}", e)))?;
        Ok(Self { env })
    }

    pub fn render(&self, reply: &BotReply) -> Result<String> {
        let template = self
            .env
            .get_template("reply")
            .map_err(|e| DeskbotError::internal(format!("reply template missing: {}", e)))?;
        template
            .render(minijinja::context! { reply => reply })
            .map_err(|e| DeskbotError::internal(format!("failed to render reply: {}", e)))
    }
}
