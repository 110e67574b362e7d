//! MCP prompts

use charlesflow_lib::models::ThrottlePreset;
use rmcp::{
    model::{GetPromptResult, Prompt, PromptMessage, PromptMessageRole},
    ErrorData as McpError,
};

pub const THROTTLING_HELPER: &str = "throttling_helper";

pub struct PromptRegistry;

impl PromptRegistry {
    pub fn list() -> Vec<Prompt> {
        vec![Prompt::new(
            THROTTLING_HELPER,
            Some("Reference of the network throttling presets accepted by set_throttling"),
            None,
        )]
    }

    pub fn get(name: &str) -> Result<GetPromptResult, McpError> {
        log::debug!("[MCP Prompts] Getting prompt {}", name);
        match name {
            THROTTLING_HELPER => Ok(GetPromptResult {
                description: Some("Network throttling presets".to_string()),
                messages: vec![PromptMessage::new_text(
                    PromptMessageRole::User,
                    Self::throttling_reference(),
                )],
            }),
            _ => Err(McpError::invalid_params(
                format!("Unknown prompt: {}", name),
                None,
            )),
        }
    }

    pub fn throttling_reference() -> String {
        format!(
            r#"Use the set_throttling tool to simulate a slow network in Charles.

Common presets: 3G, 4G, 56+kbps+Modem, 100+Mbps+Fibre, deactivate.
"start" and "on" are shortcuts for 3G; "deactivate" turns throttling off.

All accepted values: {}"#,
            ThrottlePreset::valid_names()
        )
    }
}
