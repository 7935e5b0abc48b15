//! System prompt for the travel planner agent.

use crate::tools::ToolRegistry;

pub const TRAVEL_PLANNER_INSTRUCTION: &str = "You are an expert travel planner. For any user query, suggest the best time to visit, what to pack, and estimate expenses. Use tools as needed.";

/// Build the system prompt with tool descriptions.
pub fn build_system_prompt(tools: &ToolRegistry) -> String {
    if tools.is_empty() {
        return TRAVEL_PLANNER_INSTRUCTION.to_string();
    }

    let tool_descriptions = tools
        .list_tools()
        .iter()
        .map(|t| format!("- **{}**: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"{instruction}

## Available Tools

{tool_descriptions}

Prefer tool results over guesses for costs and dates, and mention when a figure is an estimate."#,
        instruction = TRAVEL_PLANNER_INSTRUCTION,
        tool_descriptions = tool_descriptions
    )
}
