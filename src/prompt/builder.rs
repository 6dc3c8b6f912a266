use crate::tools::ToolDescriptor;

pub fn build_tools_prompt(tools: &[ToolDescriptor]) -> String {
    let tools_text = tools
        .iter()
        .map(|tool| {
            format!(
                "\n - name: {}\n - description: {}\n - params_schema: {}",
                tool.name, tool.description, tool.argument_schema
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Available tools:\n{}\n\nIMPORTANT: These are the ONLY tools available. Do not use or reference any other tools.",
        tools_text
    )
}

/// System instruction for one session: the bound tools plus the exact call count to hit.
pub fn build_system_prompt(tools: &[ToolDescriptor], tool_call_budget: usize) -> String {
    let noun = if tool_call_budget == 1 { "call" } else { "calls" };
    format!(
        r#"You are an assistant that solves tasks by calling tools.

{}

Rules:
- Solving this task requires exactly {} tool {}. Make exactly that many calls in total.
- Tool calls that do not depend on each other's results should be issued together in the same turn.
- Tool calls that need an earlier result must wait for the turn after that result arrives.
- Pass arguments exactly as the task states them.
- When all calls are done, reply with a short final answer and no further tool calls."#,
        build_tools_prompt(tools),
        tool_call_budget,
        noun
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_prompt_lists_every_tool_and_the_budget() {
        let tools = vec![
            ToolDescriptor::new("get_weather".into(), "Weather by city".into(), json!({})),
            ToolDescriptor::new("get_time".into(), "Local time".into(), json!({})),
        ];
        let prompt = build_system_prompt(&tools, 3);
        assert!(prompt.contains("name: get_weather"));
        assert!(prompt.contains("description: Local time"));
        assert!(prompt.contains("exactly 3 tool calls"));
    }

    #[test]
    fn singular_budget_reads_naturally() {
        let prompt = build_system_prompt(&[], 1);
        assert!(prompt.contains("exactly 1 tool call."));
    }
}
