// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification and narration prompts.

use std::fmt::Write;

use querychain_core::{ToolKind, ToolResult, Turn};

const NO_HISTORY: &str = "No previous conversation.";

/// Render recalled turns as `role: content` lines.
pub fn format_history(turns: &[Turn]) -> String {
    if turns.is_empty() {
        return NO_HISTORY.to_string();
    }
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role, t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask the model to pick exactly one tool for `input`.
pub fn classification_prompt(history: &str, input: &str, default_collection: &str) -> String {
    let mut p = String::from(
        "You route requests about an employee database to exactly one tool.\n\nTools:\n",
    );
    for kind in ToolKind::ALL {
        let _ = writeln!(p, "- {kind}: {}", kind.description());
    }
    let _ = write!(
        p,
        "\nLimit rules:\n\
         - a specific person or entity: 1\n\
         - an organization or company: 5\n\
         - numeric filters such as salary ranges: 10\n\
         - otherwise: 5\n\n\
         Use the collection \"{default_collection}\" unless the request names another.\n\
         For calculator, put the bare arithmetic in \"expression\" (for example \"20% of 500\" becomes \"0.2 * 500\").\n\n\
         Respond with a single JSON object and nothing else:\n\
         {{\"tool\": \"<tool name>\", \"collection\": \"<collection>\", \"limit\": <number>, \"expression\": \"<calculator only>\"}}\n\n\
         Conversation so far:\n{history}\n\n\
         Request: {input}\n"
    );
    p
}

/// Ask the model to answer the user from the tool result.
pub fn narration_prompt(history: &str, input: &str, tool: &str, result: &ToolResult) -> String {
    let rendered = serde_json::to_string_pretty(result).unwrap_or_else(|_| format!("{result:?}"));
    format!(
        "You are a helpful assistant answering questions about an employee database.\n\
         Answer the user's request using only the tool result below. \
         If the tool failed, say so plainly and suggest how to rephrase.\n\n\
         Conversation so far:\n{history}\n\n\
         Request: {input}\n\
         Tool used: {tool}\n\
         Tool result:\n{rendered}\n\n\
         Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use querychain_core::Role;

    fn turn(role: Role, content: &str) -> Turn {
        Turn {
            seq: 1,
            session_id: "s".into(),
            user_id: "u".into(),
            role,
            content: content.into(),
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn empty_history_has_placeholder() {
        assert_eq!(format_history(&[]), "No previous conversation.");
    }

    #[test]
    fn history_lines_use_role_prefix() {
        let text = format_history(&[turn(Role::User, "hi"), turn(Role::Assistant, "hello")]);
        assert_eq!(text, "user: hi\nassistant: hello");
    }

    #[test]
    fn classification_lists_every_tool() {
        let p = classification_prompt("No previous conversation.", "who is John", "managers");
        for kind in ToolKind::ALL {
            assert!(p.contains(&format!("- {kind}: ")), "missing {kind}");
        }
        assert!(p.contains("\"managers\""));
        assert!(p.contains("Request: who is John"));
    }

    #[test]
    fn narration_embeds_pretty_result() {
        let result = ToolResult {
            success: true,
            result: Some(4.0),
            ..ToolResult::default()
        };
        let p = narration_prompt("No previous conversation.", "2+2", "calculator", &result);
        assert!(p.contains("\"success\": true"));
        assert!(p.contains("Tool used: calculator"));
    }
}
