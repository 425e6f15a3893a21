use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message author
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// LLM message
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Answer to the tool call identified by `tool_call_id`
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Tool calls requested by this message, empty when there are none
    pub fn requested_tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

/// Tool call from LLM
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

/// Function call details. `arguments` is the raw JSON text sent by the provider.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn default_call_type() -> String {
    "function".to_string()
}

impl ToolCall {
    #[cfg(test)]
    pub fn function(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            call_type: default_call_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.to_string(),
            },
        }
    }

    /// Parsed arguments; `null` or empty arguments become `{}`
    pub fn parsed_arguments(&self) -> Result<Value, serde_json::Error> {
        if self.function.arguments.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        let value: Value = serde_json::from_str(&self.function.arguments)?;
        Ok(if value.is_null() {
            Value::Object(Default::default())
        } else {
            value
        })
    }
}

/// Tool definition for LLM
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: ToolFunction,
}

/// Tool function definition
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assistant_message_with_null_content() {
        let msg: Message = serde_json::from_value(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "read_file", "arguments": "{\"filePath\":\"resume.json\"}"}
            }]
        }))
        .unwrap();
        assert_eq!(msg.content, None);
        assert_eq!(msg.requested_tool_calls().len(), 1);
        assert_eq!(
            msg.requested_tool_calls()[0].parsed_arguments().unwrap()["filePath"],
            "resume.json"
        );
    }

    #[test]
    fn test_tool_message_serialization() {
        let value = serde_json::to_value(Message::tool("call_1", "{}")).unwrap();
        assert_eq!(
            value,
            json!({"role": "tool", "content": "{}", "tool_call_id": "call_1"})
        );
    }

    #[test]
    fn test_null_arguments_become_empty_object() {
        let mut call = ToolCall::function("id", "read_file", Value::Null);
        assert_eq!(call.parsed_arguments().unwrap(), json!({}));
        call.function.arguments = String::new();
        assert_eq!(call.parsed_arguments().unwrap(), json!({}));
    }
}
