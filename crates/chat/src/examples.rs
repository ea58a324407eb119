//! Canned snippets behind the quick-action buttons

use assistant_bus::Action;

pub const WORKFLOW_ACTION: &str = "show_workflow_example";
pub const AGENT_ACTION: &str = "show_agent_example";

const WORKFLOW_EXAMPLE: &str = r#"```yaml
name: Example Workflow
description: A simple workflow that demonstrates Julep capabilities

input_schema:
  type: object
  properties:
    message:
      type: string
  required:
    - message

tools:
- name: web_search
  type: integration
  integration:
    provider: web_search

main:
- prompt: Process the user message: {{_['message']}}
- tool: web_search
  arguments:
    query: {{_['message']}}
- prompt: Summarize the search results
```"#;

const AGENT_EXAMPLE: &str = r#"```python
from julep import Julep

client = Julep(api_key="your-api-key")

# Create an agent
agent = client.agents.create(
    name="My Assistant",
    about="A helpful AI assistant",
    instructions="You are a helpful assistant that answers questions clearly and concisely.",
    model="claude-sonnet-4",
    tools=[
        {
            "name": "web_search",
            "type": "integration",
            "integration": {
                "provider": "web_search"
            }
        }
    ]
)

print(f"Agent created with ID: {agent.id}")
```"#;

pub fn example_actions() -> Vec<Action> {
    vec![
        Action::new(WORKFLOW_ACTION, "Show Workflow Example")
            .with_description("Show a workflow example")
            .with_payload("type", "workflow"),
        Action::new(AGENT_ACTION, "Show Agent Example")
            .with_description("Show an agent creation example")
            .with_payload("type", "agent"),
    ]
}

/// Snippet for an example action, `None` for any other action
pub fn example_for(action: &Action) -> Option<&'static str> {
    match action.name.as_str() {
        WORKFLOW_ACTION => Some(WORKFLOW_EXAMPLE),
        AGENT_ACTION => Some(AGENT_EXAMPLE),
        _ => None,
    }
}
