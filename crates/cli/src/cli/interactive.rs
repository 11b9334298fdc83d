//! Interactive shell over a connected adapter.
//!
//! Reads lines with `rustyline`, parses them into [`ShellCommand`]s and
//! runs each against the adapter. Ctrl-C while a command is running
//! cancels that command only; Ctrl-C at the prompt clears the line.

use mc_mcp_client::factory::split_command_line;
use mc_mcp_client::{AdapterError, CallContext, PromptArguments, ServerAdapter, ToolArguments};
use rustyline::error::ReadlineError;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::connect::{cancel_on_ctrl_c, prompts_table, resources_table, tools_table};
use super::output::{render_prompt, render_resource, render_tool_result};

const PROMPT: &str = "mcp> ";

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Help,
    Info,
    Tools,
    Resources,
    Prompts,
    Call { name: String, arguments: ToolArguments },
    Read { uri: String },
    Prompt { name: String, arguments: PromptArguments },
    Quit,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A `k=v` value: a JSON scalar when it parses as one, else the raw text.
fn scalar(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(v @ (Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))) => v,
        _ => Value::String(raw.to_owned()),
    }
}

fn pairs(rest: &str) -> Result<Vec<(String, String)>, String> {
    split_command_line(rest)?
        .into_iter()
        .map(|word| match word.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
            _ => Err(format!("argument {word:?} is not key=value")),
        })
        .collect()
}

/// Tool arguments from either a JSON object or `k=v` words.
pub fn parse_tool_arguments(rest: &str) -> Result<ToolArguments, String> {
    let rest = rest.trim();
    if rest.starts_with('{') {
        return match serde_json::from_str::<Value>(rest) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err("arguments must be a JSON object".into()),
            Err(e) => Err(format!("invalid JSON arguments: {e}")),
        };
    }
    Ok(pairs(rest)?.into_iter().map(|(k, v)| (k, scalar(&v))).collect())
}

/// Prompt arguments are string-valued, so `k=v` words are taken verbatim.
pub fn parse_prompt_arguments(rest: &str) -> Result<PromptArguments, String> {
    Ok(pairs(rest.trim())?.into_iter().collect())
}

fn split_head(s: &str) -> (&str, &str) {
    let s = s.trim();
    s.split_once(char::is_whitespace).unwrap_or((s, ""))
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, String> {
    let (head, rest) = split_head(line);
    let cmd = match head {
        "" => return Ok(None),
        "help" | "?" => ShellCommand::Help,
        "info" => ShellCommand::Info,
        "tools" => ShellCommand::Tools,
        "resources" => ShellCommand::Resources,
        "prompts" => ShellCommand::Prompts,
        "quit" | "exit" => ShellCommand::Quit,
        "call" => {
            let (name, args) = split_head(rest);
            if name.is_empty() {
                return Err("usage: call <tool> [key=value ...|{json}]".into());
            }
            ShellCommand::Call {
                name: name.to_owned(),
                arguments: parse_tool_arguments(args)?,
            }
        }
        "read" => {
            let uri = rest.trim();
            if uri.is_empty() {
                return Err("usage: read <uri>".into());
            }
            ShellCommand::Read { uri: uri.to_owned() }
        }
        "prompt" => {
            let (name, args) = split_head(rest);
            if name.is_empty() {
                return Err("usage: prompt <name> [key=value ...]".into());
            }
            ShellCommand::Prompt {
                name: name.to_owned(),
                arguments: parse_prompt_arguments(args)?,
            }
        }
        other => return Err(format!("unknown command: {other} (type 'help' for a list)")),
    };
    Ok(Some(cmd))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Execution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn print_help() {
    eprintln!("Commands:");
    eprintln!("  help                               Show this help");
    eprintln!("  info                               Show the connected server");
    eprintln!("  tools                              List tools");
    eprintln!("  resources                          List resources");
    eprintln!("  prompts                            List prompts");
    eprintln!("  call <tool> [k=v ...|{{json}}]       Call a tool");
    eprintln!("  read <uri>                         Read a resource");
    eprintln!("  prompt <name> [k=v ...]            Render a prompt");
    eprintln!("  quit, exit                         Leave the shell");
}

async fn execute(adapter: &dyn ServerAdapter, ctx: &CallContext, cmd: ShellCommand) -> Result<(), AdapterError> {
    match cmd {
        ShellCommand::Help | ShellCommand::Quit => print_help(),
        ShellCommand::Info => {
            let server = adapter.server_info()?;
            println!("Server:    {} (version {})", server.name, server.version);
            println!("Transport: {}", adapter.kind());
            println!("Endpoint:  {}", adapter.config().endpoint());
        }
        ShellCommand::Tools => {
            let tools = adapter.list_tools(ctx).await?;
            println!("Available tools ({}):", tools.len());
            print!("{}", tools_table(&tools).render());
        }
        ShellCommand::Resources => {
            let resources = adapter.list_resources(ctx).await?;
            println!("Available resources ({}):", resources.len());
            print!("{}", resources_table(&resources).render());
        }
        ShellCommand::Prompts => {
            let prompts = adapter.list_prompts(ctx).await?;
            println!("Available prompts ({}):", prompts.len());
            print!("{}", prompts_table(&prompts).render());
        }
        ShellCommand::Call { name, arguments } => {
            tracing::info!(tool = %name, ?arguments, "calling tool");
            let result = adapter.call_tool(ctx, &name, arguments).await?;
            print!("{}", render_tool_result(&name, &result));
        }
        ShellCommand::Read { uri } => {
            let result = adapter.read_resource(ctx, &uri).await?;
            print!("{}", render_resource(&result));
        }
        ShellCommand::Prompt { name, arguments } => {
            let result = adapter.get_prompt(ctx, &name, arguments).await?;
            print!("{}", render_prompt(&name, &result));
        }
    }
    Ok(())
}

/// Run the shell until `quit`, `exit` or end of input.
pub async fn run(adapter: &dyn ServerAdapter) -> anyhow::Result<()> {
    let mut rl = rustyline::DefaultEditor::new()?;

    eprintln!("Interactive mode. Type 'help' for commands, Ctrl+D to exit.");

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        };

        let cmd = match parse_line(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };
        rl.add_history_entry(line.as_str()).ok();

        if cmd == ShellCommand::Quit {
            break;
        }

        let token = CancellationToken::new();
        let watcher = cancel_on_ctrl_c(token.clone());
        let ctx = CallContext::from_token(token);
        let outcome = execute(adapter, &ctx, cmd).await;
        watcher.abort();

        match outcome {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => eprintln!("cancelled"),
            Err(e) => eprintln!("error: {e}"),
        }
    }

    eprintln!("Goodbye!");
    Ok(())
}
