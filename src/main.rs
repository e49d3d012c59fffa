// SPDX-License-Identifier: MIT

//! Interactive demos for the lattice-rs executor: a tool-approval flow and
//! a multi-step intake form, both driven by suspend/resume over stdin.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use uuid::Uuid;

use lattice_rs::{
    Engine, FnNode, GraphBuilder, InMemorySaver, NodeOutput, PartialUpdate, Reducer, RunConfig,
    RunOutcome, StateSchema, END,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the tool-approval workflow (pauses for your approval)
    Approve {
        /// The query to route to a tool
        #[arg(short, long)]
        query: String,

        /// Session identifier (generated when omitted)
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Run the intake form (pauses once per missing field)
    Form {
        /// Session identifier (generated when omitted)
        #[arg(short, long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    match args.command {
        Commands::Approve { query, session } => {
            run_to_completion(approval_graph()?, session, |u| {
                u.insert("query".to_string(), json!(query));
            })
            .await
        }
        Commands::Form { session } => run_to_completion(form_graph()?, session, |_| {}).await,
    }
}

/// Drive a graph to completion, answering every suspension from stdin.
async fn run_to_completion(
    graph: lattice_rs::CompiledGraph,
    session: Option<String>,
    seed: impl FnOnce(&mut PartialUpdate),
) -> anyhow::Result<()> {
    let session = session.unwrap_or_else(|| Uuid::new_v4().to_string());
    let engine = Engine::new(Arc::new(graph), Arc::new(InMemorySaver::new()));

    let mut initial = PartialUpdate::new();
    seed(&mut initial);

    let mut outcome = engine.run(initial, RunConfig::new(&session)).await?;
    loop {
        match outcome {
            RunOutcome::Complete(state) => {
                println!("\nFinal state:");
                println!("{}", serde_json::to_string_pretty(&state.to_json())?);
                return Ok(());
            }
            RunOutcome::Suspended { payload } => {
                let answer = prompt(&payload)?;
                outcome = engine
                    .resume(json!(answer), RunConfig::new(&session))
                    .await?;
            }
        }
    }
}

fn prompt(payload: &Value) -> anyhow::Result<String> {
    let message = payload
        .get("prompt")
        .and_then(Value::as_str)
        .unwrap_or("input required");
    print!("{message} > ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn one(key: &str, value: Value) -> PartialUpdate {
    let mut update = PartialUpdate::new();
    update.insert(key.to_string(), value);
    update
}

/// Query analysis, approval gate that suspends, then execute or reject.
fn approval_graph() -> anyhow::Result<lattice_rs::CompiledGraph> {
    let schema = StateSchema::new()
        .field("messages", Reducer::Append)
        .field("query", Reducer::Overwrite)
        .field("selected_tool", Reducer::Overwrite)
        .field("result", Reducer::Overwrite);

    let mut builder = GraphBuilder::new(schema);

    builder.add_node(
        "analyze",
        FnNode::shared("analyze", |state, _| {
            let query = state.get("query").and_then(Value::as_str).unwrap_or("");
            let tool = if query.contains("weather") {
                "weather_api"
            } else if query.contains("news") {
                "news_api"
            } else {
                "general_search"
            };
            let mut update = one("selected_tool", json!(tool));
            update.insert("messages".to_string(), json!([format!("selected {tool}")]));
            Ok(NodeOutput::Update(update))
        }),
    )?;

    builder.add_node(
        "approval",
        FnNode::shared("approval", |state, ctx| {
            let tool = state
                .get("selected_tool")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            match ctx.resume().and_then(Value::as_str) {
                None => Ok(NodeOutput::suspend(json!({
                    "prompt": format!("run '{tool}'? (yes/no)"),
                    "tool": tool,
                }))),
                Some("yes") => Ok(NodeOutput::goto_with(
                    one("messages", json!(["approved"])),
                    "execute",
                )),
                Some(_) => Ok(NodeOutput::goto_with(
                    one("messages", json!(["denied"])),
                    "reject",
                )),
            }
        }),
    )?;

    builder.add_node(
        "execute",
        FnNode::shared("execute", |state, _| {
            let tool = state
                .get("selected_tool")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            Ok(NodeOutput::Update(one(
                "result",
                json!(format!("{tool} executed")),
            )))
        }),
    )?;

    builder.add_node(
        "reject",
        FnNode::shared("reject", |_, _| {
            Ok(NodeOutput::Update(one("result", json!("rejected by user"))))
        }),
    )?;

    builder
        .add_edge("analyze", "approval")
        .add_edge("execute", END)
        .add_edge("reject", END)
        .set_entry("analyze");

    Ok(builder.compile()?)
}

/// One node that collects several inputs by suspending once per missing
/// field; each re-invocation checks state and requests the next one.
fn form_graph() -> anyhow::Result<lattice_rs::CompiledGraph> {
    let schema = StateSchema::new()
        .field("name", Reducer::Overwrite)
        .field("age", Reducer::Overwrite)
        .field("email", Reducer::Overwrite)
        .field("summary", Reducer::Overwrite);

    let mut builder = GraphBuilder::new(schema);

    builder.add_node(
        "intake",
        FnNode::shared("intake", |state, ctx| {
            let missing = ["name", "age", "email"]
                .into_iter()
                .find(|field| !state.contains(field));

            match (missing, ctx.resume()) {
                (Some(field), Some(value)) => {
                    Ok(NodeOutput::goto_with(one(field, value.clone()), "intake"))
                }
                (Some(field), None) => Ok(NodeOutput::suspend(json!({
                    "prompt": format!("enter {field}"),
                    "field": field,
                }))),
                (None, _) => {
                    let summary = format!(
                        "{} ({}) <{}>",
                        state.get("name").and_then(Value::as_str).unwrap_or(""),
                        state.get("age").and_then(Value::as_str).unwrap_or(""),
                        state.get("email").and_then(Value::as_str).unwrap_or(""),
                    );
                    Ok(NodeOutput::Update(one("summary", json!(summary))))
                }
            }
        }),
    )?;

    builder.add_edge("intake", END).set_entry("intake");

    Ok(builder.compile()?)
}
