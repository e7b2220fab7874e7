use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use coach_chat::coach::{greeting_for, instruction_for, CoachAgent};
use coach_chat::markdown::clean_markdown;
use coach_chat::storage::{self, JsonFileStorage, MemoryStorage, Storage};
use coach_chat::{
    ApiClient, ChatEvent, ClientConfig, Conversation, MessageRole, QuotaDecision,
    StreamingChatClient, ToolType, UsageGate,
};

const HELP: &str = "Commands: /new starts a fresh session, /quit exits.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Logs go to stderr so they don't interleave with the streamed reply
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coach_chat=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let offline = args.iter().any(|a| a == "--offline");
    let tool_type = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(|a| ToolType::from(a.as_str()))
        .unwrap_or_default();

    // ── Configuration & identity ──────────────────────────────────────────────
    let config = ClientConfig::from_env();
    let store: Arc<dyn Storage> = match &config.storage_path {
        Some(path) => Arc::new(JsonFileStorage::open(path)),
        None => Arc::new(MemoryStorage::new()),
    };
    if let (Ok(token), Ok(user_id)) = (std::env::var("COACH_TOKEN"), std::env::var("COACH_USER_ID")) {
        storage::save_login(&*store, &token, &user_id)?;
    }

    let mut convo = Conversation::new(tool_type.clone(), greeting_for(&tool_type), store.clone());

    if offline {
        return run_offline(&config, &mut convo).await;
    }

    // ── Streaming session ────────────────────────────────────────────────────
    let api = ApiClient::new(&config, store.clone())?;
    let gate = UsageGate::new(api.clone());
    let (client, mut events) = StreamingChatClient::websocket(config.clone(), store.clone());

    client
        .connect()
        .await
        .context("Failed to connect to the chat backend (set COACH_USER_ID?)")?;
    convo.restore(&api).await;
    print_history(&convo);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => {}
                    "/quit" => break,
                    "/new" => {
                        convo.reset();
                        print_history(&convo);
                    }
                    text => {
                        if let QuotaDecision::Exhausted { total } = gate.check().await {
                            println!("Today's {total} free conversations are used up.");
                            continue;
                        }
                        match convo.send(&client, text) {
                            Ok(()) => gate.record().await,
                            Err(e) => eprintln!("Send failed: {e}"),
                        }
                    }
                }
            }
            event = events.next() => {
                let Some(event) = event else { break };
                match &event {
                    ChatEvent::Chunk(text) => {
                        print!("{text}");
                        std::io::stdout().flush().ok();
                    }
                    ChatEvent::Done { .. } => println!("\n"),
                    ChatEvent::Error(message) => eprintln!("\n[error] {message}"),
                    ChatEvent::Options(options) => {
                        for option in options {
                            println!("  > {}", option.label);
                        }
                    }
                    ChatEvent::Session { session_id } => info!("Session {session_id}"),
                }
                event.dispatch(&mut convo);
            }
        }
    }

    client.close();
    Ok(())
}

/// Single-shot completions against the local model, without the chat backend.
async fn run_offline(config: &ClientConfig, convo: &mut Conversation) -> anyhow::Result<()> {
    let agent = CoachAgent::new(config)?;
    let instruction = instruction_for(convo.tool_type());
    print_history(convo);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/new" => {
                convo.reset();
                print_history(convo);
                continue;
            }
            _ => {}
        }
        let history = convo.messages().to_vec();
        let text = convo.begin_turn(&line)?.content.clone();
        match agent.reply(&history, &text, Some(instruction)).await {
            Ok(reply) => {
                println!("{}\n", clean_markdown(&reply));
                convo.complete_turn(reply);
            }
            Err(e) => {
                warn!("Coach reply failed: {e}");
                eprintln!("[error] {e}");
                convo.complete_turn(String::new());
            }
        }
    }
    Ok(())
}

fn print_history(convo: &Conversation) {
    for message in convo.messages() {
        let speaker = match message.role {
            MessageRole::User => "you",
            MessageRole::Assistant => "coach",
        };
        println!("[{speaker}] {}\n", clean_markdown(&message.content));
    }
}
