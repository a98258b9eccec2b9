//! Command line chat client for a running gateway.
//!
//! ```bash
//! gemini-chat send "Describe this picture" --file cat.png
//! gemini-chat history
//! gemini-chat clear
//! ```

use anyhow::bail;
use clap::{Parser, Subcommand};
use gemini_gateway::client::{ChatClient, load_upload};
use gemini_gateway::transcript::{AttachmentRef, ChatEntry, JsonFileTranscript, Sender, TranscriptStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Recorded as the bot's reply when the gateway answers without output
const NO_RESPONSE: &str = "Server did not respond, try again.";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gateway root URL
    #[arg(long, env = "GEMINI_CHAT_SERVER", default_value = "http://localhost:5000")]
    server: Url,

    /// Transcript file
    #[arg(long, env = "GEMINI_CHAT_HISTORY", default_value = "gemini-chat-history.json")]
    history: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a prompt, optionally with an image, document or audio file
    Send {
        prompt: String,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print the conversation so far
    History,
    /// Forget the conversation
    Clear,
}

async fn send(client: &ChatClient, transcript: &dyn TranscriptStore, prompt: String, file: Option<PathBuf>) -> anyhow::Result<()> {
    let prompt = prompt.trim().to_string();
    if prompt.is_empty() {
        bail!("Message cannot be empty");
    }

    let upload = match file {
        Some(path) => Some(load_upload(&path).await?),
        None => None,
    };
    let attachment = upload.as_ref().map(|upload| AttachmentRef {
        media_type: upload.media_type.clone(),
        file_name: upload.file_name.clone().unwrap_or_default(),
    });
    transcript.append(ChatEntry::user(prompt.clone(), attachment)).await?;

    let reply = match client.send(&prompt, upload).await {
        Ok(envelope) => {
            if let Some(error) = &envelope.error {
                eprintln!("gateway: {error}");
            }
            envelope.output.unwrap_or_else(|| NO_RESPONSE.to_string())
        }
        Err(e) => format!("Error: {e:#}"),
    };

    println!("{reply}");
    transcript.append(ChatEntry::bot(reply)).await?;
    Ok(())
}

async fn history(transcript: &dyn TranscriptStore) -> anyhow::Result<()> {
    for entry in transcript.load_all().await? {
        let who = match entry.sender {
            Sender::User => "you",
            Sender::Bot => "bot",
        };
        let time = entry.timestamp.with_timezone(&chrono::Local).format("%H:%M");
        match entry.attachment {
            Some(attachment) => println!("[{time}] {who}: {} ({})", entry.text, attachment.file_name),
            None => println!("[{time}] {who}: {}", entry.text),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let transcript = JsonFileTranscript::new(args.history);

    match args.command {
        Command::Send { prompt, file } => {
            let client = ChatClient::new(args.server)?;
            send(&client, &transcript, prompt, file).await
        }
        Command::History => history(&transcript).await,
        Command::Clear => transcript.clear().await,
    }
}
