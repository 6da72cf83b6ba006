use std::io::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use shopcall_engine::{
    AttachmentPipeline, AttachmentUpload, AutoResponder, ContentKind, ConversationStore,
    EngineError, FeedbackControls, FeedbackTracker, content_kind,
};
use shopcall_feed::{DocumentStore, FeedChannel, MemoryBlobStore, MemoryStore};
use shopcall_types::models::{Message, Sender, Vote};
use shopcall_types::rules::ResponseRules;
use shopcall_types::wire::MessageRecord;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopcall=info".into()),
        )
        .init();

    // Config
    let shop_id = std::env::var("SHOPCALL_SHOP_ID").unwrap_or_else(|_| "shop1".into());
    let shop_name = std::env::var("SHOPCALL_SHOP_NAME").unwrap_or_else(|_| "momo商店".into());
    let rules = match std::env::var("SHOPCALL_RULES_PATH") {
        Ok(path) => {
            info!("loading rule tables from {path}");
            ResponseRules::from_json(&std::fs::read_to_string(&path)?)?
        }
        Err(_) => ResponseRules::builtin(),
    };
    let rules = Arc::new(rules);

    // Collaborators: the in-process document and blob stores.
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let channel = FeedChannel::for_shop(store, &shop_id);

    // Seed the welcome banner and quick-reply menu, as the shop console
    // does when a chatroom is created.
    channel
        .append(MessageRecord::shop_menu(format!(
            "歡迎來到{shop_name}！我是你的 AI 小幫手，你可以先從選單了解我們的服務～"
        )))
        .await?;

    let conversation = Arc::new(ConversationStore::new(channel.clone()));
    let dirty = Arc::new(AtomicBool::new(false));
    {
        let dirty = dirty.clone();
        conversation
            .open(move || {
                dirty.store(true, Ordering::SeqCst);
            })
            .await?;
    }

    let responder = AutoResponder::new(channel.clone(), rules.clone());
    let feedback = FeedbackTracker::new(conversation.clone(), channel.clone());
    let attachments = AttachmentPipeline::new(channel, blobs);

    println!("shopcall :: {shop_name} ({shop_id})");
    println!("指令：/menu  /q <選項>  /attach <路徑>  /useful <編號>  /meh <編號>  /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        render_if_dirty(&conversation, &dirty);
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();

        let outcome = match line.split_once(' ') {
            _ if line == "/quit" => break,
            _ if line == "/menu" => {
                for label in rules.quick_labels() {
                    println!("  [{label}]");
                }
                Ok(())
            }
            Some(("/q", label)) => responder.select_quick_reply(label.trim()).await.map(|_| ()),
            Some(("/attach", path)) => attach_file(&attachments, path.trim()).await,
            Some(("/useful", n)) => vote(&conversation, &feedback, n.trim(), Vote::Useful).await,
            Some(("/meh", n)) => vote(&conversation, &feedback, n.trim(), Vote::NotUseful).await,
            _ if line.is_empty() => Ok(()),
            _ => responder.compose_user_message(&line).await.map(|_| ()),
        };
        if let Err(e) = outcome {
            println!("  ✗ {e}");
        }

        // Give the snapshot pump a beat before re-rendering.
        tokio::time::sleep(Duration::from_millis(30)).await;
        render_if_dirty(&conversation, &dirty);
    }

    conversation.close();
    info!("bye");
    Ok(())
}

async fn attach_file(attachments: &AttachmentPipeline, path: &str) -> Result<(), EngineError> {
    let bytes = std::fs::read(path).map_err(|e| EngineError::UploadFailed {
        name: path.to_string(),
        reason: e.to_string(),
    })?;
    let name = path.rsplit('/').next().unwrap_or(path).to_string();
    let upload = AttachmentUpload::new(&name, declared_media_type(&name), Bytes::from(bytes));
    attachments.attach(upload).await.map(|_| ())
}

/// Declared type comes from the file extension, as a browser would set it.
fn declared_media_type(name: &str) -> String {
    match name.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("jpg") => "image/jpg".into(),
        Some("jpeg") => "image/jpeg".into(),
        Some("png") => "image/png".into(),
        Some("gif") => "image/gif".into(),
        _ => "application/octet-stream".into(),
    }
}

async fn vote(
    conversation: &ConversationStore,
    feedback: &FeedbackTracker,
    index: &str,
    vote: Vote,
) -> Result<(), EngineError> {
    let transcript = conversation.transcript();
    let message = index
        .parse::<usize>()
        .ok()
        .and_then(|n| transcript.get(n))
        .ok_or_else(|| EngineError::NotApplicable(index.to_string()))?;
    feedback.set_feedback(&message.id, vote).await
}

fn render_if_dirty(conversation: &ConversationStore, dirty: &AtomicBool) {
    if !dirty.swap(false, Ordering::SeqCst) {
        return;
    }
    println!();
    for (n, message) in conversation.transcript().iter().enumerate() {
        println!("{}", render_line(n, message));
    }
}

fn render_line(n: usize, message: &Message) -> String {
    let who = match message.sender {
        Sender::Customer => "顧客",
        Sender::Shop => "店家",
    };
    let stamp = message
        .created_at
        .map_or_else(|| "…".to_string(), |t| t.format("%H:%M:%S").to_string());
    let body = match content_kind(&message.content) {
        ContentKind::Image => format!("[圖片] {}", message.content),
        ContentKind::Text => message.content.clone(),
    };

    let controls = FeedbackControls::for_message(message);
    let marks = match (controls.useful, controls.not_useful) {
        _ if !controls.useful && controls.not_useful => "  👎",
        _ if controls.useful && !controls.not_useful => "  👍",
        _ => "",
    };

    format!("{n:>3} {stamp} {who}: {body}{marks}")
}
