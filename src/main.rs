use sidekick::config::Config;
use sidekick::context::ContextBuilder;
use sidekick::db::Database;
use sidekick::intent::IntentClassifier;
use sidekick::llm::OllamaClient;
use std::io::{self, BufRead, Write};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;

    let db = Database::new(&config)?;
    db.execute_init()?;

    let llm = OllamaClient::new(&config);
    let status = llm.status().await;
    if status.available {
        info!(
            "Completion service ready, {} model(s) installed",
            status.models.len()
        );
    } else {
        info!("Completion service unreachable, replies will use fallbacks");
    }

    let builder = ContextBuilder::new(db.clone(), IntentClassifier::default(), &config);
    let user_id = std::env::var("SIDEKICK_USER").unwrap_or_else(|_| "local".to_string());
    info!("Chatting as user {} (empty line exits)", user_id);

    let stdin = io::stdin();
    let mut out = io::stdout();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            break;
        }

        let context = match builder.build_context(&user_id, message, None) {
            Ok(context) => context,
            Err(e) => {
                error!("Could not build context: {}", e);
                continue;
            }
        };

        let result = llm.generate(message, &context, None).await;

        // Persist both sides of the exchange for history replay
        let timestamp = chrono::Utc::now().timestamp();
        db.save_chat_message(&user_id, message, false, timestamp)?;
        db.save_chat_message(&user_id, &result.text, true, timestamp)?;

        println!("{}", result.text);
    }

    Ok(())
}
