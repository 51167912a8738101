use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use conversation_store::{
    BatchMutator, Conversation, PgConversationStore, StoreConfig, WireCodec, init_logger,
};

#[derive(Parser, Debug)]
#[command(
    name = "conversation-admin",
    about = "Inspect and mutate the conversation store"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,

    /// List conversations, most recent first.
    List {
        #[arg(long, default_value_t = 50)]
        limit: i64,

        /// Print JSON instead of one line per conversation.
        #[arg(long)]
        json: bool,
    },

    /// Star conversations in a single batch.
    Star {
        #[arg(required = true)]
        ids: Vec<i64>,

        /// Clear the star instead of setting it.
        #[arg(long)]
        off: bool,
    },

    /// Mark conversations read in a single batch.
    MarkRead {
        #[arg(required = true)]
        ids: Vec<i64>,

        /// Mark unread instead.
        #[arg(long)]
        unread: bool,
    },

    /// Delete conversations in a single batch.
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Write the wire encoding of one conversation to a file.
    Export {
        id: i64,

        #[arg(long)]
        output: PathBuf,
    },

    /// Decode a wire file and print it as JSON.
    Inspect { path: PathBuf },

    /// Show the operations journaled for a batch.
    Batch { sequence: i64 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();

    let args = Args::parse();
    let config = StoreConfig::from_env();
    let codec = WireCodec::from_config(&config);

    match args.command {
        Command::Inspect { path } => {
            let bytes = std::fs::read(&path)?;
            let conversation = codec.decode(&bytes)?;
            println!("{}", serde_json::to_string_pretty(&conversation)?);
        }
        Command::Migrate => {
            let store = PgConversationStore::connect(&config).await?;
            store.run_migrations().await?;
            println!("Migrations applied");
        }
        Command::List { limit, json } => {
            let store = PgConversationStore::connect(&config).await?;
            let conversations = store.list(limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&conversations)?);
            } else {
                for c in &conversations {
                    println!(
                        "{:>8}  {}{}  {:<40}  {}",
                        c.id,
                        if c.read { ' ' } else { '*' },
                        if c.starred { '+' } else { ' ' },
                        c.subject,
                        c.senders
                    );
                }
            }
        }
        Command::Star { ids, off } => {
            let store = PgConversationStore::connect(&config).await?;
            let conversations = load_all(&store, &ids).await?;
            let mutator = BatchMutator::new(store.clone());
            let sequence = mutator.update_boolean(&conversations, "starred", !off).await?;
            println!("Applied batch {sequence} ({} conversations)", conversations.len());
        }
        Command::MarkRead { ids, unread } => {
            let store = PgConversationStore::connect(&config).await?;
            let conversations = load_all(&store, &ids).await?;
            let mutator = BatchMutator::new(store.clone());
            let sequence = mutator.update_boolean(&conversations, "read", !unread).await?;
            println!("Applied batch {sequence} ({} conversations)", conversations.len());
        }
        Command::Delete { ids } => {
            let store = PgConversationStore::connect(&config).await?;
            let conversations = load_all(&store, &ids).await?;
            let mutator = BatchMutator::new(store.clone());
            let sequence = mutator.delete(&conversations).await?;
            println!("Applied batch {sequence} ({} conversations)", conversations.len());
        }
        Command::Export { id, output } => {
            let store = PgConversationStore::connect(&config).await?;
            let Some(conversation) = store.get(id).await? else {
                writeln!(io::stderr(), "error: no conversation with id {id}")?;
                std::process::exit(1);
            };
            let bytes = codec.encode(&conversation)?;
            std::fs::write(&output, &bytes)?;
            println!("Wrote {} bytes to {}", bytes.len(), output.display());
        }
        Command::Batch { sequence } => {
            let store = PgConversationStore::connect(&config).await?;
            let operations = store.batch_operations(sequence).await?;
            if operations.is_empty() {
                println!("No operations journaled for batch {sequence}");
            }
            for op in &operations {
                println!(
                    "{:>4}  {:<6}  {:>8}  {}",
                    op.ordinal,
                    op.kind,
                    op.conversation_id,
                    match (&op.column_name, &op.new_value) {
                        (Some(column), Some(value)) => format!("{column} = {value}"),
                        _ => String::new(),
                    }
                );
            }
        }
    }

    Ok(())
}

/// Fetch every id, failing on the first one that does not exist.
async fn load_all(
    store: &PgConversationStore,
    ids: &[i64],
) -> Result<Vec<Conversation>, Box<dyn std::error::Error>> {
    let mut conversations = Vec::with_capacity(ids.len());
    for &id in ids {
        match store.get(id).await? {
            Some(conversation) => conversations.push(conversation),
            None => {
                writeln!(io::stderr(), "error: no conversation with id {id}")?;
                std::process::exit(1);
            }
        }
    }
    Ok(conversations)
}
