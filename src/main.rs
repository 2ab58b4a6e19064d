use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use eng_vocab::api::GeminiClient;
use eng_vocab::database::{SqliteBlobStore, export_csv};
use eng_vocab::session::LookupState;
use eng_vocab::{Config, LookupService, RecordStore, SavedWordRecord, Session};

#[derive(Parser)]
#[command(name = "eng-vocab", version, about = "英语单词查询（越南语释义）与本地收藏")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// 日志级别，RUST_LOG 优先
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 查询单词
    Lookup {
        word: String,
        /// 查询成功后保存
        #[arg(short, long)]
        save: bool,
    },
    /// 列出已保存的单词
    List,
    /// 按 ID 删除已保存的单词
    Delete { id: String },
    /// 清空所有已保存的单词
    Clear,
    /// 导出已保存的单词为 CSV
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    eng_vocab::logging::init_tracing(&cli.log_level);

    let config = Config::load(&cli.config)?;
    let backend = SqliteBlobStore::from_config(&config)
        .await
        .context("无法打开本地数据库")?;
    let store = RecordStore::new(backend, config.database.storage_key.clone());

    match cli.command {
        Command::Lookup { word, save } => {
            let client = GeminiClient::new(&config)?;
            let lookup = LookupService::from_config(client, &config);
            let mut session = Session::open(lookup, store).await;

            println!("🔄 查询单词: {}", word.trim());
            match session.search(&word).await {
                LookupState::Found(result) => {
                    println!("📖 {}", result.vietnamese_meaning);
                    println!("🔊 {}", result.pronunciation);
                    println!("💬 {}", result.example_sentence);
                }
                LookupState::Failed(message) => anyhow::bail!("{}", message),
                LookupState::Idle | LookupState::Loading => {}
            }

            if save && session.save_current().await? {
                if let Some(status) = &session.status {
                    println!("💾 {}", status);
                }
                println!("   已保存 {} 个单词", session.saved.len());
            }
        }
        Command::List => {
            let records = store.list_all().await;
            if records.is_empty() {
                println!("⚠️  还没有保存任何单词");
            }
            for record in &records {
                print_record(record);
            }
        }
        Command::Delete { id } => {
            let before = store.list_all().await.len();
            let remaining = store.delete_by_id(&id).await?;
            if remaining.len() == before {
                println!("❌ 未找到ID为 {} 的单词", id);
            } else {
                println!("✅ 已删除，剩余 {} 个单词", remaining.len());
            }
        }
        Command::Clear => {
            store.clear_all().await?;
            println!("✅ 已清空所有保存的单词");
        }
        Command::Export { output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&config.output.words_file));
            let records = store.list_all().await;
            export_csv(&records, &output)?;
            println!("✅ 已导出 {} 个单词：{}", records.len(), output.display());
        }
    }

    Ok(())
}

fn print_record(record: &SavedWordRecord) {
    let saved_at = chrono::DateTime::from_timestamp_millis(record.timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    println!("📝 {} {}  [{}]", record.word, record.pronunciation, saved_at);
    println!("   {}", record.meaning);
    println!("   {}", record.example);
    println!("   ID: {}", record.id);
}
