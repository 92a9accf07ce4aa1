//! Novel Translator CLI
//!
//! 子命令: init / translate / reset / glossary / list / status

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use novel_translator::application::ports::{AgentStorePort, ChapterStatusPort, PipelineEvent};
use novel_translator::application::{
    CreateNovelAgent, CreateNovelAgentHandler, GetChapterStatuses, GetChapterStatusesHandler,
    GetGlossary, GetGlossaryHandler, ListNovelAgents, ListNovelAgentsHandler, ResetChapterStatus,
    ResetChapterStatusHandler, TranslateChapter, TranslateChapterHandler,
};
use novel_translator::config::{
    load_config_from_path, print_config, validate_credentials, AppConfig, LogConfig,
};
use novel_translator::infrastructure::{
    create_language_model, EventPublisher, JsonFileAgentStore, JsonFileChapterStatusTracker,
};

#[derive(Debug, Parser)]
#[command(name = "novel-translator", version, about = "English to Russian novel translation agent")]
struct Cli {
    /// 配置文件路径（默认搜索 translator.toml / translator.local.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 创建新的小说 Agent
    Init {
        #[arg(long)]
        title: String,
        #[arg(long)]
        novel_id: Option<String>,
    },
    /// 翻译一章
    Translate {
        #[arg(long)]
        novel_id: String,
        #[arg(long)]
        chapter: u32,
        #[arg(long)]
        input: PathBuf,
        /// 不指定时输出到标准输出
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
    },
    /// 把章节状态重置为 pending
    Reset {
        #[arg(long)]
        novel_id: String,
        #[arg(long)]
        chapter: u32,
    },
    /// 输出术语表提示词
    Glossary {
        #[arg(long)]
        novel_id: String,
        /// 只输出在该文件中出现的条目
        #[arg(long)]
        source: Option<PathBuf>,
    },
    /// 列出所有 Agent
    List,
    /// 列出章节状态
    Status {
        #[arg(long)]
        novel_id: String,
    },
}

fn init_tracing(log: &LogConfig) {
    let log_filter = format!("{},novel_translator={}", log.level, log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 优先级：环境变量 > 配置文件 > 默认值
    let config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config.log);
    print_config(&config);

    let store: Arc<dyn AgentStorePort> =
        Arc::new(JsonFileAgentStore::new(&config.storage.state_dir).await?);
    let tracker = Arc::new(JsonFileChapterStatusTracker::open(&config.storage.state_dir)?);
    let statuses: Arc<dyn ChapterStatusPort> = tracker.clone();

    match cli.command {
        Command::Init { title, novel_id } => {
            let response = CreateNovelAgentHandler::new(store)
                .handle(CreateNovelAgent {
                    novel_id,
                    title,
                    config: Some(config.translation_config()),
                })
                .await?;
            println!("{}", response.novel_id);
        }
        Command::Translate {
            novel_id,
            chapter,
            input,
            output,
            title,
        } => {
            let text = tokio::fs::read_to_string(&input).await?;
            let translation =
                translate(&config, store, statuses, novel_id, chapter, text, title).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, translation).await?;
                    tracing::info!(path = %path.display(), "Translation written");
                }
                None => println!("{}", translation),
            }
        }
        Command::Reset { novel_id, chapter } => {
            let previous = ResetChapterStatusHandler::new(statuses)
                .handle(ResetChapterStatus {
                    novel_id,
                    chapter_number: chapter,
                })
                .await?;
            println!("chapter {}: {} -> pending", chapter, previous);
        }
        Command::Glossary { novel_id, source } => {
            let source_text = match source {
                Some(path) => Some(tokio::fs::read_to_string(path).await?),
                None => None,
            };
            let glossary = GetGlossaryHandler::new(store)
                .handle(GetGlossary {
                    novel_id,
                    source_text,
                })
                .await?;
            tracing::info!(
                version = glossary.version,
                characters = glossary.characters,
                locations = glossary.locations,
                terms = glossary.terms,
                "Glossary loaded"
            );
            println!("{}", glossary.prompt_text);
        }
        Command::List => {
            for agent in ListNovelAgentsHandler::new(store).handle(ListNovelAgents).await? {
                println!(
                    "{}\t{}\tchapters={}\tglossary=v{}\tupdated={}",
                    agent.novel_id,
                    agent.title,
                    agent.chapters_translated,
                    agent.glossary_version,
                    agent.updated_at
                );
            }
        }
        Command::Status { novel_id } => {
            let chapters = GetChapterStatusesHandler::new(statuses)
                .handle(GetChapterStatuses { novel_id })
                .await?;
            for (chapter, status) in chapters {
                println!("{}\t{}", chapter, status);
            }
        }
    }

    tracker.flush()?;
    Ok(())
}

async fn translate(
    config: &AppConfig,
    store: Arc<dyn AgentStorePort>,
    statuses: Arc<dyn ChapterStatusPort>,
    novel_id: String,
    chapter: u32,
    text: String,
    title: Option<String>,
) -> anyhow::Result<String> {
    validate_credentials(&config.llm)?;
    let model = create_language_model(config.llm.provider()?, config.llm.client_config())?;

    let events = EventPublisher::new().arc();
    let mut receiver = events.subscribe_global();
    let progress = tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            log_event(&event);
        }
    });

    let handler = TranslateChapterHandler::new(store, statuses, model, config.pipeline_options())
        .with_event_sink(events.clone());
    let result = handler
        .handle(TranslateChapter {
            novel_id,
            chapter_number: chapter,
            text,
            title,
        })
        .await;

    // 发送端全部释放后 progress 任务自然结束
    drop(handler);
    drop(events);
    let _ = progress.await;

    let outcome = result?;
    tracing::info!(
        chapter = outcome.chapter_number,
        final_stage = %outcome.final_stage,
        total_tokens = outcome.total_tokens,
        duration_ms = outcome.total_duration_ms,
        "Chapter translated"
    );
    Ok(outcome.final_translation)
}

fn log_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::StageFinished {
            chapter,
            stage,
            success,
            skipped,
            tokens_used,
            duration_ms,
            error,
            ..
        } => tracing::info!(
            chapter,
            stage = %stage,
            success,
            skipped,
            tokens_used,
            duration_ms,
            error = error.as_deref().unwrap_or(""),
            "Stage finished"
        ),
        PipelineEvent::ChapterFailed { chapter, error, .. } => {
            tracing::error!(chapter, error = %error, "Chapter failed")
        }
        other => tracing::debug!(event = ?other, "Pipeline event"),
    }
}
