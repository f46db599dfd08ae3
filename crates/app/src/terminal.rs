//! Terminal front-end: the same Process and Ask actions over a folder of PDFs.

use anyhow::Context;
use pdf_chat_core::{load_pdf_folder, ChatSession, Pipeline};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

pub async fn run_chat(pipeline: Arc<Pipeline>, folder: &Path) -> anyhow::Result<()> {
    let documents = load_pdf_folder(folder)
        .with_context(|| format!("failed to load pdfs from {}", folder.display()))?;

    let mut session = ChatSession::new(pipeline);
    let summary = session
        .process(&documents)
        .await
        .context("failed to process documents")?
        .clone();
    crate::log_process_summary(&summary);
    println!(
        "processed {} document(s): pages={} chunks={}",
        summary.documents.len(),
        summary.page_count,
        summary.chunk_count
    );
    println!("ask a question about your documents (exit to quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if matches!(question, "exit" | "quit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match session.ask(question).await {
            Ok(answer) => {
                if answer.standalone_question != question {
                    println!("  (searched for: {})", answer.standalone_question);
                }
                println!("{}", answer.text);
                for source in &answer.sources {
                    println!("  chunk={} score={:.4}", source.chunk.position, source.score);
                }
            }
            Err(error) => {
                warn!(kind = error.kind(), %error, "question failed");
                eprintln!("error: {error}");
            }
        }
    }

    Ok(())
}

pub fn run_inspect(pipeline: &Pipeline, folder: &Path) -> anyhow::Result<()> {
    let documents = load_pdf_folder(folder)
        .with_context(|| format!("failed to load pdfs from {}", folder.display()))?;
    let (chunks, report) = pipeline
        .chunk_documents(&documents)
        .context("failed to chunk documents")?;

    for document in &report.documents {
        println!(
            "document={} pages={} checksum={}",
            document.document_title, document.page_count, document.checksum
        );
    }
    for skipped in &report.skipped_pages {
        println!(
            "skipped: document={} page={} reason={}",
            skipped.document_title, skipped.page, skipped.reason
        );
    }

    let options = pipeline.ingestion_options();
    println!(
        "{} chunk(s) size={} overlap={}",
        chunks.len(),
        options.chunk_size,
        options.chunk_overlap
    );
    for chunk in &chunks {
        println!(
            "[{}] id={} start={} chars={}",
            chunk.position,
            chunk.chunk_id,
            chunk.start,
            chunk.text.chars().count()
        );
        println!("  {}", chunk.text.replace('\n', " "));
    }

    Ok(())
}
