//! Knowledge base administration commands (`qa add|remove|list|clear`).
//!
//! The local CLI acts as the admin principal.

use anyhow::{bail, Result};

use crate::app::{build_service, build_service_without_embeddings, LogDelivery};
use crate::auth::local_operator;
use crate::config::Config;

/// Split a combined `"question - answer"` string.
pub fn split_entry(entry: &str) -> Option<(String, String)> {
    let (q, a) = entry.split_once(" - ")?;
    let (q, a) = (q.trim(), a.trim());
    if q.is_empty() || a.is_empty() {
        return None;
    }
    Some((q.to_string(), a.to_string()))
}

pub async fn run_add(config: &Config, question: &str, answer: Option<&str>) -> Result<()> {
    let (question, answer) = match answer {
        Some(a) => (question.trim().to_string(), a.trim().to_string()),
        None => match split_entry(question) {
            Some(pair) => pair,
            None => bail!("Please use the format: qa add \"question - answer\" (or pass the answer as a second argument)"),
        },
    };

    let service = build_service(config, LogDelivery::Inline).await?;
    service.add(&local_operator(), &question, &answer).await?;
    println!("New entry added to the knowledge base.");
    Ok(())
}

pub async fn run_remove(config: &Config, question: &str) -> Result<()> {
    let service = build_service_without_embeddings(config).await?;
    if service.remove(&local_operator(), question).await? {
        println!("Entry removed from the knowledge base.");
    } else {
        println!("Entry not found.");
    }
    Ok(())
}

pub async fn run_list(config: &Config) -> Result<()> {
    let service = build_service_without_embeddings(config).await?;
    let pairs = service.list(&local_operator()).await?;

    if pairs.is_empty() {
        println!("Knowledge base is empty.");
        return Ok(());
    }

    let formatted: Vec<String> = pairs
        .iter()
        .map(|p| format!("Q: {}\nA: {}", p.question, p.answer))
        .collect();
    println!("{}", formatted.join("\n\n"));
    Ok(())
}

pub async fn run_clear(config: &Config) -> Result<()> {
    let service = build_service_without_embeddings(config).await?;
    let removed = service.clear(&local_operator()).await?;
    println!("Knowledge base has been cleared ({} entries removed).", removed);
    Ok(())
}
