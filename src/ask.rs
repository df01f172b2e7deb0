//! Question answering and feedback commands (`qa ask`, `qa feedback`).

use anyhow::Result;
use qa_harness_core::service::AnswerOutcome;

use crate::app::{build_service, build_service_without_embeddings, LogDelivery};
use crate::config::Config;

pub async fn run_ask(config: &Config, user_id: &str, question: &str, rewrite: bool) -> Result<()> {
    let service = build_service(config, LogDelivery::Inline).await?;

    match service.answer(user_id, question, rewrite).await? {
        AnswerOutcome::Answered(answer) => {
            println!("{}", answer.text);
            println!(
                "\n(matched: \"{}\", similarity {:.3}{})",
                answer.matched_question,
                answer.similarity,
                if answer.was_rewritten { ", rewritten" } else { "" }
            );
        }
        AnswerOutcome::NoMatch => {
            println!("I couldn't find an exact match. Please ask me another question.");
        }
    }
    Ok(())
}

pub async fn run_feedback(config: &Config, user_id: &str, question: &str, rating: i64) -> Result<()> {
    let service = build_service_without_embeddings(config).await?;
    service.submit_feedback(user_id, question, rating).await?;
    println!("Thank you for your feedback!");
    Ok(())
}
