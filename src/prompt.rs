//! Terminal front for the question client (`docdrop ask`).
//!
//! One-shot mode asks a single question. Interactive mode reads one question
//! per line; a new line supersedes the request still in flight, whose task is
//! aborted and whose result, if it races in, is discarded by [`AskSession`].

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ask::{AskClient, AskError};
use crate::config::Config;
use crate::session::{AskSession, Submission};

type Outcome = (Submission, Result<Option<String>, AskError>);

/// Runs `docdrop ask`.
pub async fn run_ask(config: &Config, question: Option<String>) -> Result<()> {
    let client = Arc::new(AskClient::from_config(&config.ask)?);
    if client.is_placeholder() {
        tracing::info!("no ask endpoint configured; answering with placeholders");
    }

    match question {
        Some(question) => ask_once(&client, question).await,
        None => interactive(client).await,
    }
}

async fn ask_once(client: &AskClient, question: String) -> Result<()> {
    let mut session = AskSession::new();
    session.set_question(question);
    let Some(ticket) = session.submit() else {
        return Ok(());
    };

    let outcome = client.ask(&ticket.question).await;
    session.resolve(&ticket, outcome);

    if let Some(error) = session.error() {
        bail!("{}", error);
    }
    if let Some(answer) = session.answer() {
        println!("{}", answer);
    }
    Ok(())
}

async fn interactive(client: Arc<AskClient>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outcome>();
    let mut session = AskSession::new();
    let mut in_flight: Option<JoinHandle<()>> = None;

    prompt();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                session.set_question(line);
                match session.submit() {
                    Some(ticket) => {
                        if let Some(task) = in_flight.take() {
                            task.abort();
                        }
                        println!("Thinking...");
                        in_flight = Some(spawn_ask(client.clone(), ticket, tx.clone()));
                    }
                    None => prompt(),
                }
            }
            Some((ticket, outcome)) = rx.recv() => {
                if session.resolve(&ticket, outcome) {
                    render(&session);
                    prompt();
                }
            }
        }
    }

    // Input closed: let the last question finish before exiting.
    drop(tx);
    while session.is_loading() {
        match rx.recv().await {
            Some((ticket, outcome)) => {
                if session.resolve(&ticket, outcome) {
                    render(&session);
                }
            }
            None => break,
        }
    }
    Ok(())
}

fn spawn_ask(
    client: Arc<AskClient>,
    ticket: Submission,
    tx: mpsc::UnboundedSender<Outcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = client.ask(&ticket.question).await;
        // The receiver is gone only when the prompt is shutting down.
        let _ = tx.send((ticket, outcome));
    })
}

fn render(session: &AskSession) {
    if let Some(error) = session.error() {
        eprintln!("error: {}", error);
    }
    if let Some(answer) = session.answer() {
        println!("{}", answer);
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
