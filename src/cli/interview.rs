//! CLI `interview` command: run (or resume) an interview in the terminal.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

use tessera::config::TesseraConfig;
use tessera::interview::conductor::NextStep;
use tessera::interview::session::SessionTurn;
use tessera::interview::types::{BranchDecision, BranchQuestion, InterviewOutput};

use crate::server::setup_shared_state;

type Input = Lines<BufReader<Stdin>>;

pub async fn interview(config: TesseraConfig, resume: Option<&str>) -> Result<()> {
    let state = setup_shared_state(config)?;
    let mut sessions = state.sessions.lock().await;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let (session_id, mut next) = match resume {
        Some(id) => {
            let step = sessions.current_step(id)?;
            println!("Resuming interview {id}\n");
            (id.to_string(), step)
        }
        None => {
            let turn = sessions.start()?;
            println!("Interview {} (Ctrl-D to stop; resume later with --resume)\n", turn.session_id);
            (turn.session_id, turn.next)
        }
    };

    loop {
        let turn: SessionTurn = match next {
            NextStep::Question(question) => {
                println!("{}", question.text);
                if let Some(nudge) = &question.nudge {
                    println!("  ({nudge})");
                }
                let Some(answer) = prompt(&mut input, "> ").await? else {
                    println!("\nPaused. Resume with: tessera interview --resume {session_id}");
                    return Ok(());
                };
                let turn = sessions.answer(&session_id, &answer, None).await?;
                report_facts(&turn);
                turn
            }
            NextStep::BranchDecision { summary, suggested } => {
                if !summary.is_empty() {
                    println!("So far: {summary}\n");
                }
                let Some(decision) = ask_branching(&mut input, &suggested).await? else {
                    println!("\nPaused. Resume with: tessera interview --resume {session_id}");
                    return Ok(());
                };
                sessions.decide_branching(&session_id, decision)?
            }
            NextStep::Completed(output) => {
                print_output(&output);
                return Ok(());
            }
        };

        if let Some(warning) = &turn.warning {
            eprintln!("warning: {warning}");
        }
        next = turn.next;
    }
}

/// Read one line. `None` on end of input.
async fn prompt(input: &mut Input, label: &str) -> Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    input.next_line().await.context("failed to read from stdin")
}

async fn ask_branching(
    input: &mut Input,
    suggested: &[BranchQuestion],
) -> Result<Option<BranchDecision>> {
    println!("Follow-up questions:");
    for (i, q) in suggested.iter().enumerate() {
        println!("  {}. {}", i + 1, q.text);
    }
    println!();

    let Some(reply) = prompt(input, "Answer them? [a]ll, numbers (e.g. 1,3), or [n]o: ").await?
    else {
        return Ok(None);
    };
    Ok(Some(parse_branch_reply(&reply, suggested)))
}

/// `a`/empty = all, `n` = done, otherwise 1-based indices. Unparseable
/// numbers are ignored; if none remain the interview finishes.
fn parse_branch_reply(reply: &str, suggested: &[BranchQuestion]) -> BranchDecision {
    let reply = reply.trim().to_ascii_lowercase();
    match reply.as_str() {
        "" | "a" | "all" | "y" | "yes" => BranchDecision::Continue {
            selected_questions: None,
        },
        "n" | "no" | "done" => BranchDecision::Done,
        _ => {
            let selected: Vec<String> = reply
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter_map(|n| n.parse::<usize>().ok())
                .filter_map(|n| n.checked_sub(1).and_then(|i| suggested.get(i)))
                .map(|q| q.id.clone())
                .collect();
            BranchDecision::Continue {
                selected_questions: Some(selected),
            }
        }
    }
}

fn report_facts(turn: &SessionTurn) {
    if let Some(err) = &turn.extraction_error {
        println!("  (no facts extracted: {err})\n");
        return;
    }
    for fact in &turn.facts {
        println!("  + [{}] {} ({:.1})", fact.category, fact.content, fact.confidence);
    }
    println!();
}

fn print_output(output: &InterviewOutput) {
    let core = &output.identity.core;
    println!("Interview complete");
    println!("{}", "=".repeat(40));
    let rows = [
        ("Name", core.name.as_deref()),
        ("Role", core.role.as_deref()),
        ("Company", core.company.as_deref()),
        ("Location", core.location.as_deref()),
        ("Focus", output.identity.context.focus.as_deref()),
    ];
    for (label, value) in rows {
        if let Some(value) = value {
            println!("  {label:<12} {value}");
        }
    }
    if !output.identity.expertise.technologies.is_empty() {
        println!(
            "  {:<12} {}",
            "Tech",
            output.identity.expertise.technologies.join(", ")
        );
    }
    println!();
    println!(
        "{} questions answered, {} facts saved",
        output.metadata.questions_answered, output.metadata.facts_extracted
    );
}
