//! `tabsplit split` — parse a receipt photo and split it from the
//! terminal, either one-shot (`--command`) or interactively.

use std::path::{Path, PathBuf};

use tokio::io::AsyncBufReadExt;

use tabsplit_config::AppConfig;
use tabsplit_core::extract::ReceiptImage;
use tabsplit_core::receipt::ReceiptData;
use tabsplit_core::settle::Settlement;
use tabsplit_session::{AuditOutcome, BillSession, SharedSession};

pub async fn run(
    image_path: PathBuf,
    commands: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        super::serve::print_api_key_help();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let services = tabsplit_providers::build_from_config(&config)?;
    let session = SharedSession::new(BillSession::new(
        services.extractor,
        services.interpreter,
        services.auditor,
    ));

    let bytes = std::fs::read(&image_path)
        .map_err(|e| format!("Failed to read {}: {e}", image_path.display()))?;
    let image = ReceiptImage::new(bytes, mime_of(&image_path));

    eprint!("  Reading receipt...");
    let receipt = session.load_receipt(&image).await?;
    eprint!("\r                   \r");

    println!();
    println!(
        "  Parsed {} item(s) — {}{:.2} total",
        receipt.items.len(),
        receipt.currency,
        receipt.total
    );
    for item in &receipt.items {
        println!(
            "    [{}] {} ({}{:.2})",
            item.id, item.name, receipt.currency, item.price
        );
    }

    if commands.is_empty() {
        interactive(&session, &receipt).await
    } else {
        for text in commands {
            println!();
            println!("  You > {text}");
            let outcome = session.handle_command(&text).await?;
            println!("  Assistant > {}", outcome.reply);
        }
        let settlement = session.settlement().await?;
        print_settlement(&receipt, &settlement);
        Ok(())
    }
}

async fn interactive(
    session: &SharedSession,
    receipt: &ReceiptData,
) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("  Tell me who had what — e.g. \"the burger was Tom's\" or");
    println!("  \"split the fries between everyone\".");
    println!("  'audit' reviews the split, 'exit' quits.");
    println!();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    prompt();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        match text {
            "" => {}
            "exit" | "quit" => break,
            "audit" => {
                eprint!("  Reviewing...");
                let outcome = session.audit().await?;
                eprint!("\r             \r");
                match outcome {
                    AuditOutcome::Report(report) => {
                        println!();
                        for line in report.lines() {
                            println!("  {line}");
                        }
                        println!();
                    }
                    AuditOutcome::Stale => {
                        println!("  (the bill changed while the audit was running)");
                    }
                }
            }
            _ => match session.handle_command(text).await {
                Ok(outcome) => {
                    println!("  Assistant > {}", outcome.reply);
                    print_settlement(receipt, &outcome.settlement);
                }
                Err(e) => {
                    eprintln!("  [Error] {e}");
                }
            },
        }
        prompt();
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

fn prompt() {
    use std::io::Write;
    print!("  You > ");
    let _ = std::io::stdout().flush();
}

fn print_settlement(receipt: &ReceiptData, settlement: &Settlement) {
    let cur = &receipt.currency;
    println!();
    for person in &settlement.people {
        println!(
            "  {:<12} subtotal {cur}{:>7.2}   tax {cur}{:>6.2}   tip {cur}{:>6.2}   total {cur}{:>7.2}",
            person.name, person.subtotal, person.tax, person.tip, person.total
        );
        let items: Vec<&str> = person.items.iter().map(|i| i.name.as_str()).collect();
        println!("  {:<12} {}", "", items.join(", "));
    }
    if !settlement.unassigned.is_empty() {
        println!("  Unassigned:");
        for item in &settlement.unassigned {
            println!("    - {} ({cur}{:.2})", item.name, item.price);
        }
    }
    println!(
        "  Assigned {cur}{:.2} of receipt total {cur}{:.2}",
        settlement.assigned_total, receipt.total
    );
    println!();
}

fn mime_of(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}
