use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::time::Duration;

use crate::wire::{Idea, Variant};

/// Loading state. Drawn on stderr, cleared with `finish_and_clear`.
pub fn spinner(variant: Variant) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
        pb.set_style(style);
    }
    pb.set_message(format!(
        "Generating {} {} ideas...",
        variant.idea_count(),
        variant.name()
    ));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

pub fn show_welcome() {
    println!("\n{}", "Stock Idea Generator".bold());
    println!("Generate commercially valuable, compliance-safe object ideas with ready-to-use image prompts.");
    println!("Run {} to get started.\n", "stockprompt generate".cyan());
}

pub fn show_error(message: &str) {
    eprintln!("\n{} {}\n", "Error:".red().bold(), message);
}

pub fn format_idea(index: usize, idea: &Idea, copied: bool) -> String {
    let marker = if copied {
        "[copied]".green().bold().to_string()
    } else {
        "[ ]".dimmed().to_string()
    };
    let mut out = format!("{:>2}. {} {}\n    {}", index + 1, marker, idea.object.bold(), idea.prompt);
    if !idea.keywords.is_empty() {
        out.push_str(&format!("\n    {} {}", "keywords:".dimmed(), idea.keywords.join(", ")));
    }
    out
}

/// Result list, or the welcome screen when there is nothing to show.
pub fn show_ideas(ideas: &[Idea], is_copied: impl Fn(&str) -> bool) {
    if ideas.is_empty() {
        show_welcome();
        return;
    }
    let copied = ideas.iter().filter(|i| is_copied(&i.prompt)).count();
    println!(
        "\n{}  {}",
        format!("=== {} IDEAS ===", ideas.len()).bold(),
        format!("{copied}/{} copied", ideas.len()).dimmed()
    );
    for (i, idea) in ideas.iter().enumerate() {
        println!("{}\n", format_idea(i, idea, is_copied(&idea.prompt)));
    }
    if copied == ideas.len() {
        println!("{} run {} to download the CSV.\n", "All prompts copied:".green().bold(), "stockprompt export".cyan());
    }
}

pub fn show_history(labels: &BTreeSet<String>) {
    if labels.is_empty() {
        println!("(no ideas generated yet)");
        return;
    }
    println!("{}", format!("{} previously generated titles:", labels.len()).bold());
    for l in labels {
        println!(" - {l}");
    }
}

pub fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    let _ = io::stdout().flush();
    let mut s = String::new();
    if io::stdin().read_line(&mut s).is_ok() {
        let ans = s.trim().to_lowercase();
        ans == "y" || ans == "yes"
    } else {
        false
    }
}

/// A line typed at the interactive session prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Generate,
    Copy(usize),
    Export,
    Show,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_session_input(line: &str) -> SessionInput {
    let mut words = line.split_whitespace();
    let head = words.next().unwrap_or("").to_lowercase();
    match head.as_str() {
        "g" | "generate" => SessionInput::Generate,
        "c" | "copy" => match words.next().and_then(|n| n.parse().ok()) {
            Some(n) => SessionInput::Copy(n),
            None => SessionInput::Unknown(line.trim().to_string()),
        },
        "e" | "export" => SessionInput::Export,
        "s" | "show" | "" => SessionInput::Show,
        "h" | "help" | "?" => SessionInput::Help,
        "q" | "quit" | "exit" => SessionInput::Quit,
        _ => SessionInput::Unknown(line.trim().to_string()),
    }
}

pub fn show_session_help() {
    println!("  g        generate a new batch");
    println!("  c N      print prompt N and mark it copied");
    println!("  e        export the CSV (once every prompt is copied)");
    println!("  s        show the current batch");
    println!("  q        quit");
}

/// `None` on end of input.
pub fn read_session_line() -> Option<String> {
    print!("{} ", ">".cyan().bold());
    let _ = io::stdout().flush();
    let mut s = String::new();
    match io::stdin().read_line(&mut s) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(s),
    }
}
