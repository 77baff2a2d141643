use anyhow::{anyhow, Result};
use chrono::Local;
use clap::Parser;
use tracing::info;

mod cli;
mod config;
mod errors;
mod export;
mod log;
mod parse;
mod pipeline;
mod prompt;
mod provider;
mod store;
mod ux;
mod wire;

use cli::{Args, Command};
use config::Config;
use errors::GenerationError;
use pipeline::App;
use store::{FileKvStore, KvStore, MemoryKvStore};
use ux::SessionInput;
use wire::{Idea, Variant};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    log::init(args.debug);

    let cfg = Config::load(&args)?;
    info!(model = %cfg.model, data_dir = %cfg.data_dir.display(), "stockprompt v{}", env!("CARGO_PKG_VERSION"));

    if cfg.ephemeral {
        run(&args.command, &cfg, MemoryKvStore::new()).await
    } else {
        run(&args.command, &cfg, FileKvStore::new(&cfg.data_dir)).await
    }
}

async fn run<S: KvStore + Clone>(command: &Command, cfg: &Config, store: S) -> Result<()> {
    let mut app = App::new(store);
    if cfg.save_response {
        app = app.with_artifacts(cfg.data_dir.clone());
    }

    match command {
        Command::Generate { variant } => {
            let prov = provider::make_provider(cfg)?;
            generate(&mut app, prov.as_ref(), *variant).await.map_err(|e| {
                let message = e.user_message();
                anyhow::Error::new(e).context(message)
            })?;
        }
        Command::Show => ux::show_ideas(app.ideas(), |p| app.is_copied(p)),
        Command::Copy { index } => copy(&mut app, *index)?,
        Command::Export { out_dir, force } => {
            let dir = out_dir.as_ref().unwrap_or(&cfg.export_dir);
            export(&app, dir, *force)?;
        }
        Command::History { clear } => {
            if *clear {
                if ux::confirm(&format!("Forget {} generated titles?", app.history().len())) {
                    app.clear_history();
                    println!("History cleared.");
                }
            } else {
                ux::show_history(app.history());
            }
        }
        Command::Session { variant } => {
            let prov = provider::make_provider(cfg)?;
            session(&mut app, prov.as_ref(), *variant, cfg).await?;
        }
    }
    Ok(())
}

/// Loading, then the new batch. Rendering a failure is left to the caller.
async fn generate<S: KvStore + Clone>(
    app: &mut App<S>,
    prov: &dyn provider::Provider,
    variant: Variant,
) -> Result<Vec<Idea>, GenerationError> {
    let pb = ux::spinner(variant);
    let outcome = app.generate(prov, variant, Local::now().date_naive()).await;
    pb.finish_and_clear();

    if outcome.is_ok() {
        ux::show_ideas(app.ideas(), |p| app.is_copied(p));
    }
    outcome
}

fn copy<S: KvStore + Clone>(app: &mut App<S>, index: usize) -> Result<()> {
    let count = app.ideas().len();
    let idea = app
        .copy(index)
        .ok_or_else(|| anyhow!("no idea #{index} in the current batch ({count} ideas)"))?;
    // stdout carries only the prompt so it can be piped into a clipboard tool
    println!("{}", idea.prompt);
    info!(index, "marked prompt copied");
    Ok(())
}

fn export<S: KvStore + Clone>(app: &App<S>, dir: &std::path::Path, force: bool) -> Result<()> {
    if app.ideas().is_empty() {
        return Err(anyhow!("nothing to export; generate a batch first"));
    }
    if !force && !app.all_copied() {
        let missing = app.ideas().iter().filter(|i| !app.is_copied(&i.prompt)).count();
        return Err(anyhow!(
            "{missing} prompts not copied yet; copy them all or pass --force"
        ));
    }
    let path = export::write_export(dir, app.ideas(), &Local::now())?;
    println!("Saved {}", path.display());
    Ok(())
}

async fn session<S: KvStore + Clone>(
    app: &mut App<S>,
    prov: &dyn provider::Provider,
    variant: Variant,
    cfg: &Config,
) -> Result<()> {
    ux::show_ideas(app.ideas(), |p| app.is_copied(p));
    ux::show_session_help();

    // each command runs to completion before the next line is read
    while let Some(line) = ux::read_session_line() {
        match ux::parse_session_input(&line) {
            SessionInput::Generate => {
                // shown, not fatal: the user simply tries again
                if let Err(e) = generate(app, prov, variant).await {
                    ux::show_error(e.user_message());
                }
            }
            SessionInput::Copy(n) => {
                if let Err(e) = copy(app, n) {
                    ux::show_error(&e.to_string());
                }
            }
            SessionInput::Export => {
                if let Err(e) = export(app, &cfg.export_dir, false) {
                    ux::show_error(&format!("{e:#}"));
                }
            }
            SessionInput::Show => ux::show_ideas(app.ideas(), |p| app.is_copied(p)),
            SessionInput::Help => ux::show_session_help(),
            SessionInput::Quit => break,
            SessionInput::Unknown(s) => ux::show_error(&format!("unknown command: {s}")),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> Config {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        Config {
            api_key: Some("k".into()),
            api_base: format!("http://{addr}"),
            timeout_secs: 2,
            ephemeral: true,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn failed_generate_command_is_an_error() {
        let cfg = unreachable_config();
        let store = MemoryKvStore::new();
        let err = run(&Command::Generate { variant: Variant::Quick }, &cfg, store.clone())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), GenerationError::Transport(String::new()).user_message());
        assert!(matches!(
            err.downcast_ref::<GenerationError>(),
            Some(GenerationError::Transport(_))
        ));
        assert!(App::new(store).history().is_empty());
    }

    struct Canned(&'static str);

    #[async_trait::async_trait]
    impl provider::Provider for Canned {
        async fn generate(&self, _call: &provider::ModelCall) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn generate_helper_hands_the_outcome_to_the_caller() {
        let mut app = App::new(MemoryKvStore::new());

        let ideas = generate(&mut app, &Canned(r#"[{"object":"Lamp","prompt":"A lamp"}]"#), Variant::Quick)
            .await
            .unwrap();
        assert_eq!(ideas[0].object, "Lamp");

        let err = generate(&mut app, &Canned("  "), Variant::Quick).await.unwrap_err();
        assert_eq!(err, GenerationError::Empty);
        assert_eq!(app.ideas().len(), 1);
    }
}
