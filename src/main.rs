use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use tailor_onboarding::api::{FileUpload, MockConfig, MockDraftApi};
use tailor_onboarding::config::WizardConfig;
use tailor_onboarding::onboarding::model::PREDEFINED_SPECIALTIES;
use tailor_onboarding::onboarding::navigation::TERMS_ROUTE;
use tailor_onboarding::onboarding::{
    Autosaver, FileStorage, IdSide, NavigationController, OnboardingManager, StepKey,
};

const HELP: &str = "\
Commands:
  status                    current step, progress and draft
  show [step]               print a step's data (default: current step)
  set <field> <value>       edit a field on the current step (autosaved)
  patch <json>              merge a JSON object into the current step (autosaved)
  next | prev               move one step
  goto <route|number>       jump to a route or step number
  terms                     open the terms and conditions page
  toggle <specialty>        select or deselect a specialty
  custom <specialty>        add a custom specialty
  specialties               list the predefined specialties
  upload <path>...          add portfolio images
  remove-image <n>          remove the n-th portfolio image (1-based)
  id-front <path>           upload the front of the ID document
  id-back <path>            upload the back of the ID document
  validate                  check the current step
  save                      save the current step now
  submit                    submit the application
  resume                    pull the backend draft into the form
  start-over                discard all progress
  help | quit";

struct Wizard {
    manager: Arc<OnboardingManager>,
    autosaver: Autosaver,
    nav: NavigationController,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = WizardConfig::from_env().context("invalid configuration")?;

    let storage = Arc::new(FileStorage::new(&config.data_dir));
    let api = Arc::new(MockDraftApi::new(MockConfig::from(&config)));
    let manager = Arc::new(OnboardingManager::new(
        storage.clone(),
        api,
        config.storage_key.clone(),
    ));
    let resumed = manager.restore().await;

    let wizard = Wizard {
        autosaver: Autosaver::new(manager.clone(), config.autosave_delay),
        nav: NavigationController::new(manager.clone()),
        manager,
    };

    eprintln!("🧵 Tailor Onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Session: {}",
        storage.record_path(&config.storage_key).display()
    );
    eprintln!("   Autosave after: {:?}", config.autosave_delay);
    if resumed {
        eprintln!("   Resuming saved progress.");
    }
    eprintln!("   Type 'help' for commands, 'quit' to exit.\n");
    eprintln!("{}", wizard.nav.header().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }
        match wizard.run(line).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("❌ {:#}", e),
        }
        eprint!("> ");
    }

    Ok(())
}

impl Wizard {
    /// Run one command. Returns `false` when the user asked to quit.
    async fn run(&self, line: &str) -> anyhow::Result<bool> {
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let step = self.manager.current_step_key().await;

        match command {
            "quit" | "exit" => return Ok(false),
            "help" => println!("{HELP}"),
            "status" => self.status().await,
            "show" => {
                let target = if rest.is_empty() { step } else { rest.parse()? };
                let value = self.manager.step_value(target).await;
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            "set" => {
                let (field, raw) = rest
                    .split_once(' ')
                    .context("usage: set <field> <value>")?;
                let patch = self
                    .manager
                    .snapshot()
                    .await
                    .form_data()
                    .field_patch(step, field, raw.trim())?;
                self.edit(step, &patch).await?;
            }
            "patch" => {
                let partial: Value =
                    serde_json::from_str(rest).context("patch expects a JSON object")?;
                self.edit(step, &partial).await?;
            }
            "next" => {
                println!("→ {}", self.nav.next().await);
                println!("{}", self.nav.header().await);
            }
            "prev" => {
                println!("← {}", self.nav.prev().await);
                println!("{}", self.nav.header().await);
            }
            "goto" => {
                let route = match rest.parse::<u8>() {
                    Ok(n) => StepKey::from_number(n)
                        .map(StepKey::route)
                        .with_context(|| format!("no step {n}"))?,
                    Err(_) => rest,
                };
                println!("→ {}", self.nav.navigate_to(route).await);
                println!("{}", self.nav.header().await);
            }
            "terms" => {
                self.nav.navigate_to(TERMS_ROUTE).await;
                println!("Terms and conditions: {TERMS_ROUTE}");
            }
            "specialties" => println!("{}", PREDEFINED_SPECIALTIES.join(", ")),
            "toggle" => {
                let name = rest.to_string();
                let changed = self
                    .manager
                    .edit_form_data(|data| data.specialties.toggle(&name))
                    .await;
                if !changed {
                    bail!("usage: toggle <specialty>");
                }
                self.autosaver.schedule(StepKey::Specialties);
                self.print_specialties().await;
            }
            "custom" => {
                let name = rest.to_string();
                let added = self
                    .manager
                    .edit_form_data(|data| data.specialties.add_custom(&name))
                    .await;
                if !added {
                    bail!("'{rest}' is empty or already selected");
                }
                self.autosaver.schedule(StepKey::Specialties);
                self.print_specialties().await;
            }
            "upload" => {
                let mut files = Vec::new();
                for path in rest.split_whitespace() {
                    files.push(read_file(path).await?);
                }
                let report = self.manager.upload_portfolio_images(files).await?;
                for asset in &report.uploaded {
                    println!("✅ {}", asset.name);
                }
                for rejected in &report.rejected {
                    println!("⚠️  {}", rejected);
                }
                for failed in &report.failed {
                    println!("❌ {}: {}", failed.name, failed.message);
                }
                self.autosaver.schedule(StepKey::Portfolio);
            }
            "remove-image" => {
                let index: usize = rest.parse().context("usage: remove-image <n>")?;
                let images = self
                    .manager
                    .snapshot()
                    .await
                    .form_data()
                    .portfolio
                    .portfolio_images
                    .clone();
                let asset = index
                    .checked_sub(1)
                    .and_then(|i| images.get(i))
                    .with_context(|| format!("no image {index}"))?;
                self.manager.remove_portfolio_image(asset).await;
                self.autosaver.schedule(StepKey::Portfolio);
                println!("Removed {}", asset.name);
            }
            "id-front" | "id-back" => {
                let side = if command == "id-front" {
                    IdSide::Front
                } else {
                    IdSide::Back
                };
                let asset = self
                    .manager
                    .upload_id_image(side, read_file(rest).await?)
                    .await?;
                self.autosaver.schedule(StepKey::Identity);
                println!("✅ {}", asset.url);
            }
            "validate" => match self.manager.validate_step(step).await {
                Ok(()) => println!("✅ {} is complete", step.label()),
                Err(e) => {
                    for error in &e.errors {
                        println!("   {}: {}", error.field, error.message);
                    }
                }
            },
            "save" => {
                let saved = self.manager.save_step(step).await?;
                println!("💾 Saved {} to {}", step.label(), saved.id);
            }
            "submit" => {
                let receipt = self.manager.submit().await?;
                println!("🎉 {}", receipt.message);
                println!("   Application id: {}", receipt.id);
            }
            "resume" => {
                let merged = self.manager.pull_draft().await?;
                if merged.is_empty() {
                    println!("No draft to resume.");
                } else {
                    println!("Pulled {} steps from the draft.", merged.len());
                }
            }
            "start-over" => {
                self.manager.start_over().await;
                println!("Starting fresh.");
                println!("{}", self.nav.header().await);
            }
            other => bail!("unknown command '{other}', try 'help'"),
        }
        Ok(true)
    }

    async fn edit(&self, step: StepKey, partial: &Value) -> anyhow::Result<()> {
        // The save runs in the background; its outcome is logged.
        let _pending = self.autosaver.field_changed(step, partial).await?;
        Ok(())
    }

    async fn status(&self) {
        let session = self.manager.snapshot().await;
        println!("{}", self.nav.header().await);
        println!("   Route: {}", self.nav.current_route().await);
        println!("   Progress: {:.0}%", session.progress());
        println!(
            "   Draft: {}",
            session.draft_id().unwrap_or("(not created yet)")
        );
        if session.is_saving() {
            println!("   Saving…");
        }
        let key = session.current_step_key();
        if let Some(at) = session.last_saved(key) {
            println!("   Last saved: {}", at.format("%H:%M:%S"));
        }
        if let Some(receipt) = self.manager.last_submission().await {
            println!("   Submitted as {}", receipt.id);
        }
    }

    async fn print_specialties(&self) {
        let selected = self
            .manager
            .snapshot()
            .await
            .form_data()
            .specialties
            .specialties
            .clone();
        println!("Selected: {}", selected.join(", "));
    }
}

async fn read_file(path: &str) -> anyhow::Result<FileUpload> {
    if path.is_empty() {
        bail!("expected a file path");
    }
    FileUpload::from_path(Path::new(path))
        .await
        .with_context(|| format!("failed to read {path}"))
}
