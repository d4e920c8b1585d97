use anyhow::Result;
use clap::Parser;
use nextact::cli::{Cli, Command, init_logging};
use nextact::clock::{Clock, FixedClock, SystemClock};
use nextact::config::Config;
use nextact::context::StandardContext;
use nextact::controller::TaskController;
use nextact::model::{CompletionAction, RecurrenceRule, Transition};
use nextact::storage::Vault;
use nextact::store::NextAction;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug_enabled());

    let ctx = StandardContext::new(cli.root.clone());
    let config = Config::load_or_default(&ctx)?;
    let clock: Arc<dyn Clock> = match cli.today {
        Some(date) => Arc::new(FixedClock(date)),
        None => Arc::new(SystemClock),
    };

    match cli.command.clone().unwrap_or(Command::List { json: false }) {
        Command::Config { init } => {
            if init {
                config.save(&ctx)?;
                println!("Wrote {}", Config::get_path_string(&ctx)?);
            } else {
                println!("# {}", Config::get_path_string(&ctx)?);
            }
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Next { rule, anchor } => {
            let parsed = RecurrenceRule::parse(&rule)
                .ok_or_else(|| anyhow::anyhow!("Unrecognized recurrence rule '{}'", rule))?;
            let today = if parsed.is_fixed_anchor() {
                clock.today_utc()
            } else {
                clock.today()
            };
            let anchor = anchor.unwrap_or(today);
            match parsed.next_occurrence(anchor, today) {
                Some(next) => println!("{} -> {}", parsed, next.format("%Y-%m-%d")),
                None => println!("{} -> (none)", parsed),
            }
            Ok(())
        }
        command => {
            let root = cli
                .vault
                .clone()
                .or_else(|| config.vault.clone())
                .ok_or_else(|| {
                    anyhow::anyhow!("No vault configured: pass --vault or set `vault` in the config")
                })?;
            let vault = Vault::open(root)?;
            let controller = TaskController::new(Arc::new(vault), config, clock);
            run(&controller, command)
        }
    }
}

fn run(controller: &TaskController, command: Command) -> Result<()> {
    match command {
        Command::List { json } => {
            let actions = controller.next_actions()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&actions)?);
            } else {
                print_actions(controller, &actions);
            }
            Ok(())
        }
        Command::Done { document, task } => {
            complete(controller, &document, &task, CompletionAction::Complete)
        }
        Command::Undo { document, task } => {
            complete(controller, &document, &task, CompletionAction::Undo)
        }
        Command::Config { .. } | Command::Next { .. } => Ok(()),
    }
}

fn print_actions(controller: &TaskController, actions: &[NextAction]) {
    if actions.is_empty() {
        println!("Nothing to do.");
        return;
    }
    let tags = controller.config().priority_tags();
    for action in actions {
        println!(
            "{:<4} {}: {}",
            tags.label(action.priority).unwrap_or("-"),
            action.document.name(),
            action.task_text
        );
    }
}

fn complete(
    controller: &TaskController,
    document: &str,
    task: &str,
    action: CompletionAction,
) -> Result<()> {
    let handle = controller.find_document(document)?;
    // Prefer the exact line the list shows; fall back to matching by text.
    let listed = match action {
        CompletionAction::Complete => controller
            .next_actions()?
            .into_iter()
            .find(|a| a.document == handle && a.task_text == task.trim()),
        CompletionAction::Undo => None,
    };
    let receipt = match listed {
        Some(next) => controller.complete_action(&next, action)?,
        None => controller.complete(&handle, task, action)?,
    };

    match receipt.transition {
        Transition::Unchanged => {
            return Err(anyhow::anyhow!("No matching task for '{}' in {}", task, handle));
        }
        Transition::MarkedDone => println!("Done: {}", task),
        Transition::Reopened => println!("Reopened: {}", task),
        Transition::Advanced(next) => {
            println!("Done: {} (next start {})", task, next.format("%Y-%m-%d"))
        }
    }

    // Nothing watches the vault in a one-shot run; settle our own write.
    if let Some(token) = receipt.token {
        controller.release(token)?;
    }
    Ok(())
}
