//! Interactive guided session
//!
//! A rustyline REPL around the intent router: free text is analyzed and
//! answered with a ranked list of feature modules; slash commands manage
//! checkpoints and show session status. The loop also drives the
//! autosave clock, so typed goals survive a crash.

use anyhow::Result;
use chrono::TimeZone;
use rustyline::{error::ReadlineError, DefaultEditor};

use crate::models::{ModuleKey, SaveStatus};
use crate::session::Assistant;

pub struct GuideSession {
    assistant: Assistant,
}

impl GuideSession {
    pub fn new(assistant: Assistant) -> Self {
        Self { assistant }
    }

    /// CLI command that serves a routed module.
    fn command_for(module: ModuleKey) -> &'static str {
        match module {
            ModuleKey::LegalDrafter => "dadgar draft",
            ModuleKey::LawyerFinder => "dadgar lawyers find",
            ModuleKey::NotaryFinder => "dadgar notaries",
            ModuleKey::NewsSummarizer => "dadgar news",
            ModuleKey::CaseStrategist => "dadgar plan new",
            ModuleKey::WebAnalyzer => "dadgar analyze",
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("Dadgar guided session");
        println!();
        println!("Describe what you want to accomplish and I will suggest the best tool.");
        println!();
        println!("Commands:");
        println!("  /status           - Show session status");
        println!("  /checkpoint NAME  - Snapshot the current state");
        println!("  /checkpoints      - List checkpoints");
        println!("  /restore ID       - Restore a checkpoint");
        println!("  /delete ID        - Delete a checkpoint");
        println!("  /exit             - Leave the session");
        println!();

        let mut rl = DefaultEditor::new()?;

        loop {
            self.assistant.tick_autosave();

            let prompt = match self.assistant.save_status() {
                SaveStatus::Idle => "dadgar> ".to_string(),
                status => format!("dadgar [{}]> ", status),
            };

            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    if trimmed.starts_with('/') {
                        match self.handle_command(trimmed) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(e) => println!("Error: {}", e),
                        }
                        continue;
                    }

                    if self.assistant.is_quota_exhausted() {
                        println!("API quota exhausted; requests are disabled for this session.");
                        continue;
                    }

                    match self.assistant.route_intent(trimmed).await {
                        Ok(routes) if routes.is_empty() => {
                            println!("No suggestions; try rephrasing your goal.");
                        }
                        Ok(routes) => {
                            println!();
                            for (i, route) in routes.iter().enumerate() {
                                println!(
                                    "  {}. {} ({:.0}% confidence)",
                                    i + 1,
                                    route.module,
                                    route.confidence_percentage
                                );
                                println!("     {}", route.reasoning);
                                println!("     run: {}", Self::command_for(route.module));
                            }
                            println!();
                        }
                        Err(e) => println!("Error: {}", e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Interrupted. Use /exit to quit.");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    println!("Error: {:?}", e);
                    break;
                }
            }
        }

        self.assistant.flush_autosave();
        println!("Session ended.");
        Ok(())
    }

    /// Handle slash commands; returns true when the session should end.
    fn handle_command(&mut self, command: &str) -> Result<bool> {
        let (cmd, rest) = match command.split_once(' ') {
            Some((c, r)) => (c, r.trim()),
            None => (command, ""),
        };

        match cmd {
            "/status" => {
                println!("Saved lawyers: {}", self.assistant.saved_lawyers().len());
                println!("Checkpoints:   {}", self.assistant.checkpoints().list().len());
                println!("Autosave:      {}", self.assistant.save_status());
                println!(
                    "Quota:         {}",
                    if self.assistant.is_quota_exhausted() {
                        "exhausted"
                    } else {
                        "ok"
                    }
                );
                Ok(false)
            }
            "/checkpoint" => {
                match self.assistant.create_checkpoint(rest) {
                    Some(id) => println!("Created checkpoint {}", id),
                    None => println!("Checkpoint needs a name: /checkpoint NAME"),
                }
                Ok(false)
            }
            "/checkpoints" => {
                let list = self.assistant.checkpoints().list();
                if list.is_empty() {
                    println!("No checkpoints created yet.");
                }
                for ckpt in list {
                    let when = chrono::Utc
                        .timestamp_millis_opt(ckpt.timestamp)
                        .single()
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default();
                    println!("  {}  {}  {}", ckpt.id, when, ckpt.name);
                }
                Ok(false)
            }
            "/restore" => {
                if self.assistant.restore_checkpoint(rest) {
                    println!("Restored checkpoint {}", rest);
                } else {
                    println!("No checkpoint with id {}", rest);
                }
                Ok(false)
            }
            "/delete" => {
                if self.assistant.delete_checkpoint(rest) {
                    println!("Deleted checkpoint {}", rest);
                } else {
                    println!("No checkpoint with id {}", rest);
                }
                Ok(false)
            }
            "/exit" | "/quit" => Ok(true),
            _ => {
                println!("Unknown command: {}", cmd);
                println!("Available: /status, /checkpoint, /checkpoints, /restore, /delete, /exit");
                Ok(false)
            }
        }
    }
}
