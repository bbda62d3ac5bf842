//! Interactive chat session

use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::context::RunContext;
use crate::executor::ToolExecutor;
use crate::handler::TurnHandler;
use crate::narrator::narrate;

/// Result of a slash command
#[derive(Debug, PartialEq, Eq)]
enum SlashResult {
    Continue,
    Quit,
}

/// One conversation driven from the terminal
pub struct ChatSession {
    handler: TurnHandler,
    ctx: RunContext,
    executor: Arc<dyn ToolExecutor>,
}

impl ChatSession {
    pub fn new(handler: TurnHandler, executor: Arc<dyn ToolExecutor>) -> Self {
        debug!("ChatSession::new: called");
        Self {
            handler,
            ctx: RunContext::with_executor(executor.clone()),
            executor,
        }
    }

    /// Process one message and return the reply text
    pub fn turn(&mut self, message: &str) -> Result<String> {
        debug!("ChatSession::turn: called");
        let response = self.handler.handle(message, &mut self.ctx, None)?;
        Ok(response.as_str().to_string())
    }

    /// Run the read-eval-print loop until /quit or Ctrl+D
    pub fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let prompt = if self.ctx.has_pending() {
                format!("{} ", "?>".bright_yellow())
            } else {
                format!("{} ", ">".bright_green())
            };

            match rl.readline(&prompt) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input) {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    }

                    match self.turn(input) {
                        Ok(reply) => println!("{}\n", reply),
                        Err(e) => println!("{} {}\n", "!".red(), e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Au revoir !");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "Assistant backlog (exécution simulée)".bright_cyan().bold());
        println!("Tapez {} pour l'aide, {} pour quitter", "/help".yellow(), "/quit".yellow());
        println!();
    }

    fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        let cmd = input.split_whitespace().next().unwrap_or("");
        debug!(%cmd, "ChatSession::handle_slash_command: called");

        match cmd {
            "/help" | "/h" => {
                println!();
                println!("{}", "Commandes :".bright_cyan());
                println!("  {:10} Afficher cette aide", "/help".yellow());
                println!("  {:10} Récapituler les étapes exécutées", "/steps".yellow());
                println!("  {:10} Repartir d'une conversation vide", "/reset".yellow());
                println!("  {:10} Quitter", "/quit".yellow());
                println!();
                SlashResult::Continue
            }
            "/quit" | "/q" | "/exit" => SlashResult::Quit,
            "/steps" => {
                match narrate(&self.ctx.steps) {
                    Ok(text) => println!("{}\n", text),
                    Err(e) => println!("{} {}\n", "!".red(), e),
                }
                SlashResult::Continue
            }
            "/reset" => {
                self.ctx = RunContext::with_executor(self.executor.clone());
                println!("{}", "Conversation réinitialisée.".dimmed());
                SlashResult::Continue
            }
            _ => {
                println!("{} Commande inconnue : {}", "?".yellow(), cmd);
                SlashResult::Continue
            }
        }
    }
}
