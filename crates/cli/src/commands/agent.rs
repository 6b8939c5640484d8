//! `quarry agent`: run tasks from the console.
//!
//! The console messenger prints progress notices and the final summary, and
//! `ask_to_user` blocks on stdin.

use quarry_agent::Runtime;
use quarry_channels::ConsoleMessenger;
use quarry_config::AppConfig;
use std::sync::Arc;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if !config.has_search_credentials() {
        eprintln!("  Note: GOOGLE_API_KEY / GOOGLE_SEARCH_ENGINE_ID not set; the search tool will fail.");
    }

    let runtime = Runtime::from_config(&config)?;
    let console = Arc::new(ConsoleMessenger::stdio());

    if let Some(task) = message {
        if let Err(e) = runtime.runner.run_task(&task, console.clone()).await {
            eprintln!("  [Error] {e}");
            return Err(e.into());
        }
        return Ok(());
    }

    println!();
    println!("  Quarry agent: interactive mode");
    println!("  Provider: {}", config.default_provider);
    println!("  Model:    {}", config.default_model);
    println!("  Type a task and press Enter. Type 'exit' or Ctrl+D to quit.");
    println!();

    while let Some(task) = console.read_task("task > ").await? {
        match runtime.runner.run_task(&task, console.clone()).await {
            Ok(_) => println!(),
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!("  Goodbye!");
    Ok(())
}
