pub mod commands;

use crate::cli::commands::Commands;
use crate::config::AppConfig;
use crate::db::{get_connection, service::DbService};

pub async fn run_cli(command: Commands, config_path: String) {
    let config = AppConfig::load(&config_path).expect("Failed to load config");

    match command {
        Commands::Serve => {
            panic!("Serve command should be intercepted by main.rs to boot actix-web");
        }
        Commands::History { session, limit } => {
            let pool = get_connection(&config.database).expect("DB error");
            let conn = pool.lock().unwrap();

            match DbService::list_actions(&conn, &session, limit, 0) {
                Ok(actions) if actions.is_empty() => {
                    println!("No recorded actions for session {}", session);
                }
                Ok(actions) => {
                    for action in actions {
                        println!(
                            "[{}] {}: {}",
                            action.created_at,
                            action.title.unwrap_or_else(|| "(untitled)".to_string()),
                            action.instruction
                        );
                        println!("    {}", action.generated_code.replace('\n', "\n    "));
                    }
                }
                Err(e) => eprintln!("Error: {}", e),
            }
        }
    }
}
