use clap::Parser;
use notekeeper::cli::{
    handle_init, handle_list, handle_serve, handle_user_add, Cli, Commands, UserAction,
};

fn main() {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Init { db } => handle_init(config, db),
        Commands::User(user_cmd) => match user_cmd.action {
            UserAction::Add {
                username,
                password,
                db,
            } => handle_user_add(config, username, password, db),
        },
        Commands::List { username, db, json } => handle_list(config, username, db, json),
        Commands::Serve { addr, db } => handle_serve(config, addr, db),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
