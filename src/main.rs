// ABOUTME: CLI entrypoint for markbox command
// ABOUTME: Sets up logging, wires stores and client, dispatches commands

use clap::Parser;
use markbox::{
    api::DropboxClient,
    auth::resolve_app_secret,
    cli::{Cli, Commands},
    convert::MarkdownToHtml,
    dispatch::Dispatcher,
    storage::{open_credential_store, open_cursor_store, Paths},
    sync::SyncEngine,
    webhook, AccountId, Credential, Error, Result,
};
use std::io::Read;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("markbox: [E{}] {}", e.exit_code(), e);
        std::process::exit(e.exit_code());
    }
}

fn build_engine(cli: &Cli, paths: &Paths) -> Result<SyncEngine> {
    let credentials = open_credential_store(paths)?;
    let cursors = open_cursor_store(paths)?;
    let client = DropboxClient::new(Some(cli.api_base.clone()), Some(cli.content_base.clone()))?
        .with_recursive(cli.recursive);

    Ok(SyncEngine::new(
        Arc::new(credentials),
        Arc::new(cursors),
        Arc::new(client),
        Arc::new(MarkdownToHtml),
    ))
}

fn open_engine(cli: &Cli) -> Result<Arc<SyncEngine>> {
    let paths = Paths::new(cli.data_dir.clone())?;
    paths.ensure_dirs()?;
    Ok(Arc::new(build_engine(cli, &paths)?))
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Challenge { challenge } => {
            println!("{}", webhook::challenge_response(challenge));
        }
        Commands::Authorize {
            account,
            access_token,
        } => {
            let account = AccountId::new(account.as_str())?;
            let dispatcher = Dispatcher::new(open_engine(&cli)?);
            dispatcher.authorized(account, Credential::new(access_token.as_str()))?;
            dispatcher.wait();
        }
        Commands::Sync { account } => {
            let account = AccountId::new(account.as_str())?;
            let report = open_engine(&cli)?.run(&account)?;
            println!(
                "synced {} ({} pages, {} converted, {} skipped), cursor {}",
                report.account, report.pages, report.converted, report.skipped, report.cursor
            );
        }
        Commands::Webhook {
            signature,
            app_secret,
        } => {
            let secret = resolve_app_secret(app_secret.clone())?;
            let mut body = Vec::new();
            std::io::stdin().read_to_end(&mut body)?;

            let dispatcher = Dispatcher::new(open_engine(&cli)?);
            let count = webhook::handle_webhook(&dispatcher, &secret, &body, signature)?;
            dispatcher.wait();
            println!("processed {} account(s)", count);
        }
        Commands::Status { account } => {
            let account = AccountId::new(account.as_str())?;
            let engine = open_engine(&cli)?;
            let authorized = match engine.credentials().get(&account) {
                Ok(_) => true,
                Err(Error::CredentialNotFound(_)) => false,
                Err(e) => return Err(e),
            };
            let cursor = engine.cursors().get(&account)?;
            println!("account:    {}", account);
            println!("authorized: {}", authorized);
            match cursor {
                Some(c) => println!("cursor:     {}", c),
                None => println!("cursor:     (none, next sync lists everything)"),
            }
        }
    }

    Ok(())
}
