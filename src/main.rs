use std::time::Duration;

use clap::{
    ArgAction, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use sonoauth::{
    cli, config, error,
    types::{Backend, Flow},
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Obtain an access token for a provider
    Auth(AuthOptions),

    /// Refresh the stored access token of a provider
    Refresh(RefreshOptions),

    /// List stored tokens
    Tokens,

    /// Remove stored tokens
    Clear(ClearOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    /// Provider name (spotify, tidal)
    provider: String,

    /// Authorization flow: auth_code, pkce, client_credentials or implicit
    #[clap(long)]
    flow: Option<Flow>,

    /// Client ID (defaults to {PREFIX}_CLIENT_ID)
    #[clap(long)]
    client_id: Option<String>,

    /// Client secret (defaults to {PREFIX}_CLIENT_SECRET)
    #[clap(long)]
    client_secret: Option<String>,

    /// Redirect URI registered with the provider
    #[clap(long)]
    redirect_uri: Option<String>,

    /// Scope to request; can be repeated
    #[clap(long = "scope", action = ArgAction::Append, num_args = 1)]
    scopes: Vec<String>,

    /// Redirect capture backend: local-server or browser-automation
    #[clap(long)]
    backend: Option<Backend>,

    /// Open the authorization URL in the default browser
    #[clap(long)]
    browser: bool,

    /// Do not read or write the token store
    #[clap(long)]
    no_persist: bool,

    /// Run the flow even when a valid token is stored
    #[clap(long)]
    force: bool,

    /// Print the Authorization header value on success
    #[clap(long)]
    print: bool,

    /// Seconds to wait for the authorization redirect
    #[clap(long)]
    timeout: Option<u64>,

    /// Account name for keeping several tokens per provider; prefix with ~ to reauthorize
    #[clap(long)]
    user: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct RefreshOptions {
    /// Provider name (spotify, tidal)
    provider: String,

    /// Account name used with `auth --user`
    #[clap(long)]
    user: Option<String>,

    /// Print the Authorization header value on success
    #[clap(long)]
    print: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ClearOptions {
    /// Provider whose token is removed; all tokens when omitted
    provider: Option<String>,

    /// Account name used with `auth --user`
    #[clap(long, requires = "provider")]
    user: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Auth(opt) => {
            cli::auth(cli::AuthArgs {
                provider: opt.provider,
                flow: opt.flow,
                client_id: opt.client_id,
                client_secret: opt.client_secret,
                redirect_uri: opt.redirect_uri,
                scopes: opt.scopes,
                backend: opt.backend,
                browser: opt.browser,
                persist: !opt.no_persist,
                force: opt.force,
                print: opt.print,
                timeout: opt
                    .timeout
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
                    .unwrap_or_else(config::redirect_timeout),
                user: opt.user,
            })
            .await
        }
        Command::Refresh(opt) => cli::refresh(opt.provider, opt.user, opt.print).await,
        Command::Tokens => cli::tokens().await,
        Command::Clear(opt) => cli::clear(opt.provider, opt.user).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
