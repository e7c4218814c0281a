use std::process::exit;

use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use portray::broker::CredentialsBroker;
use portray::config::{local_user_name, AuthFlags, PortrayConfig, SwitchFlags};
use portray::handler::shell::ShellCredentialsHandler;
use portray::identity::aws_sdk::StsIdentityProvider;
use portray::mfa::StdinMfaTokenReader;
use portray::run::{Command, Portray};
use portray::store::FileCredentialStore;

#[derive(Parser, Debug)]
#[command(name = "portray", about = "Start a shell with temporary AWS credentials")]
struct Cli {
    #[command(subcommand)]
    command: Subcommands,
}

#[derive(Subcommand, Debug)]
enum Subcommands {
    /// Establish or reuse an MFA session via STS.
    Auth(AuthArgs),
    /// Assume or reuse a role session, via a named profile or account and role.
    Switch(SwitchArgs),
    /// Display version info.
    Version,
}

#[derive(Args, Debug)]
struct AuthArgs {
    /// The AWS account number of your MFA device.
    #[arg(short, long = "account")]
    account_id: Option<String>,

    /// The AWS user name associated with your MFA device.
    #[arg(short = 'u', long = "username")]
    user_name: Option<String>,

    /// An MFA token code. Prompted for when omitted.
    #[arg(short, long = "token")]
    token_code: Option<String>,

    /// A name for your profile (conflicts with --account and --username).
    #[arg(short, long)]
    profile: Option<String>,

    /// Disable MFA.
    #[arg(short, long)]
    no_mfa: bool,
}

#[derive(Args, Debug)]
struct SwitchArgs {
    /// The 12-digit AWS account ID.
    #[arg(short, long = "account")]
    account_id: Option<String>,

    /// The name of the role to assume.
    #[arg(short, long = "role")]
    role_name: Option<String>,

    /// The ExternalId required to assume the role. Defaults to your local user name.
    #[arg(short, long)]
    external_id: Option<String>,

    /// The named profile to use (conflicts with the other role options).
    #[arg(short, long)]
    profile: Option<String>,

    /// An MFA token code, used if the source session has to be renewed.
    #[arg(short, long = "token")]
    token_code: Option<String>,

    /// Disable MFA when renewing the source session.
    #[arg(short, long)]
    no_mfa: bool,
}

impl From<AuthArgs> for AuthFlags {
    fn from(args: AuthArgs) -> Self {
        AuthFlags {
            account_id: args.account_id,
            user_name: args.user_name,
            token_code: args.token_code,
            profile: args.profile,
            no_mfa: args.no_mfa,
        }
    }
}

impl From<SwitchArgs> for SwitchFlags {
    fn from(args: SwitchArgs) -> Self {
        SwitchFlags {
            account_id: args.account_id,
            role_name: args.role_name,
            external_id: args.external_id,
            profile: args.profile,
            token_code: args.token_code,
            no_mfa: args.no_mfa,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = match Cli::parse().command {
        Subcommands::Auth(args) => Command::Auth(args.into()),
        Subcommands::Switch(args) => Command::Switch(args.into()),
        Subcommands::Version => {
            println!("portray {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    if let Err(e) = run(command).await {
        debug!("error:{:?}", e);
        println!("{:#}", e);
        exit(1);
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    let config = match PortrayConfig::default_path() {
        Some(path) => PortrayConfig::load(path)?,
        None => PortrayConfig::default(),
    };
    let store = FileCredentialStore::in_home()
        .ok_or_else(|| anyhow::anyhow!("unable to determine the home directory"))?;

    let broker = CredentialsBroker::new(
        StsIdentityProvider,
        store,
        StdinMfaTokenReader,
        local_user_name(),
    );
    let portray = Portray::new(
        config,
        std::env::var("AWS_PROFILE").ok(),
        broker,
        ShellCredentialsHandler,
    );
    Ok(portray.run(command).await?)
}
