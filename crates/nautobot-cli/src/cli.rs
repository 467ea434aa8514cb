use clap::{Parser, Subcommand, ValueEnum};
use nautobot_reconcile::TargetState;

#[derive(Parser)]
#[command(name = "nbstate")]
#[command(about = "Declare the state of Nautobot resources and converge to it")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Nautobot base URL (overrides config and NAUTOBOT_URL env var)
    #[arg(short, long, global = true, env = "NAUTOBOT_URL")]
    pub url: Option<String>,

    /// API token (overrides config and NAUTOBOT_TOKEN env var)
    #[arg(short, long, global = true, env = "NAUTOBOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "NBSTATE_PROFILE", default_value = "default")]
    pub profile: String,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub no_validate_certs: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile one resource to its desired state
    Apply(ApplyArgs),
    /// List the known resource kinds
    Kinds(KindsArgs),
    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StateArg {
    Present,
    Absent,
}

impl From<StateArg> for TargetState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Present => TargetState::Present,
            StateArg::Absent => TargetState::Absent,
        }
    }
}

#[derive(clap::Args, Default)]
pub struct ApplyArgs {
    /// Resource kind (e.g. route_target)
    pub kind: String,
    /// Parameter file, JSON or TOML ("-" reads JSON from stdin)
    #[arg(long)]
    pub params: Option<String>,
    /// Value of the name attribute
    #[arg(long)]
    pub name: Option<String>,
    /// Owning tenant: name, id or JSON filter
    #[arg(long)]
    pub tenant: Option<String>,
    /// Description
    #[arg(long)]
    pub description: Option<String>,
    /// Tag name or id (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Custom field as KEY=VALUE (repeatable)
    #[arg(long = "custom-field", value_name = "KEY=VALUE")]
    pub custom_fields: Vec<String>,
    /// Any attribute as KEY=VALUE, VALUE parsed as JSON when possible (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
    /// Target state
    #[arg(long)]
    pub state: Option<StateArg>,
    /// Report what would change without writing
    #[arg(long)]
    pub check: bool,
    /// Lookup field replacing the natural key (repeatable)
    #[arg(long = "query-param")]
    pub query_params: Vec<String>,
    /// Resource schema file (JSON or TOML) defining the kind
    #[arg(long)]
    pub schema: Option<String>,
}

#[derive(clap::Args)]
pub struct KindsArgs {
    /// Resource schema file (JSON or TOML) to list alongside the built-in kinds
    #[arg(long)]
    pub schema: Option<String>,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (url, token, validate_certs, timeout, format)
    pub key: String,
    /// Value
    pub value: String,
}
