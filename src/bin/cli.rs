use std::ffi::OsString;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command, CommandFactory, FromArgMatches, Parser};
use tracing_subscriber::EnvFilter;

use proxyscan::api::{Credentials, Flavor, ManagementApi, ManagementClient};
use proxyscan::config::{Config, ScanConfig, DEFAULT_CONFIG_FILE};
use proxyscan::error::{Result, ScanError};
use proxyscan::output::console::render_scanner_list;
use proxyscan::output::OutputFormat;
use proxyscan::scanners::{PluginArg, Registry};
use proxyscan::Activation;

const SCANNER_HEADING: &str = "Scanners";

#[derive(Parser)]
#[command(
    name = "proxyscan",
    about = "Compliance scanner for Apigee API proxies",
    version,
    author
)]
struct Cli {
    /// Scan only deployed revisions
    #[arg(long, short = 'd')]
    deployed: bool,

    /// Environment to read deployments from
    #[arg(long, short = 'e')]
    environment: Option<String>,

    /// Only scan proxies whose name matches this regex
    #[arg(long)]
    namepattern: Option<String>,

    /// Only scan the highest revision of each proxy
    #[arg(long)]
    latestrevision: bool,

    /// List available scanners and exit
    #[arg(long, short = 'L')]
    list: bool,

    /// Suppress the startup banner
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Debug logging and per-revision scanner output
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Config file path
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Output format (json, console)
    #[arg(long, short = 'f', default_value = "json")]
    format: String,

    /// Write output to file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Organization to scan
    #[arg(long, env = "APIGEE_ORG", help_heading = "Connection")]
    org: Option<String>,

    /// OAuth bearer token
    #[arg(long, env = "APIGEE_TOKEN", hide_env_values = true, help_heading = "Connection")]
    token: Option<String>,

    /// Edge basic-auth user
    #[arg(long, env = "APIGEE_USER", help_heading = "Connection")]
    username: Option<String>,

    /// Edge basic-auth password
    #[arg(long, env = "APIGEE_PASSWORD", hide_env_values = true, help_heading = "Connection")]
    password: Option<String>,

    /// Talk to Apigee X instead of Edge
    #[arg(long, help_heading = "Connection")]
    apigeex: bool,

    /// Management server URL override
    #[arg(long, help_heading = "Connection")]
    url: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let result = match Registry::load_all() {
        Ok(registry) => run(&registry, std::env::args_os()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

/// The derived command plus one flag per registered scanner.
fn command(registry: &Registry) -> Result<Command> {
    let mut cmd = Cli::command();
    for descriptor in registry.descriptors() {
        if cmd.get_arguments().any(|a| a.get_id() == descriptor.option.as_str()) {
            return Err(ScanError::Plugin {
                option: descriptor.option,
                message: "collides with a built-in option".into(),
            });
        }
        let arg = Arg::new(descriptor.option.clone())
            .long(descriptor.option.clone())
            .help(descriptor.description.clone())
            .help_heading(SCANNER_HEADING);
        let arg = if descriptor.noarg {
            arg.action(ArgAction::SetTrue)
        } else {
            arg.action(ArgAction::Set).value_name("ARG")
        };
        cmd = cmd.arg(arg);
    }
    Ok(cmd)
}

/// Plugins selected on the command line, in registry order.
fn activations<'a>(registry: &'a Registry, matches: &ArgMatches) -> Vec<Activation<'a>> {
    registry
        .plugins()
        .filter_map(|plugin| {
            let descriptor = plugin.descriptor();
            let arg = if descriptor.noarg {
                matches
                    .get_flag(&descriptor.option)
                    .then_some(PluginArg::Flag)
            } else {
                matches
                    .get_one::<String>(&descriptor.option)
                    .map(|v| PluginArg::Value(v.clone()))
            };
            arg.map(|arg| (plugin, arg))
        })
        .collect()
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "proxyscan=debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn credentials(cli: &Cli, flavor: Flavor) -> Result<Credentials> {
    if let Some(token) = &cli.token {
        return Ok(Credentials::Token(token.clone()));
    }
    match (flavor, &cli.username, &cli.password) {
        (Flavor::Edge, Some(username), Some(password)) => Ok(Credentials::Basic {
            username: username.clone(),
            password: password.clone(),
        }),
        (Flavor::X, _, _) => Err(ScanError::Usage(
            "Apigee X needs a token (--token or APIGEE_TOKEN)".into(),
        )),
        (Flavor::Edge, _, _) => Err(ScanError::Usage(
            "specify --token, or --username and --password".into(),
        )),
    }
}

async fn run<I, T>(registry: &Registry, args: I) -> Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command(registry)?
        .try_get_matches_from(args)
        .unwrap_or_else(|e| e.exit());
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    init_tracing(cli.verbose);

    if !cli.quiet {
        eprintln!(
            "proxyscan {}, Apigee proxy compliance scanner",
            env!("CARGO_PKG_VERSION")
        );
    }

    if cli.list {
        print!("{}", render_scanner_list(&registry.descriptors()));
        return Ok(0);
    }

    let activations = activations(registry, &matches);
    if activations.is_empty() {
        eprintln!("You have not specified any scanners.\n");
        eprint!("{}", render_scanner_list(&registry.descriptors()));
        return Ok(1);
    }

    let config = Config::load(&cli.config)?;
    let scan_config = config.scan.merge(ScanConfig {
        deployed: cli.deployed,
        environment: cli.environment.clone(),
        latest_revision: cli.latestrevision,
        name_pattern: cli.namepattern.clone(),
        work_dir: None,
    });
    let flavor = if cli.apigeex || config.connection.apigeex {
        Flavor::X
    } else {
        Flavor::Edge
    };
    if flavor == Flavor::X && scan_config.deployed && scan_config.environment.is_none() {
        return Err(ScanError::Usage(
            "--deployed on Apigee X requires --environment".into(),
        ));
    }
    let options = scan_config.into_options(cli.verbose)?;

    let org = cli
        .org
        .clone()
        .or(config.connection.org)
        .ok_or_else(|| ScanError::Usage("specify --org (or APIGEE_ORG)".into()))?;
    let url = cli.url.clone().or(config.connection.url);
    let client = ManagementClient::new(flavor, url.as_deref(), &org, credentials(&cli, flavor)?)?;
    let api: Arc<dyn ManagementApi> = Arc::new(client);

    let format = OutputFormat::from_str_lenient(&cli.format).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using json", cli.format);
        OutputFormat::Json
    });

    let findings = proxyscan::scan(api, activations, &options).await?;
    let rendered = proxyscan::render_report(&findings, format)?;

    match cli.output {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    Ok(0)
}
