mod bootstrap;
mod config;
mod container;
mod control_plane;
mod error;
mod logs;
mod reconciler;
mod utils;

use crate::bootstrap::TerminalPrompter;
use crate::config::ConfigStore;
use crate::control_plane::HttpControlPlane;
use crate::error::{Error, Result, ResultExt};
use crate::logs::{print_events, LogAggregator, LogsOptions};
use crate::reconciler::{DeployOptions, ServiceReconciler};
use clap::{arg, Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("lightdeck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Deploys and inspects managed container services from local service and deployment documents.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(arg!(config: -c --config <PATH> "Pointer config file").default_value("config.yaml").global(true))
        .arg(
            Arg::new("log_level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .default_value("info")
                .global(true),
        )
        .arg(arg!(debug: --debug "Shorthand for --log-level=debug").global(true))
        .arg(
            arg!(endpoint: --endpoint <URL> "Control plane endpoint")
                .env("LIGHTDECK_ENDPOINT")
                .global(true),
        )
        .subcommand(Command::new("deploy")
            .about("Creates the service or rolls out a new deployment")
            .arg(Arg::new("dry_run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Shows what would be applied without changing anything")
            )
        )
        .subcommand(Command::new("update")
            .about("Applies power and scale from the service document")
        )
        .subcommand(Command::new("init")
            .about("Creates local documents from a running service, or interactively")
            .arg(Arg::new("service_name").long("service-name").value_name("NAME").required(true))
        )
        .subcommand(Command::new("status")
            .about("Shows the state of the configured service")
            .arg(arg!(detail: --detail "Print the full service state"))
        )
        .subcommand(Command::new("logs")
            .about("Prints container logs of the configured service")
            .arg(Arg::new("container_name").long("container-name").value_name("NAME"))
            .arg(Arg::new("filter_pattern").long("filter-pattern").value_name("PATTERN"))
            .arg(Arg::new("start_time").long("start-time").value_name("TIME").help("Duration ago (e.g. 2h) or RFC 3339 time"))
            .arg(Arg::new("end_time").long("end-time").value_name("TIME").help("Duration ago (e.g. 2h) or RFC 3339 time"))
        )
        .subcommand(Command::new("dump")
            .about("Overwrites local documents with the named remote service")
            .arg(arg!(name: --name <NAME> "Service name").required(true))
        )
        .subcommand(Command::new("version")
            .about("Prints the version")
        )
}

fn setup_tracing(matches: &ArgMatches) {
    let level = if matches.get_flag("debug") {
        "debug"
    } else {
        matches.get_one::<String>("log_level").map(String::as_str).unwrap_or("info")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("lightdeck={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn string_arg(matches: &ArgMatches, id: &str) -> String {
    matches.get_one::<String>(id).cloned().unwrap_or_default()
}

fn control_plane(matches: &ArgMatches, cancel: CancellationToken) -> Result<HttpControlPlane> {
    let endpoint = match matches.get_one::<String>("endpoint") {
        Some(endpoint) if !endpoint.is_empty() => endpoint,
        _ => {
            return Err(Error::Validation(
                "no control plane endpoint; pass --endpoint or set LIGHTDECK_ENDPOINT".to_string(),
            ))
        }
    };
    HttpControlPlane::new(endpoint, std::env::var("LIGHTDECK_TOKEN").ok(), cancel)
}

async fn run(matches: &ArgMatches, cancel: CancellationToken) -> Result<()> {
    let (command, sub) = match matches.subcommand() {
        Some(subcommand) => subcommand,
        None => return Ok(()),
    };
    if command == "version" {
        println!("lightdeck {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config_path = string_arg(matches, "config");
    let store = ConfigStore::open(Path::new(&config_path))?;
    let client = control_plane(matches, cancel)?;
    let mut prompter = TerminalPrompter::default();
    let mut out = std::io::stdout();

    if command == "logs" {
        let service = store.load_service().context("failed to load service config")?;
        let options = LogsOptions {
            container_name: string_arg(sub, "container_name"),
            filter_pattern: string_arg(sub, "filter_pattern"),
            start_time: string_arg(sub, "start_time"),
            end_time: string_arg(sub, "end_time"),
        };
        let events = LogAggregator::new(&client)
            .collect(service.name(), &options, chrono::Utc::now())
            .await?;
        return print_events(&events, &mut out);
    }

    let mut reconciler = ServiceReconciler::new(&store, &client, &mut prompter);
    match command {
        "deploy" => {
            let options = DeployOptions {
                dry_run: sub.get_flag("dry_run"),
            };
            let outcome = reconciler.deploy(options, &mut out).await?;
            debug!(?outcome, "deploy finished");
        }
        "update" => reconciler.update(&mut out).await?,
        "init" => {
            let outcome = reconciler.init(&string_arg(sub, "service_name"), &mut out).await?;
            debug!(?outcome, "init finished");
        }
        "status" => reconciler.status(sub.get_flag("detail"), &mut out).await?,
        "dump" => reconciler.dump(&string_arg(sub, "name"), &mut out).await?,
        other => return Err(Error::Validation(format!("unknown command {}", other))),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let matches = cli().get_matches();
    setup_tracing(&matches);

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("interrupted, cancelling remote calls");
        signal.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    if let Err(e) = run(&matches, cancel).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
