//! `classforge` command line

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use classforge_cli::{
    builtin_registry, list_candidates, logging, render_report, BuildConfig, BuildStep, CONFIG_FILE,
};
use std::path::PathBuf;
use std::process::ExitCode;

fn cli() -> Command {
    let step_args = [
        Arg::new("build-dir")
            .long("build-dir")
            .value_parser(value_parser!(PathBuf))
            .help("Main classes directory (overrides build_dir)"),
        Arg::new("output-dir")
            .long("output-dir")
            .value_parser(value_parser!(PathBuf))
            .help("Write main classes here instead of in place"),
        Arg::new("skip-tests")
            .long("skip-tests")
            .action(ArgAction::SetTrue)
            .help("Leave the test classes directory alone"),
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print the run report as JSON"),
    ];

    Command::new("classforge")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Apply stamped bytecode transformations to compiled classes")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .default_value(CONFIG_FILE)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the configuration file"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("info")
                .help("Log level when RUST_LOG is not set"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("run")
                .about("Transform main and test classes")
                .args(step_args.clone()),
        )
        .subcommand(
            Command::new("unstamp")
                .about("Remove the configured transformers' stamps")
                .args(step_args),
        )
        .subcommand(
            Command::new("list")
                .about("List candidate classes under a directory")
                .arg(
                    Arg::new("dir")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Classes directory"),
                ),
        )
}

fn load_config(matches: &ArgMatches, args: &ArgMatches) -> anyhow::Result<BuildConfig> {
    let path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let mut config = BuildConfig::load(&path)
        .with_context(|| format!("cannot load configuration {}", path.display()))?;

    if let Some(dir) = args.get_one::<PathBuf>("build-dir") {
        config.build_dir = dir.clone();
    }
    if let Some(dir) = args.get_one::<PathBuf>("output-dir") {
        config.output_dir = Some(dir.clone());
    }
    if args.get_flag("skip-tests") {
        config.include_test_classes = false;
    }
    Ok(config)
}

fn run(matches: &ArgMatches) -> anyhow::Result<ExitCode> {
    match matches.subcommand() {
        Some((name @ ("run" | "unstamp"), args)) => {
            let config = load_config(matches, args)?;
            let registry = builtin_registry().context("cannot build transformer registry")?;
            let step = BuildStep::new(&config, &registry);
            let report = if name == "run" {
                step.run()
            } else {
                step.unstamp()
            }
            .with_context(|| format!("{name} failed"))?;

            let rendered = render_report(&report, args.get_flag("json"))
                .context("cannot render run report")?;
            println!("{}", rendered.trim_end());

            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Some(("list", args)) => {
            let dir = args
                .get_one::<PathBuf>("dir")
                .context("missing classes directory")?;
            let names = list_candidates(dir)
                .with_context(|| format!("cannot list {}", dir.display()))?;
            for name in names {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    let log_level = matches
        .get_one::<String>("log-level")
        .map_or("info", String::as_str);
    logging::init(log_level, matches.get_flag("log-json"));

    match run(&matches) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
