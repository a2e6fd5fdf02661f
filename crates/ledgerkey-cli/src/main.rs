// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use ledgerkey_app::{EntrySession, SessionConfig};
use ledgerkey_client::Client;
use runtime::Backend;
use std::env;
use std::path::PathBuf;
use time::OffsetDateTime;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `ledgerkey --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let log_path = config.log_path()?;
    if options.print_log_path {
        println!("{}", log_path.display());
        return Ok(());
    }

    let mut backend = if options.demo {
        Backend::demo()
    } else {
        let client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
            format!(
                "invalid [server] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?;
        Backend::Http(client)
    };

    if options.check_only {
        let count = backend
            .check()
            .with_context(|| format!("check {}", backend.describe()))?;
        println!("{}: {count} voucher types", backend.describe());
        return Ok(());
    }

    logging::init(&log_path, config.log_filter())?;

    let today = OffsetDateTime::now_utc().date();
    let period = config.period(today).with_context(|| {
        format!(
            "resolve working period -- fix [entry].period in {}",
            options.config_path.display()
        )
    })?;
    let mut session = EntrySession::new(SessionConfig {
        voucher: config.default_voucher(),
        min_rows: config.min_rows(),
        period,
        today,
    })
    .context("build entry session")?;

    info!(
        backend = %backend.describe(),
        voucher = config.default_voucher().as_str(),
        %period,
        "starting entry session"
    );
    ledgerkey_tui::run_app(&mut session, &mut backend)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_log_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_log_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-log-path" => {
                options.print_log_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("ledgerkey: keyboard-first voucher entry");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-log-path         Print resolved log file path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Enter vouchers against an in-memory demo book");
    println!("  --check                  Validate config and reach the ledger service");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/ledgerkey-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_log_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(!options.print_log_path);
        assert!(!options.demo);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_demo_and_log_path_flags() -> Result<()> {
        let options = parse_cli_args(vec!["--demo", "--print-log-path"], default_options_path())?;
        assert!(!options.print_config_path);
        assert!(options.print_log_path);
        assert!(options.demo);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }
}
