// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use jpkr_api::{Client, Resource};
use jpkr_grid::Grid;
use jpkr_tui::{HostOptions, SystemClipboard};
use log::info;
use runtime::ApiRuntime;
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

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
            "load config {}; run `jpkr --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    logging::init(config.log_level()?, &config.log_file()?)?;

    let resource = options.resource.unwrap_or_else(|| config.resource());
    let client = Client::new(config.api_base_url(), resource, config.api_timeout()?)
        .with_context(|| {
            format!(
                "invalid [api] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?;
    info!(
        "jpkr starting: {} at {}",
        resource.as_str(),
        client.base_url()
    );
    if options.check_only {
        return Ok(());
    }

    let columns = resource.columns();
    let mut runtime = ApiRuntime::new(client);

    if let Some(target) = &options.export {
        let count = match target {
            ExportTarget::Stdout => {
                runtime::export_page(&mut runtime, &columns, config.page_size(), &mut io::stdout())?
            }
            ExportTarget::File(path) => {
                let mut file = fs::File::create(path)
                    .with_context(|| format!("create export file {}", path.display()))?;
                runtime::export_page(&mut runtime, &columns, config.page_size(), &mut file)?
            }
        };
        eprintln!("exported {count} {}", resource.as_str());
        return Ok(());
    }

    if let Some(path) = &options.import {
        let count = runtime::import_file(&mut runtime, &columns, path)?;
        eprintln!("created {count} {}", resource.as_str());
        return Ok(());
    }

    let mut grid = Grid::new(
        columns,
        runtime::grid_features(resource, config.clear_policy()),
    )?;
    jpkr_tui::run_grid(
        &mut grid,
        &mut runtime,
        &mut SystemClipboard::default(),
        HostOptions {
            title: resource.as_str().to_owned(),
            page_size: config.page_size(),
        },
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExportTarget {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    resource: Option<Resource>,
    export: Option<ExportTarget>,
    import: Option<PathBuf>,
    print_config_path: bool,
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
        resource: None,
        export: None,
        import: None,
        print_config_path: false,
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
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--resource" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--resource requires words or examples"))?;
                let resource = Resource::parse(value.as_ref()).ok_or_else(|| {
                    anyhow!(
                        "unknown resource {:?}; use words or examples",
                        value.as_ref()
                    )
                })?;
                options.resource = Some(resource);
            }
            "--export" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--export requires a file path or -"))?;
                options.export = Some(match value.as_ref() {
                    "-" => ExportTarget::Stdout,
                    path => ExportTarget::File(PathBuf::from(path)),
                });
            }
            "--import" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--import requires a TSV file path"))?;
                options.import = Some(PathBuf::from(value.as_ref()));
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    if options.export.is_some() && options.import.is_some() {
        return Err(anyhow!("--export and --import cannot be combined; run them one at a time"));
    }

    Ok(options)
}

fn print_help() {
    println!("jpkr: vocabulary table editor");
    println!("  --config <path>          Use a specific config path");
    println!("  --resource <name>        Table to open: words or examples");
    println!("  --export <path|->        Write the first page as TSV and exit");
    println!("  --import <path>          Create rows from a TSV file and exit");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and API settings");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, ExportTarget, parse_cli_args};
    use anyhow::Result;
    use jpkr_api::Resource;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/jpkr-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                resource: None,
                export: None,
                import: None,
                print_config_path: false,
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
    fn parse_cli_args_errors_for_missing_values() {
        for (flag, expected) in [
            ("--config", "--config requires a file path"),
            ("--resource", "--resource requires"),
            ("--export", "--export requires"),
            ("--import", "--import requires"),
        ] {
            let error = parse_cli_args(vec![flag], default_options_path())
                .expect_err("missing value should fail");
            assert!(error.to_string().contains(expected), "{flag}: {error}");
        }
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
    fn parse_cli_args_reads_resource() -> Result<()> {
        let options = parse_cli_args(vec!["--resource", "examples"], default_options_path())?;
        assert_eq!(options.resource, Some(Resource::Examples));

        let error = parse_cli_args(vec!["--resource", "kanji"], default_options_path())
            .expect_err("unknown resource should fail");
        assert!(error.to_string().contains("unknown resource"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_reads_export_targets() -> Result<()> {
        let stdout = parse_cli_args(vec!["--export", "-"], default_options_path())?;
        assert_eq!(stdout.export, Some(ExportTarget::Stdout));

        let file = parse_cli_args(vec!["--export", "words.tsv"], default_options_path())?;
        assert_eq!(
            file.export,
            Some(ExportTarget::File(PathBuf::from("words.tsv")))
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_rejects_export_with_import() {
        let error = parse_cli_args(
            vec!["--export", "-", "--import", "rows.tsv"],
            default_options_path(),
        )
        .expect_err("export and import together should fail");
        assert!(error.to_string().contains("cannot be combined"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
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
