use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tmpl_render::config::{self, RenderConfig, RenderOptions};
use tmpl_render::stage::{ErrorPolicy, Stage};
use tmpl_render::{output, source};
use tracing_subscriber::EnvFilter;

/// Flags that shape the render configuration, shared by every command.
#[derive(clap::Args, Clone)]
struct ConfigArgs {
    /// Options file (default: ./tmpl-render.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Render data file (.json or .toml), merged over the options file's [data]
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Directory scanned for partials
    #[arg(long, global = true)]
    tmpl_path: Option<PathBuf>,

    /// Partial file extension
    #[arg(long, global = true)]
    tmpl_extension: Option<String>,

    /// Max parallel workers (default: number of CPU cores)
    #[arg(long, short = 'j', global = true)]
    jobs: Option<usize>,
}

#[derive(Parser)]
#[command(name = "tmpl-render")]
#[command(about = "Render templates with shared data and a directory of partials")]
#[command(long_about = "\
Render templates with shared data and a directory of partials

Every input file is rendered as a mustache-style template. Partials are the
files in the partials directory whose names end with the partial extension;
reference them by file name without the extension.

  src/
  ├── tmpl/
  │   ├── header.hjs        # {{> header}}
  │   └── footer.hjs        # {{> footer}}
  └── pages/
      ├── index.html        # → dist/index.html
      └── blog/post.html    # → dist/blog/post.html

  tmpl-render render src/pages --tmpl-path src/tmpl --data site.json

Run 'tmpl-render gen-config' to generate a documented tmpl-render.toml.")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render input files or directories into the output directory
    Render {
        /// Template files or directories to render
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(long, short, default_value = "dist")]
        output: PathBuf,

        /// Keep rendering after a file fails; exit non-zero at the end
        #[arg(long)]
        keep_going: bool,
    },
    /// List the partials that templates can reference
    Partials,
    /// Print a stock tmpl-render.toml with all options documented
    GenConfig,
}

/// Log filter when `RUST_LOG` is unset. Per-file progress and the run
/// summary go to stdout; `RUST_LOG=tmpl_render=info` adds the stage's own
/// summary and `debug` adds partial discovery details.
const DEFAULT_LOG_FILTER: &str = "tmpl_render=warn";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", error_chain(err.as_ref()));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {
        Command::Render {
            inputs,
            output: out_dir,
            keep_going,
        } => {
            let render_config = resolve_config(&cli.config)?;
            init_thread_pool(cli.config.jobs);

            let files = source::collect_inputs(&inputs, &[render_config.tmpl_path.clone()])?;
            let policy = if keep_going {
                ErrorPolicy::Skip
            } else {
                ErrorPolicy::Halt
            };
            let stage = Stage::new(render_config, policy);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_stage_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = stage.run(files, Some(tx));
            printer.join().ok();
            let summary = result?;

            source::write_outputs(&summary.rendered, &out_dir)?;
            output::print_run_summary(&summary, &out_dir);

            if summary.is_clean() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Partials => {
            let render_config = resolve_config(&cli.config)?;
            init_thread_pool(cli.config.jobs);
            let set = tmpl_render::load_partials(
                &render_config.tmpl_path,
                &render_config.tmpl_extension,
            )?;
            output::print_partials(&set, &render_config.tmpl_path, &render_config.tmpl_extension);
            Ok(ExitCode::SUCCESS)
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Stack option sources: options file ← data file ← flags.
fn resolve_config(args: &ConfigArgs) -> Result<RenderConfig, config::ConfigError> {
    let mut options = match &args.config {
        Some(path) => config::load_options(path)?,
        None => config::load_options_from_dir(Path::new("."))?.unwrap_or_default(),
    };
    if let Some(data_path) = &args.data {
        options = options.merge(RenderOptions {
            data: Some(config::load_data_file(data_path)?),
            ..Default::default()
        });
    }
    options = options.merge(RenderOptions {
        tmpl_path: args.tmpl_path.clone(),
        tmpl_extension: args.tmpl_extension.clone(),
        ..Default::default()
    });
    Ok(options.resolve())
}

/// Initialize the rayon thread pool.
///
/// Caps at the number of available CPU cores. The user can lower it, not raise it.
fn init_thread_pool(jobs: Option<usize>) {
    let threads = config::effective_threads(jobs);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// `outer: inner: innermost`, skipping causes already spelled out by the
/// message above them.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        cause = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_log_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn render_flags_parse() {
        let cli = Cli::try_parse_from([
            "tmpl-render",
            "render",
            "pages",
            "--keep-going",
            "--tmpl-path",
            "tmpl",
            "-o",
            "out",
        ])
        .unwrap();
        assert_eq!(cli.config.tmpl_path, Some(PathBuf::from("tmpl")));
        match cli.command {
            Command::Render {
                inputs,
                output,
                keep_going,
            } => {
                assert_eq!(inputs, vec![PathBuf::from("pages")]);
                assert_eq!(output, PathBuf::from("out"));
                assert!(keep_going);
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn error_chain_skips_repeated_causes() {
        let io = std::io::Error::other("disk gone");
        let err = config::ConfigError::Read {
            path: PathBuf::from("site.toml"),
            source: io,
        };
        assert_eq!(error_chain(&err), "failed to read site.toml: disk gone");
    }
}
