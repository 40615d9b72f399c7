use clap::{Parser, Subcommand};
use imgpress::process::{self, RunOptions};
use imgpress::{config, output};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "imgpress")]
#[command(about = "Optimize the images of a built static site")]
#[command(long_about = "\
Optimize the images of a built static site

Every <img> in every HTML file under the site directory is rewritten in
place, and the local images it references are re-encoded next to the
originals:

  loading        eager + fetchpriority=high before <the-fold>, lazy after
  decoding       async
  alt            added (empty) and reported when missing
  src            re-encoded to WebP, or progressive JPEG above the fold
  data URI       results at or below embed_size are inlined
  width/height   filled in from the declared values and the true ratio
  srcset         downscaled @<width>w variants down to srcset_min_width

Mark the fold in your templates with an empty <the-fold></the-fold>
element. It is removed from the written HTML.

Run 'imgpress gen-config' to generate a documented imgpress.toml.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every HTML file under a directory
    Optimize(OptimizeArgs),
    /// Print a stock imgpress.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct OptimizeArgs {
    /// Site root (the output directory of your site generator)
    dir: PathBuf,

    /// Config file [default: <DIR>/imgpress.toml if present]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip HTML files whose path relative to <DIR> matches this regex
    #[arg(long)]
    exclude: Option<String>,

    /// Dry run: report what would change, write nothing
    #[arg(long)]
    nowrite: bool,

    /// Fast encoder settings, no embedding, no srcset
    #[arg(long)]
    fast: bool,

    /// Exit with status 1 when any issue was reported
    #[arg(long)]
    fail: bool,

    /// Write issues and summary as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Optimize(args) => {
            let options = RunOptions {
                config: args.config,
                exclude: args.exclude,
                dry_run: args.nowrite,
                fast: args.fast,
            };

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_run_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = process::optimize(&args.dir, &options, Some(tx));
            // The sender is dropped with `optimize`, so the printer drains and exits.
            printer.join().map_err(|_| "progress printer panicked")?;
            let ctx = result?;

            output::print_issues(&ctx);
            output::print_summary(&ctx);
            if args.nowrite {
                println!("Dry run: nothing written");
            }

            if let Some(report) = &args.report {
                process::write_report(&ctx, report)?;
            }

            if args.fail && ctx.issue_count() > 0 {
                std::process::exit(1);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
