use anyhow::{anyhow, Context, Result};
use byte_unit::{Byte, UnitType};
use cli::{Cli, Commands, RenderArgs};
use config::LatexConfig;
use context::RenderContext;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::process::ExitCode;
use template::{Template, DEFAULT_TEMPLATE, INSERTION_MARKER};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod context;
mod engine;
mod highlight;
mod images;
mod latex;
mod render;
mod splice;
mod template;

fn main() -> ExitCode {
    init_logging();
    if let Err(e) = try_main() {
        eprintln!("{}: {e:#}", console::style("Error").red());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // a second subscriber can only come from tests; keep the first
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn try_main() -> Result<()> {
    use clap::Parser;
    let cli = Cli::parse();

    match cli.command {
        None => render_book(&RenderArgs::default()),
        Some(Commands::Render(args)) => render_book(&args),
        Some(Commands::Template { output }) => match output {
            Some(path) => std::fs::write(&path, DEFAULT_TEMPLATE)
                .with_context(|| format!("Failed to write template to {}", path.display())),
            None => {
                print!("{DEFAULT_TEMPLATE}");
                Ok(())
            }
        },
        Some(Commands::Check { template }) => check_template(template.as_deref()),
        Some(Commands::Config) => {
            print!("{}", LatexConfig::default_toml()?);
            Ok(())
        }
    }
}

fn format_size(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

fn render_book(args: &RenderArgs) -> Result<()> {
    let ctx = match &args.context {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open render context {}", path.display()))?;
            RenderContext::from_json(std::io::BufReader::new(file))?
        }
        None => RenderContext::from_json(std::io::stdin().lock())?,
    };

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("can parse progress style")
            .progress_chars("#>-"),
    );
    progress.set_message("Collecting chapters...");

    let stats = render::render(&ctx, &progress).with_context(|| "Failed to render book")?;

    println!();
    println!(
        "  Chapters: {} rendered, {} skipped, {} image(s) copied",
        stats.chapters, stats.skipped, stats.images
    );
    for output in &stats.outputs {
        println!(
            "  {:<9} {} ({})",
            format!("{}:", output.kind),
            output.path.display(),
            format_size(output.bytes)
        );
    }
    Ok(())
}

fn check_template(path: Option<&Path>) -> Result<()> {
    let template = match path {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            Template::load(source)
                .with_context(|| format!("Failed to load template {}", path.display()))?
        }
        None => Template::builtin().with_context(|| "Failed to load the built-in template")?,
    };

    println!("Languages ({}):", template.languages.len());
    for name in template.languages.names() {
        println!("  {name}");
    }
    let aliases: Vec<String> = template
        .languages
        .aliases()
        .map(|(alias, target)| format!("{alias} -> {target}"))
        .collect();
    if !aliases.is_empty() {
        println!("Aliases:");
        for alias in aliases {
            println!("  {alias}");
        }
    }
    println!("Glyph substitutions ({}):", template.glyphs.len());
    for (source, replacement) in template.glyphs.iter() {
        println!("  {source} -> {replacement}");
    }

    match splice::marker_count(template.source(), INSERTION_MARKER) {
        1 => {
            println!("Insertion marker: found");
            Ok(())
        }
        0 => Err(anyhow!(splice::SpliceError::MissingMarker {
            marker: INSERTION_MARKER.to_string()
        })),
        count => Err(anyhow!(splice::SpliceError::DuplicateMarker {
            marker: INSERTION_MARKER.to_string(),
            count
        })),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn can_format_sizes() {
        let size = format_size(1536);
        assert!(size.starts_with("1.5"));
        assert!(size.ends_with("KiB"));
    }

    #[test]
    fn builtin_template_checks_out() {
        check_template(None).expect("built-in template is valid");
    }

    #[test]
    fn template_without_marker_fails_the_check() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let path = dir.path().join("plain.tex");
        std::fs::write(&path, "\\begin{document}\n\\end{document}\n").expect("can write template");
        let err = check_template(Some(&path)).expect_err("no marker");
        assert!(format!("{err:#}").contains("not found"));
    }
}
