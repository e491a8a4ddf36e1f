use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub struct RenderArgs {
    /// Read the render context from this file instead of stdin
    #[clap(short, long, value_name = "FILE")]
    pub context: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Renders a book from the mdBook render context (the default when run by mdBook)
    Render(RenderArgs),
    /// Writes the built-in LaTeX template, to start a custom one from
    Template {
        /// File to write to instead of stdout
        #[clap(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Loads a template and reports its languages, glyph substitutions and insertion marker
    Check {
        /// Template to check; the built-in one if omitted
        template: Option<PathBuf>,
    },
    /// Prints the default [output.latex] configuration for book.toml
    Config,
}

#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Option<Commands>,
}
