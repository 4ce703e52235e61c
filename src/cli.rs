use clap::{Args, Parser, Subcommand};

use crate::filter::SortMode;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the configured sources and print matching records.
    List(ListArgs),
    /// Text search across all configured sources.
    Search(SearchArgs),
    /// Write the browse page as a static HTML file.
    Render(RenderArgs),
    /// Serve the browse page with incremental loading.
    Serve(ServeArgs),
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommand,
    },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Catalog config file (sources.yaml).
    #[arg(long)]
    pub config: String,

    /// Favorites file; without it favorites-only filters match nothing.
    #[arg(long)]
    pub favorites: Option<String>,

    /// Restrict output to one source key.
    #[arg(long)]
    pub source: Option<String>,

    /// Category/task facet (case-insensitive membership).
    #[arg(long)]
    pub category: Option<String>,

    /// Language facet (case-insensitive exact match).
    #[arg(long)]
    pub language: Option<String>,

    /// License facet (case-insensitive exact match).
    #[arg(long)]
    pub license: Option<String>,

    /// Text filter applied alongside the facets.
    #[arg(long)]
    pub query: Option<String>,

    /// Only records in the favorites set.
    #[arg(long)]
    pub favorites_only: bool,

    /// Sort mode: relevance keeps source order.
    #[arg(long, value_enum, default_value = "relevance")]
    pub sort: SortMode,

    /// Print unfiltered output in batches with batch separators.
    #[arg(long)]
    pub batches: bool,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Catalog config file (sources.yaml).
    #[arg(long)]
    pub config: String,

    /// Substring to look for (case-insensitive, all sources).
    #[arg(long)]
    pub query: String,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Catalog config file (sources.yaml).
    #[arg(long)]
    pub config: String,

    /// Favorites file used to mark active toggles.
    #[arg(long)]
    pub favorites: Option<String>,

    /// Output path for the browse page (must not exist).
    #[arg(long)]
    pub out: String,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Catalog config file (sources.yaml).
    #[arg(long)]
    pub config: String,

    /// Favorites file (default: favorites.json next to the config).
    #[arg(long)]
    pub favorites: Option<String>,

    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:8780")]
    pub addr: String,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    /// Print every favorited record identifier.
    List(FavoritesListArgs),
    /// Flip one identifier in or out of the set.
    Toggle(FavoritesToggleArgs),
}

#[derive(Debug, Args)]
pub struct FavoritesListArgs {
    /// Favorites file.
    #[arg(long)]
    pub favorites: String,
}

#[derive(Debug, Args)]
pub struct FavoritesToggleArgs {
    /// Favorites file (created on first toggle).
    #[arg(long)]
    pub favorites: String,

    /// Record identifier to toggle.
    #[arg(long)]
    pub id: String,
}
