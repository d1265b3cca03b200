//! Command-line surface.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Environment variable read when `--form-id` is not given.
pub const FORM_ID_ENV: &str = "PAGESHELF_FORM_ID";

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Print every valid page
  Pages {
    /// Skip the stored snapshot and reconcile from the sheets
    #[arg(long)]
    fresh: bool,
  },
  /// List the pages under a parent, in category order
  #[command(alias = "ls")]
  List {
    /// Parent page id (default: top level)
    #[arg(short, long)]
    parent: Option<String>,
  },
  /// Show one page
  Show { id: String },
  /// Print where selecting a page leads
  Open { id: String },
  /// Pages that can be chosen as a parent
  Parents,
  /// Force a refresh of the local page snapshot
  Refresh,
  /// Export the valid pages as CSV
  Export {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// Submit a new page, or a new version of an existing one
  Create(CreateArgs),
  /// Submit a deletion request for a page
  Delete {
    id: String,
    #[arg(long, env = FORM_ID_ENV, hide_env_values = true)]
    form_id: String,
  },
  /// Fetch a URL through the offline cache
  Fetch {
    /// Absolute URL, or a path relative to the configured origin
    url: String,
  },
  /// Ask the cache controller to re-fetch its manifest
  UpdateCache,
  /// Show cache generations and their entries
  CacheStatus,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CreateArgs {
  /// Creation form id (acts as the admin password)
  #[arg(long, env = FORM_ID_ENV, hide_env_values = true)]
  pub form_id: String,
  /// Start from an existing page instead of a blank one
  #[arg(long, value_name = "ID")]
  pub from: Option<String>,
  #[arg(long)]
  pub title: Option<String>,
  #[arg(long)]
  pub subtitle: Option<String>,
  /// Rich-text HTML body
  #[arg(long, conflicts_with = "content_file")]
  pub content: Option<String>,
  /// Read the HTML body from a file
  #[arg(long)]
  pub content_file: Option<PathBuf>,
  #[arg(long)]
  pub image: Option<String>,
  #[arg(long)]
  pub colour: Option<String>,
  #[arg(long)]
  pub external_link: Option<String>,
  #[arg(long)]
  pub custom_page: Option<bool>,
  #[arg(long)]
  pub parent: Option<String>,
  #[arg(long)]
  pub category: Option<String>,
}
