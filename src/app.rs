use crate::cache::{CacheSource, CacheStorage, SqliteStorage};
use crate::commands::{Command, CreateArgs};
use crate::config::Config;
use crate::forms::{FormClient, PageDraft};
use crate::net::{HttpTransport, Request, Transport};
use crate::offline::{CacheController, MessageChannel};
use crate::pages::navigation::{
  children_of, find_page, parent_candidates, resolve_destination,
};
use crate::pages::order::reorder_by_category;
use crate::pages::{CachedPagesClient, Page};
use chrono::{Datelike, Local, Utc};
use color_eyre::{eyre::eyre, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Network access as seen by every component: through the cache controller.
type Controller = CacheController<HttpTransport, SqliteStorage>;

/// Wires storage, the cache controller and the clients together.
pub struct App {
  /// Application configuration
  config: Config,

  /// Shared SQLite storage (snapshot slot and response caches)
  storage: Arc<SqliteStorage>,

  /// Offline cache controller, already started
  controller: Controller,

  /// Valid-page query
  pages: CachedPagesClient<Controller, SqliteStorage>,

  /// Admin write path
  forms: FormClient<Controller>,
}

impl App {
  pub async fn new(config: Config) -> Result<Self> {
    let storage = Arc::new(SqliteStorage::open(config.storage.path.as_deref())?);
    let network = HttpTransport::new()?;

    let controller = CacheController::new(
      network,
      Arc::clone(&storage),
      &config.offline,
      &config.sheets.endpoints(),
    )?;
    controller.start().await;

    let pages = CachedPagesClient::new(
      controller.clone(),
      Arc::clone(&storage),
      config.sheets.clone(),
    );
    let forms = FormClient::new(controller.clone(), config.forms.clone());

    Ok(Self {
      config,
      storage,
      controller,
      pages,
      forms,
    })
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Pages { fresh } => self.print_pages(fresh).await,
      Command::List { parent } => self.list(parent.as_deref()).await,
      Command::Show { id } => self.show(&id).await,
      Command::Open { id } => self.open(&id).await,
      Command::Parents => self.parents().await,
      Command::Refresh => self.refresh().await,
      Command::Export { output } => {
        let csv = self.pages.export_csv().await?;
        match output {
          Some(path) => {
            std::fs::write(&path, csv)
              .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
            println!("Exported to {}", path.display());
          }
          None => print!("{csv}"),
        }
        Ok(())
      }
      Command::Create(args) => self.create(args).await,
      Command::Delete { id, form_id } => {
        self.forms.submit_deletion(&form_id, &id).await?;
        println!("Deletion of {id} submitted");
        Ok(())
      }
      Command::Fetch { url } => self.fetch(&url).await,
      Command::UpdateCache => {
        let channel = MessageChannel::spawn(self.controller.clone());
        channel.post(json!({ "action": "update-cache" }));
        if !channel.close().await {
          return Err(eyre!("Cache update crashed, see the log for details"));
        }
        println!("Cache update finished, see the log for details");
        Ok(())
      }
      Command::CacheStatus => self.cache_status(),
    }
  }

  async fn load(&self, force_fresh: bool) -> Vec<Page> {
    let result = self.pages.valid_pages(force_fresh).await;
    match result.source {
      CacheSource::Fallback => eprintln!("warning: refresh failed, showing stored pages"),
      CacheSource::Empty => eprintln!("warning: no pages available"),
      CacheSource::Network | CacheSource::Cache => {}
    }
    result.data
  }

  async fn print_pages(&self, fresh: bool) -> Result<()> {
    for page in self.load(fresh).await {
      let parent = if page.is_top_level() { "-" } else { page.parent.as_str() };
      println!("{}\t{}\t{}", page.id, parent, page.title);
    }
    Ok(())
  }

  async fn list(&self, parent: Option<&str>) -> Result<()> {
    let pages = self.load(false).await;
    let children: Vec<Page> = children_of(&pages, parent).into_iter().cloned().collect();
    let (day, now) = (Local::now().day(), Utc::now().timestamp_millis());

    for page in reorder_by_category(children) {
      let destination = resolve_destination(&page, &pages, day, now);
      println!("{}\t{}\t{}", page.id, page.title, destination.href());
    }
    Ok(())
  }

  async fn show(&self, id: &str) -> Result<()> {
    let pages = self.load(false).await;
    let page = find_page(&pages, id).ok_or_else(|| eyre!("No page with id {}", id))?;

    println!("{}", page.title);
    if !page.subtitle.is_empty() {
      println!("{}", page.subtitle);
    }
    println!();
    println!("{}", page.content);
    Ok(())
  }

  async fn open(&self, id: &str) -> Result<()> {
    let pages = self.load(false).await;
    let page = find_page(&pages, id).ok_or_else(|| eyre!("No page with id {}", id))?;
    let destination =
      resolve_destination(page, &pages, Local::now().day(), Utc::now().timestamp_millis());
    println!("{}", destination.href());
    Ok(())
  }

  async fn parents(&self) -> Result<()> {
    let pages = self.load(true).await;
    for page in parent_candidates(&pages) {
      println!("{}\t{}", page.id, page.title);
    }
    Ok(())
  }

  async fn refresh(&self) -> Result<()> {
    let result = self.pages.valid_pages(true).await;
    if result.data.is_empty() {
      return Err(eyre!("Refresh failed, no pages available"));
    }
    if result.source == CacheSource::Fallback {
      eprintln!("warning: sheets unreachable, stored pages kept");
    }
    println!("Refreshed {} pages", result.data.len());
    Ok(())
  }

  async fn create(&self, args: CreateArgs) -> Result<()> {
    let mut draft = match &args.from {
      Some(id) => {
        let pages = self.load(true).await;
        let page = find_page(&pages, id).ok_or_else(|| eyre!("No page with id {}", id))?;
        PageDraft::from_page(page)
      }
      None => PageDraft::blank(),
    };

    if let Some(path) = &args.content_file {
      draft.content = std::fs::read_to_string(path)
        .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
    }
    apply(&mut draft.title, args.title);
    apply(&mut draft.subtitle, args.subtitle);
    apply(&mut draft.content, args.content);
    apply(&mut draft.image_address, args.image);
    apply(&mut draft.colour, args.colour);
    apply(&mut draft.external_link, args.external_link);
    apply(&mut draft.parent, args.parent);
    apply(&mut draft.category, args.category);
    if let Some(custom) = args.custom_page {
      draft.custom_page = custom;
    }

    let id = draft.id.clone();
    self.forms.submit_page(&args.form_id, draft).await?;
    println!("Page {id} submitted");
    Ok(())
  }

  async fn fetch(&self, raw: &str) -> Result<()> {
    let url = self
      .config
      .offline
      .origin
      .join(raw)
      .map_err(|e| eyre!("Invalid URL {}: {}", raw, e))?;

    let response = self.controller.fetch(&Request::get(url.clone())).await?;
    info!(url = %url, status = response.status, "fetched");
    println!(
      "{} {} ({} bytes)",
      response.status,
      response.content_type.as_deref().unwrap_or("-"),
      response.body.len()
    );
    Ok(())
  }

  fn cache_status(&self) -> Result<()> {
    let installed = self.storage.installed_generation()?;
    println!(
      "current: {} (installed: {})",
      self.controller.cache_name(),
      installed.as_deref().unwrap_or("none")
    );
    println!("claimed: {}", self.controller.is_claimed());
    if !self.storage.has_cache(self.controller.cache_name())? {
      println!("current generation has no cache yet");
    }

    for name in self.storage.cache_names()? {
      let keys = self.storage.entry_keys(&name)?;
      println!("{name}\t{} entries", keys.len());
      for key in keys {
        println!("  {key}");
      }
    }
    Ok(())
  }
}

fn apply(field: &mut String, value: Option<String>) {
  if let Some(value) = value {
    *field = value;
  }
}
