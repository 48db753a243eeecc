use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::bus::{SectionsBus, SubscriptionId};
use crate::error::AppError;
use crate::models::{Icon, Section};
use crate::pages::PagesApi;
use crate::sections::SectionRegistry;

#[derive(Debug, Clone, PartialEq)]
pub enum EntryOrigin {
    Page(i64),
    Section(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavEntry {
    pub title: String,
    pub path: String,
    pub icon: Icon,
    pub main_tab: bool,
    pub origin: EntryOrigin,
}

/// Common capability over the two otherwise independent registries:
/// anything able to describe navigable entries. The registries stay
/// separate; reconciling their storage is future work.
#[async_trait]
pub trait NavSource: Send + Sync {
    async fn nav_entries(&self) -> Result<Vec<NavEntry>, AppError>;
}

/// Page side of navigation: active pages from the server registry.
pub struct PageDirectory {
    api: Arc<dyn PagesApi>,
}

impl PageDirectory {
    pub fn new(api: Arc<dyn PagesApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl NavSource for PageDirectory {
    async fn nav_entries(&self) -> Result<Vec<NavEntry>, AppError> {
        let pages = self.api.list_pages().await?;
        Ok(pages
            .into_iter()
            .filter(|page| page.is_active)
            .map(|page| NavEntry {
                title: page.title,
                path: page.route,
                icon: page.icon,
                main_tab: page.is_main_tab,
                origin: EntryOrigin::Page(page.id),
            })
            .collect())
    }
}

#[async_trait]
impl NavSource for SectionRegistry {
    /// Enabled sections, sorted by their display order then title.
    async fn nav_entries(&self) -> Result<Vec<NavEntry>, AppError> {
        let mut sections: Vec<Section> = self
            .load()
            .into_iter()
            .filter(|section| section.enabled)
            .collect();
        sections.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.title.cmp(&b.title)));
        Ok(sections
            .into_iter()
            .map(|section| {
                let title = section.display_title().to_string();
                NavEntry {
                    title,
                    path: section.path,
                    icon: section.icon,
                    main_tab: false,
                    origin: EntryOrigin::Section(section.id),
                }
            })
            .collect())
    }
}

/// Merged navigation over any number of sources. Subscribes to the
/// sections bus and re-reads when a signal arrived; a fresh model
/// starts dirty because it missed any earlier signals.
pub struct NavigationModel {
    sources: Vec<Arc<dyn NavSource>>,
    entries: Vec<NavEntry>,
    dirty: Arc<AtomicBool>,
    bus: Arc<SectionsBus>,
    subscription: Option<SubscriptionId>,
}

impl NavigationModel {
    pub fn new(sources: Vec<Arc<dyn NavSource>>, bus: Arc<SectionsBus>) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let flag = dirty.clone();
        let subscription = bus.subscribe("navigation", move || {
            flag.store(true, Ordering::SeqCst);
        });
        Self {
            sources,
            entries: Vec::new(),
            dirty,
            bus,
            subscription: Some(subscription),
        }
    }

    pub fn needs_refresh(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Re-read every source. The dirty flag clears first so a signal
    /// landing mid-refresh is not lost.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        self.dirty.store(false, Ordering::SeqCst);
        let mut entries = Vec::new();
        for source in &self.sources {
            entries.extend(source.nav_entries().await?);
        }
        // Stable: main tabs first, source order otherwise.
        entries.sort_by_key(|entry| !entry.main_tab);
        self.entries = entries;
        Ok(())
    }

    pub async fn refresh_if_needed(&mut self) -> Result<(), AppError> {
        if self.needs_refresh() {
            self.refresh().await
        } else {
            Ok(())
        }
    }

    pub fn entries(&self) -> &[NavEntry] {
        &self.entries
    }
}

impl Drop for NavigationModel {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.bus.unsubscribe(subscription);
        }
    }
}
