use std::io::{self, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::auth::{Permission, User};
use crate::bus::SectionsBus;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::forms::{
    DbStrategy, PageEdit, QuickCategory, QuickInput, QuickInputEdit, RowEdit, SectionEdit,
};
use crate::http::ApiClient;
use crate::models::{Field, FieldType, Icon, Page, QuickInputKind};
use crate::nav::{NavSource, NavigationModel, PageDirectory};
use crate::pages::{AssumeYes, ConfirmPrompt, PageManager, PagesApi};
use crate::provision::ProvisionApi;
use crate::sections::{QuickFieldPanel, SectionPanel, SectionRegistry};
use crate::store::{FileStore, LocalStore};
use crate::view::{PageView, ViewState};

#[derive(Parser)]
#[command(
    name = "dashboard-admin",
    about = "Administrative client for the dynamic dashboard",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage the server-side page registry
    Pages {
        #[command(subcommand)]
        command: PagesCommand,
    },
    /// Manage locally cached dashboard sections
    Sections {
        #[command(subcommand)]
        command: SectionsCommand,
    },
    /// Create a section through the simplified flow
    QuickAdd {
        /// Section name
        #[arg(long)]
        name: String,
        /// healthcare, agriculture or finance
        #[arg(long, default_value = "healthcare")]
        category: QuickCategory,
        /// save or visualize
        #[arg(long, default_value = "save")]
        strategy: DbStrategy,
        /// Input as label:kind (kind: text, number or boolean)
        #[arg(long = "input", value_name = "SPEC")]
        inputs: Vec<String>,
    },
    /// Resolve and render a page view
    Render {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        path: Option<String>,
    },
    /// Show merged navigation entries
    Nav,
}

#[derive(Subcommand)]
pub enum PagesCommand {
    /// List registered pages
    List {
        /// Include inactive pages
        #[arg(long)]
        all: bool,
    },
    /// Show one page
    Show { id: i64 },
    /// Register a new page
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        route: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "FileText")]
        icon: Icon,
        /// Create the page hidden from navigation
        #[arg(long)]
        inactive: bool,
        /// Promote to top-level navigation (super_admin only)
        #[arg(long)]
        main_tab: bool,
    },
    /// Update fields of an existing page
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        route: Option<String>,
        #[arg(long)]
        icon: Option<Icon>,
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        main_tab: Option<bool>,
    },
    /// Delete a page
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum SectionsCommand {
    /// List cached sections
    List,
    /// Create a section and provision its backing table
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "Database")]
        icon: Icon,
        #[arg(long, default_value_t = 0)]
        order: i32,
        /// Create the section disabled
        #[arg(long)]
        disabled: bool,
        /// Field as name:type[:required][:hidden]
        #[arg(long = "field", value_name = "SPEC")]
        fields: Vec<String>,
    },
    /// Flip a section's enabled flag
    Toggle { id: String },
    /// Remove a section from the local cache
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Preview the generated entry form for a section path
    Form { path: String },
}

/// Reads y/N from stdin.
pub struct StdinPrompt;

impl ConfirmPrompt for StdinPrompt {
    fn confirm(&self, message: &str) -> bool {
        print!("{} [y/N] ", message);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(_) => matches!(line.trim(), "y" | "Y" | "yes"),
            _ => false,
        }
    }
}

pub(crate) fn parse_field_spec(spec: &str) -> Result<Field, AppError> {
    let mut parts = spec.split(':');
    let name = parts.next().unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation(format!(
            "Field spec '{}' has no name",
            spec
        )));
    }
    let kind = match parts.next() {
        Some(raw) => raw.parse::<FieldType>()?,
        _ => FieldType::String,
    };
    let mut field = Field::new(name, kind);
    for flag in parts {
        match flag {
            "required" => field.required = true,
            "hidden" => field.show_ui = false,
            other => {
                return Err(AppError::Validation(format!(
                    "Unknown field flag: {}",
                    other
                )));
            }
        }
    }
    Ok(field)
}

pub(crate) fn parse_input_spec(spec: &str) -> Result<QuickInput, AppError> {
    let mut parts = spec.split(':');
    let label = parts.next().unwrap_or_default().trim().to_string();
    if label.is_empty() {
        return Err(AppError::Validation(format!(
            "Input spec '{}' has no label",
            spec
        )));
    }
    let kind = match parts.next() {
        Some(raw) => raw.parse::<QuickInputKind>()?,
        _ => QuickInputKind::Text,
    };
    Ok(QuickInput { label, kind })
}

fn page_flags(page: &Page) -> String {
    let mut flags = Vec::new();
    if !page.is_active {
        flags.push("inactive");
    }
    if page.is_builtin {
        flags.push("builtin");
    }
    if page.is_main_tab {
        flags.push("main-tab");
    }
    flags.join(",")
}

pub async fn run(cli: Cli, config: AppConfig) -> Result<(), AppError> {
    let api = Arc::new(ApiClient::new(&config)?);
    let pages_api: Arc<dyn PagesApi> = api.clone();
    let provisioner: Arc<dyn ProvisionApi> = api;
    let store: Arc<dyn LocalStore> = Arc::new(FileStore::new(config.state_dir.clone())?);
    let bus = Arc::new(SectionsBus::new());
    let registry = Arc::new(SectionRegistry::new(store, provisioner, bus.clone()));
    let user = config.operator_user();

    match cli.command {
        Command::Pages { command } => run_pages(command, pages_api, &user).await,
        Command::Sections { command } => run_sections(command, registry, &user).await,
        Command::QuickAdd {
            name,
            category,
            strategy,
            inputs,
        } => run_quick_add(registry, &user, name, category, strategy, inputs).await,
        Command::Render { id, path } => run_render(pages_api, &user, id, path).await,
        Command::Nav => run_nav(pages_api, registry, bus, &user).await,
    }
}

async fn run_pages(
    command: PagesCommand,
    api: Arc<dyn PagesApi>,
    user: &User,
) -> Result<(), AppError> {
    let mut manager = PageManager::new(api);
    match command {
        PagesCommand::List { all } => {
            user.require_permission(Permission::ViewPages)?;
            manager.load().await?;
            for page in manager.pages().iter().filter(|page| all || page.is_active) {
                println!(
                    "{:>4}  {:<28} {:<24} {}",
                    page.id,
                    page.title,
                    page.route,
                    page_flags(page)
                );
            }
        }
        PagesCommand::Show { id } => {
            user.require_permission(Permission::ViewPages)?;
            manager.load().await?;
            let page = manager
                .find(id)
                .ok_or_else(|| AppError::NotFound(format!("Page {} not found", id)))?;
            println!("{}: {}", page.id, page.title);
            if let Some(description) = &page.description {
                println!("  {}", description);
            }
            println!("  route: {}", page.route);
            println!("  icon: {}", page.icon);
            let flags = page_flags(page);
            if !flags.is_empty() {
                println!("  flags: {}", flags);
            }
            println!("  created by {} at {}", page.created_by, page.created_at);
            println!("  updated at {}", page.updated_at);
        }
        PagesCommand::Create {
            title,
            route,
            description,
            icon,
            inactive,
            main_tab,
        } => {
            manager.open_create();
            if let Some(form) = manager.editor_form_mut() {
                form.apply(PageEdit::Title(title));
                form.apply(PageEdit::Route(route));
                if let Some(description) = description {
                    form.apply(PageEdit::Description(description));
                }
                form.apply(PageEdit::Icon(icon));
                form.apply(PageEdit::Active(!inactive));
                form.apply(PageEdit::MainTab(main_tab));
            }
            let created = manager.submit_editor(user).await?;
            println!("Created page {} at {}", created.id, created.route);
        }
        PagesCommand::Edit {
            id,
            title,
            description,
            route,
            icon,
            active,
            main_tab,
        } => {
            manager.load().await?;
            manager.open_edit(id)?;
            if let Some(form) = manager.editor_form_mut() {
                if let Some(title) = title {
                    form.apply(PageEdit::Title(title));
                }
                if let Some(description) = description {
                    form.apply(PageEdit::Description(description));
                }
                if let Some(route) = route {
                    form.apply(PageEdit::Route(route));
                }
                if let Some(icon) = icon {
                    form.apply(PageEdit::Icon(icon));
                }
                if let Some(active) = active {
                    form.apply(PageEdit::Active(active));
                }
                if let Some(main_tab) = main_tab {
                    form.apply(PageEdit::MainTab(main_tab));
                }
            }
            let updated = manager.submit_editor(user).await?;
            println!("Updated page {}", updated.id);
        }
        PagesCommand::Delete { id, yes } => {
            manager.load().await?;
            let prompt: &dyn ConfirmPrompt = if yes { &AssumeYes } else { &StdinPrompt };
            if manager.delete(id, user, prompt).await? {
                println!("Deleted page {}", id);
            } else {
                println!("Cancelled");
            }
        }
    }
    Ok(())
}

async fn run_sections(
    command: SectionsCommand,
    registry: Arc<SectionRegistry>,
    user: &User,
) -> Result<(), AppError> {
    match command {
        SectionsCommand::List => {
            user.require_permission(Permission::ViewSections)?;
            let panel = SectionPanel::new(registry);
            let mut sections = panel.sections().to_vec();
            sections.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.title.cmp(&b.title)));
            for section in &sections {
                println!(
                    "{}  {:<24} {:<20} {:<20} {}",
                    if section.enabled { "on " } else { "off" },
                    section.display_title(),
                    section.path,
                    section.table_name,
                    section.id
                );
            }
        }
        SectionsCommand::Create {
            title,
            display_name,
            description,
            icon,
            order,
            disabled,
            fields,
        } => {
            user.require_all_permissions(&[
                Permission::ManageSections,
                Permission::ProvisionTables,
            ])?;
            let mut panel = SectionPanel::new(registry);
            panel.open_form();
            let form = panel.form_mut();
            form.apply(SectionEdit::Title(title));
            if let Some(display_name) = display_name {
                form.apply(SectionEdit::DisplayName(display_name));
            }
            if let Some(description) = description {
                form.apply(SectionEdit::Description(description));
            }
            form.apply(SectionEdit::Icon(icon));
            form.apply(SectionEdit::Enabled(!disabled));
            form.apply(SectionEdit::Order(order));
            for spec in &fields {
                let field = parse_field_spec(spec)?;
                form.add_row();
                let index = form.rows().len() - 1;
                form.update_row(index, RowEdit::Name(field.name))?;
                form.update_row(index, RowEdit::Kind(field.kind))?;
                form.update_row(index, RowEdit::Required(field.required))?;
                form.update_row(index, RowEdit::ShowUi(field.show_ui))?;
            }
            let created = panel.submit().await?;
            println!(
                "Created section {} ({} -> {})",
                created.id,
                created.display_title(),
                created.path
            );
            println!("Provisioned table {}", created.table_name);
        }
        SectionsCommand::Toggle { id } => {
            user.require_permission(Permission::ManageSections)?;
            let updated = registry.toggle(&id)?;
            println!(
                "Section {} is now {}",
                updated.display_title(),
                if updated.enabled { "enabled" } else { "disabled" }
            );
        }
        SectionsCommand::Delete { id, yes } => {
            user.require_permission(Permission::ManageSections)?;
            let mut panel = SectionPanel::new(registry);
            let prompt: &dyn ConfirmPrompt = if yes { &AssumeYes } else { &StdinPrompt };
            if panel.remove(&id, prompt)? {
                println!("Removed section {} (backend table is orphaned)", id);
            } else {
                println!("Cancelled");
            }
        }
        SectionsCommand::Form { path } => {
            user.require_permission(Permission::ViewSections)?;
            let section = registry
                .find_by_path(&path)
                .ok_or_else(|| AppError::NotFound(format!("No enabled section at {}", path)))?;
            println!("{}", section.display_title());
            if !section.description.is_empty() {
                println!("{}", section.description);
            }
            for field in section.visible_fields() {
                println!(
                    "  {} ({}){}",
                    field.name,
                    field.kind.label(),
                    if field.required { " *" } else { "" }
                );
            }
        }
    }
    Ok(())
}

async fn run_quick_add(
    registry: Arc<SectionRegistry>,
    user: &User,
    name: String,
    category: QuickCategory,
    strategy: DbStrategy,
    inputs: Vec<String>,
) -> Result<(), AppError> {
    user.require_all_permissions(&[Permission::ManageSections, Permission::ProvisionTables])?;
    let mut panel = QuickFieldPanel::new(registry);
    let form = panel.form_mut();
    form.name = name;
    form.category = category;
    form.strategy = strategy;
    for spec in &inputs {
        let input = parse_input_spec(spec)?;
        form.add_input();
        let index = form.inputs().len() - 1;
        form.update_input(index, QuickInputEdit::Label(input.label))?;
        form.update_input(index, QuickInputEdit::Kind(input.kind))?;
    }
    let created = panel.submit().await?;
    println!(
        "Created section {} ({} -> {})",
        created.id,
        created.display_title(),
        created.path
    );
    println!("Provisioned table {}", created.table_name);
    Ok(())
}

async fn run_render(
    api: Arc<dyn PagesApi>,
    user: &User,
    id: Option<i64>,
    path: Option<String>,
) -> Result<(), AppError> {
    user.require_permission(Permission::ViewPages)?;
    let mut view = PageView::new(api);
    match (id, path) {
        (Some(id), _) => view.load_by_id(id).await,
        (_, Some(path)) => view.load_by_path(&path).await,
        _ => {
            return Err(AppError::Validation(
                "Provide --id or --path".to_string(),
            ));
        }
    }
    match view.state() {
        ViewState::Resolved(_) => {
            if let Some(props) = view.dashboard_props() {
                println!("Dashboard: {}", props.title);
                if let Some(description) = &props.description {
                    println!("{}", description);
                }
                println!("(custom page {})", props.page_id);
            }
            if view.can_modify(user) {
                println!("Modify available");
            }
        }
        ViewState::NotFound(message) => println!("{}", message),
        _ => {}
    }
    Ok(())
}

async fn run_nav(
    api: Arc<dyn PagesApi>,
    registry: Arc<SectionRegistry>,
    bus: Arc<SectionsBus>,
    user: &User,
) -> Result<(), AppError> {
    user.require_permission(Permission::ViewPages)?;
    let sources: Vec<Arc<dyn NavSource>> = vec![
        Arc::new(PageDirectory::new(api)),
        registry as Arc<dyn NavSource>,
    ];
    let mut nav = NavigationModel::new(sources, bus);
    nav.refresh().await?;
    for entry in nav.entries() {
        println!(
            "{}{:<28} {}",
            if entry.main_tab { "* " } else { "  " },
            entry.title,
            entry.path
        );
    }
    Ok(())
}
