use iced::widget::image::Handle;
use iced::widget::{button, column, container, row, scrollable, text, text_input};
use iced::{Alignment, Element, Length, Task, Theme};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod event;
mod remote;
mod state;
mod ui;

use config::AppConfig;
use event::{EventBus, GalleryEvent};
use state::data::ImageRecord;
use state::library::Library;
use state::records::RecordStore;
use state::settings::SettingsStore;
use state::storage::{shared, KeyValueStore, SharedStore};
use ui::create::CreateDialog;
use ui::detail::Detail;
use ui::gallery::{GalleryView, Thumbnail};
use ui::settings::{Advance, SettingsForm};
use ui::ParamEdit;

type Store = SharedStore<Library>;

/// Main application state
struct ArcStudio {
    config: AppConfig,
    client: reqwest::Client,
    bus: EventBus,
    /// Public and archived collections
    records: RecordStore<Store>,
    settings: SettingsStore<Store>,
    /// The public grid on the main screen
    gallery: GalleryView,
    /// Open archive dialog
    archive: Option<GalleryView>,
    search: String,
    /// Fetched image data, by record id
    thumbnails: HashMap<i64, Thumbnail>,
    create: CreateDialog,
    detail: Option<Detail>,
    /// Settings dialog or onboarding
    settings_form: Option<SettingsForm>,
    /// Abort handle for the in-flight generation request
    generation_task: Option<iced::task::Handle>,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    SearchChanged(String),
    GalleryHovered(Option<i64>),
    ThumbnailLoaded(i64, Result<Handle, String>),

    /// A grid tile was clicked; the flag says whether it came from the archive
    OpenDetail(ImageRecord, bool),
    CloseDetail,
    Remix,
    Archive,
    MakePublic,
    Delete,
    Download(ImageRecord),
    DownloadFinished(Result<Option<PathBuf>, String>),

    OpenCreate,
    CloseCreate,
    PromptChanged(String),
    DraftEdited(ParamEdit),
    Generate,
    CancelGeneration,
    GenerationFinished(u64, Result<Handle, String>),

    OpenArchive,
    CloseArchive,

    OpenSettings,
    CloseSettings,
    SettingsUsername(String),
    SettingsEdited(ParamEdit),
    SaveSettings,
}

/// Store mutations offered by the detail dialog
#[derive(Debug, Clone, Copy)]
enum DetailAction {
    Archive,
    MakePublic,
    Delete,
}

impl ArcStudio {
    /// Create a new instance of the application
    fn new(config: AppConfig, library: Library, client: reqwest::Client) -> (Self, Task<Message>) {
        let bus = EventBus::new();
        let store = shared(library);
        let records = RecordStore::new(Arc::clone(&store));
        let settings = SettingsStore::new(store, bus.clone());

        let stored = settings.load();
        let gallery = GalleryView::public(records.list_public(), &bus);
        let create = CreateDialog::new(&bus, stored.as_ref());
        let settings_form = settings
            .needs_onboarding()
            .then(|| SettingsForm::onboarding(&bus));

        let image_count = gallery.records().len();
        info!("🎨 Arc Studio initialized with {} images", image_count);

        let mut app = ArcStudio {
            config,
            client,
            bus,
            records,
            settings,
            gallery,
            archive: None,
            search: String::new(),
            thumbnails: HashMap::new(),
            create,
            detail: None,
            settings_form,
            generation_task: None,
            status: format!("Ready. {} images in gallery.", image_count),
        };

        let visible = app.gallery.records().to_vec();
        let task = app.load_missing_thumbnails(&visible);
        (app, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        let task = match message {
            Message::SearchChanged(query) => {
                self.search = query;
                Task::none()
            }
            Message::GalleryHovered(id) => {
                match &mut self.archive {
                    Some(archive) => archive.hover(id),
                    None => self.gallery.hover(id),
                }
                Task::none()
            }
            Message::ThumbnailLoaded(id, result) => {
                let thumbnail = match result {
                    Ok(handle) => Thumbnail::Ready(handle),
                    Err(e) => {
                        warn!("⚠️  Could not load image {}: {}", id, e);
                        Thumbnail::Failed
                    }
                };
                self.thumbnails.insert(id, thumbnail);
                Task::none()
            }

            Message::OpenDetail(record, from_archive) => {
                self.detail = Some(Detail {
                    record,
                    from_archive,
                });
                Task::none()
            }
            Message::CloseDetail => {
                self.detail = None;
                Task::none()
            }
            Message::Remix => {
                if let Some(detail) = self.detail.take() {
                    // The generation dialog sits underneath the archive
                    self.archive = None;
                    self.bus.publish(GalleryEvent::RemixRequested {
                        prompt: detail.record.prompt,
                        parameters: detail.record.parameters,
                    });
                }
                Task::none()
            }
            Message::Archive => self.detail_action(DetailAction::Archive),
            Message::MakePublic => self.detail_action(DetailAction::MakePublic),
            Message::Delete => self.detail_action(DetailAction::Delete),
            Message::Download(record) => Task::perform(
                remote::download::download(self.client.clone(), record.image_url, record.prompt),
                Message::DownloadFinished,
            ),
            Message::DownloadFinished(result) => {
                match result {
                    Ok(Some(path)) => self.status = format!("Saved {}", path.display()),
                    Ok(None) => {}
                    Err(e) => {
                        error!("❌ Failed to download image: {}", e);
                        self.status = "Download failed.".to_string();
                    }
                }
                Task::none()
            }

            Message::OpenCreate => {
                self.create.generation.reset();
                self.create.open = true;
                Task::none()
            }
            Message::CloseCreate => {
                self.create.open = false;
                Task::none()
            }
            Message::PromptChanged(prompt) => {
                self.create.draft.prompt = prompt;
                Task::none()
            }
            Message::DraftEdited(edit) => {
                self.create.edit(edit);
                Task::none()
            }
            Message::Generate => self.start_generation(),
            Message::CancelGeneration => {
                if let Some(handle) = self.generation_task.take() {
                    handle.abort();
                }
                self.create.generation.cancel();
                self.status = "Generation cancelled.".to_string();
                Task::none()
            }
            Message::GenerationFinished(ticket, result) => {
                self.finish_generation(ticket, result);
                Task::none()
            }

            Message::OpenArchive => {
                let archived = self.records.list_archived();
                let task = self.load_missing_thumbnails(&archived);
                self.archive = Some(GalleryView::archive(archived));
                task
            }
            Message::CloseArchive => {
                self.archive = None;
                Task::none()
            }

            Message::OpenSettings => {
                self.settings_form = Some(SettingsForm::dialog(&self.bus, self.settings.load()));
                Task::none()
            }
            Message::CloseSettings => {
                // Onboarding can only be left by finishing it
                if !self.settings_form.as_ref().is_some_and(SettingsForm::is_onboarding) {
                    self.settings_form = None;
                }
                Task::none()
            }
            Message::SettingsUsername(username) => {
                if let Some(form) = &mut self.settings_form {
                    form.set_username(username);
                }
                Task::none()
            }
            Message::SettingsEdited(edit) => {
                if let Some(form) = &mut self.settings_form {
                    form.edit(edit);
                }
                Task::none()
            }
            Message::SaveSettings => {
                self.save_settings();
                Task::none()
            }
        };

        self.sync_components();
        task
    }

    /// Let every component pick up the events published during this update
    fn sync_components(&mut self) {
        let settings = &self.settings;
        self.gallery.sync();
        self.create.sync(|| settings.load());
        if let Some(form) = &mut self.settings_form {
            form.sync(|| settings.load());
        }
    }

    fn start_generation(&mut self) -> Task<Message> {
        let draft = &self.create.draft;
        let request = match self.create.generation.begin(draft, &self.config.endpoint) {
            Ok(request) => request,
            Err(e) => {
                warn!("Cannot start generation: {}", e);
                return Task::none();
            }
        };

        let ticket = request.ticket;
        let (task, handle) = Task::perform(
            remote::fetch_bytes(self.client.clone(), request.url),
            move |result| {
                Message::GenerationFinished(
                    ticket,
                    result.map(Handle::from_bytes).map_err(|e| e.to_string()),
                )
            },
        )
        .abortable();

        self.generation_task = Some(handle);
        self.status = "Generating...".to_string();
        task
    }

    fn finish_generation(&mut self, ticket: u64, result: Result<Handle, String>) {
        self.apply_generation_result(ticket, result);
        if !self.create.generation.is_generating() {
            self.generation_task = None;
        }
    }

    fn apply_generation_result(&mut self, ticket: u64, result: Result<Handle, String>) {
        match result {
            Ok(preview) => {
                let username = match self.create.username().trim() {
                    "" => self.config.default_username.clone(),
                    name => name.to_string(),
                };
                let Some(record) =
                    self.create.generation.succeed(ticket, &username, preview.clone())
                else {
                    return;
                };

                let id = record.id;
                match store_generated(&mut self.records, &self.bus, record) {
                    Ok(()) => {
                        self.thumbnails.insert(id, Thumbnail::Ready(preview));
                        self.status = "✅ Image created.".to_string();
                    }
                    Err(e) => {
                        error!("❌ Failed to store generated image: {}", e);
                        self.status = "Generated image could not be saved.".to_string();
                    }
                }
            }
            Err(reason) => {
                self.create.generation.fail(ticket, reason);
                self.status = "Generation failed.".to_string();
            }
        }
    }

    fn detail_action(&mut self, action: DetailAction) -> Task<Message> {
        let Some(detail) = self.detail.take() else {
            return Task::none();
        };
        let record = &detail.record;

        let result = match action {
            DetailAction::Archive => self.records.archive(record),
            DetailAction::MakePublic => self.records.make_public(record),
            DetailAction::Delete => self.records.delete(record.id, detail.from_archive),
        };

        if let Err(e) = result {
            error!("❌ {:?} failed for record {}: {}", action, record.id, e);
            self.status = format!("Could not update image: {}", e);
            return Task::none();
        }

        if let DetailAction::Delete = action {
            self.thumbnails.remove(&record.id);
        }

        // The record leaves whichever grid it was opened from
        if detail.from_archive {
            if let Some(archive) = &mut self.archive {
                archive.remove(record.id);
            }
        } else {
            self.gallery.remove(record.id);
        }

        if let DetailAction::MakePublic = action {
            self.gallery = GalleryView::public(self.records.list_public(), &self.bus);
        }

        Task::none()
    }

    fn save_settings(&mut self) {
        let Some(form) = self.settings_form.as_mut() else {
            return;
        };
        if form.advance() != Advance::Save {
            return;
        }

        let values = form.values.clone();
        match self.settings.save(&values) {
            Ok(()) => self.settings_form = None,
            Err(e) => {
                error!("❌ Failed to save settings: {}", e);
                self.status = "Settings could not be saved.".to_string();
            }
        }
    }

    /// Start fetching images for records that have none yet
    fn load_missing_thumbnails(&mut self, records: &[ImageRecord]) -> Task<Message> {
        let mut tasks = Vec::new();
        for record in records {
            if self.thumbnails.contains_key(&record.id) {
                continue;
            }
            self.thumbnails.insert(record.id, Thumbnail::Loading);
            tasks.push(Task::perform(
                remote::load_thumbnail(self.client.clone(), record.id, record.image_url.clone()),
                |(id, result)| Message::ThumbnailLoaded(id, result),
            ));
        }
        Task::batch(tasks)
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let header = row![
            text("Arc Studio").size(28),
            text_input("Search posts...", &self.search)
                .on_input(Message::SearchChanged)
                .padding(8)
                .width(Length::Fill),
            button(text("Create")).on_press(Message::OpenCreate).padding(10),
            button(text("Archive"))
                .on_press(Message::OpenArchive)
                .padding(10)
                .style(button::secondary),
            button(text("Settings"))
                .on_press(Message::OpenSettings)
                .padding(10)
                .style(button::secondary),
        ]
        .spacing(12)
        .align_y(Alignment::Center);

        let content = column![
            header,
            text(&self.status).size(14),
            scrollable(self.gallery.view(&self.search, &self.thumbnails)).height(Length::Fill),
        ]
        .spacing(16)
        .padding(20);

        let mut screen: Element<Message> = container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into();

        if self.create.open {
            screen = ui::modal(screen, self.create.view(), Some(Message::CloseCreate));
        }

        if let Some(archive) = &self.archive {
            let body = column![
                text("Archived Images").size(24),
                scrollable(archive.view("", &self.thumbnails)).height(Length::Fill),
            ]
            .spacing(12);

            screen = ui::modal(
                screen,
                container(body)
                    .width(Length::Fixed(960.0))
                    .height(Length::Fixed(640.0))
                    .padding(20)
                    .style(container::bordered_box),
                Some(Message::CloseArchive),
            );
        }

        if let Some(detail) = &self.detail {
            screen = ui::modal(
                screen,
                detail.view(self.thumbnails.get(&detail.record.id)),
                Some(Message::CloseDetail),
            );
        }

        if let Some(form) = &self.settings_form {
            let on_blur = (!form.is_onboarding()).then_some(Message::CloseSettings);
            screen = ui::modal(screen, form.view(), on_blur);
        }

        screen
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Persist a finished generation, then announce it. Nothing is published
/// when the write fails.
fn store_generated<S: KeyValueStore>(
    records: &mut RecordStore<S>,
    bus: &EventBus,
    record: ImageRecord,
) -> error::Result<()> {
    records.create(&record)?;
    bus.publish(GalleryEvent::RecordCreated(record));
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arc_studio=info")),
        )
        .init();

    let config = config::load();
    let library = match Library::open(&config.database_path()) {
        Ok(library) => library,
        Err(e) => {
            warn!("⚠️  Could not open database, images will not persist: {}", e);
            Library::open_in_memory()?
        }
    };
    let client = remote::build_client(config.request_timeout())?;

    iced::application("Arc Studio", ArcStudio::update, ArcStudio::view)
        .theme(ArcStudio::theme)
        .centered()
        .run_with(move || ArcStudio::new(config, library, client))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::remote::generation::Phase;
    use crate::state::data::GenerationParameters;
    use crate::state::storage::MemoryStorage;
    use crate::ui::Toggle;
    use std::time::Duration;

    fn studio() -> ArcStudio {
        let client = remote::build_client(Duration::from_secs(5)).unwrap();
        let library = Library::open_in_memory().unwrap();
        let (app, _) = ArcStudio::new(AppConfig::default(), library, client);
        app
    }

    fn preview() -> Handle {
        Handle::from_bytes(vec![0u8; 16])
    }

    fn running_ticket(app: &ArcStudio) -> u64 {
        match app.create.generation.phase() {
            Phase::Generating { ticket, .. } => *ticket,
            other => panic!("expected a running generation, got {:?}", other),
        }
    }

    /// Submit `prompt` and feed back a successful fetch
    fn generate(app: &mut ArcStudio, prompt: &str, private: bool) {
        let _ = app.update(Message::OpenCreate);
        let _ = app.update(Message::PromptChanged(prompt.to_string()));
        let _ = app.update(Message::DraftEdited(ParamEdit::Toggle(Toggle::Private, private)));
        let _ = app.update(Message::Generate);

        let ticket = running_ticket(app);
        let _ = app.update(Message::GenerationFinished(ticket, Ok(preview())));
    }

    fn record(prompt: &str) -> ImageRecord {
        ImageRecord::new(
            "@tester",
            "https://image.example/prompt/x".to_string(),
            prompt.to_string(),
            GenerationParameters::default(),
        )
    }

    #[test]
    fn test_generation_lands_in_store_and_gallery() {
        let mut app = studio();
        generate(&mut app, "a cat sleeping", false);

        let stored = app.records.list_public();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].prompt, "a cat sleeping");
        assert_eq!(stored[0].username, config::DEFAULT_USERNAME);

        assert_eq!(app.gallery.records(), stored.as_slice());
        assert!(matches!(
            app.thumbnails.get(&stored[0].id),
            Some(Thumbnail::Ready(_))
        ));
        assert!(matches!(app.create.generation.phase(), Phase::Succeeded { .. }));
        assert!(app.generation_task.is_none());
    }

    #[test]
    fn test_private_generation_stays_out_of_gallery() {
        let mut app = studio();
        generate(&mut app, "a secret garden", true);

        assert_eq!(app.records.list_archived().len(), 1);
        assert!(app.records.list_public().is_empty());
        assert!(app.gallery.records().is_empty());
    }

    #[test]
    fn test_cancelled_generation_stores_nothing() {
        let mut app = studio();
        let _ = app.update(Message::PromptChanged("a lighthouse".to_string()));
        let _ = app.update(Message::Generate);
        let ticket = running_ticket(&app);

        let _ = app.update(Message::CancelGeneration);
        let _ = app.update(Message::GenerationFinished(ticket, Ok(preview())));

        assert!(app.records.list_public().is_empty());
        assert!(app.gallery.records().is_empty());
        assert!(matches!(app.create.generation.phase(), Phase::Idle));
    }

    #[test]
    fn test_stored_record_is_announced() {
        let bus = EventBus::new();
        let mut records = RecordStore::new(MemoryStorage::new());
        let mut gallery = GalleryView::public(Vec::new(), &bus);
        let r = record("a cat");

        store_generated(&mut records, &bus, r.clone()).unwrap();
        gallery.sync();

        assert_eq!(records.list_public(), vec![r.clone()]);
        assert_eq!(gallery.records(), &[r]);
    }

    #[test]
    fn test_failed_store_publishes_nothing() {
        let bus = EventBus::new();
        let mut records = RecordStore::new(MemoryStorage::with_quota(16));
        let mut gallery = GalleryView::public(Vec::new(), &bus);

        let err = store_generated(&mut records, &bus, record("a cat")).unwrap_err();
        gallery.sync();

        assert!(matches!(err, Error::QuotaExceeded { .. }));
        assert!(records.list_public().is_empty());
        assert!(gallery.records().is_empty());
    }

    #[test]
    fn test_archive_from_detail_leaves_public_grid() {
        let mut app = studio();
        generate(&mut app, "a cat", false);
        let shown = app.gallery.records()[0].clone();

        let _ = app.update(Message::OpenDetail(shown.clone(), false));
        let _ = app.update(Message::Archive);

        assert!(app.detail.is_none());
        assert!(app.gallery.records().is_empty());
        assert_eq!(app.records.list_archived(), vec![shown]);
    }

    #[test]
    fn test_make_public_from_archive_shows_in_gallery() {
        let mut app = studio();
        generate(&mut app, "a secret garden", true);
        let _ = app.update(Message::OpenArchive);
        let archived = app.archive.as_ref().unwrap().records()[0].clone();

        let _ = app.update(Message::OpenDetail(archived.clone(), true));
        let _ = app.update(Message::MakePublic);

        assert!(app.archive.as_ref().unwrap().records().is_empty());
        assert_eq!(app.gallery.records().len(), 1);
        assert_eq!(app.gallery.records()[0].id, archived.id);
    }

    #[test]
    fn test_delete_from_archive_drops_thumbnail() {
        let mut app = studio();
        generate(&mut app, "a secret garden", true);
        let _ = app.update(Message::OpenArchive);
        let archived = app.archive.as_ref().unwrap().records()[0].clone();
        assert!(app.thumbnails.contains_key(&archived.id));

        let _ = app.update(Message::OpenDetail(archived.clone(), true));
        let _ = app.update(Message::Delete);

        assert!(app.archive.as_ref().unwrap().records().is_empty());
        assert!(app.records.list_archived().is_empty());
        assert!(!app.thumbnails.contains_key(&archived.id));
    }
}
