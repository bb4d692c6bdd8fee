use std::{collections::HashMap, fs};

use bytes::Bytes;
use iced::{
    event, executor, mouse, touch,
    widget::{self, column, image::Handle, row, text_editor, tooltip::Position},
    window, Application, Command, Event, Length, Subscription, Theme,
};
use log::{info, warn};
use mtg_decklist::{
    classify::{classify, color_identity_code},
    config::Config,
    models::{CardMap, DeckEntry, DecklistBlock, DecklistSections, Grouping, ResolvedSnapshot, Section},
    mtg::{self, ScryfallClient},
    parsing::parse_decklist,
    render::{preload_json, render_decklist, RenderInput},
    resolver::Resolver,
    store::JsonFileStore,
    tooltip::{
        fetch_image, CardLink, ContainerId, HoverOutcome, ImageRequest, LinkId, Rect, Tooltip,
        TooltipHost,
    },
};
use native_dialog::FileDialog;
use uuid::Uuid;

static NO_CARDS: CardMap = CardMap::new();

pub struct Flags {
    pub config: Config,
    pub catalog: ScryfallClient,
}

/// iced's tooltip overlay places the preview beside the hovered widget, so
/// the app always takes the anchored path.
struct AppHost {
    container: ContainerId,
    preload: Option<String>,
}

impl TooltipHost for AppHost {
    fn supports_anchor_positioning(&self) -> bool {
        true
    }

    fn link_bounds(&self, _link: LinkId) -> Rect {
        Rect::default()
    }

    fn scroll_offset(&self) -> (f32, f32) {
        (0.0, 0.0)
    }

    fn preload_blob(&self, container: ContainerId) -> Option<String> {
        if container == self.container {
            self.preload.clone()
        } else {
            None
        }
    }
}

pub struct App {
    config: Config,
    catalog: ScryfallClient,
    store: JsonFileStore,
    view: View,
    document_id: String,
    instance_id: String,
    deck_input_content: text_editor::Content,
    grouping: Grouping,
    status: String,
    sections: DecklistSections,
    snapshot: Option<ResolvedSnapshot>,
    host: AppHost,
    tooltip: Tooltip,
    image_cache: HashMap<String, Bytes>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Editor,
    Deck,
}

#[derive(Debug, Clone)]
pub enum AppMessage {
    ChangeView(View),
    EditDeckInput(text_editor::Action),
    SelectGrouping(Grouping),
    Resolve,
    ResolveFinish(Result<Option<ResolvedSnapshot>, String>),
    HoverCard(CardLink),
    LeaveCard(LinkId),
    ImageResolved(ImageRequest, Option<String>),
    UpdateImageCache(String, Option<Bytes>),
    Reposition,
    TouchStart,
    CopyDecklist,
    Import,
    ExportHtml,
}

type AppElement<'a> = iced::Element<'a, AppMessage, Theme, iced::Renderer>;

impl Application for App {
    type Executor = executor::Default;
    type Message = AppMessage;
    type Theme = Theme;
    type Flags = Flags;

    fn new(flags: Self::Flags) -> (Self, iced::Command<Self::Message>) {
        let host = AppHost {
            container: ContainerId(0),
            preload: None,
        };
        let tooltip = Tooltip::new(&host);
        let store = JsonFileStore::new(&flags.config.store_path);
        (
            Self {
                grouping: flags.config.grouping,
                config: flags.config,
                catalog: flags.catalog,
                store,
                view: View::Editor,
                document_id: format!("desktop-{}", Uuid::new_v4()),
                instance_id: Uuid::new_v4().to_string(),
                deck_input_content: text_editor::Content::new(),
                status: String::default(),
                sections: DecklistSections::default(),
                snapshot: None,
                host,
                tooltip,
                image_cache: HashMap::new(),
            },
            Command::none(),
        )
    }

    fn title(&self) -> String {
        "mtg decklist".to_owned()
    }

    fn theme(&self) -> Self::Theme {
        Theme::Dark
    }

    fn subscription(&self) -> Subscription<Self::Message> {
        event::listen_with(|event, _status| match event {
            Event::Window(_, window::Event::Resized { .. }) => Some(AppMessage::Reposition),
            Event::Mouse(mouse::Event::WheelScrolled { .. }) => Some(AppMessage::Reposition),
            Event::Touch(touch::Event::FingerPressed { .. }) => Some(AppMessage::TouchStart),
            _ => None,
        })
    }

    fn update(&mut self, message: Self::Message) -> iced::Command<Self::Message> {
        match message {
            AppMessage::ChangeView(view) => {
                self.tooltip.hide();
                self.view = view;
            }
            AppMessage::EditDeckInput(action) => self.deck_input_content.perform(action),
            AppMessage::SelectGrouping(grouping) => self.grouping = grouping,
            AppMessage::Resolve => {
                let raw = self.deck_input_content.text();
                self.sections = parse_decklist(&raw);
                self.status = "Resolving...".to_owned();

                let instance = self.instance_id.clone();
                let blocks = [DecklistBlock {
                    content: raw,
                    instance_id: instance.clone(),
                    grouping: self.grouping,
                    ..Default::default()
                }];
                let document = self.document_id.clone();
                let resolver = Resolver::with_config(self.catalog.clone(), &self.config);
                let mut store = self.store.clone();
                return Command::perform(
                    async move {
                        resolver
                            .refresh_document(&mut store, &document, &blocks)
                            .await
                            .map(|mut meta| meta.remove(&instance))
                            .map_err(|e| e.to_string())
                    },
                    AppMessage::ResolveFinish,
                );
            }
            AppMessage::ResolveFinish(result) => {
                match result {
                    Ok(snapshot) => {
                        let found = snapshot.as_ref().map(|s| s.cards.len()).unwrap_or(0);
                        self.status = format!(
                            "Found {} entries, {} cards resolved.",
                            self.sections.entries().count(),
                            found
                        );
                        self.set_snapshot(snapshot);
                    }
                    Err(e) => {
                        warn!("metadata refresh failed: {}", e);
                        self.status = format!("Could not store metadata: {}", e);
                        self.set_snapshot(None);
                    }
                }
                self.view = View::Deck;
            }
            AppMessage::HoverCard(link) => {
                if let HoverOutcome::Fetch(request) = self.tooltip.hover(&self.host, link) {
                    let catalog = self.catalog.clone();
                    return Command::perform(
                        async move { fetch_image(&catalog, request).await },
                        |(request, url)| AppMessage::ImageResolved(request, url),
                    );
                }
                return self.download_preview();
            }
            AppMessage::LeaveCard(link) => {
                // iced may report entering the next link before leaving this one
                if self.tooltip.active_link() == Some(link) {
                    self.tooltip.leave(link, None);
                }
            }
            AppMessage::ImageResolved(request, url) => {
                self.tooltip.complete(&self.host, request, url);
                return self.download_preview();
            }
            AppMessage::UpdateImageCache(url, bytes) => {
                if let Some(b) = bytes {
                    self.image_cache.insert(url, b);
                }
            }
            AppMessage::Reposition => self.tooltip.scroll_or_resize(&self.host),
            AppMessage::TouchStart => self.tooltip.touch_start(),
            AppMessage::CopyDecklist => {
                let text = self.deck_input_content.text();
                if text.trim().is_empty() {
                    self.status = "Nothing to copy".to_owned();
                    return Command::none();
                }
                self.status = "Copied".to_owned();
                return iced::clipboard::write(text);
            }
            AppMessage::Import => {
                let file = match FileDialog::new()
                    .add_filter("Decklist", &["txt", "dek", "dck"])
                    .show_open_single_file()
                {
                    Ok(Some(f)) => f,
                    _ => return Command::none(),
                };

                match fs::read_to_string(&file) {
                    Ok(text) => {
                        self.deck_input_content = text_editor::Content::with_text(&text);
                        self.view = View::Editor;
                    }
                    Err(e) => self.status = format!("Could not read {}: {}", file.display(), e),
                }
            }
            AppMessage::ExportHtml => {
                let file = match FileDialog::new()
                    .add_filter("HTML", &["html"])
                    .show_save_single_file()
                {
                    Ok(Some(f)) => f,
                    _ => return Command::none(),
                };

                let raw = self.deck_input_content.text();
                let cards = self.snapshot.as_ref().map(|s| &s.cards).unwrap_or(&NO_CARDS);
                let html = render_decklist(&RenderInput {
                    raw: &raw,
                    sections: &self.sections,
                    cards,
                    grouping: self.grouping,
                    style: self.config.style,
                });
                match fs::write(&file, html) {
                    Ok(()) => info!("exported decklist to {}", file.display()),
                    Err(e) => self.status = format!("Could not write {}: {}", file.display(), e),
                }
            }
        };

        iced::Command::none()
    }

    fn view(&self) -> iced::Element<'_, Self::Message, Self::Theme, iced::Renderer> {
        let btn_editor = widget::button("Decklist")
            .width(Length::Fixed(100.))
            .on_press(AppMessage::ChangeView(View::Editor));
        let btn_deck = widget::button("Tables")
            .width(Length::Fixed(100.))
            .on_press(AppMessage::ChangeView(View::Deck));
        let btn_import = widget::button("Import")
            .width(Length::Fixed(100.))
            .on_press(AppMessage::Import);
        let btn_export = widget::button("Export")
            .width(Length::Fixed(100.))
            .on_press(AppMessage::ExportHtml);

        let list_btn = column!(btn_editor, btn_deck, btn_import, btn_export);

        let content = match self.view {
            View::Editor => view_editor(self),
            View::Deck => view_deck(self),
        };

        row!(list_btn, content).into()
    }
}

impl App {
    fn set_snapshot(&mut self, snapshot: Option<ResolvedSnapshot>) {
        self.tooltip.container_removed(self.host.container);
        self.host.container = ContainerId(self.host.container.0 + 1);
        self.host.preload = snapshot.as_ref().map(|s| preload_json(&s.cards));
        self.snapshot = snapshot;
    }

    /// Fetches the bytes behind the preview image once it is known.
    fn download_preview(&self) -> Command<AppMessage> {
        let Some(image) = self.tooltip.preview().and_then(|p| p.image.as_ref()) else {
            return Command::none();
        };
        if self.image_cache.contains_key(&image.url) {
            return Command::none();
        }
        let url = image.url.clone();
        Command::perform(
            async move {
                let bytes = mtg::download_image(&url).await;
                (url, bytes)
            },
            |(url, bytes)| AppMessage::UpdateImageCache(url, bytes),
        )
    }
}

fn view_editor(app: &App) -> AppElement {
    let deck_input = widget::text_editor(&app.deck_input_content)
        .on_action(AppMessage::EditDeckInput)
        .height(400);

    let grouping = widget::pick_list(
        Grouping::ALL.to_vec(),
        Some(app.grouping),
        AppMessage::SelectGrouping,
    );
    let btn_resolve = widget::button("Build tables").on_press(AppMessage::Resolve);
    let btn_copy = widget::button("Copy decklist").on_press(AppMessage::CopyDecklist);

    let output = widget::scrollable(widget::text(&app.status));

    column!(deck_input, row!(grouping, btn_resolve, btn_copy), output).into()
}

fn view_deck(app: &App) -> AppElement {
    let cards = app.snapshot.as_ref().map(|s| &s.cards).unwrap_or(&NO_CARDS);
    let mut next_link = 0u64;
    let mut col = widget::Column::new().spacing(4);

    for section in Section::ALL {
        let rows = app.sections.get(section);
        if rows.is_empty() {
            continue;
        }
        let classified = classify(rows, app.grouping, cards);
        col = col.push(widget::text(section.title()).size(22));

        for group in &classified.groups {
            if let Some(label) = group.label {
                col = col.push(widget::text(label.label()).size(18));
            }
            for entry in &group.rows {
                next_link += 1;
                col = col.push(view_card_row(app, cards, entry, LinkId(next_link)));
            }
        }

        if !classified.lands.is_empty() {
            col = col.push(widget::text("Lands").size(18));
            for entry in &classified.lands {
                next_link += 1;
                col = col.push(view_card_row(app, cards, entry, LinkId(next_link)));
            }
        }
    }

    column!(
        widget::text(&app.status),
        widget::scrollable(col).width(Length::Fill)
    )
    .into()
}

fn view_card_row<'a>(
    app: &'a App,
    cards: &CardMap,
    entry: &DeckEntry,
    link_id: LinkId,
) -> AppElement<'a> {
    let card = cards.get(&entry.key());
    let ci = color_identity_code(card.map(|c| c.color_identity.as_slice()).unwrap_or_default());
    let mana = card.map(|c| c.mana_cost.clone()).unwrap_or_default();

    let link = CardLink {
        id: link_id,
        container: Some(app.host.container),
        card_name: entry.name.clone(),
    };
    let name = widget::mouse_area(widget::text(entry.name.clone()))
        .on_enter(AppMessage::HoverCard(link))
        .on_exit(AppMessage::LeaveCard(link_id));

    let name: AppElement<'a> = match view_preview(app, link_id) {
        Some(preview) => widget::tooltip(name, preview, Position::Right).into(),
        None => name.into(),
    };

    row!(
        widget::text(entry.quantity).width(Length::Fixed(40.)),
        widget::text(ci).width(Length::Fixed(60.)),
        widget::text(mana).width(Length::Fixed(120.)),
        name
    )
    .spacing(8)
    .into()
}

fn view_preview<'a>(app: &'a App, link_id: LinkId) -> Option<AppElement<'a>> {
    if app.tooltip.active_link() != Some(link_id) {
        return None;
    }
    let preview = app.tooltip.preview().filter(|p| p.visible)?;
    if preview.loading {
        return Some(widget::text("Loading...").into());
    }
    let image = preview.image.as_ref()?;
    let bytes = app.image_cache.get(&image.url)?;
    Some(
        widget::image::<Handle>(Handle::from_memory(bytes.clone()))
            .content_fit(iced::ContentFit::ScaleDown)
            .height(340)
            .into(),
    )
}

#[cfg(test)]
mod tests {
    use mtg_decklist::models::{CardRecord, ImageUris};

    use super::*;

    fn app_with_opt() -> App {
        let config = Config::default();
        let catalog = ScryfallClient::new(&config).unwrap();
        let (mut app, _) = App::new(Flags { config, catalog });

        let mut cards = CardMap::new();
        cards.insert(
            "opt".to_owned(),
            CardRecord {
                name: "Opt".to_owned(),
                image_uris: Some(ImageUris {
                    normal: Some("https://img.test/opt.jpg".to_owned()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        app.set_snapshot(Some(ResolvedSnapshot {
            content_hash: String::new(),
            fetched_at: 0,
            cards,
        }));
        app
    }

    fn hover(app: &mut App, id: u64) {
        let link = CardLink {
            id: LinkId(id),
            container: Some(app.host.container),
            card_name: "Opt".to_owned(),
        };
        let _ = app.update(AppMessage::HoverCard(link));
    }

    #[test]
    fn pointer_enter_and_exit_drive_the_preview() {
        let mut app = app_with_opt();
        hover(&mut app, 1);
        assert!(app.tooltip.is_visible());
        assert_eq!(app.tooltip.active_link(), Some(LinkId(1)));

        // entering the next row before leaving the previous one
        hover(&mut app, 2);
        let _ = app.update(AppMessage::LeaveCard(LinkId(1)));
        assert_eq!(app.tooltip.active_link(), Some(LinkId(2)));

        let _ = app.update(AppMessage::LeaveCard(LinkId(2)));
        assert!(!app.tooltip.is_visible());
    }

    #[test]
    fn touch_hides_the_preview() {
        let mut app = app_with_opt();
        hover(&mut app, 1);
        let _ = app.update(AppMessage::TouchStart);
        assert!(!app.tooltip.is_visible());
    }
}
