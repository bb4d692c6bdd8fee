//! Hover preview for card links.
//!
//! A [`Tooltip`] owns everything one page view needs: the single floating
//! preview, the session image cache, the parsed preload data of each
//! container and the currently hovered link. It is driven entirely by UI
//! events and never blocks: remote lookups are handed back to the caller as
//! [`ImageRequest`]s and their answers fed in through
//! [`Tooltip::complete`]. An answer only takes effect while its link is still
//! the active one, which is all the cancellation this needs.

use std::collections::HashMap;

use log::debug;

use crate::{
    models::{card_key, CardMap},
    mtg::CardCatalog,
};

/// Gap between a link's right edge and the preview when placing manually.
pub const PREVIEW_OFFSET: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u64);

/// A hoverable card link and the rendered decklist it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct CardLink {
    pub id: LinkId,
    pub container: Option<ContainerId>,
    pub card_name: String,
}

/// Viewport-relative bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// What the tooltip needs to know about the page it runs in.
pub trait TooltipHost {
    /// Whether the platform can place an element relative to a named anchor.
    fn supports_anchor_positioning(&self) -> bool;
    fn link_bounds(&self, link: LinkId) -> Rect;
    /// Current horizontal and vertical scroll offsets.
    fn scroll_offset(&self) -> (f32, f32);
    /// The embedded preload blob of a rendered decklist, if it has one.
    fn preload_blob(&self, container: ContainerId) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// The platform places the preview next to the named anchor.
    Anchored { anchor: String },
    /// Page coordinates.
    Absolute { left: f32, top: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewImage {
    pub url: String,
    pub alt: String,
}

/// The one floating preview element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preview {
    pub visible: bool,
    pub loading: bool,
    pub image: Option<PreviewImage>,
    pub placement: Option<Placement>,
}

/// A remote lookup the caller has to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub link: LinkId,
    pub card_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverOutcome {
    /// No card name on the link.
    Ignored,
    /// Answered from preload data or the session cache.
    Resolved,
    /// Needs a remote lookup; feed the answer to [`Tooltip::complete`].
    Fetch(ImageRequest),
}

/// Preload data parsed at most once per container.
#[derive(Debug, Default)]
pub struct PreloadCache {
    containers: HashMap<ContainerId, CardMap>,
}

impl PreloadCache {
    pub fn get_or_parse(&mut self, host: &dyn TooltipHost, container: ContainerId) -> &CardMap {
        self.containers.entry(container).or_insert_with(|| {
            host.preload_blob(container)
                .and_then(|blob| serde_json::from_str(&blob).ok())
                .unwrap_or_default()
        })
    }

    pub fn forget(&mut self, container: ContainerId) {
        self.containers.remove(&container);
    }

    pub fn is_parsed(&self, container: ContainerId) -> bool {
        self.containers.contains_key(&container)
    }
}

pub struct Tooltip {
    anchor_positioning: bool,
    preview: Option<Preview>,
    active: Option<CardLink>,
    session: HashMap<String, Option<String>>,
    preload: PreloadCache,
    anchors: HashMap<LinkId, String>,
}

impl Tooltip {
    /// One per page view. Anchor support is probed here and never again.
    pub fn new(host: &dyn TooltipHost) -> Self {
        Self {
            anchor_positioning: host.supports_anchor_positioning(),
            preview: None,
            active: None,
            session: HashMap::new(),
            preload: PreloadCache::default(),
            anchors: HashMap::new(),
        }
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn active_link(&self) -> Option<LinkId> {
        self.active.as_ref().map(|link| link.id)
    }

    pub fn is_visible(&self) -> bool {
        self.preview.as_ref().is_some_and(|p| p.visible)
    }

    pub fn cached_image(&self, card_name: &str) -> Option<Option<&str>> {
        self.session.get(card_name).map(Option::as_deref)
    }

    pub fn anchor_name(&self, link: LinkId) -> Option<&str> {
        self.anchors.get(&link).map(String::as_str)
    }

    /// Pointer entered a card link.
    pub fn hover(&mut self, host: &dyn TooltipHost, link: CardLink) -> HoverOutcome {
        if link.card_name.trim().is_empty() {
            return HoverOutcome::Ignored;
        }

        self.active = Some(link.clone());
        self.position(host, link.id);
        let preview = self.preview.get_or_insert_with(Preview::default);
        preview.visible = true;
        preview.loading = true;

        if let Some(url) = self.preloaded_image(host, &link) {
            self.session.insert(link.card_name.clone(), Some(url.clone()));
            self.apply(host, link.id, &link.card_name, Some(url));
            return HoverOutcome::Resolved;
        }

        if let Some(cached) = self.session.get(&link.card_name).cloned() {
            self.apply(host, link.id, &link.card_name, cached);
            return HoverOutcome::Resolved;
        }

        HoverOutcome::Fetch(ImageRequest {
            link: link.id,
            card_name: link.card_name,
        })
    }

    /// Answer to an [`ImageRequest`]. Cached even when nobody is waiting for
    /// it any more, misses included.
    pub fn complete(&mut self, host: &dyn TooltipHost, request: ImageRequest, image_url: Option<String>) {
        self.session
            .insert(request.card_name.clone(), image_url.clone());
        self.apply(host, request.link, &request.card_name, image_url);
    }

    /// Pointer left `link`, now over the link `to` (if any).
    pub fn leave(&mut self, link: LinkId, to: Option<LinkId>) {
        if to == Some(link) {
            return;
        }
        self.hide();
    }

    pub fn scroll_or_resize(&mut self, host: &dyn TooltipHost) {
        if !self.is_visible() {
            return;
        }
        if let Some(link) = self.active_link() {
            self.position(host, link);
        }
    }

    pub fn touch_start(&mut self) {
        self.hide();
    }

    /// Drops the parsed preload of a container that went away.
    pub fn container_removed(&mut self, container: ContainerId) {
        self.preload.forget(container);
    }

    pub fn hide(&mut self) {
        let Some(preview) = self.preview.as_mut() else {
            return;
        };
        preview.visible = false;
        preview.loading = false;
        self.active = None;
    }

    fn preloaded_image(&mut self, host: &dyn TooltipHost, link: &CardLink) -> Option<String> {
        let container = link.container?;
        let cards = self.preload.get_or_parse(host, container);
        cards
            .get(&card_key(&link.card_name))
            .and_then(|card| card.image_url())
            .map(str::to_owned)
    }

    fn apply(&mut self, host: &dyn TooltipHost, link: LinkId, card_name: &str, image_url: Option<String>) {
        if self.active_link() != Some(link) {
            debug!("dropping stale preview for {}", card_name);
            return;
        }
        let Some(url) = image_url else {
            self.hide();
            return;
        };
        if let Some(preview) = self.preview.as_mut() {
            preview.image = Some(PreviewImage {
                url,
                alt: card_name.to_owned(),
            });
            preview.loading = false;
        }
        // layout may have moved while the image loaded
        self.position(host, link);
    }

    fn position(&mut self, host: &dyn TooltipHost, link: LinkId) {
        let placement = if self.anchor_positioning {
            let anchor = self
                .anchors
                .entry(link)
                .or_insert_with(|| format!("--mtgdl-{}", uuid::Uuid::new_v4().simple()))
                .clone();
            Placement::Anchored { anchor }
        } else {
            let rect = host.link_bounds(link);
            let (scroll_x, scroll_y) = host.scroll_offset();
            Placement::Absolute {
                left: scroll_x + rect.right + PREVIEW_OFFSET,
                top: scroll_y + rect.top,
            }
        };
        self.preview.get_or_insert_with(Preview::default).placement = Some(placement);
    }
}

/// Runs a remote lookup. Any failure counts as "no image".
pub async fn fetch_image<C: CardCatalog>(catalog: &C, request: ImageRequest) -> (ImageRequest, Option<String>) {
    match catalog.lookup_image(&request.card_name).await {
        Ok(url) => (request, url),
        Err(e) => {
            debug!("no preview for {}: {}", request.card_name, e);
            (request, None)
        }
    }
}
