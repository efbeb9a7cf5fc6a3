use iced::widget::{column, container, image, mouse_area, row, text, Column};
use iced::{Alignment, ContentFit, Element, Length};
use iced_aw::Wrap;
use std::collections::HashMap;

use crate::event::{EventBus, GalleryEvent, Mailbox};
use crate::state::data::ImageRecord;
use crate::Message;

/// Width of one grid tile
const TILE_WIDTH: f32 = 280.0;

/// Display state of a record's image
#[derive(Debug, Clone)]
pub enum Thumbnail {
    Loading,
    Ready(image::Handle),
    Failed,
}

/// An in-memory view of one collection.
///
/// The public gallery listens for `RecordCreated` and prepends non-private
/// records; the archive view is a snapshot taken when it opens.
#[derive(Debug)]
pub struct GalleryView {
    records: Vec<ImageRecord>,
    archive: bool,
    hovered: Option<i64>,
    mailbox: Option<Mailbox>,
}

impl GalleryView {
    /// Public gallery, kept live through the bus
    pub fn public(records: Vec<ImageRecord>, bus: &EventBus) -> Self {
        Self {
            records: records
                .into_iter()
                .filter(|record| !record.parameters.private)
                .collect(),
            archive: false,
            hovered: None,
            mailbox: Some(Mailbox::subscribe(bus, |event| {
                matches!(event, GalleryEvent::RecordCreated(_))
            })),
        }
    }

    /// Archive snapshot
    pub fn archive(records: Vec<ImageRecord>) -> Self {
        Self {
            records,
            archive: true,
            hovered: None,
            mailbox: None,
        }
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    /// Apply queued bus events
    pub fn sync(&mut self) {
        let Some(mailbox) = &self.mailbox else {
            return;
        };
        for event in mailbox.drain() {
            if let GalleryEvent::RecordCreated(record) = event {
                if !record.parameters.private {
                    self.records.insert(0, record);
                }
            }
        }
    }

    /// Drop a record after a detail action moved or deleted it
    pub fn remove(&mut self, id: i64) {
        self.records.retain(|record| record.id != id);
        if self.hovered == Some(id) {
            self.hovered = None;
        }
    }

    pub fn hover(&mut self, id: Option<i64>) {
        self.hovered = id;
    }

    /// Records whose prompt or username contains `query`, ignoring case
    pub fn filtered(&self, query: &str) -> Vec<&ImageRecord> {
        let needle = query.trim().to_lowercase();
        self.records
            .iter()
            .filter(|record| record.matches(&needle))
            .collect()
    }

    pub fn view<'a>(
        &'a self,
        query: &str,
        thumbnails: &'a HashMap<i64, Thumbnail>,
    ) -> Element<'a, Message> {
        let visible = self.filtered(query);

        if visible.is_empty() {
            return container(text("No images found. Start creating some!").size(16))
                .width(Length::Fill)
                .padding(48)
                .center_x(Length::Fill)
                .into();
        }

        let tiles: Vec<Element<'a, Message>> = visible
            .into_iter()
            .map(|record| self.tile(record, thumbnails.get(&record.id)))
            .collect();

        Wrap::with_elements(tiles)
            .spacing(16.0)
            .line_spacing(16.0)
            .into()
    }

    fn tile<'a>(
        &self,
        record: &'a ImageRecord,
        thumbnail: Option<&'a Thumbnail>,
    ) -> Element<'a, Message> {
        let picture: Element<'a, Message> = match thumbnail {
            Some(Thumbnail::Ready(handle)) => image(handle.clone())
                .width(Length::Fill)
                .content_fit(ContentFit::Cover)
                .into(),
            Some(Thumbnail::Failed) => placeholder("Image unavailable"),
            Some(Thumbnail::Loading) | None => placeholder("Loading…"),
        };

        let mut body: Column<'a, Message> = column![picture].spacing(6);

        // Hover reveals author, prompt and parameter badges
        if self.hovered == Some(record.id) {
            let mut badges = row![text(record.parameters.model.as_str()).size(12)].spacing(8);
            if record.parameters.safe {
                badges = badges.push(text("Safe").size(12));
            }
            if record.parameters.enhance {
                badges = badges.push(text("Enhanced").size(12));
            }

            body = body
                .push(text(&record.username).size(14))
                .push(text(&record.prompt).size(12))
                .push(badges.align_y(Alignment::Center));
        }

        mouse_area(
            container(body)
                .width(TILE_WIDTH)
                .padding(8)
                .style(container::rounded_box),
        )
        .on_enter(Message::GalleryHovered(Some(record.id)))
        .on_exit(Message::GalleryHovered(None))
        .on_press(Message::OpenDetail(record.clone(), self.archive))
        .into()
    }
}

fn placeholder<'a>(label: &'a str) -> Element<'a, Message> {
    container(text(label).size(14))
        .center_x(Length::Fill)
        .center_y(Length::Fixed(200.0))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::GenerationParameters;
    use crate::state::records::RecordStore;
    use crate::state::storage::MemoryStorage;

    fn record(prompt: &str, private: bool) -> ImageRecord {
        ImageRecord::new(
            "@tester",
            "https://image.example/prompt/x".to_string(),
            prompt.to_string(),
            GenerationParameters {
                private,
                ..GenerationParameters::default()
            },
        )
    }

    #[test]
    fn test_public_gallery_hides_private_records() {
        let bus = EventBus::new();
        let gallery =
            GalleryView::public(vec![record("open", false), record("hidden", true)], &bus);

        assert_eq!(gallery.records().len(), 1);
        assert_eq!(gallery.records()[0].prompt, "open");
    }

    #[test]
    fn test_record_created_is_prepended() {
        let bus = EventBus::new();
        let mut gallery = GalleryView::public(vec![record("old", false)], &bus);

        let new = record("new", false);
        bus.publish(GalleryEvent::RecordCreated(new.clone()));
        gallery.sync();

        assert_eq!(gallery.records()[0], new);
        assert_eq!(gallery.records().len(), 2);
    }

    #[test]
    fn test_private_record_created_leaves_gallery_unchanged() {
        let bus = EventBus::new();
        let mut gallery = GalleryView::public(vec![record("old", false)], &bus);
        let before = gallery.records().to_vec();

        bus.publish(GalleryEvent::RecordCreated(record("secret", true)));
        gallery.sync();

        assert_eq!(gallery.records(), before.as_slice());
    }

    #[test]
    fn test_archive_view_ignores_bus() {
        let bus = EventBus::new();
        let mut archive = GalleryView::archive(vec![record("kept", true)]);
        bus.publish(GalleryEvent::RecordCreated(record("new", false)));
        archive.sync();

        assert!(archive.archive);
        assert_eq!(archive.records().len(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_made_public_record_shows_in_public_gallery() {
        let bus = EventBus::new();
        let mut store = RecordStore::new(MemoryStorage::new());
        let secret = record("a secret garden", true);
        store.create(&secret).unwrap();
        assert!(GalleryView::public(store.list_public(), &bus).records().is_empty());

        store.make_public(&secret).unwrap();

        let gallery = GalleryView::public(store.list_public(), &bus);
        assert_eq!(gallery.records().len(), 1);
        assert_eq!(gallery.records()[0].id, secret.id);
        assert!(GalleryView::archive(store.list_archived()).records().is_empty());
    }

    #[test]
    fn test_search_filter_matches_substring() {
        let bus = EventBus::new();
        let gallery = GalleryView::public(
            vec![record("a cat sleeping", false), record("a dog", false)],
            &bus,
        );

        let hits = gallery.filtered("cat");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].prompt, "a cat sleeping");

        assert_eq!(gallery.filtered("CAT").len(), 1);
        assert_eq!(gallery.filtered("").len(), 2);
        assert_eq!(gallery.filtered("@TESTER").len(), 2);
    }

    #[test]
    fn test_remove_clears_hover() {
        let bus = EventBus::new();
        let r = record("a cat", false);
        let mut gallery = GalleryView::public(vec![r.clone()], &bus);

        gallery.hover(Some(r.id));
        gallery.remove(r.id);

        assert!(gallery.records().is_empty());
        assert_eq!(gallery.hovered, None);
    }
}
