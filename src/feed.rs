//! Podcast feed rendering.
//!
//! The feed is rebuilt from the download state on every run and never
//! patched, so it is always a pure function of `(config, state)`. Nothing
//! time-dependent (such as a build date) goes into it; two runs over the same
//! state produce byte-identical files.

use std::path::Path;

use chrono::NaiveDate;
use rss::extension::itunes::{self, ITunesChannelExtension};
use rss::{Channel, Enclosure, Item};
use url::form_urlencoded;

use crate::config::ChannelConfig;
use crate::error::{Error, Result};
use crate::fsutil::write_atomic;
use crate::metadata::MediaItem;
use crate::state::DownloadState;

pub const ENCLOSURE_MIME_TYPE: &str = "video/mp4";

/// A rendered feed plus the items that could not be rendered.
#[derive(Debug)]
pub struct FeedDocument {
    pub channel: Channel,
    /// Items left out of the feed, each with an [`Error::InvalidUploadDate`].
    pub omitted: Vec<Error>,
}

impl FeedDocument {
    pub fn to_xml(&self) -> std::result::Result<Vec<u8>, rss::Error> {
        self.channel.pretty_write_to(Vec::new(), b' ', 2)
    }
}

/// Render the channel header and one episode per state item, in state order.
pub fn render(config: &ChannelConfig, state: &DownloadState) -> FeedDocument {
    let rss_options = &config.rss;

    let mut channel = Channel::default();
    channel
        .namespaces
        .insert("itunes".to_string(), itunes::NAMESPACE.to_string());
    channel.set_title(rss_options.title.clone());
    channel.set_link(rss_options.link.clone());
    channel.set_description(rss_options.description.clone());

    let mut itunes_ext = ITunesChannelExtension::default();
    itunes_ext.set_image(rss_options.image.clone());
    itunes_ext.set_author(rss_options.author.clone());
    channel.set_itunes_ext(itunes_ext);

    let mut items = Vec::with_capacity(state.len());
    let mut omitted = Vec::new();
    for media in state.items() {
        match episode(media, &rss_options.feed_base_url) {
            Ok(item) => items.push(item),
            Err(e) => omitted.push(e),
        }
    }
    channel.set_items(items);

    FeedDocument { channel, omitted }
}

fn episode(media: &MediaItem, base_url: &str) -> Result<Item> {
    let pub_date =
        format_pub_date(&media.upload_date).ok_or_else(|| Error::InvalidUploadDate {
            id: media.id.clone(),
            date: media.upload_date.clone(),
        })?;

    let mut enclosure = Enclosure::default();
    enclosure.set_url(enclosure_url(base_url, &media.media_file_name()));
    enclosure.set_length(media.filesize.to_string());
    enclosure.set_mime_type(ENCLOSURE_MIME_TYPE);

    let mut item = Item::default();
    item.set_title(media.title.clone());
    item.set_link(media.webpage_url.clone());
    item.set_description(media.description.clone());
    item.set_enclosure(enclosure);
    item.set_pub_date(pub_date);
    Ok(item)
}

/// `base_url` followed by the form-encoded file name (`' '` → `+`,
/// `'&'` → `%26`).
pub fn enclosure_url(base_url: &str, file_name: &str) -> String {
    let escaped: String = form_urlencoded::byte_serialize(file_name.as_bytes()).collect();
    format!("{base_url}{escaped}")
}

/// `20160101` → `Fri, 01 Jan 2016 12:00:00 GMT`.
///
/// Upload dates carry no time, so every episode is published at noon UTC.
/// Returns `None` unless the input is exactly eight digits naming a real day.
pub fn format_pub_date(upload_date: &str) -> Option<String> {
    if upload_date.len() != 8 || !upload_date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = upload_date[0..4].parse().ok()?;
    let month = upload_date[4..6].parse().ok()?;
    let day = upload_date[6..8].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.format("%a, %d %b %Y 12:00:00 GMT").to_string())
}

/// Serialize `document` and atomically replace the file at `path`.
pub fn write(document: &FeedDocument, path: &Path) -> Result<()> {
    let feed_error = |reason: String| Error::FeedWrite {
        path: path.to_path_buf(),
        reason,
    };
    let bytes = document.to_xml().map_err(|e| feed_error(e.to_string()))?;
    write_atomic(path, &bytes).map_err(|e| feed_error(e.to_string()))
}
