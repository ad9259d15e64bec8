//! xkcd comic lookup.

use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;
use rand::Rng;
use serde::Deserialize;

use crate::error::{BotError, Result};

/// xkcd never published a comic with this number.
const MISSING_COMIC: u32 = 404;

#[derive(Debug, Deserialize)]
struct ComicInfo {
    num: u32,
    img: String,
}

/// Fetches comic image URLs, one request per call.
///
/// The first call reads the latest comic and remembers how many exist; later
/// calls pick a random comic number up to that count.
pub struct ComicClient {
    http: reqwest::Client,
    api_base: String,
    latest: AtomicU32,
}

impl ComicClient {
    pub fn new(api_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            latest: AtomicU32::new(0),
        }
    }

    pub async fn random_image_url(&self) -> Result<String> {
        let url = match self.latest.load(Ordering::Relaxed) {
            0 => format!("{}/info.0.json", self.api_base),
            count => {
                let index = pick_comic_number(count, &mut rand::thread_rng());
                format!("{}/{}/info.0.json", self.api_base, index)
            }
        };
        debug!("Fetching comic from {url}");

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(BotError::ComicApi {
                status: response.status(),
            });
        }
        let info: ComicInfo = response.json().await?;
        self.latest.fetch_max(info.num, Ordering::Relaxed);
        Ok(info.img)
    }
}

/// Uniform over `1..=count`, skipping the missing comic.
fn pick_comic_number<R: Rng>(count: u32, rng: &mut R) -> u32 {
    if count < MISSING_COMIC {
        return rng.gen_range(1..=count);
    }
    let index = rng.gen_range(1..count);
    if index >= MISSING_COMIC { index + 1 } else { index }
}
