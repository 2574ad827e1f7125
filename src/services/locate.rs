// src/services/locate.rs

//! Ordered locator fallback and frame search.
//!
//! Candidates are tried in order and the first present element wins. Browser
//! errors are propagated; only "not present" moves on to the next candidate.

use std::time::Duration;

use crate::browser::Browser;
use crate::error::Result;
use crate::models::Locator;
use crate::utils::Poller;

/// Path from the top document to a frame: `[]` is the top document,
/// `[1, 0]` the first frame inside the second frame.
pub type FramePath = Vec<usize>;

/// Outcome of a frame-wide search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The browser is left inside `frame`.
    Found { locator: Locator, frame: FramePath },
    /// The browser is back at the top document.
    NotFound { frames_searched: usize },
}

/// First candidate present in the current frame.
pub async fn first_present(
    browser: &mut dyn Browser,
    candidates: &[Locator],
) -> Result<Option<Locator>> {
    for candidate in candidates {
        if browser.exists(candidate).await? {
            log::debug!("Matched locator {}", candidate);
            return Ok(Some(candidate.clone()));
        }
    }
    Ok(None)
}

/// Frames to search, top document first, then direct frames, then frames
/// nested one level inside them. Leaves the browser at the top document.
pub async fn frame_paths(browser: &mut dyn Browser) -> Result<Vec<FramePath>> {
    browser.enter_default_frame().await?;
    let direct = browser.frame_count().await?;

    let mut paths: Vec<FramePath> = vec![Vec::new()];
    paths.extend((0..direct).map(|i| vec![i]));

    for i in 0..direct {
        browser.enter_frame(i).await?;
        let nested = browser.frame_count().await?;
        paths.extend((0..nested).map(|j| vec![i, j]));
        browser.enter_parent_frame().await?;
    }
    Ok(paths)
}

/// Switch to the frame at `path`, starting from the top document.
pub async fn enter_path(browser: &mut dyn Browser, path: &[usize]) -> Result<()> {
    browser.enter_default_frame().await?;
    for &index in path {
        browser.enter_frame(index).await?;
    }
    Ok(())
}

/// Search every frame for the first present candidate, short-circuiting on
/// the first match.
pub async fn locate_in_frames(browser: &mut dyn Browser, candidates: &[Locator]) -> Result<Lookup> {
    let paths = frame_paths(browser).await?;
    for path in &paths {
        enter_path(browser, path).await?;
        if let Some(locator) = first_present(browser, candidates).await? {
            log::debug!("Found {} in frame {:?}", locator, path);
            return Ok(Lookup::Found {
                locator,
                frame: path.clone(),
            });
        }
    }
    browser.enter_default_frame().await?;
    Ok(Lookup::NotFound {
        frames_searched: paths.len(),
    })
}

/// Repeat [`locate_in_frames`] until something is found or the timeout passes.
pub async fn wait_for_any(
    browser: &mut dyn Browser,
    candidates: &[Locator],
    timeout_ms: u64,
    interval: Duration,
) -> Result<Lookup> {
    let mut poll = Poller::from_millis(timeout_ms, interval);
    loop {
        let lookup = locate_in_frames(browser, candidates).await?;
        if matches!(lookup, Lookup::Found { .. }) || !poll.tick().await {
            return Ok(lookup);
        }
    }
}

/// HTML of the top document and every searchable frame of the current window.
pub async fn collect_sources(browser: &mut dyn Browser) -> Result<Vec<String>> {
    let paths = frame_paths(browser).await?;
    let mut sources = Vec::with_capacity(paths.len());
    for path in &paths {
        enter_path(browser, path).await?;
        sources.push(browser.source().await?);
    }
    browser.enter_default_frame().await?;
    Ok(sources)
}
