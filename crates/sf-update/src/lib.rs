//! Update checking against the published release document.
//!
//! The network call and the notification surface are external collaborators;
//! both sit behind traits so the decision logic (fetch, extract, compare,
//! report) stays testable. A failed check is reported and never retried.

use sf_core::EngineResult;
use std::cmp::Ordering;

/// Numeric, dot-segment-wise version comparison. Missing or non-numeric
/// segments count as zero; the first differing segment decides.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let left_parts: Vec<u64> = left.split('.').map(parse_segment).collect();
    let right_parts: Vec<u64> = right.split('.').map(parse_segment).collect();
    let len = left_parts.len().max(right_parts.len());

    for index in 0..len {
        let a = left_parts.get(index).copied().unwrap_or(0);
        let b = right_parts.get(index).copied().unwrap_or(0);
        match a.cmp(&b) {
            Ordering::Equal => {}
            decided => return decided,
        }
    }
    Ordering::Equal
}

fn parse_segment(segment: &str) -> u64 {
    segment.trim().parse::<u64>().unwrap_or(0)
}

/// Pulls the version token following the `@version` marker out of a fetched
/// release document.
pub fn extract_version(body: &str) -> Option<String> {
    let mut tokens = body.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "@version" {
            let version: String = tokens
                .next()?
                .chars()
                .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '.' || *ch == '-')
                .collect();
            if version.is_empty() {
                return None;
            }
            return Some(version);
        }
    }
    None
}

/// Fetches the remote release document.
pub trait UpdateTransport {
    fn fetch(&self, url: &str) -> EngineResult<String>;
}

/// Surfaces a user-visible notification.
pub trait UpdateNotifier {
    fn notify(&mut self, title: &str, text: &str);
}

/// One configured update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheck {
    pub name: String,
    pub current_version: String,
    pub update_url: String,
    pub download_url: String,
}

/// Terminal result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate { current: String },
    Available { remote: String },
    Failed { reason: String },
}

impl UpdateCheck {
    pub fn run(
        &self,
        transport: &dyn UpdateTransport,
        notifier: &mut dyn UpdateNotifier,
    ) -> UpdateOutcome {
        let body = match transport.fetch(&self.update_url) {
            Ok(body) => body,
            Err(error) => {
                log::error!("update check fetch failed: {error}");
                notifier.notify(
                    &format!("{} - Update Check Failed", self.name),
                    &format!("could not fetch update document: {error}"),
                );
                return UpdateOutcome::Failed {
                    reason: error.to_string(),
                };
            }
        };

        let Some(remote) = extract_version(&body) else {
            log::warn!("update check could not parse a remote version");
            notifier.notify(
                &format!("{} - Update Check Failed", self.name),
                "could not parse the remote version",
            );
            return UpdateOutcome::Failed {
                reason: "remote version not found".to_owned(),
            };
        };

        if compare_versions(&remote, &self.current_version) == Ordering::Greater {
            log::info!("update available: {remote}");
            notifier.notify(
                &format!("{} - Update Available", self.name),
                &format!(
                    "a new version ({remote}) is available at {}",
                    self.download_url
                ),
            );
            UpdateOutcome::Available { remote }
        } else {
            log::info!("up to date at {}", self.current_version);
            notifier.notify(
                &format!("{} - Up to Date", self.name),
                &format!("version {} is current", self.current_version),
            );
            UpdateOutcome::UpToDate {
                current: self.current_version.clone(),
            }
        }
    }
}
