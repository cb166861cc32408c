//! Proof of work over event ids.
//!
//! Mining appends `["nonce", "<n>", "<difficulty>"]` and searches `n = 0, 1, ...`
//! until the id, read as a 256-bit big-endian integer, has at least
//! `difficulty` leading zero bits.
//!
//! The canonical body is split once around the nonce value, so each candidate
//! only hashes the decimal nonce and a short suffix on top of a cloned
//! SHA-256 state.

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::canonical::canonical_bytes;
use crate::error::{CoreError, Result};
use crate::event::Event;
use crate::tags::{Tag, NONCE_TAG};

/// Mine `event` to the given difficulty. Returns the winning nonce.
///
/// Any existing nonce tag is replaced and the signature is dropped; the id is
/// recomputed. Unbounded in time for large difficulties, see [`mine_until`].
pub fn mine(event: &mut Event, difficulty: u8) -> Result<u64> {
    mine_until(event, difficulty, &AtomicBool::new(false))
}

/// Like [`mine`], checking `cancel` between candidates.
///
/// Fails with [`CoreError::MiningCancelled`] once `cancel` is set. On any
/// error the event is left as it was.
pub fn mine_until(event: &mut Event, difficulty: u8, cancel: &AtomicBool) -> Result<u64> {
    if event.pubkey.is_none() {
        return Err(CoreError::OrphanEvent);
    }

    let mut candidate = event.clone();
    candidate.unsign();
    candidate.tags.remove_all(NONCE_TAG);
    let committed = difficulty.to_string();
    candidate
        .tags
        .push(Tag::new([NONCE_TAG, "", committed.as_str()]));

    let (prefix, suffix) = split_around_nonce(&candidate, difficulty)?;
    let base = Sha256::new_with_prefix(&prefix);
    let target = u32::from(difficulty);

    let mut nonce: u64 = 0;
    loop {
        if cancel.load(Ordering::Relaxed) {
            debug!(nonce, difficulty, "mining cancelled");
            return Err(CoreError::MiningCancelled);
        }

        let mut hasher = base.clone();
        hasher.update(nonce.to_string().as_bytes());
        hasher.update(&suffix);
        let digest: [u8; 32] = hasher.finalize().into();

        if leading_zero_bits(&digest) >= target {
            break;
        }
        nonce += 1;
    }

    let last = candidate.tags.len() - 1;
    if let Some(tag) = candidate.tags.get_mut(last) {
        tag.set(1, nonce.to_string());
    }
    let id = candidate.identify()?;
    *event = candidate;
    debug!(nonce, difficulty, %id, "mined event");
    Ok(nonce)
}

/// Number of leading zero bits of a 256-bit big-endian value.
pub fn leading_zero_bits(hash: &[u8; 32]) -> u32 {
    let mut count = 0;
    for byte in hash {
        if *byte == 0 {
            count += 8;
        } else {
            count += byte.leading_zeros();
            break;
        }
    }
    count
}

/// The difficulty an event commits to in its nonce tag, if any.
pub fn committed_difficulty(event: &Event) -> Option<u8> {
    event.tags.find(NONCE_TAG)?.get(2)?.parse().ok()
}

/// Leading-zero hex digits matching a difficulty, rounded down to whole
/// nibbles. Legacy approximation used as an id prefix in filters.
pub fn nibble_prefix(difficulty: u8) -> String {
    "0".repeat(usize::from(difficulty / 4))
}

/// Canonical bytes before and after the (empty) nonce value of the last tag.
fn split_around_nonce(event: &Event, difficulty: u8) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut full = canonical_bytes(event)?;

    let mut suffix = format!("\",\"{difficulty}\"]],").into_bytes();
    serde_json::to_writer(&mut suffix, event.content_str())?;
    suffix.push(b']');

    full.truncate(full.len() - suffix.len());
    Ok((full, suffix))
}
