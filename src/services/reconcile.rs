// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Merge designs from the local store with the generation service's
//! account history.

use crate::models::Design;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

fn sort_key(design: &Design) -> DateTime<Utc> {
    design.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Merge two design lists into one, newest first.
///
/// Records with an empty `image_ref` are dropped. An external record whose
/// `image_ref` exactly matches a local one is discarded; local records win.
/// Missing timestamps sort as the epoch. The sort is stable, so merging an
/// already merged list with nothing returns it unchanged.
pub fn merge(local: Vec<Design>, external: Vec<Design>) -> Vec<Design> {
    let local: Vec<Design> = local
        .into_iter()
        .filter(|d| !d.image_ref.is_empty())
        .collect();
    let external: Vec<Design> = {
        let local_refs: HashSet<&str> = local.iter().map(|d| d.image_ref.as_str()).collect();
        external
            .into_iter()
            .filter(|d| !d.image_ref.is_empty() && !local_refs.contains(d.image_ref.as_str()))
            .collect()
    };

    let mut merged = local;
    merged.extend(external);
    merged.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
    merged
}
