/*
 * luet-pm - Terminal front-end for the luet package manager.
 * Copyright (C) 2025  luet-pm contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Last repository sync time.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::path::Path;
use tracing::debug;

/// Shown in the status bar and by `luet-pm sync-info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncInfo {
    pub datetime: String,
    pub ago: String,
}

impl SyncInfo {
    pub fn not_synced() -> Self {
        Self {
            datetime: "N/A".to_string(),
            ago: "repositories not synced".to_string(),
        }
    }
}

/// Parse the timestamp luet writes to SYNCTIME.
///
/// RFC 3339 with or without fractional seconds; a trailing `Z` or an
/// explicit offset is honoured and a bare timestamp is taken as local time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }

    if let Some(utc) = raw.strip_suffix('Z') {
        return parse_naive(utc).map(|naive| Utc.from_utc_datetime(&naive).with_timezone(&Local));
    }

    parse_naive(raw).and_then(|naive| Local.from_local_datetime(&naive).earliest())
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{} {} ago", n, unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

/// Coarse "time ago" text: days, hours, minutes or "just now"
pub fn humanize_since<Tz: TimeZone>(then: &DateTime<Tz>, now: &DateTime<Tz>) -> String {
    let delta = now.clone().signed_duration_since(then.clone());

    if delta.num_days() > 0 {
        plural(delta.num_days(), "day")
    } else if delta.num_hours() > 0 {
        plural(delta.num_hours(), "hour")
    } else if delta.num_minutes() > 0 {
        plural(delta.num_minutes(), "minute")
    } else {
        "just now".to_string()
    }
}

/// Read SYNCTIME from `path`
pub fn last_sync(path: &Path) -> SyncInfo {
    last_sync_at(path, Local::now())
}

fn last_sync_at(path: &Path, now: DateTime<Local>) -> SyncInfo {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no sync time");
            return SyncInfo::not_synced();
        }
    };

    match parse_timestamp(&raw) {
        Some(then) => SyncInfo {
            datetime: then.format("%Y-%m-%dT%H:%M:%S").to_string(),
            ago: humanize_since(&then, &now),
        },
        None => {
            debug!(raw = %raw.trim(), "unparsable sync time");
            SyncInfo::not_synced()
        }
    }
}
