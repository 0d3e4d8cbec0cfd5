/*
 *  retry.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bounded retry for remote calls
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
use log::warn;
use std::future::Future;

use crate::memory::Checkpoints;
use crate::remote::ServiceError;

/// Retries after the first attempt, so a call is tried at most four times.
pub const MAX_RETRIES: u8 = 3;

/// Run `call` until it succeeds, fails with a non-transient error, or the
/// retry budget is spent.
///
/// Every transient failure passes a reclaim checkpoint before the next
/// attempt. Explicit API errors come back untouched on the first attempt; a
/// spent budget comes back as [`ServiceError::Exhausted`].
pub async fn with_retries<T, F, Fut>(
    label: &'static str,
    checkpoints: &Checkpoints,
    mut call: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut last_error = String::new();
    for attempt in 0..=MAX_RETRIES {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                checkpoints.reclaim(label);
                if attempt < MAX_RETRIES {
                    warn!("{}: retrying {}/{}: {}", label, attempt + 1, MAX_RETRIES, e);
                }
                last_error = e.to_string();
            }
            Err(e) => return Err(e),
        }
    }
    warn!("{}: too many attempts, last error: {}", label, last_error);
    Err(ServiceError::Exhausted { attempts: MAX_RETRIES + 1, last: last_error })
}
