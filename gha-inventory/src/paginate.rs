// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Drains paginated list endpoints into complete collections.

use std::future::Future;

use tracing::{debug, warn};

use crate::{api::ApiResponse, error::Error};

/// First page number understood by the GitHub REST API.
pub const FIRST_PAGE: u32 = 1;

/// Items gathered from a paginated endpoint.
///
/// When a page fails, `items` holds everything collected before the failure
/// and `interrupted` carries the error that stopped the walk.
#[derive(Debug,)]
pub struct Drained<T,>
{
    /// Concatenation of every page fetched successfully.
    pub items:       Vec<T,>,
    /// Error that ended the walk early, if any.
    pub interrupted: Option<Error,>,
}

impl<T,> Drained<T,>
{
    /// Returns `true` when every page was fetched.
    pub fn is_complete(&self,) -> bool
    {
        self.interrupted.is_none()
    }

    /// Converts into a `Result`, discarding partial items on failure.
    pub fn into_result(self,) -> Result<Vec<T,>, Error,>
    {
        match self.interrupted {
            None => Ok(self.items,),
            Some(error,) => Err(error,),
        }
    }
}

/// Fetches pages starting at [`FIRST_PAGE`] until the server reports no next
/// page.
///
/// `fetch` is expected to apply rate-limit retries itself (for instance by
/// calling a [`RateLimitedClient`](crate::client::RateLimitedClient) method);
/// the first error it returns ends the walk. A next page that does not move
/// forward also ends the walk so a misbehaving server cannot loop it.
///
/// # Example
///
/// ```
/// use gha_inventory::{ApiResponse, RateInfo, drain_pages};
///
/// # tokio_test_block(async {
/// let drained = drain_pages("numbers", |page| async move {
///     Ok(ApiResponse {
///         value:     vec![page * 10, page * 10 + 1],
///         next_page: (page < 3).then_some(page + 1),
///         rate:      RateInfo::default(),
///     })
/// })
/// .await;
/// assert_eq!(drained.items, vec![10, 11, 20, 21, 30, 31]);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
/// # }
/// ```
pub async fn drain_pages<T, F, Fut,>(operation_name: &str, mut fetch: F,) -> Drained<T,>
where
    F: FnMut(u32,) -> Fut,
    Fut: Future<Output = Result<ApiResponse<Vec<T,>,>, Error,>,>,
{
    let mut items = Vec::new();
    let mut page = FIRST_PAGE;

    loop {
        match fetch(page,).await {
            Ok(response,) => {
                items.extend(response.value,);
                match response.next_page {
                    Some(next,) if next > page => page = next,
                    Some(next,) => {
                        warn!("{} reported next page {} after page {}, stopping", operation_name, next, page);
                        break;
                    }
                    None => break,
                }
            }
            Err(error,) => {
                warn!("{} error on page {}: {}", operation_name, page, error);
                return Drained {
                    items,
                    interrupted: Some(error,),
                };
            }
        }
    }

    debug!("{} drained {} items over {} pages", operation_name, items.len(), page);
    Drained {
        items,
        interrupted: None,
    }
}
