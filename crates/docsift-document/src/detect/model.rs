// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout model capability and the bounded pool that owns its instances.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use docsift_core::DetectionParams;
use docsift_core::error::{DocsiftError, Result};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::RawDetection;
use crate::raster::Page;

/// An object-detection model that labels page regions.
///
/// Instances are not assumed to be reentrant: the pool hands each one to a
/// single inference at a time.
pub trait LayoutModel: Send {
    /// Run the model on one page. The model applies its own non-max
    /// suppression at `params.iou_threshold`; output order is preserved
    /// verbatim by the caller.
    fn infer(&mut self, page: &Page, params: &DetectionParams) -> Result<Vec<RawDetection>>;

    /// Free whatever the model holds. Called once, when the pool is released.
    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

type Slots = Arc<Mutex<Vec<Box<dyn LayoutModel>>>>;

/// A fixed set of initialized model instances.
///
/// At most [`ModelPool::size`] inferences run at once; further callers wait
/// for a free instance.
pub struct ModelPool {
    slots: Slots,
    permits: Arc<Semaphore>,
    size: usize,
    timeout: Option<Duration>,
}

impl ModelPool {
    /// Build a pool from already-loaded instances.
    pub fn new(models: Vec<Box<dyn LayoutModel>>) -> Result<Self> {
        if models.is_empty() {
            return Err(DocsiftError::Config(
                "a model pool needs at least one instance".to_string(),
            ));
        }
        let size = models.len();
        Ok(Self {
            slots: Arc::new(Mutex::new(models)),
            permits: Arc::new(Semaphore::new(size)),
            size,
            timeout: None,
        })
    }

    /// Load `count` instances with `loader`, called with each instance index.
    #[instrument(skip(loader))]
    pub fn initialize<F>(count: usize, mut loader: F) -> Result<Self>
    where
        F: FnMut(usize) -> Result<Box<dyn LayoutModel>>,
    {
        let models = (0..count).map(&mut loader).collect::<Result<Vec<_>>>()?;
        let pool = Self::new(models)?;
        info!(instances = pool.size, "Layout model pool initialized");
        Ok(pool)
    }

    /// Give up on an inference that takes longer than `limit`. The instance
    /// rejoins the pool once the abandoned call returns.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run one inference on a free instance.
    ///
    /// The model runs on tokio's blocking pool so CPU-heavy inference never
    /// stalls the async workers.
    pub async fn infer(
        &self,
        page: Arc<Page>,
        params: DetectionParams,
    ) -> Result<Vec<RawDetection>> {
        let page_number = page.number;
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| DocsiftError::Detection {
                page: page_number,
                reason: "model pool has been released".to_string(),
            })?;

        let mut model = lock_slots(&self.slots, page_number)?
            .pop()
            .ok_or_else(|| DocsiftError::Detection {
                page: page_number,
                reason: "no model instance available".to_string(),
            })?;

        debug!(page = page_number, "Model instance acquired");
        let slots = Arc::clone(&self.slots);
        let task = tokio::task::spawn_blocking(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| model.infer(&page, &params)))
                .unwrap_or_else(|payload| {
                    warn!(page = page_number, "Layout model panicked; instance kept");
                    Err(DocsiftError::Detection {
                        page: page_number,
                        reason: format!("layout model panicked: {}", panic_message(&*payload)),
                    })
                });
            match slots.lock() {
                Ok(mut guard) => guard.push(model),
                Err(_) => warn!(page = page_number, "Model slots poisoned; instance dropped"),
            }
            drop(permit);
            outcome
        });

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                DocsiftError::InferenceTimeout(format!(
                    "page {page_number} took longer than {limit:?}"
                ))
            })?,
            None => task.await,
        };

        joined.map_err(|err| DocsiftError::Detection {
            page: page_number,
            reason: format!("inference task failed: {err}"),
        })?
    }

    /// Release every idle instance and refuse further inferences.
    #[instrument(skip(self))]
    pub fn release(&self) -> Result<()> {
        self.permits.close();
        let mut slots = lock_slots(&self.slots, 0)?;
        let mut released = 0;
        for mut model in slots.drain(..) {
            model.release()?;
            released += 1;
        }
        info!(released, "Layout model pool released");
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

fn lock_slots(slots: &Slots, page: usize) -> Result<MutexGuard<'_, Vec<Box<dyn LayoutModel>>>> {
    slots.lock().map_err(|_| DocsiftError::Detection {
        page,
        reason: "model slots poisoned by an earlier panic".to_string(),
    })
}
