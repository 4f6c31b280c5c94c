//! Meal logging: crop, rasterize, estimate, build and save.

use crate::camera::{CameraDevice, CameraSession};
use crate::error::{PipelineError, Result};
use crate::journal::{Journal, QuotaPolicy, SaveReport};
use chrono::{DateTime, Utc};
use foodlog_core::config::ConfigSchema;
use foodlog_core::entry::{EntryEdits, LogEntryBuilder};
use foodlog_core::metrics::MetricsCalculator;
use foodlog_core::models::{LogEntry, NutritionEstimate};
use foodlog_estimation::EstimationGateway;
use foodlog_image::{CropRegion, CropTransformer, EncodedImage, RawImage, Rasterizer, RenderJob};
use foodlog_store::DurableStore;
use foodlog_telemetry::{metrics, names, Timer};
use std::sync::Arc;

/// A loaded photo and its crop selection, before anything is encoded.
#[derive(Debug, Clone)]
pub struct PhotoDraft {
    image: Arc<RawImage>,
    crop: CropTransformer,
}

impl PhotoDraft {
    /// Decode an uploaded file. The crop starts at the whole photo.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self::from_frame(RawImage::decode(data)?))
    }

    pub fn from_frame(image: RawImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            image: Arc::new(image),
            crop: CropTransformer::for_display(width, height),
        }
    }

    /// Grab one frame. The stream is released before this returns, on success or failure.
    pub fn capture<D: CameraDevice + ?Sized>(device: &mut D) -> Result<Self> {
        let frame = CameraSession::open(device)?.capture()?;
        Ok(Self::from_frame(frame))
    }

    /// Size the photo is shown at; resets the crop to the whole photo.
    #[must_use]
    pub fn with_display(mut self, display_width: u32, display_height: u32) -> Self {
        self.crop.initialize(display_width, display_height);
        self
    }

    pub fn image(&self) -> &Arc<RawImage> {
        &self.image
    }

    pub fn crop(&self) -> CropRegion {
        self.crop.region()
    }

    /// Returns the clamped region actually applied.
    pub fn update_crop(&mut self, region: CropRegion) -> CropRegion {
        self.crop.update(region)
    }

    pub fn update_crop_from_display_pixels(&mut self, x: f64, y: f64, width: f64, height: f64) -> CropRegion {
        self.crop.update_from_display_pixels(x, y, width, height)
    }
}

/// How the estimation step went. Only `Estimated` carries calories into the entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EstimateOutcome {
    Estimated(NutritionEstimate),
    /// The service answered but saw no food; the entry is zeroed
    NotFood(NutritionEstimate),
    /// The service could not be used; the entry is zeroed
    Failed { reason: String },
    /// The user already named the food and its calories
    Skipped,
}

impl EstimateOutcome {
    /// The estimate to build the entry from, if any.
    pub fn estimate(&self) -> Option<&NutritionEstimate> {
        match self {
            EstimateOutcome::Estimated(e) | EstimateOutcome::NotFood(e) => Some(e),
            EstimateOutcome::Failed { .. } | EstimateOutcome::Skipped => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, EstimateOutcome::Failed { .. })
    }
}

/// A saved meal and how it got there.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedMeal {
    pub entry: LogEntry,
    pub outcome: EstimateOutcome,
    /// Old entries dropped to fit this one
    pub evicted: usize,
}

/// Runs a photo through the whole pipeline into the journal.
pub struct MealLogger<G> {
    journal: Journal,
    rasterizer: Rasterizer,
    gateway: G,
}

impl<G: EstimationGateway> MealLogger<G> {
    pub fn new(journal: Journal, rasterizer: Rasterizer, gateway: G) -> Self {
        Self {
            journal,
            rasterizer,
            gateway,
        }
    }

    /// Wire the store, rasterizer and calculator from loaded configuration.
    pub fn from_config(config: &ConfigSchema, gateway: G) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(DurableStore::from_config(&config.store)?);
        let journal = Journal::new(store, MetricsCalculator::from_config(&config.metrics));
        Ok(Self::new(journal, Rasterizer::from_config(&config.image), gateway))
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn rasterizer(&self) -> &Rasterizer {
        &self.rasterizer
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Encode the draft's current crop selection.
    pub async fn encode(&self, draft: &PhotoDraft) -> Result<EncodedImage> {
        self.render(draft, RenderJob::Crop(draft.crop())).await
    }

    /// Encode the whole photo, longest edge bounded.
    pub async fn encode_bounded(&self, draft: &PhotoDraft) -> Result<EncodedImage> {
        self.render(draft, RenderJob::Bounded).await
    }

    async fn render(&self, draft: &PhotoDraft, job: RenderJob) -> Result<EncodedImage> {
        let timer = Timer::start(names::RASTER_DURATION_MS);
        let result = self.rasterizer.render_async(Arc::clone(draft.image()), job).await;
        let elapsed = timer.stop();

        match result {
            Ok(encoded) => {
                tracing::debug!(
                    bytes = encoded.len(),
                    dimensions = ?encoded.dimensions(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Photo encoded"
                );
                Ok(encoded)
            }
            Err(e) => {
                metrics().increment(names::ENCODING_FAILED);
                tracing::warn!(error = %e, "Photo encoding failed");
                Err(e.into())
            }
        }
    }

    /// Ask the gateway about an encoded photo. Never fails: errors become `Failed`.
    pub async fn estimate(&self, photo: &EncodedImage) -> EstimateOutcome {
        let timer = Timer::start(names::ESTIMATE_DURATION_MS);
        let result = self.gateway.estimate(&photo.to_data_uri()).await;
        drop(timer);

        match result {
            Ok(estimate) if estimate.is_food_item => {
                metrics().increment(names::ESTIMATE_SUCCEEDED);
                tracing::debug!(
                    food_item = %estimate.food_item,
                    calories = estimate.calorie_estimate,
                    confidence = estimate.confidence,
                    "Estimate received"
                );
                EstimateOutcome::Estimated(estimate)
            }
            Ok(estimate) => {
                metrics().increment(names::ESTIMATE_SUCCEEDED);
                tracing::info!(label = %estimate.food_item, "Photo does not show food, logging zero calories");
                EstimateOutcome::NotFood(estimate)
            }
            Err(e) => {
                metrics().increment(names::ESTIMATE_FAILED);
                tracing::warn!(error = %e, code = ?e.code(), "Estimation failed, logging zero calories");
                EstimateOutcome::Failed { reason: e.to_string() }
            }
        }
    }

    /// Persist an entry off the async runtime.
    pub async fn save(&self, entry: LogEntry, policy: QuotaPolicy) -> Result<SaveReport> {
        let journal = self.journal.clone();
        tokio::task::spawn_blocking(move || journal.save_entry(entry, policy))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?
    }

    /// Encode, estimate, build and save one meal.
    ///
    /// An estimation failure still saves a zeroed entry. An encoding,
    /// validation or storage failure saves nothing.
    pub async fn log_meal(
        &self,
        draft: &PhotoDraft,
        edits: EntryEdits,
        timestamp: DateTime<Utc>,
        policy: QuotaPolicy,
    ) -> Result<LoggedMeal> {
        let photo = self.encode(draft).await?;

        let outcome = if user_supplied_everything(&edits) {
            EstimateOutcome::Skipped
        } else {
            self.estimate(&photo).await
        };

        let entry = LogEntryBuilder::build(outcome.estimate(), photo.to_data_uri(), edits, timestamp)?;
        let report = self.save(entry.clone(), policy).await?;

        Ok(LoggedMeal {
            entry,
            outcome,
            evicted: report.evicted,
        })
    }
}

fn user_supplied_everything(edits: &EntryEdits) -> bool {
    edits.calorie_estimate.is_some() && edits.food_item.as_deref().is_some_and(|s| !s.trim().is_empty())
}
