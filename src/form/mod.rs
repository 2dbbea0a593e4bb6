//! Entity form sessions
//!
//! An [`EntityForm`] is one open create/edit form: scalar values, the
//! form's slot and collection seeded from the entity being edited, and the
//! preview handles for everything staged since. Staging runs the media
//! chain off the form so a reset while files are still being prepared
//! simply discards the late results.

mod schema;

pub use schema::{CollectionSpec, EntityKind, EntitySchema, FieldCheck, ScalarSpec, SlotSpec};

use crate::assets::{AssetCollection, AssetItem, AssetSlot, PreviewRegistry, Reconcile};
use crate::error::{Error, Result};
use crate::media::{prepare_batch, BatchOutcome, DroppedFile, ReduceOptions};
use crate::submit::{
    self, Phase, ProgressCallback, SubmissionPayload, UploadEvent, UploadHandle, UploadProgress,
};
use crate::transport::{Transport, UploadTarget};
use crate::types::{AssetId, MediaFile};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Server state of an entity being edited
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingEntity {
    /// Server id
    pub id: String,
    /// Current scalar values
    pub fields: HashMap<String, String>,
    /// Current image references per field, in server order
    pub images: BTreeMap<String, Vec<String>>,
}

impl ExistingEntity {
    /// Entity with an id and nothing else
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Add a scalar value
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Add an image reference under a field
    #[must_use]
    pub fn with_image(mut self, field: impl Into<String>, url: impl Into<String>) -> Self {
        self.images.entry(field.into()).or_default().push(url.into());
        self
    }

    /// Read an entity as the server returns it
    ///
    /// Picks up `_id` (or `id`) and every scalar in the schema. A scalar
    /// that arrives as a populated reference (`{"_id": ...}`) contributes
    /// its id. Images are read from the server's own keys, either a single
    /// URL or an array of URLs, and filed under the form's upload fields.
    pub fn from_value(kind: EntityKind, value: &Value) -> Result<Self> {
        let id = value
            .get("_id")
            .or_else(|| value.get("id"))
            .and_then(scalar_text)
            .ok_or_else(|| Error::Validation(format!("{kind} entity has no id")))?;

        let schema = kind.schema();
        let mut entity = Self::new(id);

        for spec in schema.scalars {
            if let Some(text) = value.get(spec.name).and_then(scalar_text) {
                entity.fields.insert(spec.name.to_string(), text);
            }
        }

        let image_fields = schema
            .slot
            .map(|s| (s.field, s.source_key))
            .into_iter()
            .chain(schema.collection.map(|c| (c.field, c.source_key)));
        for (field, key) in image_fields {
            let urls: Vec<String> = match value.get(key) {
                Some(Value::String(url)) if !url.is_empty() => vec![url.clone()],
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|url| !url.is_empty())
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            };
            if !urls.is_empty() {
                entity.images.insert(field.to_string(), urls);
            }
        }

        Ok(entity)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map.get("_id").or_else(|| map.get("id")).and_then(scalar_text),
        _ => None,
    }
}

/// Detached preparation of files for one image field
///
/// Holds no borrow of the form, so the form can be reset or dropped while
/// the files are being prepared.
#[derive(Debug, Clone)]
pub struct StageTicket {
    field: String,
    generation: u64,
    options: ReduceOptions,
}

impl StageTicket {
    /// Field the files are destined for
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Run the media chain over the files
    pub async fn prepare(
        self,
        files: Vec<MediaFile>,
        progress: &dyn ProgressCallback,
    ) -> StagedBatch {
        let outcome = prepare_batch(files, self.options, progress).await;
        StagedBatch {
            field: self.field,
            generation: self.generation,
            outcome,
        }
    }
}

/// Prepared files waiting to be accepted into a form
#[derive(Debug)]
pub struct StagedBatch {
    field: String,
    generation: u64,
    outcome: BatchOutcome,
}

/// What staging did to the form
#[derive(Debug, Default)]
pub struct StageReport {
    /// Ids of the newly inserted items, in input order
    pub added: Vec<AssetId>,
    /// Files left out because they could not be decoded
    pub dropped: Vec<DroppedFile>,
    /// The form was reset or reopened since staging began; nothing was inserted
    pub stale: bool,
}

/// One open create or edit form
#[derive(Debug)]
pub struct EntityForm {
    kind: EntityKind,
    existing: Option<ExistingEntity>,
    fields: HashMap<String, String>,
    slot: Option<AssetSlot>,
    collection: Option<AssetCollection>,
    previews: PreviewRegistry,
    generation: u64,
}

impl EntityForm {
    /// Open a form, seeding every image field from the existing entity
    pub fn open(kind: EntityKind, existing: Option<ExistingEntity>) -> Result<Self> {
        Self::open_with_previews(kind, existing, PreviewRegistry::new())
    }

    /// Open a form that issues previews from a shared registry
    pub fn open_with_previews(
        kind: EntityKind,
        existing: Option<ExistingEntity>,
        previews: PreviewRegistry,
    ) -> Result<Self> {
        let schema = kind.schema();
        let mut form = Self {
            kind,
            existing,
            fields: HashMap::new(),
            slot: schema.slot.map(|s| AssetSlot::new(s.field, previews.clone())),
            collection: schema.collection.map(|c| {
                AssetCollection::new(c.field, previews.clone()).with_deletion_field(c.deletion_field)
            }),
            previews,
            generation: 0,
        };
        form.seed()?;
        debug!(
            "Opened {} form ({})",
            kind,
            form.existing.as_ref().map_or("new", |e| e.id.as_str())
        );
        Ok(form)
    }

    fn seed(&mut self) -> Result<()> {
        let existing = self.existing.as_ref();

        if let Some(existing) = existing {
            for spec in self.kind.schema().scalars {
                if let Some(value) = existing.fields.get(spec.name) {
                    self.fields.insert(spec.name.to_string(), value.clone());
                }
            }
        }

        let images = |field: &str| existing.and_then(|e| e.images.get(field)).cloned();

        if let Some(slot) = &mut self.slot {
            let current = images(slot.field()).and_then(|urls| urls.into_iter().next());
            slot.seed(current)?;
        }

        if let Some(collection) = &mut self.collection {
            collection.seed(images(collection.field()).unwrap_or_default())?;
        }

        Ok(())
    }

    /// Entity kind
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Schema for this form
    pub const fn schema(&self) -> &'static EntitySchema {
        self.kind.schema()
    }

    /// Id of the entity being edited
    pub fn id(&self) -> Option<&str> {
        self.existing.as_ref().map(|e| e.id.as_str())
    }

    /// Current value of a scalar
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The single-image field, if the form has one
    pub const fn slot(&self) -> Option<&AssetSlot> {
        self.slot.as_ref()
    }

    /// The multi-image field, if the form has one
    pub const fn collection(&self) -> Option<&AssetCollection> {
        self.collection.as_ref()
    }

    /// Registry tracking this form's previews
    pub const fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// Set a scalar value
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        if self.schema().scalar(name).is_none() {
            return Err(Error::UnknownField(name.to_string()));
        }
        self.fields.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Start preparing files for an image field
    pub fn begin_stage(&self, field: &str) -> Result<StageTicket> {
        let schema = self.schema();
        if !schema.has_image_field(field) {
            return Err(Error::UnknownField(field.to_string()));
        }
        Ok(StageTicket {
            field: field.to_string(),
            generation: self.generation,
            options: schema.reduce,
        })
    }

    /// Insert a prepared batch
    ///
    /// Batches begun before the last reset are discarded. A batch that would
    /// take a collection past its cap, or put more than one file in a slot,
    /// is rejected as a whole.
    pub fn accept(&mut self, staged: StagedBatch) -> Result<StageReport> {
        let StagedBatch {
            field,
            generation,
            outcome,
        } = staged;

        if generation != self.generation {
            debug!(
                "Discarding {} files staged for {field} before reset",
                outcome.prepared.len()
            );
            return Ok(StageReport {
                stale: true,
                dropped: outcome.dropped,
                ..StageReport::default()
            });
        }

        let mut report = StageReport {
            dropped: outcome.dropped,
            ..StageReport::default()
        };
        let files = outcome.prepared;

        if let Some(slot) = self.slot.as_mut().filter(|s| s.field() == field) {
            if files.len() > 1 {
                return Err(Error::Validation(format!(
                    "{field} holds a single image, got {}",
                    files.len()
                )));
            }
            report.added.extend(files.into_iter().map(|file| slot.replace(file)));
            return Ok(report);
        }

        let cap = self.schema().collection.and_then(|c| c.cap);
        if let Some(collection) = self.collection.as_mut().filter(|c| c.field() == field) {
            if let Some(cap) = cap {
                let total = collection.active_len() + files.len();
                if total > cap {
                    return Err(Error::Validation(format!(
                        "{field} allows at most {cap} images, would have {total}"
                    )));
                }
            }
            report.added.extend(files.into_iter().map(|file| collection.add(file)));
            return Ok(report);
        }

        Err(Error::UnknownField(field))
    }

    /// Prepare files and insert them into an image field
    pub async fn stage(
        &mut self,
        field: &str,
        files: Vec<MediaFile>,
        progress: &dyn ProgressCallback,
    ) -> Result<StageReport> {
        let staged = self.begin_stage(field)?.prepare(files, progress).await;
        self.accept(staged)
    }

    /// Remove an item from an image field
    pub fn remove(&mut self, field: &str, id: AssetId) -> Result<()> {
        if let Some(slot) = self.slot.as_mut().filter(|s| s.field() == field) {
            return slot.remove(id);
        }
        if let Some(collection) = self.collection.as_mut().filter(|c| c.field() == field) {
            return collection.remove(id);
        }
        Err(Error::UnknownField(field.to_string()))
    }

    /// Remove an existing image by its reference URL
    pub fn remove_existing(&mut self, field: &str, url: &str) -> Result<()> {
        let id = if let Some(slot) = self.slot.as_ref().filter(|s| s.field() == field) {
            slot.current()
                .filter(|item| item.url() == Some(url))
                .map(AssetItem::id)
        } else if let Some(collection) = self.collection.as_ref().filter(|c| c.field() == field) {
            collection.find_existing(url)
        } else {
            return Err(Error::UnknownField(field.to_string()));
        };

        let id = id.ok_or_else(|| Error::Validation(format!("{field} has no image {url}")))?;
        self.remove(field, id)
    }

    /// Scalar values to send, in schema order, with defaults applied
    ///
    /// Values are sent exactly as entered; a blank value counts as unset.
    pub fn scalar_values(&self) -> Vec<(String, String)> {
        self.schema()
            .scalars
            .iter()
            .filter_map(|spec| {
                let value = self
                    .fields
                    .get(spec.name)
                    .map(String::as_str)
                    .filter(|v| !v.trim().is_empty())
                    .or(spec.default)?;
                Some((spec.name.to_string(), value.to_string()))
            })
            .collect()
    }

    /// Check required fields, formats and required images
    pub fn validate(&self) -> Result<()> {
        let schema = self.schema();
        let mut problems = Vec::new();

        for spec in schema.scalars {
            let value = self.fields.get(spec.name).map_or("", String::as_str);
            if value.trim().is_empty() {
                if spec.required {
                    problems.push(format!("{} is required", spec.name));
                }
                continue;
            }
            if let Some(problem) = spec.check.and_then(|c| c.problem(spec.name, value)) {
                problems.push(problem);
            }
        }

        if let (Some(spec), Some(slot)) = (schema.slot, &self.slot) {
            if spec.required_on_create && self.existing.is_none() && !slot.is_filled() {
                problems.push(format!("{} is required", spec.field));
            }
        }

        if let (Some(spec), Some(collection)) = (schema.collection, &self.collection) {
            if let Some(cap) = spec.cap {
                if collection.active_len() > cap {
                    problems.push(format!("{} allows at most {cap} images", spec.field));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(problems.join("; ")))
        }
    }

    /// Validate and assemble the outbound payload
    pub fn payload(&self) -> Result<SubmissionPayload> {
        self.validate()?;
        let slots: Vec<&AssetSlot> = self.slot.iter().collect();
        let collections: Vec<&AssetCollection> = self.collection.iter().collect();
        submit::assemble(&self.scalar_values(), &slots, &collections)
    }

    /// Where this form submits to
    pub fn target(&self) -> UploadTarget {
        let resource = self.schema().resource;
        match self.id() {
            Some(id) => UploadTarget::update(resource, id),
            None => UploadTarget::create(resource),
        }
    }

    /// Validate, assemble and start the upload
    ///
    /// The form is only read, so after a failure it can be submitted again
    /// without re-selecting files.
    pub fn start_submit(&self, transport: Arc<dyn Transport>) -> Result<UploadHandle> {
        let payload = self.payload()?;
        Ok(submit::submit(payload, transport, self.target()))
    }

    /// Submit and wait for the server's entity, reporting progress
    pub async fn submit(
        &self,
        transport: Arc<dyn Transport>,
        progress: &dyn ProgressCallback,
    ) -> Result<Value> {
        progress.on_phase(Phase::Validating).await;
        if let Err(e) = self.validate() {
            progress.on_error(&e).await;
            return Err(e);
        }

        progress.on_phase(Phase::Assembling).await;
        let mut handle = self.start_submit(transport)?;

        progress.on_phase(Phase::Uploading).await;
        while let Some(event) = handle.next_event().await {
            if let UploadEvent::Progress { loaded, total, .. } = event {
                progress.on_upload(UploadProgress { loaded, total }).await;
            }
        }

        match handle.finish().await {
            Ok(entity) => {
                info!("{} form submitted to {}", self.kind, self.target());
                progress.on_phase(Phase::Complete).await;
                Ok(entity)
            }
            Err(e) => {
                progress.on_error(&e).await;
                Err(e)
            }
        }
    }

    /// Return to the state the form was opened with
    ///
    /// Releases every preview and invalidates batches still being prepared.
    pub fn reset(&mut self) -> Result<()> {
        self.generation += 1;
        self.fields.clear();
        if let Some(slot) = &mut self.slot {
            slot.reset();
        }
        if let Some(collection) = &mut self.collection {
            collection.reset();
        }
        self.seed()
    }
}
