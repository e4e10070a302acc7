//! Record synthesis and the generation engine
//!
//! [`synthesize_record`] is the pure `(schema, seed, index) -> record`
//! function. [`DataGenerator`] wraps it with the mutable dataset state
//! (schema, seed, record count) and advisory counters.

pub mod fields;

pub use fields::{synthesize_field, SynthesisContext, DEFAULT_SUBSTITUTION_RATE};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::identity::derive_record_id;
use crate::random::SeededRng;
use crate::schema::{validate_schema, Schema, SchemaDefinition, ValidationReport};

/// A synthesized record: `id` first, then declared fields in order
pub type Record = Map<String, Value>;

/// Build the record at `index`
///
/// Uses a fresh [`SeededRng::for_record`] stream, so the result depends on
/// nothing but the arguments. A declared field named `id` replaces the
/// derived identifier.
pub fn synthesize_record(
    schema: &Schema,
    seed: u64,
    index: u64,
    reference_time: DateTime<Utc>,
) -> Record {
    let ctx = SynthesisContext {
        seed,
        index,
        reference_time,
    };
    let mut rng = SeededRng::for_record(seed, index);

    let mut record = Map::with_capacity(schema.len() + 1);
    record.insert("id".to_string(), Value::String(derive_record_id(seed, index)));
    for field in schema.fields() {
        let value = synthesize_field(field, &mut rng, &ctx);
        record.insert(field.name.clone(), value);
    }
    record
}

/// One page of records
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub records: Vec<Record>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<u64>,
    pub total_count: u64,
}

/// Everything record output depends on
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorState {
    pub total_records: u64,
    pub seed: u64,
    pub schema: Schema,
    /// Anchor of the default timestamp window
    pub reference_time: DateTime<Utc>,
}

impl GeneratorState {
    /// The record at `index` under this state
    pub fn record(&self, index: u64) -> Record {
        synthesize_record(&self.schema, self.seed, index, self.reference_time)
    }
}

/// Partial state replacement. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ResetRequest {
    pub total_records: Option<u64>,
    pub seed: Option<u64>,
    pub schema: Option<Schema>,
    pub reference_time: Option<DateTime<Utc>>,
}

impl ResetRequest {
    pub fn seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

/// Read-only view of the engine returned by [`DataGenerator::get_state`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub total_records: u64,
    pub seed: u64,
    pub schema: SchemaDefinition,
    pub reference_time: DateTime<Utc>,
    pub current_offset: u64,
    pub generated_count: u64,
}

/// Engine counters. Advisory only: none of them affects output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorMetrics {
    pub total_records: u64,
    pub seed: u64,
    pub field_count: usize,
    pub current_offset: u64,
    pub generated_count: u64,
    pub batches_served: u64,
}

/// The generation engine
///
/// State lives behind `RwLock<Arc<_>>`. Each batch clones the `Arc` once, so
/// a concurrent [`reset`](Self::reset) never yields a batch mixing old and
/// new state.
#[derive(Debug)]
pub struct DataGenerator {
    state: RwLock<Arc<GeneratorState>>,
    current_offset: AtomicU64,
    generated_count: AtomicU64,
    batches_served: AtomicU64,
}

impl DataGenerator {
    /// Create an engine. A missing seed is taken from the wall clock.
    pub fn new(schema: Schema, total_records: u64, seed: Option<u64>) -> Self {
        Self::from_state(GeneratorState {
            total_records,
            seed: seed.unwrap_or_else(default_seed),
            schema,
            reference_time: default_reference_time(),
        })
    }

    /// Create an engine from a complete state
    pub fn from_state(state: GeneratorState) -> Self {
        Self {
            state: RwLock::new(Arc::new(state)),
            current_offset: AtomicU64::new(0),
            generated_count: AtomicU64::new(0),
            batches_served: AtomicU64::new(0),
        }
    }

    /// Pin the anchor of default timestamp windows
    pub fn with_reference_time(self, reference_time: DateTime<Utc>) -> Self {
        self.reset(ResetRequest {
            reference_time: Some(reference_time),
            ..ResetRequest::default()
        });
        self
    }

    /// Current state snapshot
    pub fn snapshot(&self) -> Arc<GeneratorState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records `[offset, min(offset + limit, total))`
    ///
    /// Never fails: an offset at or past the end gives an empty batch with
    /// `has_more == false`, and `limit == 0` gives an empty batch that points
    /// back at `offset`.
    pub fn generate_batch(&self, offset: u64, limit: u64) -> Batch {
        let state = self.snapshot();
        let total = state.total_records;
        let start = offset.min(total);
        let end = offset.saturating_add(limit).min(total);

        let records: Vec<Record> = (start..end).map(|index| state.record(index)).collect();
        let has_more = end < total;

        self.current_offset.store(end, Ordering::Relaxed);
        self.generated_count
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        self.batches_served.fetch_add(1, Ordering::Relaxed);

        debug!(
            "Generated {} records at offset {} (seed {}, total {})",
            records.len(),
            offset,
            state.seed,
            total
        );

        Batch {
            records,
            has_more,
            next_offset: has_more.then_some(end),
            total_count: total,
        }
    }

    /// The record at `index`, or `None` past the end
    pub fn record_at(&self, index: u64) -> Option<Record> {
        let state = self.snapshot();
        (index < state.total_records).then(|| state.record(index))
    }

    /// Validate a definition without touching any engine
    pub fn validate_schema(definition: &SchemaDefinition) -> ValidationReport {
        validate_schema(definition)
    }

    /// Replace the provided parts of the state and zero the counters
    ///
    /// Output is keyed by the seed in the state, so a new seed takes effect
    /// on the very next batch.
    pub fn reset(&self, request: ResetRequest) -> Arc<GeneratorState> {
        let next = {
            let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let current = guard.as_ref();
            let next = Arc::new(GeneratorState {
                total_records: request.total_records.unwrap_or(current.total_records),
                seed: request.seed.unwrap_or(current.seed),
                schema: request.schema.unwrap_or_else(|| current.schema.clone()),
                reference_time: request.reference_time.unwrap_or(current.reference_time),
            });
            *guard = next.clone();
            next
        };
        self.zero_counters();

        info!(
            "Generator reset: {} records, seed {}, {} fields",
            next.total_records,
            next.seed,
            next.schema.len()
        );
        next
    }

    /// Replace the schema only
    pub fn update_schema(&self, schema: Schema) -> Arc<GeneratorState> {
        let fields = schema.len();
        let next = self.reset(ResetRequest {
            schema: Some(schema),
            ..ResetRequest::default()
        });
        info!("Schema updated: {} fields", fields);
        next
    }

    pub fn schema(&self) -> Schema {
        self.snapshot().schema.clone()
    }

    pub fn get_state(&self) -> StateSnapshot {
        let state = self.snapshot();
        StateSnapshot {
            total_records: state.total_records,
            seed: state.seed,
            schema: state.schema.definition().clone(),
            reference_time: state.reference_time,
            current_offset: self.current_offset.load(Ordering::Relaxed),
            generated_count: self.generated_count.load(Ordering::Relaxed),
        }
    }

    pub fn get_metrics(&self) -> GeneratorMetrics {
        let state = self.snapshot();
        GeneratorMetrics {
            total_records: state.total_records,
            seed: state.seed,
            field_count: state.schema.len(),
            current_offset: self.current_offset.load(Ordering::Relaxed),
            generated_count: self.generated_count.load(Ordering::Relaxed),
            batches_served: self.batches_served.load(Ordering::Relaxed),
        }
    }

    fn zero_counters(&self) {
        self.current_offset.store(0, Ordering::Relaxed);
        self.generated_count.store(0, Ordering::Relaxed);
        self.batches_served.store(0, Ordering::Relaxed);
    }
}

/// Seed used when none is configured: the current time in milliseconds
pub fn default_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Start of the current UTC day
pub fn default_reference_time() -> DateTime<Utc> {
    let now = Utc::now();
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}
